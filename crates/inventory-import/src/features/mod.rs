//! Feature slices for the import service
//!
//! Each feature is a vertical slice with `commands/` (writes) and `queries/`
//! (reads). Commands and queries are plain request structs implementing the
//! `mediator` crate's `Request` marker, with a free `handle` function per
//! request.
//!
//! # Features
//!
//! - **imports**: start, cancel and inspect bulk product imports

pub mod imports;
