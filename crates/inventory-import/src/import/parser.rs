//! CSV row parser for product import files
//!
//! Columns are located by header name (case-insensitive, trimmed), so column
//! order in the source file does not matter. An `Index` column is accepted
//! and ignored.

use bigdecimal::BigDecimal;
use csv::StringRecord;
use std::str::FromStr;

use super::types::ProductRecord;

/// Recognised product columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    InternalId,
    Name,
    Description,
    Brand,
    Category,
    Price,
    Currency,
    Stock,
    Ean,
    Color,
    Size,
    Availability,
}

impl Column {
    pub const ALL: [Column; 12] = [
        Column::InternalId,
        Column::Name,
        Column::Description,
        Column::Brand,
        Column::Category,
        Column::Price,
        Column::Currency,
        Column::Stock,
        Column::Ean,
        Column::Color,
        Column::Size,
        Column::Availability,
    ];

    /// Header text as it appears in import files
    pub fn header(&self) -> &'static str {
        match self {
            Column::InternalId => "Internal ID",
            Column::Name => "Name",
            Column::Description => "Description",
            Column::Brand => "Brand",
            Column::Category => "Category",
            Column::Price => "Price",
            Column::Currency => "Currency",
            Column::Stock => "Stock",
            Column::Ean => "EAN",
            Column::Color => "Color",
            Column::Size => "Size",
            Column::Availability => "Availability",
        }
    }

    fn matches(&self, header: &str) -> bool {
        header.trim().eq_ignore_ascii_case(self.header())
    }
}

/// The header row lacks required columns; the whole source is unusable
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("header is missing required columns: {}", .missing.join(", "))]
pub struct HeaderError {
    pub missing: Vec<&'static str>,
}

/// Why a single data row was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowParseCause {
    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error("invalid {column} '{value}': {reason}")]
    InvalidNumber {
        column: &'static str,
        value: String,
        reason: String,
    },
}

/// A rejected data row, with its 1-based row number
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("row {row_number}: {cause}")]
pub struct RowParseError {
    pub row_number: i64,
    pub cause: RowParseCause,
}

/// Maps CSV records to [`ProductRecord`] using a resolved header layout
#[derive(Debug, Clone)]
pub struct RowParser {
    positions: [usize; 12],
}

impl RowParser {
    /// Reader settings shared by every import source
    pub fn reader_builder() -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        builder.has_headers(true).flexible(true).trim(csv::Trim::All);
        builder
    }

    /// Resolve column positions from the header row
    pub fn from_headers(headers: &StringRecord) -> Result<Self, HeaderError> {
        let mut positions = [0usize; 12];
        let mut missing = Vec::new();

        for (slot, column) in Column::ALL.iter().enumerate() {
            match headers.iter().position(|h| column.matches(h)) {
                Some(position) => positions[slot] = position,
                None => missing.push(column.header()),
            }
        }

        if missing.is_empty() {
            Ok(Self { positions })
        } else {
            Err(HeaderError { missing })
        }
    }

    /// Parse one data row
    ///
    /// Text columns may be empty; a row that is too short to contain a column
    /// is rejected. Price and stock must be numeric.
    pub fn parse(
        &self,
        row_number: i64,
        record: &StringRecord,
    ) -> Result<ProductRecord, RowParseError> {
        let field = |column: Column| self.field(record, row_number, column);

        let raw_price = field(Column::Price)?;
        let price = BigDecimal::from_str(raw_price).map_err(|e| RowParseError {
            row_number,
            cause: RowParseCause::InvalidNumber {
                column: Column::Price.header(),
                value: raw_price.to_string(),
                reason: e.to_string(),
            },
        })?;

        let raw_stock = field(Column::Stock)?;
        let stock = raw_stock.parse::<i32>().map_err(|e| RowParseError {
            row_number,
            cause: RowParseCause::InvalidNumber {
                column: Column::Stock.header(),
                value: raw_stock.to_string(),
                reason: e.to_string(),
            },
        })?;

        Ok(ProductRecord {
            row_number: Some(row_number),
            internal_id: field(Column::InternalId)?.to_string(),
            name: field(Column::Name)?.to_string(),
            description: field(Column::Description)?.to_string(),
            brand: field(Column::Brand)?.to_string(),
            category: field(Column::Category)?.to_string(),
            price,
            currency: field(Column::Currency)?.to_string(),
            stock,
            ean: field(Column::Ean)?.to_string(),
            color: field(Column::Color)?.to_string(),
            size: field(Column::Size)?.to_string(),
            availability: field(Column::Availability)?.to_string(),
        })
    }

    fn field<'r>(
        &self,
        record: &'r StringRecord,
        row_number: i64,
        column: Column,
    ) -> Result<&'r str, RowParseError> {
        record
            .get(self.positions[column as usize])
            .map(str::trim)
            .ok_or(RowParseError {
                row_number,
                cause: RowParseCause::MissingColumn(column.header()),
            })
    }
}

/// Raw row text stored with a parse error
pub fn raw_row(record: &StringRecord) -> String {
    record.iter().collect::<Vec<_>>().join(",")
}
