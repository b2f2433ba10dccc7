//! Build automation tasks for the inventory workspace
//!
//! - Generating the CLI reference from the clap definitions

use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for the inventory workspace", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Generate the CLI reference in Markdown
    GenerateCliDocs {
        /// Output directory for generated documentation
        #[arg(short, long, default_value = "docs")]
        output_dir: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenerateCliDocs { output_dir } => generate_cli_docs(&output_dir)?,
    }

    Ok(())
}

fn generate_cli_docs(output_dir: &str) -> anyhow::Result<()> {
    println!("Generating CLI documentation...");

    let markdown = clap_markdown::help_markdown::<inventory_import::Cli>();

    let content = format!(
        r#"# inventory-import CLI Reference

Generated from the CLI source code on {}.

## Typical use

```bash
# Apply migrations once
inventory-import migrate

# Start workers (one or more processes)
inventory-import worker --workers 5

# Submit a file; chunks are picked up by the workers
inventory-import import products.csv --wait

# Or run everything in one process without Postgres
inventory-import run products.csv --in-memory
```

## Commands

{}

## Environment Variables

- `DATABASE_URL` - PostgreSQL connection string
- `IMPORT_DATA_DIR` - Directory relative file names resolve against
- `IMPORT_CHUNK_SIZE` - Rows per chunk (default `1000`)
- `IMPORT_WORKER_COUNT` - Concurrent chunk consumers (default `5`)
- `IMPORT_PARSE_FAILURES` - `count` or `log-only` (default `count`)
- `IMPORT_ROUTING_KEY` - Queue routing key (default `product.import`)
- `LOG_LEVEL`, `LOG_OUTPUT`, `LOG_FORMAT`, `LOG_DIR` - Logging
- `RUST_LOG` - Additional tracing filter directives
"#,
        chrono::Utc::now().format("%Y-%m-%d"),
        markdown
    );

    let output_path = PathBuf::from(output_dir);
    fs::create_dir_all(&output_path)?;
    let file_path = output_path.join("cli.md");
    fs::write(&file_path, content)?;

    println!("Generated CLI documentation at {}", file_path.display());

    Ok(())
}
