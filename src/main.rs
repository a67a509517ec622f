//! Aklla Soap Formulator
//!
//! An MCP server for melt-and-pour and cold-process soap formulation.

use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};
use tracing_subscriber::EnvFilter;

use aklla::build_info;
use aklla::db;
use aklla::mcp::AkllaService;
use aklla::models::Catalog;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout carries the MCP stdio transport
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("aklla=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    build_info::print_startup_banner();
    eprintln!("Starting MCP server on stdio...");

    let db_path = db::database_path();
    eprintln!("Database path: {}", db_path.display());

    let database = db::Database::open(&db_path)?;

    let catalog = Catalog::builtin();
    tracing::info!(ingredients = catalog.len(), "Catalog loaded");

    let service = AkllaService::new(database, catalog);

    let transport = (stdin(), stdout());

    let server = service.serve(transport).await?;

    server.waiting().await?;

    Ok(())
}
