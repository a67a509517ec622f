//! Utility to print a saved formulation as export JSON
//!
//! Usage: export_formulation <id>

use aklla::models::Catalog;
use aklla::tools::saved::read_saved_formulation;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let id: i64 = match std::env::args().nth(1).map(|arg| arg.parse()) {
        Some(Ok(id)) => id,
        _ => {
            eprintln!("Usage: export_formulation <saved formulation id>");
            std::process::exit(2);
        }
    };

    let db_path = aklla::db::database_path();
    eprintln!("Database path: {}", db_path.display());

    let database = aklla::db::Database::open(&db_path)?;

    let (record, formulation) = read_saved_formulation(&database, id)?;
    eprintln!("{} (lot {}, {})", record.name, record.lot_code.as_deref().unwrap_or("-"), record.batch_date);

    let export = formulation.export(&Catalog::builtin());
    println!("{}", export.to_json_pretty()?);

    Ok(())
}
