use crate::{cli::actions::database, remember::PgTripletStore};
use anyhow::Result;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub dsn: String,
}

/// Create the triplet table and its index.
/// # Errors
/// Returns an error if the database is unreachable or a statement fails.
pub async fn execute(args: Args) -> Result<()> {
    let pool = database::connect(&args.dsn).await?;
    PgTripletStore::new(pool).ensure_schema().await?;
    info!("Schema is up to date");
    Ok(())
}
