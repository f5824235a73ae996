use crate::{
    cli::actions::database,
    remember::{now_unix_seconds, PgTripletStore, TripletStore},
};
use anyhow::Result;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub dsn: String,
}

/// Delete every expired triplet once.
/// # Errors
/// Returns an error if the database is unreachable or the delete fails.
pub async fn execute(args: Args) -> Result<()> {
    let pool = database::connect(&args.dsn).await?;
    let removed = PgTripletStore::new(pool)
        .clean_expired_tokens(now_unix_seconds())
        .await?;
    info!("Removed {} expired triplets", removed);
    println!("{removed}");
    Ok(())
}
