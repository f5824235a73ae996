use crate::cli::actions::{migrate, serve, sweep, Action};
use anyhow::Result;

/// Execute the provided action.
// This is the single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Serve(args) => serve::execute(args).await,
        Action::Sweep(args) => sweep::execute(args).await,
        Action::Migrate(args) => migrate::execute(args).await,
    }
}
