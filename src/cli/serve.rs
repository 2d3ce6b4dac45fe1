//! Serve command implementation.

use super::CliError;
use toe::PlayerSpec;
use toe::server::StrategyServer;
use toe::strategy;

/// Host `player`'s strategy on `bind` until the listener fails.
///
/// # Errors
///
/// Returns an error if the strategy is unknown or the address cannot be bound.
pub(crate) fn execute(player: &PlayerSpec, bind: &str) -> Result<(), CliError> {
    let strategy = strategy::create(&player.strategy)?;
    let mut server = StrategyServer::bind(bind, strategy)?;
    if let Some(addr) = server.local_addr() {
        eprintln!("Serving {player} on http://{addr}/turn");
    }
    server.serve()?;
    Ok(())
}
