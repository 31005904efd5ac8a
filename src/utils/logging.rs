use std::str::FromStr;

use tracing::Level;

/// Installs the fmt subscriber at `level` (`error` .. `trace`).
///
/// Unparsable levels fall back to `info`. Returns `false` if a global
/// subscriber was already installed, which is expected when tests call this
/// more than once.
pub fn init(level: &str) -> bool {
    let max_level = Level::from_str(level.trim()).unwrap_or(Level::INFO);

    tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_target(false)
        .try_init()
        .is_ok()
}
