pub mod apps;
pub mod logs;
pub mod nodes;
pub mod servers;
pub mod watch;

use cachenet_console::ConsoleError;

/// Flatten a console error into one anyhow error listing every reason.
pub(crate) fn report(err: ConsoleError) -> anyhow::Error {
    anyhow::anyhow!(err.reasons().join("\n"))
}
