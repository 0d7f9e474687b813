//! cachenet-console: the stateful side of the admin console.
//!
//! - [`Poller`] keeps [`ConsoleData`] fresh, one request per endpoint at a time
//! - [`NodeWorkbench`] stages node additions and subtree deletions
//! - [`ApplicationWorkbench`] stages installs and removals per application
//! - [`ConsoleSession`] ties them to an API and guards one-shot actions

pub mod config;
pub mod data;
pub mod error;
pub mod poll;
pub mod session;
pub mod workbench;

#[cfg(test)]
mod testing;

pub use config::ConsoleConfig;
pub use data::{ConsoleData, Snapshot};
pub use error::{BatchFailure, ConsoleError, ConsoleResult, SubmitError};
pub use poll::{InFlight, PollOutcome, Poller, ReadyFlags};
pub use session::ConsoleSession;
pub use workbench::{ApplicationWorkbench, NodeWorkbench, SubmitOutcome};
