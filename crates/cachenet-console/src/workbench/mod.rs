//! Editing sessions over hypothetical state.
//!
//! A workbench owns a snapshot of authoritative state plus the operator's
//! staged edits. Edits go through the pure staging functions in
//! `cachenet_topology`; submission sends the diff as two batches.

mod applications;
mod nodes;
mod submit;

pub use applications::ApplicationWorkbench;
pub use nodes::NodeWorkbench;
pub use submit::SubmitOutcome;
