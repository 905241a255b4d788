//! Approval chains and the per-expense decision engine.

pub mod chain;
pub mod decide;
pub mod error;
pub mod types;

pub use chain::{ConfiguredApprover, EmptyChainOutcome, assemble, empty_chain_outcome};
pub use decide::{DecideInput, Decision, SlotChange, decide};
pub use error::ApprovalError;
pub use types::{
    CASCADE_COMMENT, ChainSnapshot, ExpenseStatus, Role, SlotStatus, SlotView, Verdict,
};

#[cfg(test)]
#[path = "props.rs"]
mod props;
