//! Quorum and specific-approver rules evaluated after each approval.

pub mod evaluate;
pub mod types;

pub use evaluate::{Outcome, evaluate};
pub use types::{RuleConfig, RuleError};
