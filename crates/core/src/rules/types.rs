//! Rule configuration types.
//!
//! Configs are a tagged variant rather than a loose map: each rule type
//! carries exactly the fields it needs and round-trips through the
//! `rule_config` JSON column.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while validating a rule configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    /// Percentage must lie in 1..=100.
    #[error("percentage must be between 1 and 100, got {0}")]
    PercentageOutOfRange(u32),

    /// The informational approver count must be at least one.
    #[error("total_approvers must be at least 1, got {0}")]
    TotalApproversTooSmall(u32),

    /// Approver references must be real user ids.
    #[error("approver id must not be nil")]
    NilApprover,

    /// The rule type is accepted nowhere in the engine.
    #[error("unknown rule type: {0}")]
    UnknownRuleType(String),
}

/// A company approval rule.
///
/// Any rule returning a terminate verdict ends the expense approved;
/// rules never force rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule_type", rename_all = "snake_case")]
pub enum RuleConfig {
    /// Terminate once the share of approved slots reaches the threshold.
    Percentage {
        /// Threshold in percent, 1..=100.
        percentage: u32,
        /// Informational approver count recorded at creation. Evaluation
        /// always uses the expense's actual slot count.
        total_approvers: u32,
    },
    /// Terminate once a named approver's slot is approved.
    SpecificApprover {
        /// The decisive approver.
        approver_id: Uuid,
    },
    /// Terminate only when both the percentage threshold is met and the
    /// special approver has approved.
    Hybrid {
        /// Threshold in percent, 1..=100.
        percentage: u32,
        /// Informational approver count recorded at creation.
        total_approvers: u32,
        /// The approver whose consent is mandatory.
        special_approver_id: Uuid,
    },
}

impl RuleConfig {
    /// Returns the rule type tag used in persistence and API payloads.
    #[must_use]
    pub const fn rule_type(&self) -> &'static str {
        match self {
            Self::Percentage { .. } => "percentage",
            Self::SpecificApprover { .. } => "specific_approver",
            Self::Hybrid { .. } => "hybrid",
        }
    }

    /// Validates field ranges.
    ///
    /// # Errors
    ///
    /// Returns a `RuleError` naming the first violated constraint.
    pub fn validate(&self) -> Result<(), RuleError> {
        match self {
            Self::Percentage {
                percentage,
                total_approvers,
            } => {
                validate_percentage(*percentage)?;
                validate_total(*total_approvers)
            }
            Self::SpecificApprover { approver_id } => validate_approver(*approver_id),
            Self::Hybrid {
                percentage,
                total_approvers,
                special_approver_id,
            } => {
                validate_percentage(*percentage)?;
                validate_total(*total_approvers)?;
                validate_approver(*special_approver_id)
            }
        }
    }

    /// Human-readable summary for configuration listings.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Percentage { percentage, .. } => {
                format!("Approve once {percentage}% of the chain has approved")
            }
            Self::SpecificApprover { approver_id } => {
                format!("Approve once approver {approver_id} approves")
            }
            Self::Hybrid {
                percentage,
                special_approver_id,
                ..
            } => format!(
                "Approve once {percentage}% of the chain and approver {special_approver_id} have approved"
            ),
        }
    }
}

fn validate_percentage(percentage: u32) -> Result<(), RuleError> {
    if (1..=100).contains(&percentage) {
        Ok(())
    } else {
        Err(RuleError::PercentageOutOfRange(percentage))
    }
}

fn validate_total(total: u32) -> Result<(), RuleError> {
    if total >= 1 {
        Ok(())
    } else {
        Err(RuleError::TotalApproversTooSmall(total))
    }
}

fn validate_approver(id: Uuid) -> Result<(), RuleError> {
    if id.is_nil() {
        Err(RuleError::NilApprover)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_percentage_bounds() {
        let ok = RuleConfig::Percentage {
            percentage: 60,
            total_approvers: 3,
        };
        assert!(ok.validate().is_ok());

        let zero = RuleConfig::Percentage {
            percentage: 0,
            total_approvers: 3,
        };
        assert_eq!(zero.validate(), Err(RuleError::PercentageOutOfRange(0)));

        let over = RuleConfig::Percentage {
            percentage: 101,
            total_approvers: 3,
        };
        assert_eq!(over.validate(), Err(RuleError::PercentageOutOfRange(101)));
    }

    #[test]
    fn test_validate_total_approvers() {
        let rule = RuleConfig::Percentage {
            percentage: 50,
            total_approvers: 0,
        };
        assert_eq!(rule.validate(), Err(RuleError::TotalApproversTooSmall(0)));
    }

    #[test]
    fn test_validate_nil_approver() {
        let rule = RuleConfig::SpecificApprover {
            approver_id: Uuid::nil(),
        };
        assert_eq!(rule.validate(), Err(RuleError::NilApprover));
    }

    #[test]
    fn test_tagged_json_round_trip() {
        let rule = RuleConfig::Hybrid {
            percentage: 75,
            total_approvers: 4,
            special_approver_id: Uuid::new_v4(),
        };
        let value = serde_json::to_value(&rule).unwrap();
        assert_eq!(value["rule_type"], "hybrid");
        let back: RuleConfig = serde_json::from_value(value).unwrap();
        assert_eq!(back, rule);
    }

    #[test]
    fn test_unknown_rule_type_rejected_by_serde() {
        let value = json!({
            "rule_type": "amount_threshold",
            "max_amount": "1000.00"
        });
        assert!(serde_json::from_value::<RuleConfig>(value).is_err());
    }

    #[test]
    fn test_describe_mentions_threshold() {
        let rule = RuleConfig::Percentage {
            percentage: 75,
            total_approvers: 4,
        };
        assert!(rule.describe().contains("75%"));
    }
}
