use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{AccountId, RuleId};

/// A priority-ordered pattern binding a counterparty description to an
/// account. `priority` ascends: lower values are evaluated first. A missing
/// `created_at` marks a rule drafted locally and not yet persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRule {
    pub id: RuleId,
    /// Wildcard pattern: a single `*` at the start and/or end matches zero or
    /// more characters; everything else compares case-insensitively.
    #[serde(rename = "match")]
    pub pattern: String,
    pub account_id: Option<AccountId>,
    pub priority: i64,
    pub created_at: Option<DateTime<Utc>>,
}

impl MatchRule {
    /// A freshly drafted rule: local id, empty pattern and account, priority
    /// left for the save pass to assign.
    pub fn draft() -> Self {
        MatchRule {
            id: RuleId::local(),
            pattern: String::new(),
            account_id: None,
            priority: 0,
            created_at: None,
        }
    }

    pub fn new(pattern: &str, account_id: &str, priority: i64) -> Self {
        MatchRule {
            id: RuleId::local(),
            pattern: pattern.to_string(),
            account_id: Some(AccountId::from(account_id)),
            priority,
            created_at: None,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.created_at.is_some()
    }

    /// Both pattern and account must be set for the rule to be saveable.
    pub fn is_valid(&self) -> bool {
        !self.pattern.is_empty() && self.account_id.as_ref().is_some_and(|a| !a.0.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_rules_are_local_and_unpersisted() {
        let rule = MatchRule::draft();
        assert!(rule.id.is_local());
        assert!(!rule.is_persisted());
        assert!(!rule.is_valid());
    }

    #[test]
    fn validity_requires_pattern_and_account() {
        let mut rule = MatchRule::draft();
        rule.pattern = "AMAZON*".to_string();
        assert!(!rule.is_valid());
        rule.account_id = Some(AccountId::from("acct-3"));
        assert!(rule.is_valid());
        rule.account_id = Some(AccountId::from(""));
        assert!(!rule.is_valid());
    }

    #[test]
    fn pattern_serializes_under_the_wire_name() {
        let rule = MatchRule::new("STARBUCKS*", "acct-5", 2);
        let json = serde_json::to_value(&rule).unwrap();
        assert!(json.get("match").is_some());
        assert!(json.get("pattern").is_none());
        assert_eq!(json["accountId"], "acct-5");
    }
}
