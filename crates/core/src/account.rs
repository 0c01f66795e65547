use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::id::AccountId;

/// An account as the engine sees it: a transaction endpoint and a match-rule
/// target. Internal accounts are the user's own (on- or off-budget); external
/// accounts are counterparties such as employers and merchants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Option<AccountId>,
    pub name: String,
    pub external: bool,
    /// Related sub-resource URLs, keyed by relation name
    /// (e.g. `recent-envelopes`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub links: BTreeMap<String, String>,
}

impl Account {
    pub fn internal(name: &str) -> Self {
        Account {
            id: None,
            name: name.to_string(),
            external: false,
            links: BTreeMap::new(),
        }
    }

    pub fn external(name: &str) -> Self {
        Account {
            id: None,
            name: name.to_string(),
            external: true,
            links: BTreeMap::new(),
        }
    }
}
