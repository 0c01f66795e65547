use serde::de::DeserializeOwned;
use serde::Serialize;

use fiscus_core::{Account, MatchRule, Transaction};

/// A record kind the remote store serves. `KIND` is the collection segment of
/// resource URLs; `id` is the remote identifier, absent until the store has
/// assigned one. Locally-drafted match rules report no id so their temporary
/// ids never reach the wire.
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync {
    const KIND: &'static str;

    fn id(&self) -> Option<String>;
}

impl Resource for Account {
    const KIND: &'static str = "accounts";

    fn id(&self) -> Option<String> {
        self.id.as_ref().map(|id| id.0.clone())
    }
}

impl Resource for Transaction {
    const KIND: &'static str = "transactions";

    fn id(&self) -> Option<String> {
        self.id.as_ref().map(|id| id.0.clone())
    }
}

impl Resource for MatchRule {
    const KIND: &'static str = "matchRules";

    fn id(&self) -> Option<String> {
        if self.id.is_local() {
            None
        } else {
            Some(self.id.0.clone())
        }
    }
}
