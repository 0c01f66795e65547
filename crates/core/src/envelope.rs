use serde::{Deserialize, Serialize};

use super::id::EnvelopeId;

/// A reference to an envelope, as returned by an account's recent-envelopes
/// listing. Ordered most recently used first by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeRef {
    pub id: EnvelopeId,
    pub name: Option<String>,
}

impl EnvelopeRef {
    pub fn new(id: &str) -> Self {
        EnvelopeRef {
            id: EnvelopeId::from(id),
            name: None,
        }
    }
}
