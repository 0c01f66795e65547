use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::id::{AccountId, EnvelopeId, TransactionId};

/// The editable payload of a transaction under review. Amounts are positive
/// cents; direction lives in the source/destination endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDraft {
    pub note: String,
    pub amount_cents: i64,
    pub date: NaiveDate,
    pub available_from: Option<NaiveDate>,
    pub source_account_id: Option<AccountId>,
    pub destination_account_id: Option<AccountId>,
    pub envelope_id: Option<EnvelopeId>,
}

/// A transaction record as the remote store holds it. `id` is absent only on
/// a create payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Option<TransactionId>,
    pub note: String,
    pub amount_cents: i64,
    pub date: NaiveDate,
    pub available_from: Option<NaiveDate>,
    pub source_account_id: Option<AccountId>,
    pub destination_account_id: Option<AccountId>,
    pub envelope_id: Option<EnvelopeId>,
}

impl Transaction {
    pub fn from_draft(draft: TransactionDraft) -> Self {
        Transaction {
            id: None,
            note: draft.note,
            amount_cents: draft.amount_cents,
            date: draft.date,
            available_from: draft.available_from,
            source_account_id: draft.source_account_id,
            destination_account_id: draft.destination_account_id,
            envelope_id: draft.envelope_id,
        }
    }
}
