use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use fiscus_core::{Account, AccountId, EnvelopeId, TransactionDraft, TransactionId};
use fiscus_remote::{BudgetStore, StoreError};

use crate::duplicates::find_duplicates;
use crate::parse::RawImportRecord;
use crate::rules::match_account;

/// One statement row under review. The draft is freely editable; the raw
/// counterparty names captured at build time stand in for whichever endpoint
/// is not yet resolved to an account id. Processed candidates stay in the
/// list for audit and are only skipped by navigation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionCandidate {
    pub draft: TransactionDraft,
    pub source_account_name: Option<String>,
    pub destination_account_name: Option<String>,
    processed: bool,
    duplicate_ids: Vec<TransactionId>,
}

impl TransactionCandidate {
    pub(crate) fn new(
        draft: TransactionDraft,
        source_account_name: Option<String>,
        destination_account_name: Option<String>,
    ) -> Self {
        TransactionCandidate {
            draft,
            source_account_name,
            destination_account_name,
            processed: false,
            duplicate_ids: Vec::new(),
        }
    }

    pub fn processed(&self) -> bool {
        self.processed
    }

    pub(crate) fn mark_processed(&mut self) {
        self.processed = true;
    }

    /// Persisted transactions this candidate appears to re-import. Advisory:
    /// a non-empty list blocks nothing.
    pub fn duplicate_ids(&self) -> &[TransactionId] {
        &self.duplicate_ids
    }

    pub(crate) fn set_duplicate_ids(&mut self, ids: Vec<TransactionId>) {
        self.duplicate_ids = ids;
    }
}

/// Build the candidate list for a statement: normalise signs into
/// endpoint direction, resolve counterparties through the match rules,
/// suggest the most recent envelope for external counterparties, and flag
/// duplicates against the target account's full history. Runs once per
/// import; user edits never re-trigger any of it.
pub async fn build_candidates<S: BudgetStore + ?Sized>(
    store: &S,
    target: &Account,
    records: Vec<RawImportRecord>,
) -> Result<Vec<TransactionCandidate>, StoreError> {
    let target_id = target.id.clone().ok_or(StoreError::MissingId {
        kind: "accounts",
    })?;

    let accounts = store.list_accounts().await?;
    let rules = store.list_match_rules().await?;
    let existing = store.list_transactions(&target_id).await?;

    let mut recent_cache: HashMap<AccountId, Option<EnvelopeId>> = HashMap::new();
    let mut candidates = Vec::with_capacity(records.len());

    for record in records {
        let counterparty_id = match_account(&record.description, &rules);

        let mut draft = TransactionDraft {
            note: record.description.clone(),
            amount_cents: record.amount_cents.abs(),
            date: record.date,
            available_from: None,
            source_account_id: None,
            destination_account_id: None,
            envelope_id: None,
        };

        // Negative raw amounts leave the statement account; positive ones
        // arrive into it.
        let outflow = record.amount_cents < 0;
        let (source_name, destination_name) = if outflow {
            draft.source_account_id = Some(target_id.clone());
            draft.destination_account_id = counterparty_id.clone();
            (None, Some(record.description.clone()))
        } else {
            draft.source_account_id = counterparty_id.clone();
            draft.destination_account_id = Some(target_id.clone());
            (Some(record.description.clone()), None)
        };

        if draft.envelope_id.is_none() {
            if let Some(id) = &counterparty_id {
                draft.envelope_id =
                    suggest_envelope(store, &accounts, id, &mut recent_cache).await?;
            }
        }

        let mut candidate = TransactionCandidate::new(draft, source_name, destination_name);
        let dup_ids = find_duplicates(&candidate.draft, &existing);
        if !dup_ids.is_empty() {
            tracing::info!(
                note = %candidate.draft.note,
                matches = dup_ids.len(),
                "candidate matches existing transactions"
            );
        }
        candidate.set_duplicate_ids(dup_ids);
        candidates.push(candidate);
    }

    Ok(candidates)
}

/// Most recent envelope used with an external counterparty, if any. Internal
/// counterparties (transfers) get no suggestion.
async fn suggest_envelope<S: BudgetStore + ?Sized>(
    store: &S,
    accounts: &[Account],
    counterparty: &AccountId,
    cache: &mut HashMap<AccountId, Option<EnvelopeId>>,
) -> Result<Option<EnvelopeId>, StoreError> {
    if let Some(cached) = cache.get(counterparty) {
        return Ok(cached.clone());
    }

    let account = accounts
        .iter()
        .find(|a| a.id.as_ref() == Some(counterparty));
    let suggestion = match account {
        Some(account) if account.external => store
            .recent_envelopes(account)
            .await?
            .into_iter()
            .next()
            .map(|env| env.id),
        _ => None,
    };

    cache.insert(counterparty.clone(), suggestion.clone());
    Ok(suggestion)
}
