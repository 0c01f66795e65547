use thiserror::Error;

use fiscus_core::{Account, AccountId, Transaction};
use fiscus_remote::{BudgetStore, StoreError};

use crate::preview::TransactionCandidate;

#[derive(Debug, Error)]
pub enum CommitError {
    #[error("could not create account \"{name}\": {source}")]
    AccountCreation {
        name: String,
        #[source]
        source: StoreError,
    },
    #[error("could not create transaction: {0}")]
    TransactionCreation(#[source] StoreError),
    #[error("{side} account is neither selected nor named")]
    UnresolvedEndpoint { side: &'static str },
}

/// Turn a candidate into a persisted transaction. Works on a draft captured
/// at entry, so later edits to the candidate cannot leak into an in-flight
/// commit. Unresolved endpoints are created as external accounts first,
/// source and destination independently and concurrently; the transaction
/// create is only issued once both sides hold an id. Any failure leaves the
/// remote transaction store untouched beyond what already succeeded, and
/// the caller's candidate unchanged.
pub async fn commit<S: BudgetStore + ?Sized>(
    store: &S,
    candidate: &TransactionCandidate,
) -> Result<Transaction, CommitError> {
    let mut draft = candidate.draft.clone();

    let (source, destination) = tokio::join!(
        resolve_endpoint(
            store,
            draft.source_account_id.clone(),
            candidate.source_account_name.as_deref(),
            "source",
        ),
        resolve_endpoint(
            store,
            draft.destination_account_id.clone(),
            candidate.destination_account_name.as_deref(),
            "destination",
        ),
    );
    draft.source_account_id = Some(source?);
    draft.destination_account_id = Some(destination?);

    let tx = store
        .create_transaction(&Transaction::from_draft(draft))
        .await
        .map_err(CommitError::TransactionCreation)?;
    tracing::info!(
        id = %tx.id.as_ref().map(|i| i.0.as_str()).unwrap_or("?"),
        amount_cents = tx.amount_cents,
        "transaction committed"
    );
    Ok(tx)
}

/// An endpoint already holding an id passes through; one holding only a name
/// becomes a freshly created external account.
async fn resolve_endpoint<S: BudgetStore + ?Sized>(
    store: &S,
    id: Option<AccountId>,
    name: Option<&str>,
    side: &'static str,
) -> Result<AccountId, CommitError> {
    if let Some(id) = id {
        return Ok(id);
    }
    let name = name.ok_or(CommitError::UnresolvedEndpoint { side })?;
    let created = store
        .create_account(&Account::external(name))
        .await
        .map_err(|source| CommitError::AccountCreation {
            name: name.to_string(),
            source,
        })?;
    tracing::info!(name, side, "created external account during commit");
    created.id.ok_or(CommitError::AccountCreation {
        name: name.to_string(),
        source: StoreError::MissingId { kind: "accounts" },
    })
}
