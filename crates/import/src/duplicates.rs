use fiscus_core::{AccountId, Transaction, TransactionDraft, TransactionId};

/// Ids of every persisted transaction the draft duplicates: same account
/// pairing (from either side's point of view), same date, same amount to the
/// cent. A draft side still pending resolution (no id yet) matches any
/// counterparty; the history list is already scoped to the import target, so
/// date and amount carry the comparison.
pub fn find_duplicates(draft: &TransactionDraft, existing: &[Transaction]) -> Vec<TransactionId> {
    existing
        .iter()
        .filter(|tx| tx.date == draft.date && tx.amount_cents == draft.amount_cents)
        .filter(|tx| pairing_matches(draft, tx))
        .filter_map(|tx| tx.id.clone())
        .collect()
}

fn pairing_matches(draft: &TransactionDraft, tx: &Transaction) -> bool {
    let straight = side_matches(&draft.source_account_id, &tx.source_account_id)
        && side_matches(&draft.destination_account_id, &tx.destination_account_id);
    let flipped = side_matches(&draft.source_account_id, &tx.destination_account_id)
        && side_matches(&draft.destination_account_id, &tx.source_account_id);
    straight || flipped
}

fn side_matches(draft_side: &Option<AccountId>, existing_side: &Option<AccountId>) -> bool {
    match draft_side {
        None => true,
        Some(id) => existing_side.as_ref() == Some(id),
    }
}
