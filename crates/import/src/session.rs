use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use fiscus_core::{Account, Transaction};
use fiscus_remote::{BudgetStore, StoreError};
use fiscus_storage::{SessionStore, StorageError};

use crate::parse::{FileParser, ParseError};
use crate::preview::{self, TransactionCandidate};
use crate::reconcile::{self, CommitError};

/// Key the session snapshot lives under in the durable store. External
/// callers (the resume banner) only need to probe for its presence.
pub const SESSION_KEY: &str = "import_session";
const FINGERPRINT_KEY: &str = "imported_statements";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    NotStarted,
    AwaitingFile,
    Previewing,
    Completed,
    Cancelled,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no import target account selected")]
    NoTargetAccount,
    #[error("import target account has no remote id")]
    TargetWithoutId,
    #[error("an import is already in progress")]
    ImportInProgress,
    #[error("no import is in progress")]
    NotPreviewing,
    #[error("no candidate at the cursor")]
    NoCurrentCandidate,
    #[error("candidate was already processed")]
    AlreadyProcessed,
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Persistence(#[from] StorageError),
    #[error("saved session state is unreadable: {0}")]
    Snapshot(#[from] serde_json::Error),
    #[error(transparent)]
    Commit(#[from] CommitError),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    target: Account,
    cursor: usize,
    candidates: Vec<TransactionCandidate>,
}

enum Direction {
    Forward,
    Backward,
}

/// The import review session: the ordered candidate list, the cursor, and
/// the durable snapshot that makes the whole thing survive a reload.
/// Navigation only ever lands on unprocessed candidates; dismiss and commit
/// are the only operations that mark one processed. Every transition writes
/// the snapshot; cancellation and completion remove it.
pub struct ImportSession<K: SessionStore> {
    sessions: K,
    phase: SessionPhase,
    target: Option<Account>,
    candidates: Vec<TransactionCandidate>,
    cursor: usize,
}

impl<K: SessionStore> ImportSession<K> {
    pub fn new(sessions: K) -> Self {
        ImportSession {
            sessions,
            phase: SessionPhase::NotStarted,
            target: None,
            candidates: Vec::new(),
            cursor: 0,
        }
    }

    /// Restore a previously persisted session, if one exists, back into
    /// `Previewing` at its saved cursor.
    pub async fn resume(sessions: K) -> Result<Option<Self>, SessionError> {
        let Some(raw) = sessions.load(SESSION_KEY).await? else {
            return Ok(None);
        };
        let snapshot: Snapshot = serde_json::from_str(&raw)?;
        tracing::info!(
            candidates = snapshot.candidates.len(),
            cursor = snapshot.cursor,
            "resuming import session"
        );
        Ok(Some(ImportSession {
            sessions,
            phase: SessionPhase::Previewing,
            target: Some(snapshot.target),
            candidates: snapshot.candidates,
            cursor: snapshot.cursor,
        }))
    }

    /// Whether a persisted session is waiting to be resumed.
    pub async fn has_saved_session(sessions: &K) -> Result<bool, SessionError> {
        Ok(sessions.load(SESSION_KEY).await?.is_some())
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn target(&self) -> Option<&Account> {
        self.target.as_ref()
    }

    pub fn candidates(&self) -> &[TransactionCandidate] {
        &self.candidates
    }

    pub fn candidate(&self, index: usize) -> Option<&TransactionCandidate> {
        self.candidates.get(index)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<&TransactionCandidate> {
        self.candidates.get(self.cursor)
    }

    /// Choose the account the statement belongs to. Allowed any time no
    /// import is mid-review.
    pub fn select_account(&mut self, account: Account) -> Result<(), SessionError> {
        if self.phase == SessionPhase::Previewing {
            return Err(SessionError::ImportInProgress);
        }
        if account.id.is_none() {
            return Err(SessionError::TargetWithoutId);
        }
        self.target = Some(account);
        self.phase = SessionPhase::AwaitingFile;
        Ok(())
    }

    /// Parse a statement and build the review list. Parse failures are
    /// terminal for the file and leave no trace; the session stays in
    /// `AwaitingFile` for another attempt.
    pub async fn start_import<S: BudgetStore + ?Sized>(
        &mut self,
        store: &S,
        parser: &dyn FileParser,
        bytes: &[u8],
    ) -> Result<usize, SessionError> {
        match self.phase {
            SessionPhase::AwaitingFile => {}
            SessionPhase::Previewing => return Err(SessionError::ImportInProgress),
            _ => return Err(SessionError::NoTargetAccount),
        }
        let target = self.target.clone().ok_or(SessionError::NoTargetAccount)?;

        let records = parser.parse(bytes)?;

        let digest = fingerprint(bytes);
        if self.known_fingerprints().await?.contains(&digest) {
            tracing::warn!(
                "statement bytes were imported before; duplicate detection will flag re-imports"
            );
        }

        let candidates = preview::build_candidates(store, &target, records).await?;
        tracing::info!(
            count = candidates.len(),
            target = %target.name,
            "statement preview built"
        );

        self.candidates = candidates;
        self.cursor = 0;
        if self.candidates.is_empty() {
            self.phase = SessionPhase::Completed;
            return Ok(0);
        }
        self.phase = SessionPhase::Previewing;
        self.persist().await?;
        self.remember_fingerprint(digest).await?;
        Ok(self.candidates.len())
    }

    /// Mutate the current candidate in place. Does not advance the cursor or
    /// touch the processed flag.
    pub async fn edit_current(
        &mut self,
        edit: impl FnOnce(&mut TransactionCandidate),
    ) -> Result<(), SessionError> {
        self.require_previewing()?;
        let candidate = self
            .candidates
            .get_mut(self.cursor)
            .ok_or(SessionError::NoCurrentCandidate)?;
        edit(candidate);
        self.persist().await
    }

    pub async fn go_next(&mut self) -> Result<SessionPhase, SessionError> {
        self.navigate(Direction::Forward).await
    }

    pub async fn go_previous(&mut self) -> Result<SessionPhase, SessionError> {
        self.navigate(Direction::Backward).await
    }

    /// Advance without deciding: the candidate stays unprocessed and will be
    /// offered again on a later pass.
    pub async fn skip(&mut self) -> Result<SessionPhase, SessionError> {
        self.navigate(Direction::Forward).await
    }

    /// Drop the current candidate without importing it. Already-processed
    /// candidates are left alone, so a repeated dismiss neither advances nor
    /// errors.
    pub async fn dismiss_current(&mut self) -> Result<SessionPhase, SessionError> {
        self.require_previewing()?;
        let candidate = self
            .candidates
            .get(self.cursor)
            .ok_or(SessionError::NoCurrentCandidate)?;
        if candidate.processed() {
            return Ok(self.phase);
        }
        self.candidates[self.cursor].mark_processed();
        tracing::info!(index = self.cursor, "candidate dismissed");
        self.navigate(Direction::Forward).await
    }

    /// Commit the current candidate: resolve its endpoints, create the
    /// transaction remotely, then mark it processed and advance. Failure
    /// changes nothing; the candidate stays current and editable for an
    /// in-place retry.
    pub async fn commit_current<S: BudgetStore + ?Sized>(
        &mut self,
        store: &S,
    ) -> Result<Transaction, SessionError> {
        self.require_previewing()?;
        let index = self.cursor;
        let candidate = self
            .candidates
            .get(index)
            .ok_or(SessionError::NoCurrentCandidate)?
            .clone();
        if candidate.processed() {
            return Err(SessionError::AlreadyProcessed);
        }

        let tx = reconcile::commit(store, &candidate).await?;

        // A commit resolving after cancellation must not revive the session.
        if self.phase != SessionPhase::Previewing {
            return Ok(tx);
        }
        let slot = &mut self.candidates[index];
        slot.draft.source_account_id = tx.source_account_id.clone();
        slot.draft.destination_account_id = tx.destination_account_id.clone();
        slot.mark_processed();
        self.navigate(Direction::Forward).await?;
        Ok(tx)
    }

    /// Abandon the session. Transactions committed for earlier candidates
    /// stay committed; everything else is discarded.
    pub async fn cancel(&mut self) -> Result<(), SessionError> {
        self.phase = SessionPhase::Cancelled;
        self.candidates.clear();
        self.target = None;
        self.sessions.remove(SESSION_KEY).await?;
        tracing::info!("import session cancelled");
        Ok(())
    }

    fn require_previewing(&self) -> Result<(), SessionError> {
        if self.phase != SessionPhase::Previewing {
            return Err(SessionError::NotPreviewing);
        }
        Ok(())
    }

    /// The nearest unprocessed index, preferring the requested direction and
    /// falling back to the other. The current index never qualifies.
    fn nearest_unprocessed(&self, direction: Direction) -> Option<usize> {
        let forward = (self.cursor + 1..self.candidates.len())
            .find(|&i| !self.candidates[i].processed());
        let backward = (0..self.cursor)
            .rev()
            .find(|&i| !self.candidates[i].processed());
        match direction {
            Direction::Forward => forward.or(backward),
            Direction::Backward => backward.or(forward),
        }
    }

    async fn navigate(&mut self, direction: Direction) -> Result<SessionPhase, SessionError> {
        self.require_previewing()?;
        match self.nearest_unprocessed(direction) {
            Some(index) => {
                self.cursor = index;
                self.persist().await?;
                Ok(SessionPhase::Previewing)
            }
            None => self.complete().await,
        }
    }

    async fn complete(&mut self) -> Result<SessionPhase, SessionError> {
        self.phase = SessionPhase::Completed;
        self.sessions.remove(SESSION_KEY).await?;
        tracing::info!("import session completed");
        Ok(SessionPhase::Completed)
    }

    async fn persist(&self) -> Result<(), SessionError> {
        let target = self.target.as_ref().ok_or(SessionError::NoTargetAccount)?;
        let snapshot = Snapshot {
            target: target.clone(),
            cursor: self.cursor,
            candidates: self.candidates.clone(),
        };
        let raw = serde_json::to_string(&snapshot)?;
        self.sessions.save(SESSION_KEY, &raw).await?;
        Ok(())
    }

    async fn known_fingerprints(&self) -> Result<Vec<String>, SessionError> {
        match self.sessions.load(FINGERPRINT_KEY).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    async fn remember_fingerprint(&self, digest: String) -> Result<(), SessionError> {
        let mut known = self.known_fingerprints().await?;
        if !known.contains(&digest) {
            known.push(digest);
            self.sessions
                .save(FINGERPRINT_KEY, &serde_json::to_string(&known)?)
                .await?;
        }
        Ok(())
    }
}

fn fingerprint(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fiscus_remote::MemoryStore;
    use fiscus_storage::MemorySessionStore;

    use crate::parse::RawImportRecord;

    struct StubParser(Vec<RawImportRecord>);

    impl FileParser for StubParser {
        fn parse(&self, _bytes: &[u8]) -> Result<Vec<RawImportRecord>, ParseError> {
            Ok(self.0.clone())
        }
    }

    struct FailingParser(fn() -> ParseError);

    impl FileParser for FailingParser {
        fn parse(&self, _bytes: &[u8]) -> Result<Vec<RawImportRecord>, ParseError> {
            Err((self.0)())
        }
    }

    fn record(description: &str, cents: i64, day: u32) -> RawImportRecord {
        RawImportRecord {
            description: description.to_string(),
            amount_cents: cents,
            date: NaiveDate::from_ymd_opt(2026, 7, day).unwrap(),
            extra: Default::default(),
        }
    }

    fn three_records() -> Vec<RawImportRecord> {
        vec![
            record("ACME PAYROLL", 250000, 1),
            record("GROCERY MART", -8000, 2),
            record("CORNER CAFE", -420, 3),
        ]
    }

    async fn previewing(
        store: &MemoryStore,
        records: Vec<RawImportRecord>,
    ) -> (ImportSession<MemorySessionStore>, MemorySessionStore) {
        let sessions = MemorySessionStore::new();
        let mut session = ImportSession::new(sessions.clone());
        let target = store.seed_account(Account::internal("Checking"));
        session.select_account(target).unwrap();
        session
            .start_import(store, &StubParser(records), b"statement-bytes")
            .await
            .unwrap();
        (session, sessions)
    }

    #[tokio::test]
    async fn start_import_requires_a_target_account() {
        let store = MemoryStore::new();
        let mut session = ImportSession::new(MemorySessionStore::new());
        let err = session
            .start_import(&store, &StubParser(three_records()), b"x")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NoTargetAccount));
    }

    #[tokio::test]
    async fn selecting_an_account_without_id_is_rejected() {
        let mut session = ImportSession::new(MemorySessionStore::new());
        let err = session.select_account(Account::internal("Unsaved")).unwrap_err();
        assert!(matches!(err, SessionError::TargetWithoutId));
    }

    #[tokio::test]
    async fn parse_failure_is_terminal_and_persists_nothing() {
        let store = MemoryStore::new();
        let sessions = MemorySessionStore::new();
        let mut session = ImportSession::new(sessions.clone());
        let target = store.seed_account(Account::internal("Checking"));
        session.select_account(target).unwrap();

        let err = session
            .start_import(&store, &FailingParser(|| ParseError::NoParserAvailable), b"???")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Parse(ParseError::NoParserAvailable)
        ));
        assert_eq!(session.phase(), SessionPhase::AwaitingFile);
        assert!(!ImportSession::has_saved_session(&sessions).await.unwrap());

        // An already-converted file is just as terminal, and just as
        // recoverable with a different file.
        let err = session
            .start_import(&store, &FailingParser(|| ParseError::AlreadyConverted), b"???")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Parse(ParseError::AlreadyConverted)
        ));
        assert_eq!(session.phase(), SessionPhase::AwaitingFile);

        let count = session
            .start_import(&store, &StubParser(three_records()), b"retry")
            .await
            .unwrap();
        assert_eq!(count, 3);
        assert_eq!(session.phase(), SessionPhase::Previewing);
    }

    #[tokio::test]
    async fn a_running_import_blocks_account_changes_and_restarts() {
        let store = MemoryStore::new();
        let (mut session, _sessions) = previewing(&store, three_records()).await;

        let other = store.seed_account(Account::internal("Savings"));
        assert!(matches!(
            session.select_account(other).unwrap_err(),
            SessionError::ImportInProgress
        ));
        assert!(matches!(
            session
                .start_import(&store, &StubParser(three_records()), b"again")
                .await
                .unwrap_err(),
            SessionError::ImportInProgress
        ));
    }

    #[tokio::test]
    async fn preview_starts_at_the_first_candidate() {
        let store = MemoryStore::new();
        let (session, sessions) = previewing(&store, three_records()).await;
        assert_eq!(session.phase(), SessionPhase::Previewing);
        assert_eq!(session.cursor(), 0);
        assert_eq!(session.candidates().len(), 3);
        assert!(ImportSession::has_saved_session(&sessions).await.unwrap());
    }

    #[tokio::test]
    async fn navigation_skips_processed_candidates() {
        let store = MemoryStore::new();
        let (mut session, _sessions) = previewing(&store, three_records()).await;

        session.dismiss_current().await.unwrap();
        assert_eq!(session.cursor(), 1);

        session.go_next().await.unwrap();
        assert_eq!(session.cursor(), 2);

        // Backward over index 1; index 0 is processed and must be skipped.
        session.go_previous().await.unwrap();
        assert_eq!(session.cursor(), 1);

        // Nothing unprocessed below; navigation falls forward instead.
        session.go_previous().await.unwrap();
        assert_eq!(session.cursor(), 2);
        assert_eq!(session.phase(), SessionPhase::Previewing);
    }

    #[tokio::test]
    async fn skip_leaves_the_candidate_unprocessed() {
        let store = MemoryStore::new();
        let (mut session, _sessions) = previewing(&store, three_records()).await;

        session.skip().await.unwrap();
        assert_eq!(session.cursor(), 1);
        assert!(!session.candidate(0).unwrap().processed());

        // The skipped candidate is offered again on the way back.
        session.go_previous().await.unwrap();
        assert_eq!(session.cursor(), 0);
    }

    #[tokio::test]
    async fn next_with_no_unprocessed_elsewhere_completes_the_session() {
        let store = MemoryStore::new();
        let (mut session, sessions) = previewing(&store, three_records()).await;

        session.dismiss_current().await.unwrap();
        session.dismiss_current().await.unwrap();
        // Only the current candidate remains unprocessed.
        let phase = session.go_next().await.unwrap();
        assert_eq!(phase, SessionPhase::Completed);
        assert!(!ImportSession::has_saved_session(&sessions).await.unwrap());
    }

    #[tokio::test]
    async fn dismissing_every_candidate_completes_the_session() {
        let store = MemoryStore::new();
        let (mut session, sessions) = previewing(&store, three_records()).await;

        session.dismiss_current().await.unwrap();
        session.dismiss_current().await.unwrap();
        let phase = session.dismiss_current().await.unwrap();
        assert_eq!(phase, SessionPhase::Completed);
        assert!(!ImportSession::has_saved_session(&sessions).await.unwrap());
    }

    #[tokio::test]
    async fn dismiss_is_idempotent_on_a_processed_candidate() {
        let store = MemoryStore::new();
        let (mut session, _sessions) = previewing(&store, three_records()).await;

        session.dismiss_current().await.unwrap();
        assert_eq!(session.cursor(), 1);

        // Point the cursor back at the processed candidate, as a stale UI
        // double-submit would.
        session.cursor = 0;
        let phase = session.dismiss_current().await.unwrap();
        assert_eq!(phase, SessionPhase::Previewing);
        assert_eq!(session.cursor(), 0);
        assert!(!session.candidate(1).unwrap().processed());
    }

    #[tokio::test]
    async fn empty_preview_completes_immediately() {
        let store = MemoryStore::new();
        let sessions = MemorySessionStore::new();
        let mut session = ImportSession::new(sessions.clone());
        let target = store.seed_account(Account::internal("Checking"));
        session.select_account(target).unwrap();

        let count = session
            .start_import(&store, &StubParser(Vec::new()), b"empty")
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(session.phase(), SessionPhase::Completed);
        assert!(!ImportSession::has_saved_session(&sessions).await.unwrap());
    }

    #[tokio::test]
    async fn edits_survive_a_resume() {
        let store = MemoryStore::new();
        let (mut session, sessions) = previewing(&store, three_records()).await;

        session
            .edit_current(|candidate| {
                candidate.draft.note = "Payday".to_string();
            })
            .await
            .unwrap();
        session.go_next().await.unwrap();
        drop(session);

        let resumed = ImportSession::resume(sessions).await.unwrap().unwrap();
        assert_eq!(resumed.phase(), SessionPhase::Previewing);
        assert_eq!(resumed.cursor(), 1);
        assert_eq!(resumed.candidate(0).unwrap().draft.note, "Payday");
    }

    #[tokio::test]
    async fn cancel_discards_saved_state() {
        let store = MemoryStore::new();
        let (mut session, sessions) = previewing(&store, three_records()).await;

        session.cancel().await.unwrap();
        assert_eq!(session.phase(), SessionPhase::Cancelled);
        assert!(session.candidates().is_empty());
        assert!(!ImportSession::has_saved_session(&sessions).await.unwrap());
        assert!(ImportSession::resume(sessions).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn commit_persists_marks_processed_and_advances() {
        let store = MemoryStore::new();
        let (mut session, _sessions) = previewing(&store, three_records()).await;

        let tx = session.commit_current(&store).await.unwrap();
        assert!(tx.id.is_some());
        assert_eq!(store.transactions().len(), 1);
        assert!(session.candidate(0).unwrap().processed());
        assert_eq!(session.cursor(), 1);

        // The counterparty created during commit is reflected in the audit
        // copy of the candidate.
        assert!(session.candidate(0).unwrap().draft.source_account_id.is_some());
    }

    #[tokio::test]
    async fn commit_failure_keeps_the_candidate_current_and_editable() {
        let store = MemoryStore::new();
        let (mut session, sessions) = previewing(&store, three_records()).await;
        store.deny_writes_on("ACME PAYROLL");

        let err = session.commit_current(&store).await.unwrap_err();
        assert!(matches!(err, SessionError::Commit(_)));
        assert_eq!(session.cursor(), 0);
        assert!(!session.candidate(0).unwrap().processed());
        assert_eq!(session.phase(), SessionPhase::Previewing);
        assert!(store.transactions().is_empty());
        assert!(ImportSession::has_saved_session(&sessions).await.unwrap());
    }

    #[tokio::test]
    async fn reimporting_the_same_statement_flags_every_repeat() {
        let store = MemoryStore::new();
        let target = store.seed_account(Account::internal("Checking"));
        let records = three_records();

        let sessions = MemorySessionStore::new();
        let mut first = ImportSession::new(sessions.clone());
        first.select_account(target.clone()).unwrap();
        first
            .start_import(&store, &StubParser(records.clone()), b"statement")
            .await
            .unwrap();
        while first.phase() == SessionPhase::Previewing {
            first.commit_current(&store).await.unwrap();
        }
        assert_eq!(store.transactions().len(), 3);

        let mut second = ImportSession::new(sessions);
        second.select_account(target).unwrap();
        second
            .start_import(&store, &StubParser(records), b"statement")
            .await
            .unwrap();
        assert_eq!(second.phase(), SessionPhase::Previewing);
        for candidate in second.candidates() {
            assert!(!candidate.duplicate_ids().is_empty());
        }
    }

    #[tokio::test]
    async fn cursor_never_rests_on_a_processed_candidate() {
        let store = MemoryStore::new();
        let (mut session, _sessions) = previewing(&store, three_records()).await;

        session.go_next().await.unwrap();
        session.dismiss_current().await.unwrap();
        while session.phase() == SessionPhase::Previewing {
            assert!(
                !session.current().unwrap().processed(),
                "cursor parked on processed candidate"
            );
            session.dismiss_current().await.unwrap();
        }
        assert_eq!(session.phase(), SessionPhase::Completed);
    }

    #[test]
    fn fingerprints_are_stable_and_distinct() {
        assert_eq!(fingerprint(b"abc"), fingerprint(b"abc"));
        assert_ne!(fingerprint(b"abc"), fingerprint(b"abd"));
    }
}
