use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use fiscus_core::{
    Account, AccountId, EnvelopeRef, MatchRule, RuleId, Transaction, TransactionId,
};

use crate::error::StoreError;
use crate::store::BudgetStore;

/// In-memory budget store. Backs tests and offline runs the way the real
/// store would: it mints ids, stamps `created_at` on rules, and can be told
/// to reject writes touching particular records so partial-failure paths can
/// be exercised.
#[derive(Default)]
pub struct MemoryStore {
    accounts: Mutex<Vec<Account>>,
    transactions: Mutex<Vec<Transaction>>,
    rules: Mutex<Vec<MatchRule>>,
    recent: Mutex<HashMap<AccountId, Vec<EnvelopeRef>>>,
    denied: Mutex<Vec<String>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn mint(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Any write whose record name, note, or pattern contains `token` fails
    /// with a rejected-request error from then on.
    pub fn deny_writes_on(&self, token: &str) {
        self.denied.lock().unwrap().push(token.to_string());
    }

    fn check_denied(&self, kind: &'static str, text: &str) -> Result<(), StoreError> {
        let denied = self.denied.lock().unwrap();
        if denied.iter().any(|token| text.contains(token.as_str())) {
            return Err(StoreError::Rejected {
                kind,
                message: format!("write denied for \"{text}\""),
            });
        }
        Ok(())
    }

    pub fn seed_account(&self, mut account: Account) -> Account {
        account.id = Some(AccountId(self.mint("acct")));
        self.accounts.lock().unwrap().push(account.clone());
        account
    }

    pub fn seed_transaction(&self, mut tx: Transaction) -> Transaction {
        tx.id = Some(TransactionId(self.mint("trn")));
        self.transactions.lock().unwrap().push(tx.clone());
        tx
    }

    pub fn seed_rule(&self, mut rule: MatchRule) -> MatchRule {
        rule.id = RuleId(self.mint("rule"));
        rule.created_at = Some(Utc::now());
        self.rules.lock().unwrap().push(rule.clone());
        rule
    }

    pub fn set_recent_envelopes(&self, account: &AccountId, envelopes: Vec<EnvelopeRef>) {
        self.recent.lock().unwrap().insert(account.clone(), envelopes);
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.accounts.lock().unwrap().clone()
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.transactions.lock().unwrap().clone()
    }

    pub fn rules(&self) -> Vec<MatchRule> {
        self.rules.lock().unwrap().clone()
    }
}

#[async_trait]
impl BudgetStore for MemoryStore {
    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        Ok(self.accounts())
    }

    async fn create_account(&self, account: &Account) -> Result<Account, StoreError> {
        self.check_denied("accounts", &account.name)?;
        let mut created = account.clone();
        created.id = Some(AccountId(self.mint("acct")));
        self.accounts.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn list_transactions(
        &self,
        account: &AccountId,
    ) -> Result<Vec<Transaction>, StoreError> {
        Ok(self
            .transactions
            .lock()
            .unwrap()
            .iter()
            .filter(|tx| {
                tx.source_account_id.as_ref() == Some(account)
                    || tx.destination_account_id.as_ref() == Some(account)
            })
            .cloned()
            .collect())
    }

    async fn create_transaction(&self, tx: &Transaction) -> Result<Transaction, StoreError> {
        self.check_denied("transactions", &tx.note)?;
        let mut created = tx.clone();
        created.id = Some(TransactionId(self.mint("trn")));
        self.transactions.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn list_match_rules(&self) -> Result<Vec<MatchRule>, StoreError> {
        Ok(self.rules())
    }

    async fn create_match_rule(&self, rule: &MatchRule) -> Result<MatchRule, StoreError> {
        self.check_denied("matchRules", &rule.pattern)?;
        let mut created = rule.clone();
        created.id = RuleId(self.mint("rule"));
        created.created_at = Some(Utc::now());
        self.rules.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update_match_rule(&self, rule: &MatchRule) -> Result<MatchRule, StoreError> {
        self.check_denied("matchRules", &rule.pattern)?;
        let mut rules = self.rules.lock().unwrap();
        match rules.iter_mut().find(|r| r.id == rule.id) {
            Some(slot) => {
                *slot = rule.clone();
                Ok(rule.clone())
            }
            None => Err(StoreError::NotFound {
                kind: "matchRules",
                id: rule.id.0.clone(),
            }),
        }
    }

    async fn delete_match_rule(&self, rule: &MatchRule) -> Result<(), StoreError> {
        self.check_denied("matchRules", &rule.pattern)?;
        let mut rules = self.rules.lock().unwrap();
        let before = rules.len();
        rules.retain(|r| r.id != rule.id);
        if rules.len() == before {
            return Err(StoreError::NotFound {
                kind: "matchRules",
                id: rule.id.0.clone(),
            });
        }
        Ok(())
    }

    async fn recent_envelopes(&self, account: &Account) -> Result<Vec<EnvelopeRef>, StoreError> {
        let id = match &account.id {
            Some(id) => id.clone(),
            None => return Ok(Vec::new()),
        };
        Ok(self
            .recent
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }
}
