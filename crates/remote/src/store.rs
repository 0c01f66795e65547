use async_trait::async_trait;

use fiscus_core::{Account, AccountId, EnvelopeRef, MatchRule, Transaction};

use crate::error::StoreError;
use crate::rest::RestClient;

/// The slice of the remote resource store the import engine consumes. Every
/// call is independent; a failure in one never aborts another.
#[async_trait]
pub trait BudgetStore: Send + Sync {
    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError>;

    async fn create_account(&self, account: &Account) -> Result<Account, StoreError>;

    /// Every persisted transaction touching the given account, from either
    /// side of the pairing.
    async fn list_transactions(&self, account: &AccountId)
        -> Result<Vec<Transaction>, StoreError>;

    async fn create_transaction(&self, tx: &Transaction) -> Result<Transaction, StoreError>;

    async fn list_match_rules(&self) -> Result<Vec<MatchRule>, StoreError>;

    async fn create_match_rule(&self, rule: &MatchRule) -> Result<MatchRule, StoreError>;

    async fn update_match_rule(&self, rule: &MatchRule) -> Result<MatchRule, StoreError>;

    async fn delete_match_rule(&self, rule: &MatchRule) -> Result<(), StoreError>;

    /// Most-recently-used envelopes for an account, newest first.
    async fn recent_envelopes(&self, account: &Account) -> Result<Vec<EnvelopeRef>, StoreError>;
}

#[async_trait]
impl BudgetStore for RestClient {
    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        self.list::<Account>(&[]).await
    }

    async fn create_account(&self, account: &Account) -> Result<Account, StoreError> {
        self.create(account).await
    }

    async fn list_transactions(
        &self,
        account: &AccountId,
    ) -> Result<Vec<Transaction>, StoreError> {
        self.list::<Transaction>(&[("account", account.0.as_str())])
            .await
    }

    async fn create_transaction(&self, tx: &Transaction) -> Result<Transaction, StoreError> {
        self.create(tx).await
    }

    async fn list_match_rules(&self) -> Result<Vec<MatchRule>, StoreError> {
        self.list::<MatchRule>(&[]).await
    }

    async fn create_match_rule(&self, rule: &MatchRule) -> Result<MatchRule, StoreError> {
        self.create(rule).await
    }

    async fn update_match_rule(&self, rule: &MatchRule) -> Result<MatchRule, StoreError> {
        self.update(rule).await
    }

    async fn delete_match_rule(&self, rule: &MatchRule) -> Result<(), StoreError> {
        self.delete(rule).await
    }

    async fn recent_envelopes(&self, account: &Account) -> Result<Vec<EnvelopeRef>, StoreError> {
        RestClient::recent_envelopes(self, account).await
    }
}
