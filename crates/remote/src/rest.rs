use serde_json::Value;

use fiscus_core::{Account, EnvelopeRef};

use crate::error::StoreError;
use crate::resource::Resource;

/// HTTP client for the budget resource store. One generic repository serves
/// every resource kind: collections live under the configured budget, single
/// records at the top level, and every response wraps its payload in a
/// `data` envelope.
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    budget_id: String,
}

impl RestClient {
    pub fn new(base_url: &str, budget_id: &str) -> Self {
        RestClient {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            budget_id: budget_id.to_string(),
        }
    }

    fn collection_url(&self, kind: &str) -> String {
        format!("{}/budgets/{}/{}", self.base_url, self.budget_id, kind)
    }

    fn record_url(&self, kind: &str, id: &str) -> String {
        format!("{}/{}/{}", self.base_url, kind, id)
    }

    pub async fn list<T: Resource>(&self, filters: &[(&str, &str)]) -> Result<Vec<T>, StoreError> {
        let response = self
            .http
            .get(self.collection_url(T::KIND))
            .query(filters)
            .send()
            .await?;
        let body = Self::into_data(response, T::KIND).await?;
        Ok(serde_json::from_value(body)?)
    }

    pub async fn get<T: Resource>(&self, id: &str) -> Result<T, StoreError> {
        let response = self.http.get(self.record_url(T::KIND, id)).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound {
                kind: T::KIND,
                id: id.to_string(),
            });
        }
        let body = Self::into_data(response, T::KIND).await?;
        Ok(serde_json::from_value(body)?)
    }

    pub async fn create<T: Resource>(&self, record: &T) -> Result<T, StoreError> {
        let mut payload = serde_json::to_value(record)?;
        // The store assigns ids; a locally-minted one must never be sent.
        if let Some(map) = payload.as_object_mut() {
            map.remove("id");
        }
        let response = self
            .http
            .post(self.collection_url(T::KIND))
            .json(&serde_json::json!({ "data": payload }))
            .send()
            .await?;
        let body = Self::into_data(response, T::KIND).await?;
        Ok(serde_json::from_value(body)?)
    }

    pub async fn update<T: Resource>(&self, record: &T) -> Result<T, StoreError> {
        let id = record.id().ok_or(StoreError::MissingId { kind: T::KIND })?;
        let payload = serde_json::to_value(record)?;
        let response = self
            .http
            .patch(self.record_url(T::KIND, &id))
            .json(&serde_json::json!({ "data": payload }))
            .send()
            .await?;
        let body = Self::into_data(response, T::KIND).await?;
        Ok(serde_json::from_value(body)?)
    }

    pub async fn delete<T: Resource>(&self, record: &T) -> Result<(), StoreError> {
        let id = record.id().ok_or(StoreError::MissingId { kind: T::KIND })?;
        let response = self
            .http
            .delete(self.record_url(T::KIND, &id))
            .send()
            .await?;
        Self::check_status(response, T::KIND).await?;
        Ok(())
    }

    /// Most-recently-used envelopes for an account, newest first. Follows the
    /// account's `recent-envelopes` link when present, the conventional
    /// sub-resource path otherwise.
    pub async fn recent_envelopes(
        &self,
        account: &Account,
    ) -> Result<Vec<EnvelopeRef>, StoreError> {
        let url = match account.links.get("recent-envelopes") {
            Some(link) => link.clone(),
            None => {
                let id = Resource::id(account).ok_or(StoreError::MissingId {
                    kind: Account::KIND,
                })?;
                format!("{}/accounts/{}/recent-envelopes", self.base_url, id)
            }
        };
        let response = self.http.get(url).send().await?;
        let body = Self::into_data(response, "recent-envelopes").await?;
        Ok(serde_json::from_value(body)?)
    }

    async fn check_status(
        response: reqwest::Response,
        kind: &'static str,
    ) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = match response.text().await {
            Ok(body) if !body.is_empty() => body,
            _ => status.to_string(),
        };
        tracing::warn!(kind, %status, "remote store rejected request");
        Err(StoreError::Rejected { kind, message })
    }

    async fn into_data(
        response: reqwest::Response,
        kind: &'static str,
    ) -> Result<Value, StoreError> {
        let response = Self::check_status(response, kind).await?;
        let mut body: Value = response.json().await?;
        let data = body.as_object_mut().and_then(|map| map.remove("data"));
        Ok(data.unwrap_or(body))
    }
}
