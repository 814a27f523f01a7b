//! Implements `RemoteSource` over HTTP with `reqwest`.

use crate::api::RemoteSource;
use crate::error::{Error, Result};
use crate::model::{decode_transactions, Transaction};
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, trace};
use url::Url;

/// The path of the transaction list below the base URL.
const TRANSACTIONS_PATH: &str = "transactions.json";

/// Fetches the transaction list from `{base_url}/transactions.json`.
pub struct HttpSource {
    client: reqwest::Client,
    url: Url,
}

impl HttpSource {
    pub fn new(base_url: &Url) -> Result<Self> {
        let url = base_url
            .join(TRANSACTIONS_PATH)
            .map_err(|e| Error::Transport(format!("invalid base URL: {e}")))?;
        Ok(Self {
            client: reqwest::Client::new(),
            url,
        })
    }
}

#[async_trait::async_trait]
impl RemoteSource for HttpSource {
    async fn fetch_all(&self) -> Result<Vec<Transaction>> {
        trace!("GET {}", self.url);
        let response = self
            .client
            .get(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        let transactions = decode_transactions(&body)?;
        debug!("fetched {} transactions", transactions.len());
        Ok(transactions)
    }
}
