use crate::core::error::{Error, ErrorKind, Result};
use crate::core::fetcher::HistoryFetcher;
use crate::core::record::to_epoch_seconds;
use chrono::{DateTime, Utc};
use log::debug;
use reqwest::{Client, Response};
use std::time::Duration;

/// Fetches history from `GET <url>?after=<epoch seconds>`.
#[derive(Debug, Clone)]
pub struct HttpHistoryFetcher {
    client: Client,
    url: String,
    token: Option<String>,
}

impl HttpHistoryFetcher {
    pub fn new(
        url: String,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            let message = "failed to build http client".into();
            Error::wrap(message, ErrorKind::Config, e)
        })?;
        Ok(Self { client, url, token })
    }
}

fn fetch_err(message: &str) -> impl FnOnce(reqwest::Error) -> Error + '_ {
    move |e| Error::wrap(message.into(), ErrorKind::Fetch, e)
}

async fn read_failure(res: Response) -> Error {
    let status = res.status();
    match res.text().await {
        Ok(reason) => Error::new(
            format!(
                "failed to fetch notification history({}): {}",
                status, reason
            ),
            ErrorKind::Fetch,
        ),
        Err(e) => fetch_err("failed to read response body")(e),
    }
}

impl HistoryFetcher for HttpHistoryFetcher {
    async fn fetch_history(
        &self,
        after: Option<DateTime<Utc>>,
    ) -> Result<Vec<u8>> {
        let mut req = self.client.get(&self.url);
        if let Some(after) = after {
            let after = to_epoch_seconds(after).to_string();
            req = req.query(&[("after", after)]);
        }
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let res = req
            .send()
            .await
            .map_err(fetch_err("failed to execute request"))?;
        if !res.status().is_success() {
            return Err(read_failure(res).await);
        }
        let body = res
            .bytes()
            .await
            .map_err(fetch_err("failed to read response body"))?;
        debug!("fetched {} byte(s) of notification history", body.len());
        Ok(body.to_vec())
    }
}
