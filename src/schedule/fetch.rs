use std::time::Duration;

use bytes::Bytes;
use reqwest::Client;
use tracing::{instrument, warn};

use crate::error::FetchError;
use crate::sync::do_sync;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Source of raw schedule documents.
pub trait Fetch {
    fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

/// Fetches over HTTP, retrying transport failures and non-2xx answers a bounded
/// number of times.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    attempts: u32,
}

impl HttpFetcher {
    pub fn new(attempts: u32) -> Self {
        Self {
            client: Client::new(),
            attempts: attempts.max(1),
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<Bytes, FetchError> {
        let request_error = |source| FetchError::Request {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.bytes().await.map_err(request_error)
    }
}

impl Fetch for HttpFetcher {
    #[instrument(skip(self))]
    fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        let attempts = self.attempts;
        let result = do_sync(async move {
            let mut attempt = 1;
            loop {
                match self.fetch_once(url).await {
                    Ok(body) => return Ok(body),
                    Err(e) if attempt < attempts => {
                        warn!(error = %e, "fetch attempt {attempt} of {attempts} failed");
                        tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                        attempt += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
        });

        result.map_err(|e| FetchError::Runtime(e.to_string()))?
    }
}

#[cfg(test)]
mod test {
    use crate::error::FetchError;
    use crate::schedule::fetch::{Fetch, HttpFetcher};

    #[test]
    pub fn test_at_least_one_attempt() {
        assert_eq!(HttpFetcher::new(0).attempts, 1);
        assert_eq!(HttpFetcher::new(3).attempts, 3);
    }

    #[test]
    pub fn test_unreachable_is_request_error() {
        // nothing listens on the discard port
        let fetcher = HttpFetcher::new(1);
        match fetcher.fetch("http://127.0.0.1:9/noa.cgi") {
            Err(FetchError::Request { url, .. }) => assert_eq!(url, "http://127.0.0.1:9/noa.cgi"),
            other => panic!("expected request error, got {other:?}"),
        }
    }
}
