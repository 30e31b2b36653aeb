/// Network seam of the archive client
///
/// Everything the archive logic needs from HTTP is two GETs: one that
/// returns text (directory listings, `times*.txt`) and one that returns
/// bytes (stills and movies). `HttpTransport` does this with reqwest;
/// tests substitute the in-memory `mock::MockTransport`.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{Error, Result};

#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url` and return the decoded body text
    async fn get_text(&self, url: &str) -> Result<String>;

    /// GET `url` and return the raw body
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

/// reqwest-backed transport with a bounded per-request timeout
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sdo-frame/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| Error::Http {
                url: String::new(),
                source,
            })?;
        Ok(Self { client })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| Error::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_text(&self, url: &str) -> Result<String> {
        self.get(url)
            .await?
            .text()
            .await
            .map_err(|source| Error::Http {
                url: url.to_string(),
                source,
            })
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self
            .get(url)
            .await?
            .bytes()
            .await
            .map_err(|source| Error::Http {
                url: url.to_string(),
                source,
            })?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned bodies and records every requested URL
    ///
    /// Unknown URLs answer 404.
    #[derive(Debug, Default)]
    pub struct MockTransport {
        routes: HashMap<String, Vec<u8>>,
        requests: Mutex<Vec<String>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn route(mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
            self.routes.insert(url.into(), body.into());
            self
        }

        /// Every URL requested so far, in order
        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }

        /// How many times `url` was requested
        pub fn hits(&self, url: &str) -> usize {
            self.requests().iter().filter(|u| u.as_str() == url).count()
        }

        fn serve(&self, url: &str) -> Result<Vec<u8>> {
            self.requests.lock().unwrap().push(url.to_string());
            self.routes.get(url).cloned().ok_or_else(|| Error::Status {
                url: url.to_string(),
                status: 404,
            })
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn get_text(&self, url: &str) -> Result<String> {
            Ok(String::from_utf8_lossy(&self.serve(url)?).into_owned())
        }

        async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
            self.serve(url)
        }
    }
}
