// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

/// HTTP response with status and fully buffered body
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client abstraction for testability
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Issue a GET request and buffer the whole response body
    async fn get(&self, url: &str) -> Result<HttpResponse, reqwest::Error>;
}

#[async_trait]
impl<T: HttpClient + ?Sized> HttpClient for Arc<T> {
    async fn get(&self, url: &str) -> Result<HttpResponse, reqwest::Error> {
        (**self).get(url).await
    }
}

/// Default HTTP client implementation using reqwest
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Create a new ReqwestClient with default settings
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Create a new ReqwestClient with a custom reqwest::Client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, reqwest::Error> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use tokio::sync::Semaphore;

    use super::*;

    /// Canned-response client with per-URL hit counters and optional gates
    ///
    /// A gated URL holds its response until a permit is added to the gate,
    /// which keeps a request in flight for as long as a test needs.
    #[derive(Default)]
    pub struct MockHttpClient {
        routes: Mutex<HashMap<String, (u16, String)>>,
        hits: Mutex<HashMap<String, usize>>,
        gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    }

    impl MockHttpClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn route(self, url: &str, status: u16, body: &str) -> Self {
            self.set_route(url, status, body);
            self
        }

        pub fn set_route(&self, url: &str, status: u16, body: &str) {
            self.routes
                .lock()
                .unwrap()
                .insert(url.to_string(), (status, body.to_string()));
        }

        /// Close the gate for `url`; responses wait for a permit each
        pub fn gate(&self, url: &str) -> Arc<Semaphore> {
            let gate = Arc::new(Semaphore::new(0));
            self.gates
                .lock()
                .unwrap()
                .insert(url.to_string(), gate.clone());
            gate
        }

        pub fn hits(&self, url: &str) -> usize {
            self.hits.lock().unwrap().get(url).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn get(&self, url: &str) -> Result<HttpResponse, reqwest::Error> {
            *self.hits.lock().unwrap().entry(url.to_string()).or_insert(0) += 1;

            let gate = self.gates.lock().unwrap().get(url).cloned();
            if let Some(gate) = gate {
                gate.acquire().await.unwrap().forget();
            }

            let (status, body) = self
                .routes
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .unwrap_or((404, "null".to_string()));

            Ok(HttpResponse {
                status,
                body: Bytes::from(body),
            })
        }
    }
}
