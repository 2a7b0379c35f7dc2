//! The HTTP seam every service call goes through.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, COOKIE, USER_AGENT};
use tracing::debug;

use crate::error::{ClientError, Result};

/// Authenticated access to the library service. Stateless across calls.
#[async_trait]
pub trait Session: Send + Sync {
    /// GET `url` and return the response body.
    async fn get(&self, url: &str) -> Result<String>;

    /// POST a form-encoded `body` to `url` and return the response body.
    async fn post(&self, url: &str, body: &str) -> Result<String>;
}

/// reqwest-backed [`Session`] carrying the `wechatSESS_ID` cookie on every request.
pub struct HttpSession {
    client: reqwest::Client,
}

impl HttpSession {
    pub fn new(sessid: &str, user_agent: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .map_err(|e| ClientError::Parse(format!("invalid user agent: {e}")))?,
        );
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("wechatSESS_ID={sessid}"))
                .map_err(|e| ClientError::Parse(format!("invalid session id: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    async fn read_body(resp: reqwest::Response) -> Result<String> {
        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::HttpStatus {
                status: status.as_u16(),
                url: resp.url().to_string(),
            });
        }
        Ok(resp.text().await?)
    }
}

#[async_trait]
impl Session for HttpSession {
    async fn get(&self, url: &str) -> Result<String> {
        debug!(%url, "GET");
        let resp = self.client.get(url).send().await?;
        Self::read_body(resp).await
    }

    async fn post(&self, url: &str, body: &str) -> Result<String> {
        debug!(%url, "POST");
        let resp = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body.to_string())
            .send()
            .await?;
        Self::read_body(resp).await
    }
}
