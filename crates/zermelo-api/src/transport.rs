//! HTTP transport for a school's zportal.nl API.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;

use crate::error::ZermeloError;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("zermelo-client/", env!("CARGO_PKG_VERSION"));

/// Base URL of a school's portal. The school is lower-cased.
pub fn school_base_url(school: &str) -> String {
    format!("https://{}.zportal.nl/", school.trim().to_lowercase())
}

/// Build a query string in the form `?a=1&b=2&`.
///
/// The trailing `&` is part of the format GET URLs have always been sent
/// with; [`form_body`] strips it for POST bodies.
pub fn build_query(params: &[(&str, &str)]) -> String {
    let mut query = String::from("?");
    for (key, value) in params {
        query.push_str(&urlencoding::encode(key));
        query.push('=');
        query.push_str(&urlencoding::encode(value));
        query.push('&');
    }
    query
}

/// Form-encoded body: the query string without its leading `?` and trailing `&`.
pub fn form_body(fields: &[(&str, &str)]) -> String {
    let query = build_query(fields);
    query
        .trim_start_matches('?')
        .trim_end_matches('&')
        .to_string()
}

/// Sends requests to one school's API and returns raw response bodies.
///
/// HTTP status codes are not interpreted here; the API reports failures
/// inside the JSON envelope.
#[derive(Debug, Clone)]
pub struct ApiTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ApiTransport {
    /// Transport for `https://{school}.zportal.nl/`.
    ///
    /// Certificates are only verified when `secure` is true.
    pub fn new(school: &str, secure: bool, timeout: Duration) -> Result<Self, ZermeloError> {
        Self::with_base_url(&school_base_url(school), secure, timeout)
    }

    /// Transport for an arbitrary base URL (mirrors, test servers).
    pub fn with_base_url(
        base_url: &str,
        secure: bool,
        timeout: Duration,
    ) -> Result<Self, ZermeloError> {
        if !secure {
            tracing::warn!("TLS certificate verification disabled for {}", base_url);
        }

        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(!secure)
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET `path` with `params` in the query string.
    pub async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<String, ZermeloError> {
        let url = format!("{}{}", self.url(path), build_query(params));
        tracing::debug!("GET {}", self.url(path));

        // The query carries the access token; keep it out of error messages
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;
        tracing::debug!("GET {} returned {}", path, response.status());

        Ok(response.text().await.map_err(reqwest::Error::without_url)?)
    }

    /// POST `path` with `fields` as a form-encoded body.
    pub async fn post(&self, path: &str, fields: &[(&str, &str)]) -> Result<String, ZermeloError> {
        let url = self.url(path);
        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form_body(fields))
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;
        tracing::debug!("POST {} returned {}", path, response.status());

        Ok(response.text().await.map_err(reqwest::Error::without_url)?)
    }
}
