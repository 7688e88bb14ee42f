//! Shared HTTP plumbing for the upstream clients.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// `Authorization` header value for HTTP Basic auth.
pub fn basic_auth_value(username: &str, password: &str) -> String {
    format!(
        "Basic {}",
        STANDARD.encode(format!("{}:{}", username, password))
    )
}

/// Create an HTTP client with Basic auth and JSON accept headers.
pub fn create_client(username: &str, password: &str) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    let auth = HeaderValue::from_str(&basic_auth_value(username, password))
        .map_err(|_| Error::config("credentials contain characters not allowed in a header"))?;
    headers.insert(AUTHORIZATION, auth);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    Ok(reqwest::Client::builder().default_headers(headers).build()?)
}

/// GET `url` and decode the JSON body, mapping non-success statuses to
/// [`Error::Upstream`].
pub async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    service: &'static str,
    url: &str,
) -> Result<T> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::Upstream {
            service,
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(response.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_auth_encodes_credentials() {
        assert_eq!(
            basic_auth_value("Aladdin", "open sesame"),
            "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ=="
        );
    }
}
