//! HTTP plumbing shared by the scraper and the weather client.

mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result};
use tracing::debug;

fn build_request(url: &str, query: &[(&str, String)]) -> Result<reqwest::Request> {
    let mut url: reqwest::Url = url
        .parse()
        .with_context(|| format!("invalid URL '{url}'"))?;
    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (name, value) in query {
            pairs.append_pair(name, value);
        }
    }
    Ok(reqwest::Request::new(reqwest::Method::GET, url))
}

/// GETs `url` with the given query parameters and returns the body as text.
/// Non-2xx responses are errors.
pub async fn fetch_text<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
    query: &[(&str, String)],
) -> Result<String> {
    let req = build_request(url, query)?;
    debug!(url = %req.url(), "GET");
    let resp = client.execute(req).await?.error_for_status()?;
    Ok(resp.text().await?)
}

/// Like [`fetch_text`] but decodes the body as JSON.
pub async fn fetch_json<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
    query: &[(&str, String)],
) -> Result<serde_json::Value> {
    let body = fetch_text(client, url, query).await?;
    serde_json::from_str(&body).context("response body is not valid JSON")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_appends_query() {
        let req = build_request(
            "https://www.idos.cz/vlaky/spojeni/",
            &[("f", "Ostrava hl.n.".to_string()), ("time", "00:00".to_string())],
        )
        .unwrap();
        let query = req.url().query().unwrap();
        assert!(query.contains("f=Ostrava+hl.n."));
        assert!(query.contains("time=00%3A00"));
    }

    #[test]
    fn test_build_request_rejects_bad_url() {
        assert!(build_request("not a url", &[]).is_err());
    }
}
