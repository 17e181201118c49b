use crate::fetch::client::HttpClient;
use async_trait::async_trait;

/// An [`HttpClient`] wrapper that appends an API key as a URL query parameter,
/// e.g. `?key=<api key>` for the weather service.
pub struct UrlParam<C> {
    inner: C,
    param_name: String,
    key: String,
}

impl<C> UrlParam<C> {
    pub fn new(inner: C, param_name: &str, key: &str) -> Self {
        Self {
            inner,
            param_name: param_name.to_string(),
            key: key.to_string(),
        }
    }

    fn sign(&self, req: &mut reqwest::Request) {
        req.url_mut()
            .query_pairs_mut()
            .append_pair(&self.param_name, &self.key);
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for UrlParam<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.sign(&mut req);
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::BasicClient;

    #[test]
    fn test_key_appended_after_existing_query() {
        let client = UrlParam::new(BasicClient::new(), "key", "abc 123");
        let url = "http://api.weather-service.com/history?lat=49.8209".parse().unwrap();
        let mut req = reqwest::Request::new(reqwest::Method::GET, url);
        client.sign(&mut req);
        assert_eq!(req.url().query(), Some("lat=49.8209&key=abc+123"));
    }
}
