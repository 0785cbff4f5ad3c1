use crate::api::models::*;
use once_cell::sync::Lazy;
use tracing::debug;

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

#[cfg(not(target_arch = "wasm32"))]
const NATIVE_ORIGIN: &str = "http://localhost:3000";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Request(#[from] reqwest::Error),
    #[error("server responded with status {0}")]
    Status(u16),
}

/// Client for the search/episode API served next to the app.
#[derive(Debug, Clone, PartialEq)]
pub struct PodcastClient {
    base_url: String,
}

impl PodcastClient {
    /// `api_base` empty means "same origin as the page".
    pub fn new(api_base: &str) -> Self {
        let base = api_base.trim().trim_end_matches('/');
        let base_url = if base.is_empty() {
            format!("{}/api", default_origin())
        } else {
            base.to_string()
        };
        Self { base_url }
    }

    pub fn search_url(&self, query: &str) -> String {
        format!("{}/search?q={}", self.base_url, urlencoding::encode(query))
    }

    pub fn episodes_url(&self, feed_id: &str, max: u32) -> String {
        format!(
            "{}/episodes?feedId={}&max={}",
            self.base_url,
            urlencoding::encode(feed_id),
            max
        )
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Feed>, ApiError> {
        let url = self.search_url(query);
        debug!(%url, "searching podcasts");
        let response: SearchResponse = self.get_json(&url).await?;
        Ok(response.feeds)
    }

    pub async fn episodes(&self, feed_id: &str, max: u32) -> Result<Vec<Episode>, ApiError> {
        let url = self.episodes_url(feed_id, max);
        debug!(%url, "listing episodes");
        let response: EpisodesResponse = self.get_json(&url).await?;
        Ok(response.items)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let response = HTTP_CLIENT.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        Ok(response.json().await?)
    }
}

#[cfg(target_arch = "wasm32")]
fn default_origin() -> String {
    web_sys::window()
        .and_then(|w| w.location().origin().ok())
        .unwrap_or_default()
}

#[cfg(not(target_arch = "wasm32"))]
fn default_origin() -> String {
    NATIVE_ORIGIN.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_encoded_urls() {
        let client = PodcastClient::new("https://pods.example/api/");
        assert_eq!(
            client.search_url("rust & friends"),
            "https://pods.example/api/search?q=rust%20%26%20friends"
        );
        assert_eq!(
            client.episodes_url("920666", 12),
            "https://pods.example/api/episodes?feedId=920666&max=12"
        );
    }

    #[test]
    fn empty_base_uses_default_origin() {
        let client = PodcastClient::new("");
        assert_eq!(client.search_url("x"), "http://localhost:3000/api/search?q=x");
    }
}
