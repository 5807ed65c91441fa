//! HTTP image source.
//!
//! Talks to the anime-image API: `GET /images/{category}` polls a random image
//! for a user session, `GET /getImageById/{id}` resolves a known image.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use kk_core::{
    domain::{Category, ImageDescriptor, UserId},
    errors::Error,
    ports::ImageSource,
    Result,
};

#[derive(Clone, Debug)]
pub struct ImageApiClient {
    base_url: Url,
    http: reqwest::Client,
}

impl ImageApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("API_BASE_URL {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "API_BASE_URL {base_url} cannot be a base url"
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("http client build: {e}")))?;
        Ok(Self { base_url, http })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // `cannot_be_a_base` was rejected in `new`.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub fn poll_url(&self, category: &str, user_id: UserId) -> Url {
        let mut url = self.url(&["images", category]);
        url.query_pairs_mut()
            .append_pair("session", "id")
            .append_pair("id", &user_id.to_string())
            .append_pair("count", "1");
        url
    }

    pub fn lookup_url(&self, external_id: &str) -> Url {
        self.url(&["getImageById", external_id])
    }

    async fn fetch(&self, url: Url) -> Result<ImageDescriptor> {
        debug!(%url, "image api request");
        let resp = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("image api request error: {e}")))?;

        if !resp.status().is_success() {
            return Err(Error::Fetch(format!("HTTP error: {}", resp.status())));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| Error::Fetch(format!("image api body error: {e}")))?;
        parse_image(&body)
    }
}

#[derive(Deserialize)]
struct ImagePayload {
    id: serde_json::Value,
    category: String,
    image: ImageVariants,
}

#[derive(Deserialize)]
struct ImageVariants {
    compressed: ImageFile,
}

#[derive(Deserialize)]
struct ImageFile {
    url: String,
}

/// Parse one image object. The API sends `id` as a number or a string.
pub fn parse_image(body: &str) -> Result<ImageDescriptor> {
    let payload: ImagePayload = serde_json::from_str(body)
        .map_err(|e| Error::Fetch(format!("image api json error: {e}")))?;

    let external_id = match payload.id {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        other => {
            return Err(Error::Fetch(format!("image api returned id {other}")));
        }
    };
    if external_id.is_empty() {
        return Err(Error::Fetch("image api returned an empty id".to_string()));
    }

    Ok(ImageDescriptor {
        external_id,
        image_url: payload.image.compressed.url,
        category_name: payload.category,
    })
}

#[async_trait]
impl ImageSource for ImageApiClient {
    async fn poll_next(&self, category: &Category) -> Result<ImageDescriptor> {
        self.fetch(self.poll_url(&category.name, category.user_id))
            .await
    }

    async fn get_by_external_id(&self, external_id: &str) -> Result<ImageDescriptor> {
        self.fetch(self.lookup_url(external_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ImageApiClient {
        ImageApiClient::new(base, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn builds_poll_url() {
        let url = client("https://api.example.com").poll_url("maid", UserId(42));
        assert_eq!(
            url.as_str(),
            "https://api.example.com/images/maid?session=id&id=42&count=1"
        );
    }

    #[test]
    fn keeps_base_path_prefix() {
        let c = client("https://api.example.com/v1/");
        assert_eq!(
            c.lookup_url("123").as_str(),
            "https://api.example.com/v1/getImageById/123"
        );
    }

    #[test]
    fn escapes_path_segments() {
        let url = client("https://api.example.com").lookup_url("a/b");
        assert_eq!(url.as_str(), "https://api.example.com/getImageById/a%2Fb");
    }

    #[test]
    fn rejects_bad_base_url() {
        assert!(matches!(
            ImageApiClient::new("not a url", Duration::from_secs(1)),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            ImageApiClient::new("mailto:cat@example.com", Duration::from_secs(1)),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn parses_numeric_and_string_ids() {
        let numeric = parse_image(
            r#"{"id": 6012, "category": "maid", "image": {"compressed": {"url": "https://cdn.example/6012.jpg"}, "original": {"url": "x"}}}"#,
        )
        .unwrap();
        assert_eq!(numeric.external_id, "6012");
        assert_eq!(numeric.image_url, "https://cdn.example/6012.jpg");
        assert_eq!(numeric.category_name, "maid");

        let text = parse_image(
            r#"{"id": "abc", "category": "wink", "image": {"compressed": {"url": "u"}}}"#,
        )
        .unwrap();
        assert_eq!(text.external_id, "abc");
    }

    #[test]
    fn malformed_payload_is_a_fetch_error() {
        for body in [
            "not json",
            r#"{"id": 1, "category": "maid"}"#,
            r#"{"id": null, "category": "maid", "image": {"compressed": {"url": "u"}}}"#,
            r#"{"id": "", "category": "maid", "image": {"compressed": {"url": "u"}}}"#,
        ] {
            assert!(matches!(parse_image(body), Err(Error::Fetch(_))), "{body}");
        }
    }
}
