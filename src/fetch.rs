use crate::{
    error::{SceneTraceError, SceneTraceResult},
    search::validate_media_url,
};

/// Plain GET of a remote base image for the composer.
pub struct ImageFetcher {
    client: reqwest::Client,
}

impl ImageFetcher {
    pub fn new() -> SceneTraceResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| SceneTraceError::compose(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Fetch the image bytes, failing with a defined error (rather than a
    /// blank artifact) when the host refuses or the transfer breaks.
    #[tracing::instrument(skip(self))]
    pub async fn fetch(&self, url: &str) -> SceneTraceResult<Vec<u8>> {
        let url = validate_media_url(url)?;

        tracing::debug!(%url, "fetching base image");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SceneTraceError::compose(format!("failed to fetch base image: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SceneTraceError::compose(format!(
                "base image fetch returned {status}; the image may be protected"
            )));
        }

        let bytes = response.bytes().await.map_err(|e| {
            SceneTraceError::compose(format!("failed to read base image bytes: {e}"))
        })?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_url_fails_before_any_fetch() {
        let fetcher = ImageFetcher::new().unwrap();
        let err = fetcher.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, SceneTraceError::Validation(_)));
    }
}
