use std::path::Path;

use crate::{
    error::{SceneTraceError, SceneTraceResult},
    model::{SearchMatch, SearchResponse, sort_by_confidence},
};

/// Fixed search endpoint. The `anilistInfo` flag is appended to every request
/// so responses carry localized titles and the adult-content flag.
pub const SEARCH_ENDPOINT: &str = "https://api.trace.moe/search";

/// Upload ceiling enforced locally, matching the API's documented limit.
pub const MAX_UPLOAD_BYTES: u64 = 25 * 1024 * 1024;

/// A local media file staged for upload, with its declared media type.
pub struct MediaUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl MediaUpload {
    pub fn validate(&self) -> SceneTraceResult<()> {
        if !self.content_type.starts_with("image/") && !self.content_type.starts_with("video/") {
            return Err(SceneTraceError::validation(format!(
                "unsupported media type '{}': expected image/* or video/*",
                self.content_type
            )));
        }
        if self.bytes.len() as u64 > MAX_UPLOAD_BYTES {
            return Err(SceneTraceError::validation(format!(
                "'{}' is {} bytes; the search API accepts at most 25 MiB",
                self.file_name,
                self.bytes.len()
            )));
        }
        Ok(())
    }
}

/// Parse a user-supplied media URL, rejecting anything that is not a
/// syntactically valid absolute URL. Runs before any network dispatch.
pub fn validate_media_url(raw: &str) -> SceneTraceResult<reqwest::Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SceneTraceError::validation("media URL must be non-empty"));
    }
    reqwest::Url::parse(trimmed)
        .map_err(|_| SceneTraceError::validation(format!("'{trimmed}' is not a valid absolute URL")))
}

/// Best-effort media type from a file extension, for staging CLI uploads.
pub fn media_type_for_path(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let media_type = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        _ => return None,
    };
    Some(media_type.to_string())
}

/// Client for the trace.moe search endpoint.
///
/// Both entry points validate their input locally before dispatching, and both
/// normalize every transport or API failure into a single human-readable
/// error. No retries, no backoff; the request is bounded only by the
/// transport's own defaults.
pub struct SearchClient {
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

impl SearchClient {
    pub fn new() -> SceneTraceResult<Self> {
        let mut endpoint = reqwest::Url::parse(SEARCH_ENDPOINT)
            .map_err(|e| SceneTraceError::request(format!("invalid search endpoint: {e}")))?;
        endpoint.query_pairs_mut().append_key_only("anilistInfo");
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| SceneTraceError::request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, endpoint })
    }

    /// Search by a remote image or video URL.
    #[tracing::instrument(skip(self))]
    pub async fn search_by_url(&self, url: &str) -> SceneTraceResult<Vec<SearchMatch>> {
        let media_url = validate_media_url(url)?;

        let mut request_url = self.endpoint.clone();
        request_url
            .query_pairs_mut()
            .append_pair("url", media_url.as_str());

        tracing::debug!(%request_url, "dispatching url search");
        let response = self
            .client
            .get(request_url)
            .send()
            .await
            .map_err(|e| SceneTraceError::request(format!("search request failed: {e}")))?;

        Self::resolve(response).await
    }

    /// Search by uploading raw media bytes.
    #[tracing::instrument(
        skip(self, upload),
        fields(file = %upload.file_name, bytes = upload.bytes.len())
    )]
    pub async fn search_by_file(&self, upload: MediaUpload) -> SceneTraceResult<Vec<SearchMatch>> {
        upload.validate()?;

        tracing::debug!("dispatching file search");
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, upload.content_type)
            .body(upload.bytes)
            .send()
            .await
            .map_err(|e| SceneTraceError::request(format!("search request failed: {e}")))?;

        Self::resolve(response).await
    }

    async fn resolve(response: reqwest::Response) -> SceneTraceResult<Vec<SearchMatch>> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SceneTraceError::request(format!("failed to read search response: {e}")))?;
        resolve_body(status, &body)
    }
}

/// Turn a raw `(status, body)` pair into matches or a normalized error.
///
/// The body is parsed even on a non-success status because the API embeds a
/// human-readable error string there. Resolution order: transport status
/// first (preferring the embedded message), then the embedded error field,
/// then the match list itself.
pub fn resolve_body(
    status: reqwest::StatusCode,
    body: &str,
) -> SceneTraceResult<Vec<SearchMatch>> {
    let parsed: Option<SearchResponse> = serde_json::from_str(body).ok();

    if !status.is_success() {
        let message = parsed
            .as_ref()
            .map(|r| r.error.trim())
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("search API responded with {status}"));
        return Err(SceneTraceError::request(message));
    }

    let parsed = parsed.ok_or_else(|| {
        SceneTraceError::request("search API returned a malformed response body")
    })?;
    if !parsed.error.trim().is_empty() {
        return Err(SceneTraceError::request(parsed.error.trim().to_string()));
    }

    let mut matches = parsed.result;
    for m in &matches {
        m.validate()?;
    }
    sort_by_confidence(&mut matches);
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn upload(content_type: &str, len: usize) -> MediaUpload {
        MediaUpload {
            file_name: "clip.bin".to_string(),
            content_type: content_type.to_string(),
            bytes: vec![0u8; len],
        }
    }

    #[test]
    fn url_validation_rejects_garbage() {
        assert!(matches!(
            validate_media_url("not a url"),
            Err(SceneTraceError::Validation(_))
        ));
        assert!(matches!(
            validate_media_url("   "),
            Err(SceneTraceError::Validation(_))
        ));
    }

    #[test]
    fn url_validation_accepts_absolute_urls() {
        let url = validate_media_url("https://example.com/a.jpg").unwrap();
        assert_eq!(url.as_str(), "https://example.com/a.jpg");
        // Surrounding whitespace is tolerated.
        assert!(validate_media_url("  https://example.com/a.jpg ").is_ok());
    }

    #[test]
    fn upload_rejects_non_media_types() {
        assert!(matches!(
            upload("text/plain", 16).validate(),
            Err(SceneTraceError::Validation(_))
        ));
        assert!(upload("image/png", 16).validate().is_ok());
        assert!(upload("video/mp4", 16).validate().is_ok());
    }

    #[test]
    fn upload_size_boundary_is_inclusive() {
        let limit = MAX_UPLOAD_BYTES as usize;
        assert!(upload("image/png", limit).validate().is_ok());
        let err = upload("image/png", limit + 1).validate().unwrap_err();
        assert!(err.to_string().contains("25 MiB"));
    }

    #[test]
    fn media_type_inference_covers_common_extensions() {
        assert_eq!(
            media_type_for_path(Path::new("shot.JPG")).as_deref(),
            Some("image/jpeg")
        );
        assert_eq!(
            media_type_for_path(Path::new("clip.webm")).as_deref(),
            Some("video/webm")
        );
        assert!(media_type_for_path(Path::new("notes.txt")).is_none());
        assert!(media_type_for_path(Path::new("noext")).is_none());
    }

    #[test]
    fn success_body_sorts_matches_descending() {
        let body = r#"{
            "error": "",
            "frameCount": 100,
            "result": [
                {"anilist": 1, "filename": "low.mp4", "episode": 1, "from": 0.0, "to": 1.0, "similarity": 0.5, "video": "v", "image": "i"},
                {"anilist": 2, "filename": "high.mp4", "episode": 2, "from": 0.0, "to": 1.0, "similarity": 0.9, "video": "v", "image": "i"}
            ]
        }"#;
        let matches = resolve_body(StatusCode::OK, body).unwrap();
        assert_eq!(matches[0].filename, "high.mp4");
        assert_eq!(matches[1].filename, "low.mp4");
    }

    #[test]
    fn embedded_error_wins_over_success_status() {
        let body = r#"{"error": "Concurrency limit exceeded", "result": []}"#;
        let err = resolve_body(StatusCode::OK, body).unwrap_err();
        assert!(err.to_string().contains("Concurrency limit exceeded"));
    }

    #[test]
    fn non_success_status_prefers_embedded_message() {
        let body = r#"{"error": "Invalid image url", "result": []}"#;
        let err = resolve_body(StatusCode::BAD_REQUEST, body).unwrap_err();
        assert!(err.to_string().contains("Invalid image url"));
    }

    #[test]
    fn non_success_status_without_body_names_the_status() {
        let err = resolve_body(StatusCode::BAD_GATEWAY, "<html>oops</html>").unwrap_err();
        assert!(err.to_string().contains("502"));
    }

    #[test]
    fn malformed_success_body_is_a_request_error() {
        assert!(matches!(
            resolve_body(StatusCode::OK, "{not json"),
            Err(SceneTraceError::Request(_))
        ));
    }

    #[test]
    fn out_of_range_similarity_is_rejected() {
        let body = r#"{
            "error": "",
            "result": [
                {"anilist": 1, "filename": "bad.mp4", "episode": 1, "from": 0.0, "to": 1.0, "similarity": 1.5, "video": "v", "image": "i"}
            ]
        }"#;
        assert!(resolve_body(StatusCode::OK, body).is_err());
    }
}
