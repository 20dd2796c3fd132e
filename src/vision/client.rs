//! Azure Computer Vision (v3.2 REST) client.
//!
//! Image bytes go up as an `application/octet-stream` body; the JSON answer
//! is mapped onto [`AnalysisResult`].

use super::{
    AnalysisRequest, AnalysisResult, Caption, ClientOutcome, ColorInfo, ImageAnalyzer, Tag,
};
use crate::config::Credentials;
use crate::error::{AnalysisError, ClientError};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;

const ANALYZE_PATH: &str = "vision/v3.2/analyze";
const KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

pub struct VisionClient {
    key: String,
    analyze_url: Url,
    client: reqwest::Client,
}

impl VisionClient {
    /// Bind a client to the endpoint. Only validates input; no network I/O.
    pub fn new(credentials: &Credentials) -> Result<Self, ClientError> {
        if credentials.key.trim().is_empty() {
            return Err(ClientError::EmptyKey);
        }

        let analyze_url = analyze_url(&credentials.endpoint)?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ClientError::Http(e.to_string()))?;

        Ok(Self {
            key: credentials.key.clone(),
            analyze_url,
            client,
        })
    }

    /// Same as [`VisionClient::new`], folded into a variant.
    pub fn connect(credentials: &Credentials) -> ClientOutcome {
        match Self::new(credentials) {
            Ok(client) => ClientOutcome::Ready(Arc::new(client)),
            Err(e) => ClientOutcome::ConstructionFailed(e),
        }
    }
}

fn analyze_url(endpoint: &str) -> Result<Url, ClientError> {
    let invalid = |reason: &str| ClientError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: reason.to_string(),
    };

    let mut base = Url::parse(endpoint.trim()).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if base.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host"));
    }

    // `Url::join` drops the last path segment unless it ends in '/'.
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.set_query(None);
    base.set_fragment(None);

    base.join(ANALYZE_PATH).map_err(|e| invalid(&e.to_string()))
}

// --- Response types ---

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct AnalyzeResponse {
    tags: Vec<WireTag>,
    description: Option<WireDescription>,
    color: Option<WireColor>,
    request_id: Option<String>,
}

#[derive(Deserialize)]
struct WireTag {
    name: String,
    confidence: f64,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct WireDescription {
    captions: Vec<WireCaption>,
}

#[derive(Deserialize)]
struct WireCaption {
    text: String,
    confidence: f64,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct WireColor {
    dominant_color_foreground: Option<String>,
    dominant_color_background: Option<String>,
    dominant_colors: Vec<String>,
    accent_color: Option<String>,
    is_bw_img: bool,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl From<AnalyzeResponse> for AnalysisResult {
    fn from(resp: AnalyzeResponse) -> Self {
        Self {
            captions: resp
                .description
                .unwrap_or_default()
                .captions
                .into_iter()
                .map(|c| Caption {
                    text: c.text,
                    confidence: c.confidence,
                })
                .collect(),
            tags: resp
                .tags
                .into_iter()
                .map(|t| Tag {
                    name: t.name,
                    confidence: t.confidence,
                })
                .collect(),
            color: resp.color.map(|c| ColorInfo {
                dominant_foreground: c.dominant_color_foreground,
                dominant_background: c.dominant_color_background,
                dominant_colors: c.dominant_colors,
                accent: c.accent_color,
                is_black_and_white: c.is_bw_img,
            }),
            request_id: resp.request_id,
        }
    }
}

/// Pull `error.message` out of an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[async_trait]
impl ImageAnalyzer for VisionClient {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        let start = Instant::now();

        let features: Vec<&str> = request.features.iter().map(|f| f.as_str()).collect();
        let mut url = self.analyze_url.clone();
        url.query_pairs_mut()
            .append_pair("visualFeatures", &features.join(","));

        tracing::debug!(bytes = request.image.len(), features = ?features, "Sending image to vision service");

        let resp = self
            .client
            .post(url)
            .header(KEY_HEADER, &self.key)
            .header("Content-Type", "application/octet-stream")
            .body(request.image.clone())
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Vision service rejected request");
            return Err(AnalysisError::Status {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        let parsed: AnalyzeResponse =
            serde_json::from_str(&text).map_err(|e| AnalysisError::Decode(e.to_string()))?;
        let result = AnalysisResult::from(parsed);

        tracing::info!(
            bytes = request.image.len(),
            captions = result.captions.len(),
            tags = result.tags.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Image analyzed"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Bytes,
        extract::Query,
        http::{HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use std::collections::HashMap;

    fn creds(endpoint: &str) -> Credentials {
        Credentials {
            key: "test-key".to_string(),
            endpoint: endpoint.to_string(),
        }
    }

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/")
    }

    fn cat_payload() -> serde_json::Value {
        serde_json::json!({
            "tags": [
                {"name": "cat", "confidence": 0.98},
                {"name": "table", "confidence": 0.81}
            ],
            "description": {
                "tags": ["cat", "table"],
                "captions": [{"text": "a cat sitting on a table", "confidence": 0.92}]
            },
            "color": {
                "dominantColorForeground": "Brown",
                "dominantColorBackground": "White",
                "dominantColors": ["Brown", "White"],
                "accentColor": "A26B2F",
                "isBwImg": false
            },
            "requestId": "req-1",
            "metadata": {"width": 4, "height": 4, "format": "Jpeg"}
        })
    }

    #[test]
    fn builds_analyze_url_from_endpoint() {
        assert_eq!(
            analyze_url("https://demo.cognitiveservices.azure.com/").unwrap().as_str(),
            "https://demo.cognitiveservices.azure.com/vision/v3.2/analyze"
        );
        assert_eq!(
            analyze_url("https://demo.example.com/proxy").unwrap().as_str(),
            "https://demo.example.com/proxy/vision/v3.2/analyze"
        );
    }

    #[test]
    fn rejects_malformed_endpoints() {
        for endpoint in ["not a url", "ftp://demo.example.com", "demo.example.com", "file:///tmp"] {
            assert!(
                matches!(
                    VisionClient::new(&creds(endpoint)),
                    Err(ClientError::InvalidEndpoint { .. })
                ),
                "{endpoint} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_blank_key() {
        let bad = Credentials {
            key: "  ".to_string(),
            endpoint: "https://demo.example.com".to_string(),
        };
        assert!(matches!(
            VisionClient::connect(&bad),
            ClientOutcome::ConstructionFailed(ClientError::EmptyKey)
        ));
    }

    #[tokio::test]
    async fn sends_bytes_key_and_features() {
        let app = Router::new().route(
            "/vision/v3.2/analyze",
            post(
                |Query(q): Query<HashMap<String, String>>, headers: HeaderMap, body: Bytes| async move {
                    assert_eq!(q.get("visualFeatures").unwrap(), "Tags,Description,Color");
                    assert_eq!(headers.get(KEY_HEADER).unwrap(), "test-key");
                    assert_eq!(
                        headers.get("content-type").unwrap(),
                        "application/octet-stream"
                    );
                    if body.as_ref() != b"jpeg-bytes" {
                        return (StatusCode::BAD_REQUEST, Json(serde_json::json!({})));
                    }
                    (StatusCode::OK, Json(cat_payload()))
                },
            ),
        );
        let base = spawn(app).await;
        let client = VisionClient::new(&creds(&base)).unwrap();

        let result = client
            .analyze(&AnalysisRequest::new(b"jpeg-bytes".to_vec()))
            .await
            .unwrap();

        let caption = result.caption().unwrap();
        assert_eq!(caption.text, "a cat sitting on a table");
        assert_eq!(caption.confidence, 0.92);
        assert_eq!(result.tags.len(), 2);
        assert_eq!(result.tags[0].name, "cat");
        let color = result.color.unwrap();
        assert_eq!(color.accent.as_deref(), Some("A26B2F"));
        assert_eq!(color.dominant_colors, vec!["Brown", "White"]);
        assert_eq!(result.request_id.as_deref(), Some("req-1"));
    }

    #[tokio::test]
    async fn missing_sections_decode_as_empty() {
        let app = Router::new().route(
            "/vision/v3.2/analyze",
            post(|| async { Json(serde_json::json!({"description": {"captions": []}})) }),
        );
        let base = spawn(app).await;
        let client = VisionClient::new(&creds(&base)).unwrap();

        let result = client
            .analyze(&AnalysisRequest::new(vec![1, 2, 3]))
            .await
            .unwrap();
        assert!(result.caption().is_none());
        assert!(result.tags.is_empty());
        assert!(result.color.is_none());
    }

    #[tokio::test]
    async fn auth_rejection_surfaces_service_message() {
        let app = Router::new().route(
            "/vision/v3.2/analyze",
            post(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(serde_json::json!({
                        "error": {"code": "401", "message": "Access denied due to invalid subscription key."}
                    })),
                )
            }),
        );
        let base = spawn(app).await;
        let client = VisionClient::new(&creds(&base)).unwrap();

        let err = client
            .analyze(&AnalysisRequest::new(vec![0xFF, 0xD8]))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "vision service returned 401: Access denied due to invalid subscription key."
        );
    }

    #[tokio::test]
    async fn malformed_payload_is_decode_error() {
        let app = Router::new().route("/vision/v3.2/analyze", post(|| async { "not json" }));
        let base = spawn(app).await;
        let client = VisionClient::new(&creds(&base)).unwrap();

        let err = client
            .analyze(&AnalysisRequest::new(vec![0xFF, 0xD8]))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Decode(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = VisionClient::new(&creds(&format!("http://{addr}/"))).unwrap();
        let err = client
            .analyze(&AnalysisRequest::new(vec![0xFF, 0xD8]))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Transport(_)));
    }
}
