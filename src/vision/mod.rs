//! Remote image analysis: request/result types and the analyzer seam.

mod client;

pub use client::VisionClient;

use crate::error::{AnalysisError, ClientError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Feature categories the remote service can compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisualFeature {
    Tags,
    Description,
    Color,
}

impl VisualFeature {
    /// Name used in the service's `visualFeatures` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tags => "Tags",
            Self::Description => "Description",
            Self::Color => "Color",
        }
    }
}

/// The fixed feature set requested on every analysis.
pub const STANDARD_FEATURES: [VisualFeature; 3] = [
    VisualFeature::Tags,
    VisualFeature::Description,
    VisualFeature::Color,
];

/// One analysis call. Built fresh per click and never reused.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub image: Vec<u8>,
    pub features: Vec<VisualFeature>,
}

impl AnalysisRequest {
    pub fn new(image: Vec<u8>) -> Self {
        Self {
            image,
            features: STANDARD_FEATURES.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    pub text: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub confidence: f64,
}

/// Color scheme reported by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorInfo {
    pub dominant_foreground: Option<String>,
    pub dominant_background: Option<String>,
    pub dominant_colors: Vec<String>,
    /// Hex without the leading `#`, as the service sends it
    pub accent: Option<String>,
    pub is_black_and_white: bool,
}

/// What came back from a successful analysis.
///
/// Both lists may be empty. Tags arrive in descending confidence order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub captions: Vec<Caption>,
    pub tags: Vec<Tag>,
    pub color: Option<ColorInfo>,
    pub request_id: Option<String>,
}

impl AnalysisResult {
    /// The caption worth showing, if the service produced any.
    pub fn caption(&self) -> Option<&Caption> {
        self.captions.first()
    }
}

/// Anything that can turn image bytes into an [`AnalysisResult`].
///
/// Uses `async_trait` so the running app can hold an `Arc<dyn ImageAnalyzer>`.
#[async_trait]
pub trait ImageAnalyzer: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError>;
}

/// Result of trying to build an analyzer at startup.
pub enum ClientOutcome {
    Ready(Arc<dyn ImageAnalyzer>),
    ConstructionFailed(ClientError),
}
