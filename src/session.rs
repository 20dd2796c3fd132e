//! Startup status and the per-session interaction flow.
//!
//! [`Startup`] is computed once when the process starts and never changes.
//! A [`Session`] is advanced by [`step`], which takes the current state and
//! one user interaction and returns the next state.

use crate::config::{ConfigOutcome, Credentials};
use crate::error::{ClientError, ConfigError, UploadError};
use crate::render::ResultView;
use crate::upload::UploadedImage;
use crate::vision::{AnalysisRequest, AnalysisResult, ClientOutcome, ImageAnalyzer};
use serde::Serialize;
use std::sync::Arc;

/// Process-wide outcome of the configuration and client checks.
#[derive(Clone)]
pub enum Startup {
    Ready(Arc<dyn ImageAnalyzer>),
    ConfigInvalid(ConfigError),
    ClientInvalid(ClientError),
}

impl Startup {
    /// Gate client construction on valid configuration.
    ///
    /// `build` runs at most once, and only when credentials are present.
    pub fn resolve<F>(config: ConfigOutcome, build: F) -> Self
    where
        F: FnOnce(&Credentials) -> ClientOutcome,
    {
        match config {
            ConfigOutcome::Missing(e) => {
                tracing::error!(error = %e, "Vision credentials missing");
                Self::ConfigInvalid(e)
            }
            ConfigOutcome::Valid(credentials) => match build(&credentials) {
                ClientOutcome::Ready(client) => {
                    tracing::info!(endpoint = %credentials.endpoint, "Vision client ready");
                    Self::Ready(client)
                }
                ClientOutcome::ConstructionFailed(e) => {
                    tracing::error!(error = %e, "Vision client could not be constructed");
                    Self::ClientInvalid(e)
                }
            },
        }
    }

    pub fn analyzer(&self) -> Option<&Arc<dyn ImageAnalyzer>> {
        match self {
            Self::Ready(analyzer) => Some(analyzer),
            _ => None,
        }
    }

    pub fn status(&self) -> StartupStatus {
        match self {
            Self::Ready(_) => StartupStatus::Ready,
            Self::ConfigInvalid(_) => StartupStatus::ConfigMissing,
            Self::ClientInvalid(_) => StartupStatus::ClientFailed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartupStatus {
    Ready,
    ConfigMissing,
    ClientFailed,
}

/// Where a session currently is. `Analyzing` only exists inside [`step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    NoUpload,
    Uploaded,
    Rendered,
}

/// One user action.
#[derive(Debug, Clone)]
pub enum Interaction {
    /// A file was picked; raw bytes as received
    Upload(Vec<u8>),
    /// A file was picked but its bytes never arrived intact
    UploadFailed(UploadError),
    /// The analyze button was clicked
    Analyze,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    upload: Option<UploadedImage>,
    result: Option<AnalysisResult>,
    error: Option<String>,
}

impl Session {
    pub fn stage(&self) -> Stage {
        match (&self.upload, &self.result) {
            (None, _) => Stage::NoUpload,
            (Some(_), None) => Stage::Uploaded,
            (Some(_), Some(_)) => Stage::Rendered,
        }
    }

    pub fn upload(&self) -> Option<&UploadedImage> {
        self.upload.as_ref()
    }

    #[cfg(test)]
    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    /// Inline error from the last interaction, if it failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn view(&self) -> Option<ResultView> {
        self.result.as_ref().map(ResultView::from_result)
    }
}

pub fn analysis_failure(e: impl std::fmt::Display) -> String {
    format!("There was an error when analysing the image: {e}")
}

/// Keep whatever the session had and show why the upload was refused.
fn reject_upload(session: Session, e: UploadError) -> Session {
    tracing::warn!(error = %e, "Upload rejected");
    Session {
        error: Some(e.to_string()),
        ..session
    }
}

/// Advance a session by one interaction.
///
/// Uploading replaces the image and drops any previous result. A failed
/// analysis leaves the image in place so the user can click again.
pub async fn step(session: Session, interaction: Interaction, analyzer: &dyn ImageAnalyzer) -> Session {
    match interaction {
        Interaction::Upload(raw) => match UploadedImage::from_upload(&raw) {
            Ok(image) => Session {
                upload: Some(image),
                result: None,
                error: None,
            },
            Err(e) => reject_upload(session, e),
        },
        Interaction::UploadFailed(e) => reject_upload(session, e),
        Interaction::Analyze => {
            let Some(image) = session.upload else {
                return Session::default();
            };

            let request = AnalysisRequest::new(image.bytes.clone());
            match analyzer.analyze(&request).await {
                Ok(result) => Session {
                    upload: Some(image),
                    result: Some(result),
                    error: None,
                },
                Err(e) => {
                    tracing::warn!(error = %e, "Analysis failed");
                    Session {
                        upload: Some(image),
                        result: None,
                        error: Some(analysis_failure(e)),
                    }
                }
            }
        }
    }
}
