//! HTTP surface: the interactive page, a JSON endpoint, and health.

use crate::error::UploadError;
use crate::page;
use crate::render::ResultView;
use crate::session::{analysis_failure, step, Interaction, Session, Startup, StartupStatus};
use crate::upload::UploadedImage;
use crate::vision::{AnalysisRequest, AnalysisResult};
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

const SESSION_COOKIE: &str = "vision_session";

#[derive(Clone)]
pub struct AppState {
    startup: Startup,
    sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(startup: Startup) -> Self {
        Self {
            startup,
            sessions: Arc::new(SessionStore::new(MAX_SESSIONS, SESSION_IDLE_TTL)),
        }
    }
}

type SharedSession = Arc<tokio::sync::Mutex<Session>>;

/// Upper bound on live sessions; the least recently used one goes first.
const MAX_SESSIONS: usize = 256;
/// Sessions untouched for this long are dropped on the next insert.
const SESSION_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

struct SessionEntry {
    session: SharedSession,
    last_seen: Instant,
}

/// Per-visitor sessions, each behind its own lock so one visitor's
/// interactions run one at a time.
///
/// A session only exists once the visitor has uploaded something; viewing
/// the page never creates one.
struct SessionStore {
    sessions: Mutex<HashMap<u64, SessionEntry>>,
    max_sessions: usize,
    idle_ttl: Duration,
}

struct SessionHandle {
    id: u64,
    session: SharedSession,
    is_new: bool,
}

impl SessionStore {
    fn new(max_sessions: usize, idle_ttl: Duration) -> Self {
        Self {
            sessions: Mutex::default(),
            max_sessions: max_sessions.max(1),
            idle_ttl,
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// The visitor's existing session, if the cookie names a live one.
    fn find(&self, headers: &HeaderMap) -> Option<SessionHandle> {
        let id = session_id(headers)?;
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let entry = sessions.get_mut(&id)?;
        entry.last_seen = Instant::now();
        Some(SessionHandle {
            id,
            session: entry.session.clone(),
            is_new: false,
        })
    }

    /// The visitor's session, creating one when there is none.
    fn open(&self, headers: &HeaderMap) -> SessionHandle {
        if let Some(handle) = self.find(headers) {
            return handle;
        }

        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        let ttl = self.idle_ttl;
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) < ttl);
        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(id, _)| *id);
            match oldest {
                Some(id) => {
                    sessions.remove(&id);
                }
                None => break,
            }
        }

        let mut id = rand::random::<u64>();
        while sessions.contains_key(&id) {
            id = rand::random::<u64>();
        }
        let session = SharedSession::default();
        sessions.insert(
            id,
            SessionEntry {
                session: session.clone(),
                last_seen: now,
            },
        );
        tracing::debug!(sessions = sessions.len(), "New session");

        SessionHandle {
            id,
            session,
            is_new: true,
        }
    }
}

impl SessionHandle {
    /// Attach the session cookie when this visitor didn't have one yet.
    fn finish(&self, response: impl IntoResponse) -> Response {
        let mut response = response.into_response();
        if self.is_new {
            let cookie = format!("{SESSION_COOKIE}={:016x}; Path=/; HttpOnly; SameSite=Lax", self.id);
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
        }
        response
    }
}

fn session_id(headers: &HeaderMap) -> Option<u64> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| u64::from_str_radix(value, 16).ok())
}

/// First file field of a multipart body, or empty if there was none.
async fn first_file(multipart: &mut Multipart) -> Result<Vec<u8>, UploadError> {
    let unreadable = |e: axum::extract::multipart::MultipartError| UploadError::Read(e.body_text());
    while let Some(field) = multipart.next_field().await.map_err(unreadable)? {
        if field.file_name().is_none() && field.name() != Some("image") {
            continue;
        }
        let data = field.bytes().await.map_err(unreadable)?;
        return Ok(data.to_vec());
    }
    Ok(Vec::new())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/upload", post(upload))
        .route("/analyze", post(analyze))
        .route("/api/analyze", post(api_analyze))
        .route("/health", get(health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::disable()),
        )
        .with_state(state)
}

async fn index(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    let html = match state.sessions.find(&headers) {
        Some(handle) => page::render(&state.startup, &*handle.session.lock().await),
        None => page::render(&state.startup, &Session::default()),
    };
    Html(html)
}

async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let Some(analyzer) = state.startup.analyzer() else {
        return Redirect::to("/").into_response();
    };

    let interaction = match first_file(&mut multipart).await {
        Ok(raw) => Interaction::Upload(raw),
        Err(e) => {
            tracing::warn!(error = %e, "Could not read upload");
            Interaction::UploadFailed(e)
        }
    };

    let handle = state.sessions.open(&headers);
    let mut session = handle.session.lock().await;
    let current = std::mem::take(&mut *session);
    *session = step(current, interaction, analyzer.as_ref()).await;
    drop(session);

    handle.finish(Redirect::to("/"))
}

async fn analyze(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (Some(analyzer), Some(handle)) = (state.startup.analyzer(), state.sessions.find(&headers))
    else {
        return Redirect::to("/").into_response();
    };

    let mut session = handle.session.lock().await;
    let current = std::mem::take(&mut *session);
    *session = step(current, Interaction::Analyze, analyzer.as_ref()).await;
    drop(session);

    handle.finish(Redirect::to("/"))
}

#[derive(Serialize)]
struct ApiAnalysis {
    result: AnalysisResult,
    view: ResultView,
    processing_time_ms: u128,
}

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
}

struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(ApiErrorBody { error: self.1 })).into_response()
    }
}

impl From<UploadError> for ApiError {
    fn from(e: UploadError) -> Self {
        Self(StatusCode::BAD_REQUEST, e.to_string())
    }
}

/// Stateless variant of upload + analyze for scripted clients.
async fn api_analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ApiAnalysis>, ApiError> {
    let start = std::time::Instant::now();

    let analyzer = state.startup.analyzer().ok_or_else(|| {
        ApiError(
            StatusCode::SERVICE_UNAVAILABLE,
            match &state.startup {
                Startup::ConfigInvalid(e) => e.to_string(),
                Startup::ClientInvalid(e) => e.to_string(),
                Startup::Ready(_) => String::new(),
            },
        )
    })?;

    let raw = first_file(&mut multipart).await?;
    let image = UploadedImage::from_upload(&raw)?;

    let result = analyzer
        .analyze(&AnalysisRequest::new(image.bytes))
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Analysis failed");
            ApiError(StatusCode::BAD_GATEWAY, analysis_failure(e))
        })?;

    Ok(Json(ApiAnalysis {
        view: ResultView::from_result(&result),
        result,
        processing_time_ms: start.elapsed().as_millis(),
    }))
}

#[derive(Serialize)]
struct Health {
    status: StartupStatus,
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: state.startup.status(),
    })
}
