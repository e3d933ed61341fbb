use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::{Header, Status};
use rocket::request::{FromRequest, Outcome, Request};
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::{get, options, post, routes, Response, State};
use serde::Serialize;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{error, info, warn};

use common::Config;

use crate::cache::RecentActivityCache;
use crate::error::SummaryError;
use crate::invoker::SummaryInvoker;
use crate::storage;
use crate::summary::{AiBookSummary, ProcessingMethod, SummaryRequest};

/// Application state stored inside Rocket managed state.
pub struct AppState {
    pub started_at: DateTime<Utc>,
    pub config: Arc<Config>,
    pub db: SqlitePool,
    pub invoker: Arc<SummaryInvoker>,
    pub cache: Arc<RecentActivityCache>,
}

/// Response structure for `/api/v1/status`.
#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    uptime_seconds: i64,
    hourly_cap: i64,
    monthly_cap: i64,
}

/// Identifies the caller for the per-client hourly counter. Taken from the
/// `X-Client-Id` header, falling back to the client IP.
pub struct ClientId(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientId {
    type Error = std::convert::Infallible;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let id = req
            .headers()
            .get_one("X-Client-Id")
            .map(str::to_string)
            .or_else(|| req.client_ip().map(|ip| ip.to_string()))
            .unwrap_or_else(|| "anonymous".to_string());
        Outcome::Success(ClientId(id))
    }
}

/// CORS restricted to a fixed allow-list of origins; only POST (plus
/// OPTIONS preflight) is permitted on the API.
pub struct Cors {
    allowed_origins: Vec<String>,
}

impl Cors {
    pub fn new(allowed_origins: Vec<String>) -> Self {
        Self { allowed_origins }
    }
}

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "CORS allow-list",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let Some(origin) = request.headers().get_one("Origin") else {
            return;
        };
        if !self.allowed_origins.iter().any(|o| o == origin) {
            return;
        }
        response.set_header(Header::new("Access-Control-Allow-Origin", origin.to_string()));
        response.set_header(Header::new("Vary", "Origin"));
        response.set_header(Header::new("Access-Control-Allow-Methods", "POST, OPTIONS"));
        response.set_header(Header::new(
            "Access-Control-Allow-Headers",
            "Content-Type, X-Client-Id",
        ));
    }
}

#[options("/<_..>")]
fn preflight() -> Status {
    Status::NoContent
}

#[get("/health")]
async fn health() -> &'static str {
    "OK"
}

/// Status endpoint returning simple JSON with uptime and configured caps.
#[get("/api/v1/status")]
async fn status(state: &State<AppState>) -> Json<StatusResponse> {
    let uptime = (Utc::now() - state.started_at).num_seconds();
    Json(StatusResponse {
        status: "ok",
        uptime_seconds: uptime,
        hourly_cap: state.config.limits.hourly_cap(),
        monthly_cap: state.config.limits.monthly_cap(),
    })
}

/// Generate a summary for the posted book metadata.
#[post("/api/v1/summaries", data = "<body>")]
async fn create_summary(
    state: &State<AppState>,
    client: ClientId,
    body: Json<SummaryRequest>,
) -> Custom<Json<serde_json::Value>> {
    let request = body.into_inner();

    if request.title.trim().is_empty() || request.isbn.trim().is_empty() {
        return error_response(&SummaryError::InvalidRequest(
            "title and isbn are required".to_string(),
        ));
    }

    // Serve an immediate duplicate from the ring buffer without burning
    // the client's allowance.
    if let Some(cached) = state.cache.get(&request.isbn, &request.target_language).await {
        info!("serving cached summary for isbn {}", request.isbn);
        return success_response(cached);
    }

    // The ring buffer is empty after a restart; a recently persisted
    // summary still counts as a duplicate.
    let since = Utc::now() - Duration::hours(1);
    match storage::find_recent_by_isbn(&state.db, &request.isbn, &request.target_language, since)
        .await
    {
        Ok(Some(stored)) => {
            info!("serving stored summary for isbn {}", request.isbn);
            state.cache.put(&request.isbn, stored.clone()).await;
            return success_response(stored);
        }
        Ok(None) => {}
        Err(e) => warn!("stored-summary lookup failed for isbn {}: {:#}", request.isbn, e),
    }

    match state.invoker.generate_summary(&client.0, &request).await {
        Ok(outcome) => {
            // Persistence failure does not invalidate the summary; log and
            // keep serving.
            if let Err(e) = storage::store_summary(&state.db, &request, &outcome.summary).await {
                warn!("failed to persist summary for isbn {}: {:#}", request.isbn, e);
            }
            state.cache.put(&request.isbn, outcome.summary.clone()).await;
            success_response(outcome.summary)
        }
        Err(e) => error_response(&e),
    }
}

/// Success body; degraded (template-generated) data is always marked,
/// whether it is fresh, cached or replayed from storage.
fn success_response(summary: AiBookSummary) -> Custom<Json<serde_json::Value>> {
    let body = if summary.processing_method == ProcessingMethod::FallbackTemplate {
        json!({ "success": true, "data": summary, "fallback": true })
    } else {
        json!({ "success": true, "data": summary })
    };
    Custom(Status::Ok, Json(body))
}

/// Map the failure taxonomy onto HTTP statuses and error bodies.
fn error_response(err: &SummaryError) -> Custom<Json<serde_json::Value>> {
    let classification = err.classification();
    let (status, body) = match err {
        SummaryError::InvalidRequest(msg) => (
            Status::BadRequest,
            json!({ "error": msg, "classification": classification }),
        ),
        SummaryError::AuthFailed => (
            Status::Unauthorized,
            json!({ "error": err.to_string(), "classification": classification }),
        ),
        SummaryError::RateLimited => (
            Status::TooManyRequests,
            json!({ "error": err.to_string(), "classification": classification }),
        ),
        SummaryError::QuotaExceeded => (
            Status::TooManyRequests,
            json!({
                "error": err.to_string(),
                "classification": classification,
                "suggestion": "the monthly generation quota is exhausted; retry next month or raise the account quota"
            }),
        ),
        SummaryError::GlobalCapReached => (
            Status::ServiceUnavailable,
            json!({ "error": err.to_string(), "classification": classification }),
        ),
        SummaryError::MalformedResponse(_) | SummaryError::Internal(_) => {
            error!("summary generation failed: {:#}", err);
            (
                Status::InternalServerError,
                json!({ "error": err.to_string(), "classification": classification }),
            )
        }
    };
    Custom(status, Json(body))
}

/// Assemble the Rocket instance. Split from `launch_rocket` so tests can
/// drive it through a local client.
pub fn build_rocket(
    db: SqlitePool,
    config: Arc<Config>,
    invoker: Arc<SummaryInvoker>,
) -> rocket::Rocket<rocket::Build> {
    let allowed_origins = config
        .server
        .as_ref()
        .map(|s| s.allowed_origins.clone())
        .unwrap_or_default();

    let mut figment = rocket::Config::figment();
    if let Some(server) = &config.server {
        if let Some(address) = &server.address {
            figment = figment.merge(("address", address.clone()));
        }
        if let Some(port) = server.port {
            figment = figment.merge(("port", port));
        }
    }

    let state = AppState {
        started_at: Utc::now(),
        config,
        db,
        invoker,
        cache: Arc::new(RecentActivityCache::new(32)),
    };

    rocket::custom(figment)
        .manage(state)
        .attach(Cors::new(allowed_origins))
        .mount("/", routes![health, status, create_summary, preflight])
}

/// Launch the Rocket server (blocking until Rocket shuts down).
pub async fn launch_rocket(
    db: SqlitePool,
    config: Arc<Config>,
    invoker: Arc<SummaryInvoker>,
) -> anyhow::Result<()> {
    build_rocket(db, config, invoker).launch().await?;
    Ok(())
}
