use actix_web::{HttpResponse, Result, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::crawler::{CrawlConfig, Crawler, TerminationReason};
use crate::events::LogSink;
use crate::record::Record;
use crate::session::BrowserSurface;
use crate::surface::SurfaceSelectors;

pub struct AppState {
    /// One crawl at a time: a browser session is never shared across
    /// concurrent invocations, so requests queue here.
    pub crawl_gate: Mutex<()>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            crawl_gate: Mutex::new(()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScrapeRequest {
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_time_budget_secs")]
    pub time_budget_secs: u64,
}

fn default_limit() -> usize {
    5
}

fn default_time_budget_secs() -> u64 {
    120
}

#[derive(Debug, Serialize)]
pub struct ScrapeResponse {
    pub status: String,
    pub query: String,
    pub count: usize,
    pub records: Vec<Record>,
    pub termination: TerminationReason,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
}

pub async fn health_check() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "maps-harvester"
    })))
}

/// Reject empty and whitespace-only queries before any surface work.
fn validate_query(query: &str) -> std::result::Result<(), &'static str> {
    if query.trim().is_empty() {
        return Err("query must not be empty");
    }
    Ok(())
}

pub async fn scrape_handler(
    state: web::Data<AppState>,
    req: web::Json<ScrapeRequest>,
) -> Result<HttpResponse> {
    if let Err(message) = validate_query(&req.query) {
        return Ok(HttpResponse::BadRequest().json(ErrorResponse {
            status: "error".to_string(),
            message: message.to_string(),
        }));
    }

    let crawl_id = Uuid::new_v4();
    log::info!("Received scrape request {} for: {}", crawl_id, req.query);

    // Held for the whole crawl; concurrent requests wait their turn.
    let _gate = state.crawl_gate.lock().await;

    let surface = match BrowserSurface::launch().await {
        Ok(surface) => surface,
        Err(e) => {
            log::error!("Session launch failed for {}: {:#}", crawl_id, e);
            return Ok(HttpResponse::InternalServerError().json(ErrorResponse {
                status: "error".to_string(),
                message: format!("failed to start render session: {}", e),
            }));
        }
    };

    let config = CrawlConfig::new(
        req.query.clone(),
        req.limit,
        Duration::from_secs(req.time_budget_secs),
    );

    let mut crawler = Crawler::new(surface, SurfaceSelectors::default(), Arc::new(LogSink));
    let outcome = crawler.run(&config).await;

    // Session release happens on every termination path, fatal included.
    crawler.into_surface().close().await;

    if outcome.reason == TerminationReason::SessionFatal {
        let message = outcome
            .error
            .unwrap_or_else(|| "render session failed".to_string());
        log::error!("Crawl {} failed: {}", crawl_id, message);
        return Ok(HttpResponse::InternalServerError().json(ErrorResponse {
            status: "error".to_string(),
            message,
        }));
    }

    log::info!(
        "Crawl {} finished: {} records ({:?})",
        crawl_id,
        outcome.records.len(),
        outcome.reason
    );

    Ok(HttpResponse::Ok().json(ScrapeResponse {
        status: "success".to_string(),
        query: req.query.clone(),
        count: outcome.records.len(),
        records: outcome.records,
        termination: outcome.reason,
        timestamp: Utc::now().to_rfc3339(),
    }))
}
