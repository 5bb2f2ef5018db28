use crate::crawler::TerminationReason;
use std::time::Duration;

/// Structured events emitted by the crawl loop.
#[derive(Debug, Clone)]
pub enum CrawlEvent {
    Started { query: String },
    RecordAccepted { name: String, total: usize },
    DuplicateSkipped { name: String },
    CandidateSkipped { reason: String },
    PaginationStall { streak: u32 },
    RetryDowngraded { context: String },
    Finished {
        reason: TerminationReason,
        count: usize,
        elapsed: Duration,
    },
}

/// Injected observability sink.
///
/// The controller reports everything it does through this trait; it has
/// no global logger state of its own, so callers decide where events go
/// (process log, test collector, nowhere).
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &CrawlEvent);
}

/// Default sink: forward events to the `log` facade.
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: &CrawlEvent) {
        match event {
            CrawlEvent::Started { query } => {
                log::info!("🔍 Crawl started for query: {}", query);
            }
            CrawlEvent::RecordAccepted { name, total } => {
                log::info!("📄 Accepted record #{}: {}", total, name);
            }
            CrawlEvent::DuplicateSkipped { name } => {
                log::debug!("Duplicate skipped: {}", name);
            }
            CrawlEvent::CandidateSkipped { reason } => {
                log::warn!("Candidate skipped: {}", reason);
            }
            CrawlEvent::PaginationStall { streak } => {
                log::info!("Pagination stall ({} consecutive)", streak);
            }
            CrawlEvent::RetryDowngraded { context } => {
                log::warn!("Retry budget exhausted, downgrading: {}", context);
            }
            CrawlEvent::Finished {
                reason,
                count,
                elapsed,
            } => {
                log::info!(
                    "✅ Crawl finished: {} records in {:.1}s ({:?})",
                    count,
                    elapsed.as_secs_f64(),
                    reason
                );
            }
        }
    }
}

/// Sink that drops every event.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &CrawlEvent) {}
}
