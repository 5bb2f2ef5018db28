use crate::dedupe::DedupeIndex;
use crate::events::{CrawlEvent, EventSink};
use crate::extract::RecordExtractor;
use crate::paginate::PaginationDriver;
use crate::record::Record;
use crate::retry::{FailureClass, RetryBudget, classify};
use crate::surface::{RenderSurface, SurfaceSelectors};
use crate::utils::jitter_ms;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use url::Url;

const RESULTS_URL_BASE: &str = "https://www.google.com/maps/search/";

/// Bounded wait for the results container after navigation. If nothing
/// materializes within this window the session is considered unusable.
const CONTAINER_WAIT: Duration = Duration::from_secs(20);

/// Consecutive no-progress pagination attempts before giving up.
const STALL_LIMIT: u32 = 3;

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub query: String,
    /// Maximum records to return; 0 means unbounded (time budget and
    /// stall detection still apply).
    pub limit: usize,
    pub time_budget: Duration,
}

impl CrawlConfig {
    pub fn new(query: impl Into<String>, limit: usize, time_budget: Duration) -> Self {
        Self {
            query: query.into(),
            limit,
            time_budget,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    LimitReached,
    Stalled,
    TimeExceeded,
    SessionFatal,
}

/// Final result of one crawl invocation. Every termination path yields
/// the records accumulated so far; only `SessionFatal` also carries an
/// error message for the request boundary.
#[derive(Debug)]
pub struct CrawlOutcome {
    pub records: Vec<Record>,
    pub reason: TerminationReason,
    pub error: Option<String>,
    pub elapsed: Duration,
}

/// Per-invocation mutable state, owned exclusively by the crawl loop.
struct CrawlState {
    records: Vec<Record>,
    index: DedupeIndex,
    /// Candidates already scanned; the slice `[last_count, n)` is the
    /// only part of the listing ever extracted.
    last_count: usize,
    stalls: u32,
}

/// Owns the crawl loop: composes extraction, pagination, dedup and
/// retry policy into a bounded, deduplicated record stream.
///
/// The controller takes the surface by value; exactly one logical crawl
/// drives a session at a time.
pub struct Crawler<S: RenderSurface> {
    surface: S,
    selectors: SurfaceSelectors,
    extractor: RecordExtractor,
    paginator: PaginationDriver,
    sink: Arc<dyn EventSink>,
}

impl<S: RenderSurface> Crawler<S> {
    pub fn new(surface: S, selectors: SurfaceSelectors, sink: Arc<dyn EventSink>) -> Self {
        Self {
            surface,
            extractor: RecordExtractor::new(selectors.clone()),
            paginator: PaginationDriver::new(selectors.clone()),
            selectors,
            sink,
        }
    }

    pub fn with_title_wait(mut self, title_wait: Duration) -> Self {
        self.extractor = RecordExtractor::new(self.selectors.clone()).with_title_wait(title_wait);
        self
    }

    /// Recover the surface after a crawl, for session teardown.
    pub fn into_surface(self) -> S {
        self.surface
    }

    /// Run one crawl to completion. Never panics and never returns an
    /// error: all failure paths fold into the outcome.
    pub async fn run(&mut self, config: &CrawlConfig) -> CrawlOutcome {
        let started = Instant::now();
        self.sink.emit(&CrawlEvent::Started {
            query: config.query.clone(),
        });

        let outcome = self.run_loop(config, started).await;

        self.sink.emit(&CrawlEvent::Finished {
            reason: outcome.reason,
            count: outcome.records.len(),
            elapsed: outcome.elapsed,
        });
        outcome
    }

    async fn run_loop(&mut self, config: &CrawlConfig, started: Instant) -> CrawlOutcome {
        let url = match results_url(&config.query) {
            Ok(url) => url,
            Err(e) => {
                return self.fatal(Vec::new(), started, format!("invalid query url: {}", e));
            }
        };

        if let Err(e) = self.surface.navigate(&url).await {
            return self.fatal(Vec::new(), started, format!("navigation failed: {}", e));
        }

        // The container never appearing is the one fatal timeout.
        if let Err(e) = self
            .surface
            .wait_for(&self.selectors.result_card, CONTAINER_WAIT)
            .await
        {
            return self.fatal(
                Vec::new(),
                started,
                format!("results container never appeared: {}", e),
            );
        }

        let mut state = CrawlState {
            records: Vec::new(),
            index: DedupeIndex::new(),
            last_count: 0,
            stalls: 0,
        };
        let mut budget = RetryBudget::default();

        let reason = loop {
            if started.elapsed() >= config.time_budget {
                break TerminationReason::TimeExceeded;
            }

            // Snapshot the currently visible candidates. Handles from
            // previous iterations are never reused.
            let cards = match self.surface.find_all(&self.selectors.result_card).await {
                Ok(cards) => cards,
                Err(err) => match classify(&err) {
                    FailureClass::Fatal => {
                        return self.fatal(state.records, started, err.to_string());
                    }
                    FailureClass::Retryable if budget.consume() => {
                        sleep(jitter_ms(200..500)).await;
                        continue;
                    }
                    _ => {
                        // Without budget a failed scan is indistinguishable
                        // from no progress.
                        state.stalls += 1;
                        self.sink.emit(&CrawlEvent::PaginationStall {
                            streak: state.stalls,
                        });
                        if state.stalls >= STALL_LIMIT {
                            break TerminationReason::Stalled;
                        }
                        continue;
                    }
                },
            };

            let n = cards.len();
            let new_slice = &cards[state.last_count.min(n)..];

            match self
                .scan_candidates(config, new_slice, &mut state, &mut budget, started)
                .await
            {
                Ok(Some(reason)) => break reason,
                Ok(None) => {}
                Err(outcome) => return outcome,
            }
            state.last_count = n;

            match self.paginator.advance(&mut self.surface, state.last_count).await {
                Ok(true) => state.stalls = 0,
                Ok(false) => {
                    state.stalls += 1;
                    self.sink.emit(&CrawlEvent::PaginationStall {
                        streak: state.stalls,
                    });
                    if state.stalls >= STALL_LIMIT {
                        break TerminationReason::Stalled;
                    }
                }
                Err(err) => match classify(&err) {
                    FailureClass::Fatal => {
                        return self.fatal(state.records, started, err.to_string());
                    }
                    FailureClass::Retryable if budget.consume() => {
                        sleep(jitter_ms(200..500)).await;
                    }
                    _ => {
                        // Budget gone: a failed pagination counts as a stall.
                        self.sink.emit(&CrawlEvent::RetryDowngraded {
                            context: format!("pagination: {}", err),
                        });
                        state.stalls += 1;
                        self.sink.emit(&CrawlEvent::PaginationStall {
                            streak: state.stalls,
                        });
                        if state.stalls >= STALL_LIMIT {
                            break TerminationReason::Stalled;
                        }
                    }
                },
            }
        };

        CrawlOutcome {
            records: state.records,
            reason,
            error: None,
            elapsed: started.elapsed(),
        }
    }

    /// Extract the newly visible slice. Returns `Ok(Some(reason))` when a
    /// terminal condition fired mid-slice, `Err(outcome)` on fatal.
    async fn scan_candidates(
        &mut self,
        config: &CrawlConfig,
        new_slice: &[S::Handle],
        state: &mut CrawlState,
        budget: &mut RetryBudget,
        started: Instant,
    ) -> Result<Option<TerminationReason>, CrawlOutcome> {
        for card in new_slice {
            let record = loop {
                match self.extractor.extract(&mut self.surface, card).await {
                    Ok(maybe) => break maybe,
                    Err(err) => match classify(&err) {
                        FailureClass::Fatal => {
                            return Err(self.fatal(
                                std::mem::take(&mut state.records),
                                started,
                                err.to_string(),
                            ));
                        }
                        FailureClass::Retryable if budget.consume() => {
                            sleep(jitter_ms(200..500)).await;
                        }
                        _ => {
                            self.sink.emit(&CrawlEvent::RetryDowngraded {
                                context: format!("candidate extraction: {}", err),
                            });
                            break None;
                        }
                    },
                }
            };

            match record {
                Some(record) => {
                    let key = record.identity_key();
                    if state.index.seen(key) {
                        self.sink.emit(&CrawlEvent::DuplicateSkipped {
                            name: record.name.clone(),
                        });
                        continue;
                    }
                    state.index.insert(key);
                    self.sink.emit(&CrawlEvent::RecordAccepted {
                        name: record.name.clone(),
                        total: state.records.len() + 1,
                    });
                    state.records.push(record);

                    // Stop immediately at the limit, without touching the
                    // remaining already-visible candidates.
                    if config.limit > 0 && state.records.len() >= config.limit {
                        return Ok(Some(TerminationReason::LimitReached));
                    }
                }
                None => {
                    self.sink.emit(&CrawlEvent::CandidateSkipped {
                        reason: "no extractable record".to_string(),
                    });
                }
            }
        }
        Ok(None)
    }

    fn fatal(&self, records: Vec<Record>, started: Instant, message: String) -> CrawlOutcome {
        log::error!("❌ Crawl aborted: {}", message);
        CrawlOutcome {
            records,
            reason: TerminationReason::SessionFatal,
            error: Some(message),
            elapsed: started.elapsed(),
        }
    }
}

/// Build the results-view URL for a query. The WHATWG parser
/// percent-encodes whatever the query contains.
fn results_url(query: &str) -> Result<String, url::ParseError> {
    let url = Url::parse(&format!("{}{}", RESULTS_URL_BASE, query))?;
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_url_encodes_spaces() {
        let url = results_url("coffee shops near oslo").unwrap();
        assert!(url.starts_with(RESULTS_URL_BASE));
        assert!(url.contains("coffee%20shops"));
    }

    #[test]
    fn test_config_unbounded_limit() {
        let config = CrawlConfig::new("pizza", 0, Duration::from_secs(60));
        assert_eq!(config.limit, 0);
    }
}
