// Maps Harvester
//
// Incrementally harvests structured business records from an
// infinite-scroll, click-to-expand map-style listing surface driven
// through a remote browser session.

pub mod api;
pub mod crawler;
pub mod dedupe;
pub mod events;
pub mod extract;
pub mod paginate;
pub mod record;
pub mod retry;
pub mod session;
pub mod surface;
pub mod utils;

// Re-export main types for convenience
pub use crawler::{CrawlConfig, CrawlOutcome, Crawler, TerminationReason};
pub use dedupe::DedupeIndex;
pub use events::{CrawlEvent, EventSink, LogSink, NullSink};
pub use extract::RecordExtractor;
pub use paginate::PaginationDriver;
pub use record::Record;
pub use retry::{FailureClass, RetryBudget, classify};
pub use session::BrowserSurface;
pub use surface::{Key, RenderSurface, SurfaceError, SurfaceSelectors};
