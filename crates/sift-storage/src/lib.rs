//! Durable event storage and analytics for Sift.
//!
//! - [`store`]: SQLite connection pool and schema
//! - [`events`]: search and feedback event records
//! - [`recorder`]: the single writer; search writes run off the request path
//! - [`analytics`]: read-only rollups over a time window
//!
//! # Example
//!
//! ```no_run
//! use sift_core::SearchMode;
//! use sift_storage::{Aggregator, EventRecorder, EventStore, FeedbackEvent, SearchEvent, Window};
//!
//! # async fn run() -> sift_core::Result<()> {
//! let store = EventStore::open("sqlite://sift.db").await?;
//! let recorder = EventRecorder::new(&store).await?;
//!
//! let receipt = recorder
//!     .record_search(SearchEvent::new("Election", "election", SearchMode::Hybrid))
//!     .await?;
//! recorder
//!     .record_feedback(FeedbackEvent::new(receipt.log_id(), "doc-1", 1))
//!     .await?;
//!
//! let report = Aggregator::new(&store)
//!     .report(&Window::ending_now(7)?, 10, 20)
//!     .await?;
//! println!("{} searches", report.overview.total_searches);
//! # Ok(())
//! # }
//! ```

pub mod analytics;
pub mod events;
pub mod recorder;
pub mod store;

pub use analytics::{
    Aggregator, AnalyticsReport, DailyCount, DocumentRating, ModeCount, ModeFeedback, Overview,
    QueryCount, Window,
};
pub use events::{FeedbackEvent, FeedbackRecord, SearchEvent, SearchRecord};
pub use recorder::{EventRecorder, SearchReceipt, WriteState};
pub use store::EventStore;
