//! Batch orchestration for one upload request.
//!
//! # Architecture
//!
//! ```text
//! UploadSet (videos, songs)
//!     └── BatchProcessor
//!           ├── plan: reserve output names, video-major
//!           ├── run: probe → offset → mux, bounded pool
//!           └── cleanup: remove the request's upload dir
//! ```
//!
//! # Example
//!
//! ```ignore
//! use vsm_core::orchestrator::{BatchProcessor, UploadDir};
//!
//! let processor = BatchProcessor::from_settings(&settings, backend);
//! let report = processor
//!     .process(&request_id, upload_dir, &uploads, &metadata, &cancel)
//!     .await;
//! println!("{} of {} pairs muxed", report.succeeded_count(), report.outcomes.len());
//! ```

mod cleanup;
mod processor;
mod types;

pub use cleanup::{CleanupError, CleanupReport, UploadDir};
pub use processor::BatchProcessor;
pub use types::{BatchReport, PairOutcome, PairStatus};
