//! # Drift Linter
//!
//! Flags documentation that has drifted away from the code it describes.
//!
//! Every indexed doc chunk is compared with its nearest code chunks. The best
//! similarity decides the severity:
//!
//! | Best score                 | Severity               |
//! |----------------------------|------------------------|
//! | no code match ≥ min_score  | info (orphaned)        |
//! | < critical                 | critical               |
//! | < warning                  | warning                |
//! | < healthy                  | healthy, reported      |
//! | ≥ healthy                  | healthy, not reported  |
//!
//! ## Example
//!
//! ```no_run
//! use drift_linter::{Linter, LinterConfig};
//! use drift_vector_store::VectorStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(VectorStore::open(".drift/index.json", 384).await?);
//!     let linter = Linter::new(store, LinterConfig::default())?;
//!     let report = linter.check_path("docs/")?;
//!     println!("{report}");
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod linter;
mod report;

pub use config::LinterConfig;
pub use error::{LinterError, Result};
pub use linter::Linter;
pub use report::{CodeRef, DocRef, Report, Severity, SeverityCounts, StalenessItem};
