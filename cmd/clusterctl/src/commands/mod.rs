//! CLI commands module.

mod clusters;
mod documents;
mod util;

pub use clusters::{CleanupCommand, ClustersCommand, HistoryCommand, MergeCommand, RefreshCommand};
pub use documents::{IngestCommand, RelatedCommand, ReprocessCommand};
