pub mod aggregator;
pub mod classifier;
pub mod export;
pub mod interests;
pub mod matcher;
pub mod pipeline;
pub mod progress;
pub mod refine;
pub mod resolver;
pub mod time;
pub mod transmit;

pub use aggregator::{MatchedRecord, PayloadAggregator, SyncPlan, DEFAULT_BATCH_SIZE};
pub use classifier::{classify_type, extract_season, normalize_for_search};
pub use export::{from_export_row, needs_refine, read_export, read_export_rows, write_export, ExportError};
pub use interests::{collect_interest_map, FeedOptions};
pub use matcher::{CatalogMatcher, MatchAttempt};
pub use pipeline::{MigrationPipeline, PipelineOutput, PipelineStats};
pub use progress::{LogProgress, NoProgress, ProgressSink};
pub use refine::{refine_records, write_refined, RefineOptions, RefineOutcome};
pub use resolver::{DeepRefineOptions, Resolution, TimeResolver};
pub use transmit::{preview_payloads, transmit_batches, BatchOutcome, PayloadPreview, SyncReport};
