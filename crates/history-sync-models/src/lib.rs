pub mod media;
pub mod subject;
pub mod record;
pub mod interest;
pub mod catalog;
pub mod sync_entry;
pub mod export_row;
pub mod excluded_item;

pub use media::MediaKind;
pub use subject::SubjectId;
pub use record::{RawRecord, ResolvedRecord, TimePrecision, TimeSource, WatchTime};
pub use interest::{InterestEntry, InterestMap};
pub use catalog::{CatalogCandidate, CatalogMatch};
pub use sync_entry::{MovieEntry, SeasonEntry, ShowSeasonGroup, ShowWholeEntry, SlugIds, SyncBatch, SyncBucket, SyncEntry, SyncMode, SyncPayload};
pub use export_row::{ExportRow, EXPORT_FIELDS};
pub use excluded_item::ExcludedRecord;
