pub mod douban;
pub mod error;
pub mod http;
pub mod rows;
pub mod traits;
pub mod trakt;

pub use douban::DoubanClient;
pub use error::SourceError;
pub use http::build_client;
pub use rows::{read_raw_records, read_raw_records_from, retain_after};
pub use traits::{CatalogSearch, InterestFeed, SubjectDetail, SubjectDetailSource, SyncTransport, TransportResponse};
pub use trakt::{DeviceCode, TokenInfo, TraktClient};
