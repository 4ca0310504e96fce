pub mod config;
pub mod credentials;
pub mod paths;

pub use config::{all_statuses, Config, ConfigError, DoubanConfig, HttpConfig, PacingConfig, RefineConfig, SyncOptions, TraktConfig, ALL_STATUSES_MAX_EMPTY_PAGES, DEFAULT_BATCH_SIZE};
pub use credentials::{resolve_credential, CredentialStore, TRAKT_ACCESS_TOKEN_ENV, TRAKT_CLIENT_ID_ENV};
pub use paths::{base_path_override, PathManager};
