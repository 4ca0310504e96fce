pub mod api;
pub mod auth;
pub mod client;

pub use auth::{DeviceCode, TokenInfo};
pub use client::TraktClient;
