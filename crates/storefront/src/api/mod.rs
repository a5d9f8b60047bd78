//! Network adapters for the cart and order ports.

mod auth;
mod catalog;
mod client;
mod types;

pub use auth::StaticTokenAuth;
pub use catalog::CatalogCache;
pub use client::ApiClient;
pub use types::CartResponse;
