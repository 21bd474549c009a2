pub mod auth;
pub mod client;
pub mod collection;
pub mod connection;
pub mod config;
pub mod entity;
pub mod error;
pub mod iterator;
pub mod query;
mod requests;
pub mod types;

pub use auth::{AccessToken, Grant, TokenProvider};
pub use client::UsergridClient;
pub use collection::{CollectionPager, Page};
pub use connection::ConnectionDirection;
pub use config::{UsergridConfig, DEFAULT_PAGE_SIZE};
pub use entity::Entity;
pub use error::UsergridError;
pub use iterator::EntityIterator;
pub use query::{SortOrder, UsergridQuery};
pub use types::UsergridResponse;
