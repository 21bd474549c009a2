// src/types/mod.rs

pub mod date;
pub mod response;

pub use date::{millis_to_datetime, DateField};
pub use response::UsergridResponse;
