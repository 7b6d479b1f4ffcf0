// Common utilities and shared types used across the application

pub mod constants;
pub mod error;
pub mod types;

pub use constants::NOT_AVAILABLE;
pub use error::{Result, ScraperError};
pub use types::{Column, EventRecord, Field, Site};
