// Value source adapters
// Provides trait and implementations for live and in-memory tabular sources

pub mod http;
pub mod memory;

use crate::errors::FetchError;
use crate::models::Grid;
use async_trait::async_trait;
use std::time::Duration;

pub use http::LiveValueSource;
pub use memory::StaticValueSource;

/// ValueSource fetches a rectangular slice of values for a (source, range) pair
#[async_trait]
pub trait ValueSource: Send + Sync {
    /// Fetch the current values of `range` from the source named by
    /// `source_id`, returning within `timeout` rather than hanging.
    async fn fetch(
        &self,
        source_id: &str,
        range: &str,
        timeout: Duration,
    ) -> Result<Grid, FetchError>;
}
