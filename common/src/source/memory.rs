// In-memory value source for tests and fixtures

use crate::errors::FetchError;
use crate::models::Grid;
use crate::range::RangeRef;
use crate::source::ValueSource;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

/// StaticValueSource serves slices of in-memory grids keyed by source id.
///
/// Like the live API it returns only the populated part of a range: rows
/// beyond the stored grid and cells beyond a row's length are omitted
/// rather than padded.
#[derive(Default)]
pub struct StaticValueSource {
    grids: RwLock<HashMap<String, Grid>>,
}

impl StaticValueSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the full grid stored for a source id
    pub async fn set_values(&self, source_id: impl Into<String>, values: Grid) {
        self.grids.write().await.insert(source_id.into(), values);
    }

    /// Drop a source entirely
    pub async fn remove(&self, source_id: &str) {
        self.grids.write().await.remove(source_id);
    }
}

#[async_trait]
impl ValueSource for StaticValueSource {
    async fn fetch(
        &self,
        source_id: &str,
        range: &str,
        _timeout: Duration,
    ) -> Result<Grid, FetchError> {
        let parsed = RangeRef::parse(range)
            .map_err(|e| FetchError::Request(format!("Invalid range '{}': {}", range, e)))?;

        let grids = self.grids.read().await;
        let full = grids
            .get(source_id)
            .ok_or_else(|| FetchError::SourceNotFound(source_id.to_string()))?;

        let cols = full.iter().map(Vec::len).max().unwrap_or(0);
        let Some(bounds) = parsed.clip(full.len(), cols) else {
            return Ok(Vec::new());
        };

        let mut slice = Vec::with_capacity((bounds.end_row - bounds.start_row + 1) as usize);
        for row in bounds.start_row..=bounds.end_row {
            let cells = match full.get(row as usize) {
                Some(cells) => {
                    let start = (bounds.start_col as usize).min(cells.len());
                    let end = ((bounds.end_col + 1) as usize).min(cells.len());
                    cells[start..end].to_vec()
                }
                None => Vec::new(),
            };
            slice.push(cells);
        }
        Ok(slice)
    }
}
