// Grid diff engine: bounded, ordered cell-level comparison of two snapshots

use crate::models::{cell_value, CellChange, Grid};
use crate::range::RangeRef;

/// Compare two snapshots of the same monitored range.
///
/// Both grids are slices of the sheet starting at `range`'s top-left corner;
/// each may be ragged or shorter than the other, and absent cells compare as
/// empty strings. Changes are reported in row-major order and capped at
/// `max_changes` to keep a single burst of edits from flooding a webhook.
/// Reported coordinates are sheet-absolute so that `address` names the cell
/// as the source document displays it.
pub fn diff_grids(
    previous: &Grid,
    current: &Grid,
    range: &RangeRef,
    max_changes: usize,
) -> Vec<CellChange> {
    let mut changes = Vec::new();
    if max_changes == 0 {
        return changes;
    }

    let rows = previous.len().max(current.len());
    let cols = previous
        .iter()
        .chain(current.iter())
        .map(Vec::len)
        .max()
        .unwrap_or(0);

    'rows: for row in 0..rows {
        for col in 0..cols {
            let old_value = cell_value(previous, row, col);
            let new_value = cell_value(current, row, col);
            if old_value == new_value {
                continue;
            }

            let sheet_row = range.start_row + row as u32;
            let sheet_col = range.start_col + col as u32;
            changes.push(CellChange {
                row: sheet_row,
                col: sheet_col,
                address: range.address_of(sheet_row, sheet_col),
                old_value: old_value.to_string(),
                new_value: new_value.to_string(),
            });

            if changes.len() >= max_changes {
                break 'rows;
            }
        }
    }

    changes
}
