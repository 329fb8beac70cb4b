// Property-based tests for A1-style range addressing

use common::errors::RangeError;
use common::range::{cell_address, column_letters, column_number, RangeRef};
use proptest::prelude::*;

/// **Property: column letters round-trip**
///
/// *For any* 1-based column number in a realistic sheet width, rendering it
/// as letters and parsing the letters back yields the original number.
#[test]
fn property_column_letters_round_trip() {
    proptest!(|(col in 1u32..=100_000u32)| {
        let letters = column_letters(col);
        prop_assert!(!letters.is_empty());
        prop_assert!(letters.chars().all(|c| c.is_ascii_uppercase()));
        prop_assert_eq!(column_number(&letters).unwrap(), col);
    });
}

/// **Property: cell addresses parse back to their coordinate**
///
/// *For any* zero-based sheet coordinate, the rendered address parses as a
/// single cell at exactly that coordinate.
#[test]
fn property_cell_address_parses_back() {
    proptest!(|(row in 0u32..10_000, col in 0u32..1_000)| {
        let address = cell_address(row, col);
        let parsed = RangeRef::parse(&address).unwrap();
        prop_assert!(parsed.is_single_cell());
        prop_assert_eq!(parsed.start_row, row);
        prop_assert_eq!(parsed.start_col, col);
    });
}

/// **Property: rectangle parsing preserves its corners**
///
/// *For any* ordered pair of corners, the parsed rectangle carries exactly
/// the zero-based bounds the expression names, and its canonical display
/// parses back to the same range.
#[test]
fn property_rectangle_parse_round_trip() {
    proptest!(|(
        start_row in 0u32..500,
        start_col in 0u32..100,
        row_span in 0u32..500,
        col_span in 0u32..100,
    )| {
        let end_row = start_row + row_span;
        let end_col = start_col + col_span;
        let expr = format!(
            "{}{}:{}{}",
            column_letters(start_col + 1),
            start_row + 1,
            column_letters(end_col + 1),
            end_row + 1,
        );

        let parsed = RangeRef::parse(&expr).unwrap();
        prop_assert_eq!(parsed.start_row, start_row);
        prop_assert_eq!(parsed.start_col, start_col);
        prop_assert_eq!(parsed.end_row, Some(end_row));
        prop_assert_eq!(parsed.end_col, Some(end_col));

        let reparsed = RangeRef::parse(&parsed.to_string()).unwrap();
        prop_assert_eq!(reparsed, parsed);
    });
}

/// **Property: inverted rectangles are always rejected**
///
/// *For any* two distinct rows, putting the larger one first yields an
/// inverted-range error rather than a silently reordered range.
#[test]
fn property_inverted_ranges_rejected() {
    proptest!(|(a in 0u32..500, b in 0u32..500, col in 0u32..100)| {
        prop_assume!(a != b);
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let letters = column_letters(col + 1);
        let expr = format!("{}{}:{}{}", letters, hi + 1, letters, lo + 1);
        prop_assert!(
            matches!(
                RangeRef::parse(&expr),
                Err(RangeError::InvertedRange { .. })
            ),
            "expected InvertedRange error for {:?}",
            expr
        );
    });
}

/// **Property: clipping never escapes the grid**
///
/// *For any* rectangle and grid size, a successful clip starts where the
/// range starts and ends inside both the grid and the range; a `None` clip
/// only happens when the range starts beyond the grid.
#[test]
fn property_clip_stays_inside_grid() {
    proptest!(|(
        start_row in 0u32..50,
        start_col in 0u32..50,
        row_span in 0u32..50,
        col_span in 0u32..50,
        rows in 0usize..60,
        cols in 0usize..60,
    )| {
        let range = RangeRef {
            sheet: None,
            start_row,
            start_col,
            end_row: Some(start_row + row_span),
            end_col: Some(start_col + col_span),
        };

        match range.clip(rows, cols) {
            Some(bounds) => {
                prop_assert_eq!(bounds.start_row, start_row);
                prop_assert_eq!(bounds.start_col, start_col);
                prop_assert!(bounds.start_row <= bounds.end_row);
                prop_assert!(bounds.start_col <= bounds.end_col);
                prop_assert!((bounds.end_row as usize) < rows);
                prop_assert!((bounds.end_col as usize) < cols);
                prop_assert!(bounds.end_row <= start_row + row_span);
                prop_assert!(bounds.end_col <= start_col + col_span);
            }
            None => {
                prop_assert!(
                    rows == 0
                        || cols == 0
                        || start_row as usize >= rows
                        || start_col as usize >= cols
                );
            }
        }
    });
}

/// **Property: open axes clip to the grid's full extent**
///
/// *For any* column range like "C:C" and non-empty grid wide enough to
/// contain it, the clip spans every row of the grid.
#[test]
fn property_open_row_axis_spans_grid() {
    proptest!(|(col in 0u32..20, rows in 1usize..100)| {
        let letters = column_letters(col + 1);
        let range = RangeRef::parse(&format!("{}:{}", letters, letters)).unwrap();

        let bounds = range.clip(rows, (col + 1) as usize).unwrap();
        prop_assert_eq!(bounds.start_row, 0);
        prop_assert_eq!(bounds.end_row, (rows - 1) as u32);
        prop_assert_eq!(bounds.start_col, col);
        prop_assert_eq!(bounds.end_col, col);
    });
}
