// A1-style range addressing shared by diffing, conditions, and notifications

use crate::errors::RangeError;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

static ENDPOINT_PATTERN: OnceLock<Regex> = OnceLock::new();

/// Regex for a single range endpoint: column letters, row digits, or both
fn endpoint_pattern() -> &'static Regex {
    ENDPOINT_PATTERN
        .get_or_init(|| Regex::new(r"^([A-Za-z]*)([0-9]*)$").expect("Invalid endpoint pattern"))
}

/// Convert 1-based column number to column letters (1 -> A, 26 -> Z, 27 -> AA)
pub fn column_letters(mut index: u32) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        index = (index - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Convert column letters to 1-based column number (A -> 1, Z -> 26, AA -> 27)
pub fn column_number(letters: &str) -> Result<u32, RangeError> {
    if letters.is_empty() {
        return Err(RangeError::InvalidColumn(letters.to_string()));
    }
    let mut index: u32 = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return Err(RangeError::InvalidColumn(letters.to_string()));
        }
        let digit = ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
        index = index
            .checked_mul(26)
            .and_then(|i| i.checked_add(digit))
            .ok_or_else(|| RangeError::InvalidColumn(letters.to_string()))?;
    }
    Ok(index)
}

/// Spreadsheet notation for a zero-based (row, col) coordinate (0,0 -> A1)
pub fn cell_address(row: u32, col: u32) -> String {
    format!("{}{}", column_letters(col + 1), row + 1)
}

/// One endpoint of a range expression, with either axis possibly open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Endpoint {
    row: Option<u32>,
    col: Option<u32>,
}

/// A parsed A1-style reference with zero-based inclusive bounds.
///
/// `end_row`/`end_col` of `None` mean the range is open on that axis and
/// extends to the grid's actual extent ("B:B" has open rows, "3:7" has open
/// columns). Bounds are clipped to a concrete grid via [`RangeRef::clip`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRef {
    pub sheet: Option<String>,
    pub start_row: u32,
    pub start_col: u32,
    pub end_row: Option<u32>,
    pub end_col: Option<u32>,
}

/// A range clipped to a concrete grid: all bounds zero-based, inclusive,
/// and guaranteed to lie inside the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridBounds {
    pub start_row: u32,
    pub start_col: u32,
    pub end_row: u32,
    pub end_col: u32,
}

impl RangeRef {
    /// Parse an A1-style reference: "A1", "A1:C10", "B:B", "3:7",
    /// optionally prefixed with "SheetName!"
    pub fn parse(reference: &str) -> Result<Self, RangeError> {
        let trimmed = reference.trim();
        if trimmed.is_empty() {
            return Err(RangeError::InvalidReference {
                reference: reference.to_string(),
                reason: "reference is empty".to_string(),
            });
        }

        let (sheet, cells) = match trimmed.rsplit_once('!') {
            Some((sheet, cells)) if !sheet.is_empty() => (Some(sheet.to_string()), cells),
            Some(_) => {
                return Err(RangeError::InvalidReference {
                    reference: reference.to_string(),
                    reason: "sheet name before '!' is empty".to_string(),
                })
            }
            None => (None, trimmed),
        };

        let (start_raw, end_raw) = match cells.split_once(':') {
            Some((start, end)) => (start, Some(end)),
            None => (cells, None),
        };

        let start = parse_endpoint(start_raw, reference)?;
        let end = match end_raw {
            Some(raw) => Some(parse_endpoint(raw, reference)?),
            None => None,
        };

        let parsed = match end {
            None => {
                // A single endpoint must name one cell, never a bare row or column.
                let (row, col) = match (start.row, start.col) {
                    (Some(row), Some(col)) => (row, col),
                    _ => {
                        return Err(RangeError::InvalidReference {
                            reference: reference.to_string(),
                            reason: "a single endpoint must name a cell like 'A1'".to_string(),
                        })
                    }
                };
                RangeRef {
                    sheet,
                    start_row: row,
                    start_col: col,
                    end_row: Some(row),
                    end_col: Some(col),
                }
            }
            Some(end) => RangeRef {
                sheet,
                start_row: start.row.unwrap_or(0),
                start_col: start.col.unwrap_or(0),
                end_row: end.row,
                end_col: end.col,
            },
        };

        if let Some(end_row) = parsed.end_row {
            if parsed.start_row > end_row {
                return Err(RangeError::InvertedRange {
                    reference: reference.to_string(),
                });
            }
        }
        if let Some(end_col) = parsed.end_col {
            if parsed.start_col > end_col {
                return Err(RangeError::InvertedRange {
                    reference: reference.to_string(),
                });
            }
        }

        Ok(parsed)
    }

    /// Whether the reference names exactly one cell
    pub fn is_single_cell(&self) -> bool {
        self.end_row == Some(self.start_row) && self.end_col == Some(self.start_col)
    }

    /// Clip the range to a grid of `rows` x `cols` cells.
    ///
    /// Returns `None` when the intersection is empty, including for an
    /// empty grid.
    pub fn clip(&self, rows: usize, cols: usize) -> Option<GridBounds> {
        if rows == 0 || cols == 0 {
            return None;
        }
        let last_row = (rows - 1) as u32;
        let last_col = (cols - 1) as u32;
        if self.start_row > last_row || self.start_col > last_col {
            return None;
        }
        Some(GridBounds {
            start_row: self.start_row,
            start_col: self.start_col,
            end_row: self.end_row.unwrap_or(last_row).min(last_row),
            end_col: self.end_col.unwrap_or(last_col).min(last_col),
        })
    }

    /// Spreadsheet notation for a zero-based sheet coordinate, carrying this
    /// range's sheet prefix when present
    pub fn address_of(&self, row: u32, col: u32) -> String {
        match &self.sheet {
            Some(sheet) => format!("{}!{}", sheet, cell_address(row, col)),
            None => cell_address(row, col),
        }
    }
}

impl fmt::Display for RangeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sheet) = &self.sheet {
            write!(f, "{}!", sheet)?;
        }
        match (self.end_row, self.end_col) {
            (Some(end_row), Some(end_col)) => {
                if self.is_single_cell() {
                    write!(f, "{}", cell_address(self.start_row, self.start_col))
                } else {
                    write!(
                        f,
                        "{}:{}",
                        cell_address(self.start_row, self.start_col),
                        cell_address(end_row, end_col)
                    )
                }
            }
            (None, Some(end_col)) => write!(
                f,
                "{}:{}",
                column_letters(self.start_col + 1),
                column_letters(end_col + 1)
            ),
            (Some(end_row), None) => write!(f, "{}:{}", self.start_row + 1, end_row + 1),
            (None, None) => write!(
                f,
                "{}{}:",
                column_letters(self.start_col + 1),
                self.start_row + 1
            ),
        }
    }
}

fn parse_endpoint(raw: &str, reference: &str) -> Result<Endpoint, RangeError> {
    let raw = raw.trim();
    let captures =
        endpoint_pattern()
            .captures(raw)
            .ok_or_else(|| RangeError::InvalidReference {
                reference: reference.to_string(),
                reason: format!("'{}' is not a cell, column, or row", raw),
            })?;

    let letters = &captures[1];
    let digits = &captures[2];
    if letters.is_empty() && digits.is_empty() {
        return Err(RangeError::InvalidReference {
            reference: reference.to_string(),
            reason: "endpoint is empty".to_string(),
        });
    }

    let col = if letters.is_empty() {
        None
    } else {
        Some(column_number(letters)? - 1)
    };
    let row = if digits.is_empty() {
        None
    } else {
        let number: u32 = digits
            .parse()
            .map_err(|_| RangeError::InvalidRow(digits.to_string()))?;
        if number == 0 {
            return Err(RangeError::InvalidRow(digits.to_string()));
        }
        Some(number - 1)
    };

    Ok(Endpoint { row, col })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters_round_trip() {
        assert_eq!(column_letters(1), "A");
        assert_eq!(column_letters(26), "Z");
        assert_eq!(column_letters(27), "AA");
        assert_eq!(column_letters(52), "AZ");
        assert_eq!(column_letters(703), "AAA");

        assert_eq!(column_number("A").unwrap(), 1);
        assert_eq!(column_number("Z").unwrap(), 26);
        assert_eq!(column_number("AA").unwrap(), 27);
        assert_eq!(column_number("az").unwrap(), 52);
    }

    #[test]
    fn test_column_number_rejects_non_letters() {
        assert!(column_number("").is_err());
        assert!(column_number("A1").is_err());
        assert!(column_number("Ä").is_err());
    }

    #[test]
    fn test_parse_single_cell() {
        let range = RangeRef::parse("B3").unwrap();
        assert_eq!(range.sheet, None);
        assert_eq!(range.start_row, 2);
        assert_eq!(range.start_col, 1);
        assert_eq!(range.end_row, Some(2));
        assert_eq!(range.end_col, Some(1));
        assert!(range.is_single_cell());
    }

    #[test]
    fn test_parse_rectangle() {
        let range = RangeRef::parse("A1:C10").unwrap();
        assert_eq!(range.start_row, 0);
        assert_eq!(range.start_col, 0);
        assert_eq!(range.end_row, Some(9));
        assert_eq!(range.end_col, Some(2));
        assert!(!range.is_single_cell());
    }

    #[test]
    fn test_parse_column_range() {
        let range = RangeRef::parse("B:B").unwrap();
        assert_eq!(range.start_row, 0);
        assert_eq!(range.start_col, 1);
        assert_eq!(range.end_row, None);
        assert_eq!(range.end_col, Some(1));
    }

    #[test]
    fn test_parse_row_range() {
        let range = RangeRef::parse("3:7").unwrap();
        assert_eq!(range.start_row, 2);
        assert_eq!(range.start_col, 0);
        assert_eq!(range.end_row, Some(6));
        assert_eq!(range.end_col, None);
    }

    #[test]
    fn test_parse_sheet_prefix() {
        let range = RangeRef::parse("Revenue 2024!E1:E20").unwrap();
        assert_eq!(range.sheet.as_deref(), Some("Revenue 2024"));
        assert_eq!(range.start_col, 4);
        assert_eq!(range.end_row, Some(19));
    }

    #[test]
    fn test_parse_is_case_insensitive_and_trims() {
        let range = RangeRef::parse("  e1:e20 ").unwrap();
        assert_eq!(range.start_col, 4);
        assert_eq!(range.end_col, Some(4));
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert!(RangeRef::parse("").is_err());
        assert!(RangeRef::parse("1A").is_err());
        assert!(RangeRef::parse("A0").is_err());
        assert!(RangeRef::parse("A1:").is_err());
        assert!(RangeRef::parse(":B2").is_err());
        assert!(RangeRef::parse("A1:B2:C3").is_err());
        assert!(RangeRef::parse("!A1").is_err());
        assert!(RangeRef::parse("B").is_err());
    }

    #[test]
    fn test_parse_rejects_inverted_ranges() {
        assert!(matches!(
            RangeRef::parse("C10:A1"),
            Err(RangeError::InvertedRange { .. })
        ));
        assert!(matches!(
            RangeRef::parse("A5:C1"),
            Err(RangeError::InvertedRange { .. })
        ));
    }

    #[test]
    fn test_clip_to_grid_extent() {
        let range = RangeRef::parse("B2:Z100").unwrap();
        let bounds = range.clip(10, 4).unwrap();
        assert_eq!(bounds.start_row, 1);
        assert_eq!(bounds.start_col, 1);
        assert_eq!(bounds.end_row, 9);
        assert_eq!(bounds.end_col, 3);
    }

    #[test]
    fn test_clip_open_axes() {
        let cols = RangeRef::parse("B:B").unwrap();
        let bounds = cols.clip(5, 3).unwrap();
        assert_eq!(bounds.start_row, 0);
        assert_eq!(bounds.end_row, 4);
        assert_eq!(bounds.start_col, 1);
        assert_eq!(bounds.end_col, 1);

        let rows = RangeRef::parse("3:7").unwrap();
        let bounds = rows.clip(5, 3).unwrap();
        assert_eq!(bounds.start_row, 2);
        assert_eq!(bounds.end_row, 4);
        assert_eq!(bounds.end_col, 2);
    }

    #[test]
    fn test_clip_outside_grid_is_empty() {
        let range = RangeRef::parse("E1:E20").unwrap();
        assert!(range.clip(10, 3).is_none());
        assert!(range.clip(0, 0).is_none());
    }

    #[test]
    fn test_address_of_carries_sheet_prefix() {
        let plain = RangeRef::parse("E1:E20").unwrap();
        assert_eq!(plain.address_of(9, 4), "E10");

        let sheeted = RangeRef::parse("Data!E1:E20").unwrap();
        assert_eq!(sheeted.address_of(9, 4), "Data!E10");
    }

    #[test]
    fn test_display_round_trip() {
        for expr in ["A1", "A1:C10", "B:B", "3:7", "Data!E1:E20"] {
            let parsed = RangeRef::parse(expr).unwrap();
            assert_eq!(parsed.to_string(), expr);
        }
    }
}
