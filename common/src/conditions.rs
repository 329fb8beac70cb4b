// Alert condition model and evaluation

use crate::models::{cell_value, CellChange, Grid};
use crate::range::{GridBounds, RangeRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The rule half of a condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionKind {
    /// Old and new values differ
    Changed,
    /// New value parses as a number strictly above the threshold
    GreaterThan { threshold: f64 },
    /// New value parses as a number strictly below the threshold
    LessThan { threshold: f64 },
    /// New value's string form equals the operand
    Equals { value: String },
    /// New value's string form differs from the operand
    NotEquals { value: String },
    /// New value's string form contains the operand
    Contains { value: String },
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConditionKind::Changed => "changed",
            ConditionKind::GreaterThan { .. } => "greater_than",
            ConditionKind::LessThan { .. } => "less_than",
            ConditionKind::Equals { .. } => "equals",
            ConditionKind::NotEquals { .. } => "not_equals",
            ConditionKind::Contains { .. } => "contains",
        };
        write!(f, "{}", label)
    }
}

/// An alerting condition attached to a job.
///
/// Without `cell_ref` the rule applies to the cell that changed. With a
/// reference the rule is evaluated against the referenced cells in the full
/// before/after snapshots instead, regardless of which cell triggered the
/// diff; a multi-cell reference is satisfied when any cell in it satisfies
/// the rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(flatten)]
    pub kind: ConditionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell_ref: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Condition {
    /// A condition on the changed cell itself
    pub fn new(kind: ConditionKind) -> Self {
        Self {
            kind,
            cell_ref: None,
            enabled: true,
        }
    }

    /// A condition scoped to its own cell or range reference
    pub fn scoped(kind: ConditionKind, cell_ref: impl Into<String>) -> Self {
        Self {
            kind,
            cell_ref: Some(cell_ref.into()),
            enabled: true,
        }
    }
}

/// Snapshots and range context needed to evaluate address-scoped conditions
pub struct EvaluationContext<'a> {
    /// Snapshot before the change, sliced to the monitored range
    pub previous: &'a Grid,
    /// Snapshot after the change, sliced to the monitored range
    pub current: &'a Grid,
    /// The monitored range; its top-left corner anchors both slices
    pub range: &'a RangeRef,
}

/// Decide whether a detected change should produce a notification.
///
/// With no enabled conditions, any change notifies. With one or more, the
/// conditions are OR'd: the first satisfied condition wins and the rest are
/// not evaluated.
pub fn should_notify(
    conditions: &[Condition],
    change: &CellChange,
    ctx: &EvaluationContext<'_>,
) -> bool {
    let mut enabled = conditions.iter().filter(|c| c.enabled).peekable();
    if enabled.peek().is_none() {
        return change.old_value != change.new_value;
    }
    enabled.any(|condition| condition_satisfied(condition, change, ctx))
}

fn condition_satisfied(
    condition: &Condition,
    change: &CellChange,
    ctx: &EvaluationContext<'_>,
) -> bool {
    match &condition.cell_ref {
        None => rule_satisfied(&condition.kind, &change.old_value, &change.new_value),
        Some(reference) => match RangeRef::parse(reference) {
            Ok(scope) => scope_satisfied(&condition.kind, &scope, ctx),
            // References are validated at job creation; an unparseable one
            // here is stale data and simply never fires.
            Err(_) => false,
        },
    }
}

fn scope_satisfied(kind: &ConditionKind, scope: &RangeRef, ctx: &EvaluationContext<'_>) -> bool {
    let rows = ctx.previous.len().max(ctx.current.len());
    let cols = ctx
        .previous
        .iter()
        .chain(ctx.current.iter())
        .map(Vec::len)
        .max()
        .unwrap_or(0);

    let Some(bounds) = relative_bounds(scope, ctx.range, rows, cols) else {
        return false;
    };

    for row in bounds.start_row..=bounds.end_row {
        for col in bounds.start_col..=bounds.end_col {
            let old_value = cell_value(ctx.previous, row as usize, col as usize);
            let new_value = cell_value(ctx.current, row as usize, col as usize);
            if rule_satisfied(kind, old_value, new_value) {
                return true;
            }
        }
    }
    false
}

/// Translate a sheet-coordinate scope into slice coordinates, clipped to the
/// populated extent of the snapshots. Returns `None` when the scope and the
/// monitored slice do not overlap.
fn relative_bounds(
    scope: &RangeRef,
    monitored: &RangeRef,
    rows: usize,
    cols: usize,
) -> Option<GridBounds> {
    if rows == 0 || cols == 0 {
        return None;
    }
    let origin_row = monitored.start_row;
    let origin_col = monitored.start_col;
    let last_row = origin_row + rows as u32 - 1;
    let last_col = origin_col + cols as u32 - 1;

    let start_row = scope.start_row.max(origin_row);
    let start_col = scope.start_col.max(origin_col);
    let end_row = scope.end_row.unwrap_or(last_row).min(last_row);
    let end_col = scope.end_col.unwrap_or(last_col).min(last_col);
    if start_row > end_row || start_col > end_col {
        return None;
    }

    Some(GridBounds {
        start_row: start_row - origin_row,
        start_col: start_col - origin_col,
        end_row: end_row - origin_row,
        end_col: end_col - origin_col,
    })
}

fn rule_satisfied(kind: &ConditionKind, old_value: &str, new_value: &str) -> bool {
    match kind {
        ConditionKind::Changed => old_value != new_value,
        ConditionKind::GreaterThan { threshold } => match parse_numeric(new_value) {
            Some(value) => value > *threshold,
            None => false,
        },
        ConditionKind::LessThan { threshold } => match parse_numeric(new_value) {
            Some(value) => value < *threshold,
            None => false,
        },
        ConditionKind::Equals { value } => new_value == value,
        ConditionKind::NotEquals { value } => new_value != value,
        ConditionKind::Contains { value } => new_value.contains(value.as_str()),
    }
}

fn parse_numeric(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok()
}
