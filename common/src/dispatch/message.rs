// Notification message content, shared by all platform formatters

use crate::models::{CellChange, MonitoringJob};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Placeholder substituted with the source id in the document link template
pub const LINK_ID_PLACEHOLDER: &str = "{id}";

/// The platform-independent content of one alert
#[derive(Debug, Clone, Serialize)]
pub struct NotificationMessage {
    pub title: String,
    pub source_name: String,
    pub address: String,
    pub old_value: String,
    pub new_value: String,
    pub delta: String,
    pub link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mention: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl NotificationMessage {
    pub fn new(job: &MonitoringJob, change: &CellChange, source_name: &str, link: String) -> Self {
        Self {
            title: format!("Change detected in {}", source_name),
            source_name: source_name.to_string(),
            address: change.address.clone(),
            old_value: change.old_value.clone(),
            new_value: change.new_value.clone(),
            delta: delta_summary(&change.old_value, &change.new_value),
            link,
            mention: job.mention.clone(),
            timestamp: Utc::now(),
        }
    }

    /// Old value as shown to users, with empty rendered visibly
    pub fn old_display(&self) -> &str {
        if self.old_value.is_empty() {
            "(empty)"
        } else {
            &self.old_value
        }
    }

    /// New value as shown to users, with empty rendered visibly
    pub fn new_display(&self) -> &str {
        if self.new_value.is_empty() {
            "(empty)"
        } else {
            &self.new_value
        }
    }
}

/// Deep link to the source document behind a change
pub fn document_link(template: &str, source_id: &str) -> String {
    template.replace(LINK_ID_PLACEHOLDER, source_id)
}

/// One-line summary of how a cell changed: an addition, a removal, a signed
/// numeric delta, or a plain text change
pub fn delta_summary(old_value: &str, new_value: &str) -> String {
    if old_value == new_value {
        return "no change".to_string();
    }
    if old_value.is_empty() {
        return format!("added: {}", new_value);
    }
    if new_value.is_empty() {
        return format!("removed: {}", old_value);
    }
    match (
        old_value.trim().parse::<f64>(),
        new_value.trim().parse::<f64>(),
    ) {
        (Ok(old_number), Ok(new_number)) => format!("{:+}", new_number - old_number),
        _ => "text changed".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_summary_added_and_removed() {
        assert_eq!(delta_summary("", "80000"), "added: 80000");
        assert_eq!(delta_summary("80000", ""), "removed: 80000");
    }

    #[test]
    fn test_delta_summary_numeric() {
        assert_eq!(delta_summary("10", "22.5"), "+12.5");
        assert_eq!(delta_summary("22.5", "10"), "-12.5");
        assert_eq!(delta_summary("100", "100.0"), "+0");
    }

    #[test]
    fn test_delta_summary_text() {
        assert_eq!(delta_summary("draft", "final"), "text changed");
        assert_eq!(delta_summary("10", "ten"), "text changed");
        assert_eq!(delta_summary("same", "same"), "no change");
    }

    #[test]
    fn test_document_link_substitution() {
        assert_eq!(
            document_link("https://docs.google.com/spreadsheets/d/{id}", "abc123"),
            "https://docs.google.com/spreadsheets/d/abc123"
        );
        assert_eq!(document_link("https://example.com/fixed", "abc"), "https://example.com/fixed");
    }
}
