// Webhook platform detection and payload formatting

use crate::dispatch::message::NotificationMessage;
use reqwest::Url;
use serde_json::{json, Value};
use std::fmt;

/// Chat platform family behind a webhook URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Slack,
    Discord,
    Teams,
    GoogleChat,
    Generic,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Platform::Slack => "slack",
            Platform::Discord => "discord",
            Platform::Teams => "teams",
            Platform::GoogleChat => "google_chat",
            Platform::Generic => "generic",
        };
        write!(f, "{}", label)
    }
}

/// Whether `host` is `domain` itself or one of its subdomains
fn in_domain(host: &str, domain: &str) -> bool {
    match host.strip_suffix(domain) {
        Some(rest) => rest.is_empty() || rest.ends_with('.'),
        None => false,
    }
}

impl Platform {
    /// Infer the platform from a webhook URL's host. Unknown or unparseable
    /// hosts fall back to the generic formatter.
    pub fn from_webhook_url(url: &str) -> Self {
        let host = match Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
        {
            Some(host) => host,
            None => return Platform::Generic,
        };

        if in_domain(&host, "slack.com") {
            Platform::Slack
        } else if in_domain(&host, "discord.com") || in_domain(&host, "discordapp.com") {
            Platform::Discord
        } else if in_domain(&host, "office.com") {
            Platform::Teams
        } else if in_domain(&host, "chat.googleapis.com") {
            Platform::GoogleChat
        } else {
            Platform::Generic
        }
    }

    /// Build the platform-specific JSON body for one alert
    pub fn payload(&self, message: &NotificationMessage) -> Value {
        match self {
            Platform::Slack => slack_payload(message),
            Platform::Discord => discord_payload(message),
            Platform::Teams => teams_payload(message),
            Platform::GoogleChat => google_chat_payload(message),
            Platform::Generic => generic_payload(message),
        }
    }
}

/// Markdown-ish text body used by the text-first platforms
fn text_body(message: &NotificationMessage, link_line: &str) -> String {
    let mut lines = Vec::new();
    if let Some(mention) = &message.mention {
        lines.push(mention.clone());
    }
    lines.push(format!("*{}*", message.title));
    lines.push(format!("• Cell: {}", message.address));
    lines.push(format!("• Was: {}", message.old_display()));
    lines.push(format!("• Now: {}", message.new_display()));
    lines.push(format!("• Delta: {}", message.delta));
    lines.push(link_line.to_string());
    lines.join("\n")
}

fn slack_payload(message: &NotificationMessage) -> Value {
    let link_line = format!("<{}|Open source document>", message.link);
    json!({ "text": text_body(message, &link_line) })
}

fn google_chat_payload(message: &NotificationMessage) -> Value {
    let link_line = format!("<{}|Open source document>", message.link);
    json!({ "text": text_body(message, &link_line) })
}

fn discord_payload(message: &NotificationMessage) -> Value {
    let mut payload = json!({
        "embeds": [{
            "title": message.title,
            "url": message.link,
            "color": 0x00AAFF,
            "fields": [
                { "name": "Cell", "value": message.address, "inline": true },
                { "name": "Was", "value": message.old_display(), "inline": true },
                { "name": "Now", "value": message.new_display(), "inline": true },
                { "name": "Delta", "value": message.delta, "inline": true },
            ],
            "footer": { "text": message.source_name },
            "timestamp": message.timestamp.to_rfc3339(),
        }]
    });
    if let Some(mention) = &message.mention {
        payload["content"] = json!(mention);
    }
    payload
}

fn teams_payload(message: &NotificationMessage) -> Value {
    let text = message
        .mention
        .clone()
        .unwrap_or_else(|| "A monitored cell changed.".to_string());
    json!({
        "@type": "MessageCard",
        "@context": "https://schema.org/extensions",
        "summary": message.title,
        "themeColor": "2EB886",
        "title": message.title,
        "sections": [{
            "text": text,
            "facts": [
                { "name": "Cell", "value": message.address },
                { "name": "Was", "value": message.old_display() },
                { "name": "Now", "value": message.new_display() },
                { "name": "Delta", "value": message.delta },
            ]
        }],
        "potentialAction": [{
            "@type": "OpenUri",
            "name": "Open source document",
            "targets": [{ "os": "default", "uri": message.link }]
        }]
    })
}

fn generic_payload(message: &NotificationMessage) -> Value {
    // The generic formatter is the message itself as flat JSON.
    serde_json::to_value(message).unwrap_or_else(|_| json!({ "title": message.title }))
}
