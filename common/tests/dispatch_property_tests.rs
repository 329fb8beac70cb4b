// Property-based tests for notification formatting and retry pacing

use common::dispatch::{
    delta_summary, document_link, NotificationMessage, Platform, RetryPolicy,
};
use proptest::prelude::*;
use std::time::Duration;

/// **Property: additions and removals quote the surviving value**
///
/// *For any* non-empty value, a transition from empty quotes the new value
/// and a transition to empty quotes the old one.
#[test]
fn property_added_and_removed_summaries_quote_value() {
    proptest!(|(value in "[a-z0-9]{1,8}")| {
        prop_assert_eq!(delta_summary("", &value), format!("added: {}", value));
        prop_assert_eq!(delta_summary(&value, ""), format!("removed: {}", value));
    });
}

/// **Property: identical values always summarize as no change**
///
/// *For any* value, including the empty string and numeric text, pairing it
/// with itself reports no change rather than an addition or a zero delta.
#[test]
fn property_equal_values_are_no_change() {
    proptest!(|(value in "[a-z0-9]{0,8}")| {
        prop_assert_eq!(delta_summary(&value, &value), "no change");
    });
}

/// **Property: numeric pairs summarize as a signed delta**
///
/// *For any* two numbers whose rendered forms differ, the summary is exactly
/// the signed difference, and swapping the pair negates it.
#[test]
fn property_numeric_pairs_report_signed_delta() {
    proptest!(|(old in -1e6f64..1e6f64, new in -1e6f64..1e6f64)| {
        let old_text = format!("{}", old);
        let new_text = format!("{}", new);
        prop_assume!(old_text != new_text);
        let old_parsed: f64 = old_text.parse().unwrap();
        let new_parsed: f64 = new_text.parse().unwrap();

        prop_assert_eq!(
            delta_summary(&old_text, &new_text),
            format!("{:+}", new_parsed - old_parsed)
        );
        prop_assert_eq!(
            delta_summary(&new_text, &old_text),
            format!("{:+}", old_parsed - new_parsed)
        );
    });
}

/// **Property: non-numeric pairs never pretend to be a delta**
///
/// *For any* two distinct non-empty alphabetic values, the summary is the
/// plain text-changed marker. The character class leaves out `a`, `i`, and
/// `n` so the generator cannot spell `inf` or `nan`.
#[test]
fn property_text_pairs_report_text_changed() {
    proptest!(|(old in "[b-hj-mo-z]{1,6}", new in "[b-hj-mo-z]{1,6}")| {
        prop_assume!(old != new);
        prop_assert_eq!(delta_summary(&old, &new), "text changed");
    });
}

/// **Property: platform detection is total**
///
/// *For any* string at all, webhook platform inference returns something
/// instead of panicking, and anything unrecognizable lands on the generic
/// formatter.
#[test]
fn property_platform_detection_never_panics() {
    proptest!(|(url in "\\PC{0,40}")| {
        let _ = Platform::from_webhook_url(&url);
    });
    proptest!(|(host in "[a-z]{1,12}", path in "[a-z0-9/]{0,20}")| {
        let url = format!("https://{}.example.com/{}", host, path);
        prop_assert_eq!(Platform::from_webhook_url(&url), Platform::Generic);
    });
}

/// **Property: known platforms match on whole host labels only**
///
/// *For any* label prefix, `label.discord.com` is Discord while
/// `labeldiscord.com` is not, so look-alike domains cannot impersonate a
/// platform formatter.
#[test]
fn property_platform_hosts_match_on_label_boundary() {
    proptest!(|(label in "[a-z][a-z0-9]{0,10}", path in "[a-z0-9/]{0,16}")| {
        let subdomain = format!("https://{}.discord.com/{}", label, path);
        prop_assert_eq!(Platform::from_webhook_url(&subdomain), Platform::Discord);

        let glued = format!("https://{}discord.com/{}", label, path);
        prop_assert_eq!(Platform::from_webhook_url(&glued), Platform::Generic);

        let slack = format!("https://{}.slack.com/{}", label, path);
        prop_assert_eq!(Platform::from_webhook_url(&slack), Platform::Slack);
    });
}

/// **Property: every formatter carries the facts of the change**
///
/// *For any* address, values, and mention, each platform's payload embeds
/// the cell address, the new value, and the mention somewhere in its JSON.
#[test]
fn property_payloads_carry_address_value_and_mention() {
    proptest!(|(
        address in "[A-Z]{1,2}[1-9][0-9]{0,2}",
        new_value in "[a-z0-9]{1,8}",
        mention in "@[a-z]{1,8}",
    )| {
        let message = NotificationMessage {
            title: "Change detected in Payload check".to_string(),
            source_name: "Payload check".to_string(),
            address: address.clone(),
            old_value: String::new(),
            new_value: new_value.clone(),
            delta: delta_summary("", &new_value),
            link: "https://docs.google.com/spreadsheets/d/abc123".to_string(),
            mention: Some(mention.clone()),
            timestamp: chrono::Utc::now(),
        };

        for platform in [
            Platform::Slack,
            Platform::Discord,
            Platform::Teams,
            Platform::GoogleChat,
            Platform::Generic,
        ] {
            let rendered = platform.payload(&message).to_string();
            prop_assert!(rendered.contains(&address), "{} lost the address", platform);
            prop_assert!(rendered.contains(&new_value), "{} lost the value", platform);
            prop_assert!(rendered.contains(&mention), "{} lost the mention", platform);
        }
    });
}

/// **Property: retry delays double with each failed attempt**
///
/// *For any* base delay and attempt number in the configured operating
/// range, the backoff for the next attempt is exactly twice the current one,
/// anchored at the base delay for the first retry.
#[test]
fn property_retry_delays_double() {
    proptest!(|(base_ms in 1u64..10_000, attempt in 0u32..10)| {
        let policy = RetryPolicy {
            max_attempts: attempt + 2,
            base_delay: Duration::from_millis(base_ms),
        };
        prop_assert_eq!(policy.delay_for(0), policy.base_delay);
        prop_assert_eq!(policy.delay_for(attempt + 1), policy.delay_for(attempt) * 2);
    });
}

/// **Property: document links substitute the id placeholder everywhere**
///
/// *For any* source id and placeholder-free template halves, the link is
/// the template with the id spliced in; templates without the placeholder
/// pass through untouched.
#[test]
fn property_document_link_substitution() {
    proptest!(|(
        prefix in "[a-z:/.]{0,20}",
        suffix in "[a-z:/.]{0,20}",
        id in "[a-zA-Z0-9_-]{1,16}",
    )| {
        let template = format!("{}{{id}}{}{{id}}", prefix, suffix);
        prop_assert_eq!(
            document_link(&template, &id),
            format!("{}{}{}{}", prefix, id, suffix, id)
        );

        let fixed = format!("{}{}", prefix, suffix);
        prop_assert_eq!(document_link(&fixed, &id), fixed.clone());
    });
}
