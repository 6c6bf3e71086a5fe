//! Presentation helpers for the status/metrics panels: compact number
//! notation, relative time labels, and the fallback datasets served when the
//! upstream has never answered. No business logic lives here.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Value, json};

/// "1.2K" / "3.4M" compact notation, one decimal, trailing ".0" dropped
pub fn compact_count(n: i64) -> String {
    let abs = n.abs();
    let (value, suffix) = if abs >= 1_000_000_000 {
        (n as f64 / 1_000_000_000.0, "B")
    } else if abs >= 1_000_000 {
        (n as f64 / 1_000_000.0, "M")
    } else if abs >= 1_000 {
        (n as f64 / 1_000.0, "K")
    } else {
        return n.to_string();
    };
    let formatted = format!("{:.1}", value);
    let formatted = formatted.strip_suffix(".0").unwrap_or(&formatted);
    format!("{}{}", formatted, suffix)
}

/// Relative label for a past instant: "just now", "5m ago", "3h ago", "2d ago"
pub fn relative_from(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds();
    if secs < 60 {
        return "just now".to_string();
    }
    let mins = secs / 60;
    if mins < 60 {
        return format!("{}m ago", mins);
    }
    let hours = mins / 60;
    if hours < 24 {
        return format!("{}h ago", hours);
    }
    format!("{}d ago", hours / 24)
}

/// Best-effort relative label for an upstream timestamp string. The bot
/// runtime emits naive ISO timestamps; RFC 3339 is accepted too. Anything
/// unparseable renders as "n/a".
pub fn relative_label(timestamp: &str) -> String {
    parse_upstream_timestamp(timestamp)
        .map(|then| relative_from(then, Utc::now()))
        .unwrap_or_else(|| "n/a".to_string())
}

fn parse_upstream_timestamp(timestamp: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Fallback dataset per panel, mirroring what the upstream itself serves on
/// its own error paths. Charts render these instead of going blank.
pub fn fallback_panel(panel: &str) -> Value {
    match panel {
        "posts" => json!({ "posts": [], "total": 0, "hasMore": false }),
        "metrics" => json!({
            "totalPosts": 0,
            "avgEngagement": 0,
            "totalLikes": 0,
            "followers": 0,
        }),
        "settings" => json!({
            "postsPerDay": 12,
            "keywords": ["Pokemon", "TCG", "Charizard", "Pikachu"],
            "engagementMode": "balanced",
            "autoReply": true,
            "contentTypes": {
                "cardPulls": true,
                "deckBuilding": true,
                "marketAnalysis": true,
                "tournaments": true
            }
        }),
        // topics, engagement: empty series
        _ => json!([]),
    }
}

/// Attach compact labels next to the raw metric counts so the frontend can
/// render "24.7K likes" without its own formatting pass.
pub fn decorate_metrics(metrics: &Value) -> Value {
    let mut decorated = metrics.clone();
    if let Some(object) = decorated.as_object_mut() {
        for key in ["totalPosts", "totalLikes", "followers"] {
            if let Some(count) = object.get(key).and_then(Value::as_i64) {
                object.insert(format!("{}Label", key), json!(compact_count(count)));
            }
        }
    }
    decorated
}
