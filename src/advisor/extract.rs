//! Recovery of a recommendations payload from free-form model output.
//!
//! Models wrap JSON in code fences, prepend prose, or append commentary.
//! Candidates are tried from the most to the least literal reading of the
//! text, and the first one that is an object with a `recommendations` array
//! wins. Items are then validated one by one.

use serde_json::Value;
use tracing::{debug, warn};

use super::types::RecommendationItem;

const RECOMMENDATIONS_KEY: &str = "\"recommendations\"";
const FENCE: &str = "```";

/// Result of extracting recommendations from completion text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// At least one item survived validation.
    Parsed(Vec<RecommendationItem>),
    /// No candidate held a usable recommendations list.
    Unparseable,
}

/// Which reading of the text produced the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    Direct,
    FencedBlock,
    BraceSpan,
}

/// Extract and validate recommendations from raw completion text.
pub fn extract_recommendations(text: &str) -> Extraction {
    let Some((strategy, raw_items)) = find_payload(text) else {
        debug!(text_len = text.len(), "No recommendations payload found");
        return Extraction::Unparseable;
    };

    let total = raw_items.len();
    let items: Vec<RecommendationItem> = raw_items.iter().filter_map(validate_item).collect();

    if items.len() < total {
        warn!(
            dropped = total - items.len(),
            kept = items.len(),
            "Dropped malformed recommendation items"
        );
    }

    if items.is_empty() {
        debug!(?strategy, "Payload held no usable recommendations");
        return Extraction::Unparseable;
    }

    debug!(?strategy, items = items.len(), "Extracted recommendations");
    Extraction::Parsed(items)
}

fn find_payload(text: &str) -> Option<(Strategy, Vec<Value>)> {
    if let Some(items) = recommendations_array(text) {
        return Some((Strategy::Direct, items));
    }

    for block in fenced_blocks(text) {
        if let Some(items) = recommendations_array(block) {
            return Some((Strategy::FencedBlock, items));
        }
    }

    brace_spans(text)
        .into_iter()
        .find_map(recommendations_array)
        .map(|items| (Strategy::BraceSpan, items))
}

/// Parse `candidate` and take its top-level `recommendations` array.
fn recommendations_array(candidate: &str) -> Option<Vec<Value>> {
    match serde_json::from_str::<Value>(candidate.trim()).ok()? {
        Value::Object(mut map) => match map.remove("recommendations")? {
            Value::Array(items) => Some(items),
            _ => None,
        },
        _ => None,
    }
}

/// Bodies of all closed ``` fences, in order of appearance.
fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find(FENCE) {
        let after_open = &rest[open + FENCE.len()..];
        let Some(close) = after_open.find(FENCE) else {
            break;
        };
        blocks.push(strip_info_string(&after_open[..close]));
        rest = &after_open[close + FENCE.len()..];
    }

    blocks
}

/// Drop a leading language tag line such as `json`.
fn strip_info_string(body: &str) -> &str {
    match body.split_once('\n') {
        Some((first, rest)) if !first.trim_start().starts_with('{') => rest,
        _ => body,
    }
}

/// Brace-delimited spans that mention the recommendations key.
///
/// Balanced spans starting at each `{` come first, in order, followed by the
/// greedy span from the first `{` to the last `}`.
fn brace_spans(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();

    for (start, _) in text.match_indices('{') {
        if let Some(end) = balanced_end(&text[start..]) {
            let span = &text[start..=start + end];
            if span.contains(RECOMMENDATIONS_KEY) {
                spans.push(span);
            }
        }
    }

    if let (Some(first), Some(last)) = (text.find('{'), text.rfind('}')) {
        if first < last {
            let span = &text[first..=last];
            if span.contains(RECOMMENDATIONS_KEY) && !spans.contains(&span) {
                spans.push(span);
            }
        }
    }

    spans
}

/// Byte offset of the `}` closing the object that opens at `s[0]`.
///
/// Braces inside JSON strings are ignored.
fn balanced_end(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

fn validate_item(value: &Value) -> Option<RecommendationItem> {
    let obj = value.as_object()?;

    let topic = non_empty_string(obj.get("topic"))?;
    let reason = non_empty_string(obj.get("reason"))?;

    let connections = match obj.get("connections") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(_) => return None,
    };

    let target_mastery = obj
        .get("targetMastery")
        .or_else(|| obj.get("target_mastery"))
        .and_then(coerce_target)
        .unwrap_or(0);

    Some(RecommendationItem {
        topic,
        reason,
        connections,
        target_mastery,
    })
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Accept numbers and numeric strings that round into 0..=100.
fn coerce_target(value: &Value) -> Option<u8> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };

    let rounded = n.round();
    if rounded.is_finite() && (0.0..=100.0).contains(&rounded) {
        Some(rounded as u8)
    } else {
        None
    }
}
