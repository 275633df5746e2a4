//! Pulling structured answers out of free-form model output.
//!
//! Models asked for JSON usually wrap it in prose or code fences. The
//! extractor finds the first balanced JSON object in the text, fills in
//! per-field defaults, and otherwise falls back to a fixed shape. Nothing
//! here returns an error.

use crate::models::{AgentScore, CompatibilityResult, FoundTool, ToolSearchResult};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Analysis text used when no verdict could be parsed.
pub const COMPATIBILITY_FALLBACK_ANALYSIS: &str = "Unable to analyze compatibility at this time.";

const DEFAULT_SCORE: u8 = 75;
const FALLBACK_SCORE: u8 = 50;

/// Characters of raw output kept as a human-readable summary.
pub const SUMMARY_CHARS: usize = 500;

/// Find the first balanced `{...}` in `text` that parses as a JSON object.
///
/// One forward pass with a stack of open braces. Braces inside JSON string
/// literals do not count toward nesting. An outermost balanced candidate is
/// parsed as soon as it closes and skipped whole if it is not an object.
/// Candidates nested under a `{` that never closes are tried once the end of
/// the text is reached.
pub fn find_json_object(text: &str) -> Option<Map<String, Value>> {
    let mut opens: Vec<usize> = Vec::new();
    // Outermost spans closed while an earlier `{` is still open, in order.
    let mut pending: Vec<(usize, usize)> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    // The delimiters are ASCII, so byte indices always fall on char boundaries.
    for (i, b) in text.bytes().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' if !opens.is_empty() => in_string = true,
            b'{' => opens.push(i),
            b'}' => {
                let Some(open) = opens.pop() else {
                    continue;
                };
                while let Some(&(start, _)) = pending.last() {
                    if start < open {
                        break;
                    }
                    pending.pop();
                }
                if opens.is_empty() {
                    if let Some(map) = parse_object(&text[open..=i]) {
                        return Some(map);
                    }
                } else {
                    pending.push((open, i));
                }
            }
            _ => {}
        }
    }

    pending
        .into_iter()
        .find_map(|(open, close)| parse_object(&text[open..=close]))
}

fn parse_object(candidate: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Extract an object and overlay it on `defaults`.
///
/// Keys missing from the parsed object keep their default value; keys the
/// model added are kept as well.
pub fn extract_with_defaults(text: &str, defaults: &Map<String, Value>) -> Option<Map<String, Value>> {
    let parsed = find_json_object(text)?;
    let mut merged = defaults.clone();
    for (key, value) in parsed {
        merged.insert(key, value);
    }
    Some(merged)
}

/// First [`SUMMARY_CHARS`] characters of `text`.
pub fn summary_prefix(text: &str) -> String {
    text.chars().take(SUMMARY_CHARS).collect()
}

fn compatibility_defaults() -> Map<String, Value> {
    match json!({
        "isCompatible": true,
        "overallScore": DEFAULT_SCORE,
        "analysis": "",
        "agentScores": {},
        "gaps": [],
        "suggestions": [],
    }) {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Fixed verdict returned when the model's answer is unusable.
pub fn compatibility_fallback() -> CompatibilityResult {
    CompatibilityResult {
        is_compatible: true,
        overall_score: FALLBACK_SCORE,
        analysis: COMPATIBILITY_FALLBACK_ANALYSIS.to_string(),
        agent_scores: BTreeMap::new(),
        gaps: Vec::new(),
        suggestions: Vec::new(),
    }
}

/// Parse a compatibility verdict, defaulting field by field.
pub fn extract_compatibility(text: &str) -> CompatibilityResult {
    let Some(fields) = extract_with_defaults(text, &compatibility_defaults()) else {
        return compatibility_fallback();
    };

    let agent_scores = fields
        .get("agentScores")
        .and_then(Value::as_object)
        .map(|scores| {
            scores
                .iter()
                .filter_map(|(name, entry)| {
                    let entry = entry.as_object()?;
                    Some((
                        name.clone(),
                        AgentScore {
                            score: entry
                                .get("score")
                                .and_then(as_score)
                                .unwrap_or(DEFAULT_SCORE),
                            reason: entry
                                .get("reason")
                                .and_then(Value::as_str)
                                .unwrap_or_default()
                                .to_string(),
                        },
                    ))
                })
                .collect()
        })
        .unwrap_or_default();

    CompatibilityResult {
        is_compatible: fields
            .get("isCompatible")
            .and_then(Value::as_bool)
            .unwrap_or(true),
        overall_score: fields
            .get("overallScore")
            .and_then(as_score)
            .unwrap_or(DEFAULT_SCORE),
        analysis: fields
            .get("analysis")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        agent_scores,
        gaps: string_list(fields.get("gaps")),
        suggestions: string_list(fields.get("suggestions")),
    }
}

/// Parse a tool search answer.
///
/// `tools` entries may be objects or bare names. Without a usable object
/// the result carries no tools and the start of the raw text as summary.
pub fn extract_tool_search(text: &str) -> ToolSearchResult {
    let summary = summary_prefix(text);
    let mut defaults = Map::new();
    defaults.insert("tools".to_string(), Value::Array(Vec::new()));
    defaults.insert("summary".to_string(), Value::String(summary.clone()));

    let Some(fields) = extract_with_defaults(text, &defaults) else {
        return ToolSearchResult {
            found_tools: Vec::new(),
            search_summary: summary,
        };
    };

    let found_tools = fields
        .get("tools")
        .and_then(Value::as_array)
        .map(|tools| tools.iter().filter_map(found_tool).collect())
        .unwrap_or_default();

    let search_summary = fields
        .get("summary")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or(summary);

    ToolSearchResult {
        found_tools,
        search_summary,
    }
}

fn found_tool(value: &Value) -> Option<FoundTool> {
    let tool = match value {
        Value::String(name) => FoundTool {
            name: name.clone(),
            description: String::new(),
            install_command: None,
            is_official: false,
        },
        Value::Object(_) => serde_json::from_value(value.clone()).ok()?,
        _ => return None,
    };

    if tool.name.trim().is_empty() {
        None
    } else {
        Some(tool)
    }
}

/// Scores arrive as integers, floats or numeric strings; clamp to 0..=100.
fn as_score(value: &Value) -> Option<u8> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok()?,
        _ => return None,
    };
    if !n.is_finite() {
        return None;
    }
    Some(n.round().clamp(0.0, 100.0) as u8)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_between_prose() {
        let defaults = match json!({"score": 75, "gaps": []}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let out = extract_with_defaults("some text {\"score\": 90} more text", &defaults).unwrap();
        assert_eq!(out.get("score"), Some(&json!(90)));
        assert_eq!(out.get("gaps"), Some(&json!([])));
    }

    #[test]
    fn test_nested_object_is_returned_whole() {
        let text = r#"Here you go:
```json
{"isCompatible": false, "agentScores": {"Reviewer": {"score": 40, "reason": "no tests"}}}
```
Let me know {if} you need more."#;
        let map = find_json_object(text).unwrap();
        assert_eq!(map.get("isCompatible"), Some(&json!(false)));
        assert!(map.get("agentScores").unwrap().get("Reviewer").is_some());
    }

    #[test]
    fn test_braces_inside_strings_and_stray_prose_braces() {
        let text = r#"I {think} this works: {"analysis": "use {curly} and \"quotes\"", "x": 1} done }"#;
        let map = find_json_object(text).unwrap();
        assert_eq!(
            map.get("analysis"),
            Some(&json!("use {curly} and \"quotes\""))
        );
    }

    #[test]
    fn test_unbalanced_prefix_then_object() {
        let map = find_json_object("open { but never closed {\"a\": 1}").unwrap();
        assert_eq!(map.get("a"), Some(&json!(1)));
    }

    #[test]
    fn test_long_run_of_open_braces() {
        let braces = "{".repeat(40_000);
        assert!(find_json_object(&braces).is_none());

        let text = format!("{}{{\"a\": 1}}", braces);
        let map = find_json_object(&text).unwrap();
        assert_eq!(map.get("a"), Some(&json!(1)));

        let text = "{x} ".repeat(20_000);
        assert!(find_json_object(&text).is_none());
    }

    #[test]
    fn test_first_of_several_candidates_under_open_brace() {
        let text = r#"note { {bad} then {"first": true} and {"second": true}"#;
        let map = find_json_object(text).unwrap();
        assert_eq!(map.get("first"), Some(&json!(true)));
    }

    #[test]
    fn test_no_object() {
        assert!(find_json_object("no braces here").is_none());
        assert!(find_json_object("{not json}").is_none());
        assert!(find_json_object("[1, 2, 3]").is_none());
        assert!(find_json_object("").is_none());
    }

    #[test]
    fn test_compatibility_fallback_shape() {
        let out = extract_compatibility("no braces here");
        assert_eq!(
            out,
            CompatibilityResult {
                is_compatible: true,
                overall_score: 50,
                analysis: "Unable to analyze compatibility at this time.".to_string(),
                agent_scores: BTreeMap::new(),
                gaps: vec![],
                suggestions: vec![],
            }
        );
        assert_eq!(extract_compatibility("{broken: json,}"), compatibility_fallback());
    }

    #[test]
    fn test_compatibility_defaults_per_field() {
        let out = extract_compatibility(
            r#"Verdict: {"isCompatible": false, "analysis": "Missing a tester", "suggestions": ["Add a Test Engineer"]}"#,
        );
        assert!(!out.is_compatible);
        assert_eq!(out.overall_score, 75);
        assert_eq!(out.analysis, "Missing a tester");
        assert!(out.gaps.is_empty());
        assert_eq!(out.suggestions, vec!["Add a Test Engineer".to_string()]);
    }

    #[test]
    fn test_compatibility_scores_are_clamped() {
        let out = extract_compatibility(
            r#"{"overallScore": 140, "agentScores": {"A": {"score": "87.6%"}, "B": {"score": -3, "reason": "off-topic"}, "C": "bad"}}"#,
        );
        assert_eq!(out.overall_score, 100);
        assert_eq!(out.agent_scores["A"].score, 88);
        assert_eq!(out.agent_scores["A"].reason, "");
        assert_eq!(out.agent_scores["B"].score, 0);
        assert!(!out.agent_scores.contains_key("C"));
    }

    #[test]
    fn test_tool_search_parses_objects_and_names() {
        let out = extract_tool_search(
            r#"Found these: {"tools": [
                {"name": "github-mcp-server", "description": "GitHub API", "installCommand": "npx github-mcp-server", "isOfficial": true},
                "postgres-mcp-server",
                {"description": "nameless"},
                42
            ], "summary": "Two servers match."}"#,
        );
        assert_eq!(out.found_tools.len(), 2);
        assert!(out.found_tools[0].is_official);
        assert_eq!(
            out.found_tools[0].install_command.as_deref(),
            Some("npx github-mcp-server")
        );
        assert_eq!(out.found_tools[1].name, "postgres-mcp-server");
        assert_eq!(out.search_summary, "Two servers match.");
    }

    #[test]
    fn test_tool_search_fallback_keeps_raw_prefix() {
        let raw = "x".repeat(800);
        let out = extract_tool_search(&raw);
        assert!(out.found_tools.is_empty());
        assert_eq!(out.search_summary.len(), SUMMARY_CHARS);

        let out = extract_tool_search(r#"{"tools": []}"#);
        assert_eq!(out.search_summary, r#"{"tools": []}"#);
    }

    #[test]
    fn test_summary_prefix_respects_char_boundaries() {
        let text = "é".repeat(600);
        assert_eq!(summary_prefix(&text).chars().count(), SUMMARY_CHARS);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let text = "prefix {\"overallScore\": 61} suffix";
        assert_eq!(extract_compatibility(text), extract_compatibility(text));
    }
}
