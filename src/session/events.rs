//! Events emitted by the orchestration runtime's streaming JSON output.

use serde::{Deserialize, Serialize};

/// One record from the event stream, discriminated by its `type` field.
///
/// Kinds this crate does not know about decode to [`SessionEvent::Unknown`]
/// and are skipped by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SessionEvent {
    System {
        #[serde(default)]
        subtype: Option<String>,
        #[serde(default)]
        session_id: Option<String>,
    },
    Assistant {
        message: AssistantMessage,
    },
    Result {
        #[serde(default)]
        subtype: Option<String>,
        #[serde(default)]
        result: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub content: MessageContent,
}

/// Assistant content. Only the block-list form carries text we collect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Blocks(Vec<ContentBlock>),
    Other(serde_json::Value),
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Blocks(Vec::new())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type", default)]
    #[allow(dead_code)] // Block kind, only text is collected
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl SessionEvent {
    /// Decode a single line of streamed JSON.
    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    /// Session id carried by an `init` system event.
    pub fn init_session_id(&self) -> Option<&str> {
        match self {
            SessionEvent::System {
                subtype: Some(subtype),
                session_id: Some(id),
            } if subtype == "init" => Some(id.as_str()),
            _ => None,
        }
    }

    /// Payload of a successful result event.
    pub fn success_payload(&self) -> Option<&str> {
        match self {
            SessionEvent::Result {
                subtype: Some(subtype),
                result,
            } if subtype == "success" => result.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
impl SessionEvent {
    pub fn init(session_id: impl Into<String>) -> Self {
        SessionEvent::System {
            subtype: Some("init".to_string()),
            session_id: Some(session_id.into()),
        }
    }

    pub fn assistant_text<S: AsRef<str>>(texts: &[S]) -> Self {
        let blocks = texts
            .iter()
            .map(|t| ContentBlock {
                kind: Some("text".to_string()),
                text: Some(t.as_ref().to_string()),
            })
            .collect();
        SessionEvent::Assistant {
            message: AssistantMessage {
                content: MessageContent::Blocks(blocks),
            },
        }
    }

    pub fn success(result: impl Into<String>) -> Self {
        SessionEvent::Result {
            subtype: Some("success".to_string()),
            result: Some(result.into()),
        }
    }
}

impl AssistantMessage {
    /// Texts of the blocks that carry one, joined with newlines.
    pub fn joined_text(&self) -> String {
        match &self.content {
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|b| b.text.as_deref())
                .collect::<Vec<_>>()
                .join("\n"),
            MessageContent::Other(_) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_init() {
        let line = r#"{"type":"system","subtype":"init","session_id":"abc","tools":["Bash"],"model":"x"}"#;
        let event = SessionEvent::from_line(line).unwrap();
        assert_eq!(event.init_session_id(), Some("abc"));
    }

    #[test]
    fn test_decode_assistant_skips_blocks_without_text() {
        let line = r#"{"type":"assistant","message":{"role":"assistant","content":[
            {"type":"text","text":"first"},
            {"type":"tool_use","id":"t1","name":"Read","input":{}},
            {"type":"text","text":"second"}
        ]}}"#;
        match SessionEvent::from_line(line).unwrap() {
            SessionEvent::Assistant { message } => {
                assert_eq!(message.joined_text(), "first\nsecond");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_decode_string_content_contributes_nothing() {
        let line = r#"{"type":"assistant","message":{"content":"plain"}}"#;
        match SessionEvent::from_line(line).unwrap() {
            SessionEvent::Assistant { message } => assert_eq!(message.joined_text(), ""),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_decode_result() {
        let ok = SessionEvent::from_line(
            r#"{"type":"result","subtype":"success","result":"done","is_error":false}"#,
        )
        .unwrap();
        assert_eq!(ok.success_payload(), Some("done"));

        let failed =
            SessionEvent::from_line(r#"{"type":"result","subtype":"error_max_turns"}"#).unwrap();
        assert_eq!(failed.success_payload(), None);
    }

    #[test]
    fn test_unknown_type_is_tolerated() {
        let event = SessionEvent::from_line(r#"{"type":"user","message":{"content":[]}}"#).unwrap();
        assert_eq!(event, SessionEvent::Unknown);
    }

    #[test]
    fn test_non_init_system_event_has_no_session() {
        let event = SessionEvent::System {
            subtype: Some("compact_boundary".to_string()),
            session_id: Some("zzz".to_string()),
        };
        assert_eq!(event.init_session_id(), None);
    }
}
