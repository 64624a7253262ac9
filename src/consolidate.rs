//! Reconstruction of a single readable text payload from parsed stream events.

use crate::types::SseEvent;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Terminator some providers send as the data of the final stream event.
const DONE_SENTINEL: &str = "[DONE]";

/// Recognized shapes of one streamed chunk, decoded leniently: a field that
/// is missing or carries an unexpected type contributes no text instead of
/// failing the whole chunk.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChunkPayload {
    #[serde(deserialize_with = "lenient")]
    choices: Vec<Choice>,
    #[serde(deserialize_with = "lenient")]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Choice {
    /// Streaming convention: incremental fragment.
    #[serde(deserialize_with = "lenient")]
    delta: Option<Fragment>,
    /// Non-streaming convention embedded in a stream.
    #[serde(deserialize_with = "lenient")]
    message: Option<Fragment>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Fragment {
    #[serde(deserialize_with = "lenient")]
    content: Option<String>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(T::deserialize(deserializer).unwrap_or_default())
}

/// Concatenate the text fragments of `events` in encounter order.
///
/// Events whose data is empty or the `[DONE]` sentinel are skipped. Data that
/// is valid JSON contributes its recognized fragments
/// (`choices[].delta.content`, `choices[].message.content`, top-level string
/// `content`); data that is not JSON contributes its raw text when non-blank.
/// Valid JSON of an unrecognized shape contributes nothing. Never fails.
pub fn consolidate_stream_content(events: &[SseEvent]) -> String {
    let mut content = String::new();

    for event in events {
        if event.data.is_empty() || event.data == DONE_SENTINEL {
            continue;
        }

        let value: Value = match serde_json::from_str(&event.data) {
            Ok(value) => value,
            Err(_) => {
                if !event.data.trim().is_empty() {
                    content.push_str(&event.data);
                }
                continue;
            }
        };

        // Valid JSON that is not an object (or otherwise undecodable) simply
        // contributes nothing.
        let Ok(chunk) = serde_json::from_value::<ChunkPayload>(value) else {
            continue;
        };

        for choice in &chunk.choices {
            if let Some(text) = choice.delta.as_ref().and_then(|f| f.content.as_deref()) {
                content.push_str(text);
            }
            if let Some(text) = choice.message.as_ref().and_then(|f| f.content.as_deref()) {
                content.push_str(text);
            }
        }
        if let Some(text) = chunk.content.as_deref() {
            content.push_str(text);
        }
    }

    content
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(data: &str) -> SseEvent {
        SseEvent {
            event_type: "message".to_string(),
            data: data.to_string(),
            id: None,
        }
    }

    #[test]
    fn test_delta_fragments_concatenate() {
        let events = vec![
            event(r#"{"choices":[{"delta":{"content":"Hel"}}]}"#),
            event(r#"{"choices":[{"delta":{"content":"lo"}}]}"#),
        ];
        assert_eq!(consolidate_stream_content(&events), "Hello");
    }

    #[test]
    fn test_done_sentinel_and_empty_data_skipped() {
        let events = vec![
            event(r#"{"choices":[{"delta":{"content":"Hi"}}]}"#),
            event(""),
            event("[DONE]"),
        ];
        assert_eq!(consolidate_stream_content(&events), "Hi");
    }

    #[test]
    fn test_message_content_shape() {
        let events = vec![event(
            r#"{"choices":[{"message":{"content":"full answer"}}]}"#,
        )];
        assert_eq!(consolidate_stream_content(&events), "full answer");
    }

    #[test]
    fn test_delta_and_message_both_contribute() {
        let events = vec![event(
            r#"{"choices":[{"delta":{"content":"a"},"message":{"content":"b"}}]}"#,
        )];
        assert_eq!(consolidate_stream_content(&events), "ab");
    }

    #[test]
    fn test_direct_content_field() {
        let events = vec![event(r#"{"content":"direct"}"#)];
        assert_eq!(consolidate_stream_content(&events), "direct");
    }

    #[test]
    fn test_non_json_data_kept_raw() {
        let events = vec![event("plain text")];
        assert_eq!(consolidate_stream_content(&events), "plain text");
    }

    #[test]
    fn test_blank_non_json_data_skipped() {
        let events = vec![event("   ")];
        assert_eq!(consolidate_stream_content(&events), "");
    }

    #[test]
    fn test_unrecognized_json_shapes_contribute_nothing() {
        let events = vec![
            event(r#"{"usage":{"output_tokens":12}}"#),
            event(r#"{"content":[{"type":"text","text":"blocks"}]}"#),
            event(r#"{"choices":"not an array"}"#),
            event(r#"[1,2,3]"#),
            event("42"),
        ];
        assert_eq!(consolidate_stream_content(&events), "");
    }

    #[test]
    fn test_multiple_choices_in_encounter_order() {
        let events = vec![event(
            r#"{"choices":[{"delta":{"content":"one "}},{"delta":{"content":"two"}}]}"#,
        )];
        assert_eq!(consolidate_stream_content(&events), "one two");
    }

    #[test]
    fn test_mixed_shapes_across_events() {
        let events = vec![
            event(r#"{"choices":[{"delta":{"content":"a"}}]}"#),
            event(r#"{"content":"b"}"#),
            event("c"),
            event("[DONE]"),
        ];
        assert_eq!(consolidate_stream_content(&events), "abc");
    }
}
