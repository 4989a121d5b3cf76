//! Assistant reply extraction
//!
//! Agent endpoints answer either with a JSON document or with a
//! server-sent event stream of `step_update` events. This module pulls a
//! human-readable reply out of both shapes.

use serde_json::Value;

use super::client::ApiBody;

const DATA_PREFIX: &str = "data:";

/// Extract the reply text from a response body.
///
/// Returns an empty string when nothing recognisable is found.
pub fn extract_reply(body: &ApiBody, content_type: Option<&str>) -> String {
    match body {
        ApiBody::Json(value) if value.is_object() => from_json(value).unwrap_or_default(),
        ApiBody::Json(value) => value_to_text(value),
        ApiBody::Text(text) if is_event_stream(text, content_type) => {
            from_event_stream(text).unwrap_or_default()
        }
        ApiBody::Text(text) => text.trim().to_string(),
    }
}

/// Whether the content type announces a server-sent event stream
pub fn is_event_stream_type(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("text/event-stream"))
}

/// Whether a text body is a server-sent event stream.
///
/// `event:`, `id:` and `:` comment lines may precede the first `data:` line.
pub fn is_event_stream(text: &str, content_type: Option<&str>) -> bool {
    is_event_stream_type(content_type)
        || text
            .lines()
            .any(|line| line.trim_start().starts_with(DATA_PREFIX))
}

fn from_json(value: &Value) -> Option<String> {
    if let Some(output) = tool_runner_output(value) {
        return Some(output);
    }

    if let Some(output) = non_null(value.get("output")) {
        return Some(value_to_text(output));
    }

    match value.get("content") {
        Some(Value::Object(content)) => {
            if let Some(text) = content.get("text").and_then(Value::as_str) {
                return Some(text.to_string());
            }
        }
        Some(Value::Array(items)) => {
            let first = items.first().filter(|v| v.is_object());
            let text = first.and_then(|item| {
                ["text", "message"]
                    .iter()
                    .filter_map(|key| item.get(*key).and_then(Value::as_str))
                    .find(|s| !s.is_empty())
            });
            if let Some(text) = text {
                return Some(text.to_string());
            }
        }
        _ => {}
    }

    ["message", "error"]
        .iter()
        .filter_map(|key| non_null(value.get(*key)))
        .map(value_to_text)
        .find(|s| !s.is_empty())
}

fn from_event_stream(text: &str) -> Option<String> {
    let events: Vec<Value> = text
        .lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix(DATA_PREFIX))
        .filter_map(|payload| parse_event(payload.trim()))
        .collect();

    let (_, before_last) = events.split_last()?;

    // latest tool_runner update before the terminal event
    if let Some(output) = before_last.iter().rev().find_map(tool_runner_output) {
        return Some(output);
    }

    let second_last = before_last.last()?;
    non_null(second_last.get("data").and_then(|d| d.get("output"))).map(value_to_text)
}

/// Parse one `data:` payload; tolerates a JSON string wrapping JSON and
/// doubled quotes from CSV round-trips.
fn parse_event(payload: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::String(inner)) => serde_json::from_str(&inner).ok(),
        Ok(value) => Some(value),
        Err(_) => serde_json::from_str(&payload.replace("\"\"", "\"")).ok(),
    }
}

fn tool_runner_output(event: &Value) -> Option<String> {
    if event.get("type").and_then(Value::as_str) != Some("step_update") {
        return None;
    }
    let data = event.get("data")?;
    if data.get("step").and_then(Value::as_str) != Some("tool_runner") {
        return None;
    }
    non_null(data.get("output")).map(value_to_text)
}

fn non_null(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn json_body(value: Value) -> ApiBody {
        ApiBody::Json(value)
    }

    #[test]
    fn test_step_update_object() {
        let body = json_body(json!({
            "type": "step_update",
            "data": {"step": "tool_runner", "output": "3 hosts found"}
        }));
        assert_eq!(extract_reply(&body, None), "3 hosts found");
    }

    #[test]
    fn test_top_level_output_serialized() {
        let body = json_body(json!({"output": {"hosts": 3}}));
        assert_eq!(extract_reply(&body, None), r#"{"hosts":3}"#);
    }

    #[test]
    fn test_content_shapes() {
        let object = json_body(json!({"content": {"text": "hello"}}));
        assert_eq!(extract_reply(&object, None), "hello");

        let list = json_body(json!({"content": [{"type": "text", "text": "", "message": "hi"}]}));
        assert_eq!(extract_reply(&list, None), "hi");
    }

    #[test]
    fn test_message_and_error_fallback() {
        assert_eq!(extract_reply(&json_body(json!({"message": "done"})), None), "done");
        assert_eq!(
            extract_reply(&json_body(json!({"error": "unauthorized"})), None),
            "unauthorized"
        );
        assert_eq!(extract_reply(&json_body(json!({"result": "ok"})), None), "");
    }

    #[test]
    fn test_event_stream_prefers_latest_tool_runner() {
        let stream = [
            r#"data: {"type":"step_update","data":{"step":"tool_runner","output":"first"}}"#,
            r#"data: {"type":"step_update","data":{"step":"planner","output":"plan"}}"#,
            r#"data: {"type":"step_update","data":{"step":"tool_runner","output":"second"}}"#,
            r#"data: {"type":"completed","data":{"step":"tool_runner","output":"final"}}"#,
        ]
        .join("\n\n");

        assert!(is_event_stream(&stream, None));
        assert_eq!(extract_reply(&ApiBody::Text(stream), None), "second");
    }

    #[test]
    fn test_event_stream_second_last_fallback() {
        let stream = [
            r#"data: {"type":"step_update","data":{"step":"planner","output":"plan"}}"#,
            r#"data: {"type":"completed","data":{}}"#,
        ]
        .join("\n");

        assert_eq!(extract_reply(&ApiBody::Text(stream), None), "plan");
    }

    #[test]
    fn test_event_stream_wrapped_payload() {
        let inner = json!({"type":"step_update","data":{"step":"tool_runner","output":"wrapped"}});
        let wrapped = serde_json::to_string(&inner.to_string()).unwrap();
        let stream = format!("data: {wrapped}\ndata: {{\"type\":\"completed\"}}");

        assert_eq!(extract_reply(&ApiBody::Text(stream), None), "wrapped");
    }

    #[test]
    fn test_plain_text_body() {
        assert_eq!(extract_reply(&ApiBody::Text("  pong \n".into()), None), "pong");
        assert!(!is_event_stream("pong", None));
    }

    #[test]
    fn test_event_stream_with_event_lines() {
        let stream = concat!(
            ": keep-alive\n",
            "event: step_update\n",
            "id: 1\n",
            r#"data: {"type":"step_update","data":{"step":"tool_runner","output":"disk ok"}}"#,
            "\n\n",
            "event: completed\n",
            r#"data: {"type":"completed","data":{}}"#,
            "\n"
        );

        assert!(is_event_stream(stream, None));
        assert_eq!(extract_reply(&ApiBody::Text(stream.to_string()), None), "disk ok");
        assert_eq!(
            extract_reply(&ApiBody::Text(stream.to_string()), Some("text/event-stream; charset=utf-8")),
            "disk ok"
        );
    }

    #[test]
    fn test_event_stream_content_type_without_data() {
        assert!(is_event_stream("event: ping\n", Some("text/event-stream")));
        assert_eq!(
            extract_reply(&ApiBody::Text("event: ping\n".into()), Some("text/event-stream")),
            ""
        );
    }
}
