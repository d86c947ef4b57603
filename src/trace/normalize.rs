//! Trace payload normalization.
//!
//! A raw trace is an untyped JSON tree with optional fields. Nothing untyped
//! crosses this boundary: the normalizer either produces a full
//! [`TraceRecord`] or fails naming the offending field. Only the instants are
//! load-fatal; every optional field has a default and damaged step log
//! entries are skipped per entry.

use chrono::{DateTime, NaiveDateTime, Utc};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use thiserror::Error;

use super::{
    JudgeResult, Message, MessageRole, StepLogEntry, StepStatus, TaskInput, TraceRecord,
    TraceStatus,
};

/// A required field was missing or invalid after a successful fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed trace: field `{field}` is missing or invalid")]
pub struct MalformedTraceError {
    pub field: &'static str,
}

impl MalformedTraceError {
    fn new(field: &'static str) -> Self {
        Self { field }
    }
}

/// Build a typed record from one decoded trace payload.
pub fn normalize_trace(task_id: &str, raw: &Value) -> Result<TraceRecord, MalformedTraceError> {
    let root = raw.as_object().ok_or(MalformedTraceError::new("root"))?;

    let start_time = parse_instant(root.get("start_time").and_then(Value::as_str))
        .ok_or(MalformedTraceError::new("start_time"))?;

    let status = root
        .get("status")
        .and_then(Value::as_str)
        .map(parse_status)
        .unwrap_or(TraceStatus::Pending);

    // An in-flight trace may not have an end time yet; anything terminal must.
    let end_time = match root.get("end_time").and_then(Value::as_str) {
        Some(s) => Some(parse_instant(Some(s)).ok_or(MalformedTraceError::new("end_time"))?),
        None if status.is_in_flight() => None,
        None => return Err(MalformedTraceError::new("end_time")),
    };

    let judge_result = root
        .get("judge_result")
        .and_then(Value::as_str)
        .map(parse_judge)
        .unwrap_or(JudgeResult::Unknown);

    let final_answer = root
        .get("final_boxed_answer")
        .and_then(Value::as_str)
        .map(str::to_string);

    let input = root
        .get("input")
        .and_then(Value::as_object)
        .map(parse_input)
        .unwrap_or_default();

    let main_history = raw
        .pointer("/main_agent_message_history/message_history")
        .and_then(Value::as_array)
        .map(|msgs| parse_history(msgs))
        .unwrap_or_default();

    let mut sub_sessions = IndexMap::new();
    if let Some(sessions) = root
        .get("sub_agent_message_history_sessions")
        .and_then(Value::as_object)
    {
        for (session_id, session) in sessions {
            let history = session
                .get("message_history")
                .and_then(Value::as_array)
                .map(|msgs| parse_history(msgs))
                .unwrap_or_default();
            sub_sessions.insert(session_id.clone(), history);
        }
    }

    let step_logs = root
        .get("step_logs")
        .and_then(Value::as_array)
        .map(|entries| parse_step_logs(task_id, entries))
        .unwrap_or_default();

    Ok(TraceRecord {
        task_id: task_id.to_string(),
        start_time,
        end_time,
        status,
        judge_result,
        final_answer,
        input,
        main_history,
        sub_sessions,
        step_logs,
    })
}

/// Parse an instant string. Accepts RFC 3339 and the producer's naive
/// `%Y-%m-%d %H:%M:%S%.f` form (with either separator), read as UTC.
pub fn parse_instant(s: Option<&str>) -> Option<DateTime<Utc>> {
    let s = s?.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    None
}

fn parse_status(s: &str) -> TraceStatus {
    match s.to_ascii_lowercase().as_str() {
        "pending" => TraceStatus::Pending,
        "running" => TraceStatus::Running,
        "completed" => TraceStatus::Completed,
        "failed" => TraceStatus::Failed,
        "interrupted" => TraceStatus::Interrupted,
        other => {
            tracing::warn!(status = other, "unrecognized trace status, treating as pending");
            TraceStatus::Pending
        }
    }
}

fn parse_judge(s: &str) -> JudgeResult {
    match s.to_ascii_uppercase().as_str() {
        "CORRECT" => JudgeResult::Correct,
        "INCORRECT" => JudgeResult::Incorrect,
        _ => JudgeResult::Unknown,
    }
}

fn parse_input(obj: &Map<String, Value>) -> TaskInput {
    TaskInput {
        task_description: obj
            .get("task_description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        metadata: obj
            .get("metadata")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default(),
    }
}

fn parse_history(msgs: &[Value]) -> Vec<Message> {
    msgs.iter().filter_map(parse_message).collect()
}

/// Parse one `{role, content}` message. Entries without a recognizable role
/// are dropped; content may be a plain string or a block list where only
/// `text`-typed blocks contribute.
fn parse_message(msg: &Value) -> Option<Message> {
    let role = match msg.get("role").and_then(Value::as_str)? {
        "system" => MessageRole::System,
        "assistant" => MessageRole::Assistant,
        "user" => MessageRole::User,
        _ => return None,
    };
    let content = match msg.get("content") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(blocks)) => blocks
            .iter()
            .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    };
    Some(Message { role, content })
}

fn parse_step_logs(task_id: &str, entries: &[Value]) -> Vec<StepLogEntry> {
    let mut logs = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(timestamp) = parse_instant(entry.get("timestamp").and_then(Value::as_str)) else {
            tracing::warn!(task_id, "skipping step log entry with unparsable timestamp");
            continue;
        };
        logs.push(StepLogEntry {
            timestamp,
            step_name: entry
                .get("step_name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            message: entry
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            status: entry
                .get("status")
                .and_then(Value::as_str)
                .map(parse_step_status)
                .unwrap_or(StepStatus::Info),
            metadata: entry
                .get("metadata")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
        });
    }
    logs
}

fn parse_step_status(s: &str) -> StepStatus {
    match s.to_ascii_lowercase().as_str() {
        "success" => StepStatus::Success,
        "warning" => StepStatus::Warning,
        "failed" => StepStatus::Failed,
        "debug" => StepStatus::Debug,
        _ => StepStatus::Info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal() -> Value {
        json!({
            "start_time": "2025-06-01T10:00:00Z",
            "end_time": "2025-06-01T10:02:05Z",
            "status": "completed",
        })
    }

    #[test]
    fn minimal_trace_normalizes_with_defaults() {
        let record = normalize_trace("t1", &minimal()).unwrap();
        assert_eq!(record.task_id, "t1");
        assert_eq!(record.status, TraceStatus::Completed);
        assert_eq!(record.judge_result, JudgeResult::Unknown);
        assert!(record.final_answer.is_none());
        assert!(record.main_history.is_empty());
        assert!(record.sub_sessions.is_empty());
        assert!(record.step_logs.is_empty());
    }

    #[test]
    fn missing_start_time_names_field() {
        let err = normalize_trace("t1", &json!({"end_time": "2025-06-01T10:00:00Z"}))
            .unwrap_err();
        assert_eq!(err.field, "start_time");
    }

    #[test]
    fn missing_end_time_on_terminal_trace_names_field() {
        let err = normalize_trace(
            "t1",
            &json!({"start_time": "2025-06-01T10:00:00Z", "status": "completed"}),
        )
        .unwrap_err();
        assert_eq!(err.field, "end_time");
    }

    #[test]
    fn in_flight_trace_may_lack_end_time() {
        let record = normalize_trace(
            "t1",
            &json!({"start_time": "2025-06-01T10:00:00Z", "status": "running"}),
        )
        .unwrap();
        assert!(record.end_time.is_none());
        assert_eq!(record.status, TraceStatus::Running);
    }

    #[test]
    fn invalid_end_time_is_fatal_even_in_flight() {
        let err = normalize_trace(
            "t1",
            &json!({
                "start_time": "2025-06-01T10:00:00Z",
                "end_time": "not a time",
                "status": "running",
            }),
        )
        .unwrap_err();
        assert_eq!(err.field, "end_time");
    }

    #[test]
    fn non_object_root_is_malformed() {
        let err = normalize_trace("t1", &json!([1, 2, 3])).unwrap_err();
        assert_eq!(err.field, "root");
    }

    #[test]
    fn parse_instant_formats() {
        assert!(parse_instant(Some("2025-06-01T10:00:00Z")).is_some());
        assert!(parse_instant(Some("2025-06-01T10:00:00+02:00")).is_some());
        assert!(parse_instant(Some("2025-06-01 10:00:00.123456")).is_some());
        assert!(parse_instant(Some("2025-06-01T10:00:00.5")).is_some());
        assert!(parse_instant(Some("yesterday")).is_none());
        assert!(parse_instant(None).is_none());
    }

    #[test]
    fn message_content_blocks_join_text_only() {
        let mut raw = minimal();
        raw["main_agent_message_history"] = json!({
            "message_history": [
                {"role": "user", "content": [
                    {"type": "text", "text": "part one"},
                    {"type": "image", "source": "..."},
                    {"type": "text", "text": "part two"},
                ]},
                {"role": "assistant", "content": "plain"},
                {"role": "tool", "content": "dropped"},
            ]
        });
        let record = normalize_trace("t1", &raw).unwrap();
        assert_eq!(record.main_history.len(), 2);
        assert_eq!(record.main_history[0].content, "part one\npart two");
        assert_eq!(record.main_history[1].content, "plain");
    }

    #[test]
    fn sub_sessions_preserve_payload_order() {
        let mut raw = minimal();
        raw["sub_agent_message_history_sessions"] = json!({
            "zeta": {"message_history": [{"role": "assistant", "content": "z"}]},
            "alpha": {"message_history": [{"role": "assistant", "content": "a"}]},
        });
        let record = normalize_trace("t1", &raw).unwrap();
        let ids: Vec<_> = record.sub_sessions.keys().cloned().collect();
        assert_eq!(ids, vec!["zeta", "alpha"]);
    }

    #[test]
    fn damaged_step_log_entry_is_skipped() {
        let mut raw = minimal();
        raw["step_logs"] = json!([
            {"timestamp": "garbage", "step_name": "bad", "status": "info", "message": ""},
            {"timestamp": "2025-06-01T10:00:30Z", "step_name": "good",
             "status": "success", "message": "ok"},
        ]);
        let record = normalize_trace("t1", &raw).unwrap();
        assert_eq!(record.step_logs.len(), 1);
        assert_eq!(record.step_logs[0].step_name, "good");
        assert_eq!(record.step_logs[0].status, StepStatus::Success);
    }

    #[test]
    fn unknown_status_defaults_to_pending() {
        let mut raw = minimal();
        raw["status"] = json!("exploded");
        let record = normalize_trace("t1", &raw).unwrap();
        assert_eq!(record.status, TraceStatus::Pending);
    }

    #[test]
    fn judge_and_answer_fields() {
        let mut raw = minimal();
        raw["judge_result"] = json!("CORRECT");
        raw["final_boxed_answer"] = json!("42");
        raw["input"] = json!({"task_description": "count things", "metadata": {"level": 3}});
        let record = normalize_trace("t1", &raw).unwrap();
        assert_eq!(record.judge_result, JudgeResult::Correct);
        assert_eq!(record.final_answer.as_deref(), Some("42"));
        assert_eq!(record.input.task_description, "count things");
        assert_eq!(record.input.metadata.get("level"), Some(&json!(3)));
    }
}
