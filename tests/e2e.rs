//! End-to-end integration tests for the trace pipeline.
//!
//! Each test exercises the full path: temp directory tree → discovery →
//! load → normalize → timeline/analytics.

use std::fs;
use std::path::Path;

use serde_json::json;
use tempfile::TempDir;

use tracescope::loader::{discover_index, load_trace, Liveness, TaskRef};
use tracescope::store::fs::FsStore;
use tracescope::trace::analytics::{SummaryFormatter, TextFormatter};
use tracescope::trace::timeline::TimelineItem;
use tracescope::trace::{JudgeResult, StepStatus, TraceStatus};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn invocation(server: &str, tool: &str) -> String {
    format!(
        "<use_mcp_tool><server_name>{server}</server_name>\
         <tool_name>{tool}</tool_name>\
         <arguments>{{\"q\": \"x\"}}</arguments></use_mcp_tool>"
    )
}

/// A realistic completed trace: two main turns, one sub-agent session
/// anchored by a session_start step, and a small step log.
fn full_trace() -> serde_json::Value {
    json!({
        "start_time": "2025-06-01T10:00:00Z",
        "end_time": "2025-06-01T10:02:05Z",
        "status": "completed",
        "judge_result": "CORRECT",
        "final_boxed_answer": "42",
        "input": {"task_description": "count the widgets", "metadata": {"level": 2}},
        "main_agent_message_history": {"message_history": [
            {"role": "system", "content": "you are an agent"},
            {"role": "user", "content": "count the widgets"},
            {"role": "assistant", "content": format!("Delegating.\n{}", invocation("agents", "spawn_sub_agent"))},
            {"role": "user", "content": "sub-agent finished"},
            {"role": "assistant", "content": "\\boxed{42}"},
        ]},
        "sub_agent_message_history_sessions": {
            "sub-1": {"message_history": [
                {"role": "user", "content": "count them"},
                {"role": "assistant", "content": format!("Looking.\n{}", invocation("serp", "google_search"))},
            ]},
        },
        "step_logs": [
            {"timestamp": "2025-06-01T10:00:05Z", "step_name": "setup",
             "message": "env ready", "status": "success"},
            {"timestamp": "2025-06-01T10:01:00Z", "step_name": "sub_agent_session_start",
             "message": "spawned", "status": "info", "metadata": {"session_id": "sub-1"}},
            {"timestamp": "2025-06-01T10:02:00Z", "step_name": "judge",
             "message": "graded", "status": "success"},
        ],
    })
}

fn write_trace(dir: &Path, name: &str, value: &serde_json::Value) {
    fs::write(dir.join(name), serde_json::to_vec_pretty(value).unwrap()).unwrap();
}

fn seed_store() -> TempDir {
    let tmp = tempfile::tempdir().unwrap();
    let config = tmp.path().join("gaia").join("default");
    fs::create_dir_all(&config).unwrap();
    write_trace(&config, "task_1.json", &full_trace());
    write_trace(&config, "task_2.json", &json!({
        "start_time": "2025-06-01T11:00:00Z",
        "status": "running",
    }));
    fs::write(config.join("README.txt"), "not a trace").unwrap();
    tmp
}

fn task(path: &str) -> TaskRef {
    TaskRef {
        name: path.rsplit('/').next().unwrap().to_string(),
        path: path.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

#[tokio::test]
async fn discovery_indexes_the_hierarchy() {
    let tmp = seed_store();
    let store = FsStore::new(tmp.path());

    let index = discover_index(&store, &Liveness::immortal()).await.unwrap();

    assert_eq!(index.benchmarks.len(), 1);
    assert_eq!(index.benchmarks[0].name, "gaia");
    assert_eq!(index.benchmarks[0].configs.len(), 1);
    let tasks = &index.benchmarks[0].configs[0].tasks;
    // Only .json files become tasks.
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].task_id(), "task_1");
    assert_eq!(index.task_count(), 2);
}

#[tokio::test]
async fn discovery_skips_damaged_branches() {
    let tmp = seed_store();
    // A benchmark directory whose "config" level is a plain file cannot be
    // listed; the walk must keep the healthy sibling.
    let broken = tmp.path().join("broken");
    fs::create_dir_all(&broken).unwrap();
    fs::write(broken.join("not_a_config"), "oops").unwrap();

    let store = FsStore::new(tmp.path());
    let index = discover_index(&store, &Liveness::immortal()).await.unwrap();

    let names: Vec<&str> = index.benchmarks.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["broken", "gaia"]);
    // The file at config level is not a directory, so it yields no configs.
    assert!(index.benchmarks[0].configs.is_empty());
    assert_eq!(index.benchmarks[1].configs[0].tasks.len(), 2);
}

#[tokio::test]
async fn discovery_fails_only_for_missing_root() {
    let store = FsStore::new("/nonexistent/trace/root");
    assert!(discover_index(&store, &Liveness::immortal()).await.is_err());
}

// ---------------------------------------------------------------------------
// Load → timeline → analytics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_load_reconstructs_timeline_and_analytics() {
    let tmp = seed_store();
    let store = FsStore::new(tmp.path());

    let session = load_trace(&store, &task("gaia/default/task_1.json"))
        .await
        .unwrap();

    let record = &session.record;
    assert_eq!(record.task_id, "task_1");
    assert_eq!(record.status, TraceStatus::Completed);
    assert_eq!(record.judge_result, JudgeResult::Correct);
    assert_eq!(record.final_answer.as_deref(), Some("42"));
    assert_eq!(record.input.task_description, "count the widgets");

    // System message filtered, two turns numbered, sub-agent block inserted
    // between them (the four main items interpolate to 25/50/75/100s of the
    // 125s span; the session_start step at 60s lands after the second item).
    let kinds: Vec<String> = session
        .timeline
        .iter()
        .map(|item| match item {
            TimelineItem::Message { message, turn } => {
                format!("{}{}", message.role, turn.map(|t| t.to_string()).unwrap_or_default())
            }
            TimelineItem::SubAgentBlock { session_id, .. } => format!("sub:{session_id}"),
        })
        .collect();
    assert_eq!(
        kinds,
        vec!["user", "assistant1", "sub:sub-1", "user", "assistant2"]
    );

    let summary = &session.analytics;
    assert_eq!(summary.duration_seconds, Some(125));
    assert!(!summary.clock_skew);
    assert_eq!(summary.main_turn_count, 2);
    assert_eq!(summary.sub_agent_session_count, 1);
    assert_eq!(summary.sub_agent_turn_count, 1);
    // One call in the main session, one inside the sub-agent.
    assert_eq!(summary.total_tool_call_count, 2);
    assert_eq!(summary.tool_frequency.get("spawn_sub_agent"), Some(&1));
    assert_eq!(summary.tool_frequency.get("google_search"), Some(&1));
    assert_eq!(summary.step_status_counts.get(&StepStatus::Success), Some(&2));
    assert_eq!(summary.step_status_counts.get(&StepStatus::Info), Some(&1));

    let elapsed: Vec<i64> = summary.timeline_series.iter().map(|p| p.elapsed_seconds).collect();
    assert_eq!(elapsed, vec![5, 60, 120]);
}

#[tokio::test]
async fn in_flight_trace_loads_without_end_time() {
    let tmp = seed_store();
    let store = FsStore::new(tmp.path());

    let session = load_trace(&store, &task("gaia/default/task_2.json"))
        .await
        .unwrap();

    assert_eq!(session.record.status, TraceStatus::Running);
    assert!(session.record.end_time.is_none());
    assert_eq!(session.analytics.duration_seconds, None);
}

#[tokio::test]
async fn broken_trace_fails_while_store_stays_usable() {
    let tmp = seed_store();
    let config = tmp.path().join("gaia").join("default");
    fs::write(config.join("task_3.json"), "{ not json").unwrap();

    let store = FsStore::new(tmp.path());
    assert!(load_trace(&store, &task("gaia/default/task_3.json")).await.is_err());

    // The failed load has no effect on later loads.
    let session = load_trace(&store, &task("gaia/default/task_1.json"))
        .await
        .unwrap();
    assert_eq!(session.record.task_id, "task_1");
}

// ---------------------------------------------------------------------------
// Report output
// ---------------------------------------------------------------------------

#[tokio::test]
async fn text_report_summarizes_the_trace() {
    let tmp = seed_store();
    let store = FsStore::new(tmp.path());
    let session = load_trace(&store, &task("gaia/default/task_1.json"))
        .await
        .unwrap();

    let report = TextFormatter.format(&session.record, &session.analytics);
    assert!(report.contains("Trace Report: task_1"));
    assert!(report.contains("CORRECT"));
    assert!(report.contains("125s"));
    assert!(report.contains("google_search"));
    assert!(report.contains("success"));
}
