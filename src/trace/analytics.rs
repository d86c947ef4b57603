//! Analytics aggregation over a normalized trace.
//!
//! All aggregates are derived once per load and invalidated only by loading
//! a new trace; counts are exact integers.

use std::collections::BTreeMap;

use serde::Serialize;

use super::markup;
use super::{Message, MessageRole, StepStatus, TraceRecord};

/// One point of the chronological step chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelinePoint {
    /// Seconds from trace start, rounded to the nearest second. May be
    /// negative for entries logged before `start_time`; passed through as-is.
    pub elapsed_seconds: i64,
    /// 0-based position in the step log.
    pub step_index: usize,
    pub status: StepStatus,
}

/// Summary statistics for one trace record.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSummary {
    /// Whole seconds from start to end, floored. `None` while the trace is
    /// still in flight; clamped to 0 on clock skew.
    pub duration_seconds: Option<u64>,
    /// True when clock skew forced the duration clamp. A data-quality
    /// signal, not a crash condition.
    pub clock_skew: bool,
    pub main_turn_count: usize,
    pub total_tool_call_count: usize,
    pub sub_agent_session_count: usize,
    pub sub_agent_turn_count: usize,
    /// Tool name → occurrence count, in deterministic name order.
    pub tool_frequency: BTreeMap<String, usize>,
    pub step_status_counts: BTreeMap<StepStatus, usize>,
    /// One point per step log entry, in step log order even when timestamps
    /// are not strictly increasing.
    pub timeline_series: Vec<TimelinePoint>,
}

/// Compute the summary for one trace.
pub fn summarize(record: &TraceRecord) -> AnalyticsSummary {
    let (duration_seconds, clock_skew) = duration(record);
    if clock_skew {
        tracing::warn!(
            task_id = %record.task_id,
            "end_time precedes start_time, clamping duration to 0"
        );
    }

    let mut tool_frequency: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_tool_call_count = 0;
    count_tools(&record.main_history, &mut tool_frequency, &mut total_tool_call_count);
    let mut sub_agent_turn_count = 0;
    for history in record.sub_sessions.values() {
        sub_agent_turn_count += TraceRecord::turn_count(history);
        count_tools(history, &mut tool_frequency, &mut total_tool_call_count);
    }

    let mut step_status_counts = BTreeMap::new();
    let mut timeline_series = Vec::with_capacity(record.step_logs.len());
    for (step_index, entry) in record.step_logs.iter().enumerate() {
        *step_status_counts.entry(entry.status).or_insert(0) += 1;
        let elapsed_ms = (entry.timestamp - record.start_time).num_milliseconds();
        timeline_series.push(TimelinePoint {
            elapsed_seconds: (elapsed_ms as f64 / 1000.0).round() as i64,
            step_index,
            status: entry.status,
        });
    }

    AnalyticsSummary {
        duration_seconds,
        clock_skew,
        main_turn_count: TraceRecord::turn_count(&record.main_history),
        total_tool_call_count,
        sub_agent_session_count: record.sub_sessions.len(),
        sub_agent_turn_count,
        tool_frequency,
        step_status_counts,
        timeline_series,
    }
}

/// (duration, clock_skew). Floored whole seconds, clamped at 0.
fn duration(record: &TraceRecord) -> (Option<u64>, bool) {
    let Some(end) = record.end_time else {
        return (None, false);
    };
    let seconds = (end - record.start_time).num_seconds();
    if seconds < 0 {
        (Some(0), true)
    } else {
        (Some(seconds as u64), false)
    }
}

/// Run the markup frequency scan over every assistant message of a history.
fn count_tools(
    history: &[Message],
    frequency: &mut BTreeMap<String, usize>,
    total: &mut usize,
) {
    for message in history {
        if message.role != MessageRole::Assistant {
            continue;
        }
        for name in markup::tool_name_occurrences(&message.content) {
            *frequency.entry(name.to_string()).or_insert(0) += 1;
            *total += 1;
        }
    }
}

/// Trait for formatting an analytics summary.
/// Implement this trait to add new output formats.
pub trait SummaryFormatter {
    fn format(&self, record: &TraceRecord, summary: &AnalyticsSummary) -> String;
}

/// Text table formatter for terminal output (`--report` mode).
#[derive(Debug, Clone, Default)]
pub struct TextFormatter;

impl SummaryFormatter for TextFormatter {
    fn format(&self, record: &TraceRecord, summary: &AnalyticsSummary) -> String {
        let mut output = String::new();
        let separator = "─".repeat(52);

        output.push_str(&format!("Trace Report: {}\n", record.task_id));
        output.push_str(&separator);
        output.push('\n');

        let duration = match summary.duration_seconds {
            Some(s) => format!("{s}s"),
            None => "unknown (in flight)".to_string(),
        };
        output.push_str(&format!("{:<24} {}\n", "Status", record.status));
        output.push_str(&format!("{:<24} {}\n", "Judge", record.judge_result));
        output.push_str(&format!("{:<24} {}\n", "Duration", duration));
        output.push_str(&format!("{:<24} {}\n", "Main turns", summary.main_turn_count));
        output.push_str(&format!(
            "{:<24} {}\n",
            "Sub-agent sessions", summary.sub_agent_session_count
        ));
        output.push_str(&format!(
            "{:<24} {}\n",
            "Sub-agent turns", summary.sub_agent_turn_count
        ));
        output.push_str(&format!(
            "{:<24} {}\n",
            "Tool calls", summary.total_tool_call_count
        ));

        if !summary.tool_frequency.is_empty() {
            output.push_str(&separator);
            output.push('\n');
            output.push_str(&format!("{:<40} {:>8}\n", "Tool", "Calls"));
            let mut tools: Vec<_> = summary.tool_frequency.iter().collect();
            tools.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
            for (name, count) in tools {
                output.push_str(&format!("{name:<40} {count:>8}\n"));
            }
        }

        if !summary.step_status_counts.is_empty() {
            output.push_str(&separator);
            output.push('\n');
            output.push_str(&format!("{:<40} {:>8}\n", "Step status", "Count"));
            for (status, count) in &summary.step_status_counts {
                output.push_str(&format!("{:<40} {:>8}\n", status.to_string(), count));
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{JudgeResult, StepLogEntry, TaskInput, TraceStatus};
    use chrono::{TimeZone, Utc};
    use indexmap::IndexMap;
    use serde_json::Map;

    fn at(seconds: i64) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap() + chrono::TimeDelta::seconds(seconds)
    }

    fn assistant(content: &str) -> Message {
        Message {
            role: MessageRole::Assistant,
            content: content.to_string(),
        }
    }

    fn step(seconds: i64, status: StepStatus) -> StepLogEntry {
        StepLogEntry {
            timestamp: at(seconds),
            step_name: "step".into(),
            message: String::new(),
            status,
            metadata: Map::new(),
        }
    }

    fn record(main: Vec<Message>, subs: IndexMap<String, Vec<Message>>) -> TraceRecord {
        TraceRecord {
            task_id: "t".into(),
            start_time: at(0),
            end_time: Some(at(125)),
            status: TraceStatus::Completed,
            judge_result: JudgeResult::Unknown,
            final_answer: None,
            input: TaskInput::default(),
            main_history: main,
            sub_sessions: subs,
            step_logs: Vec::new(),
        }
    }

    fn invocation(tool: &str) -> String {
        format!("<use_mcp_tool><tool_name>{tool}</tool_name></use_mcp_tool>")
    }

    #[test]
    fn duration_basic_and_clamped() {
        let rec = record(Vec::new(), IndexMap::new());
        let summary = summarize(&rec);
        assert_eq!(summary.duration_seconds, Some(125));
        assert!(!summary.clock_skew);

        let mut skewed = record(Vec::new(), IndexMap::new());
        skewed.end_time = Some(at(-10));
        let summary = summarize(&skewed);
        assert_eq!(summary.duration_seconds, Some(0));
        assert!(summary.clock_skew);
    }

    #[test]
    fn duration_unknown_in_flight() {
        let mut rec = record(Vec::new(), IndexMap::new());
        rec.end_time = None;
        rec.status = TraceStatus::Running;
        let summary = summarize(&rec);
        assert_eq!(summary.duration_seconds, None);
        assert!(!summary.clock_skew);
    }

    #[test]
    fn tool_calls_sum_across_main_and_subs() {
        let main = vec![
            Message { role: MessageRole::User, content: invocation("decoy") },
            assistant(&invocation("search")),
            assistant(&invocation("read_page")),
        ];
        let mut subs = IndexMap::new();
        subs.insert("sub-1".to_string(), vec![assistant(&invocation("search"))]);
        let summary = summarize(&record(main, subs));

        // User-message markup is never counted.
        assert_eq!(summary.total_tool_call_count, 3);
        assert_eq!(summary.tool_frequency.get("search"), Some(&2));
        assert_eq!(summary.tool_frequency.get("read_page"), Some(&1));
        assert_eq!(summary.tool_frequency.get("decoy"), None);
        assert_eq!(summary.main_turn_count, 2);
        assert_eq!(summary.sub_agent_session_count, 1);
        assert_eq!(summary.sub_agent_turn_count, 1);
    }

    #[test]
    fn turn_counts_for_zero_one_n() {
        assert_eq!(summarize(&record(Vec::new(), IndexMap::new())).main_turn_count, 0);
        assert_eq!(
            summarize(&record(vec![assistant("a")], IndexMap::new())).main_turn_count,
            1
        );
        let many = vec![assistant("a"), assistant("b"), assistant("c")];
        assert_eq!(summarize(&record(many, IndexMap::new())).main_turn_count, 3);
    }

    #[test]
    fn step_series_preserves_order_and_tallies() {
        let mut rec = record(Vec::new(), IndexMap::new());
        // Out-of-order timestamps are passed through, not re-sorted.
        rec.step_logs = vec![
            step(10, StepStatus::Info),
            step(5, StepStatus::Failed),
            step(20, StepStatus::Info),
        ];
        let summary = summarize(&rec);
        let elapsed: Vec<i64> = summary
            .timeline_series
            .iter()
            .map(|p| p.elapsed_seconds)
            .collect();
        assert_eq!(elapsed, vec![10, 5, 20]);
        let indices: Vec<usize> = summary.timeline_series.iter().map(|p| p.step_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(summary.step_status_counts.get(&StepStatus::Info), Some(&2));
        assert_eq!(summary.step_status_counts.get(&StepStatus::Failed), Some(&1));
    }

    #[test]
    fn elapsed_seconds_rounds() {
        let mut rec = record(Vec::new(), IndexMap::new());
        rec.step_logs = vec![StepLogEntry {
            timestamp: at(9) + chrono::TimeDelta::milliseconds(700),
            step_name: "s".into(),
            message: String::new(),
            status: StepStatus::Info,
            metadata: Map::new(),
        }];
        let summary = summarize(&rec);
        assert_eq!(summary.timeline_series[0].elapsed_seconds, 10);
    }

    #[test]
    fn text_report_structure() {
        let main = vec![assistant(&invocation("search"))];
        let mut rec = record(main, IndexMap::new());
        rec.judge_result = JudgeResult::Correct;
        rec.step_logs = vec![step(1, StepStatus::Success)];
        let summary = summarize(&rec);

        let output = TextFormatter.format(&rec, &summary);
        assert!(output.contains("Trace Report: t"));
        assert!(output.contains("CORRECT"));
        assert!(output.contains("125s"));
        assert!(output.contains("search"));
        assert!(output.contains("success"));
    }
}
