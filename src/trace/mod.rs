pub mod analytics;
pub mod markup;
pub mod normalize;
pub mod timeline;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use analytics::AnalyticsSummary;
use timeline::TimelineItem;

/// Outcome status of a trace record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Interrupted,
}

impl TraceStatus {
    /// Pending and running traces may legitimately have no end time yet.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, TraceStatus::Pending | TraceStatus::Running)
    }
}

impl std::fmt::Display for TraceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraceStatus::Pending => write!(f, "pending"),
            TraceStatus::Running => write!(f, "running"),
            TraceStatus::Completed => write!(f, "completed"),
            TraceStatus::Failed => write!(f, "failed"),
            TraceStatus::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Verdict recorded by the benchmark judge, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JudgeResult {
    Correct,
    Incorrect,
    Unknown,
}

impl std::fmt::Display for JudgeResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JudgeResult::Correct => write!(f, "CORRECT"),
            JudgeResult::Incorrect => write!(f, "INCORRECT"),
            JudgeResult::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Severity of one step log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Info,
    Success,
    Warning,
    Failed,
    Debug,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepStatus::Info => write!(f, "info"),
            StepStatus::Success => write!(f, "success"),
            StepStatus::Warning => write!(f, "warning"),
            StepStatus::Failed => write!(f, "failed"),
            StepStatus::Debug => write!(f, "debug"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    Assistant,
    User,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::User => write!(f, "user"),
        }
    }
}

/// One message in a history. `content` is the plain-text view: string content
/// verbatim, block-list content concatenated across text blocks joined by
/// newlines (non-text blocks are dropped at normalization time).
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

/// One entry of the auxiliary step log, separate from the message histories.
#[derive(Debug, Clone, Serialize)]
pub struct StepLogEntry {
    pub timestamp: DateTime<Utc>,
    pub step_name: String,
    pub message: String,
    pub status: StepStatus,
    pub metadata: Map<String, Value>,
}

impl StepLogEntry {
    /// The sub-agent session this entry correlates to, if its metadata says
    /// so. Producers have emitted both key spellings.
    pub fn session_id(&self) -> Option<&str> {
        self.metadata
            .get("session_id")
            .or_else(|| self.metadata.get("sessionId"))
            .and_then(|v| v.as_str())
    }
}

/// The task the agent was asked to solve.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskInput {
    pub task_description: String,
    pub metadata: Map<String, Value>,
}

/// A tool invocation extracted from tagged markup in assistant text.
/// Derived on demand by [`markup`], never stored in the record itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolInvocation {
    pub server_name: String,
    pub tool_name: String,
    pub raw_arguments: String,
}

/// One fully normalized trace record: the root entity for a task execution.
///
/// `end_time` is absent only for in-flight traces; duration is then unknown,
/// never negative. The sub-session map preserves payload order.
#[derive(Debug, Clone, Serialize)]
pub struct TraceRecord {
    pub task_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: TraceStatus,
    pub judge_result: JudgeResult,
    pub final_answer: Option<String>,
    pub input: TaskInput,
    pub main_history: Vec<Message>,
    pub sub_sessions: IndexMap<String, Vec<Message>>,
    pub step_logs: Vec<StepLogEntry>,
}

impl TraceRecord {
    /// Count assistant messages in a history (its "turns").
    pub fn turn_count(history: &[Message]) -> usize {
        history
            .iter()
            .filter(|m| m.role == MessageRole::Assistant)
            .count()
    }
}

/// Everything derived from one loaded trace, built once and owned by the
/// active view. Replacing a trace replaces the whole session atomically;
/// dropping it discards the entire tree.
#[derive(Debug, Clone, Serialize)]
pub struct TraceSession {
    pub record: TraceRecord,
    pub timeline: Vec<TimelineItem>,
    pub analytics: AnalyticsSummary,
}

impl TraceSession {
    pub fn new(record: TraceRecord) -> Self {
        let timeline = timeline::reconstruct_timeline(&record);
        let analytics = analytics::summarize(&record);
        Self {
            record,
            timeline,
            analytics,
        }
    }
}
