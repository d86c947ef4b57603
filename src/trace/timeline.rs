//! Timeline reconstruction.
//!
//! Produces one chronologically ordered sequence mixing the main session's
//! turns with nested sub-agent session blocks. System messages are excluded;
//! assistant messages carry a 1-based turn number.
//!
//! Sub-agent insertion points are best-effort: the producer does not
//! guarantee temporal correlation between the step log and the message
//! history, and main-history messages carry no timestamps of their own. Each
//! main item is therefore assigned an instant interpolated across the trace's
//! time span, and a block lands after the last item whose inferred instant
//! precedes its `session_start` step entry. A session with no matching step
//! entry is appended at the end; this fallback is deliberate behavior.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Message, MessageRole, TraceRecord};

/// Marker substring identifying the step log entry that opened a sub-agent
/// session.
pub const SESSION_START_MARKER: &str = "session_start";

/// One item of the reconstructed timeline.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimelineItem {
    /// A non-system message of the main history. `turn` is set only for
    /// assistant messages.
    Message {
        message: Message,
        turn: Option<usize>,
    },
    /// One complete sub-agent session, keyed by its session id.
    SubAgentBlock {
        session_id: String,
        messages: Vec<Message>,
    },
}

/// Reconstruct the interleaved timeline for one trace.
pub fn reconstruct_timeline(record: &TraceRecord) -> Vec<TimelineItem> {
    let mut turn = 0usize;
    let main: Vec<TimelineItem> = record
        .main_history
        .iter()
        .filter(|m| m.role != MessageRole::System)
        .map(|m| {
            let turn = (m.role == MessageRole::Assistant).then(|| {
                turn += 1;
                turn
            });
            TimelineItem::Message {
                message: m.clone(),
                turn,
            }
        })
        .collect();

    // Zero sub-sessions: trivial pass-through, no insertion-point search.
    if record.sub_sessions.is_empty() {
        return main;
    }

    // insertions[i] holds the blocks placed after the first i main items,
    // in sub-session mapping order.
    let mut insertions: Vec<Vec<TimelineItem>> = vec![Vec::new(); main.len() + 1];
    let instants = inferred_instants(record, main.len());
    for (session_id, messages) in &record.sub_sessions {
        let at = insertion_point(record, &instants, session_id).unwrap_or(main.len());
        insertions[at].push(TimelineItem::SubAgentBlock {
            session_id: session_id.clone(),
            messages: messages.clone(),
        });
    }

    let mut timeline = Vec::with_capacity(main.len() + record.sub_sessions.len());
    timeline.extend(insertions[0].drain(..));
    for (i, item) in main.into_iter().enumerate() {
        timeline.push(item);
        timeline.extend(insertions[i + 1].drain(..));
    }
    timeline
}

/// Instants inferred for the filtered main items by linear interpolation
/// across the trace span. Empty when the span is unknown.
fn inferred_instants(record: &TraceRecord, item_count: usize) -> Vec<DateTime<Utc>> {
    let Some(end) = record.end_time else {
        return Vec::new();
    };
    let span = end - record.start_time;
    if span < chrono::TimeDelta::zero() {
        return Vec::new();
    }
    (0..item_count)
        .map(|i| record.start_time + span * (i as i32 + 1) / (item_count as i32 + 1))
        .collect()
}

/// Number of main items preceding the given session's block, or `None` for
/// the append-at-end fallback.
fn insertion_point(
    record: &TraceRecord,
    instants: &[DateTime<Utc>],
    session_id: &str,
) -> Option<usize> {
    let started_at = record
        .step_logs
        .iter()
        .find(|e| {
            e.step_name.contains(SESSION_START_MARKER) && e.session_id() == Some(session_id)
        })?
        .timestamp;
    if instants.is_empty() {
        return None;
    }
    Some(instants.iter().take_while(|t| **t <= started_at).count())
}
