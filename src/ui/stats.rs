use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Sparkline};
use ratatui::Frame;

use tracescope::app::{App, FocusPanel};
use tracescope::trace::{JudgeResult, StepStatus, TraceSession};

use super::colors;

/// Top-N rows of the tool histogram.
const TOOL_ROWS: usize = 8;

pub fn render(f: &mut Frame, app: &App, area: Rect) {
    let border_style = if app.focus == FocusPanel::Stats {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let block = Block::default()
        .title(" Analytics ")
        .borders(Borders::ALL)
        .border_style(border_style);

    let Some(ref session) = app.session else {
        f.render_widget(
            Paragraph::new(Line::from(Span::styled(
                "  no trace loaded",
                Style::default().fg(Color::DarkGray),
            )))
            .block(block),
            area,
        );
        return;
    };

    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(4)])
        .split(inner);

    f.render_widget(Paragraph::new(summary_lines(session)), chunks[0]);
    render_step_sparkline(f, session, chunks[1]);
}

fn summary_lines(session: &TraceSession) -> Vec<Line<'static>> {
    let record = &session.record;
    let summary = &session.analytics;

    let duration = match summary.duration_seconds {
        Some(s) => format!("{s}s"),
        None => "in flight".to_string(),
    };
    let judge_color = match record.judge_result {
        JudgeResult::Correct => colors::JUDGE_CORRECT,
        JudgeResult::Incorrect => colors::JUDGE_INCORRECT,
        JudgeResult::Unknown => colors::JUDGE_UNKNOWN,
    };

    let mut lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::raw("  Judge: "),
            Span::styled(
                record.judge_result.to_string(),
                Style::default().fg(judge_color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  [{}]", record.status),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        Line::from(""),
        stat_line("  Duration  ", duration, Color::White),
        stat_line("  Main turns", summary.main_turn_count.to_string(), Color::White),
        stat_line(
            "  Sub agents",
            format!(
                "{} ({} turns)",
                summary.sub_agent_session_count, summary.sub_agent_turn_count
            ),
            colors::SUB_AGENT,
        ),
        stat_line(
            "  Tool calls",
            summary.total_tool_call_count.to_string(),
            colors::TOOL_CALL,
        ),
    ];
    if summary.clock_skew {
        lines.push(Line::from(Span::styled(
            "  ! end_time precedes start_time",
            Style::default().fg(colors::STEP_WARNING),
        )));
    }

    if !summary.tool_frequency.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "  Top tools",
            Style::default().fg(Color::White),
        )));
        let mut tools: Vec<_> = summary.tool_frequency.iter().collect();
        tools.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (name, count) in tools.into_iter().take(TOOL_ROWS) {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("  {:<18}", truncate(name, 18)),
                    Style::default().fg(colors::ACCENT_MUTED),
                ),
                Span::styled(format!("{count:>4}"), Style::default().fg(colors::TOOL_CALL)),
            ]));
        }
    }

    if !summary.step_status_counts.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "  Step log",
            Style::default().fg(Color::White),
        )));
        for (status, count) in &summary.step_status_counts {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("  {:<10}", status.to_string()),
                    Style::default().fg(status_color(*status)),
                ),
                Span::styled(format!("{count:>4}"), Style::default().fg(Color::White)),
            ]));
        }
    }

    lines
}

/// Pacing chart: one bar per step log entry, height = seconds since trace
/// start so clusters and stalls stand out.
fn render_step_sparkline(f: &mut Frame, session: &TraceSession, area: Rect) {
    let series = &session.analytics.timeline_series;
    if series.is_empty() || area.height == 0 {
        return;
    }
    let data: Vec<u64> = series
        .iter()
        .map(|p| p.elapsed_seconds.max(0) as u64)
        .collect();
    let sparkline = Sparkline::default()
        .block(
            Block::default()
                .borders(Borders::TOP)
                .title(format!(" steps ({}) ", series.len())),
        )
        .data(&data)
        .style(Style::default().fg(colors::ACCENT_MUTED));
    f.render_widget(sparkline, area);
}

fn stat_line(label: &str, value: String, color: Color) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label}: "), Style::default().fg(Color::DarkGray)),
        Span::styled(value, Style::default().fg(color)),
    ])
}

fn status_color(status: StepStatus) -> Color {
    match status {
        StepStatus::Info => colors::STEP_INFO,
        StepStatus::Success => colors::STEP_SUCCESS,
        StepStatus::Warning => colors::STEP_WARNING,
        StepStatus::Failed => colors::STEP_FAILED,
        StepStatus::Debug => colors::STEP_DEBUG,
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    } else {
        s.to_string()
    }
}
