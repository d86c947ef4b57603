use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use tracescope::app::{App, FocusPanel};
use tracescope::trace::markup;
use tracescope::trace::timeline::TimelineItem;
use tracescope::trace::{MessageRole, TraceRecord};

use super::colors;

/// Longest reasoning excerpt shown per message before truncation.
const PREVIEW_LINES: usize = 6;

pub fn render(f: &mut Frame, app: &App, area: Rect) {
    let border_style = if app.focus == FocusPanel::Timeline {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let Some(ref session) = app.session else {
        let block = Block::default()
            .title(" Timeline ")
            .borders(Borders::ALL)
            .border_style(border_style);
        f.render_widget(
            Paragraph::new(Line::from(Span::styled(
                "  select a task to load its trace",
                Style::default().fg(Color::DarkGray),
            )))
            .block(block),
            area,
        );
        return;
    };

    let title = format!(" Timeline — {} ", session.record.task_id);
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style);

    let mut lines: Vec<Line> = Vec::new();
    for item in session.timeline.iter().skip(app.timeline_scroll) {
        match item {
            TimelineItem::Message { message, turn } => {
                push_message_lines(&mut lines, message.role, *turn, &message.content, 0);
            }
            TimelineItem::SubAgentBlock {
                session_id,
                messages,
            } => {
                lines.push(Line::from(Span::styled(
                    format!(
                        "┌─ sub-agent {} ({} turns, {} messages)",
                        session_id,
                        TraceRecord::turn_count(messages),
                        messages.len()
                    ),
                    Style::default()
                        .fg(colors::SUB_AGENT)
                        .add_modifier(Modifier::BOLD),
                )));
                for message in messages {
                    if message.role == MessageRole::System {
                        continue;
                    }
                    push_message_lines(&mut lines, message.role, None, &message.content, 1);
                }
                lines.push(Line::from(Span::styled(
                    "└─",
                    Style::default().fg(colors::SUB_AGENT),
                )));
            }
        }
        lines.push(Line::from(""));
        // No need to build lines far past the viewport.
        if lines.len() > area.height as usize * 2 {
            break;
        }
    }

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn push_message_lines(
    lines: &mut Vec<Line<'static>>,
    role: MessageRole,
    turn: Option<usize>,
    content: &str,
    depth: usize,
) {
    let indent = "  ".repeat(depth);
    let role_color = match role {
        MessageRole::Assistant => colors::ROLE_ASSISTANT,
        MessageRole::User => colors::ROLE_USER,
        MessageRole::System => Color::DarkGray,
    };
    let header = match turn {
        Some(n) => format!("{indent}[turn {n}] {role}"),
        None => format!("{indent}{role}"),
    };
    lines.push(Line::from(Span::styled(
        header,
        Style::default().fg(role_color).add_modifier(Modifier::BOLD),
    )));

    let (reasoning, invocation) = markup::split_reasoning(content);
    for text_line in reasoning.lines().take(PREVIEW_LINES) {
        lines.push(Line::from(Span::styled(
            format!("{indent}  {text_line}"),
            Style::default().fg(Color::Gray),
        )));
    }
    if reasoning.lines().count() > PREVIEW_LINES {
        lines.push(Line::from(Span::styled(
            format!("{indent}  …"),
            Style::default().fg(Color::DarkGray),
        )));
    }
    if let Some(invocation) = invocation {
        let target = if invocation.server_name.is_empty() {
            invocation.tool_name.clone()
        } else {
            format!("{}/{}", invocation.server_name, invocation.tool_name)
        };
        lines.push(Line::from(vec![
            Span::styled(
                format!("{indent}  ⚙ "),
                Style::default().fg(colors::TOOL_CALL),
            ),
            Span::styled(
                target,
                Style::default()
                    .fg(colors::TOOL_CALL)
                    .add_modifier(Modifier::BOLD),
            ),
        ]));
    }
}
