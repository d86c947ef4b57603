use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState};
use ratatui::Frame;

use tracescope::app::{App, FocusPanel, RowKind};

use super::colors;

pub fn render(f: &mut Frame, app: &App, area: Rect) {
    let border_style = if app.focus == FocusPanel::Index {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let block = Block::default()
        .title(" Traces ")
        .borders(Borders::ALL)
        .border_style(border_style);

    if app.index_rows.is_empty() {
        let placeholder = if app.loading {
            "  discovering traces..."
        } else {
            "  no traces found"
        };
        f.render_widget(
            ratatui::widgets::Paragraph::new(Line::from(Span::styled(
                placeholder,
                Style::default().fg(Color::DarkGray),
            )))
            .block(block),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = app
        .index_rows
        .iter()
        .map(|row| {
            let indent = "  ".repeat(row.depth);
            let icon = if row.has_children {
                if row.is_expanded { "▾ " } else { "▸ " }
            } else {
                "  "
            };

            let mut spans = vec![
                Span::raw(indent),
                Span::styled(icon, Style::default().fg(Color::DarkGray)),
            ];
            match &row.kind {
                RowKind::Benchmark => spans.push(Span::styled(
                    row.label.clone(),
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                )),
                RowKind::Config => spans.push(Span::styled(
                    row.label.clone(),
                    Style::default().fg(colors::ACCENT_MUTED),
                )),
                RowKind::Task(_) => spans.push(Span::styled(
                    row.label.clone(),
                    Style::default().fg(Color::Gray),
                )),
            }

            ListItem::new(Line::from(spans))
        })
        .collect();

    let mut state = ListState::default();
    state.select(Some(app.selected_index));

    let list = List::new(items).block(block).highlight_style(
        Style::default()
            .bg(colors::HIGHLIGHT_BG)
            .fg(colors::HIGHLIGHT_FG)
            .add_modifier(Modifier::BOLD),
    );

    f.render_stateful_widget(list, area, &mut state);
}
