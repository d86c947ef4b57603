pub mod colors;
pub mod index_view;
pub mod stats;
pub mod timeline_view;

use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::Frame;

use tracescope::app::App;

pub fn render(f: &mut Frame, app: &App) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),   // panels
            Constraint::Length(1), // status bar
        ])
        .split(f.area());

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(28), // index tree
            Constraint::Percentage(44), // timeline
            Constraint::Percentage(28), // stats
        ])
        .split(outer[0]);

    index_view::render(f, app, panels[0]);
    timeline_view::render(f, app, panels[1]);
    stats::render(f, app, panels[2]);
    render_status_bar(f, app, outer[1]);
}

fn render_status_bar(f: &mut Frame, app: &App, area: ratatui::layout::Rect) {
    use ratatui::style::{Color, Style};
    use ratatui::text::{Line, Span};
    use ratatui::widgets::Paragraph;

    let status = if let Some(ref message) = app.status {
        Line::from(vec![
            Span::styled(
                if app.loading { " ⟳ " } else { " " },
                Style::default().fg(Color::Yellow),
            ),
            Span::raw(message.as_str()),
        ])
    } else {
        Line::from(vec![
            Span::styled(" [q]", Style::default().fg(Color::DarkGray)),
            Span::raw("uit "),
            Span::styled("[j/k]", Style::default().fg(Color::DarkGray)),
            Span::raw("nav "),
            Span::styled("[h/l]", Style::default().fg(Color::DarkGray)),
            Span::raw("expand "),
            Span::styled("[enter]", Style::default().fg(Color::DarkGray)),
            Span::raw("load "),
            Span::styled("[r]", Style::default().fg(Color::DarkGray)),
            Span::raw("escan "),
            Span::styled("[tab]", Style::default().fg(Color::DarkGray)),
            Span::raw("focus "),
        ])
    };

    f.render_widget(
        Paragraph::new(status).style(Style::default().bg(Color::DarkGray).fg(Color::White)),
        area,
    );
}
