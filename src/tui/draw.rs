//! Drawing the prompt screen

use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;

use crate::models::ResponseData;
use crate::render::{highlight_json, method_color, report_lines, status_color, Tone};
use crate::tui::state::{InputBuffer, PromptView, ScreenState, Viewer};
use crate::validator::ValidationReport;

pub fn draw(f: &mut Frame, state: &ScreenState) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),                   // Title
            Constraint::Min(3),                      // Transcript
            Constraint::Length(state.prompt.height()), // Prompt
            Constraint::Length(1),                   // Status bar
        ])
        .split(area);

    draw_title(f, state, chunks[0]);
    draw_transcript(f, state, chunks[1]);
    draw_prompt(f, &state.prompt, chunks[2]);
    draw_status_bar(f, state, chunks[3]);

    if let Some(viewer) = &state.viewer {
        draw_viewer(f, viewer, area);
    }
}

fn draw_title(f: &mut Frame, state: &ScreenState, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" sextant ", Style::default().fg(Color::Black).bg(Color::Cyan).bold()),
        Span::raw(" "),
        Span::styled(state.title.clone(), Style::default().fg(Color::Gray)),
    ]);
    f.render_widget(Paragraph::new(title), area);
}

fn draw_transcript(f: &mut Frame, state: &ScreenState, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(" Request ");

    let lines: Vec<Line> = state
        .transcript
        .iter()
        .map(|(tone, text)| Line::from(Span::styled(text.as_str(), tone.style())))
        .collect();

    // Keep the newest lines in view
    let visible = area.height.saturating_sub(2) as usize;
    let scroll = lines.len().saturating_sub(visible) as u16;

    let transcript = Paragraph::new(lines).block(block).scroll((scroll, 0));
    f.render_widget(transcript, area);
}

fn draw_prompt(f: &mut Frame, prompt: &PromptView, area: Rect) {
    let focused = Style::default().fg(Color::Yellow);

    match prompt {
        PromptView::Idle => {
            let block = Block::default().borders(Borders::ALL);
            f.render_widget(Paragraph::new("").block(block), area);
        }
        PromptView::Text {
            label,
            hint,
            input,
            masked,
            error,
        } => {
            let mut block = Block::default()
                .borders(Borders::ALL)
                .border_style(focused)
                .title(format!(" {} ", label));
            if let Some(hint) = hint {
                block = block.title_bottom(Line::from(format!(" {} ", hint)).right_aligned());
            }

            let shown = if *masked {
                "*".repeat(input.len())
            } else {
                input.text().to_string()
            };
            let mut lines = vec![Line::from(shown)];
            if let Some(error) = error {
                lines.push(Line::from(Span::styled(error.as_str(), Tone::Bad.style())));
            }
            f.render_widget(Paragraph::new(lines).block(block), area);
            place_cursor(f, input, area);
        }
        PromptView::Choice {
            label,
            options,
            selected,
        } => {
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(focused)
                .title(format!(" {} ", label));
            let items: Vec<ListItem> = options.iter().map(|o| ListItem::new(o.as_str())).collect();
            let list = List::new(items)
                .block(block)
                .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
                .highlight_symbol("> ");
            let mut list_state = ListState::default().with_selected(Some(*selected));
            f.render_stateful_widget(list, area, &mut list_state);
        }
        PromptView::Confirm { label, default } => {
            let choices = if *default { "[Y/n]" } else { "[y/N]" };
            let block = Block::default().borders(Borders::ALL).border_style(focused);
            let line = Line::from(vec![
                Span::raw(format!("{} ", label)),
                Span::styled(choices, Tone::Dim.style()),
            ]);
            f.render_widget(Paragraph::new(line).block(block), area);
        }
        PromptView::Json { label, input, error } => {
            let mut block = Block::default()
                .borders(Borders::ALL)
                .border_style(focused)
                .title(format!(" {} ", label))
                .title_bottom(Line::from(" Ctrl+D: done ").right_aligned());
            if let Some(error) = error {
                block = block.title_bottom(Line::from(Span::styled(format!(" {} ", error), Tone::Bad.style())));
            }

            let (row, _) = input.cursor_row_col();
            let visible = area.height.saturating_sub(2) as usize;
            let scroll = (row + 1).saturating_sub(visible) as u16;

            let editor = Paragraph::new(highlight_json(input.text()))
                .block(block)
                .scroll((scroll, 0));
            f.render_widget(editor, area);

            let (row, col) = input.cursor_row_col();
            let max_x = area.x + area.width.saturating_sub(2);
            let cursor_x = (area.x + col as u16 + 1).min(max_x);
            let cursor_y = area.y + 1 + (row as u16).saturating_sub(scroll);
            f.set_cursor_position(Position::new(cursor_x, cursor_y));
        }
    }
}

fn place_cursor(f: &mut Frame, input: &InputBuffer, area: Rect) {
    let max_x = area.x + area.width.saturating_sub(2);
    let cursor_x = (area.x + input.cursor() as u16 + 1).min(max_x);
    f.set_cursor_position(Position::new(cursor_x, area.y + 1));
}

fn draw_status_bar(f: &mut Frame, state: &ScreenState, area: Rect) {
    let keys = match (&state.viewer, &state.prompt) {
        (Some(_), _) => " ↑/↓ PgUp/PgDn:scroll | Enter/q:close | Ctrl+C:quit ",
        (None, PromptView::Choice { .. }) => " ↑/↓:select | Enter:choose | Esc:skip | Ctrl+C:quit ",
        (None, PromptView::Confirm { .. }) => " y/n | Enter:default | Ctrl+C:quit ",
        (None, PromptView::Json { .. }) => " Enter:newline | Ctrl+D:done | Esc:skip | Ctrl+C:quit ",
        (None, PromptView::Text { .. }) => " Enter:accept | Esc:skip | Ctrl+C:quit ",
        (None, PromptView::Idle) => "",
    };

    let text = if state.status.is_empty() {
        keys.to_string()
    } else {
        format!(" {} ", state.status)
    };

    let bar = Paragraph::new(text).style(Style::default().fg(Color::DarkGray));
    f.render_widget(bar, area);
}

fn draw_viewer(f: &mut Frame, viewer: &Viewer, area: Rect) {
    let position = format!(" {}/{} ", (viewer.scroll as usize + 1).min(viewer.lines.len()), viewer.lines.len());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(viewer.title.clone())
        .title_bottom(Line::from(position).right_aligned())
        .style(Style::default().bg(Color::Black));

    let content = Paragraph::new(viewer.lines.clone())
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((viewer.scroll, 0));

    let inner = Rect {
        x: area.x,
        y: area.y + 1,
        width: area.width,
        height: area.height.saturating_sub(2),
    };
    f.render_widget(Clear, inner);
    f.render_widget(content, inner);
}

/// Viewer title for a response
pub fn response_title(response: &ResponseData) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!(" {} ", response.status),
            Style::default().fg(status_color(response.status)).bold(),
        ),
        Span::styled(
            format!("{} ", response.method),
            Style::default().fg(method_color(response.method)).bold(),
        ),
        Span::raw(format!("{} ", response.url)),
        Span::styled(format!("{}ms ", response.elapsed_ms), Tone::Dim.style()),
    ])
}

/// Response headers followed by the highlighted body
pub fn response_lines(response: &ResponseData) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = response
        .headers
        .iter()
        .map(|(key, value)| {
            Line::from(vec![
                Span::styled(key.clone(), Tone::Key.style()),
                Span::styled(format!(": {}", value), Tone::Dim.style()),
            ])
        })
        .collect();
    if !lines.is_empty() {
        lines.push(Line::default());
    }

    if response.json.is_some() {
        lines.extend(highlight_json(&response.display_body()));
    } else {
        lines.extend(response.body.lines().map(|l| Line::from(l.to_string())));
    }
    lines
}

/// A validation report as styled lines
pub fn report_view(report: &ValidationReport) -> Vec<Line<'static>> {
    report_lines(report)
        .into_iter()
        .map(|(tone, text)| Line::from(Span::styled(text, tone.style())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HttpMethod;
    use pretty_assertions::assert_eq;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn test_draw_text_prompt_and_transcript() {
        let mut state = ScreenState::new("GET /users");
        state.note(Tone::Good, "query.page: 2");
        state.prompt = PromptView::Text {
            label: "token".into(),
            hint: Some("string".into()),
            input: InputBuffer::with_text("secret"),
            masked: true,
            error: Some("token is required".into()),
        };

        let mut terminal = Terminal::new(TestBackend::new(60, 14)).unwrap();
        terminal.draw(|f| draw(f, &state)).unwrap();
        let text = buffer_text(&terminal);

        assert!(text.contains("GET /users"));
        assert!(text.contains("query.page: 2"));
        assert!(text.contains("******"));
        assert!(!text.contains("secret"));
        assert!(text.contains("token is required"));
        assert!(text.contains("Esc:skip"));
    }

    #[test]
    fn test_draw_viewer_over_prompt() {
        let mut state = ScreenState::new("t");
        state.viewer = Some(Viewer {
            title: " Validation ".into(),
            lines: vec![Line::from("Request is valid")],
            scroll: 0,
        });

        let mut terminal = Terminal::new(TestBackend::new(50, 10)).unwrap();
        terminal.draw(|f| draw(f, &state)).unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("Validation"));
        assert!(text.contains("Request is valid"));
        assert!(text.contains("Enter/q:close"));
    }

    #[test]
    fn test_response_lines_put_headers_before_body() {
        let response = ResponseData {
            method: HttpMethod::GET,
            url: "http://localhost/x".into(),
            status: 200,
            headers: vec![("content-type".into(), "application/json".into())],
            body: r#"{"a":1}"#.into(),
            json: Some(serde_json::json!({"a": 1})),
            elapsed_ms: 3,
        };

        let lines: Vec<String> = response_lines(&response).iter().map(|l| l.to_string()).collect();
        assert_eq!(
            lines,
            vec!["content-type: application/json", "", "{", "  \"a\": 1", "}"]
        );
    }
}
