//! Full-screen interactive session
//!
//! The screen is a `FieldSource`: the planner decides what to ask, the
//! screen asks it one prompt at a time and keeps a transcript of answers.

pub mod draw;
pub mod events;
pub mod session;
pub mod state;

use std::io::{self, Stdout};

use anyhow::{anyhow, Result};
use crossterm::event::{DisableBracketedPaste, EnableBracketedPaste, Event};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::text::Line;
use ratatui::Terminal;
use serde_json::Value;

use crate::planner::{display_value, FieldSource, InputKind, PromptDescriptor};
use crate::render::Tone;
use events::{key_to_action, Action, EventSource, InputContext, TerminalEvents};
use state::{InputBuffer, PromptView, ScreenState, Viewer};

pub use session::{run_session, Session};

/// Why a session stopped early
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session aborted")]
    Aborted,
}

/// Terminal cleanup guard
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableBracketedPaste, LeaveAlternateScreen);
    }
}

/// Take over the terminal and run a session until it ends or is aborted
pub async fn run(session: &Session<'_>, title: &str) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let _guard = TerminalGuard;

    let terminal: Terminal<CrosstermBackend<Stdout>> = Terminal::new(CrosstermBackend::new(stdout))?;
    let mut screen = Screen::new(terminal, TerminalEvents, title);

    match run_session(&mut screen, session).await {
        Err(err) if matches!(err.downcast_ref::<SessionError>(), Some(SessionError::Aborted)) => {
            tracing::info!("Interactive session aborted");
            Ok(())
        }
        other => other,
    }
}

/// Prompt screen over any backend and event source
pub struct Screen<B: Backend, E: EventSource> {
    terminal: Terminal<B>,
    events: E,
    pub state: ScreenState,
}

impl<B: Backend, E: EventSource> Screen<B, E> {
    pub fn new(terminal: Terminal<B>, events: E, title: &str) -> Self {
        Screen {
            terminal,
            events,
            state: ScreenState::new(title),
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.state.title = title.into();
    }

    pub fn note(&mut self, tone: Tone, text: impl Into<String>) {
        self.state.note(tone, text);
    }

    /// Show a status message and draw immediately
    pub fn busy(&mut self, status: impl Into<String>) -> Result<()> {
        self.state.prompt = PromptView::Idle;
        self.state.status = status.into();
        self.redraw()
    }

    fn redraw(&mut self) -> Result<()> {
        let state = &self.state;
        self.terminal.draw(|f| draw::draw(f, state))?;
        Ok(())
    }

    /// Draw, then wait for the next key that means something here
    fn next_action(&mut self, context: InputContext) -> Result<Action> {
        self.state.status.clear();
        loop {
            self.redraw()?;
            match self.events.next_event()? {
                Some(Event::Key(key)) => {
                    if let Some(action) = key_to_action(key, context) {
                        if action == Action::Abort {
                            return Err(SessionError::Aborted.into());
                        }
                        return Ok(action);
                    }
                }
                Some(Event::Paste(text)) => return Ok(Action::Paste(text)),
                _ => {}
            }
        }
    }

    /// One line of text. `None` when skipped with Esc.
    pub fn read_line(
        &mut self,
        label: &str,
        hint: Option<String>,
        initial: &str,
        masked: bool,
        check: impl Fn(&str) -> Result<(), String>,
    ) -> Result<Option<String>> {
        self.state.prompt = PromptView::Text {
            label: label.to_string(),
            hint,
            input: InputBuffer::with_text(initial),
            masked,
            error: None,
        };

        loop {
            let action = self.next_action(InputContext::Line)?;
            let PromptView::Text { input, error, .. } = &mut self.state.prompt else {
                return Err(anyhow!("Prompt changed while reading"));
            };
            match action {
                Action::Insert(c) => input.insert(c),
                Action::Paste(text) => input.insert_str(&text.replace(['\r', '\n'], "")),
                Action::Backspace => input.backspace(),
                Action::Delete => input.delete(),
                Action::Left => input.left(),
                Action::Right => input.right(),
                Action::Home => input.home(),
                Action::End => input.end(),
                Action::Skip => {
                    self.finish(Tone::Dim, format!("{}: (skipped)", label));
                    return Ok(None);
                }
                Action::Submit => {
                    let text = input.text().trim().to_string();
                    match check(&text) {
                        Ok(()) => {
                            let shown = if masked { "*".repeat(text.chars().count()) } else { text.clone() };
                            self.finish(Tone::Plain, format!("{}: {}", label, shown));
                            return Ok(Some(text));
                        }
                        Err(message) => *error = Some(message),
                    }
                }
                _ => {}
            }
        }
    }

    /// Pick one option. With `allow_skip` a "(skip)" entry is added at the end.
    pub fn pick(&mut self, label: &str, options: &[String], allow_skip: bool, selected: usize) -> Result<Option<usize>> {
        let mut shown = options.to_vec();
        if allow_skip {
            shown.push("(skip)".to_string());
        }
        if shown.is_empty() {
            return Ok(None);
        }
        let last = shown.len() - 1;
        self.state.prompt = PromptView::Choice {
            label: label.to_string(),
            options: shown,
            selected: selected.min(last),
        };

        loop {
            let action = self.next_action(InputContext::List)?;
            let PromptView::Choice { selected, .. } = &mut self.state.prompt else {
                return Err(anyhow!("Prompt changed while reading"));
            };
            match action {
                Action::Up => *selected = selected.saturating_sub(1),
                Action::Down => *selected = (*selected + 1).min(last),
                Action::PageUp => *selected = selected.saturating_sub(10),
                Action::PageDown => *selected = (*selected + 10).min(last),
                Action::Home => *selected = 0,
                Action::End => *selected = last,
                Action::Submit if *selected < options.len() => {
                    let index = *selected;
                    self.finish(Tone::Plain, format!("{}: {}", label, options[index]));
                    return Ok(Some(index));
                }
                Action::Submit | Action::Skip => {
                    self.finish(Tone::Dim, format!("{}: (skipped)", label));
                    return Ok(None);
                }
                _ => {}
            }
        }
    }

    /// Yes or no; Enter and Esc take the default
    pub fn confirm(&mut self, label: &str, default: bool) -> Result<bool> {
        self.state.prompt = PromptView::Confirm {
            label: label.to_string(),
            default,
        };

        let answer = loop {
            match self.next_action(InputContext::YesNo)? {
                Action::Yes => break true,
                Action::No => break false,
                Action::Submit | Action::Skip => break default,
                _ => {}
            }
        };
        self.finish(Tone::Plain, format!("{} {}", label, if answer { "yes" } else { "no" }));
        Ok(answer)
    }

    /// Multi-line JSON. `None` when skipped with Esc or left empty.
    pub fn read_json(&mut self, label: &str, check: impl Fn(&str) -> Result<(), String>) -> Result<Option<Value>> {
        self.state.prompt = PromptView::Json {
            label: label.to_string(),
            input: InputBuffer::default(),
            error: None,
        };

        loop {
            let action = self.next_action(InputContext::Multiline)?;
            let PromptView::Json { input, error, .. } = &mut self.state.prompt else {
                return Err(anyhow!("Prompt changed while reading"));
            };
            match action {
                Action::Insert(c) => input.insert(c),
                Action::Paste(text) => input.insert_str(&text.replace("\r\n", "\n").replace('\r', "\n")),
                Action::Newline => input.insert('\n'),
                Action::Backspace => input.backspace(),
                Action::Delete => input.delete(),
                Action::Left => input.left(),
                Action::Right => input.right(),
                Action::Home => input.home(),
                Action::End => input.end(),
                Action::Skip => {
                    self.finish(Tone::Dim, format!("{}: (skipped)", label));
                    return Ok(None);
                }
                Action::Submit => {
                    let text = input.text().trim().to_string();
                    if text.is_empty() {
                        self.finish(Tone::Dim, format!("{}: (skipped)", label));
                        return Ok(None);
                    }
                    if let Err(message) = check(&text) {
                        *error = Some(message);
                        continue;
                    }
                    match serde_json::from_str::<Value>(&text) {
                        Ok(value) => {
                            self.finish(Tone::Plain, format!("{}: {}", label, value));
                            return Ok(Some(value));
                        }
                        Err(err) => *error = Some(format!("Invalid JSON: {}", err)),
                    }
                }
                _ => {}
            }
        }
    }

    /// Full-screen scrollable view until closed
    pub fn view(&mut self, title: impl Into<Line<'static>>, lines: Vec<Line<'static>>) -> Result<()> {
        self.state.prompt = PromptView::Idle;
        self.state.viewer = Some(Viewer {
            title: title.into(),
            lines,
            scroll: 0,
        });

        let result = loop {
            let action = match self.next_action(InputContext::Viewer) {
                Ok(action) => action,
                Err(err) => break Err(err),
            };
            let Some(viewer) = self.state.viewer.as_mut() else {
                break Ok(());
            };
            match action {
                Action::Up => viewer.scroll_by(-1),
                Action::Down => viewer.scroll_by(1),
                Action::PageUp => viewer.scroll_by(-20),
                Action::PageDown => viewer.scroll_by(20),
                Action::Home => viewer.scroll = 0,
                Action::End => viewer.scroll_to_end(),
                Action::Submit | Action::Skip => break Ok(()),
                _ => {}
            }
        };
        self.state.viewer = None;
        result
    }

    fn finish(&mut self, tone: Tone, line: String) {
        self.state.prompt = PromptView::Idle;
        self.state.note(tone, line);
    }
}

/// Short type and constraint summary shown under a prompt
fn hint_for(prompt: &PromptDescriptor) -> Option<String> {
    let mut parts = vec![prompt.kind.as_str().to_string()];
    let c = &prompt.constraints;
    match (c.minimum, c.maximum) {
        (Some(min), Some(max)) => parts.push(format!("{}..{}", min, max)),
        (Some(min), None) => parts.push(format!(">= {}", min)),
        (None, Some(max)) => parts.push(format!("<= {}", max)),
        (None, None) => {}
    }
    match (c.min_length, c.max_length) {
        (Some(min), Some(max)) => parts.push(format!("{}-{} chars", min, max)),
        (Some(min), None) => parts.push(format!("min {} chars", min)),
        (None, Some(max)) => parts.push(format!("max {} chars", max)),
        (None, None) => {}
    }
    if let Some(pattern) = &c.pattern {
        parts.push(format!("/{}/", pattern));
    }
    Some(parts.join(", "))
}

impl<B: Backend, E: EventSource> FieldSource for Screen<B, E> {
    fn ask_text(&mut self, prompt: &PromptDescriptor) -> Result<Option<String>> {
        let masked = prompt.input == InputKind::Password;
        let answer = self.read_line(
            &prompt.label,
            hint_for(prompt),
            &prompt.default_text(),
            masked,
            |text| prompt.check_input(text),
        )?;
        Ok(answer.filter(|text| !text.is_empty()))
    }

    fn ask_choice(&mut self, prompt: &PromptDescriptor, options: &[Value], allow_skip: bool) -> Result<Option<Value>> {
        let labels: Vec<String> = options.iter().map(display_value).collect();
        let selected = prompt
            .default
            .as_ref()
            .and_then(|d| options.iter().position(|o| o == d))
            .unwrap_or(0);
        let index = self.pick(&prompt.label, &labels, allow_skip, selected)?;
        Ok(index.map(|i| options[i].clone()))
    }

    fn ask_confirm(&mut self, prompt: &PromptDescriptor, default: bool) -> Result<bool> {
        self.confirm(&format!("{}?", prompt.label), default)
    }

    fn ask_include(&mut self, prompt: &PromptDescriptor) -> Result<bool> {
        self.confirm(&format!("Fill in {}?", prompt.label), false)
    }

    fn ask_more_items(&mut self, prompt: &PromptDescriptor, count: usize, below_minimum: bool) -> Result<bool> {
        let label = if below_minimum {
            format!("Add item #{} to {} (more required)?", count + 1, prompt.label)
        } else {
            format!("Add item #{} to {}?", count + 1, prompt.label)
        };
        self.confirm(&label, below_minimum)
    }

    fn ask_json(&mut self, prompt: &PromptDescriptor) -> Result<Option<Value>> {
        self.read_json(&format!("{} (JSON)", prompt.label), |text| prompt.check_input(text))
    }
}
