//! Key events - terminal input mapped to prompt actions

use std::collections::VecDeque;
use std::time::Duration;

use anyhow::{anyhow, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// What a key press means to the prompt on screen
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    Insert(char),
    Paste(String),
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
    Up,
    Down,
    PageUp,
    PageDown,
    Newline,
    Submit,
    /// Esc: leave the field empty
    Skip,
    /// Ctrl+C: end the session
    Abort,
    Yes,
    No,
}

/// Kind of prompt receiving keys
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputContext {
    Line,
    Multiline,
    List,
    YesNo,
    Viewer,
}

/// Map a key press to an action for the given prompt kind
pub fn key_to_action(key: KeyEvent, context: InputContext) -> Option<Action> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        return Some(Action::Abort);
    }
    if key.code == KeyCode::Esc {
        return Some(Action::Skip);
    }

    match context {
        InputContext::Line | InputContext::Multiline => {
            let multiline = context == InputContext::Multiline;
            match key.code {
                KeyCode::Char('d') | KeyCode::Char('s') if ctrl && multiline => Some(Action::Submit),
                KeyCode::Char('u') if ctrl => Some(Action::Home),
                KeyCode::Char(c) if !ctrl => Some(Action::Insert(c)),
                KeyCode::Enter if multiline => Some(Action::Newline),
                KeyCode::Enter => Some(Action::Submit),
                KeyCode::Tab if multiline => Some(Action::Paste("  ".into())),
                KeyCode::Backspace => Some(Action::Backspace),
                KeyCode::Delete => Some(Action::Delete),
                KeyCode::Left => Some(Action::Left),
                KeyCode::Right => Some(Action::Right),
                KeyCode::Home => Some(Action::Home),
                KeyCode::End => Some(Action::End),
                _ => None,
            }
        }
        InputContext::List => match key.code {
            KeyCode::Up | KeyCode::Char('k') => Some(Action::Up),
            KeyCode::Down | KeyCode::Char('j') => Some(Action::Down),
            KeyCode::PageUp => Some(Action::PageUp),
            KeyCode::PageDown => Some(Action::PageDown),
            KeyCode::Home | KeyCode::Char('g') => Some(Action::Home),
            KeyCode::End | KeyCode::Char('G') => Some(Action::End),
            KeyCode::Enter => Some(Action::Submit),
            _ => None,
        },
        InputContext::YesNo => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(Action::Yes),
            KeyCode::Char('n') | KeyCode::Char('N') => Some(Action::No),
            KeyCode::Enter => Some(Action::Submit),
            _ => None,
        },
        InputContext::Viewer => match key.code {
            KeyCode::Up | KeyCode::Char('k') => Some(Action::Up),
            KeyCode::Down | KeyCode::Char('j') => Some(Action::Down),
            KeyCode::PageUp => Some(Action::PageUp),
            KeyCode::PageDown | KeyCode::Char(' ') => Some(Action::PageDown),
            KeyCode::Home | KeyCode::Char('g') => Some(Action::Home),
            KeyCode::End | KeyCode::Char('G') => Some(Action::End),
            KeyCode::Enter | KeyCode::Char('q') => Some(Action::Submit),
            _ => None,
        },
    }
}

/// Where terminal events come from
pub trait EventSource {
    /// Next event, or `None` when nothing arrived in time
    fn next_event(&mut self) -> Result<Option<Event>>;
}

/// Live terminal input, polled every 50ms
pub struct TerminalEvents;

impl EventSource for TerminalEvents {
    fn next_event(&mut self) -> Result<Option<Event>> {
        if event::poll(Duration::from_millis(50))? {
            Ok(Some(event::read()?))
        } else {
            Ok(None)
        }
    }
}

/// Pre-recorded events; fails once they run out
#[derive(Debug, Default)]
pub struct QueuedEvents {
    events: VecDeque<Event>,
}

impl QueuedEvents {
    pub fn new(events: impl IntoIterator<Item = Event>) -> Self {
        QueuedEvents {
            events: events.into_iter().collect(),
        }
    }

    /// Key presses for every character of `text`
    pub fn typed(text: &str) -> Vec<Event> {
        text.chars()
            .map(|c| Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)))
            .collect()
    }

    pub fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    pub fn ctrl(c: char) -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
    }
}

impl EventSource for QueuedEvents {
    fn next_event(&mut self) -> Result<Option<Event>> {
        self.events
            .pop_front()
            .map(Some)
            .ok_or_else(|| anyhow!("Input ended"))
    }
}
