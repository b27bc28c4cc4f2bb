//! Screen state - what the prompt screen is showing

use ratatui::text::Line;

use crate::render::Tone;

/// Answered prompts kept on screen
const TRANSCRIPT_LIMIT: usize = 500;

/// Text being edited, with a cursor counted in characters
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputBuffer {
    text: String,
    cursor: usize,
}

impl InputBuffer {
    /// Pre-filled buffer with the cursor at the end
    pub fn with_text(text: &str) -> Self {
        InputBuffer {
            text: text.to_string(),
            cursor: text.chars().count(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }

    pub fn insert(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.text.insert(at, c);
        self.cursor += 1;
    }

    pub fn insert_str(&mut self, s: &str) {
        let at = self.byte_index(self.cursor);
        self.text.insert_str(at, s);
        self.cursor += s.chars().count();
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_index(self.cursor);
            self.text.remove(at);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.len() {
            let at = self.byte_index(self.cursor);
            self.text.remove(at);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.len());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.len();
    }

    /// Line and column of the cursor, for multi-line input
    pub fn cursor_row_col(&self) -> (usize, usize) {
        let before: String = self.text.chars().take(self.cursor).collect();
        let row = before.matches('\n').count();
        let col = before
            .rsplit('\n')
            .next()
            .map(|l| l.chars().count())
            .unwrap_or(0);
        (row, col)
    }
}

/// The question currently on screen
#[derive(Clone, Debug, Default, PartialEq)]
pub enum PromptView {
    #[default]
    Idle,
    Text {
        label: String,
        hint: Option<String>,
        input: InputBuffer,
        masked: bool,
        error: Option<String>,
    },
    Choice {
        label: String,
        options: Vec<String>,
        selected: usize,
    },
    Confirm {
        label: String,
        default: bool,
    },
    Json {
        label: String,
        input: InputBuffer,
        error: Option<String>,
    },
}

impl PromptView {
    /// Rows the prompt panel needs, borders included
    pub fn height(&self) -> u16 {
        match self {
            PromptView::Idle | PromptView::Confirm { .. } => 3,
            PromptView::Text { .. } => 4,
            PromptView::Choice { options, .. } => (options.len() as u16 + 2).clamp(3, 12),
            PromptView::Json { input, .. } => (input.text().lines().count() as u16 + 3).clamp(6, 16),
        }
    }
}

/// Full-screen scrollable text, used for reports and responses
#[derive(Clone, Debug, Default)]
pub struct Viewer {
    pub title: Line<'static>,
    pub lines: Vec<Line<'static>>,
    pub scroll: u16,
}

impl Viewer {
    pub fn scroll_by(&mut self, delta: i32) {
        let max = self.lines.len().saturating_sub(1) as i32;
        self.scroll = (self.scroll as i32 + delta).clamp(0, max) as u16;
    }

    pub fn scroll_to_end(&mut self) {
        self.scroll = self.lines.len().saturating_sub(1) as u16;
    }
}

/// Everything the draw pass needs
#[derive(Clone, Debug, Default)]
pub struct ScreenState {
    pub title: String,
    pub transcript: Vec<(Tone, String)>,
    pub prompt: PromptView,
    pub status: String,
    pub viewer: Option<Viewer>,
}

impl ScreenState {
    pub fn new(title: impl Into<String>) -> Self {
        ScreenState {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn note(&mut self, tone: Tone, text: impl Into<String>) {
        self.transcript.push((tone, text.into()));
        if self.transcript.len() > TRANSCRIPT_LIMIT {
            let excess = self.transcript.len() - TRANSCRIPT_LIMIT;
            self.transcript.drain(..excess);
        }
    }
}
