//! Colours, JSON highlighting and plain-terminal printing

use crossterm::style::{Color as TermColor, Stylize};
use indexmap::IndexMap;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::http::AssertionResult;
use crate::models::{Collection, Environment, HistoryEntry, HttpMethod, Request, ResponseData};
use crate::schema::{ApiSchema, SchemaSummary};
use crate::validator::ValidationReport;

/// Colour roles shared by the TUI and plain terminal output
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    Key,
    Text,
    Number,
    Literal,
    Punct,
    Plain,
    Good,
    Info,
    Warn,
    Bad,
    Severe,
    Dim,
}

impl Tone {
    pub fn color(self) -> Color {
        match self {
            Tone::Key => Color::Cyan,
            Tone::Text => Color::Green,
            Tone::Number => Color::Yellow,
            Tone::Literal => Color::Magenta,
            Tone::Punct => Color::Yellow,
            Tone::Plain => Color::White,
            Tone::Good => Color::Green,
            Tone::Info => Color::Cyan,
            Tone::Warn => Color::Yellow,
            Tone::Bad => Color::Red,
            Tone::Severe => Color::Magenta,
            Tone::Dim => Color::DarkGray,
        }
    }

    pub fn term_color(self) -> TermColor {
        match self {
            Tone::Key => TermColor::Cyan,
            Tone::Text => TermColor::Green,
            Tone::Number => TermColor::Yellow,
            Tone::Literal => TermColor::Magenta,
            Tone::Punct => TermColor::Yellow,
            Tone::Plain => TermColor::Reset,
            Tone::Good => TermColor::Green,
            Tone::Info => TermColor::Cyan,
            Tone::Warn => TermColor::Yellow,
            Tone::Bad => TermColor::Red,
            Tone::Severe => TermColor::Magenta,
            Tone::Dim => TermColor::DarkGrey,
        }
    }

    pub fn style(self) -> Style {
        Style::default().fg(self.color())
    }
}

/// Status code tone
pub fn status_tone(code: u16) -> Tone {
    match code {
        200..=299 => Tone::Good,
        300..=399 => Tone::Info,
        400..=499 => Tone::Bad,
        500..=599 => Tone::Severe,
        _ => Tone::Warn,
    }
}

/// Status code color
pub fn status_color(code: u16) -> Color {
    status_tone(code).color()
}

/// Method color
pub fn method_color(method: HttpMethod) -> Color {
    match method {
        HttpMethod::GET => Color::Green,
        HttpMethod::POST => Color::Yellow,
        HttpMethod::PUT => Color::Blue,
        HttpMethod::PATCH => Color::Cyan,
        HttpMethod::DELETE => Color::Red,
        HttpMethod::HEAD | HttpMethod::OPTIONS => Color::White,
    }
}

fn method_term_color(method: HttpMethod) -> TermColor {
    match method {
        HttpMethod::GET => TermColor::Green,
        HttpMethod::POST => TermColor::Yellow,
        HttpMethod::PUT => TermColor::Blue,
        HttpMethod::PATCH => TermColor::Cyan,
        HttpMethod::DELETE => TermColor::Red,
        HttpMethod::HEAD | HttpMethod::OPTIONS => TermColor::Reset,
    }
}

/// Split one line of pretty-printed JSON into coloured pieces
pub fn json_tokens(line: &str) -> Vec<(Tone, String)> {
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut plain = String::new();
    let mut i = 0;

    let flush = |plain: &mut String, tokens: &mut Vec<(Tone, String)>| {
        if !plain.is_empty() {
            tokens.push((Tone::Plain, std::mem::take(plain)));
        }
    };

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => {
                flush(&mut plain, &mut tokens);
                let start = i;
                i += 1;
                while i < chars.len() && chars[i] != '"' {
                    // Skip escaped characters
                    if chars[i] == '\\' {
                        i += 1;
                    }
                    i += 1;
                }
                let end = (i + 1).min(chars.len());
                let text: String = chars[start..end].iter().collect();
                let is_key = chars[end..].iter().find(|c| !c.is_whitespace()) == Some(&':');
                tokens.push((if is_key { Tone::Key } else { Tone::Text }, text));
                i = end;
                continue;
            }
            '{' | '}' | '[' | ']' => {
                flush(&mut plain, &mut tokens);
                tokens.push((Tone::Punct, c.to_string()));
            }
            '-' | '0'..='9' => {
                flush(&mut plain, &mut tokens);
                let start = i;
                while i < chars.len() && matches!(chars[i], '-' | '+' | '.' | 'e' | 'E' | '0'..='9') {
                    i += 1;
                }
                tokens.push((Tone::Number, chars[start..i].iter().collect()));
                continue;
            }
            't' | 'f' | 'n' => {
                let rest: String = chars[i..].iter().collect();
                if let Some(word) = ["true", "false", "null"].into_iter().find(|w| rest.starts_with(w)) {
                    flush(&mut plain, &mut tokens);
                    tokens.push((Tone::Literal, word.to_string()));
                    i += word.len();
                    continue;
                }
                plain.push(c);
            }
            _ => plain.push(c),
        }
        i += 1;
    }
    flush(&mut plain, &mut tokens);
    tokens
}

/// Simple JSON syntax highlighting
pub fn highlight_json(text: &str) -> Vec<Line<'static>> {
    text.lines()
        .map(|line| {
            Line::from(
                json_tokens(line)
                    .into_iter()
                    .map(|(tone, piece)| match tone {
                        Tone::Plain => Span::raw(piece),
                        tone => Span::styled(piece, tone.style()),
                    })
                    .collect::<Vec<_>>(),
            )
        })
        .collect()
}

/// Terminal text in a tone
pub fn paint(text: &str, tone: Tone) -> String {
    match tone {
        Tone::Plain => text.to_string(),
        tone => text.with(tone.term_color()).to_string(),
    }
}

fn paint_json(text: &str) -> String {
    text.lines()
        .map(|line| {
            json_tokens(line)
                .iter()
                .map(|(tone, piece)| paint(piece, *tone))
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn paint_method(method: HttpMethod) -> String {
    method.as_str().with(method_term_color(method)).bold().to_string()
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", paint("Error:", Tone::Bad), message);
}

pub fn print_success(message: &str) {
    println!("{}", paint(message, Tone::Good));
}

pub fn print_info(message: &str) {
    println!("{}", paint(message, Tone::Info));
}

/// Request line and headers, as sent
pub fn print_request(request: &Request) {
    println!("{} {}", paint_method(request.method), request.full_url());
    for (key, value) in &request.headers {
        println!("{}", paint(&format!("{}: {}", key, value), Tone::Dim));
    }
    if let Some(body) = &request.body {
        println!("{}", paint(&body.to_text(), Tone::Dim));
    }
    println!();
}

pub fn print_response(response: &ResponseData, show_headers: bool) {
    let tone = status_tone(response.status);
    println!(
        "{} {}  {}",
        paint(&response.status.to_string(), tone),
        paint(&format!("({} ms)", response.elapsed_ms), Tone::Dim),
        response.url
    );

    if show_headers {
        for (key, value) in &response.headers {
            println!("{}: {}", paint(key, Tone::Key), value);
        }
        println!();
    }

    if response.json.is_some() {
        println!("{}", paint_json(&response.display_body()));
    } else {
        println!("{}", response.body);
    }
}

/// Response headers only, as `sextant headers` shows them
pub fn print_headers(headers: &[(String, String)]) {
    if headers.is_empty() {
        print_info("No headers received");
        return;
    }
    let width = headers.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    for (key, value) in headers {
        println!("{}  {}", paint(&format!("{:<width$}", key, width = width), Tone::Key), value);
    }
}

/// Lines for a test run: a verdict, then one line per assertion
pub fn test_result_lines(name: &str, results: &[AssertionResult]) -> Vec<(Tone, String)> {
    let passed = results.iter().all(|r| r.passed);
    let mut lines = vec![if passed {
        (Tone::Good, format!("Test '{}': PASSED", name))
    } else {
        (Tone::Bad, format!("Test '{}': FAILED", name))
    }];
    for result in results {
        lines.push(if result.passed {
            (Tone::Good, format!("  ✓ {}", result.name))
        } else {
            (Tone::Bad, format!("  ✗ {} ({})", result.name, result.detail))
        });
    }
    lines
}

pub fn print_test_results(name: &str, results: &[AssertionResult]) {
    for (tone, text) in test_result_lines(name, results) {
        println!("{}", paint(&text, tone));
    }
}

pub fn print_history(entries: &[HistoryEntry]) {
    if entries.is_empty() {
        print_info("No history yet");
        return;
    }
    for (index, entry) in entries.iter().enumerate() {
        let status = match entry.status {
            Some(code) => paint(&code.to_string(), status_tone(code)),
            None => paint("ERR", Tone::Bad),
        };
        let elapsed = entry
            .elapsed_ms
            .map(|ms| format!("{} ms", ms))
            .unwrap_or_default();
        println!(
            "{:>3}  {}  {:<7} {} {}  {}",
            index + 1,
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            paint_method(entry.method),
            status,
            entry.url,
            paint(&elapsed, Tone::Dim)
        );
    }
}

pub fn print_collections(collections: &IndexMap<String, Collection>) {
    if collections.is_empty() {
        print_info("No saved requests");
        return;
    }
    for (name, collection) in collections {
        let count = collection.requests.len();
        match &collection.description {
            Some(description) => println!("{} ({} requests) - {}", paint(name, Tone::Key), count, description),
            None => println!("{} ({} requests)", paint(name, Tone::Key), count),
        }
        for (request_name, request) in &collection.requests {
            println!("  {:<24} {} {}", request_name, paint_method(request.method), request.url);
        }
    }
}

pub fn print_environments(environments: &IndexMap<String, Environment>) {
    for (name, environment) in environments {
        println!("{}", paint(name, Tone::Key));
        if environment.variables.is_empty() {
            println!("  {}", paint("(no variables)", Tone::Dim));
        }
        for (key, value) in &environment.variables {
            println!("  {} = {}", key, value);
        }
    }
}

pub fn print_schema_summary(summary: &SchemaSummary) {
    println!("{} {}", paint(&summary.title, Tone::Key), paint(&summary.version, Tone::Dim));
    println!("Base URL: {}", summary.base_url);
    let methods: Vec<&str> = summary.methods.iter().map(|m| m.as_str()).collect();
    println!(
        "{} endpoints ({}){}",
        summary.total_endpoints,
        methods.join(", "),
        if summary.has_auth { ", authentication required" } else { "" }
    );
    println!();
}

pub fn print_endpoints(schema: &ApiSchema, method: Option<HttpMethod>) {
    for (method, path) in schema.list_endpoints(method) {
        let summary = schema
            .find_endpoint(method, &path)
            .and_then(|e| e.summary.clone())
            .unwrap_or_default();
        println!("{:<7} {:<40} {}", paint_method(method), path, paint(&summary, Tone::Dim));
    }
}

/// Report as lines of tone-tagged text
pub fn report_lines(report: &ValidationReport) -> Vec<(Tone, String)> {
    let mut lines = Vec::new();
    let summary_tone = if report.is_valid() { Tone::Good } else { Tone::Bad };
    lines.push((summary_tone, report.summary()));

    if !report.errors.is_empty() {
        lines.push((Tone::Plain, String::new()));
        lines.push((Tone::Bad, "Errors:".to_string()));
        for error in &report.errors {
            lines.push((Tone::Plain, format!("  - {}: {}", error.field, error.message)));
            if let Some(value) = &error.value {
                lines.push((Tone::Dim, format!("    Got: {}", value)));
            }
        }
    }

    if !report.warnings.is_empty() {
        lines.push((Tone::Plain, String::new()));
        lines.push((Tone::Warn, "Warnings:".to_string()));
        for warning in &report.warnings {
            lines.push((Tone::Plain, format!("  - {}", warning)));
        }
    }

    if !report.suggestions.is_empty() {
        lines.push((Tone::Plain, String::new()));
        lines.push((Tone::Info, "Suggestions:".to_string()));
        for suggestion in &report.suggestions {
            for (i, text) in suggestion.lines().enumerate() {
                let prefix = if i == 0 { "  - " } else { "    " };
                lines.push((Tone::Plain, format!("{}{}", prefix, text)));
            }
        }
    }

    lines
}

pub fn print_report(report: &ValidationReport) {
    for (tone, text) in report_lines(report) {
        println!("{}", paint(&text, tone));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_result_lines_mark_failures() {
        let results = vec![
            AssertionResult {
                name: "status_code".into(),
                passed: true,
                detail: "expected 200, got 200".into(),
            },
            AssertionResult {
                name: "body_contains".into(),
                passed: false,
                detail: "looking for \"ok\"".into(),
            },
        ];
        assert_eq!(
            test_result_lines("ping", &results),
            vec![
                (Tone::Bad, "Test 'ping': FAILED".to_string()),
                (Tone::Good, "  ✓ status_code".to_string()),
                (Tone::Bad, "  ✗ body_contains (looking for \"ok\")".to_string()),
            ]
        );
        assert_eq!(test_result_lines("ping", &results[..1])[0].0, Tone::Good);
    }

    #[test]
    fn test_json_tokens_classify_keys_and_values() {
        let tokens = json_tokens(r#"  "name": "a \"quoted\" b","#);
        assert_eq!(
            tokens.iter().map(|(t, s)| (*t, s.as_str())).collect::<Vec<_>>(),
            vec![
                (Tone::Plain, "  "),
                (Tone::Key, r#""name""#),
                (Tone::Plain, ": "),
                (Tone::Text, r#""a \"quoted\" b""#),
                (Tone::Plain, ","),
            ]
        );
        assert_eq!(
            json_tokens(r#""n": -1.5e3, "ok": true, "x": null"#)
                .into_iter()
                .filter(|(t, _)| *t != Tone::Plain)
                .map(|(t, _)| t)
                .collect::<Vec<_>>(),
            vec![Tone::Key, Tone::Number, Tone::Key, Tone::Literal, Tone::Key, Tone::Literal]
        );
    }

    #[test]
    fn test_highlight_keeps_text() {
        let text = serde_json::to_string_pretty(&json!({"a": [1, false]})).unwrap();
        let lines = highlight_json(&text);
        assert_eq!(lines.len(), text.lines().count());
        let rebuilt: Vec<String> = lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert_eq!(rebuilt.join("\n"), text);
    }

    #[test]
    fn test_status_tones() {
        assert_eq!(status_tone(204), Tone::Good);
        assert_eq!(status_tone(302), Tone::Info);
        assert_eq!(status_tone(404), Tone::Bad);
        assert_eq!(status_tone(503), Tone::Severe);
        assert_eq!(status_color(100), Color::Yellow);
    }

    #[test]
    fn test_report_lines_sections() {
        let mut report = ValidationReport::new();
        report.add_error("body.a", "Required field is missing", None);
        report.add_suggestion("Example request body: {\n  \"a\": 1\n}");

        let lines = report_lines(&report);
        assert_eq!(lines[0], (Tone::Bad, "Request has 1 validation errors".to_string()));
        assert!(lines.contains(&(Tone::Plain, "  - body.a: Required field is missing".to_string())));
        assert!(lines.contains(&(Tone::Plain, "      \"a\": 1".to_string())));
    }
}
