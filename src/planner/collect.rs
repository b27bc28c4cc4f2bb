//! Running a prompt plan against an interactive source

use anyhow::Result;
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::planner::descriptor::{display_value, InputKind, PromptDescriptor};

/// Answers prompts. Implemented by the terminal session and by test scripts.
pub trait FieldSource {
    /// Free text; `None` when the user skipped the field
    fn ask_text(&mut self, prompt: &PromptDescriptor) -> Result<Option<String>>;

    /// One of `options`; `None` when the user picked "(skip)"
    fn ask_choice(&mut self, prompt: &PromptDescriptor, options: &[Value], allow_skip: bool) -> Result<Option<Value>>;

    fn ask_confirm(&mut self, prompt: &PromptDescriptor, default: bool) -> Result<bool>;

    /// Whether to fill in an optional nested object or array at all
    fn ask_include(&mut self, prompt: &PromptDescriptor) -> Result<bool>;

    /// Whether to add item number `count + 1`. When `below_minimum` is set the
    /// array is still short of its minimum and declining means stopping early.
    fn ask_more_items(&mut self, prompt: &PromptDescriptor, count: usize, below_minimum: bool) -> Result<bool>;

    /// A pasted JSON document; `None` when skipped
    fn ask_json(&mut self, prompt: &PromptDescriptor) -> Result<Option<Value>>;
}

/// Collect header or query values as wire strings; skipped fields are left out
pub fn collect_params(source: &mut dyn FieldSource, plan: &[PromptDescriptor]) -> Result<IndexMap<String, String>> {
    let mut values = IndexMap::new();
    for prompt in plan {
        if let Some(value) = collect_value(source, prompt)? {
            values.insert(prompt.name.clone(), wire_string(&value));
        }
    }
    Ok(values)
}

/// Collect a request body; `None` when nothing was entered
pub fn collect_body(source: &mut dyn FieldSource, plan: &PromptDescriptor) -> Result<Option<Value>> {
    collect_value(source, plan)
}

/// Header and query values are always strings on the wire
pub fn wire_string(value: &Value) -> String {
    match value {
        Value::Bool(true) => "true".to_string(),
        Value::Bool(false) => "false".to_string(),
        other => display_value(other),
    }
}

fn collect_value(source: &mut dyn FieldSource, prompt: &PromptDescriptor) -> Result<Option<Value>> {
    match &prompt.input {
        InputKind::Choice { options, allow_skip } => source.ask_choice(prompt, options, *allow_skip),
        InputKind::Confirm => {
            let default = prompt
                .default
                .as_ref()
                .and_then(|d| d.as_bool())
                .unwrap_or(false);
            Ok(Some(Value::Bool(source.ask_confirm(prompt, default)?)))
        }
        InputKind::Text | InputKind::Password => {
            let answer = source.ask_text(prompt)?;
            Ok(answer.and_then(|text| prompt.coerce(&text)))
        }
        InputKind::Json => source.ask_json(prompt),
        InputKind::Object { fields } => {
            if !prompt.required && !source.ask_include(prompt)? {
                return Ok(None);
            }
            let mut object = Map::new();
            for field in fields {
                if let Some(value) = collect_value(source, field)? {
                    object.insert(field.name.clone(), value);
                }
            }
            Ok(Some(Value::Object(object)))
        }
        InputKind::Array { item, min_items, max_items } => {
            if !prompt.required && !source.ask_include(prompt)? {
                return Ok(None);
            }
            collect_array(source, prompt, item, *min_items, *max_items).map(Some)
        }
    }
}

fn collect_array(
    source: &mut dyn FieldSource,
    prompt: &PromptDescriptor,
    item: &PromptDescriptor,
    min_items: u64,
    max_items: Option<u64>,
) -> Result<Value> {
    let mut items = Vec::new();

    while max_items.map(|max| (items.len() as u64) < max).unwrap_or(true) {
        let below_minimum = (items.len() as u64) < min_items;
        if !source.ask_more_items(prompt, items.len(), below_minimum)? {
            break;
        }

        let item_prompt = item.for_item(items.len(), below_minimum);
        match collect_value(source, &item_prompt)? {
            Some(value) => items.push(value),
            None if below_minimum => continue,
            None => break,
        }
    }

    Ok(Value::Array(items))
}
