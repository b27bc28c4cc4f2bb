//! Prompt descriptors: what to ask for one field, independent of any UI

use indexmap::IndexMap;
use serde_json::{Number, Value};

use crate::schema::{full_match, FieldDef, FieldKind};

/// How a field is collected
#[derive(Clone, Debug, PartialEq)]
pub enum InputKind {
    /// Pick one of the declared values; `allow_skip` adds a "(skip)" entry
    Choice { options: Vec<Value>, allow_skip: bool },
    /// Yes/no
    Confirm,
    Text,
    /// Text with masked echo
    Password,
    /// Free-form object pasted as JSON
    Json,
    Object { fields: Vec<PromptDescriptor> },
    /// `item` is collected repeatedly
    Array {
        item: Box<PromptDescriptor>,
        min_items: u64,
        max_items: Option<u64>,
    },
}

impl InputKind {
    pub fn as_str(&self) -> &str {
        match self {
            InputKind::Choice { .. } => "choice",
            InputKind::Confirm => "confirm",
            InputKind::Text => "text",
            InputKind::Password => "password",
            InputKind::Json => "json",
            InputKind::Object { .. } => "object",
            InputKind::Array { .. } => "array",
        }
    }
}

/// Checks applied to typed input before it is accepted
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Constraints {
    pub pattern: Option<String>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

impl Constraints {
    fn from_field(field: &FieldDef) -> Self {
        Constraints {
            pattern: field.pattern.clone(),
            min_length: field.min_length,
            max_length: field.max_length,
            minimum: field.minimum,
            maximum: field.maximum,
        }
    }
}

/// One field to collect
#[derive(Clone, Debug, PartialEq)]
pub struct PromptDescriptor {
    /// Location in the request, e.g. `body.user.name` or `query.page`
    pub path: String,
    pub name: String,
    pub label: String,
    pub input: InputKind,
    pub kind: FieldKind,
    pub required: bool,
    pub constraints: Constraints,
    pub default: Option<Value>,
}

/// Plan prompts for a header or query parameter map.
/// Required fields come first, then optional ones, each group by name.
pub fn plan_params(params: &IndexMap<String, FieldDef>, prefix: &str) -> Vec<PromptDescriptor> {
    let mut entries: Vec<(&String, &FieldDef, bool)> = params
        .iter()
        .map(|(name, field)| (name, field, field.required))
        .collect();
    sort_required_first(&mut entries);

    entries
        .into_iter()
        .map(|(name, field, required)| plan_field(name, &format!("{}.{}", prefix, name), field, required))
        .collect()
}

/// Plan prompts for a request body rooted at `body`
pub fn plan_body(body: &FieldDef) -> PromptDescriptor {
    plan_field("body", "body", body, body.required)
}

fn sort_required_first(entries: &mut [(&String, &FieldDef, bool)]) {
    entries.sort_by(|a, b| (!a.2, a.0).cmp(&(!b.2, b.0)));
}

fn plan_field(name: &str, path: &str, field: &FieldDef, required: bool) -> PromptDescriptor {
    let input = if field.has_enum() {
        InputKind::Choice {
            options: field.enum_values.clone(),
            allow_skip: !required,
        }
    } else {
        match field.kind {
            FieldKind::Boolean => InputKind::Confirm,
            FieldKind::Integer | FieldKind::Number => InputKind::Text,
            FieldKind::Object if field.is_free_form() => InputKind::Json,
            FieldKind::Object => {
                let mut entries: Vec<(&String, &FieldDef, bool)> = field
                    .properties
                    .iter()
                    .map(|(name, child)| (name, child, field.required_props.contains(name)))
                    .collect();
                sort_required_first(&mut entries);

                InputKind::Object {
                    fields: entries
                        .into_iter()
                        .map(|(child_name, child, child_required)| {
                            plan_field(child_name, &format!("{}.{}", path, child_name), child, child_required)
                        })
                        .collect(),
                }
            }
            FieldKind::Array => {
                let item_field = field
                    .items
                    .as_deref()
                    .cloned()
                    .unwrap_or_else(|| FieldDef::new(FieldKind::String));
                let min_items = field.min_items.unwrap_or(0);
                InputKind::Array {
                    item: Box::new(plan_field("item", &format!("{}[]", path), &item_field, min_items > 0)),
                    min_items,
                    max_items: field.max_items,
                }
            }
            FieldKind::String if is_secret_name(name) => InputKind::Password,
            FieldKind::String => InputKind::Text,
        }
    };

    PromptDescriptor {
        path: path.to_string(),
        name: name.to_string(),
        label: compose_label(name, required, field.description.as_deref(), field.example.as_ref()),
        input,
        kind: field.kind,
        required,
        constraints: Constraints::from_field(field),
        default: field.default.clone(),
    }
}

fn is_secret_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("password") || lower.contains("secret")
}

/// `name (required) - description [example: X]`
fn compose_label(name: &str, required: bool, description: Option<&str>, example: Option<&Value>) -> String {
    let mut label = name.to_string();
    if required {
        label.push_str(" (required)");
    }
    if let Some(description) = description.filter(|d| !d.is_empty()) {
        label.push_str(" - ");
        label.push_str(description);
    }
    if let Some(example) = example {
        label.push_str(&format!(" [example: {}]", display_value(example)));
    }
    label
}

/// Strings without quotes, everything else as JSON
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl PromptDescriptor {
    /// Text shown as the pre-filled answer
    pub fn default_text(&self) -> String {
        self.default.as_ref().map(display_value).unwrap_or_default()
    }

    /// Descriptor for the `index`th array item, re-rooted at `<array path>[index]`
    pub fn for_item(&self, index: usize, required: bool) -> PromptDescriptor {
        let base = self.path.strip_suffix("[]").unwrap_or(&self.path);
        let mut item = self.rooted_at(&format!("{}[{}]", base, index));
        item.name = format!("item_{}", index);
        item.label = format!("Item #{}", index + 1);
        if required {
            item.label.push_str(" (required)");
        }
        item.required = required;
        if let InputKind::Choice { allow_skip, .. } = &mut item.input {
            *allow_skip = !required;
        }
        item
    }

    fn rooted_at(&self, path: &str) -> PromptDescriptor {
        let mut out = self.clone();
        out.path = path.to_string();
        match &mut out.input {
            InputKind::Object { fields } => {
                for field in fields.iter_mut() {
                    *field = field.rooted_at(&format!("{}.{}", path, field.name));
                }
            }
            InputKind::Array { item, .. } => {
                *item = Box::new(item.rooted_at(&format!("{}[]", path)));
            }
            _ => {}
        }
        out
    }

    /// Accept or reject typed text. Optional fields accept an empty answer.
    pub fn check_input(&self, text: &str) -> Result<(), String> {
        let text = text.trim();
        if text.is_empty() {
            return if self.required {
                Err(format!("{} is required", self.name))
            } else {
                Ok(())
            };
        }

        match self.kind {
            FieldKind::Integer => {
                if !is_integer_text(text) {
                    return Err("Must be a whole number".into());
                }
                self.check_bounds(text)
            }
            FieldKind::Number => {
                if !is_number_text(text) {
                    return Err("Must be a number".into());
                }
                self.check_bounds(text)
            }
            FieldKind::Object if self.input == InputKind::Json => match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(_)) => Ok(()),
                Ok(_) => Err("Must be a JSON object".into()),
                Err(err) => Err(format!("Invalid JSON: {}", err)),
            },
            _ => self.check_text(text),
        }
    }

    fn check_bounds(&self, text: &str) -> Result<(), String> {
        let Ok(value) = text.parse::<f64>() else {
            return Ok(());
        };
        if let Some(minimum) = self.constraints.minimum {
            if value < minimum {
                return Err(format!("Must be at least {}", minimum));
            }
        }
        if let Some(maximum) = self.constraints.maximum {
            if value > maximum {
                return Err(format!("Must be at most {}", maximum));
            }
        }
        Ok(())
    }

    fn check_text(&self, text: &str) -> Result<(), String> {
        let length = text.chars().count() as u64;
        if let Some(min) = self.constraints.min_length {
            if length < min {
                return Err(format!("Must be at least {} characters", min));
            }
        }
        if let Some(max) = self.constraints.max_length {
            if length > max {
                return Err(format!("Must be at most {} characters", max));
            }
        }
        if let Some(pattern) = &self.constraints.pattern {
            // An unusable pattern is reported by the validator, not here
            if let Ok(false) = full_match(pattern, text) {
                return Err(format!("Must match pattern {}", pattern));
            }
        }
        Ok(())
    }

    /// Typed value for accepted text; `None` for an empty answer
    pub fn coerce(&self, text: &str) -> Option<Value> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        match self.kind {
            FieldKind::Integer => text
                .parse::<i64>()
                .map(Value::from)
                .ok()
                .or_else(|| float_value(text)),
            FieldKind::Number => float_value(text),
            FieldKind::Boolean => match text.to_lowercase().as_str() {
                "true" | "yes" | "y" | "1" => Some(Value::Bool(true)),
                "false" | "no" | "n" | "0" => Some(Value::Bool(false)),
                _ => Some(Value::String(text.to_string())),
            },
            FieldKind::Object | FieldKind::Array => serde_json::from_str(text).ok(),
            FieldKind::String => Some(Value::String(text.to_string())),
        }
    }
}

fn float_value(text: &str) -> Option<Value> {
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

/// Optional sign followed by digits
pub fn is_integer_text(text: &str) -> bool {
    let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

pub fn is_number_text(text: &str) -> bool {
    text.parse::<f64>().map(|f| f.is_finite()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn string_field() -> FieldDef {
        FieldDef::new(FieldKind::String)
    }

    #[test]
    fn test_params_required_first_then_by_name() {
        let mut params = IndexMap::new();
        params.insert("zeta".to_string(), string_field());
        params.insert("beta".to_string(), string_field().required());
        params.insert("alpha".to_string(), string_field());
        params.insert("Accept".to_string(), string_field().required());

        let plan = plan_params(&params, "headers");
        let names: Vec<&str> = plan.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Accept", "beta", "alpha", "zeta"]);
        assert_eq!(plan[0].path, "headers.Accept");
    }

    #[test]
    fn test_label_composition_order() {
        let mut field = FieldDef::new(FieldKind::Integer).required();
        field.description = Some("Items per page".into());
        field.example = Some(json!(20));

        let mut params = IndexMap::new();
        params.insert("limit".to_string(), field);
        params.insert("q".to_string(), FieldDef {
            example: Some(json!("shoes")),
            ..string_field()
        });

        let plan = plan_params(&params, "query");
        assert_eq!(plan[0].label, "limit (required) - Items per page [example: 20]");
        assert_eq!(plan[1].label, "q [example: shoes]");
    }

    #[test]
    fn test_input_kind_mapping() {
        let mut params = IndexMap::new();
        params.insert("flag".to_string(), FieldDef::new(FieldKind::Boolean));
        params.insert("X-Client-Secret".to_string(), string_field());
        params.insert("mode".to_string(), FieldDef {
            enum_values: vec![json!("fast"), json!("slow")],
            ..string_field()
        });
        params.insert("count".to_string(), FieldDef::new(FieldKind::Integer));

        let plan = plan_params(&params, "query");
        let by_name = |name: &str| plan.iter().find(|p| p.name == name).unwrap();

        assert_eq!(by_name("flag").input, InputKind::Confirm);
        assert_eq!(by_name("X-Client-Secret").input, InputKind::Password);
        assert_eq!(by_name("count").input, InputKind::Text);
        assert_eq!(
            by_name("mode").input,
            InputKind::Choice {
                options: vec![json!("fast"), json!("slow")],
                allow_skip: true
            }
        );
    }

    #[test]
    fn test_body_plan_nests_objects_and_arrays() {
        let body = FieldDef::new(FieldKind::Object)
            .required()
            .property("tags", FieldDef::new(FieldKind::Array).items(string_field()))
            .property("name", string_field().required())
            .property("meta", FieldDef::new(FieldKind::Object));

        let plan = plan_body(&body);
        assert_eq!(plan.path, "body");
        assert!(plan.required);

        let InputKind::Object { fields } = &plan.input else {
            panic!("expected object plan");
        };
        let paths: Vec<&str> = fields.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["body.name", "body.meta", "body.tags"]);
        assert_eq!(fields[1].input, InputKind::Json);

        let InputKind::Array { item, min_items, max_items } = &fields[2].input else {
            panic!("expected array plan");
        };
        assert_eq!(item.path, "body.tags[]");
        assert_eq!((*min_items, *max_items), (0, None));

        let second = item.for_item(1, false);
        assert_eq!(second.path, "body.tags[1]");
        assert_eq!(second.label, "Item #2");
    }

    #[test]
    fn test_item_rerooting_reaches_nested_children() {
        let item = FieldDef::new(FieldKind::Object).property("sku", string_field().required());
        let body = FieldDef::new(FieldKind::Array).items(item);

        let plan = plan_body(&body);
        let InputKind::Array { item, .. } = &plan.input else {
            panic!("expected array plan");
        };
        let first = item.for_item(0, true);
        let InputKind::Object { fields } = &first.input else {
            panic!("expected object item");
        };
        assert_eq!(fields[0].path, "body[0].sku");
        assert_eq!(first.label, "Item #1 (required)");
    }

    #[test]
    fn test_check_input() {
        let mut params = IndexMap::new();
        params.insert("page".to_string(), FieldDef {
            minimum: Some(1.0),
            ..FieldDef::new(FieldKind::Integer)
        });
        params.insert("ratio".to_string(), FieldDef::new(FieldKind::Number).required());
        params.insert("code".to_string(), FieldDef {
            pattern: Some("[A-Z]{3}".into()),
            ..string_field()
        });
        let plan = plan_params(&params, "query");
        let by_name = |name: &str| plan.iter().find(|p| p.name == name).unwrap();

        let page = by_name("page");
        assert!(page.check_input("").is_ok());
        assert!(page.check_input("12").is_ok());
        assert!(page.check_input("-").is_err());
        assert!(page.check_input("1.5").is_err());
        assert!(page.check_input("0").is_err());
        assert!(page.check_input("+5").is_ok());
        assert!(page.check_input("+").is_err());
        assert!(page.check_input("+-5").is_err());

        let ratio = by_name("ratio");
        assert!(ratio.check_input("").is_err());
        assert!(ratio.check_input("-0.5").is_ok());
        assert!(ratio.check_input("abc").is_err());

        let code = by_name("code");
        assert!(code.check_input("ABC").is_ok());
        assert!(code.check_input("ABCD").is_err());
    }

    #[test]
    fn test_coerce_typed_values() {
        let plan = plan_body(&FieldDef::new(FieldKind::Integer));
        assert_eq!(plan.coerce("42"), Some(json!(42)));
        assert_eq!(plan.coerce("+7"), Some(json!(7)));
        assert_eq!(plan.coerce("  "), None);

        let plan = plan_body(&FieldDef::new(FieldKind::Number));
        assert_eq!(plan.coerce("2.5"), Some(json!(2.5)));
    }
}
