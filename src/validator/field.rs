//! Recursive checks of one value against its field contract

use serde_json::Value;

use crate::constants::MAX_VALIDATION_DEPTH;
use crate::schema::{full_match, value_kind_name, AdditionalProperties, FieldDef, FieldKind};
use crate::validator::report::ValidationReport;

/// Check `value` at `path`. Every violation is recorded independently.
pub fn validate_value(path: &str, value: &Value, field: &FieldDef, report: &mut ValidationReport) {
    validate_at(path, value, field, 0, report);
}

fn validate_at(path: &str, value: &Value, field: &FieldDef, depth: usize, report: &mut ValidationReport) {
    if depth > MAX_VALIDATION_DEPTH {
        report.add_error(
            path,
            format!("Nesting exceeds {} levels, not checked further", MAX_VALIDATION_DEPTH),
            None,
        );
        return;
    }

    // Type
    if !field.kind.matches(value) {
        report.add_error(
            path,
            format!("Expected {}, got {}", field.kind.as_str(), value_kind_name(value)),
            Some(value),
        );
    }

    // Enum
    if field.has_enum() && !field.enum_values.iter().any(|allowed| values_equal(allowed, value)) {
        report.add_error(
            path,
            format!(
                "Value must be one of {}, got {}",
                Value::Array(field.enum_values.clone()),
                value
            ),
            Some(value),
        );
    }

    match value {
        Value::String(text) => check_string(path, text, value, field, report),
        Value::Number(number) => {
            if let Some(n) = number.as_f64() {
                check_bounds(path, n, value, field, report);
            }
        }
        Value::Object(_) if field.kind == FieldKind::Object => {
            validate_object(path, value, field, depth, report)
        }
        Value::Array(_) if field.kind == FieldKind::Array => {
            validate_array(path, value, field, depth, report)
        }
        _ => {}
    }
}

fn check_string(path: &str, text: &str, value: &Value, field: &FieldDef, report: &mut ValidationReport) {
    if let Some(pattern) = &field.pattern {
        match full_match(pattern, text) {
            Ok(true) => {}
            Ok(false) => {
                report.add_error(path, format!("Value does not match pattern: {}", pattern), Some(value))
            }
            Err(_) => report.add_warning(format!("Invalid pattern for {}: {}", path, pattern)),
        }
    }

    let length = text.chars().count() as u64;
    if let Some(min) = field.min_length {
        if length < min {
            report.add_error(
                path,
                format!("String must be at least {} characters, got {}", min, length),
                Some(value),
            );
        }
    }
    if let Some(max) = field.max_length {
        if length > max {
            report.add_error(
                path,
                format!("String must be at most {} characters, got {}", max, length),
                Some(value),
            );
        }
    }
}

fn check_bounds(path: &str, n: f64, value: &Value, field: &FieldDef, report: &mut ValidationReport) {
    if let Some(minimum) = field.minimum {
        if n < minimum {
            report.add_error(path, format!("Value must be at least {}, got {}", minimum, value), Some(value));
        }
    }
    if let Some(maximum) = field.maximum {
        if n > maximum {
            report.add_error(path, format!("Value must be at most {}, got {}", maximum, value), Some(value));
        }
    }
}

fn validate_object(path: &str, value: &Value, field: &FieldDef, depth: usize, report: &mut ValidationReport) {
    let Some(object) = value.as_object() else {
        return;
    };

    for name in &field.required_props {
        if !object.contains_key(name) {
            report.add_error(format!("{}.{}", path, name), "Required field is missing", None);
        }
    }

    for (name, child) in object {
        let child_path = format!("{}.{}", path, name);
        if let Some(declared) = field.properties.get(name) {
            validate_at(&child_path, child, declared, depth + 1, report);
            continue;
        }

        match &field.additional {
            // Free-form objects take any keys without comment
            AdditionalProperties::Allowed if field.properties.is_empty() => {}
            AdditionalProperties::Allowed => {
                report.add_warning(format!("Unexpected field: {}", child_path));
            }
            AdditionalProperties::Disallowed => {
                report.add_error(child_path, "Additional property not allowed", Some(child));
            }
            AdditionalProperties::Schema(extra) => {
                validate_at(&child_path, child, extra, depth + 1, report);
            }
        }
    }
}

fn validate_array(path: &str, value: &Value, field: &FieldDef, depth: usize, report: &mut ValidationReport) {
    let Some(items) = value.as_array() else {
        return;
    };
    let count = items.len() as u64;

    if let Some(min) = field.min_items {
        if count < min {
            report.add_error(path, format!("Array must have at least {} items, got {}", min, count), None);
        }
    }
    if let Some(max) = field.max_items {
        if count > max {
            report.add_error(path, format!("Array must have at most {} items, got {}", max, count), None);
        }
    }

    if let Some(item_field) = &field.items {
        for (index, item) in items.iter().enumerate() {
            validate_at(&format!("{}[{}]", path, index), item, item_field, depth + 1, report);
        }
    }
}

/// JSON equality where `1` and `1.0` are the same number
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Typed form of a header or query string, guided by the declared kind
pub fn coerce_param(raw: &str, kind: FieldKind) -> Value {
    let text = raw.trim();
    let coerced = match kind {
        FieldKind::Integer => text.parse::<i64>().ok().map(Value::from),
        FieldKind::Number => text
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        FieldKind::Boolean => match text.to_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        FieldKind::Object | FieldKind::Array => serde_json::from_str(text).ok(),
        FieldKind::String => None,
    };
    coerced.unwrap_or_else(|| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn check(value: Value, field: &FieldDef) -> ValidationReport {
        let mut report = ValidationReport::new();
        validate_value("body", &value, field, &mut report);
        report
    }

    fn fields(report: &ValidationReport) -> Vec<&str> {
        report.errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn test_required_property_missing() {
        let schema = FieldDef::new(FieldKind::Object)
            .property("a", FieldDef::new(FieldKind::Integer).required())
            .property("b", FieldDef::new(FieldKind::Integer).required());

        let report = check(json!({"a": 1}), &schema);
        assert_eq!(fields(&report), vec!["body.b"]);
        assert_eq!(report.errors[0].message, "Required field is missing");
    }

    #[test]
    fn test_enum_membership() {
        let field = FieldDef {
            enum_values: vec![json!("x"), json!("y")],
            ..FieldDef::new(FieldKind::String)
        };
        assert_eq!(check(json!("z"), &field).errors.len(), 1);
        assert!(check(json!("x"), &field).is_valid());
        assert!(check(json!("y"), &field).is_valid());

        let numeric = FieldDef {
            enum_values: vec![json!(1), json!(2)],
            ..FieldDef::new(FieldKind::Number)
        };
        assert!(check(json!(1.0), &numeric).is_valid());
    }

    #[test]
    fn test_array_item_counts() {
        let field = FieldDef {
            min_items: Some(2),
            max_items: Some(4),
            ..FieldDef::new(FieldKind::Array).items(FieldDef::new(FieldKind::Integer))
        };

        let too_few = check(json!([1]), &field);
        assert_eq!(too_few.errors.len(), 1);
        assert_eq!(too_few.errors[0].message, "Array must have at least 2 items, got 1");

        let too_many = check(json!([1, 2, 3, 4, 5]), &field);
        assert_eq!(too_many.errors.len(), 1);
        assert_eq!(too_many.errors[0].message, "Array must have at most 4 items, got 5");

        for ok in [json!([1, 2]), json!([1, 2, 3]), json!([1, 2, 3, 4])] {
            assert!(check(ok, &field).is_valid());
        }

        let bad_item = check(json!([1, "two"]), &field);
        assert_eq!(fields(&bad_item), vec!["body[1]"]);
    }

    #[test]
    fn test_independent_string_violations() {
        let field = FieldDef {
            pattern: Some("[a-z]+".into()),
            min_length: Some(5),
            ..FieldDef::new(FieldKind::String)
        };
        let report = check(json!("AB"), &field);
        assert_eq!(report.errors.len(), 2);

        // Full match, not prefix match
        let report = check(json!("abcde1"), &field);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].message, "Value does not match pattern: [a-z]+");
    }

    #[test]
    fn test_numeric_bounds_inclusive() {
        let field = FieldDef {
            minimum: Some(0.0),
            maximum: Some(10.0),
            ..FieldDef::new(FieldKind::Integer)
        };
        assert!(check(json!(0), &field).is_valid());
        assert!(check(json!(10), &field).is_valid());
        assert_eq!(check(json!(11), &field).errors[0].message, "Value must be at most 10, got 11");
        assert_eq!(check(json!(-1), &field).errors.len(), 1);
        assert_eq!(check(json!(2.5), &field).errors[0].message, "Expected integer, got number");
    }

    #[test]
    fn test_additional_properties_policies() {
        let base = FieldDef::new(FieldKind::Object).property("name", FieldDef::new(FieldKind::String));

        let allowed = check(json!({"name": "a", "extra": 1}), &base);
        assert!(allowed.is_valid());
        assert_eq!(allowed.warnings, vec!["Unexpected field: body.extra"]);

        let closed = FieldDef {
            additional: AdditionalProperties::Disallowed,
            ..base.clone()
        };
        let report = check(json!({"name": "a", "extra": 1}), &closed);
        assert_eq!(fields(&report), vec!["body.extra"]);

        let typed = FieldDef {
            additional: AdditionalProperties::Schema(Box::new(FieldDef::new(FieldKind::Integer))),
            ..base
        };
        assert!(check(json!({"name": "a", "n": 1}), &typed).is_valid());
        assert_eq!(fields(&check(json!({"name": "a", "n": "x"}), &typed)), vec!["body.n"]);

        let free_form = check(json!({"anything": true}), &FieldDef::new(FieldKind::Object));
        assert!(free_form.is_valid());
        assert!(free_form.warnings.is_empty());
    }

    #[test]
    fn test_nested_paths() {
        let schema = FieldDef::new(FieldKind::Object).property(
            "user",
            FieldDef::new(FieldKind::Object).property(
                "tags",
                FieldDef::new(FieldKind::Array).items(FieldDef::new(FieldKind::String)),
            ),
        );
        let report = check(json!({"user": {"tags": ["a", 2]}}), &schema);
        assert_eq!(fields(&report), vec!["body.user.tags[1]"]);
    }

    #[test]
    fn test_depth_bound_stops_descent() {
        let mut field = FieldDef::new(FieldKind::Array);
        let mut value = json!([]);
        for _ in 0..(MAX_VALIDATION_DEPTH + 5) {
            field = FieldDef::new(FieldKind::Array).items(field);
            value = json!([value]);
        }

        let report = check(value, &field);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].message.starts_with("Nesting exceeds"));
    }

    #[test]
    fn test_coerce_param() {
        assert_eq!(coerce_param("42", FieldKind::Integer), json!(42));
        assert_eq!(coerce_param("4.2", FieldKind::Integer), json!("4.2"));
        assert_eq!(coerce_param("TRUE", FieldKind::Boolean), json!(true));
        assert_eq!(coerce_param("1.5", FieldKind::Number), json!(1.5));
        assert_eq!(coerce_param("42", FieldKind::String), json!("42"));
    }
}
