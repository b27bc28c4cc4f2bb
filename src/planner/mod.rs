//! Field prompt planning: schema fields -> ordered prompts, and collecting answers

pub mod collect;
pub mod descriptor;

pub use collect::{collect_body, collect_params, wire_string, FieldSource};
pub use descriptor::{display_value, plan_body, plan_params, Constraints, InputKind, PromptDescriptor};
