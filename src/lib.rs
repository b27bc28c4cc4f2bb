//! # sextant
//!
//! A terminal HTTP API client that builds requests from OpenAPI schemas.
//!
//! ## Features
//! - Schema loading from files, project directories or running APIs
//! - Field prompt planning: schema fields become ordered, typed prompts
//! - Request validation with errors, warnings and suggestions
//! - Collections, environments with `{{variable}}` substitution, history
//! - cURL import/export
//! - Full-screen interactive request builder
//!
//! ## Layout
//! - `schema` - OpenAPI documents to an endpoint model
//! - `planner` - endpoint fields to prompts, and collecting answers
//! - `validator` - checking a request against an endpoint
//! - `http`, `storage`, `render`, `curl` - sending, persisting, printing
//! - `tui`, `cli` - the two front ends

pub mod auth;
pub mod cli;
pub mod config;
pub mod constants;
pub mod curl;
pub mod http;
pub mod models;
pub mod planner;
pub mod render;
pub mod schema;
pub mod storage;
pub mod tui;
pub mod validator;

// Re-export commonly used types
pub use auth::AuthConfig;
pub use config::Config;
pub use curl::{parse_curl, to_curl};
pub use models::{Body, Collection, Environment, HttpMethod, Request, ResponseData};
pub use planner::{collect_body, collect_params, plan_body, plan_params, FieldSource, PromptDescriptor};
pub use schema::{ApiSchema, EndpointSchema, FieldDef, FieldKind};
pub use validator::{validate_request, RequestParts, ValidationReport};
