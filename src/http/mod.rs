//! Network layer - HTTP request execution

pub mod assertions;
pub mod client;

pub use assertions::{load_assertions, AssertionResult, Assertions};
pub use client::{build_request, create_client, execute};
