//! Utility functions

use uuid::Uuid;

/// Generate a random UUID
pub fn generate_uuid() -> String {
    Uuid::new_v4().to_string()
}

/// Generate a random UUID with a specific prefix
pub fn generate_prefixed_uuid(prefix: &str) -> String {
    format!("{}-{}", prefix, generate_uuid())
}
