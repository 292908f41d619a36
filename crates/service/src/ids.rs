//! Identifier generation for new documents.

use uuid::Uuid;

/// Random v4 UUID rendered as a string; collision-free without coordination.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}
