//! Random client identifiers.

use uuid::Uuid;

use crate::ports::IdGenerator;

/// Produces v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveIdGenerator;

impl IdGenerator for LiveIdGenerator {
    fn generate_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
