//! ID generator port for naming relay clients.

/// Generates unique identifiers.
///
/// The relay tags every accepted connection with one of these so a sender
/// can be excluded from its own broadcast.
pub trait IdGenerator: Send + Sync {
    /// Generates a new unique identifier string.
    fn generate_id(&self) -> String;
}
