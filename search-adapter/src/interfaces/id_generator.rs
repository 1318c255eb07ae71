//! Identifier source trait.

/// Produces identifiers for documents whose caller omitted one.
///
/// Each call must return a fresh identifier; implementations are shared
/// across concurrent operations and need no coordination beyond `Sync`.
pub trait IdGenerator: Send + Sync {
    /// Return a new, never-before-returned identifier.
    fn generate(&self) -> String;
}
