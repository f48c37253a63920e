//! Port traits defining external boundaries.
//!
//! Time and identifier generation are the only nondeterministic inputs the
//! relay and session recorder depend on. Implementations live in
//! `src/adapters/`.

pub mod clock;
pub mod id_gen;

pub use clock::Clock;
pub use id_gen::IdGenerator;
