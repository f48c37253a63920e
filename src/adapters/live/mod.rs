//! Live adapters backed by the system clock and random UUIDs.

pub mod clock;
pub mod id_gen;

pub use clock::LiveClock;
pub use id_gen::LiveIdGenerator;
