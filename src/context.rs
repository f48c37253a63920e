//! Service context bundling the port trait objects.

use std::fmt;
use std::sync::Arc;

use crate::adapters::live::{LiveClock, LiveIdGenerator};
use crate::ports::{Clock, IdGenerator};

/// Bundles the external boundaries commands depend on.
#[derive(Clone)]
pub struct ServiceContext {
    /// Clock for session timestamps.
    pub clock: Arc<dyn Clock>,
    /// Identifier source for relay clients.
    pub id_gen: Arc<dyn IdGenerator>,
}

impl ServiceContext {
    /// Context backed by the system clock and random UUIDs.
    #[must_use]
    pub fn live() -> Self {
        Self::new(Arc::new(LiveClock), Arc::new(LiveIdGenerator))
    }

    /// Context with caller-supplied adapters.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, id_gen: Arc<dyn IdGenerator>) -> Self {
        Self { clock, id_gen }
    }
}

impl fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceContext").finish_non_exhaustive()
    }
}
