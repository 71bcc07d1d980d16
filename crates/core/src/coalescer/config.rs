//! Coalescer configuration.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Duration;

use crate::constants::DEFAULT_DEBOUNCE_MS;
use crate::events::{CollectionId, Namespace};
use crate::fanout::crm_default_fanout;

/// Static configuration for an [`InvalidationCoalescer`].
///
/// All three knobs are supplied at construction; there is no runtime
/// reconfiguration. The fan-out map is validated against the watched set
/// when the coalescer is built.
///
/// [`InvalidationCoalescer`]: super::InvalidationCoalescer
#[derive(Clone, Debug)]
pub struct CoalescerConfig {
    /// Collections whose change events feed the coalescer. Events for
    /// anything else are ignored.
    pub watched_collections: HashSet<CollectionId>,

    /// How long after the first event of a batch the sweep fires. Further
    /// events inside the window are absorbed into the same batch.
    pub debounce_window: Duration,

    /// Fan-out from each collection to the namespaces it can affect.
    pub fanout: HashMap<CollectionId, BTreeSet<Namespace>>,
}

impl Default for CoalescerConfig {
    /// Watches every CRM collection with the stock fan-out and a 500 ms
    /// window.
    fn default() -> Self {
        Self {
            watched_collections: CollectionId::ALL.into_iter().collect(),
            debounce_window: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            fanout: crm_default_fanout(),
        }
    }
}
