//! Static collection-to-namespace fan-out table.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::errors::ConfigError;
use crate::events::{CollectionId, Namespace};

/// Immutable mapping from a watched collection to the cache namespaces it
/// can affect. Built once at construction and never mutated, so lookups
/// need no locking.
///
/// Construction fails loudly if a watched collection has no entry (or an
/// empty one): a missing fan-out is a configuration error, not something
/// to discover as a silently empty sweep at runtime.
#[derive(Clone, Debug)]
pub struct FanoutTable {
    entries: HashMap<CollectionId, BTreeSet<Namespace>>,
}

impl FanoutTable {
    /// Builds a table from static configuration, validating that every
    /// watched collection fans out to at least one namespace.
    pub fn new(
        watched: &HashSet<CollectionId>,
        entries: HashMap<CollectionId, BTreeSet<Namespace>>,
    ) -> Result<Self, ConfigError> {
        for collection in watched {
            match entries.get(collection) {
                None => return Err(ConfigError::MissingFanout(*collection)),
                Some(namespaces) if namespaces.is_empty() => {
                    return Err(ConfigError::EmptyFanout(*collection))
                }
                Some(_) => {}
            }
        }
        Ok(Self { entries })
    }

    /// The namespaces affected by a change in `collection`, or `None` if
    /// the collection has no entry (possible only for unwatched ones).
    pub fn namespaces_for(&self, collection: CollectionId) -> Option<&BTreeSet<Namespace>> {
        self.entries.get(&collection)
    }

    /// Deduplicated union of the fan-outs for a batch of collections.
    ///
    /// `BTreeSet` keeps the result in lexicographic namespace order, which
    /// is the order sweeps invalidate in.
    pub fn union_for<'a, I>(&self, collections: I) -> BTreeSet<Namespace>
    where
        I: IntoIterator<Item = &'a CollectionId>,
    {
        let mut union = BTreeSet::new();
        for collection in collections {
            if let Some(namespaces) = self.entries.get(collection) {
                union.extend(namespaces.iter().cloned());
            }
        }
        union
    }
}

/// The stock CRM fan-out configuration.
///
/// Contact, lead and deal changes also invalidate the accounts namespace,
/// because account views embed per-account counts of those records.
pub fn crm_default_fanout() -> HashMap<CollectionId, BTreeSet<Namespace>> {
    let view = |names: &[&str]| -> BTreeSet<Namespace> {
        names.iter().map(|n| Namespace::from(*n)).collect()
    };

    HashMap::from([
        (CollectionId::Accounts, view(&["accounts"])),
        (CollectionId::Contacts, view(&["contacts", "accounts"])),
        (CollectionId::Leads, view(&["leads", "accounts"])),
        (CollectionId::Deals, view(&["deals", "accounts"])),
        (CollectionId::Meetings, view(&["meetings"])),
        (CollectionId::Tasks, view(&["tasks"])),
    ])
}
