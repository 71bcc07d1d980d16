//! Change event types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The CRM collections watched for changes.
///
/// This is a closed set known at start-up; the fan-out table must carry an
/// entry for every collection that is actually watched (validated at
/// construction, see [`crate::fanout::FanoutTable`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionId {
    Accounts,
    Contacts,
    Leads,
    Deals,
    Meetings,
    Tasks,
}

impl CollectionId {
    /// All known collections, in declaration order.
    pub const ALL: [CollectionId; 6] = [
        CollectionId::Accounts,
        CollectionId::Contacts,
        CollectionId::Leads,
        CollectionId::Deals,
        CollectionId::Meetings,
        CollectionId::Tasks,
    ];

    /// Returns the wire/storage name of the collection.
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionId::Accounts => "accounts",
            CollectionId::Contacts => "contacts",
            CollectionId::Leads => "leads",
            CollectionId::Deals => "deals",
            CollectionId::Meetings => "meetings",
            CollectionId::Tasks => "tasks",
        }
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of mutation that produced a change event.
///
/// Coalescing is presence-based: the operation is carried for logging and
/// diagnostics but does not influence which namespaces go stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOperation {
    Created,
    Updated,
    Deleted,
}

/// A single change notification received from the change-event source.
///
/// Transient: consumed immediately by the coalescer, never persisted.
/// Delivery from the source is at-least-once and unordered, so nothing
/// here may be treated as exactly-once or sequenced.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub collection: CollectionId,
    pub operation: ChangeOperation,
    pub observed_at: DateTime<Utc>,
}

impl ChangeEvent {
    /// Creates a change event stamped with the current time.
    pub fn new(collection: CollectionId, operation: ChangeOperation) -> Self {
        Self {
            collection,
            operation,
            observed_at: Utc::now(),
        }
    }
}

/// A cache-invalidation unit, coarser than a single record.
///
/// Downstream consumers key cached results by namespace (e.g. a list view
/// or an aggregate-count view). Opaque to this crate beyond equality and
/// ordering; sweeps invalidate namespaces in lexicographic order so runs
/// are reproducible.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Namespace {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_event_serialization() {
        let event = ChangeEvent::new(CollectionId::Contacts, ChangeOperation::Updated);

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"contacts\""));
        assert!(json.contains("\"updated\""));

        let deserialized: ChangeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.collection, CollectionId::Contacts);
        assert_eq!(deserialized.operation, ChangeOperation::Updated);
    }

    #[test]
    fn test_collection_id_names() {
        for collection in CollectionId::ALL {
            assert_eq!(collection.to_string(), collection.as_str());
        }
        assert_eq!(CollectionId::Deals.as_str(), "deals");
    }

    #[test]
    fn test_namespace_ordering_is_lexicographic() {
        let mut namespaces = vec![
            Namespace::from("contacts_view"),
            Namespace::from("accounts_view"),
        ];
        namespaces.sort();
        assert_eq!(namespaces[0].as_str(), "accounts_view");
    }
}
