//! Contract for the persistence layer.
//!
//! The engine never talks to a database directly; everything it needs from
//! storage is expressed by [`Store`]. Implementations are expected to map
//! these operations onto whatever record storage hosts the content.

use failure::Fail;

use crate::models::{PublishState, Record, RecordId, Value};

/// Narrow interface to record storage.
pub trait Store {
    /// Persist a new record, assigning its identity.
    fn insert(&mut self, record: Record) -> Result<RecordId, StoreError>;

    /// Persist changes to an existing record.
    fn update(&mut self, record: &Record) -> Result<(), StoreError>;

    /// Load a record by its identity.
    fn load(&self, id: RecordId) -> Result<Record, StoreError>;

    /// Delete a record. Deletion semantics for dependents (cascade,
    /// protection) belong to the implementation.
    fn delete(&mut self, id: RecordId) -> Result<(), StoreError>;

    /// All records matching a field predicate query.
    fn find(&self, query: &Query) -> Result<Vec<Record>, StoreError>;

    /// Acquire row-level locks on the given records for the remainder of the
    /// current invocation.
    fn lock_for_update(&mut self, ids: &[RecordId]) -> Result<(), StoreError>;

    /// Compute what a deletion of the given records would remove along with
    /// them, and which records would block it.
    fn deletion_closure(&self, ids: &[RecordId]) -> Result<DeletionClosure, StoreError>;
}

/// A field predicate query.
#[derive(Clone, Debug, Default)]
pub struct Query {
    pub type_name: Option<String>,
    pub is_public: Option<bool>,
    pub publish_state: Option<PublishState>,
    pub fields: Vec<(String, Value)>,
}

impl Query {
    pub fn of_type(type_name: &str) -> Query {
        Query {
            type_name: Some(type_name.to_string()),
            ..Query::default()
        }
    }

    /// All draft records of a type.
    pub fn drafts(type_name: &str) -> Query {
        Query {
            is_public: Some(false),
            ..Query::of_type(type_name)
        }
    }

    /// Drafts with edits not yet mirrored.
    pub fn changed(type_name: &str) -> Query {
        Query {
            publish_state: Some(PublishState::Changed),
            ..Query::drafts(type_name)
        }
    }

    /// All public records of a type.
    pub fn published(type_name: &str) -> Query {
        Query {
            is_public: Some(true),
            ..Query::of_type(type_name)
        }
    }

    /// Public records pending removal.
    pub fn deleted(type_name: &str) -> Query {
        Query {
            publish_state: Some(PublishState::Delete),
            ..Query::published(type_name)
        }
    }

    /// Require `field` to equal `value`.
    pub fn with_field(mut self, field: &str, value: Value) -> Query {
        self.fields.push((field.to_string(), value));
        self
    }

    /// Does `record` satisfy every predicate of this query?
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(ref type_name) = self.type_name {
            if record.type_name != *type_name {
                return false;
            }
        }
        if let Some(is_public) = self.is_public {
            if record.is_public != is_public {
                return false;
            }
        }
        if let Some(publish_state) = self.publish_state {
            if record.publish_state != publish_state {
                return false;
            }
        }
        self.fields.iter()
            .all(|(name, value)| record.fields.get(name) == Some(value))
    }
}

/// Result of a proposed deletion: everything that would go, and everything
/// that stands in the way.
#[derive(Clone, Debug, Default)]
pub struct DeletionClosure {
    pub items: Vec<RecordId>,
    pub protected: Vec<RecordId>,
}

#[derive(Debug, Fail)]
pub enum StoreError {
    /// No record stored under the given identity.
    #[fail(display = "No record {}", _0)]
    NotFound(RecordId),
    /// The record has not been assigned an identity yet.
    #[fail(display = "Record has no identity")]
    Unidentified,
    /// Deletion blocked by a protecting reference.
    #[fail(display = "Record {} is protected from deletion", _0)]
    Protected(RecordId),
}
