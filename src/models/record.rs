use std::collections::BTreeMap;
use std::fmt;

use uuid::Uuid;

use crate::store::{Store, StoreError};

/// Identity of a stored record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub Uuid);

impl fmt::Display for RecordId {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(fmt)
    }
}

/// Where a draft stands relative to its public mirror.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishState {
    /// Draft matches its mirror, or has none and is unmodified.
    Default,
    /// Draft has edits not yet mirrored.
    Changed,
    /// Public record pending removal; its draft was deleted.
    Delete,
}

impl PublishState {
    pub fn label(&self) -> &'static str {
        match *self {
            PublishState::Default => "Default",
            PublishState::Changed => "Changed",
            PublishState::Delete => "Delete",
        }
    }
}

impl Default for PublishState {
    fn default() -> PublishState {
        PublishState::Default
    }
}

/// A field value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Value {
    Bool(bool),
    Integer(i64),
    Text(String),
    /// A single reference to another record.
    Reference(Option<RecordId>),
    /// A many-to-many link set.
    References(Vec<RecordId>),
}

/// A persisted content record, either a draft or a public mirror.
///
/// The concrete shape of `fields` is described by the record type's
/// [`EntityType`](crate::schema::EntityType) registration.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Record {
    /// Identity, assigned by the store on first save.
    pub id: Option<RecordId>,
    pub type_name: String,
    /// True for the published mirror, false for the draft. Fixed at
    /// creation.
    pub is_public: bool,
    pub publish_state: PublishState,
    /// Draft-side link to the public mirror.
    pub public: Option<RecordId>,
    pub fields: BTreeMap<String, Value>,
}

impl Record {
    /// Create a new, unsaved draft.
    pub fn draft(type_name: &str) -> Record {
        Record {
            id: None,
            type_name: type_name.to_string(),
            is_public: false,
            publish_state: PublishState::Default,
            public: None,
            fields: BTreeMap::new(),
        }
    }

    pub(crate) fn mirror_of(draft: &Record) -> Record {
        Record {
            id: None,
            type_name: draft.type_name.clone(),
            is_public: true,
            publish_state: PublishState::Default,
            public: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn set_field<N>(&mut self, name: N, value: Value)
    where
        N: Into<String>,
    {
        self.fields.insert(name.into(), value);
    }

    /// The single reference stored under `name`, if any.
    pub fn reference(&self, name: &str) -> Option<RecordId> {
        match self.fields.get(name) {
            Some(Value::Reference(id)) => *id,
            _ => None,
        }
    }

    /// The link set stored under `name`.
    pub fn links(&self, name: &str) -> &[RecordId] {
        match self.fields.get(name) {
            Some(Value::References(ids)) => ids,
            _ => &[],
        }
    }

    /// Persist this record, transitioning a draft to
    /// [`PublishState::Changed`].
    ///
    /// This is the ordinary save: a draft edited and saved no longer matches
    /// its mirror. Public records keep their state.
    pub fn save<S>(&mut self, store: &mut S) -> Result<(), StoreError>
    where
        S: Store,
    {
        if !self.is_public {
            self.publish_state = PublishState::Changed;
        }
        self.persist(store)
    }

    /// Persist this record exactly as it is, without touching its publish
    /// state.
    ///
    /// Used by the publish machinery after a sync, so the draft is not
    /// immediately re-marked as changed.
    pub fn save_preserving_state<S>(&mut self, store: &mut S) -> Result<(), StoreError>
    where
        S: Store,
    {
        self.persist(store)
    }

    fn persist<S>(&mut self, store: &mut S) -> Result<(), StoreError>
    where
        S: Store,
    {
        match self.id {
            Some(_) => store.update(self),
            None => {
                self.id = Some(store.insert(self.clone())?);
                Ok(())
            }
        }
    }
}
