//! The publish/unpublish state machine.
//!
//! Publication walks the graph of related drafts and synchronizes each one
//! into its public mirror. A single [`PublishSet`] is threaded through the
//! whole traversal (and through every record of a bulk invocation) so that
//! reference cycles terminate and shared records are processed exactly once.

use std::collections::HashMap;

use failure::Fail;
use itertools::Itertools;

use crate::{
    schema::{FieldKind, Target, TypeRegistry},
    store::{Store, StoreError},
    utils::{NestedItem, NestedSet},
};
use super::record::{PublishState, Record, RecordId, Value};

/// Bookkeeping shared across one publish traversal.
///
/// Tracks every record visited (in discovery order, with the parent it was
/// first reached through) and memoizes the mirror produced for each draft,
/// so a record reached along several paths, or through a cycle, resolves
/// to the same mirror without being reprocessed.
#[derive(Debug, Default)]
pub struct PublishSet {
    discovered: NestedSet<RecordId>,
    mirrors: HashMap<RecordId, RecordId>,
}

impl PublishSet {
    pub fn new() -> PublishSet {
        PublishSet::default()
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.discovered.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.discovered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.discovered.is_empty()
    }

    /// Records in the order they were discovered.
    pub fn iter(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.discovered.iter().copied()
    }

    /// Discovery order grouped by the record each one was reached through.
    pub fn nested(&self) -> Vec<NestedItem<RecordId>> {
        self.discovered.nested()
    }

    /// The mirror already produced for `draft` in this traversal, if any.
    pub fn mirror_of(&self, draft: RecordId) -> Option<RecordId> {
        self.mirrors.get(&draft).copied()
    }

    fn visit(&mut self, id: RecordId, parent: Option<RecordId>) {
        self.discovered.add(id, parent);
    }

    fn record_mirror(&mut self, draft: RecordId, mirror: RecordId) {
        self.mirrors.insert(draft, mirror);
    }
}

impl Record {
    /// Synchronize this draft into its public mirror, publishing related
    /// drafts along the way, and return the mirror's identity.
    ///
    /// Must be called on a saved draft. The mirror is created on first
    /// publication and updated in place afterwards. Scalar and
    /// single-reference fields are only copied when the draft is marked
    /// [`PublishState::Changed`]; link sets are converged on every call, so
    /// membership changes propagate even when the draft itself was not
    /// edited.
    pub fn publish<S>(
        &mut self,
        store: &mut S,
        types: &TypeRegistry,
        set: &mut PublishSet,
    ) -> Result<RecordId, PublishError>
    where
        S: Store,
    {
        self.publish_inner(store, types, set, None)
    }

    fn publish_inner<S>(
        &mut self,
        store: &mut S,
        types: &TypeRegistry,
        set: &mut PublishSet,
        parent: Option<RecordId>,
    ) -> Result<RecordId, PublishError>
    where
        S: Store,
    {
        if self.is_public {
            return Err(PublishError::InvalidState);
        }
        let id = self.id.ok_or(PublishError::NotPersisted)?;

        if let Some(mirror) = set.mirror_of(id) {
            return Ok(mirror);
        }
        set.visit(id, parent);

        let entity_type = types.get(&self.type_name)
            .ok_or_else(|| PublishError::UnknownType(self.type_name.clone()))?;

        debug!("publishing {} {}", self.type_name, id);

        let (mut mirror, mirror_id) = match self.public {
            Some(mirror_id) => (store.load(mirror_id)?, mirror_id),
            None => {
                let mut mirror = Record::mirror_of(self);
                let mirror_id = store.insert(mirror.clone())?;
                mirror.id = Some(mirror_id);
                self.public = Some(mirror_id);
                self.save_preserving_state(store)?;
                (mirror, mirror_id)
            }
        };
        // The mirror is registered before any recursion so that a reference
        // cycle arriving back here resolves to it.
        set.record_mirror(id, mirror_id);

        if self.publish_state == PublishState::Changed {
            for field in entity_type.fields() {
                if entity_type.is_excluded(&field.name) {
                    continue;
                }

                match field.kind {
                    FieldKind::Scalar
                    | FieldKind::Reference { target: Target::Plain, .. } => {
                        match self.fields.get(&field.name) {
                            Some(value) => {
                                mirror.fields.insert(field.name.clone(), value.clone());
                            }
                            None => {
                                mirror.fields.remove(&field.name);
                            }
                        }
                    }
                    FieldKind::Reference { target: Target::Publishable, .. } => {
                        let value = match self.fields.get(&field.name) {
                            Some(&Value::Reference(Some(related))) => {
                                let public =
                                    publish_related(store, types, related, set, Some(id))?;
                                Value::Reference(Some(public))
                            }
                            Some(other) => other.clone(),
                            None => Value::Reference(None),
                        };
                        mirror.fields.insert(field.name.clone(), value);
                    }
                    // Link sets are converged below, on every call.
                    FieldKind::Links { .. } => {}
                }
            }

            mirror.save(store)?;
            self.publish_state = PublishState::Default;
            self.save_preserving_state(store)?;
        }

        let mut links_changed = false;
        for field in entity_type.fields() {
            let target = match field.kind {
                FieldKind::Links { target } => target,
                _ => continue,
            };
            if entity_type.is_excluded(&field.name) {
                continue;
            }

            let linked = self.links(&field.name).to_vec();
            let wanted: Vec<RecordId> = match target {
                Target::Publishable => {
                    let mut mirrors = Vec::with_capacity(linked.len());
                    for related in linked {
                        mirrors.push(publish_related(store, types, related, set, Some(id))?);
                    }
                    mirrors.into_iter().unique().collect()
                }
                Target::Plain => linked.into_iter().unique().collect(),
            };

            let current = mirror.links(&field.name).to_vec();
            let merged = merge_links(&current, &wanted);
            if merged != current {
                mirror.fields.insert(field.name.clone(), Value::References(merged));
                links_changed = true;
            }
        }
        if links_changed {
            mirror.save(store)?;
        }

        Ok(mirror_id)
    }

    /// Compute what publishing this draft would touch, without persisting
    /// anything.
    ///
    /// Performs the same traversal and cycle-avoidance bookkeeping as
    /// [`Record::publish`], accumulating the discovered records (and their
    /// discovery structure) in `set`.
    pub fn publish_dry_run<S>(
        &self,
        store: &S,
        types: &TypeRegistry,
        set: &mut PublishSet,
    ) -> Result<(), PublishError>
    where
        S: Store,
    {
        self.discover(store, types, set, None)
    }

    fn discover<S>(
        &self,
        store: &S,
        types: &TypeRegistry,
        set: &mut PublishSet,
        parent: Option<RecordId>,
    ) -> Result<(), PublishError>
    where
        S: Store,
    {
        if self.is_public {
            return Err(PublishError::InvalidState);
        }
        let id = self.id.ok_or(PublishError::NotPersisted)?;

        if set.contains(id) {
            return Ok(());
        }
        set.visit(id, parent);

        let entity_type = types.get(&self.type_name)
            .ok_or_else(|| PublishError::UnknownType(self.type_name.clone()))?;

        for field in entity_type.fields() {
            if entity_type.is_excluded(&field.name) {
                continue;
            }

            match field.kind {
                FieldKind::Reference { target: Target::Publishable, .. }
                    if self.publish_state == PublishState::Changed =>
                {
                    if let Some(related) = self.reference(&field.name) {
                        if !set.contains(related) {
                            store.load(related)?
                                .discover(store, types, set, Some(id))?;
                        }
                    }
                }
                FieldKind::Links { target: Target::Publishable } => {
                    for &related in self.links(&field.name) {
                        if !set.contains(related) {
                            store.load(related)?
                                .discover(store, types, set, Some(id))?;
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Remove this draft's public mirror.
    ///
    /// Returns the removed mirror, or `None` when the draft was never
    /// published. The draft is saved as changed (it no longer matches any
    /// mirror) and the mirror is deleted through the store, which owns
    /// cascade semantics for its dependents.
    pub fn unpublish<S>(&mut self, store: &mut S) -> Result<Option<Record>, StoreError>
    where
        S: Store,
    {
        let mirror_id = match self.public {
            Some(mirror_id) => mirror_id,
            None => return Ok(None),
        };

        let mirror = match store.load(mirror_id) {
            Ok(mirror) => mirror,
            Err(StoreError::NotFound(_)) => {
                // Stale link; the mirror is already gone.
                self.public = None;
                self.save(store)?;
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        self.public = None;
        self.save(store)?;
        store.delete(mirror_id)?;

        Ok(Some(mirror))
    }

    /// The mirror [`Record::unpublish`] would remove, without mutating
    /// anything.
    pub fn unpublish_dry_run<S>(&self, store: &S) -> Result<Option<Record>, StoreError>
    where
        S: Store,
    {
        match self.public {
            Some(mirror_id) => store.load(mirror_id).map(Some),
            None => Ok(None),
        }
    }

    /// Delete this draft.
    ///
    /// An existing public mirror is not removed; it is marked
    /// [`PublishState::Delete`] and left for a deferred sweep, staying
    /// visible until then.
    pub fn delete<S>(self, store: &mut S) -> Result<(), StoreError>
    where
        S: Store,
    {
        if let Some(mirror_id) = self.public {
            let mut mirror = store.load(mirror_id)?;
            mirror.publish_state = PublishState::Delete;
            mirror.save(store)?;
        }

        match self.id {
            Some(id) => store.delete(id),
            None => Ok(()),
        }
    }

    /// Clear a pending deletion marker.
    ///
    /// Applies to the record itself and, when called on a draft, to its
    /// mirror.
    pub fn undelete<S>(&mut self, store: &mut S) -> Result<(), StoreError>
    where
        S: Store,
    {
        if self.publish_state == PublishState::Delete {
            self.publish_state = PublishState::Default;
            self.save_preserving_state(store)?;
        }

        if let Some(mirror_id) = self.public {
            let mut mirror = store.load(mirror_id)?;
            if mirror.publish_state == PublishState::Delete {
                mirror.publish_state = PublishState::Default;
                mirror.save_preserving_state(store)?;
            }
        }

        Ok(())
    }
}

fn publish_related<S>(
    store: &mut S,
    types: &TypeRegistry,
    id: RecordId,
    set: &mut PublishSet,
    parent: Option<RecordId>,
) -> Result<RecordId, PublishError>
where
    S: Store,
{
    if let Some(mirror) = set.mirror_of(id) {
        return Ok(mirror);
    }
    let mut record = store.load(id)?;
    record.publish_inner(store, types, set, parent)
}

/// Converge a mirror's link set on the published targets: stale links are
/// dropped and new ones appended, while surviving links keep their position.
fn merge_links(current: &[RecordId], wanted: &[RecordId]) -> Vec<RecordId> {
    let mut merged: Vec<RecordId> = current.iter()
        .copied()
        .filter(|id| wanted.contains(id))
        .collect();
    for &id in wanted {
        if !merged.contains(&id) {
            merged.push(id);
        }
    }
    merged
}

#[derive(Debug, Fail)]
pub enum PublishError {
    /// Publish called on a public record.
    #[fail(display = "Cannot publish a public record; publish must be called on a draft")]
    InvalidState,
    /// Publish called on a record that was never saved.
    #[fail(display = "Record must be saved before it can be published")]
    NotPersisted,
    /// The record's type was never registered.
    #[fail(display = "No entity type registered as {}", _0)]
    UnknownType(String),
    /// Storage error.
    #[fail(display = "Store error: {}", _0)]
    Store(#[cause] StoreError),
}

impl_from! { for PublishError ;
    StoreError => PublishError::Store,
}
