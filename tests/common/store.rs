//! In-memory implementation of the persistence contract.

use std::collections::{BTreeMap, HashSet, VecDeque};

use imprint::{
    models::{Record, RecordId, Value},
    schema::{DeleteRule, FieldKind, TypeRegistry},
    store::{DeletionClosure, Query, Store, StoreError},
};
use uuid::Uuid;

pub struct MemoryStore {
    types: TypeRegistry,
    records: BTreeMap<RecordId, Record>,
    /// Ids passed to the most recent `lock_for_update` call.
    pub locked: Vec<RecordId>,
}

impl MemoryStore {
    pub fn new(types: TypeRegistry) -> MemoryStore {
        MemoryStore {
            types,
            records: BTreeMap::new(),
            locked: Vec::new(),
        }
    }

    /// Copy of the full storage state, for before/after comparisons.
    pub fn snapshot(&self) -> BTreeMap<RecordId, Record> {
        self.records.clone()
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

impl Store for MemoryStore {
    fn insert(&mut self, mut record: Record) -> Result<RecordId, StoreError> {
        let id = RecordId(Uuid::new_v4());
        record.id = Some(id);
        self.records.insert(id, record);
        Ok(id)
    }

    fn update(&mut self, record: &Record) -> Result<(), StoreError> {
        let id = record.id.ok_or(StoreError::Unidentified)?;
        if !self.records.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        self.records.insert(id, record.clone());
        Ok(())
    }

    fn load(&self, id: RecordId) -> Result<Record, StoreError> {
        self.records.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    fn delete(&mut self, id: RecordId) -> Result<(), StoreError> {
        let closure = self.deletion_closure(&[id])?;
        if let Some(&blocker) = closure.protected.first() {
            return Err(StoreError::Protected(blocker));
        }

        let gone: HashSet<RecordId> = closure.items.iter().copied().collect();
        for victim in &closure.items {
            self.records.remove(victim);
        }

        // Scrub dangling memberships and references.
        for record in self.records.values_mut() {
            for value in record.fields.values_mut() {
                match value {
                    Value::References(ids) => ids.retain(|id| !gone.contains(id)),
                    Value::Reference(reference) => {
                        if reference.map_or(false, |id| gone.contains(&id)) {
                            *reference = None;
                        }
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }

    fn find(&self, query: &Query) -> Result<Vec<Record>, StoreError> {
        Ok(self.records.values()
            .filter(|record| query.matches(record))
            .cloned()
            .collect())
    }

    fn lock_for_update(&mut self, ids: &[RecordId]) -> Result<(), StoreError> {
        self.locked = ids.to_vec();
        Ok(())
    }

    fn deletion_closure(&self, ids: &[RecordId]) -> Result<DeletionClosure, StoreError> {
        let mut items = Vec::new();
        let mut protected = Vec::new();
        let mut seen = HashSet::new();
        let mut blocked = HashSet::new();
        let mut queue: VecDeque<RecordId> = ids.iter().copied().collect();

        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) || !self.records.contains_key(&id) {
                continue;
            }
            items.push(id);

            for (other_id, other) in &self.records {
                let entity_type = match self.types.get(&other.type_name) {
                    Some(entity_type) => entity_type,
                    None => continue,
                };
                for field in entity_type.fields() {
                    let on_delete = match field.kind {
                        FieldKind::Reference { on_delete, .. } => on_delete,
                        _ => continue,
                    };
                    if other.reference(&field.name) != Some(id) {
                        continue;
                    }
                    match on_delete {
                        DeleteRule::Cascade => queue.push_back(*other_id),
                        DeleteRule::Protect => {
                            if blocked.insert(*other_id) {
                                protected.push(*other_id);
                            }
                        }
                    }
                }
            }
        }

        Ok(DeletionClosure { items, protected })
    }
}
