//! Per-type descriptions of publishable records.
//!
//! Field shapes and exclusion sets are resolved once, when a type is
//! registered, so the publish algorithm never has to inspect values to decide
//! how to copy them.

use std::collections::{HashMap, HashSet};

use crate::config::Config;

/// Fields which are never copied from a draft to its public mirror.
pub const ALWAYS_EXCLUDED: &[&str] = &["id", "is_public", "publish_state", "public"];

/// Whether a related type takes part in the draft/public workflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    /// Related records are themselves published; references are remapped to
    /// their public mirrors.
    Publishable,
    /// Plain related records, shared between drafts and mirrors and copied
    /// as-is.
    Plain,
}

/// What happens to a referencing record when its referent is deleted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteRule {
    Cascade,
    Protect,
}

/// Shape of a single field, fixed at registration time.
#[derive(Clone, Debug)]
pub enum FieldKind {
    /// A plain value, copied verbatim.
    Scalar,
    /// A single reference to another record.
    Reference {
        target: Target,
        on_delete: DeleteRule,
    },
    /// A many-to-many link set.
    Links {
        target: Target,
    },
}

#[derive(Clone, Debug)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
}

/// A registered record type: its fields and its resolved exclusion set.
#[derive(Clone, Debug)]
pub struct EntityType {
    name: String,
    fields: Vec<Field>,
    excluded: HashSet<String>,
}

impl EntityType {
    pub fn builder(name: &str) -> EntityTypeBuilder {
        EntityTypeBuilder {
            name: name.to_string(),
            fields: Vec::new(),
            excluded: ALWAYS_EXCLUDED.iter().map(|f| f.to_string()).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Is `name` excluded from publication for this type?
    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded.contains(name)
    }

    pub fn excluded(&self) -> impl Iterator<Item = &str> {
        self.excluded.iter().map(String::as_str)
    }
}

/// Builds an [`EntityType`], composing its exclusion set explicitly.
///
/// The identity and workflow fields are always excluded.
pub struct EntityTypeBuilder {
    name: String,
    fields: Vec<Field>,
    excluded: HashSet<String>,
}

impl EntityTypeBuilder {
    pub fn scalar(self, name: &str) -> Self {
        self.push(name, FieldKind::Scalar)
    }

    /// A single reference, cascading on deletion of its referent.
    pub fn reference(self, name: &str, target: Target) -> Self {
        self.push_ref(name, target, DeleteRule::Cascade)
    }

    /// A single reference whose referent cannot be deleted while the
    /// reference exists.
    pub fn protected_reference(self, name: &str, target: Target) -> Self {
        self.push_ref(name, target, DeleteRule::Protect)
    }

    /// A many-to-many link set.
    pub fn links(self, name: &str, target: Target) -> Self {
        self.push(name, FieldKind::Links { target })
    }

    /// Never copy `name` during publication.
    pub fn exclude(mut self, name: &str) -> Self {
        self.excluded.insert(name.to_string());
        self
    }

    /// Compose in another type's exclusions.
    pub fn exclude_from(mut self, other: &EntityType) -> Self {
        self.excluded.extend(other.excluded().map(str::to_string));
        self
    }

    pub fn build(self) -> EntityType {
        EntityType {
            name: self.name,
            fields: self.fields,
            excluded: self.excluded,
        }
    }

    fn push(mut self, name: &str, kind: FieldKind) -> Self {
        self.fields.push(Field { name: name.to_string(), kind });
        self
    }

    fn push_ref(self, name: &str, target: Target, on_delete: DeleteRule) -> Self {
        self.push(name, FieldKind::Reference { target, on_delete })
    }
}

/// All registered record types, resolved once at startup.
#[derive(Clone, Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<String, EntityType>,
}

impl TypeRegistry {
    pub fn new() -> TypeRegistry {
        TypeRegistry::default()
    }

    pub fn register(&mut self, entity_type: EntityType) {
        self.types.insert(entity_type.name.clone(), entity_type);
    }

    pub fn get(&self, name: &str) -> Option<&EntityType> {
        self.types.get(name)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Merge configured per-type exclusions into the registry.
    pub fn apply_config(&mut self, config: &Config) {
        for (name, overrides) in &config.types {
            if let Some(entity_type) = self.types.get_mut(name) {
                entity_type.excluded.extend(overrides.exclude.iter().cloned());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_fields_always_excluded() {
        let page = EntityType::builder("page").scalar("title").build();
        for field in ALWAYS_EXCLUDED {
            assert!(page.is_excluded(field));
        }
        assert!(!page.is_excluded("title"));
    }

    #[test]
    fn exclusions_compose_explicitly() {
        let base = EntityType::builder("base").exclude("internal").build();
        let page = EntityType::builder("page")
            .scalar("title")
            .links("log", Target::Plain)
            .exclude("log")
            .exclude_from(&base)
            .build();

        assert!(page.is_excluded("log"));
        assert!(page.is_excluded("internal"));
        assert!(page.is_excluded("publish_state"));
    }
}
