//! Shared fixtures for integration tests.
#![allow(dead_code)]

pub mod store;

pub use self::store::MemoryStore;

use imprint::{
    models::{Record, RecordId, Value},
    schema::{EntityType, Target, TypeRegistry},
};

/// Record types mirroring a small content site: pages with a parent
/// hierarchy, publishable authors, and plain (non-publishable) sites and
/// change logs.
pub fn registry() -> TypeRegistry {
    let mut types = TypeRegistry::new();

    types.register(EntityType::builder("author")
        .scalar("name")
        .scalar("profile")
        .build());

    types.register(EntityType::builder("site")
        .scalar("title")
        .scalar("domain")
        .build());

    types.register(EntityType::builder("changelog")
        .scalar("message")
        .build());

    types.register(EntityType::builder("flatpage")
        .scalar("url")
        .scalar("title")
        .scalar("content")
        .scalar("enable_comments")
        .scalar("registration_required")
        .links("sites", Target::Plain)
        .build());

    types.register(EntityType::builder("page")
        .scalar("slug")
        .scalar("title")
        .scalar("content")
        .reference("parent", Target::Publishable)
        .links("authors", Target::Publishable)
        .links("log", Target::Plain)
        .exclude("log")
        .build());

    types
}

pub fn store() -> MemoryStore {
    MemoryStore::new(registry())
}

pub fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

/// Create and save a page draft.
pub fn page(store: &mut MemoryStore, slug: &str, title: &str) -> Record {
    let mut record = Record::draft("page");
    record.set_field("slug", text(slug));
    record.set_field("title", text(title));
    record.set_field("content", text(""));
    record.save(store).unwrap();
    record
}

/// Create and save an author draft.
pub fn author(store: &mut MemoryStore, name: &str) -> Record {
    let mut record = Record::draft("author");
    record.set_field("name", text(name));
    record.set_field("profile", text(""));
    record.save(store).unwrap();
    record
}

pub fn id_of(record: &Record) -> RecordId {
    record.id.unwrap()
}
