//! Registry of management handlers for record types.

use std::collections::HashMap;

use crate::{
    audit::{self, Actor},
    models::Record,
};

/// Management handler for one record type.
///
/// Handlers answer per-record permission questions and describe records for
/// listings and confirmation previews. Every method has a usable default;
/// implementations override what they need.
pub trait Admin {
    /// May `actor` publish (or unpublish) `record`?
    fn has_publish_permission(&self, _actor: &Actor, _record: &Record) -> bool {
        true
    }

    /// May `actor` delete `record`? Public records can never be deleted
    /// directly; they are removed through unpublication or a deferred sweep.
    fn has_delete_permission(&self, _actor: &Actor, record: &Record) -> bool {
        !record.is_public
    }

    fn has_undelete_permission(&self, actor: &Actor, record: &Record) -> bool {
        self.has_publish_permission(actor, record)
    }

    /// Short human-readable description of a record.
    fn display(&self, record: &Record) -> String {
        match record.id {
            Some(id) => format!("{}: {}", record.type_name, id),
            None => record.type_name.clone(),
        }
    }

    /// Publication status of a record, for listings and previews.
    fn status_label(&self, record: &Record) -> String {
        let state = record.publish_state.label();
        if !record.is_public && record.public.is_none() {
            format!("{} - not yet published", state)
        } else {
            state.to_string()
        }
    }

    /// Record a publication event for `record`.
    fn log_publication(&self, actor: &Actor, record: &Record, message: &str) {
        if let Some(id) = record.id {
            audit::log_actor(*actor, &record.type_name, id, "publish", message);
        }
    }
}

/// Maps record type names to their management handlers.
///
/// Only records of registered types are permission-checked and logged by the
/// bulk actions; unregistered types are published without ceremony.
#[derive(Default)]
pub struct AdminSite {
    handlers: HashMap<String, Box<dyn Admin>>,
}

impl AdminSite {
    pub fn new() -> AdminSite {
        AdminSite::default()
    }

    pub fn register<A>(&mut self, type_name: &str, admin: A)
    where
        A: Admin + 'static,
    {
        self.handlers.insert(type_name.to_string(), Box::new(admin));
    }

    pub fn get(&self, type_name: &str) -> Option<&dyn Admin> {
        self.handlers.get(type_name).map(|admin| &**admin)
    }

    pub fn is_registered(&self, type_name: &str) -> bool {
        self.handlers.contains_key(type_name)
    }
}
