//! Bulk publish/unpublish actions.
//!
//! Each action first runs a non-mutating discovery pass over the whole
//! selected batch, then an aggregate permission check over everything
//! discovered, and only once the caller has confirmed, an atomic commit.
//! Before confirmation the action returns a [`Preview`] for the caller to
//! render; an outstanding permission failure at commit time rejects the
//! whole batch.

use failure::Fail;

use crate::{
    admin::AdminSite,
    audit::Actor,
    models::{PublishError, PublishSet, Record, RecordId},
    schema::TypeRegistry,
    store::{Store, StoreError},
    utils::NestedItem,
};

/// Result of invoking a bulk action.
#[derive(Debug)]
pub enum Outcome {
    /// Nothing was mutated; the caller must render the preview and invoke
    /// the action again with confirmation.
    NeedsConfirmation(Preview),
    /// The action was committed; `count` is the number of selected records
    /// acted on.
    Done { count: usize },
}

/// Structured context for a confirmation page.
#[derive(Debug, Serialize)]
pub struct Preview {
    pub title: String,
    /// Records the action would touch, in discovery structure.
    pub items: Vec<PreviewItem>,
    /// Records the actor may not act on.
    pub perms_lacking: Vec<PreviewItem>,
    /// Records whose dependents block the action.
    pub protected: Vec<PreviewItem>,
}

#[derive(Debug, Serialize)]
pub struct PreviewItem {
    pub id: RecordId,
    pub type_name: String,
    pub text: String,
    pub children: Vec<PreviewItem>,
}

/// Publish a batch of drafts.
///
/// Discovers the transitive closure of records the publication would touch,
/// checks the actor's permission over every discovered record with a
/// registered handler, and either returns a preview (`confirmed == false`)
/// or commits the whole batch. Any outstanding permission failure at commit
/// rejects the batch; nothing is partially published.
pub fn publish_selected<S>(
    store: &mut S,
    types: &TypeRegistry,
    site: &AdminSite,
    actor: &Actor,
    batch: &[RecordId],
    confirmed: bool,
) -> Result<Outcome, ActionError>
where
    S: Store,
{
    store.lock_for_update(batch)?;

    let mut discovered = PublishSet::new();
    for &id in batch.iter() {
        let record = store.load(id)?;
        record.publish_dry_run(store, types, &mut discovered)?;
    }

    let perms_needed = check_permissions(store, site, actor, discovered.iter())?;

    if !confirmed {
        return Ok(Outcome::NeedsConfirmation(Preview {
            title: "Publish?".to_string(),
            items: nested_preview(store, site, &discovered.nested())?,
            perms_lacking: flat_preview(store, site, &perms_needed)?,
            protected: Vec::new(),
        }));
    }

    if !perms_needed.is_empty() {
        return Err(ActionError::PermissionDenied(perms_needed));
    }

    for id in discovered.iter() {
        let record = store.load(id)?;
        if let Some(admin) = site.get(&record.type_name) {
            admin.log_publication(actor, &record, "Published");
        }
    }

    let mut set = PublishSet::new();
    for &id in batch.iter() {
        let mut record = store.load(id)?;
        record.publish(store, types, &mut set)?;
    }

    info!("published {} records ({} including related)", batch.len(), set.len());

    Ok(Outcome::Done { count: batch.len() })
}

/// Remove the public mirrors of a batch of drafts.
///
/// Mirrors are discovered per draft; the store's deletion closure supplies
/// the dependents that would disappear with them, and records protecting a
/// mirror from deletion block the whole batch, as do permission failures.
pub fn unpublish_selected<S>(
    store: &mut S,
    site: &AdminSite,
    actor: &Actor,
    batch: &[RecordId],
    confirmed: bool,
) -> Result<Outcome, ActionError>
where
    S: Store,
{
    store.lock_for_update(batch)?;

    let mut mirrors = Vec::new();
    for &id in batch.iter() {
        let record = store.load(id)?;
        if let Some(mirror) = record.unpublish_dry_run(store)? {
            mirrors.push(mirror);
        }
    }

    let mirror_ids: Vec<RecordId> = mirrors.iter().filter_map(|m| m.id).collect();
    let closure = store.deletion_closure(&mirror_ids)?;

    let mut perms_needed = Vec::new();
    for mirror in &mirrors {
        if let Some(admin) = site.get(&mirror.type_name) {
            if !admin.has_publish_permission(actor, mirror) {
                perms_needed.extend(mirror.id);
            }
        }
    }

    if !confirmed {
        let title = if perms_needed.is_empty() && closure.protected.is_empty() {
            "Are you sure?"
        } else {
            "Cannot unpublish"
        };
        return Ok(Outcome::NeedsConfirmation(Preview {
            title: title.to_string(),
            items: flat_preview(store, site, &closure.items)?,
            perms_lacking: flat_preview(store, site, &perms_needed)?,
            protected: flat_preview(store, site, &closure.protected)?,
        }));
    }

    if !perms_needed.is_empty() {
        return Err(ActionError::PermissionDenied(perms_needed));
    }
    if !closure.protected.is_empty() {
        return Err(ActionError::Protected(closure.protected));
    }

    let mut count = 0;
    for &id in batch.iter() {
        let mut record = store.load(id)?;
        if let Some(mirror) = record.unpublish(store)? {
            if let Some(admin) = site.get(&mirror.type_name) {
                admin.log_publication(actor, &mirror, "Unpublished");
            }
            count += 1;
        }
    }

    Ok(Outcome::Done { count })
}

/// Delete a batch of drafts, marking their mirrors for deferred removal.
///
/// Every record is permission-checked up front; a single failure rejects
/// the whole batch.
pub fn delete_selected<S>(
    store: &mut S,
    site: &AdminSite,
    actor: &Actor,
    batch: &[RecordId],
) -> Result<usize, ActionError>
where
    S: Store,
{
    store.lock_for_update(batch)?;

    let mut records = Vec::with_capacity(batch.len());
    for &id in batch.iter() {
        records.push(store.load(id)?);
    }

    let denied: Vec<RecordId> = records.iter()
        .filter(|record| match site.get(&record.type_name) {
            Some(admin) => !admin.has_delete_permission(actor, record),
            None => false,
        })
        .filter_map(|record| record.id)
        .collect();
    if !denied.is_empty() {
        return Err(ActionError::PermissionDenied(denied));
    }

    let count = records.len();
    for record in records {
        record.delete(store)?;
    }

    Ok(count)
}

/// Clear pending deletion markers over a batch of records.
pub fn undelete_selected<S>(
    store: &mut S,
    site: &AdminSite,
    actor: &Actor,
    batch: &[RecordId],
) -> Result<usize, ActionError>
where
    S: Store,
{
    store.lock_for_update(batch)?;

    let mut records = Vec::with_capacity(batch.len());
    for &id in batch.iter() {
        records.push(store.load(id)?);
    }

    let denied: Vec<RecordId> = records.iter()
        .filter(|record| match site.get(&record.type_name) {
            Some(admin) => !admin.has_undelete_permission(actor, record),
            None => false,
        })
        .filter_map(|record| record.id)
        .collect();
    if !denied.is_empty() {
        return Err(ActionError::PermissionDenied(denied));
    }

    let count = records.len();
    for mut record in records {
        record.undelete(store)?;
    }

    Ok(count)
}

fn check_permissions<S, I>(
    store: &S,
    site: &AdminSite,
    actor: &Actor,
    ids: I,
) -> Result<Vec<RecordId>, StoreError>
where
    S: Store,
    I: IntoIterator<Item = RecordId>,
{
    let mut needed = Vec::new();
    for id in ids {
        let record = store.load(id)?;
        if let Some(admin) = site.get(&record.type_name) {
            if !admin.has_publish_permission(actor, &record) {
                needed.push(id);
            }
        }
    }
    Ok(needed)
}

fn nested_preview<S>(
    store: &S,
    site: &AdminSite,
    items: &[NestedItem<RecordId>],
) -> Result<Vec<PreviewItem>, StoreError>
where
    S: Store,
{
    items.iter()
        .map(|item| {
            let record = store.load(item.item)?;
            Ok(PreviewItem {
                id: item.item,
                type_name: record.type_name.clone(),
                text: describe(site, &record),
                children: nested_preview(store, site, &item.children)?,
            })
        })
        .collect()
}

fn flat_preview<S>(
    store: &S,
    site: &AdminSite,
    ids: &[RecordId],
) -> Result<Vec<PreviewItem>, StoreError>
where
    S: Store,
{
    ids.iter()
        .map(|&id| {
            let record = store.load(id)?;
            Ok(PreviewItem {
                id,
                type_name: record.type_name.clone(),
                text: describe(site, &record),
                children: Vec::new(),
            })
        })
        .collect()
}

fn describe(site: &AdminSite, record: &Record) -> String {
    match site.get(&record.type_name) {
        Some(admin) => {
            format!("{} ({})", admin.display(record), admin.status_label(record))
        }
        None => match record.id {
            Some(id) => format!("{}: {}", record.type_name, id),
            None => record.type_name.clone(),
        },
    }
}

#[derive(Debug, Fail)]
pub enum ActionError {
    /// The actor may not act on part of the selection; nothing was done.
    #[fail(display = "Insufficient permissions for part of the selection")]
    PermissionDenied(Vec<RecordId>),
    /// Dependent records protect part of the selection from removal.
    #[fail(display = "Part of the selection is protected from removal")]
    Protected(Vec<RecordId>),
    #[fail(display = "{}", _0)]
    Publish(#[cause] PublishError),
    #[fail(display = "Store error: {}", _0)]
    Store(#[cause] StoreError),
}

impl_from! { for ActionError ;
    PublishError => ActionError::Publish,
    StoreError => ActionError::Store,
}
