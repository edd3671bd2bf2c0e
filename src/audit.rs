use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::RecordId;

/// Entity responsible for an action.
#[derive(Clone, Copy, Debug, Serialize)]
pub enum Actor {
    /// The system itself, for actions carried out automatically.
    System,
    /// A user.
    User(i32),
}

impl From<i32> for Actor {
    fn from(id: i32) -> Actor {
        Actor::User(id)
    }
}

/// Store an event in the audit log.
///
/// Entries are emitted as structured JSON lines on the `audit` log target;
/// the hosting application decides where that target is routed.
pub fn log_actor<D>(actor: Actor, context: &str, context_id: RecordId, kind: &str, data: D)
where
    D: Serialize,
{
    let entry = Entry {
        actor,
        context,
        context_id,
        kind,
        at: Utc::now(),
        data,
    };

    match serde_json::to_string(&entry) {
        Ok(line) => info!(target: "audit", "{}", line),
        Err(err) => warn!(target: "audit", "could not serialize audit entry: {}", err),
    }
}

#[derive(Serialize)]
struct Entry<'a, D> {
    actor: Actor,
    context: &'a str,
    context_id: RecordId,
    kind: &'a str,
    at: DateTime<Utc>,
    data: D,
}
