//! The publishable record model and its state machine.

pub mod publish;
pub mod record;

pub use self::{
    publish::{PublishError, PublishSet},
    record::{PublishState, Record, RecordId, Value},
};
