//! Data models shared by the resolver, cache, and commands.
//!
//! - [`Record`]: a remote entity as a plain field mapping
//! - [`ResourceKind`]: project, work item, user, module, state, cycle, label, ...
//! - [`Priority`]: work item priority levels

mod record;
mod types;

pub use record::{
    Record, into_record, into_records, record_id, related_id, related_ids, str_field,
    user_display_name,
};
pub use types::{Priority, ResourceKind};
