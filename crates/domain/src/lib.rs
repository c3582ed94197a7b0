//! Canonical binding model and native per-revision payload shapes.

#![forbid(unsafe_code)]

mod binding;
pub mod native;
mod role;
mod version;
mod watch;

pub use binding::{BindingSubject, CanonicalBinding, SubjectKind};
pub use role::{CanonicalRole, RoleReference, Rule};
pub use version::{ApiVersion, RBAC_API_GROUP};
pub use watch::{BindingListPayload, BindingPayload, RawWatchEvent, RolePayload, WatchEventType};
