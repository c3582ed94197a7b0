//! Application services and ports.

#![forbid(unsafe_code)]

mod binding_adapters;
mod binding_watch_service;
mod conversion_reporter;
mod rbac_ports;
mod role_resolver;
mod watch_session;

#[cfg(test)]
mod test_support;

pub use binding_adapters::{
    TaggedWatchEvent, convert_event, convert_list, convert_v1, convert_v1alpha1, convert_v1beta1,
};
pub use binding_watch_service::{BindingStream, BindingWatchService, WatchRegistry};
pub use conversion_reporter::{
    ConversionFailure, ConversionFailureReporter, ConversionOrigin, TracingConversionReporter,
};
pub use rbac_ports::{RbacApi, RbacApis, StopHandle, WatchSubscription};
pub use role_resolver::{RoleResolutionError, RoleResolver};
pub use watch_session::{SessionEvents, WatchSession};
