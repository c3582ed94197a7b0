//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod kubernetes_connection;
mod kubernetes_rbac_api;
mod watch_line_decoder;

pub use kubernetes_connection::{KubernetesConnection, KubernetesConnectionConfig};
pub use kubernetes_rbac_api::KubernetesRbacApi;
pub use watch_line_decoder::{WatchLineDecoder, decode_watch_frame};
