pub mod correlation;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod plugin_api;
pub mod plugin_loader;
pub mod plugin_registry;

pub use envelope::{Envelope, WOX_JSONRPC_TYPE_REQUEST, WOX_JSONRPC_TYPE_RESPONSE};
pub use error::HostError;
pub use plugin_api::PluginApi;
pub use plugin_registry::{PluginInstance, PluginRegistry, PLUGIN_REGISTRY};
