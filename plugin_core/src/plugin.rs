use std::sync::Arc;

use async_trait::async_trait;

use crate::api::PublicAPI;
use crate::context::Context;
use crate::error::PluginError;
use crate::query::Query;
use crate::result::QueryResult;

/// Handed to the plugin's `init`: its API proxy and the directory it was
/// loaded from.
#[derive(Clone)]
pub struct PluginInitParams {
    pub api: Arc<dyn PublicAPI>,
    pub plugin_directory: String,
}

/// The capability every plugin implements. The host looks up a `plugin`
/// symbol in the plugin library (see [`declare_plugin!`]) and drives the
/// loaded object through these methods.
#[async_trait]
pub trait Plugin: Send + Sync {
    async fn init(&self, ctx: Context, params: PluginInitParams) -> Result<(), PluginError>;

    async fn query(&self, ctx: Context, query: Query) -> Result<Vec<QueryResult>, PluginError>;

    /// Optional teardown, awaited briefly by the host during `unloadPlugin`.
    async fn unload(&self) {}
}

/// Exports the `plugin` constructor symbol the host loader looks up.
///
/// ```ignore
/// struct HelloPlugin;
///
/// #[async_trait::async_trait]
/// impl plugin_core::Plugin for HelloPlugin { /* ... */ }
///
/// plugin_core::declare_plugin!(HelloPlugin);
/// ```
#[macro_export]
macro_rules! declare_plugin {
    ($ctor:expr) => {
        // Double boxing keeps the returned pointer thin and C-ABI safe.
        #[no_mangle]
        pub extern "C" fn plugin() -> *mut ::std::boxed::Box<dyn $crate::Plugin> {
            ::std::boxed::Box::into_raw(::std::boxed::Box::new(
                ::std::boxed::Box::new($ctor) as ::std::boxed::Box<dyn $crate::Plugin>
            ))
        }
    };
}
