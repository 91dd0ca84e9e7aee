//! Registry of loaded plugins.
//!
//! One entry per plugin id, created by `loadPlugin` and removed by
//! `unloadPlugin`. The per-instance callback caches are the side tables
//! that stand in for closures on the wire: `query` interns action and
//! refresh callbacks by id here, and the `action`/`refresh` handlers look
//! them back up. Cache locks are held only across lookup and insert, never
//! across plugin code.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use libloading::Library;
use once_cell::sync::Lazy;

use plugin_core::{ActionFunc, Plugin, RefreshFunc};

use crate::error::HostError;
use crate::plugin_api::PluginApi;

/// Everything the host keeps per loaded plugin.
pub struct PluginInstance {
    /// The user-provided plugin object.
    pub plugin: Box<dyn Plugin>,

    /// API proxy; created by `init`, absent until then.
    api: Mutex<Option<Arc<PluginApi>>>,

    /// Absolute directory the plugin was loaded from.
    pub plugin_dir: String,

    /// Dotted module name derived from the entry path; keys the module
    /// cache so `unloadPlugin` can release the code.
    pub module_name: String,

    /// `actionId -> callback`, rebuilt on every query.
    pub actions: Mutex<HashMap<String, ActionFunc>>,

    /// `resultId -> refresh callback`, rebuilt on every query.
    pub refreshes: Mutex<HashMap<String, RefreshFunc>>,

    /// `actionId -> form submit callback`, rebuilt on every query.
    pub form_actions: Mutex<HashMap<String, ActionFunc>>,

    // Backing libraries. Declared last: the plugin object must drop before
    // the code it was compiled into.
    _modules: Vec<Arc<Library>>,
}

impl PluginInstance {
    pub fn new(
        plugin: Box<dyn Plugin>,
        plugin_dir: String,
        module_name: String,
        modules: Vec<Arc<Library>>,
    ) -> Self {
        PluginInstance {
            plugin,
            api: Mutex::new(None),
            plugin_dir,
            module_name,
            actions: Mutex::new(HashMap::new()),
            refreshes: Mutex::new(HashMap::new()),
            form_actions: Mutex::new(HashMap::new()),
            _modules: modules,
        }
    }

    pub fn api(&self) -> Option<Arc<PluginApi>> {
        self.api.lock().unwrap().clone()
    }

    pub fn set_api(&self, api: Arc<PluginApi>) {
        *self.api.lock().unwrap() = Some(api);
    }

    /// Drop every cached callback. Must run at the *start* of a query:
    /// stale callbacks from an earlier query must never be invocable
    /// against the new query's ids.
    pub fn clear_query_caches(&self) {
        self.actions.lock().unwrap().clear();
        self.refreshes.lock().unwrap().clear();
        self.form_actions.lock().unwrap().clear();
    }

    pub fn cache_action(&self, action_id: &str, callback: ActionFunc) {
        self.actions.lock().unwrap().insert(action_id.to_string(), callback);
    }

    pub fn get_action(&self, action_id: &str) -> Option<ActionFunc> {
        self.actions.lock().unwrap().get(action_id).cloned()
    }

    pub fn cache_refresh(&self, result_id: &str, callback: RefreshFunc) {
        self.refreshes.lock().unwrap().insert(result_id.to_string(), callback);
    }

    pub fn get_refresh(&self, result_id: &str) -> Option<RefreshFunc> {
        self.refreshes.lock().unwrap().get(result_id).cloned()
    }
}

/// Central map of plugin id to instance.
pub struct PluginRegistry {
    instances: RwLock<HashMap<String, Arc<PluginInstance>>>,
}

pub static PLUGIN_REGISTRY: Lazy<PluginRegistry> = Lazy::new(PluginRegistry::new);

impl PluginRegistry {
    fn new() -> Self {
        PluginRegistry { instances: RwLock::new(HashMap::new()) }
    }

    /// Record a freshly loaded plugin. Refuses to overwrite an existing
    /// entry with the same id.
    pub fn insert(&self, plugin_id: &str, instance: PluginInstance) -> Result<(), HostError> {
        let mut instances = self.instances.write().unwrap();
        if instances.contains_key(plugin_id) {
            return Err(HostError::Load(format!("plugin already loaded: {}", plugin_id)));
        }
        instances.insert(plugin_id.to_string(), Arc::new(instance));
        Ok(())
    }

    pub fn get(&self, plugin_id: &str) -> Option<Arc<PluginInstance>> {
        self.instances.read().unwrap().get(plugin_id).cloned()
    }

    pub fn remove(&self, plugin_id: &str) -> Option<Arc<PluginInstance>> {
        self.instances.write().unwrap().remove(plugin_id)
    }

    pub fn contains(&self, plugin_id: &str) -> bool {
        self.instances.read().unwrap().contains_key(plugin_id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.instances.read().unwrap().keys().cloned().collect()
    }
}
