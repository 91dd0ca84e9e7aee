//! Dynamic plugin loading.
//!
//! Plugins are shared libraries resolved against a process-global search
//! path. `loadPlugin` prepends the plugin directory (and its
//! `dependencies/` child, when present) to the path, derives a dotted
//! module name from the entry file, and binds the library's `plugin`
//! constructor symbol. `unloadPlugin` purges the module cache of the
//! module and everything rooted at it, and restores the search path
//! exactly, so a reload after a code change picks up the new library.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use libloading::{Library, Symbol};
use once_cell::sync::Lazy;

use plugin_core::Plugin;

use crate::error::HostError;

static SEARCH_PATH: Lazy<Mutex<Vec<PathBuf>>> = Lazy::new(|| Mutex::new(Vec::new()));
static MODULE_CACHE: Lazy<Mutex<HashMap<String, Arc<Library>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Prepend `dir` to the module search path if it is not already on it.
pub fn add_search_path(dir: &Path) {
    let mut search_path = SEARCH_PATH.lock().unwrap();
    if !search_path.iter().any(|p| p == dir) {
        search_path.insert(0, dir.to_path_buf());
    }
}

pub fn remove_search_path(dir: &Path) {
    let mut search_path = SEARCH_PATH.lock().unwrap();
    search_path.retain(|p| p != dir);
}

pub fn search_path_contains(dir: &Path) -> bool {
    SEARCH_PATH.lock().unwrap().iter().any(|p| p == dir)
}

/// Convert an entry path into an importable dotted module name:
/// the file suffix is dropped and path separators become dots,
/// e.g. `pkg/main.so` -> `pkg.main`.
pub fn module_name_for_entry(entry: &str) -> String {
    let without_ext = match entry.rsplit_once('.') {
        Some((stem, _ext)) => stem,
        None => entry,
    };
    without_ext.replace(['/', '\\'], ".")
}

/// Resolve a relative entry against the search path, first match wins.
fn resolve_entry(entry: &str) -> Option<PathBuf> {
    let search_path = SEARCH_PATH.lock().unwrap();
    search_path.iter().map(|dir| dir.join(entry)).find(|p| p.exists())
}

/// Whether the module cache holds a module with the given name.
pub fn module_cached(module_name: &str) -> bool {
    MODULE_CACHE.lock().unwrap().contains_key(module_name)
}

/// Load the plugin at `<plugin_directory>/<entry>` and bind its `plugin`
/// symbol. Returns the plugin object, the derived module name and the
/// backing library (which must outlive every call into the plugin).
pub fn load(
    plugin_directory: &str,
    entry: &str,
) -> Result<(Box<dyn Plugin>, String, Arc<Library>), HostError> {
    if plugin_directory.is_empty() || entry.is_empty() {
        return Err(HostError::Load(
            "plugin directory and entry must not be empty".to_string(),
        ));
    }

    let plugin_dir = Path::new(plugin_directory);
    add_search_path(plugin_dir);
    let deps_dir = plugin_dir.join("dependencies");
    if deps_dir.exists() {
        add_search_path(&deps_dir);
    }

    let module_name = module_name_for_entry(entry);

    let cached = MODULE_CACHE.lock().unwrap().get(&module_name).cloned();
    let library = match cached {
        Some(library) => library,
        None => {
            let entry_path = resolve_entry(entry).ok_or_else(|| {
                HostError::Load(format!("entry file not found: {}/{}", plugin_directory, entry))
            })?;
            let library = unsafe { Library::new(&entry_path) }.map_err(|e| {
                HostError::Load(format!("failed to load plugin library: {}", e))
            })?;
            let library = Arc::new(library);
            MODULE_CACHE
                .lock()
                .unwrap()
                .insert(module_name.clone(), library.clone());
            library
        }
    };

    let constructor: Symbol<unsafe extern "C" fn() -> *mut Box<dyn Plugin>> = unsafe {
        library.get(b"plugin").map_err(|_| {
            HostError::Load("plugin module does not have a 'plugin' symbol".to_string())
        })?
    };

    let raw = unsafe { constructor() };
    if raw.is_null() {
        return Err(HostError::Load("plugin constructor returned null".to_string()));
    }
    let plugin: Box<dyn Plugin> = unsafe { *Box::from_raw(raw) };

    Ok((plugin, module_name, library))
}

/// Release the module bindings and search path entries created for a
/// plugin. The cache drops the module and every module rooted at its
/// dotted name; the memory itself is released when the owning instance
/// drops.
pub fn unload(module_name: &str, plugin_directory: &str) {
    let child_prefix = format!("{}.", module_name);
    {
        let mut cache = MODULE_CACHE.lock().unwrap();
        cache.retain(|name, _| name != module_name && !name.starts_with(&child_prefix));
    }

    let plugin_dir = Path::new(plugin_directory);
    remove_search_path(plugin_dir);
    remove_search_path(&plugin_dir.join("dependencies"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_paths_become_dotted_module_names() {
        assert_eq!(module_name_for_entry("pkg/main.so"), "pkg.main");
        assert_eq!(module_name_for_entry("main.dll"), "main");
        assert_eq!(module_name_for_entry(r"pkg\sub\main.dylib"), "pkg.sub.main");
        assert_eq!(module_name_for_entry("noext"), "noext");
    }

    #[test]
    fn search_path_prepend_is_idempotent() {
        let dir = Path::new("/tmp/loader-test-a");
        add_search_path(dir);
        add_search_path(dir);
        assert!(search_path_contains(dir));
        remove_search_path(dir);
        assert!(!search_path_contains(dir));
        remove_search_path(dir);
    }

    #[test]
    fn load_rejects_missing_entry() {
        let err = match load("/tmp/does-not-exist", "demo/main.so") {
            Err(e) => e,
            Ok(_) => panic!("expected load to fail"),
        };
        assert!(err.to_string().contains("entry file not found"));
        unload("demo.main", "/tmp/does-not-exist");
    }

    #[test]
    fn load_rejects_empty_params() {
        assert!(load("", "main.so").is_err());
        assert!(load("/tmp", "").is_err());
    }
}
