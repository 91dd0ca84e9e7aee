use async_trait::async_trait;

use crate::ai::{ChatStreamFunc, Conversation};
use crate::context::Context;
use crate::error::PluginError;
use crate::mru::MRURestoreFunc;
use crate::query::ChangeQueryParam;
use crate::result::{UpdatableResult, UpdatableResultAction};
use crate::settings::{
    DeepLinkFunc, DynamicSettingFunc, MetadataCommand, SettingChangedFunc, UnloadFunc,
};

/// The API a plugin uses to call back into Wox. One instance per plugin,
/// handed over in [`crate::PluginInitParams`] during `init`. Every method is
/// an outbound JSON-RPC request answered by Wox; registration methods
/// additionally park a callback with the host so Wox can route invocations
/// back later.
#[async_trait]
pub trait PublicAPI: Send + Sync {
    /// Replace the query currently shown in the Wox input box.
    async fn change_query(&self, ctx: &Context, query: ChangeQueryParam)
        -> Result<(), PluginError>;

    async fn hide_app(&self, ctx: &Context) -> Result<(), PluginError>;

    async fn show_app(&self, ctx: &Context) -> Result<(), PluginError>;

    async fn is_visible(&self, ctx: &Context) -> Result<bool, PluginError>;

    /// Show a desktop notification.
    async fn notify(&self, ctx: &Context, message: &str) -> Result<(), PluginError>;

    /// Write into the Wox log. Levels are `debug`, `info`, `warning`, `error`.
    async fn log(&self, ctx: &Context, level: &str, msg: &str) -> Result<(), PluginError>;

    async fn get_translation(&self, ctx: &Context, key: &str) -> Result<String, PluginError>;

    async fn get_setting(&self, ctx: &Context, key: &str) -> Result<String, PluginError>;

    async fn save_setting(
        &self,
        ctx: &Context,
        key: &str,
        value: &str,
        is_platform_specific: bool,
    ) -> Result<(), PluginError>;

    async fn on_setting_changed(
        &self,
        ctx: &Context,
        callback: SettingChangedFunc,
    ) -> Result<(), PluginError>;

    async fn on_get_dynamic_setting(
        &self,
        ctx: &Context,
        callback: DynamicSettingFunc,
    ) -> Result<(), PluginError>;

    async fn on_deep_link(&self, ctx: &Context, callback: DeepLinkFunc)
        -> Result<(), PluginError>;

    /// Register a teardown hook fired on `unloadPlugin`.
    async fn on_unload(&self, ctx: &Context, callback: UnloadFunc) -> Result<(), PluginError>;

    async fn register_query_commands(
        &self,
        ctx: &Context,
        commands: Vec<MetadataCommand>,
    ) -> Result<(), PluginError>;

    /// Start an LLM chat stream; the callback receives each chunk.
    async fn llm_stream(
        &self,
        ctx: &Context,
        conversations: Vec<Conversation>,
        callback: ChatStreamFunc,
    ) -> Result<(), PluginError>;

    /// Register a hook restoring most-recently-used entries into results.
    async fn on_mru_restore(
        &self,
        ctx: &Context,
        callback: MRURestoreFunc,
    ) -> Result<(), PluginError>;

    /// Fetch the current updatable state of a displayed result, or `None`
    /// when the result is no longer shown.
    async fn get_updatable_result(
        &self,
        ctx: &Context,
        result_id: &str,
    ) -> Result<Option<UpdatableResult>, PluginError>;

    /// Push a partial result update into the UI. Returns whether the result
    /// was still displayed.
    async fn update_result(
        &self,
        ctx: &Context,
        result: UpdatableResult,
    ) -> Result<bool, PluginError>;

    /// Push a partial update of a single action into the UI.
    async fn update_result_action(
        &self,
        ctx: &Context,
        action: UpdatableResultAction,
    ) -> Result<bool, PluginError>;

    /// Ask Wox to re-run the current query.
    async fn refresh_query(&self, ctx: &Context) -> Result<(), PluginError>;

    /// Put text on the system clipboard.
    async fn copy_text(&self, ctx: &Context, text: &str) -> Result<(), PluginError>;
}
