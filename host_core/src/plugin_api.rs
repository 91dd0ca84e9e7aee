//! Per-plugin `PublicAPI` proxy.
//!
//! Every named method is a single outbound JSON-RPC request built on
//! `invoke_method`: mint an id, park a waiter in the correlation map,
//! send the frame, await the matching response. Registration methods also
//! intern a local callback under a fresh id and ship that id to Wox so the
//! inbound `onMRURestore`/`onLLMStream`/deep-link traffic can be routed
//! back to the right closure.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use liblogger::Logger;
use libws::WsWriter;
use plugin_core::{
    ChangeQueryParam, ChatStreamFunc, Context, Conversation, DeepLinkFunc, DynamicSettingFunc,
    MRURestoreFunc, MetadataCommand, PluginError, PublicAPI, SettingChangedFunc, UnloadFunc,
    UpdatableResult, UpdatableResultAction,
};

use crate::correlation;
use crate::envelope::Envelope;
use crate::plugin_registry::PLUGIN_REGISTRY;

pub struct PluginApi {
    writer: WsWriter,
    plugin_id: String,
    plugin_name: String,

    setting_changed_callbacks: Mutex<HashMap<String, SettingChangedFunc>>,
    dynamic_setting_callbacks: Mutex<HashMap<String, DynamicSettingFunc>>,
    deep_link_callbacks: Mutex<HashMap<String, DeepLinkFunc>>,
    unload_callbacks: Mutex<HashMap<String, UnloadFunc>>,
    llm_stream_callbacks: Mutex<HashMap<String, ChatStreamFunc>>,
    mru_restore_callbacks: Mutex<HashMap<String, MRURestoreFunc>>,
}

impl PluginApi {
    pub fn new(writer: WsWriter, plugin_id: String, plugin_name: String) -> Self {
        PluginApi {
            writer,
            plugin_id,
            plugin_name,
            setting_changed_callbacks: Mutex::new(HashMap::new()),
            dynamic_setting_callbacks: Mutex::new(HashMap::new()),
            deep_link_callbacks: Mutex::new(HashMap::new()),
            unload_callbacks: Mutex::new(HashMap::new()),
            llm_stream_callbacks: Mutex::new(HashMap::new()),
            mru_restore_callbacks: Mutex::new(HashMap::new()),
        }
    }

    /// Send one request to Wox and await its correlated response.
    pub async fn invoke_method(
        &self,
        ctx: &Context,
        method: &str,
        params: HashMap<String, Value>,
    ) -> Result<Value, PluginError> {
        let request_id = Uuid::new_v4().to_string();
        let trace_id = ctx.get_trace_id();

        // Log traffic is exempt to avoid log-to-log feedback.
        if method != "Log" {
            Logger::info(
                &trace_id,
                &format!(
                    "<{}> start invoke method to Wox: {}, id: {}",
                    self.plugin_name, method, request_id
                ),
            );
        }

        let request = Envelope::request(
            trace_id.clone(),
            request_id.clone(),
            method.to_string(),
            params,
            self.plugin_id.clone(),
            self.plugin_name.clone(),
        );
        let frame = serde_json::to_string(&request).map_err(|e| PluginError::Json(e.to_string()))?;

        // The waiter must exist before the frame leaves, otherwise a fast
        // response could arrive with nothing to complete.
        let waiter = correlation::register(&request_id);
        if let Err(e) = self.writer.send_text(frame) {
            correlation::remove(&request_id);
            return Err(PluginError::Api(e));
        }

        match waiter.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(message)) => {
                Logger::error(&trace_id, &format!("invoke method failed: {}", message));
                Err(PluginError::Api(message))
            }
            Err(_) => Err(PluginError::Api("response channel closed".to_string())),
        }
    }

    pub fn get_llm_stream_callback(&self, callback_id: &str) -> Option<ChatStreamFunc> {
        self.llm_stream_callbacks.lock().unwrap().get(callback_id).cloned()
    }

    pub fn get_mru_restore_callback(&self, callback_id: &str) -> Option<MRURestoreFunc> {
        self.mru_restore_callbacks.lock().unwrap().get(callback_id).cloned()
    }

    pub fn get_deep_link_callback(&self, callback_id: &str) -> Option<DeepLinkFunc> {
        self.deep_link_callbacks.lock().unwrap().get(callback_id).cloned()
    }

    pub fn get_setting_changed_callback(&self, callback_id: &str) -> Option<SettingChangedFunc> {
        self.setting_changed_callbacks.lock().unwrap().get(callback_id).cloned()
    }

    pub fn get_dynamic_setting_callback(&self, callback_id: &str) -> Option<DynamicSettingFunc> {
        self.dynamic_setting_callbacks.lock().unwrap().get(callback_id).cloned()
    }

    /// Drain the teardown hooks; `unloadPlugin` fires them detached.
    pub fn take_unload_callbacks(&self) -> Vec<UnloadFunc> {
        self.unload_callbacks.lock().unwrap().drain().map(|(_, cb)| cb).collect()
    }

    /// Intern any fresh action callables carried by an update payload so
    /// subsequent `action` frames targeting the new ids can find them.
    fn cache_update_actions(&self, actions: &mut [plugin_core::ResultAction]) {
        let Some(instance) = PLUGIN_REGISTRY.get(&self.plugin_id) else { return };
        for action in actions.iter_mut() {
            if let Some(callback) = action.action.clone() {
                if action.id.is_empty() {
                    action.id = Uuid::new_v4().to_string();
                }
                instance.cache_action(&action.id, callback);
            }
        }
    }
}

#[async_trait]
impl PublicAPI for PluginApi {
    async fn change_query(
        &self,
        ctx: &Context,
        query: ChangeQueryParam,
    ) -> Result<(), PluginError> {
        let params = HashMap::from([
            ("QueryType".to_string(), serde_json::to_value(&query.query_type)?),
            ("QueryText".to_string(), json!(query.query_text)),
            ("QuerySelection".to_string(), serde_json::to_value(&query.query_selection)?),
        ]);
        self.invoke_method(ctx, "ChangeQuery", params).await?;
        Ok(())
    }

    async fn hide_app(&self, ctx: &Context) -> Result<(), PluginError> {
        self.invoke_method(ctx, "HideApp", HashMap::new()).await?;
        Ok(())
    }

    async fn show_app(&self, ctx: &Context) -> Result<(), PluginError> {
        self.invoke_method(ctx, "ShowApp", HashMap::new()).await?;
        Ok(())
    }

    async fn is_visible(&self, ctx: &Context) -> Result<bool, PluginError> {
        let value = self.invoke_method(ctx, "IsVisible", HashMap::new()).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn notify(&self, ctx: &Context, message: &str) -> Result<(), PluginError> {
        let params = HashMap::from([("message".to_string(), json!(message))]);
        self.invoke_method(ctx, "Notify", params).await?;
        Ok(())
    }

    async fn log(&self, ctx: &Context, level: &str, msg: &str) -> Result<(), PluginError> {
        let params = HashMap::from([
            ("level".to_string(), json!(level)),
            ("msg".to_string(), json!(msg)),
        ]);
        self.invoke_method(ctx, "Log", params).await?;
        Ok(())
    }

    async fn get_translation(&self, ctx: &Context, key: &str) -> Result<String, PluginError> {
        let params = HashMap::from([("key".to_string(), json!(key))]);
        let value = self.invoke_method(ctx, "GetTranslation", params).await?;
        Ok(value.as_str().map(str::to_string).unwrap_or_else(|| key.to_string()))
    }

    async fn get_setting(&self, ctx: &Context, key: &str) -> Result<String, PluginError> {
        let params = HashMap::from([("key".to_string(), json!(key))]);
        let value = self.invoke_method(ctx, "GetSetting", params).await?;
        Ok(value.as_str().map(str::to_string).unwrap_or_default())
    }

    async fn save_setting(
        &self,
        ctx: &Context,
        key: &str,
        value: &str,
        is_platform_specific: bool,
    ) -> Result<(), PluginError> {
        let params = HashMap::from([
            ("key".to_string(), json!(key)),
            ("value".to_string(), json!(value)),
            ("isPlatformSpecific".to_string(), json!(is_platform_specific)),
        ]);
        self.invoke_method(ctx, "SaveSetting", params).await?;
        Ok(())
    }

    async fn on_setting_changed(
        &self,
        ctx: &Context,
        callback: SettingChangedFunc,
    ) -> Result<(), PluginError> {
        let callback_id = Uuid::new_v4().to_string();
        self.setting_changed_callbacks
            .lock()
            .unwrap()
            .insert(callback_id.clone(), callback);
        let params = HashMap::from([("callbackId".to_string(), json!(callback_id))]);
        self.invoke_method(ctx, "OnSettingChanged", params).await?;
        Ok(())
    }

    async fn on_get_dynamic_setting(
        &self,
        ctx: &Context,
        callback: DynamicSettingFunc,
    ) -> Result<(), PluginError> {
        let callback_id = Uuid::new_v4().to_string();
        self.dynamic_setting_callbacks
            .lock()
            .unwrap()
            .insert(callback_id.clone(), callback);
        let params = HashMap::from([("callbackId".to_string(), json!(callback_id))]);
        self.invoke_method(ctx, "OnGetDynamicSetting", params).await?;
        Ok(())
    }

    async fn on_deep_link(
        &self,
        ctx: &Context,
        callback: DeepLinkFunc,
    ) -> Result<(), PluginError> {
        let callback_id = Uuid::new_v4().to_string();
        self.deep_link_callbacks
            .lock()
            .unwrap()
            .insert(callback_id.clone(), callback);
        let params = HashMap::from([("callbackId".to_string(), json!(callback_id))]);
        self.invoke_method(ctx, "OnDeepLink", params).await?;
        Ok(())
    }

    async fn on_unload(&self, ctx: &Context, callback: UnloadFunc) -> Result<(), PluginError> {
        let callback_id = Uuid::new_v4().to_string();
        self.unload_callbacks.lock().unwrap().insert(callback_id.clone(), callback);
        let params = HashMap::from([("callbackId".to_string(), json!(callback_id))]);
        self.invoke_method(ctx, "OnUnload", params).await?;
        Ok(())
    }

    async fn register_query_commands(
        &self,
        ctx: &Context,
        commands: Vec<MetadataCommand>,
    ) -> Result<(), PluginError> {
        let params = HashMap::from([(
            "commands".to_string(),
            json!(serde_json::to_string(&commands)?),
        )]);
        self.invoke_method(ctx, "RegisterQueryCommands", params).await?;
        Ok(())
    }

    async fn llm_stream(
        &self,
        ctx: &Context,
        conversations: Vec<Conversation>,
        callback: ChatStreamFunc,
    ) -> Result<(), PluginError> {
        let callback_id = Uuid::new_v4().to_string();
        self.llm_stream_callbacks
            .lock()
            .unwrap()
            .insert(callback_id.clone(), callback);
        let params = HashMap::from([
            ("callbackId".to_string(), json!(callback_id)),
            ("conversations".to_string(), json!(serde_json::to_string(&conversations)?)),
        ]);
        self.invoke_method(ctx, "LLMStream", params).await?;
        Ok(())
    }

    async fn on_mru_restore(
        &self,
        ctx: &Context,
        callback: MRURestoreFunc,
    ) -> Result<(), PluginError> {
        let callback_id = Uuid::new_v4().to_string();
        self.mru_restore_callbacks
            .lock()
            .unwrap()
            .insert(callback_id.clone(), callback);
        let params = HashMap::from([("callbackId".to_string(), json!(callback_id))]);
        self.invoke_method(ctx, "OnMRURestore", params).await?;
        Ok(())
    }

    async fn get_updatable_result(
        &self,
        ctx: &Context,
        result_id: &str,
    ) -> Result<Option<UpdatableResult>, PluginError> {
        let params = HashMap::from([("resultId".to_string(), json!(result_id))]);
        let value = self.invoke_method(ctx, "GetUpdatableResult", params).await?;
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value).map_err(|e| PluginError::Json(e.to_string()))?))
    }

    async fn update_result(
        &self,
        ctx: &Context,
        mut result: UpdatableResult,
    ) -> Result<bool, PluginError> {
        if let Some(actions) = result.actions.as_mut() {
            self.cache_update_actions(actions);
        }
        let params = HashMap::from([(
            "result".to_string(),
            json!(serde_json::to_string(&result)?),
        )]);
        let value = self.invoke_method(ctx, "UpdateResult", params).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn update_result_action(
        &self,
        ctx: &Context,
        mut action: UpdatableResultAction,
    ) -> Result<bool, PluginError> {
        if let Some(callback) = action.action.clone() {
            if let Some(instance) = PLUGIN_REGISTRY.get(&self.plugin_id) {
                instance.cache_action(&action.action_id, callback);
            }
        }
        action.action = None;
        let params = HashMap::from([(
            "action".to_string(),
            json!(serde_json::to_string(&action)?),
        )]);
        let value = self.invoke_method(ctx, "UpdateResultAction", params).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn refresh_query(&self, ctx: &Context) -> Result<(), PluginError> {
        self.invoke_method(ctx, "RefreshQuery", HashMap::new()).await?;
        Ok(())
    }

    async fn copy_text(&self, ctx: &Context, text: &str) -> Result<(), PluginError> {
        let params = HashMap::from([("text".to_string(), json!(text))]);
        self.invoke_method(ctx, "Copy", params).await?;
        Ok(())
    }
}
