//! Inbound method handlers.
//!
//! Each handler is a short typed adapter from envelope params to a plugin
//! call. Failures are logged under the request's trace id here; the
//! dispatch engine turns the returned error into the `Error` field of the
//! response frame.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use uuid::Uuid;

use liblogger::Logger;
use libws::WsWriter;
use plugin_core::{
    ActionContext, ChatStreamDataType, Context, MRUData, PluginInitParams, PublicAPI, Query,
    QueryResult, QueryType, RefreshableResult,
};

use crate::envelope::Envelope;
use crate::error::HostError;
use crate::plugin_api::PluginApi;
use crate::plugin_loader;
use crate::plugin_registry::{PluginInstance, PLUGIN_REGISTRY};

pub async fn handle_request(
    ctx: Context,
    request: &Envelope,
    writer: WsWriter,
) -> Result<Value, HostError> {
    let trace_id = ctx.get_trace_id();
    Logger::info(
        &trace_id,
        &format!("invoke <{}> method: {}", request.plugin_name, request.method),
    );

    match request.method.as_str() {
        "loadPlugin" => load_plugin(&ctx, request).await,
        "init" => init_plugin(&ctx, request, writer).await,
        "query" => query(&ctx, request).await,
        "action" => action(&ctx, request).await,
        "refresh" => refresh(&ctx, request).await,
        "unloadPlugin" => unload_plugin(&ctx, request).await,
        "onMRURestore" => on_mru_restore(&ctx, request).await,
        "onLLMStream" => on_llm_stream(&ctx, request).await,
        other => {
            Logger::info(&trace_id, &format!("unknown method handler: {}", other));
            Err(HostError::UnknownMethod(other.to_string()))
        }
    }
}

/// Plugin name for error messages, falling back to the id.
fn display_name(request: &Envelope) -> String {
    if request.plugin_name.is_empty() {
        request.plugin_id.clone()
    } else {
        request.plugin_name.clone()
    }
}

fn find_instance(request: &Envelope) -> Result<Arc<PluginInstance>, HostError> {
    PLUGIN_REGISTRY
        .get(&request.plugin_id)
        .ok_or_else(|| HostError::PluginNotFound(display_name(request)))
}

async fn load_plugin(ctx: &Context, request: &Envelope) -> Result<Value, HostError> {
    let trace_id = ctx.get_trace_id();
    let plugin_name = display_name(request);
    let plugin_directory = request.param_str("PluginDirectory");
    let entry = request.param_str("Entry");

    Logger::info(
        &trace_id,
        &format!(
            "<{}> load plugin, directory: {}, entry: {}",
            plugin_name, plugin_directory, entry
        ),
    );

    if PLUGIN_REGISTRY.contains(&request.plugin_id) {
        let err = HostError::Load(format!("plugin already loaded: {}", request.plugin_id));
        Logger::error(&trace_id, &format!("<{}> load plugin failed: {}", plugin_name, err));
        return Err(err);
    }

    match plugin_loader::load(&plugin_directory, &entry) {
        Ok((plugin, module_name, library)) => {
            let instance =
                PluginInstance::new(plugin, plugin_directory, module_name, vec![library]);
            PLUGIN_REGISTRY.insert(&request.plugin_id, instance)?;
            Logger::info(&trace_id, &format!("<{}> load plugin successfully", plugin_name));
            Ok(Value::Null)
        }
        Err(e) => {
            Logger::error(&trace_id, &format!("<{}> load plugin failed: {}", plugin_name, e));
            Err(e)
        }
    }
}

async fn init_plugin(
    ctx: &Context,
    request: &Envelope,
    writer: WsWriter,
) -> Result<Value, HostError> {
    let trace_id = ctx.get_trace_id();
    let plugin_name = display_name(request);
    let instance = find_instance(request)?;

    let api = Arc::new(PluginApi::new(
        writer,
        request.plugin_id.clone(),
        request.plugin_name.clone(),
    ));
    instance.set_api(api.clone());

    let init_params = PluginInitParams {
        api: api as Arc<dyn PublicAPI>,
        plugin_directory: request.param_str("PluginDirectory"),
    };

    match instance.plugin.init(ctx.clone(), init_params).await {
        Ok(()) => {
            Logger::info(&trace_id, &format!("<{}> init plugin successfully", plugin_name));
            Ok(Value::Null)
        }
        Err(e) => {
            // the instance stays registered; only unloadPlugin removes it
            Logger::error(&trace_id, &format!("<{}> init plugin failed: {}", plugin_name, e));
            Err(e.into())
        }
    }
}

fn decode_query(request: &Envelope) -> Result<Query, HostError> {
    let selection_raw = request.param_str("Selection");
    let selection = if selection_raw.is_empty() {
        Default::default()
    } else {
        serde_json::from_str(&selection_raw)?
    };
    let env_raw = request.param_str("Env");
    let env = if env_raw.is_empty() {
        Default::default()
    } else {
        serde_json::from_str(&env_raw)?
    };

    let non_empty = |s: String| if s.is_empty() { None } else { Some(s) };
    Ok(Query {
        query_type: match request.param_str("Type").as_str() {
            "selection" => QueryType::Selection,
            _ => QueryType::Input,
        },
        raw_query: request.param_str("RawQuery"),
        trigger_keyword: non_empty(request.param_str("TriggerKeyword")),
        command: non_empty(request.param_str("Command")),
        search: request.param_str("Search"),
        selection,
        env,
    })
}

/// Assign missing ids and intern the callbacks of one result.
fn intern_result_callbacks(instance: &PluginInstance, result: &mut QueryResult) {
    if result.id.is_empty() {
        result.id = Uuid::new_v4().to_string();
    }
    for action in result.actions.iter_mut() {
        if let Some(callback) = action.action.clone() {
            if action.id.is_empty() {
                action.id = Uuid::new_v4().to_string();
            }
            instance.cache_action(&action.id, callback);
        }
    }
    if result.refresh_interval > 0 {
        if let Some(on_refresh) = result.on_refresh.clone() {
            instance.cache_refresh(&result.id, on_refresh);
        }
    }
}

async fn query(ctx: &Context, request: &Envelope) -> Result<Value, HostError> {
    let trace_id = ctx.get_trace_id();
    let plugin_name = display_name(request);
    let instance = find_instance(request)?;

    // A new query may start while an older one is still in flight, so the
    // caches are cleared up front rather than when the old one finishes.
    instance.clear_query_caches();

    let query = decode_query(request)?;
    let mut results = match instance.plugin.query(ctx.clone(), query).await {
        Ok(results) => results,
        Err(e) => {
            Logger::error(&trace_id, &format!("<{}> query failed: {}", plugin_name, e));
            return Err(e.into());
        }
    };

    for result in results.iter_mut() {
        intern_result_callbacks(&instance, result);
    }

    Ok(serde_json::to_value(&results)?)
}

async fn action(ctx: &Context, request: &Envelope) -> Result<Value, HostError> {
    let trace_id = ctx.get_trace_id();
    let plugin_name = display_name(request);
    let instance = find_instance(request)?;

    let result_id = request.param_str("ResultId");
    let action_id = request.param_str("ActionId");
    let result_action_id = request.param_str("ResultActionId");
    let context_data = request.param_str("ContextData");

    let lookup_id = if action_id.is_empty() { result_action_id.clone() } else { action_id.clone() };
    match instance.get_action(&lookup_id) {
        Some(callback) => {
            let action_ctx =
                ActionContext { result_id, action_id, result_action_id, context_data };
            // The reply must not wait on user code: the callback runs as a
            // detached task and the frame is answered immediately.
            tokio::spawn(callback(action_ctx));
        }
        None => {
            // stale id after a newer query; logged but not an error reply
            Logger::error(
                &trace_id,
                &format!("<{}> action not found: {}", plugin_name, lookup_id),
            );
        }
    }

    Ok(Value::Null)
}

async fn refresh(ctx: &Context, request: &Envelope) -> Result<Value, HostError> {
    let trace_id = ctx.get_trace_id();
    let plugin_name = display_name(request);
    let instance = find_instance(request)?;

    let result_id = request.param_str("ResultId");
    let mut refreshable: RefreshableResult =
        serde_json::from_str(&request.param_str("RefreshableResult"))?;

    // Callbacks were stripped on the way out; restore them by id.
    for action in refreshable.actions.iter_mut() {
        action.action = instance.get_action(&action.id);
    }

    let refresh_func = instance.get_refresh(&result_id).ok_or_else(|| {
        HostError::Other(format!("refresh function not found for result id: {}", result_id))
    })?;

    let mut refreshed = match refresh_func(refreshable).await {
        Ok(refreshed) => refreshed,
        Err(e) => {
            Logger::error(&trace_id, &format!("<{}> refresh failed: {}", plugin_name, e));
            return Err(e.into());
        }
    };

    // The refreshed value may carry new actions; intern them too.
    for action in refreshed.actions.iter_mut() {
        if action.id.is_empty() {
            action.id = Uuid::new_v4().to_string();
        }
        if let Some(callback) = action.action.clone() {
            instance.cache_action(&action.id, callback);
        }
    }

    Ok(serde_json::to_value(&refreshed)?)
}

async fn unload_plugin(ctx: &Context, request: &Envelope) -> Result<Value, HostError> {
    let trace_id = ctx.get_trace_id();
    let plugin_name = display_name(request);
    let instance = PLUGIN_REGISTRY
        .remove(&request.plugin_id)
        .ok_or_else(|| HostError::PluginNotFound(display_name(request)))?;

    // Teardown hooks registered through the API run detached.
    if let Some(api) = instance.api() {
        for callback in api.take_unload_callbacks() {
            tokio::spawn(callback());
        }
    }

    // Optional plugin-side teardown, bounded so a hung plugin cannot stall
    // the unload.
    if tokio::time::timeout(Duration::from_secs(1), instance.plugin.unload())
        .await
        .is_err()
    {
        Logger::warning(&trace_id, &format!("<{}> unload hook timed out", plugin_name));
    }

    plugin_loader::unload(&instance.module_name, &instance.plugin_dir);
    Logger::info(&trace_id, &format!("<{}> unload plugin successfully", plugin_name));
    Ok(Value::Null)
}

fn decode_mru(request: &Envelope) -> Result<MRUData, HostError> {
    match request.params.get("mruData") {
        Some(Value::String(raw)) => Ok(serde_json::from_str(raw)?),
        Some(value) => Ok(serde_json::from_value(value.clone())?),
        None => Ok(MRUData::default()),
    }
}

async fn on_mru_restore(ctx: &Context, request: &Envelope) -> Result<Value, HostError> {
    let trace_id = ctx.get_trace_id();
    let plugin_name = display_name(request);
    let instance = find_instance(request)?;
    let api = instance
        .api()
        .ok_or_else(|| HostError::Other(format!("plugin not initialized: {}", plugin_name)))?;

    let callback_id = request.param_str("callbackId");
    let callback = api.get_mru_restore_callback(&callback_id).ok_or_else(|| {
        HostError::Other(format!("mru restore callback not found: {}", callback_id))
    })?;

    let mru_data = decode_mru(request)?;
    match callback(mru_data).await {
        Ok(Some(mut result)) => {
            intern_result_callbacks(&instance, &mut result);
            Ok(serde_json::to_value(&result)?)
        }
        Ok(None) => Ok(Value::Null),
        Err(e) => {
            Logger::error(&trace_id, &format!("<{}> mru restore failed: {}", plugin_name, e));
            Err(e.into())
        }
    }
}

async fn on_llm_stream(ctx: &Context, request: &Envelope) -> Result<Value, HostError> {
    let trace_id = ctx.get_trace_id();
    let plugin_name = display_name(request);
    let instance = find_instance(request)?;
    let api = instance
        .api()
        .ok_or_else(|| HostError::Other(format!("plugin not initialized: {}", plugin_name)))?;

    let callback_id = request.param_str("CallbackId");
    let Some(callback) = api.get_llm_stream_callback(&callback_id) else {
        Logger::error(
            &trace_id,
            &format!("<{}> llm stream callback not found: {}", plugin_name, callback_id),
        );
        return Ok(Value::Null);
    };

    let stream_type_raw = request.param_str("StreamType");
    let Some(stream_type) = ChatStreamDataType::parse(&stream_type_raw) else {
        Logger::error(&trace_id, &format!("unknown llm stream type: {}", stream_type_raw));
        return Ok(Value::Null);
    };

    // Streams are fire-and-forward: the callback is synchronous and never
    // awaited.
    callback(stream_type, request.param_str("Data"), request.param_str("Reasoning"));
    Ok(Value::Null)
}
