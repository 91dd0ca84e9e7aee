//! Scenario tests for the dispatch engine, driven through the in-memory
//! writer channel: every frame the host would put on the socket lands on
//! the test's receiver instead.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::timeout;

use host_core::plugin_registry::{PluginInstance, PLUGIN_REGISTRY};
use host_core::{correlation, dispatch, plugin_loader, PluginApi};
use libws::WsWriter;
use plugin_core::{
    Context, Plugin, PluginError, PluginInitParams, PublicAPI, Query, QueryResult,
    RefreshableResult, ResultAction,
};

// The registry, correlation map and loader state are process globals;
// tests that touch them run one at a time.
static TEST_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

fn init_test_logger() {
    static ONCE: std::sync::Once = std::sync::Once::new();
    ONCE.call_once(|| {
        let dir = std::env::temp_dir().join(format!("host-dispatch-test-{}", std::process::id()));
        liblogger::Logger::update_log_directory(&dir.to_string_lossy());
    });
}

/// Plugin returning one result with two actions, all ids blank. Triggered
/// actions and refresh invocations report back on the channel.
struct DemoPlugin {
    events: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl Plugin for DemoPlugin {
    async fn init(&self, _ctx: Context, _params: PluginInitParams) -> Result<(), PluginError> {
        Ok(())
    }

    async fn query(&self, _ctx: Context, query: Query) -> Result<Vec<QueryResult>, PluginError> {
        let open_events = self.events.clone();
        let copy_events = self.events.clone();
        let refresh_events = self.events.clone();
        Ok(vec![QueryResult {
            title: format!("hello {}", query.search),
            actions: vec![
                ResultAction {
                    name: "open".into(),
                    action: Some(Arc::new(move |ctx| {
                        let events = open_events.clone();
                        Box::pin(async move {
                            let _ = events.send(format!("open:{}", ctx.context_data));
                        })
                    })),
                    ..ResultAction::default()
                },
                ResultAction {
                    name: "copy".into(),
                    action: Some(Arc::new(move |ctx| {
                        let events = copy_events.clone();
                        Box::pin(async move {
                            let _ = events.send(format!("copy:{}", ctx.context_data));
                        })
                    })),
                    ..ResultAction::default()
                },
            ],
            refresh_interval: 1000,
            on_refresh: Some(Arc::new(move |mut refreshable: RefreshableResult| {
                let events = refresh_events.clone();
                Box::pin(async move {
                    let restored = refreshable.actions.iter().filter(|a| a.action.is_some()).count();
                    let _ = events.send(format!("refresh:{}", restored));
                    refreshable.title = "refreshed".into();
                    // one brand new action with a blank id
                    refreshable.actions.push(ResultAction {
                        name: "new".into(),
                        action: Some(Arc::new(|_| Box::pin(async {}))),
                        ..ResultAction::default()
                    });
                    Ok(refreshable)
                })
            })),
            ..QueryResult::default()
        }])
    }
}

fn request_frame(id: &str, method: &str, plugin_id: &str, params: Value) -> String {
    json!({
        "Type": "WOX_JSONRPC_TYPE_REQUEST",
        "Id": id,
        "Method": method,
        "TraceId": format!("trace-{}", id),
        "PluginId": plugin_id,
        "PluginName": "demo",
        "Params": params,
    })
    .to_string()
}

async fn next_frame(rx: &mut UnboundedReceiver<String>) -> Value {
    let frame = timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for a frame")
        .expect("writer channel closed");
    serde_json::from_str(&frame).unwrap()
}

fn register_demo(plugin_id: &str) -> mpsc::UnboundedReceiver<String> {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let instance = PluginInstance::new(
        Box::new(DemoPlugin { events: events_tx }),
        format!("/tmp/{}", plugin_id),
        format!("{}.main", plugin_id),
        Vec::new(),
    );
    PLUGIN_REGISTRY.insert(plugin_id, instance).unwrap();
    events_rx
}

#[tokio::test]
async fn unknown_method_gets_error_response() {
    let _guard = TEST_LOCK.lock().await;
    init_test_logger();
    let (writer, mut rx) = WsWriter::pair();

    dispatch::handle_message(writer, request_frame("r1", "nope", "", json!({}))).await;

    let response = next_frame(&mut rx).await;
    assert_eq!(response["Type"], "WOX_JSONRPC_TYPE_RESPONSE");
    assert_eq!(response["Id"], "r1");
    assert_eq!(response["Error"], "unknown method handler: nope");
    assert!(response.get("Result").is_none());
}

#[tokio::test]
async fn malformed_frame_is_dropped_without_reply() {
    let _guard = TEST_LOCK.lock().await;
    init_test_logger();
    let (writer, mut rx) = WsWriter::pair();

    dispatch::handle_message(writer, "this is not json".to_string()).await;

    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn init_and_query_assign_ids_and_intern_actions() {
    let _guard = TEST_LOCK.lock().await;
    init_test_logger();
    let (writer, mut rx) = WsWriter::pair();
    let _events = register_demo("p1");

    dispatch::handle_message(
        writer.clone(),
        request_frame("r2", "init", "p1", json!({"PluginDirectory": "/tmp/p1"})),
    )
    .await;
    let init_response = next_frame(&mut rx).await;
    assert_eq!(init_response["Id"], "r2");
    assert_eq!(init_response["Result"], Value::Null);
    assert!(init_response.get("Error").is_none());

    dispatch::handle_message(
        writer.clone(),
        request_frame(
            "r3",
            "query",
            "p1",
            json!({"Type": "input", "RawQuery": "hello", "Search": "hello"}),
        ),
    )
    .await;
    let query_response = next_frame(&mut rx).await;
    assert_eq!(query_response["Id"], "r3");
    assert_eq!(query_response["TraceId"], "trace-r3");

    let results = query_response["Result"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    let result_id = results[0]["Id"].as_str().unwrap();
    assert!(!result_id.is_empty());

    let actions = results[0]["Actions"].as_array().unwrap();
    assert_eq!(actions.len(), 2);
    let first_id = actions[0]["Id"].as_str().unwrap();
    let second_id = actions[1]["Id"].as_str().unwrap();
    assert!(!first_id.is_empty());
    assert!(!second_id.is_empty());
    assert_ne!(first_id, second_id);

    // callback hygiene: the cache holds exactly the returned action ids
    let instance = PLUGIN_REGISTRY.get("p1").unwrap();
    assert!(instance.get_action(first_id).is_some());
    assert!(instance.get_action(second_id).is_some());
    assert_eq!(instance.actions.lock().unwrap().len(), 2);
    assert!(instance.get_refresh(result_id).is_some());

    // no callable ever reaches the wire
    for action in actions {
        assert!(action.get("action").is_none());
    }

    PLUGIN_REGISTRY.remove("p1");
}

#[tokio::test]
async fn action_is_answered_immediately_and_runs_detached() {
    let _guard = TEST_LOCK.lock().await;
    init_test_logger();
    let (writer, mut rx) = WsWriter::pair();
    let mut events = register_demo("p2");

    dispatch::handle_message(
        writer.clone(),
        request_frame("r1", "init", "p2", json!({"PluginDirectory": "/tmp/p2"})),
    )
    .await;
    next_frame(&mut rx).await;

    dispatch::handle_message(
        writer.clone(),
        request_frame("r2", "query", "p2", json!({"Search": "x"})),
    )
    .await;
    let query_response = next_frame(&mut rx).await;
    let action_id =
        query_response["Result"][0]["Actions"][0]["Id"].as_str().unwrap().to_string();

    dispatch::handle_message(
        writer.clone(),
        request_frame(
            "r3",
            "action",
            "p2",
            json!({"ActionId": action_id, "ContextData": "x"}),
        ),
    )
    .await;
    let action_response = next_frame(&mut rx).await;
    assert_eq!(action_response["Id"], "r3");
    assert_eq!(action_response["Result"], Value::Null);

    // the callback runs after the response, in bounded time
    let event = timeout(Duration::from_secs(2), events.recv()).await.unwrap().unwrap();
    assert_eq!(event, "open:x");

    // a stale id is logged, not an error reply
    dispatch::handle_message(
        writer.clone(),
        request_frame("r4", "action", "p2", json!({"ActionId": "gone", "ContextData": ""})),
    )
    .await;
    let stale_response = next_frame(&mut rx).await;
    assert_eq!(stale_response["Result"], Value::Null);
    assert!(stale_response.get("Error").is_none());

    PLUGIN_REGISTRY.remove("p2");
}

#[tokio::test]
async fn new_query_clears_stale_callbacks() {
    let _guard = TEST_LOCK.lock().await;
    init_test_logger();
    let (writer, mut rx) = WsWriter::pair();
    let _events = register_demo("p3");

    dispatch::handle_message(
        writer.clone(),
        request_frame("r1", "init", "p3", json!({"PluginDirectory": "/tmp/p3"})),
    )
    .await;
    next_frame(&mut rx).await;

    dispatch::handle_message(
        writer.clone(),
        request_frame("r2", "query", "p3", json!({"Search": "first"})),
    )
    .await;
    let first = next_frame(&mut rx).await;
    let stale_id = first["Result"][0]["Actions"][0]["Id"].as_str().unwrap().to_string();

    dispatch::handle_message(
        writer.clone(),
        request_frame("r3", "query", "p3", json!({"Search": "second"})),
    )
    .await;
    let second = next_frame(&mut rx).await;
    let fresh_id = second["Result"][0]["Actions"][0]["Id"].as_str().unwrap().to_string();

    let instance = PLUGIN_REGISTRY.get("p3").unwrap();
    assert!(instance.get_action(&stale_id).is_none());
    assert!(instance.get_action(&fresh_id).is_some());

    PLUGIN_REGISTRY.remove("p3");
}

#[tokio::test]
async fn refresh_restores_and_reinterns_actions() {
    let _guard = TEST_LOCK.lock().await;
    init_test_logger();
    let (writer, mut rx) = WsWriter::pair();
    let mut events = register_demo("p4");

    dispatch::handle_message(
        writer.clone(),
        request_frame("r1", "init", "p4", json!({"PluginDirectory": "/tmp/p4"})),
    )
    .await;
    next_frame(&mut rx).await;

    dispatch::handle_message(
        writer.clone(),
        request_frame("r2", "query", "p4", json!({"Search": "tick"})),
    )
    .await;
    let query_response = next_frame(&mut rx).await;
    let result = &query_response["Result"][0];
    let result_id = result["Id"].as_str().unwrap().to_string();
    let action_id = result["Actions"][0]["Id"].as_str().unwrap().to_string();

    // Wox sends the wire-stripped refreshable back
    let refreshable = json!({
        "Title": "hello tick",
        "RefreshInterval": 1000,
        "Actions": [{"Id": action_id, "Name": "open"}],
    })
    .to_string();
    dispatch::handle_message(
        writer.clone(),
        request_frame(
            "r3",
            "refresh",
            "p4",
            json!({"ResultId": result_id, "RefreshableResult": refreshable}),
        ),
    )
    .await;
    let refresh_response = next_frame(&mut rx).await;
    assert!(refresh_response.get("Error").is_none());
    assert_eq!(refresh_response["Result"]["Title"], "refreshed");

    // the cached callback was restored before the refresh ran
    let event = timeout(Duration::from_secs(2), events.recv()).await.unwrap().unwrap();
    assert_eq!(event, "refresh:1");

    // the brand new action got an id and is interned
    let refreshed_actions = refresh_response["Result"]["Actions"].as_array().unwrap();
    let new_action = refreshed_actions.iter().find(|a| a["Name"] == "new").unwrap();
    let new_id = new_action["Id"].as_str().unwrap();
    assert!(!new_id.is_empty());
    let instance = PLUGIN_REGISTRY.get("p4").unwrap();
    assert!(instance.get_action(new_id).is_some());

    // refresh for an unknown result id is an error
    dispatch::handle_message(
        writer.clone(),
        request_frame(
            "r4",
            "refresh",
            "p4",
            json!({"ResultId": "unknown", "RefreshableResult": "{}"}),
        ),
    )
    .await;
    let missing = next_frame(&mut rx).await;
    assert_eq!(missing["Error"], "refresh function not found for result id: unknown");

    PLUGIN_REGISTRY.remove("p4");
}

#[tokio::test]
async fn unload_removes_instance_and_search_path() {
    let _guard = TEST_LOCK.lock().await;
    init_test_logger();
    let (writer, mut rx) = WsWriter::pair();
    let _events = register_demo("p5");

    let plugin_dir = std::path::Path::new("/tmp/p5");
    plugin_loader::add_search_path(plugin_dir);
    assert!(plugin_loader::search_path_contains(plugin_dir));

    dispatch::handle_message(writer.clone(), request_frame("r1", "unloadPlugin", "p5", json!({})))
        .await;
    let response = next_frame(&mut rx).await;
    assert_eq!(response["Result"], Value::Null);

    assert!(PLUGIN_REGISTRY.get("p5").is_none());
    assert!(!plugin_loader::search_path_contains(plugin_dir));
    assert!(!plugin_loader::module_cached("p5.main"));

    // unloading again reports the plugin as unknown
    dispatch::handle_message(writer.clone(), request_frame("r2", "unloadPlugin", "p5", json!({})))
        .await;
    let second = next_frame(&mut rx).await;
    assert_eq!(second["Error"], "plugin not found: demo, forget to load plugin?");
}

#[tokio::test]
async fn outbound_calls_correlate_out_of_order() {
    let _guard = TEST_LOCK.lock().await;
    init_test_logger();
    let (writer, mut rx) = WsWriter::pair();

    let api = Arc::new(PluginApi::new(writer.clone(), "p6".into(), "demo".into()));
    let ctx = Context::new_with_trace_id("trace-e4".into());

    // three concurrent GetSetting calls
    let mut calls = Vec::new();
    for key in ["alpha", "beta", "gamma"] {
        let api = api.clone();
        let ctx = ctx.clone();
        calls.push(tokio::spawn(async move { api.get_setting(&ctx, key).await }));
    }

    // collect the three outbound request frames
    let mut requests = Vec::new();
    while requests.len() < 3 {
        let frame = next_frame(&mut rx).await;
        if frame["Type"] == "WOX_JSONRPC_TYPE_REQUEST" && frame["Method"] == "GetSetting" {
            requests.push(frame);
        }
    }

    for request in &requests {
        assert_eq!(request["TraceId"], "trace-e4");
        assert_eq!(request["PluginId"], "p6");
    }

    // answer them out of order: second, first, third
    for index in [1, 0, 2] {
        let request = &requests[index];
        let response = json!({
            "Type": "WOX_JSONRPC_TYPE_RESPONSE",
            "Id": request["Id"],
            "Method": "GetSetting",
            "TraceId": request["TraceId"],
            "Result": format!("value-of-{}", request["Params"]["key"].as_str().unwrap()),
        })
        .to_string();
        dispatch::handle_message(writer.clone(), response).await;
    }

    let mut resolved = Vec::new();
    for call in calls {
        resolved.push(call.await.unwrap().unwrap());
    }
    let expected: Vec<String> =
        ["value-of-alpha", "value-of-beta", "value-of-gamma"].map(String::from).to_vec();
    assert_eq!(resolved, expected);
    assert_eq!(correlation::pending(), 0);
}

#[tokio::test]
async fn mru_restore_and_llm_stream_route_to_registered_callbacks() {
    let _guard = TEST_LOCK.lock().await;
    init_test_logger();
    let (writer, mut rx) = WsWriter::pair();
    let _events = register_demo("p8");

    dispatch::handle_message(
        writer.clone(),
        request_frame("r1", "init", "p8", json!({"PluginDirectory": "/tmp/p8"})),
    )
    .await;
    next_frame(&mut rx).await;

    let api = PLUGIN_REGISTRY.get("p8").unwrap().api().unwrap();
    let ctx = Context::new_with_trace_id("trace-hooks".into());
    let (chunks_tx, mut chunks_rx) = mpsc::unbounded_channel::<String>();

    // register both hooks; each registration is itself a request Wox answers
    let registration = {
        let api = api.clone();
        let ctx = ctx.clone();
        tokio::spawn(async move {
            api.on_mru_restore(
                &ctx,
                Arc::new(|mru| {
                    Box::pin(async move {
                        Ok(Some(QueryResult {
                            title: format!("restored {}", mru.title),
                            actions: vec![ResultAction {
                                name: "reopen".into(),
                                action: Some(Arc::new(|_| Box::pin(async {}))),
                                ..ResultAction::default()
                            }],
                            ..QueryResult::default()
                        }))
                    })
                }),
            )
            .await
            .unwrap();
            api.llm_stream(
                &ctx,
                Vec::new(),
                Arc::new(move |stream_type, data, _reasoning| {
                    let _ = chunks_tx.send(format!("{:?}:{}", stream_type, data));
                }),
            )
            .await
            .unwrap();
        })
    };

    let mut mru_callback_id = String::new();
    let mut llm_callback_id = String::new();
    while mru_callback_id.is_empty() || llm_callback_id.is_empty() {
        let frame = next_frame(&mut rx).await;
        if frame["Type"] != "WOX_JSONRPC_TYPE_REQUEST" {
            continue;
        }
        let callback_id = frame["Params"]["callbackId"].as_str().unwrap_or("").to_string();
        match frame["Method"].as_str().unwrap() {
            "OnMRURestore" => mru_callback_id = callback_id,
            "LLMStream" => llm_callback_id = callback_id,
            _ => continue,
        }
        let ack = json!({
            "Type": "WOX_JSONRPC_TYPE_RESPONSE",
            "Id": frame["Id"],
            "Method": frame["Method"],
            "Result": null,
        })
        .to_string();
        dispatch::handle_message(writer.clone(), ack).await;
    }
    registration.await.unwrap();

    // Wox routes an MRU entry back through the registered callback id
    dispatch::handle_message(
        writer.clone(),
        request_frame(
            "r2",
            "onMRURestore",
            "p8",
            json!({"callbackId": mru_callback_id, "mruData": {"Title": "calc"}}),
        ),
    )
    .await;
    let restored = next_frame(&mut rx).await;
    assert_eq!(restored["Result"]["Title"], "restored calc");
    let restored_action_id = restored["Result"]["Actions"][0]["Id"].as_str().unwrap();
    assert!(!restored_action_id.is_empty());
    let instance = PLUGIN_REGISTRY.get("p8").unwrap();
    assert!(instance.get_action(restored_action_id).is_some());

    // stream chunks are forwarded without awaiting
    dispatch::handle_message(
        writer.clone(),
        request_frame(
            "r3",
            "onLLMStream",
            "p8",
            json!({"CallbackId": llm_callback_id, "StreamType": "streaming", "Data": "hel"}),
        ),
    )
    .await;
    next_frame(&mut rx).await;
    let chunk = timeout(Duration::from_secs(2), chunks_rx.recv()).await.unwrap().unwrap();
    assert_eq!(chunk, "Streaming:hel");

    // an unknown callback id is logged, not an error
    dispatch::handle_message(
        writer.clone(),
        request_frame(
            "r4",
            "onLLMStream",
            "p8",
            json!({"CallbackId": "gone", "StreamType": "finished", "Data": ""}),
        ),
    )
    .await;
    let response = next_frame(&mut rx).await;
    assert_eq!(response["Result"], Value::Null);
    assert!(response.get("Error").is_none());

    PLUGIN_REGISTRY.remove("p8");
}

#[tokio::test]
async fn response_with_unknown_id_is_dropped() {
    let _guard = TEST_LOCK.lock().await;
    init_test_logger();
    let (writer, mut rx) = WsWriter::pair();

    let orphan = json!({
        "Type": "WOX_JSONRPC_TYPE_RESPONSE",
        "Id": "never-sent",
        "Method": "GetSetting",
        "Result": "ignored",
    })
    .to_string();
    dispatch::handle_message(writer, orphan).await;

    assert!(rx.try_recv().is_err());
    assert_eq!(correlation::pending(), 0);
}

#[tokio::test]
async fn error_response_rejects_the_waiter() {
    let _guard = TEST_LOCK.lock().await;
    init_test_logger();
    let (writer, mut rx) = WsWriter::pair();

    let api = PluginApi::new(writer.clone(), "p7".into(), "demo".into());
    let ctx = Context::new_with_trace_id("trace-err".into());

    let call = tokio::spawn(async move { api.get_setting(&ctx, "missing").await });

    let request = next_frame(&mut rx).await;
    let response = json!({
        "Type": "WOX_JSONRPC_TYPE_RESPONSE",
        "Id": request["Id"],
        "Method": "GetSetting",
        "Error": "setting store unavailable",
    })
    .to_string();
    dispatch::handle_message(writer.clone(), response).await;

    let err = call.await.unwrap().unwrap_err();
    assert!(err.to_string().contains("setting store unavailable"));
}
