//! Frame dispatch.
//!
//! One call per inbound frame, spawned by the wire layer so frames never
//! serialize behind each other. Requests get exactly one response frame
//! carrying the same id and method; responses complete the matching
//! outbound waiter; everything else is logged and dropped.

use serde_json::Value;
use uuid::Uuid;

use liblogger::Logger;
use libws::WsWriter;
use plugin_core::Context;

use crate::correlation;
use crate::envelope::{Envelope, WOX_JSONRPC_TYPE_REQUEST, WOX_JSONRPC_TYPE_RESPONSE};
use crate::handlers;

pub async fn handle_message(writer: WsWriter, message: String) {
    let envelope: Envelope = match serde_json::from_str(&message) {
        Ok(envelope) => envelope,
        Err(e) => {
            Logger::error(
                &Uuid::new_v4().to_string(),
                &format!("receive and handle msg error: {}, err: {}", message, e),
            );
            return;
        }
    };

    let trace_id = if envelope.trace_id.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        envelope.trace_id.clone()
    };

    match envelope.msg_type.as_str() {
        WOX_JSONRPC_TYPE_RESPONSE => {
            let outcome = match &envelope.error {
                Some(error) if !error.is_empty() => Err(error.clone()),
                _ => Ok(envelope.result.clone().unwrap_or(Value::Null)),
            };
            if !correlation::complete(&envelope.id, outcome) {
                Logger::error(
                    &trace_id,
                    &format!("no pending request for response id: {}", envelope.id),
                );
            }
        }
        WOX_JSONRPC_TYPE_REQUEST => {
            let ctx = Context::new_with_trace_id(trace_id.clone());
            let outcome = match handlers::handle_request(ctx, &envelope, writer.clone()).await {
                Ok(result) => Ok(result),
                Err(e) => {
                    Logger::error(&trace_id, &format!("handle request failed: {}", e));
                    Err(e.to_string())
                }
            };

            let response =
                Envelope::response(trace_id.clone(), envelope.id.clone(), envelope.method, outcome);
            match serde_json::to_string(&response) {
                Ok(frame) => {
                    if let Err(e) = writer.send_text(frame) {
                        Logger::error(&trace_id, &format!("failed to send response: {}", e));
                    }
                }
                Err(e) => {
                    Logger::error(&trace_id, &format!("failed to encode response: {}", e));
                }
            }
        }
        _ => {
            Logger::error(&trace_id, &format!("unknown message type: {}", message));
        }
    }
}
