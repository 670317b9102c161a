//! Inbound message handling and call event fan-out.

use callwire_common::CallId;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::protocol::ServerMessage;
use crate::registry::SubscriberRegistry;
use crate::types::EventKey;

// ---------------------------------------------------------------------------
// Fan-out
// ---------------------------------------------------------------------------

/// Event names and payloads produced by one `call_event`, in dispatch order:
///
/// 1. `call_<id>` with `data` unchanged, when the call id is present;
/// 2. `call_event` with `{callId, ...data}`;
/// 3. `data.type` with the same merged payload, when `data` names a type.
///
/// Fields in `data` win over the injected `callId`. Non-object `data` is not
/// merged, so `call_event` then receives just `{callId}`.
pub fn call_event_dispatches(call_id: Option<&CallId>, data: &Value) -> Vec<(String, Value)> {
    let mut dispatches = Vec::with_capacity(3);

    if let Some(call_id) = call_id.filter(|id| !is_blank(id)) {
        dispatches.push((call_id.channel(), data.clone()));
    }

    let mut merged = Map::new();
    if let Some(call_id) = call_id {
        if let Ok(value) = serde_json::to_value(call_id) {
            merged.insert("callId".into(), value);
        }
    }
    if let Value::Object(fields) = data {
        merged.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    let merged = Value::Object(merged);

    let specific = event_type(data);
    dispatches.push((EventKey::CallEvent.as_key().into_owned(), merged.clone()));
    if let Some(kind) = specific {
        dispatches.push((kind, merged));
    }

    dispatches
}

fn is_blank(call_id: &CallId) -> bool {
    matches!(call_id, CallId::Text(text) if text.is_empty())
}

/// The specific event name carried in `data.type`. Empty, zero, false and
/// null types name nothing.
fn event_type(data: &Value) -> Option<String> {
    match data.get("type")? {
        Value::String(kind) if !kind.is_empty() => Some(kind.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".into()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Message Handler
// ---------------------------------------------------------------------------

/// Dispatch a decoded server message to the registry and the log.
pub(crate) fn handle_server_message(message: ServerMessage, registry: &SubscriberRegistry) {
    match message {
        ServerMessage::Connection { message } => {
            info!(greeting = message.as_deref().unwrap_or(""), "Call event server connected");
        }
        ServerMessage::CallEvent { call_id, data } => {
            debug!(call_id = ?call_id, "Call event received");
            for (event, payload) in call_event_dispatches(call_id.as_ref(), &data) {
                registry.trigger(&event, &payload);
            }
        }
        ServerMessage::Subscribed { call_id } => {
            info!(call_id = ?call_id, "Subscribed to call events");
        }
        ServerMessage::Pong { .. } => {
            debug!("Heartbeat acknowledged");
        }
        ServerMessage::Error { message } => {
            error!(
                detail = message.as_deref().unwrap_or("unknown error"),
                "Call event server error"
            );
        }
        ServerMessage::Unrecognized { kind, .. } => {
            warn!(kind = ?kind, "Unknown message type from call event server");
        }
    }
}

/// Decode a text frame and handle it. Undecodable frames are logged and
/// dropped without touching the connection.
pub(crate) fn handle_text_frame(text: &str, registry: &SubscriberRegistry) {
    match ServerMessage::from_text(text) {
        Ok(message) => handle_server_message(message, registry),
        Err(e) => warn!(error = %e, "Dropping malformed message from call event server"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[test]
    fn call_event_fans_out_three_ways() {
        let id = CallId::from("c1");
        let dispatches = call_event_dispatches(Some(&id), &json!({"type": "ringing", "x": 1}));

        assert_eq!(
            dispatches,
            vec![
                ("call_c1".to_string(), json!({"type": "ringing", "x": 1})),
                (
                    "call_event".to_string(),
                    json!({"callId": "c1", "type": "ringing", "x": 1})
                ),
                (
                    "ringing".to_string(),
                    json!({"callId": "c1", "type": "ringing", "x": 1})
                ),
            ]
        );
    }

    #[test]
    fn untyped_data_skips_specific_dispatch() {
        let id = CallId::from(9_i64);
        let dispatches = call_event_dispatches(Some(&id), &json!({"duration": 30}));
        let names: Vec<&str> = dispatches.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["call_9", "call_event"]);
        assert_eq!(dispatches[1].1, json!({"callId": 9, "duration": 30}));
    }

    #[test]
    fn fractional_and_large_numeric_ids_keep_their_value() {
        for (frame, channel, id) in [
            (
                r#"{"type":"call_event","callId":1.5,"data":{"type":"ringing"}}"#,
                "call_1.5",
                json!(1.5),
            ),
            (
                r#"{"type":"call_event","callId":18446744073709551615,"data":{"type":"ringing"}}"#,
                "call_18446744073709551615",
                json!(u64::MAX),
            ),
        ] {
            let registry = SubscriberRegistry::new();
            let seen = Arc::new(Mutex::new(Vec::new()));
            for name in [channel, "call_event", "ringing"] {
                let seen = Arc::clone(&seen);
                registry.on(name, move |data| seen.lock().unwrap().push((name, data.clone())));
            }

            handle_text_frame(frame, &registry);
            let merged = json!({"callId": id, "type": "ringing"});
            assert_eq!(
                *seen.lock().unwrap(),
                vec![
                    (channel, json!({"type": "ringing"})),
                    ("call_event", merged.clone()),
                    ("ringing", merged),
                ]
            );
        }
    }

    #[test]
    fn missing_call_id_skips_narrowcast() {
        let dispatches = call_event_dispatches(None, &json!({"type": "ended"}));
        assert_eq!(
            dispatches,
            vec![
                ("call_event".to_string(), json!({"type": "ended"})),
                ("ended".to_string(), json!({"type": "ended"})),
            ]
        );
    }

    #[test]
    fn data_call_id_overrides_envelope() {
        let id = CallId::from("outer");
        let dispatches = call_event_dispatches(Some(&id), &json!({"callId": "inner"}));
        assert_eq!(dispatches[1].1["callId"], "inner");
    }

    #[test]
    fn non_object_data_is_not_merged() {
        let id = CallId::from("c2");
        let dispatches = call_event_dispatches(Some(&id), &json!("raw"));
        assert_eq!(
            dispatches,
            vec![
                ("call_c2".to_string(), json!("raw")),
                ("call_event".to_string(), json!({"callId": "c2"})),
            ]
        );
    }

    #[test]
    fn blank_types_name_nothing() {
        for data in [json!({"type": ""}), json!({"type": 0}), json!({"type": null})] {
            assert_eq!(call_event_dispatches(None, &data).len(), 1);
        }
        let numeric = call_event_dispatches(None, &json!({"type": 3}));
        assert_eq!(numeric[1].0, "3");
    }

    #[test]
    fn handler_triggers_registry_in_order() {
        let registry = SubscriberRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for name in ["ringing", "call_event", "call_c1"] {
            let seen = Arc::clone(&seen);
            registry.on(name, move |_| seen.lock().unwrap().push(name));
        }

        handle_text_frame(
            r#"{"type":"call_event","callId":"c1","data":{"type":"ringing"}}"#,
            &registry,
        );
        assert_eq!(*seen.lock().unwrap(), vec!["call_c1", "call_event", "ringing"]);
    }

    #[test]
    fn malformed_and_unknown_frames_trigger_nothing() {
        let registry = SubscriberRegistry::new();
        let hits = Arc::new(Mutex::new(0));
        for name in ["call_event", "error", "presence"] {
            let hits = Arc::clone(&hits);
            registry.on(name, move |_| *hits.lock().unwrap() += 1);
        }

        handle_text_frame("not json{", &registry);
        handle_text_frame(r#"{"type":"presence"}"#, &registry);
        handle_text_frame(r#"{"type":"error","message":"server side"}"#, &registry);
        assert_eq!(*hits.lock().unwrap(), 0);
    }
}
