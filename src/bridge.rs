//! One-shot credential handoff from an embedding parent window.
//!
//! The frame subscribes to inbound cross-window messages and waits for
//! `{ type: "START_EVENT", data: { token, app_session_id } }`. On the first
//! message carrying both fields non-empty it resolves, posts a single
//! `{ type: "STOP_EVENT" }` to the configured parent origin and ignores
//! everything after that.
//!
//! ## States
//!
//! `Idle` -> `Received` -> `Acknowledged` -> `Unsubscribed`
//!
//! A listener that never matches goes straight from `Idle` to `Unsubscribed`
//! when it is cancelled, dropped, or its optional timeout fires.
//!
//! The browser `window` is reached only through [`MessagePort`], so the bridge
//! runs the same against [`MemoryPort`] in tests and against
//! `platform::WindowPort` on wasm32.

use crate::config::Config;
use crate::debug::{self, cat};
use crate::error::BridgeError;
use crate::platform;
use futures::future::{select, Either};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

pub const START_EVENT: &str = "START_EVENT";
pub const STOP_EVENT: &str = "STOP_EVENT";

/// Token and application session id handed over by the parent window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub token: String,
    pub app_session_id: String,
}

/// One inbound cross-window message as seen by a handler.
#[derive(Clone, Debug, PartialEq)]
pub struct PortMessage {
    pub origin: String,
    pub data: Value,
}

impl PortMessage {
    pub fn new(origin: impl Into<String>, data: Value) -> Self {
        Self {
            origin: origin.into(),
            data,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

pub type MessageHandler = Box<dyn FnMut(&PortMessage) + Send>;

/// The messaging capability of the host window.
pub trait MessagePort: Send + Sync {
    /// Register `handler` for every inbound message until `unsubscribe`.
    fn subscribe(&self, handler: MessageHandler) -> ListenerId;
    /// Remove a handler. Unknown ids are ignored.
    fn unsubscribe(&self, id: ListenerId);
    /// Post `payload` to the parent window, restricted to `target_origin`.
    fn post_to_parent(&self, payload: &Value, target_origin: &str);
}

#[derive(Deserialize)]
struct StartEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Option<StartEventData>,
}

#[derive(Deserialize)]
struct StartEventData {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    app_session_id: Option<String>,
}

/// Extract credentials from a `START_EVENT` message.
///
/// Returns `None` for any other type, for non-object payloads and when either
/// field is missing, null, non-string or empty.
pub fn match_start_event(data: &Value) -> Option<Credentials> {
    let msg = StartEvent::deserialize(data).ok()?;
    if msg.kind != START_EVENT {
        return None;
    }
    let fields = msg.data?;
    match (fields.token, fields.app_session_id) {
        (Some(token), Some(app_session_id)) if !token.is_empty() && !app_session_id.is_empty() => {
            Some(Credentials {
                token,
                app_session_id,
            })
        }
        _ => None,
    }
}

/// The acknowledgment posted back to the parent.
pub fn stop_event() -> Value {
    json!({ "type": STOP_EVENT })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BridgeState {
    Idle,
    Received,
    Acknowledged,
    Unsubscribed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BridgeOptions {
    /// Origin the acknowledgment is posted to. Never `*`.
    pub target_origin: String,
    /// `None` waits until a match or cancellation.
    pub timeout: Option<Duration>,
    /// Also require inbound messages to come from `target_origin`.
    pub verify_origin: bool,
}

impl BridgeOptions {
    pub fn new(target_origin: impl Into<String>) -> Self {
        Self {
            target_origin: target_origin.into(),
            timeout: None,
            verify_origin: false,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self {
            target_origin: cfg.parent_origin.clone(),
            timeout: cfg.credential_timeout_ms.map(Duration::from_millis),
            verify_origin: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn verify_origin(mut self, on: bool) -> Self {
        self.verify_origin = on;
        self
    }
}

pub struct CredentialBridge<P: MessagePort> {
    port: Arc<P>,
    options: BridgeOptions,
}

impl<P: MessagePort + 'static> CredentialBridge<P> {
    pub fn new(port: Arc<P>, options: BridgeOptions) -> Self {
        Self { port, options }
    }

    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    /// Subscribe and return the handle for this one credential handoff.
    ///
    /// Each call is an independent subscription; a fresh `listen` after a
    /// completed one waits for a new `START_EVENT`.
    pub fn listen(&self) -> CredentialListener<P> {
        let (tx, rx) = oneshot::channel();
        let state = Arc::new(Mutex::new(BridgeState::Idle));

        let mut pending = Some(tx);
        let port = Arc::clone(&self.port);
        let handler_state = Arc::clone(&state);
        let target_origin = self.options.target_origin.clone();
        let verify_origin = self.options.verify_origin;

        let handler: MessageHandler = Box::new(move |msg: &PortMessage| {
            if pending.is_none() {
                return;
            }
            if verify_origin && msg.origin != target_origin {
                debug::log(
                    cat::BRIDGE,
                    format!("ignoring message from foreign origin {}", msg.origin),
                );
                return;
            }
            let Some(creds) = match_start_event(&msg.data) else {
                debug::log(cat::BRIDGE, "ignoring non-matching message");
                return;
            };

            set_state(&handler_state, BridgeState::Received);
            log::info!("[bridge] {} received from {}", START_EVENT, msg.origin);
            if let Some(tx) = pending.take() {
                let _ = tx.send(creds);
            }
            port.post_to_parent(&stop_event(), &target_origin);
            set_state(&handler_state, BridgeState::Acknowledged);
            debug::log(
                cat::BRIDGE,
                format!("{} posted to {}", STOP_EVENT, target_origin),
            );
        });

        let id = self.port.subscribe(handler);
        debug::log(cat::BRIDGE, format!("listener {:?} subscribed", id));

        CredentialListener {
            port: Arc::clone(&self.port),
            id: Some(id),
            rx: Some(rx),
            timeout: self.options.timeout,
            state,
        }
    }
}

/// Handle for a pending credential handoff.
///
/// Dropping the handle (or the future returned by [`credentials`]) releases
/// the subscription whether or not a message ever arrived.
///
/// [`credentials`]: CredentialListener::credentials
pub struct CredentialListener<P: MessagePort> {
    port: Arc<P>,
    id: Option<ListenerId>,
    rx: Option<oneshot::Receiver<Credentials>>,
    timeout: Option<Duration>,
    state: Arc<Mutex<BridgeState>>,
}

impl<P: MessagePort> CredentialListener<P> {
    pub fn id(&self) -> Option<ListenerId> {
        self.id
    }

    pub fn state(&self) -> BridgeState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(BridgeState::Unsubscribed)
    }

    /// Wait for the matching message, then unsubscribe.
    pub async fn credentials(mut self) -> Result<Credentials, BridgeError> {
        let rx = self.rx.take().ok_or(BridgeError::Closed)?;

        let outcome = match self.timeout {
            None => rx.await.map_err(|_| BridgeError::Closed),
            Some(limit) => {
                let sleep = Box::pin(platform::sleep(limit));
                match select(rx, sleep).await {
                    Either::Left((res, _)) => res.map_err(|_| BridgeError::Closed),
                    Either::Right(_) => {
                        log::warn!("[bridge] no {} within {:?}", START_EVENT, limit);
                        Err(BridgeError::Timeout(limit))
                    }
                }
            }
        };

        self.release();
        outcome
    }

    /// Non-blocking check, for callers that poll once per frame.
    pub fn try_take(&mut self) -> Option<Credentials> {
        let creds = self.rx.as_mut()?.try_recv().ok()?;
        self.rx = None;
        self.release();
        Some(creds)
    }

    pub fn cancel(mut self) {
        self.release();
    }

    /// Detached handle that can release the subscription while the listener
    /// itself is parked inside [`credentials`](CredentialListener::credentials).
    ///
    /// Cancelling drops the registered handler, so a pending wait ends with
    /// [`BridgeError::Closed`].
    pub fn cancel_handle(&self) -> CancelHandle<P> {
        CancelHandle {
            port: Arc::clone(&self.port),
            id: self.id,
            state: Arc::clone(&self.state),
        }
    }

    fn release(&mut self) {
        if let Some(id) = self.id.take() {
            self.port.unsubscribe(id);
            set_state(&self.state, BridgeState::Unsubscribed);
            debug::log(cat::BRIDGE, format!("listener {:?} unsubscribed", id));
        }
    }
}

impl<P: MessagePort> Drop for CredentialListener<P> {
    fn drop(&mut self) {
        self.release();
    }
}

pub struct CancelHandle<P: MessagePort> {
    port: Arc<P>,
    id: Option<ListenerId>,
    state: Arc<Mutex<BridgeState>>,
}

impl<P: MessagePort> CancelHandle<P> {
    /// Unsubscribe now. Repeated calls and calls after completion do nothing.
    pub fn cancel(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        if self.is_released() {
            return;
        }
        self.port.unsubscribe(id);
        set_state(&self.state, BridgeState::Unsubscribed);
        debug::log(cat::BRIDGE, format!("listener {:?} cancelled", id));
    }

    fn is_released(&self) -> bool {
        self.state
            .lock()
            .map(|s| *s == BridgeState::Unsubscribed)
            .unwrap_or(true)
    }
}

fn set_state(state: &Mutex<BridgeState>, next: BridgeState) {
    if let Ok(mut s) = state.lock() {
        *s = next;
    }
}

/// In-process [`MessagePort`]: inbound messages are injected with
/// [`dispatch`](MemoryPort::dispatch) and outbound ones recorded.
#[derive(Default)]
pub struct MemoryPort {
    next_id: Mutex<u64>,
    handlers: Mutex<Vec<(ListenerId, MessageHandler)>>,
    sent: Mutex<Vec<(Value, String)>>,
}

impl MemoryPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver one inbound message to every current handler.
    pub fn dispatch(&self, msg: PortMessage) {
        if let Ok(mut handlers) = self.handlers.lock() {
            for (_, handler) in handlers.iter_mut() {
                handler(&msg);
            }
        }
    }

    /// Outbound messages posted so far, as `(payload, target_origin)`.
    pub fn sent(&self) -> Vec<(Value, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn listener_count(&self) -> usize {
        self.handlers.lock().map(|h| h.len()).unwrap_or_default()
    }

    /// Drop every handler, as a host page does on unload.
    pub fn clear(&self) {
        if let Ok(mut handlers) = self.handlers.lock() {
            handlers.clear();
        }
    }
}

impl MessagePort for MemoryPort {
    fn subscribe(&self, handler: MessageHandler) -> ListenerId {
        let id = match self.next_id.lock() {
            Ok(mut n) => {
                *n += 1;
                ListenerId(*n)
            }
            Err(_) => ListenerId(0),
        };
        if let Ok(mut handlers) = self.handlers.lock() {
            handlers.push((id, handler));
        }
        id
    }

    fn unsubscribe(&self, id: ListenerId) {
        if let Ok(mut handlers) = self.handlers.lock() {
            handlers.retain(|(hid, _)| *hid != id);
        }
    }

    fn post_to_parent(&self, payload: &Value, target_origin: &str) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((payload.clone(), target_origin.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_start_event() {
        let creds = match_start_event(
            &json!({"type": "START_EVENT", "data": {"token": "abc", "app_session_id": "s1"}}),
        )
        .unwrap();
        assert_eq!(creds.token, "abc");
        assert_eq!(creds.app_session_id, "s1");
    }

    #[test]
    fn test_match_rejects_wrong_type_and_missing_fields() {
        let cases = [
            json!({"type": "OTHER", "data": {"token": "abc", "app_session_id": "s1"}}),
            json!({"type": "START_EVENT", "data": {"token": "abc"}}),
            json!({"type": "START_EVENT", "data": {"app_session_id": "s1"}}),
            json!({"type": "START_EVENT", "data": {"token": "", "app_session_id": "s1"}}),
            json!({"type": "START_EVENT", "data": {"token": "abc", "app_session_id": null}}),
            json!({"type": "START_EVENT", "data": {"token": 7, "app_session_id": "s1"}}),
            json!({"type": "START_EVENT"}),
            json!({"type": "START_EVENT", "data": null}),
            json!("START_EVENT"),
            json!(null),
            json!({"data": {"token": "abc", "app_session_id": "s1"}}),
        ];
        for case in cases {
            assert!(match_start_event(&case).is_none(), "matched {case}");
        }
    }

    #[test]
    fn test_match_ignores_extra_fields() {
        let v = json!({
            "type": "START_EVENT",
            "source": "wallet",
            "data": {"token": "abc", "app_session_id": "s1", "locale": "vi"}
        });
        assert!(match_start_event(&v).is_some());
    }

    #[test]
    fn test_stop_event_shape() {
        assert_eq!(stop_event(), json!({"type": "STOP_EVENT"}));
    }

    #[test]
    fn test_state_machine_transitions() {
        let port = Arc::new(MemoryPort::new());
        let bridge = CredentialBridge::new(port.clone(), BridgeOptions::new("https://host.example"));
        let mut listener = bridge.listen();
        assert_eq!(listener.state(), BridgeState::Idle);

        port.dispatch(PortMessage::new("https://host.example", json!({"type": "PING"})));
        assert_eq!(listener.state(), BridgeState::Idle);
        assert!(listener.try_take().is_none());

        port.dispatch(PortMessage::new(
            "https://host.example",
            json!({"type": "START_EVENT", "data": {"token": "abc", "app_session_id": "s1"}}),
        ));
        assert_eq!(listener.state(), BridgeState::Acknowledged);

        let creds = listener.try_take().unwrap();
        assert_eq!(creds.token, "abc");
        assert_eq!(listener.state(), BridgeState::Unsubscribed);
        assert_eq!(port.listener_count(), 0);
    }

    #[test]
    fn test_cancel_without_message_releases_subscription() {
        let port = Arc::new(MemoryPort::new());
        let bridge = CredentialBridge::new(port.clone(), BridgeOptions::new("https://host.example"));
        let listener = bridge.listen();
        assert_eq!(port.listener_count(), 1);
        listener.cancel();
        assert_eq!(port.listener_count(), 0);
        assert!(port.sent().is_empty());
    }

    #[test]
    fn test_cancel_handle_releases_and_is_idempotent() {
        let port = Arc::new(MemoryPort::new());
        let bridge = CredentialBridge::new(port.clone(), BridgeOptions::new("https://host.example"));
        let mut listener = bridge.listen();
        let mut handle = listener.cancel_handle();

        handle.cancel();
        assert_eq!(port.listener_count(), 0);
        assert_eq!(listener.state(), BridgeState::Unsubscribed);
        handle.cancel();

        port.dispatch(PortMessage::new(
            "https://host.example",
            json!({"type": "START_EVENT", "data": {"token": "abc", "app_session_id": "s1"}}),
        ));
        assert!(listener.try_take().is_none());
        assert!(port.sent().is_empty());
    }

    #[test]
    fn test_verify_origin_filters_foreign_sender() {
        let port = Arc::new(MemoryPort::new());
        let options = BridgeOptions::new("https://host.example").verify_origin(true);
        let bridge = CredentialBridge::new(port.clone(), options);
        let mut listener = bridge.listen();

        let start = json!({"type": "START_EVENT", "data": {"token": "abc", "app_session_id": "s1"}});
        port.dispatch(PortMessage::new("https://evil.example", start.clone()));
        assert!(listener.try_take().is_none());
        assert!(port.sent().is_empty());

        port.dispatch(PortMessage::new("https://host.example", start));
        assert!(listener.try_take().is_some());
        assert_eq!(port.sent().len(), 1);
    }

    #[test]
    fn test_options_from_config() {
        let mut cfg = Config::new("https://api.example.com", "https://host.example");
        cfg.credential_timeout_ms = Some(1500);
        let opts = BridgeOptions::from_config(&cfg);
        assert_eq!(opts.target_origin, "https://host.example");
        assert_eq!(opts.timeout, Some(Duration::from_millis(1500)));
        assert!(!opts.verify_origin);
    }
}
