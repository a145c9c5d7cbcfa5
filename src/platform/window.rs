//! `MessagePort` over the browser window: inbound `message` events on
//! `window`, outbound `postMessage` on `window.parent`.

use crate::bridge::{ListenerId, MessageHandler, MessagePort, PortMessage};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{window, MessageEvent};

thread_local! {
    static NEXT_ID: Cell<u64> = const { Cell::new(1) };
    static LISTENERS: RefCell<HashMap<u64, Closure<dyn FnMut(MessageEvent)>>> =
        RefCell::new(HashMap::new());
}

/// Zero-sized handle; the registered closures live in thread-local storage,
/// which is the only thread a browser page has.
#[derive(Clone, Copy, Debug, Default)]
pub struct WindowPort;

impl WindowPort {
    pub fn new() -> Self {
        Self
    }
}

fn js_to_json(v: &JsValue) -> Value {
    js_sys::JSON::stringify(v)
        .ok()
        .and_then(|s| s.as_string())
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or(Value::Null)
}

impl MessagePort for WindowPort {
    fn subscribe(&self, mut handler: MessageHandler) -> ListenerId {
        let id = NEXT_ID.with(|n| {
            let id = n.get();
            n.set(id + 1);
            id
        });

        let closure = Closure::wrap(Box::new(move |ev: MessageEvent| {
            let msg = PortMessage::new(ev.origin(), js_to_json(&ev.data()));
            handler(&msg);
        }) as Box<dyn FnMut(MessageEvent)>);

        if let Some(win) = window() {
            if let Err(e) =
                win.add_event_listener_with_callback("message", closure.as_ref().unchecked_ref())
            {
                log::error!("[bridge] addEventListener failed: {:?}", e);
            }
        }
        LISTENERS.with(|l| l.borrow_mut().insert(id, closure));
        ListenerId(id)
    }

    fn unsubscribe(&self, id: ListenerId) {
        let closure = LISTENERS.with(|l| l.borrow_mut().remove(&id.0));
        if let (Some(closure), Some(win)) = (closure, window()) {
            let _ = win
                .remove_event_listener_with_callback("message", closure.as_ref().unchecked_ref());
        }
    }

    fn post_to_parent(&self, payload: &Value, target_origin: &str) {
        let Some(win) = window() else {
            return;
        };
        let parent = match win.parent() {
            Ok(Some(p)) => p,
            _ => {
                log::warn!("[bridge] no parent window to acknowledge");
                return;
            }
        };
        let message = match js_sys::JSON::parse(&payload.to_string()) {
            Ok(m) => m,
            Err(e) => {
                log::error!("[bridge] could not encode outbound message: {:?}", e);
                return;
            }
        };
        if let Err(e) = parent.post_message(&message, target_origin) {
            log::error!("[bridge] postMessage to {} failed: {:?}", target_origin, e);
        }
    }
}
