//! Minimal JS -> Rust surface for the embedded frame.
//!
//! ```javascript
//! import init, { postboard_init, CredentialWait, postboard_token } from "./postboard.js";
//! await init();
//! postboard_init();
//! const wait = new CredentialWait("https://wallet.example.com", 0);
//! // on unmount: wait.cancel() (or wait.free()) releases the message listener
//! const creds = await wait.credentials();
//! // creds = { token, app_session_id }; also readable later via postboard_token()
//! ```
//!
//! `postboard_await_credentials` is the one-call form for pages that never
//! tear the frame down before the parent answers.

#![cfg(target_arch = "wasm32")]

use crate::bridge::{BridgeOptions, CancelHandle, CredentialBridge, CredentialListener};
use crate::platform::{self, WindowPort};
use crate::{config, session};
use std::sync::Arc;
use wasm_bindgen::prelude::*;

/// Install the panic hook, console logger and debug mask.
#[wasm_bindgen]
pub fn postboard_init() {
    platform::install_panic_hook();
    platform::init_logging(log::LevelFilter::Info);
    crate::debug::init_from_url_and_storage_once();
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// A pending wait for `START_EVENT`, subscribed as soon as it is constructed.
#[wasm_bindgen]
pub struct CredentialWait {
    listener: Option<CredentialListener<WindowPort>>,
    cancel: CancelHandle<WindowPort>,
}

#[wasm_bindgen]
impl CredentialWait {
    /// `timeout_ms == 0` waits until a match or `cancel()`.
    #[wasm_bindgen(constructor)]
    pub fn new(parent_origin: String, timeout_ms: u32) -> Result<CredentialWait, JsValue> {
        let timeout = (timeout_ms > 0).then_some(timeout_ms as u64);
        let cfg = config::for_frame(&parent_origin, timeout).map_err(js_err)?;
        let bridge = CredentialBridge::new(
            Arc::new(WindowPort::new()),
            BridgeOptions::from_config(&cfg),
        );
        let listener = bridge.listen();
        let cancel = listener.cancel_handle();
        Ok(CredentialWait {
            listener: Some(listener),
            cancel,
        })
    }

    /// Resolves with `{ token, app_session_id }` and stores the pair in the
    /// session. Rejects on timeout, on `cancel()`, or when called twice.
    pub fn credentials(&mut self) -> js_sys::Promise {
        let listener = self.listener.take();
        wasm_bindgen_futures::future_to_promise(async move {
            let listener = listener.ok_or_else(|| js_err("credentials() already called"))?;
            let creds = listener.credentials().await.map_err(js_err)?;
            session::store(creds.clone());
            let json = serde_json::to_string(&creds).map_err(js_err)?;
            js_sys::JSON::parse(&json)
        })
    }

    /// Release the `message` listener. A pending `credentials()` rejects.
    pub fn cancel(&mut self) {
        self.listener = None;
        self.cancel.cancel();
    }
}

/// Wait for `START_EVENT` from the parent and acknowledge it to `parent_origin`.
///
/// `timeout_ms == 0` waits indefinitely. Use [`CredentialWait`] when the wait
/// may need to be abandoned.
#[wasm_bindgen]
pub async fn postboard_await_credentials(
    parent_origin: String,
    timeout_ms: u32,
) -> Result<JsValue, JsValue> {
    let mut wait = CredentialWait::new(parent_origin, timeout_ms)?;
    wasm_bindgen_futures::JsFuture::from(wait.credentials()).await
}

/// Token received from the parent, or `""`.
#[wasm_bindgen]
pub fn postboard_token() -> String {
    session::token()
}

/// Application session id received from the parent, or `""`.
#[wasm_bindgen]
pub fn postboard_app_session_id() -> String {
    session::app_session_id()
}
