//! In-memory holder for the credentials received from the parent window.
//! - Nothing is persisted; a reload starts empty until the parent sends again
//! - Readers get empty strings while nothing has arrived
//! - Debug category: [postboard][session]
use crate::bridge::Credentials;
use crate::debug::{self, cat};
use std::sync::{Arc, Mutex, OnceLock};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    pub token: Option<String>,
    pub app_session_id: Option<String>,
}

static STATE: OnceLock<Arc<Mutex<SessionState>>> = OnceLock::new();

fn state_ref() -> &'static Arc<Mutex<SessionState>> {
    STATE.get_or_init(|| Arc::new(Mutex::new(SessionState::default())))
}

#[inline]
pub fn state() -> SessionState {
    if let Ok(guard) = state_ref().lock() {
        guard.clone()
    } else {
        SessionState::default()
    }
}

pub fn store(creds: Credentials) {
    if let Ok(mut s) = state_ref().lock() {
        s.token = Some(creds.token);
        s.app_session_id = Some(creds.app_session_id);
    }
    debug::log(cat::SESSION, "credentials stored");
}

pub fn clear() {
    if let Ok(mut s) = state_ref().lock() {
        *s = SessionState::default();
    }
    debug::log(cat::SESSION, "credentials cleared");
}

/// Returns true once both token and session id are present and non-empty.
#[inline]
pub fn has_credentials() -> bool {
    let s = state();
    matches!(
        (s.token.as_deref(), s.app_session_id.as_deref()),
        (Some(t), Some(id)) if !t.is_empty() && !id.is_empty()
    )
}

/// Current token, or `""` before the parent has sent one.
#[inline]
pub fn token() -> String {
    state().token.unwrap_or_default()
}

/// Current application session id, or `""` before the parent has sent one.
#[inline]
pub fn app_session_id() -> String {
    state().app_session_id.unwrap_or_default()
}

pub fn credentials() -> Option<Credentials> {
    let s = state();
    match (s.token, s.app_session_id) {
        (Some(token), Some(app_session_id)) => Some(Credentials {
            token,
            app_session_id,
        }),
        _ => None,
    }
}
