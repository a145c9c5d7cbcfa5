//! Filterable debug logging
//!
//! Categories: API, BRIDGE, SESSION, CONFIG
//! Enable via: --debug / POSTBOARD_DEBUG=all (native, see config), ?pbdebug=bridge,session (web)
//! or localStorage.setItem('postboard.debug','all')

use std::sync::atomic::{AtomicU32, Ordering};

pub mod cat {
    pub const API: u32 = 1 << 0;
    pub const BRIDGE: u32 = 1 << 1;
    pub const SESSION: u32 = 1 << 2;
    pub const CONFIG: u32 = 1 << 3;
    pub const ALL: u32 = 0xffff_ffff;
}

static MASK: AtomicU32 = AtomicU32::new(0);

#[inline]
pub fn set(mask: u32) {
    MASK.store(mask, Ordering::Relaxed)
}

#[inline]
pub fn is(cat: u32) -> bool {
    (MASK.load(Ordering::Relaxed) & cat) != 0
}

#[inline]
pub fn cat_name(cat: u32) -> &'static str {
    match cat {
        c if c == cat::API => "api",
        c if c == cat::BRIDGE => "bridge",
        c if c == cat::SESSION => "session",
        c if c == cat::CONFIG => "config",
        _ => "misc",
    }
}

/// Parse a comma-separated category list. `none` resets, unknown names are skipped.
pub fn parse_list(list: &str) -> u32 {
    let mut m: u32 = 0;
    for tok in list.split(',').map(|s| s.trim().to_ascii_lowercase()) {
        match tok.as_str() {
            "" | "none" => m = 0,
            "all" => m = cat::ALL,
            "api" => m |= cat::API,
            "bridge" => m |= cat::BRIDGE,
            "session" => m |= cat::SESSION,
            "config" => m |= cat::CONFIG,
            _ => {}
        }
    }
    m
}

#[inline]
pub fn set_from_list(list: &str) {
    set(parse_list(list));
}

#[cfg(target_arch = "wasm32")]
pub fn init_from_url_and_storage_once() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        use web_sys::window;
        if let Some(win) = window() {
            // URL query: ?pbdebug=bridge,session
            if let Ok(search) = win.location().search() {
                let qs = search.trim_start_matches('?');
                for part in qs.split('&') {
                    let mut it = part.splitn(2, '=');
                    let key = it.next().unwrap_or_default();
                    let val = it.next().unwrap_or_default();
                    if key.eq_ignore_ascii_case("pbdebug") {
                        let decoded = urlencoding::decode(val)
                            .map(|v| v.into_owned())
                            .unwrap_or_default();
                        set_from_list(&decoded);
                    }
                }
            }
            // localStorage: postboard.debug = "all"
            if let Ok(Some(storage)) = win.local_storage() {
                if let Ok(Some(v)) = storage.get_item("postboard.debug") {
                    set_from_list(&v);
                }
            }
        }
        log(cat::CONFIG, "debug init (wasm) complete");
    });
}

#[cfg(target_arch = "wasm32")]
#[inline]
pub fn log(cat: u32, msg: impl AsRef<str>) {
    if !is(cat) {
        return;
    }
    let s = format!("[postboard][{}] {}", cat_name(cat), msg.as_ref());
    web_sys::console::log_1(&wasm_bindgen::JsValue::from_str(&s));
}

#[cfg(not(target_arch = "wasm32"))]
#[inline]
pub fn log(cat: u32, msg: impl AsRef<str>) {
    if !is(cat) {
        return;
    }
    eprintln!("[postboard][{}] {}", cat_name(cat), msg.as_ref());
}
