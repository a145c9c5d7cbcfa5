//! Platform abstraction (timers, logging, host window messaging).

cfg_if::cfg_if! {
    if #[cfg(target_arch = "wasm32")] {
        mod runtime_wasm;
        pub use runtime_wasm::{init_logging, install_panic_hook, sleep};

        mod window;
        pub use window::WindowPort;
    } else {
        mod runtime_native;
        pub use runtime_native::{init_logging, install_panic_hook, sleep};
    }
}
