use std::time::Duration;

pub async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}

/// `RUST_LOG` still overrides `level` when set.
#[cfg(feature = "native")]
pub fn init_logging(level: log::LevelFilter) {
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

#[cfg(not(feature = "native"))]
pub fn init_logging(level: log::LevelFilter) {
    log::set_max_level(level);
}

pub fn install_panic_hook() {}
