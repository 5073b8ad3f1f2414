pub mod commands;
pub mod config;
pub mod core_state;
pub mod files;
pub mod library;
pub mod premium;
pub mod producer;
pub mod qr;
pub mod store;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::config::LibraryConfig;
use crate::core_state::{CoreError, CoreState};

/// Install the fmt subscriber. `RUST_LOG` wins over the default filter.
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}

/// Entry point for the app shell: logging, then the shared state rooted at
/// the configured data directory.
pub fn start() -> Result<Arc<CoreState>, CoreError> {
    init_tracing();
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let state = CoreState::open(LibraryConfig::from_env())?;
    Ok(Arc::new(state))
}
