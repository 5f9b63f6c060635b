pub mod batch;
pub mod config;
pub mod credentials;
pub mod db;
pub mod filter;
pub mod index;
pub mod models;
pub mod selection;
pub mod sort;
pub mod store;
pub mod upload;
pub mod vault;

pub use vault::{VaultError, VaultState};

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `config::default_log_filter()`.
/// Safe to call more than once: later calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();

    tracing::info!("{} core v{}", config::APP_NAME, config::APP_VERSION);
}
