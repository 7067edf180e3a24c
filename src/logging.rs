//! # Logging
//! src/logging.rs
//!
//! Instala el subscriber de `tracing`. El filtro sale de `RUST_LOG` y, si
//! no está definido, de `--log-level`.

use crate::config::{Config, LogFormat};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Inicializa el logging global
///
/// Retorna `false` si ya había un subscriber instalado (p.ej. en tests);
/// en ese caso no se cambia nada.
pub fn init(config: &Config) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.trim()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_names(true)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(false)
            .with_thread_names(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .is_ok()
}
