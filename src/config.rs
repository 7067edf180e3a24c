//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración por argumentos CLI o variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./mini_http --port 8080 --trust-proxy --log-format json
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 LOG_LEVEL=debug ./mini_http
//! ```

use clap::{Parser, ValueEnum};

/// Niveles que acepta `--log-level`
const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Formato de salida de los logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Legible en terminal
    #[default]
    Pretty,
    /// Una línea JSON por evento
    Json,
}

/// Configuración del servidor HTTP/1.1
#[derive(Debug, Clone, Parser)]
#[command(name = "mini_http")]
#[command(about = "Servidor HTTP/1.1 mínimo con middleware y router")]
#[command(version)]
pub struct Config {
    /// Puerto en el que escucha el servidor (en 0.0.0.0)
    #[arg(short, long, default_value = "3000", env = "HTTP_PORT")]
    pub port: u16,

    /// Confiar en X-Forwarded-For / X-Forwarded-Host
    #[arg(long = "trust-proxy", env = "TRUST_PROXY")]
    pub trust_proxy: bool,

    /// Nivel de log si RUST_LOG no está definido
    #[arg(long = "log-level", default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,

    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Pretty, env = "LOG_FORMAT")]
    pub log_format: LogFormat,
}

impl Config {
    /// Parsea argumentos CLI (y variables de entorno)
    pub fn new() -> Self {
        Config::parse()
    }

    /// Dirección de bind (`0.0.0.0:port`)
    ///
    /// # Ejemplo
    /// ```rust
    /// use mini_http::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "0.0.0.0:3000");
    /// ```
    pub fn address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<(), String> {
        let level = self.log_level.trim().to_ascii_lowercase();
        if level.is_empty() {
            return Err("Log level must not be empty".to_string());
        }
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(format!(
                "Unknown log level '{}' (expected one of: {})",
                self.log_level,
                LOG_LEVELS.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            port: 3000,
            trust_proxy: false,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}
