// Configuration module entry point
// Loads the host and router configuration from file, environment and defaults

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{Config, HttpConfig, LoggingConfig, PerformanceConfig, RouterConfig, ServerConfig};

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "config.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("EXROUTER")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("router.filters")
                    .try_parsing(true),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("router.controllers_location", "controllers")?
            .set_default("router.script_extension", "php")?
            .set_default("router.launcher_folder_path", ".")?
            .set_default("router.pretty_print", true)?
            .set_default("router.production", false)?
            .set_default("router.suppress_nulls", true)?
            .set_default("router.show_stack_trace", true)?
            .set_default("router.show_header_banner", true)?
            .set_default("router.db_connection_auto", false)?
            .set_default("router.force_auto_db_init", false)?
            .set_default("router.filters", Vec::<String>::new())?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.default_content_type", "text/html; charset=utf-8")?
            .set_default("http.server_name", "exrouter")?
            .set_default("http.max_body_size", 10_485_760)? // 10MB
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}
