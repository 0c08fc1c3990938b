use super::RequestsLoggingLevel;
use crate::config::AppConfig;
use crate::scraping::Orchestrator;

#[derive(Clone)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    /// Secret expected in `x-admin-key` or `?key=`. `None` locks the admin routes.
    pub admin_api_key: Option<String>,
    /// CORS origin. `None` allows any origin.
    pub allowed_origin: Option<String>,
    pub recent_logs_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 3001,
            admin_api_key: None,
            allowed_origin: None,
            recent_logs_limit: Orchestrator::DEFAULT_RECENT_LOGS,
        }
    }
}

impl From<&AppConfig> for ServerConfig {
    fn from(config: &AppConfig) -> Self {
        ServerConfig {
            requests_logging_level: config.logging_level.clone(),
            port: config.port,
            admin_api_key: config.admin_api_key.clone(),
            allowed_origin: config.allowed_origin.clone(),
            recent_logs_limit: config.recent_logs_limit,
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("requests_logging_level", &self.requests_logging_level)
            .field("port", &self.port)
            .field(
                "admin_api_key",
                &self.admin_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("allowed_origin", &self.allowed_origin)
            .field("recent_logs_limit", &self.recent_logs_limit)
            .finish()
    }
}
