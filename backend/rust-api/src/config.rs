use serde::Deserialize;
use std::env;
use std::str::FromStr;

use crate::services::unlock::UnresolvedPrerequisitePolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mongo_uri: String,
    pub mongo_database: String,
    /// Shared cache tier; the service runs on in-process caches alone when unset.
    pub redis_uri: Option<String>,
    pub bind_addr: String,
    pub otlp_endpoint: Option<String>,
    pub tasks: TaskSettings,
    pub modules: ModuleSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskSettings {
    pub daily_count: usize,
    pub fetch_limit: usize,
    pub cache_ttl_seconds: u64,
    pub cache_version: String,
    pub guest_min_videos: usize,
    pub record_usage_on_serve: bool,
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            daily_count: 5,
            fetch_limit: 50,
            cache_ttl_seconds: 30 * 60,
            cache_version: "2.0".to_string(),
            guest_min_videos: 3,
            record_usage_on_serve: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModuleSettings {
    pub catalog_ttl_seconds: u64,
    pub unresolved_prerequisites: UnresolvedPrerequisitePolicy,
}

impl Default for ModuleSettings {
    fn default() -> Self {
        Self {
            catalog_ttl_seconds: 5 * 60,
            unresolved_prerequisites: UnresolvedPrerequisitePolicy::Lock,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mongo_uri: "mongodb://localhost:27017".to_string(),
            mongo_database: "ecg_learning".to_string(),
            redis_uri: None,
            bind_addr: "0.0.0.0:8081".to_string(),
            otlp_endpoint: None,
            tasks: TaskSettings::default(),
            modules: ModuleSettings::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Root .env first (two levels up), then the local one
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/*.toml + ENV overrides (prefix: APP_)
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", app_env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let mongo_uri = settings
            .get_string("database.mongo_uri")
            .or_else(|_| env::var("MONGO_URI"))
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

        let mongo_database = settings
            .get_string("database.mongo_database")
            .or_else(|_| env::var("MONGO_DATABASE"))
            .unwrap_or_else(|_| "ecg_learning".to_string());

        let redis_uri = settings
            .get_string("redis.uri")
            .or_else(|_| env::var("REDIS_URI"))
            .ok()
            .filter(|uri| !uri.trim().is_empty());

        let bind_addr = settings
            .get_string("server.bind_addr")
            .or_else(|_| env::var("BIND_ADDR"))
            .unwrap_or_else(|_| "0.0.0.0:8081".to_string());

        let otlp_endpoint = settings
            .get_string("telemetry.otlp_endpoint")
            .or_else(|_| env::var("OTEL_EXPORTER_OTLP_ENDPOINT"))
            .ok()
            .filter(|endpoint| !endpoint.trim().is_empty());

        let task_defaults = TaskSettings::default();
        let tasks = TaskSettings {
            daily_count: lookup(&settings, "tasks.daily_count", "DAILY_TASK_COUNT")?
                .unwrap_or(task_defaults.daily_count),
            fetch_limit: lookup(&settings, "tasks.fetch_limit", "TASK_FETCH_LIMIT")?
                .unwrap_or(task_defaults.fetch_limit),
            cache_ttl_seconds: lookup(&settings, "tasks.cache_ttl_seconds", "TASK_CACHE_TTL_SECONDS")?
                .unwrap_or(task_defaults.cache_ttl_seconds),
            cache_version: settings
                .get_string("tasks.cache_version")
                .or_else(|_| env::var("TASK_CACHE_VERSION"))
                .unwrap_or(task_defaults.cache_version),
            guest_min_videos: lookup(&settings, "tasks.guest_min_videos", "GUEST_MIN_VIDEOS")?
                .unwrap_or(task_defaults.guest_min_videos),
            record_usage_on_serve: lookup(
                &settings,
                "tasks.record_usage_on_serve",
                "RECORD_USAGE_ON_SERVE",
            )?
            .unwrap_or(task_defaults.record_usage_on_serve),
        };

        let module_defaults = ModuleSettings::default();
        let modules = ModuleSettings {
            catalog_ttl_seconds: lookup(
                &settings,
                "modules.catalog_ttl_seconds",
                "CATALOG_TTL_SECONDS",
            )?
            .unwrap_or(module_defaults.catalog_ttl_seconds),
            unresolved_prerequisites: lookup(
                &settings,
                "modules.unresolved_prerequisites",
                "UNRESOLVED_PREREQUISITES",
            )?
            .unwrap_or(module_defaults.unresolved_prerequisites),
        };

        if tasks.fetch_limit == 0 {
            return Err(config::ConfigError::Message(
                "tasks.fetch_limit must be greater than zero".to_string(),
            ));
        }

        Ok(Config {
            mongo_uri,
            mongo_database,
            redis_uri,
            bind_addr,
            otlp_endpoint,
            tasks,
            modules,
        })
    }
}

/// Reads `key` from the layered settings, then `env_key` from the process
/// environment. Present but unparsable values are configuration errors.
fn lookup<T>(
    settings: &config::Config,
    key: &str,
    env_key: &str,
) -> Result<Option<T>, config::ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = match settings.get_string(key).or_else(|_| env::var(env_key)) {
        Ok(raw) => raw,
        Err(_) => return Ok(None),
    };

    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|e| config::ConfigError::Message(format!("invalid value for {}: {}", key, e)))
}
