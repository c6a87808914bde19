use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can pass a plain map.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("FOODTRUCK_ENV", "development"))?;
    let bind_addr = parse_addr("FOODTRUCK_BIND_ADDR", "0.0.0.0:8000")?;
    let log_level = or_default("FOODTRUCK_LOG_LEVEL", "info");
    let seed_path = PathBuf::from(or_default("FOODTRUCK_SEED_PATH", "data/food-truck-data.csv"));

    let db_max_connections = parse_u32("FOODTRUCK_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("FOODTRUCK_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("FOODTRUCK_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    if db_min_connections > db_max_connections {
        return Err(invalid(
            "FOODTRUCK_DB_MIN_CONNECTIONS",
            format!(
                "{db_min_connections} exceeds FOODTRUCK_DB_MAX_CONNECTIONS \
                 ({db_max_connections})"
            ),
        ));
    }

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        seed_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "FOODTRUCK_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}
