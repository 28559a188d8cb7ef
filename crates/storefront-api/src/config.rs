//! Server configuration read from environment variables.

use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use storefront_outbox::config::DispatcherConfig;

use crate::error::AppError;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Everything the server needs at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `PostgreSQL` connection string (`DATABASE_URL`).
    pub database_url: String,
    /// Bind address (`HOST`).
    pub host: String,
    /// Bind port (`PORT`).
    pub port: u16,
    /// Pool size (`DATABASE_MAX_CONNECTIONS`).
    pub database_max_connections: u32,
    /// Outbox dispatcher settings (`OUTBOX_*`).
    pub dispatcher: DispatcherConfig,
    /// Kafka REST proxy base URL (`KAFKA_REST_URL`). Without it, messages go
    /// to an in-process channel.
    pub kafka_rest_url: Option<String>,
}

impl AppConfig {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value cannot be parsed.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };

        let database_url = var("DATABASE_URL").ok_or_else(|| {
            AppError::Config("DATABASE_URL environment variable must be set".to_owned())
        })?;
        let host = var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_owned());
        let port = parse_or(var("PORT"), "PORT", DEFAULT_PORT)?;
        let database_max_connections = parse_or(
            var("DATABASE_MAX_CONNECTIONS"),
            "DATABASE_MAX_CONNECTIONS",
            DEFAULT_MAX_CONNECTIONS,
        )?;

        let defaults = DispatcherConfig::default();
        let mut dispatcher = DispatcherConfig {
            enabled: parse_or(
                var("OUTBOX_DISPATCHER_ENABLED"),
                "OUTBOX_DISPATCHER_ENABLED",
                defaults.enabled,
            )?,
            poll_interval: millis_or(
                var("OUTBOX_POLL_INTERVAL_MS"),
                "OUTBOX_POLL_INTERVAL_MS",
                defaults.poll_interval,
            )?,
            batch_size: parse_or(
                var("OUTBOX_BATCH_SIZE"),
                "OUTBOX_BATCH_SIZE",
                defaults.batch_size,
            )?,
            default_topic: var("OUTBOX_TOPIC").unwrap_or(defaults.default_topic),
            send_timeout: millis_or(
                var("OUTBOX_SEND_TIMEOUT_MS"),
                "OUTBOX_SEND_TIMEOUT_MS",
                defaults.send_timeout,
            )?,
            ..DispatcherConfig::default()
        };
        if dispatcher.batch_size == 0 {
            return Err(AppError::Config(
                "OUTBOX_BATCH_SIZE must be greater than 0".to_owned(),
            ));
        }
        if let Some(routes) = var("OUTBOX_TOPIC_ROUTES") {
            for (aggregate_type, topic) in parse_routes(&routes)? {
                dispatcher = dispatcher.with_topic_route(aggregate_type, topic);
            }
        }

        Ok(Self {
            database_url,
            host,
            port,
            database_max_connections,
            dispatcher,
            kafka_rest_url: var("KAFKA_REST_URL"),
        })
    }

    /// The address to bind the HTTP listener to.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `HOST:PORT` is not a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw
            .to_ascii_lowercase()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} is invalid ({raw:?}): {e}"))),
    }
}

fn millis_or(value: Option<String>, key: &str, default: Duration) -> Result<Duration, AppError> {
    let millis: u64 = match value {
        None => return Ok(default),
        some => parse_or(some, key, 0)?,
    };
    if millis == 0 {
        return Err(AppError::Config(format!("{key} must be greater than 0")));
    }
    Ok(Duration::from_millis(millis))
}

/// Parses `Aggregate=topic,Other=topic2`.
fn parse_routes(raw: &str) -> Result<Vec<(String, String)>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((aggregate_type, topic))
                if !aggregate_type.trim().is_empty() && !topic.trim().is_empty() =>
            {
                Ok((aggregate_type.trim().to_owned(), topic.trim().to_owned()))
            }
            _ => Err(AppError::Config(format!(
                "OUTBOX_TOPIC_ROUTES entry {entry:?} must look like Aggregate=topic"
            ))),
        })
        .collect()
}
