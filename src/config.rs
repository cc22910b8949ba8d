use std::env;

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup and
/// immutable afterwards; handlers and extractors pull it out of `AppState` via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Postgres connection string. `None` (local only) selects the in-memory store.
    pub db_url: Option<String>,
    // Address the HTTP server binds to.
    pub bind_addr: String,
    // Single browser origin allowed to call the API with credentials.
    pub cors_origin: String,
    // Absolute lifetime of a session token, in seconds.
    pub session_ttl_secs: u64,
    // S3-compatible storage endpoint URL (MinIO locally).
    pub s3_endpoint: String,
    pub s3_region: String,
    pub s3_key: String,
    pub s3_secret: String,
    // Bucket holding uploaded photo files.
    pub s3_bucket: String,
    // Runtime environment marker. Controls cookie flags and log format.
    pub env: Env,
}

/// Env
///
/// Runtime context: local development (MinIO, optional database, plain-HTTP cookies)
/// versus production (mandatory secrets, secure cookies, JSON logs).
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8081";
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;

impl Default for AppConfig {
    /// default
    ///
    /// Non-panicking configuration for tests: in-memory store, local MinIO defaults.
    fn default() -> Self {
        Self {
            db_url: None,
            bind_addr: "127.0.0.1:0".to_string(),
            cors_origin: DEFAULT_CORS_ORIGIN.to_string(),
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            s3_endpoint: "http://localhost:9000".to_string(),
            s3_region: "us-east-1".to_string(),
            s3_key: "admin".to_string(),
            s3_secret: "password".to_string(),
            s3_bucket: "photo-test".to_string(),
            env: Env::Local,
        }
    }
}

fn session_ttl_from_env() -> u64 {
    match env::var("SESSION_TTL_SECS") {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("SESSION_TTL_SECS={} is not a number, using default", raw);
            DEFAULT_SESSION_TTL_SECS
        }),
        Err(_) => DEFAULT_SESSION_TTL_SECS,
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables, fail-fast.
    ///
    /// # Panics
    /// Panics in production when `DATABASE_URL`, `S3_ENDPOINT`, `S3_ACCESS_KEY` or
    /// `S3_SECRET_KEY` is missing, so the service never starts half-configured.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let cors_origin =
            env::var("CORS_ORIGIN").unwrap_or_else(|_| DEFAULT_CORS_ORIGIN.to_string());
        let session_ttl_secs = session_ttl_from_env();

        match env {
            Env::Local => Self {
                env: Env::Local,
                // Optional locally: without it the service runs on the in-memory store.
                db_url: env::var("DATABASE_URL").ok(),
                bind_addr,
                cors_origin,
                session_ttl_secs,
                s3_endpoint: env::var("S3_ENDPOINT")
                    .unwrap_or_else(|_| "http://localhost:9000".to_string()),
                s3_region: "us-east-1".to_string(),
                s3_key: "admin".to_string(),
                s3_secret: "password".to_string(),
                s3_bucket: env::var("S3_BUCKET_NAME")
                    .unwrap_or_else(|_| "photo-uploads".to_string()),
            },
            Env::Production => Self {
                env: Env::Production,
                db_url: Some(
                    env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in prod"),
                ),
                bind_addr,
                cors_origin,
                session_ttl_secs,
                s3_endpoint: env::var("S3_ENDPOINT")
                    .expect("FATAL: S3_ENDPOINT required in prod"),
                s3_region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                s3_key: env::var("S3_ACCESS_KEY").expect("FATAL: S3_ACCESS_KEY required in prod"),
                s3_secret: env::var("S3_SECRET_KEY")
                    .expect("FATAL: S3_SECRET_KEY required in prod"),
                s3_bucket: env::var("S3_BUCKET_NAME")
                    .unwrap_or_else(|_| "photo-uploads".to_string()),
            },
        }
    }
}
