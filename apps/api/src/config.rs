use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub redis_url: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub generation_timeout_secs: u64,
    pub resend_api_key: String,
    pub email_from: String,
    /// Public base URL of the web app, used for links in emails.
    pub app_url: String,
    pub assessment_cache_ttl_secs: u64,
    /// When set, voice sessions start from a pre-registered assistant
    /// instead of an inline model configuration.
    pub vapi_assistant_id: Option<String>,
    pub vapi_voice: String,
    /// Relay sessions with no request for this long are dropped.
    pub voice_session_ttl_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            database_max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 10)?,
            redis_url: require_env("REDIS_URL")?,
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            gemini_model: env_or("GEMINI_MODEL", "gemini-2.0-flash"),
            gemini_api_base: env_or(
                "GEMINI_API_BASE",
                "https://generativelanguage.googleapis.com/v1beta",
            ),
            generation_timeout_secs: parse_env("GENERATION_TIMEOUT_SECS", 120)?,
            resend_api_key: require_env("RESEND_API_KEY")?,
            email_from: env_or("EMAIL_FROM", "InterviewMirror <onboarding@resend.dev>"),
            app_url: env_or("APP_URL", "http://localhost:3000"),
            assessment_cache_ttl_secs: parse_env("ASSESSMENT_CACHE_TTL_SECS", 3600)?,
            vapi_assistant_id: std::env::var("VAPI_ASSISTANT_ID")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            vapi_voice: env_or("VAPI_VOICE", "jennifer-playht"),
            voice_session_ttl_secs: parse_env("VOICE_SESSION_TTL_SECS", 1800)?,
            port: parse_env("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number")),
        Err(_) => Ok(default),
    }
}
