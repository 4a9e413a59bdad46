use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use brewers_api::mailer::SmtpSettings;

/// Secrets that ship in sample env files and must never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &["", "change-me", "dev-secret-change-me", "secret"];

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub token_secret: Vec<u8>,
    pub base_url: String,
    /// `None` when no SMTP host is set; mail is logged instead.
    pub smtp: Option<SmtpSettings>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = lookup("BREWERS_JWT_SECRET").unwrap_or_default();
        if PLACEHOLDER_SECRETS.contains(&jwt_secret.trim()) {
            bail!("BREWERS_JWT_SECRET must be set to a real secret");
        }

        let token_secret = match lookup("BREWERS_TOKEN_SECRET") {
            Some(secret) if !PLACEHOLDER_SECRETS.contains(&secret.trim()) => secret,
            Some(_) => bail!("BREWERS_TOKEN_SECRET must be a real secret when set"),
            None => {
                info!("BREWERS_TOKEN_SECRET not set, signing invites with the JWT secret");
                jwt_secret.clone()
            }
        };

        let smtp = match lookup("BREWERS_SMTP_HOST").filter(|h| !h.trim().is_empty()) {
            Some(host) => Some(SmtpSettings {
                port: parse_or(&lookup, "BREWERS_SMTP_PORT", 587)?,
                username: lookup("BREWERS_SMTP_USERNAME"),
                password: lookup("BREWERS_SMTP_PASSWORD"),
                from: lookup("BREWERS_SMTP_FROM")
                    .unwrap_or_else(|| "BrewersBuddy <noreply@brewersbuddy.local>".into()),
                host,
            }),
            None => {
                warn!("BREWERS_SMTP_HOST not set, outgoing mail will only be logged");
                None
            }
        };

        let base_url = or_default(&lookup, "BREWERS_BASE_URL", "http://localhost:3000");

        Ok(Self {
            host: or_default(&lookup, "BREWERS_HOST", "0.0.0.0"),
            port: parse_or(&lookup, "BREWERS_PORT", 3000)?,
            db_path: PathBuf::from(or_default(&lookup, "BREWERS_DB_PATH", "brewers.db")),
            jwt_secret,
            token_secret: token_secret.into_bytes(),
            base_url: base_url.trim_end_matches('/').to_string(),
            smtp,
        })
    }
}

fn or_default(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr + Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {key} value: {raw}")),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
