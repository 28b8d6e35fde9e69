use std::fmt;

use reqwest::Url;

/// Environment variables that must be present for the server to start
pub const REQUIRED_VARS: [&str; 3] = ["CLIENT_ID", "CLIENT_SECRET", "REDIRECT_URI"];

/// Scopes requested when none are configured
pub const DEFAULT_SCOPES: &str = "offline_access openid profile email accounting.transactions \
accounting.budgets.read accounting.reports.read accounting.journals.read accounting.settings \
accounting.settings.read accounting.contacts accounting.contacts.read accounting.attachments \
accounting.attachments.read files files.read assets assets.read projects projects.read \
payroll.employees payroll.payruns payroll.payslip payroll.timesheets payroll.settings";

/// Minimum key material accepted for cookie signing
const MIN_SESSION_SECRET_BYTES: usize = 64;

/// Longest accepted session inactivity expiry (one year)
pub const MAX_SESSION_TTL_MINUTES: i64 = 365 * 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsBackend {
    #[default]
    Rustls,
    NativeTls,
}

impl TlsBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rustls" => Some(Self::Rustls),
            "native-tls" | "native" => Some(Self::NativeTls),
            _ => None,
        }
    }
}

/// Startup configuration errors
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// One or more required variables are unset or blank
    Missing(Vec<&'static str>),

    /// A variable is set but cannot be used
    Invalid { var: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(vars) => write!(
                f,
                "Environment variables not all set ({}), check the .env file in the project root",
                vars.join(", ")
            ),
            ConfigError::Invalid { var, reason } => write!(f, "Invalid {}: {}", var, reason),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Server configuration
#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: Url,
    pub scopes: Vec<String>,
    /// Cookie signing key material; a random key is generated when absent
    pub session_secret: Option<Vec<u8>>,
    pub session_ttl_minutes: i64,
    /// Outbound proxy (http://, https:// or socks5://)
    pub proxy_url: Option<String>,
    pub tls_backend: TlsBackend,
}

// Keeps the client secret and signing key out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri.as_str())
            .field("scopes", &self.scopes.len())
            .field("session_ttl_minutes", &self.session_ttl_minutes)
            .field("proxy_url", &self.proxy_url)
            .field("tls_backend", &self.tls_backend)
            .finish_non_exhaustive()
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_session_ttl_minutes() -> i64 {
    24 * 60
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// All required variables are checked before any is used, so the error
    /// names every missing one at once.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let missing: Vec<&'static str> = REQUIRED_VARS
            .iter()
            .copied()
            .filter(|key| read(*key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let client_id = read("CLIENT_ID").unwrap_or_default();
        let client_secret = read("CLIENT_SECRET").unwrap_or_default();
        let redirect_uri = read("REDIRECT_URI")
            .unwrap_or_default()
            .parse::<Url>()
            .map_err(|e| ConfigError::Invalid {
                var: "REDIRECT_URI",
                reason: e.to_string(),
            })?;

        let port = match read("PORT") {
            Some(p) => p.parse::<u16>().map_err(|e| ConfigError::Invalid {
                var: "PORT",
                reason: e.to_string(),
            })?,
            None => default_port(),
        };

        let scopes: Vec<String> = read("XERO_SCOPES")
            .as_deref()
            .unwrap_or(DEFAULT_SCOPES)
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let session_secret = match read("SESSION_SECRET") {
            Some(secret) if secret.len() < MIN_SESSION_SECRET_BYTES => {
                return Err(ConfigError::Invalid {
                    var: "SESSION_SECRET",
                    reason: format!(
                        "must be at least {} bytes, got {}",
                        MIN_SESSION_SECRET_BYTES,
                        secret.len()
                    ),
                });
            }
            Some(secret) => Some(secret.into_bytes()),
            None => None,
        };

        let session_ttl_minutes = match read("SESSION_TTL_MINUTES") {
            Some(v) => match v.parse::<i64>() {
                Ok(n) if n > 0 && n <= MAX_SESSION_TTL_MINUTES => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "SESSION_TTL_MINUTES",
                        reason: format!(
                            "expected between 1 and {} minutes, got {:?}",
                            MAX_SESSION_TTL_MINUTES, v
                        ),
                    });
                }
            },
            None => default_session_ttl_minutes(),
        };

        let tls_backend = match read("TLS_BACKEND") {
            Some(v) => TlsBackend::parse(&v).ok_or_else(|| ConfigError::Invalid {
                var: "TLS_BACKEND",
                reason: format!("expected rustls or native-tls, got {:?}", v),
            })?,
            None => TlsBackend::default(),
        };

        Ok(Self {
            host: read("HOST").unwrap_or_else(default_host),
            port,
            client_id,
            client_secret,
            redirect_uri,
            scopes,
            session_secret,
            session_ttl_minutes,
            proxy_url: read("PROXY_URL"),
            tls_backend,
        })
    }

    /// Socket address to bind
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
