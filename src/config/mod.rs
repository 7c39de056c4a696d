use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("API_SECRET must be set in {0:?} mode")]
    MissingSecret(Environment),

    #[error("Unsupported DB_DRIVER: {0}")]
    UnsupportedDriver(String),

    #[error("TOKEN_TTL_SECS must be between 1 and 31536000, got {0}")]
    TokenTtlOutOfRange(i64),
}

/// Upper bound on token lifetime: one year
pub const MAX_TOKEN_TTL_SECS: i64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub seed: SeedConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseDriver {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub name: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub driver: DatabaseDriver,
    /// Full connection string; wins over the individual DB_* parts when set
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub max_connections: u32,
    /// Row cap for every list endpoint (GET_LIMIT)
    pub get_limit: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub api_secret: String,
    pub token_ttl_secs: i64,
    /// bcrypt work factor for stored passwords
    pub bcrypt_cost: u32,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    /// MODE=DEBUG: drop and recreate the schema on start
    pub reset_on_start: bool,
    pub admin: Option<SeedAccount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedAccount {
    pub nickname: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        let config = match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_overrides(&lookup)?;

        if config.security.api_secret.is_empty() {
            return Err(ConfigError::MissingSecret(config.environment));
        }

        Ok(config)
    }

    fn with_overrides<F>(mut self, lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // API overrides
        if let Some(v) = lookup("APP_NAME") {
            self.api.name = v;
        }
        if let Some(v) = lookup("APP_HOST") {
            self.api.host = v;
        }
        if let Some(v) = lookup("APP_PORT").or_else(|| lookup("PORT")) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }

        // Database overrides
        if let Some(v) = lookup("DB_DRIVER") {
            self.database.driver = match v.to_ascii_lowercase().as_str() {
                "postgres" | "postgresql" => DatabaseDriver::Postgres,
                "memory" => DatabaseDriver::Memory,
                other => return Err(ConfigError::UnsupportedDriver(other.to_string())),
            };
        }
        if let Some(v) = lookup("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Some(v) = lookup("DB_HOST") {
            self.database.host = v;
        }
        if let Some(v) = lookup("DB_PORT") {
            self.database.port = v.parse().unwrap_or(self.database.port);
        }
        if let Some(v) = lookup("DB_USER") {
            self.database.user = v;
        }
        if let Some(v) = lookup("DB_PASSWORD") {
            self.database.password = v;
        }
        if let Some(v) = lookup("DB_NAME") {
            self.database.name = v;
        }
        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Some(v) = lookup("GET_LIMIT") {
            self.database.get_limit = v
                .parse::<i64>()
                .ok()
                .filter(|limit| *limit > 0)
                .unwrap_or(self.database.get_limit);
        }

        // Security overrides
        if let Some(v) = lookup("API_SECRET") {
            self.security.api_secret = v;
        }
        if let Some(v) = lookup("TOKEN_TTL_SECS") {
            if let Ok(ttl) = v.parse::<i64>() {
                if !(1..=MAX_TOKEN_TTL_SECS).contains(&ttl) {
                    return Err(ConfigError::TokenTtlOutOfRange(ttl));
                }
                self.security.token_ttl_secs = ttl;
            }
        }
        if let Some(v) = lookup("BCRYPT_COST") {
            self.security.bcrypt_cost = v
                .parse::<u32>()
                .ok()
                .filter(|cost| (4..=31).contains(cost))
                .unwrap_or(self.security.bcrypt_cost);
        }
        if let Some(v) = lookup("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Seed overrides
        if let Some(v) = lookup("MODE") {
            self.seed.reset_on_start = v.eq_ignore_ascii_case("debug");
        }
        if let (Some(nickname), Some(email), Some(password)) =
            (lookup("USER_NAME"), lookup("USER_MAIL"), lookup("USER_PASS"))
        {
            self.seed.admin = Some(SeedAccount {
                nickname,
                email,
                password,
            });
        }

        Ok(self)
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            api: ApiConfig {
                name: "Doka API".to_string(),
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                driver: DatabaseDriver::Memory,
                url: None,
                host: "localhost".to_string(),
                port: 5432,
                user: "postgres".to_string(),
                password: String::new(),
                name: "doka".to_string(),
                max_connections: 10,
                get_limit: 100,
            },
            security: SecurityConfig {
                api_secret: "doka-development-secret".to_string(),
                token_ttl_secs: 60 * 60,
                bcrypt_cost: bcrypt::DEFAULT_COST,
                cors_origins: vec!["http://localhost:8080".to_string()],
            },
            seed: SeedConfig {
                reset_on_start: false,
                admin: None,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            api: ApiConfig {
                name: "Doka API".to_string(),
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                driver: DatabaseDriver::Postgres,
                url: None,
                host: "localhost".to_string(),
                port: 5432,
                user: "postgres".to_string(),
                password: String::new(),
                name: "doka".to_string(),
                max_connections: 20,
                get_limit: 100,
            },
            security: SecurityConfig {
                api_secret: String::new(),
                token_ttl_secs: 60 * 60,
                bcrypt_cost: bcrypt::DEFAULT_COST,
                cors_origins: vec!["https://staging.doka.guide".to_string()],
            },
            seed: SeedConfig {
                reset_on_start: false,
                admin: None,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            api: ApiConfig {
                name: "Doka API".to_string(),
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                driver: DatabaseDriver::Postgres,
                url: None,
                host: "localhost".to_string(),
                port: 5432,
                user: "postgres".to_string(),
                password: String::new(),
                name: "doka".to_string(),
                max_connections: 50,
                get_limit: 50,
            },
            security: SecurityConfig {
                api_secret: String::new(),
                token_ttl_secs: 60 * 60,
                bcrypt_cost: bcrypt::DEFAULT_COST,
                cors_origins: vec!["https://doka.guide".to_string()],
            },
            seed: SeedConfig {
                reset_on_start: false,
                admin: None,
            },
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self.environment, Environment::Development)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::from_vars(vars(&[])).unwrap();
        assert!(config.is_development());
        assert_eq!(config.database.driver, DatabaseDriver::Memory);
        assert_eq!(config.security.token_ttl_secs, 3600);
        assert!(!config.security.api_secret.is_empty());
    }

    #[test]
    fn test_production_requires_secret() {
        let err = AppConfig::from_vars(vars(&[("APP_ENV", "production")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecret(Environment::Production)));

        let config =
            AppConfig::from_vars(vars(&[("APP_ENV", "prod"), ("API_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.database.driver, DatabaseDriver::Postgres);
        assert_eq!(config.security.api_secret, "s3cret");
    }

    #[test]
    fn test_env_overrides() {
        let config = AppConfig::from_vars(vars(&[
            ("DB_DRIVER", "postgres"),
            ("GET_LIMIT", "25"),
            ("TOKEN_TTL_SECS", "120"),
            ("BCRYPT_COST", "4"),
            ("MODE", "DEBUG"),
            ("USER_NAME", "admin"),
            ("USER_MAIL", "admin@doka.guide"),
            ("USER_PASS", "password"),
            ("SECURITY_CORS_ORIGINS", "https://a.example, https://b.example"),
        ]))
        .unwrap();

        assert_eq!(config.database.driver, DatabaseDriver::Postgres);
        assert_eq!(config.database.get_limit, 25);
        assert_eq!(config.security.token_ttl_secs, 120);
        assert_eq!(config.security.bcrypt_cost, 4);
        assert!(config.seed.reset_on_start);
        assert_eq!(config.seed.admin.as_ref().unwrap().email, "admin@doka.guide");
        assert_eq!(config.security.cors_origins.len(), 2);
    }

    #[test]
    fn test_invalid_numbers_keep_defaults() {
        let config =
            AppConfig::from_vars(vars(&[("GET_LIMIT", "-3"), ("TOKEN_TTL_SECS", "soon")])).unwrap();
        assert_eq!(config.database.get_limit, 100);
        assert_eq!(config.security.token_ttl_secs, 3600);
    }

    #[test]
    fn test_token_ttl_out_of_range_rejected() {
        for raw in ["1000000000000000", "9223372036854775807", "0", "-60"] {
            let err = AppConfig::from_vars(vars(&[("TOKEN_TTL_SECS", raw)])).unwrap_err();
            assert!(matches!(err, ConfigError::TokenTtlOutOfRange(_)), "{}", raw);
        }

        let max = MAX_TOKEN_TTL_SECS.to_string();
        let config = AppConfig::from_vars(vars(&[("TOKEN_TTL_SECS", max.as_str())])).unwrap();
        assert_eq!(config.security.token_ttl_secs, MAX_TOKEN_TTL_SECS);
    }

    #[test]
    fn test_unknown_driver_rejected() {
        let err = AppConfig::from_vars(vars(&[("DB_DRIVER", "mysql")])).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedDriver(d) if d == "mysql"));
    }
}
