use serde::{Deserialize, Serialize};
use std::env;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub email: EmailConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub max_connections: usize,
    // Keep-alive duration in seconds
    pub keep_alive_seconds: u64,
    // Client timeout for reading payload/body in seconds
    pub client_timeout_seconds: u64,
    // Client shutdown timeout in seconds
    pub client_shutdown_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_seconds: u64,
}

/// Everything the credential manager needs, passed in at construction.
/// Nothing below the config layer reads the environment on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expires_in_hours: i64,
    pub jwt_cookie_expires_in_days: i64,
    pub bcrypt_cost: u32,
    pub reset_token_ttl_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub from_address: String,
    pub public_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .expect("PORT must be a valid number"),
                workers: env::var("WORKERS")
                    .unwrap_or_else(|_| "4".to_string())
                    .parse()
                    .expect("WORKERS must be a valid number"),
                max_connections: env::var("MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "1000".to_string())
                    .parse()
                    .expect("MAX_CONNECTIONS must be a valid number"),
                keep_alive_seconds: env::var("KEEP_ALIVE_SECONDS")
                    .unwrap_or_else(|_| "75".to_string())
                    .parse()
                    .expect("KEEP_ALIVE_SECONDS must be a valid number"),
                client_timeout_seconds: env::var("CLIENT_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .expect("CLIENT_TIMEOUT_SECONDS must be a valid number"),
                client_shutdown_seconds: env::var("CLIENT_SHUTDOWN_SECONDS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .expect("CLIENT_SHUTDOWN_SECONDS must be a valid number"),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
                max_connections: env::var("DB_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .expect("DB_MAX_CONNECTIONS must be a valid number"),
                connect_timeout_seconds: env::var("DB_CONNECT_TIMEOUT")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .expect("DB_CONNECT_TIMEOUT must be a valid number"),
            },
            auth: AuthConfig {
                jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
                jwt_expires_in_hours: env::var("JWT_EXPIRES_IN_HOURS")
                    .unwrap_or_else(|_| "24".to_string())
                    .parse()
                    .expect("JWT_EXPIRES_IN_HOURS must be a valid number"),
                jwt_cookie_expires_in_days: env::var("JWT_COOKIE_EXPIRES_IN_DAYS")
                    .unwrap_or_else(|_| "90".to_string())
                    .parse()
                    .expect("JWT_COOKIE_EXPIRES_IN_DAYS must be a valid number"),
                bcrypt_cost: env::var("BCRYPT_COST")
                    .unwrap_or_else(|_| "12".to_string())
                    .parse()
                    .expect("BCRYPT_COST must be a valid number"),
                reset_token_ttl_minutes: env::var("RESET_TOKEN_TTL_MINUTES")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .expect("RESET_TOKEN_TTL_MINUTES must be a valid number"),
            },
            email: EmailConfig {
                from_address: env::var("EMAIL_FROM")
                    .unwrap_or_else(|_| "hello@wildtrails.example".to_string()),
                public_base_url: env::var("PUBLIC_BASE_URL")
                    .unwrap_or_else(|_| "http://127.0.0.1:8080".to_string()),
            },
            logging: LoggingConfig {
                level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
                file_path: env::var("LOG_FILE_PATH").ok(),
            },
        })
    }
}
