use std::env;

use chrono::{FixedOffset, Offset, Utc};

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_access_expiry: i64,
    pub minio_endpoint: String,
    pub minio_access_key: String,
    pub minio_secret_key: String,
    pub minio_bucket: String,
    pub minio_public_url: Option<String>,
    /// Offset of the business timezone, used to decide what "today" is for
    /// overdue and reminder checks. Defaults to WIB (UTC+7).
    pub ledger_utc_offset_hours: i32,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            database_url: env::var("DATABASE_URL")?,
            jwt_secret: env::var("JWT_SECRET")?,
            jwt_access_expiry: env::var("JWT_ACCESS_EXPIRY")
                .unwrap_or_else(|_| "900".to_string())
                .parse()
                .unwrap_or(900),
            minio_endpoint: env::var("MINIO_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:9000".to_string()),
            minio_access_key: env::var("MINIO_ACCESS_KEY")
                .unwrap_or_else(|_| "minioadmin".to_string()),
            minio_secret_key: env::var("MINIO_SECRET_KEY")
                .unwrap_or_else(|_| "minioadmin".to_string()),
            minio_bucket: env::var("MINIO_BUCKET").unwrap_or_else(|_| "kos".to_string()),
            minio_public_url: env::var("MINIO_PUBLIC_URL").ok(),
            ledger_utc_offset_hours: env::var("LEDGER_UTC_OFFSET_HOURS")
                .unwrap_or_else(|_| "7".to_string())
                .parse()
                .unwrap_or(7),
        })
    }

    pub fn business_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.ledger_utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_offset(hours: i32) -> Config {
        Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_url: "postgres://localhost/kos".to_string(),
            jwt_secret: "secret".to_string(),
            jwt_access_expiry: 900,
            minio_endpoint: "http://localhost:9000".to_string(),
            minio_access_key: "minioadmin".to_string(),
            minio_secret_key: "minioadmin".to_string(),
            minio_bucket: "kos".to_string(),
            minio_public_url: None,
            ledger_utc_offset_hours: hours,
        }
    }

    #[test]
    fn test_business_offset() {
        assert_eq!(config_with_offset(7).business_offset().local_minus_utc(), 7 * 3600);
        // out-of-range offsets fall back to UTC
        assert_eq!(config_with_offset(99).business_offset().local_minus_utc(), 0);
    }
}
