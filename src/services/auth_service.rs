use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::UserRole;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub role: String,
    pub exp: i64,
    pub iat: i64,
    pub token_type: String,
}

pub struct AuthService {
    config: Config,
}

impl AuthService {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn generate_access_token(&self, user_id: Uuid, role: UserRole) -> AppResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.config.jwt_access_expiry);

        let claims = Claims {
            sub: user_id.to_string(),
            role: role.as_str().to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            token_type: "access".to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(AppError::from)
    }

    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )?;

        Ok(token_data.claims)
    }

    pub fn hash_password(password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }

    /// One-time password handed to the admin when a tenant account is created.
    pub fn generate_temporary_password() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(12)
            .map(char::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::password_hash::{PasswordHash, PasswordVerifier};

    fn config() -> Config {
        Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_url: "postgres://localhost/kos".to_string(),
            jwt_secret: "test-secret".to_string(),
            jwt_access_expiry: 900,
            minio_endpoint: "http://localhost:9000".to_string(),
            minio_access_key: "minioadmin".to_string(),
            minio_secret_key: "minioadmin".to_string(),
            minio_bucket: "kos".to_string(),
            minio_public_url: None,
            ledger_utc_offset_hours: 7,
        }
    }

    #[test]
    fn test_token_roundtrip() {
        let service = AuthService::new(config());
        let user_id = Uuid::new_v4();
        let token = service.generate_access_token(user_id, UserRole::Tenant).unwrap();

        let claims = service.verify_token(&token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, "tenant");
        assert_eq!(claims.token_type, "access");
    }

    #[test]
    fn test_token_with_other_secret_is_rejected() {
        let token = AuthService::new(config())
            .generate_access_token(Uuid::new_v4(), UserRole::Admin)
            .unwrap();

        let mut other = config();
        other.jwt_secret = "another-secret".to_string();
        assert!(matches!(
            AuthService::new(other).verify_token(&token),
            Err(AppError::Jwt(_))
        ));
    }

    #[test]
    fn test_password_hashing() {
        let password = AuthService::generate_temporary_password();
        assert_eq!(password.len(), 12);

        let hash = AuthService::hash_password(&password).unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok());
        assert!(Argon2::default().verify_password(b"wrong", &parsed).is_err());
    }
}
