//! JWT Token 处理
//!
//! 顾客与药房共用同一签发者，角色写入 Claims

use chrono::{Duration, Utc};
use commerce::models::{Actor, ActorRole};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// JWT 配置
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// 签名密钥
    pub secret: String,
    /// Token 过期时间（秒）
    pub expires_in_secs: i64,
    /// Token 签发者
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: "vetshop-dev-secret-change-in-production".to_string(),
            expires_in_secs: 7 * 86400,
            issuer: "vetshop-api".to_string(),
        }
    }
}

/// JWT Claims（Token 载荷）
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// 账户 ID（顾客或药房）
    pub sub: String,
    pub role: ActorRole,
    /// 展示名称
    pub name: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

impl Claims {
    /// 转换为领域层操作者
    pub fn actor(&self) -> Result<Actor, ApiError> {
        let id: i64 = self
            .sub
            .parse()
            .map_err(|_| ApiError::Unauthorized("无效的账户 ID".to_string()))?;

        Ok(Actor {
            role: self.role,
            id,
        })
    }
}

/// JWT 管理器
#[derive(Clone)]
pub struct JwtManager {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtManager {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// 生成 JWT Token，返回 (token, 过期时间戳)
    pub fn generate_token(
        &self,
        account_id: i64,
        role: ActorRole,
        name: &str,
    ) -> Result<(String, i64), ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.config.expires_in_secs);

        let claims = Claims {
            sub: account_id.to_string(),
            role,
            name: name.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.issuer.clone(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(format!("JWT 生成失败: {}", e)))?;

        Ok((token, exp.timestamp()))
    }

    /// 验证并解析 JWT Token
    pub fn verify_token(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ApiError::Unauthorized("Token 已过期".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    ApiError::Unauthorized("无效的 Token".to_string())
                }
                _ => ApiError::Unauthorized(format!("Token 验证失败: {}", e)),
            },
        )?;

        Ok(token_data.claims)
    }

    /// 基于现有 Claims 签发新 Token
    pub fn refresh_token(&self, claims: &Claims) -> Result<(String, i64), ApiError> {
        let actor = claims.actor()?;
        self.generate_token(actor.id, actor.role, &claims.name)
    }

    pub fn expires_in_secs(&self) -> i64 {
        self.config.expires_in_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_and_verify_token() {
        let manager = JwtManager::new(JwtConfig::default());

        let (token, exp) = manager
            .generate_token(42, ActorRole::Pharmacy, "Happy Paws")
            .unwrap();

        let claims = manager.verify_token(&token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.role, ActorRole::Pharmacy);
        assert_eq!(claims.exp, exp);
        assert_eq!(claims.actor().unwrap(), Actor::pharmacy(42));
    }

    #[test]
    fn test_invalid_token() {
        let manager = JwtManager::new(JwtConfig::default());
        assert!(manager.verify_token("invalid.token.here").is_err());
    }

    #[test]
    fn test_token_from_other_issuer_rejected() {
        let other = JwtManager::new(JwtConfig {
            issuer: "someone-else".to_string(),
            ..Default::default()
        });
        let (token, _) = other
            .generate_token(1, ActorRole::Customer, "Ana")
            .unwrap();

        let manager = JwtManager::new(JwtConfig::default());
        assert!(matches!(
            manager.verify_token(&token),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_refresh_keeps_identity() {
        let manager = JwtManager::new(JwtConfig::default());
        let (token, _) = manager
            .generate_token(7, ActorRole::Customer, "Ana")
            .unwrap();
        let claims = manager.verify_token(&token).unwrap();

        let (refreshed, _) = manager.refresh_token(&claims).unwrap();
        let again = manager.verify_token(&refreshed).unwrap();
        assert_eq!(again.sub, "7");
        assert_eq!(again.role, ActorRole::Customer);
        assert_eq!(again.name, "Ana");
    }
}
