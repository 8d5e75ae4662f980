//! JWT issuing and verification.
//!
//! Tokens come in pairs: a short-lived access token and a long-lived
//! refresh token carrying the same identity snapshot. The refresh token
//! embeds `at_hash` (base64url of the left half of SHA-256 over the access
//! token), so a refresh token is only usable together with the access
//! token it was issued with.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::JwtSettings;
use crate::error::Error;
use crate::models::{Claims, TokenUse, User};

/// An access/refresh token pair.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issues and verifies token pairs. Keys are derived once from the
/// configured secret; an unsupported algorithm is rejected here rather
/// than on first use.
#[derive(Clone)]
pub struct TokenIssuer {
    header: Header,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(settings: &JwtSettings) -> Result<Self, Error> {
        if settings.secret.is_empty() {
            return Err(Error::Config("JWT secret must not be empty".to_string()));
        }
        let algorithm = match settings.algorithm.as_str() {
            "HS256" => Algorithm::HS256,
            "HS384" => Algorithm::HS384,
            "HS512" => Algorithm::HS512,
            other => {
                return Err(Error::Config(format!("unsupported JWT algorithm: {other}")));
            }
        };
        Ok(Self {
            header: Header::new(algorithm),
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            algorithm,
            access_ttl: Duration::seconds(settings.access_ttl_secs),
            refresh_ttl: Duration::seconds(settings.refresh_ttl_secs),
        })
    }

    // @zen-impl: AUTH-3_AC-1
    /// Issue a fresh token pair for `user`, snapshotting its identity.
    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, Error> {
        let now = Utc::now();
        let access_claims = Claims {
            sub: user.id,
            name: user.name.clone(),
            surname: user.surname.clone(),
            phone: user.phone.clone(),
            city_id: user.city_id,
            password_hash: user.password_hash.clone(),
            available: user.available,
            exp: (now + self.access_ttl).timestamp(),
            iat: now.timestamp(),
            token_use: TokenUse::Access,
            at_hash: None,
        };
        let access_token = self.encode(&access_claims)?;
        let refresh_claims = Claims {
            exp: (now + self.refresh_ttl).timestamp(),
            token_use: TokenUse::Refresh,
            at_hash: Some(at_hash(&access_token)),
            ..access_claims
        };
        let refresh_token = self.encode(&refresh_claims)?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Decode and verify an access token, expiry included.
    pub fn decode_access(&self, token: &str) -> Result<Claims, Error> {
        let claims = self.decode(token, true)?;
        if claims.token_use != TokenUse::Access {
            return Err(Error::InvalidToken("not an access token".to_string()));
        }
        Ok(claims)
    }

    // @zen-impl: AUTH-3_AC-3
    /// Decode and verify a refresh token, checking its binding to the
    /// presented access token.
    pub fn decode_refresh(&self, refresh_token: &str, access_token: &str) -> Result<Claims, Error> {
        let claims = self.decode(refresh_token, true)?;
        if claims.token_use != TokenUse::Refresh {
            return Err(Error::InvalidToken("not a refresh token".to_string()));
        }
        if claims.at_hash.as_deref() != Some(at_hash(access_token).as_str()) {
            return Err(Error::InvalidToken(
                "refresh token is not bound to this access token".to_string(),
            ));
        }
        Ok(claims)
    }

    /// Decode an access token without validating its expiry. The refresh
    /// flow uses this to read the identity out of an access token that may
    /// already have lapsed; the signature is still verified.
    pub fn decode_access_unchecked_expiry(&self, token: &str) -> Result<Claims, Error> {
        let claims = self.decode(token, false)?;
        if claims.token_use != TokenUse::Access {
            return Err(Error::InvalidToken("not an access token".to_string()));
        }
        Ok(claims)
    }

    fn encode(&self, claims: &Claims) -> Result<String, Error> {
        encode(&self.header, claims, &self.encoding_key)
            .map_err(|e| Error::Internal(format!("jwt encode: {e}")))
    }

    fn decode(&self, token: &str, validate_exp: bool) -> Result<Claims, Error> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = validate_exp;
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => Error::TokenExpired,
                _ => Error::InvalidToken(e.to_string()),
            })
    }
}

/// base64url of the left half of SHA-256 over the token string.
fn at_hash(access_token: &str) -> String {
    let digest = Sha256::digest(access_token.as_bytes());
    URL_SAFE_NO_PAD.encode(&digest[..16])
}

/// Parsed bearer headers: the `Authorization: Bearer <token>` header plus
/// an optional sibling `refresh` header. Parsing is purely syntactic;
/// whether the token verifies or has expired is the decoder's business.
#[derive(Debug, Clone)]
pub struct BearerHeaders {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl BearerHeaders {
    pub fn parse(authorization: Option<&str>, refresh: Option<&str>) -> Result<Self, Error> {
        let header = authorization
            .ok_or_else(|| Error::Unauthorized("missing authorization header".to_string()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| Error::Unauthorized("authorization scheme must be Bearer".to_string()))?;
        if token.is_empty() {
            return Err(Error::Unauthorized("empty bearer token".to_string()));
        }
        Ok(Self {
            access_token: token.to_string(),
            refresh_token: refresh.map(str::to_string),
        })
    }

    /// The refresh header, required. Only the refresh flow asks for it.
    pub fn require_refresh(&self) -> Result<&str, Error> {
        self.refresh_token
            .as_deref()
            .ok_or_else(|| Error::Unauthorized("missing refresh header".to_string()))
    }
}
