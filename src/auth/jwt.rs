use crate::models::{Claims, TokenType};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};
use uuid::Uuid;

fn now() -> usize {
    Utc::now().timestamp().max(0) as usize
}

fn claims_for(user_id: i64, cpf: String, role: &str, ttl: usize, token_type: TokenType) -> Claims {
    Claims {
        user_id,
        sub: cpf,
        role: role.to_string(),
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type,
    }
}

fn sign(claims: &Claims, secret: &str) -> Result<String, Error> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn generate_access_token(
    user_id: i64,
    cpf: String,
    role: &str,
    secret: &str,
    ttl: usize,
) -> Result<String, Error> {
    sign(&claims_for(user_id, cpf, role, ttl, TokenType::Access), secret)
}

pub fn generate_refresh_token(
    user_id: i64,
    cpf: String,
    role: &str,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), Error> {
    let claims = claims_for(user_id, cpf, role, ttl, TokenType::Refresh);
    let token = sign(&claims, secret)?;

    Ok((token, claims))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}
