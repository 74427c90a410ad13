//! TokenIssuer (C6) — mints and verifies match-scoped bearer tokens.

use std::sync::RwLock;

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use stormstack_core::ids::{MatchId, PlayerId};
use stormstack_core::time::now_secs;
use tracing::info;

use crate::error::{TokenError, TokenResult};

/// Claims carried by a match-scoped bearer token (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchAuthClaims {
    pub player_id: PlayerId,
    pub match_id: MatchId,
    pub player_name: String,
    pub issued_at: u64,
    pub expires_at: u64,
}

struct KeyState {
    current: String,
    /// Previous signing key, retained so in-flight tokens issued before a
    /// rotation keep verifying until `valid_until`.
    previous: Option<(String, u64)>,
}

pub struct TokenIssuer {
    keys: RwLock<KeyState>,
    expiry_secs: u64,
    rotation_grace_secs: u64,
}

impl TokenIssuer {
    pub fn new(signing_key: String, expiry_secs: u64, rotation_grace_secs: u64) -> Self {
        Self {
            keys: RwLock::new(KeyState {
                current: signing_key,
                previous: None,
            }),
            expiry_secs,
            rotation_grace_secs,
        }
    }

    /// Swap in a new signing key, keeping the old one as a verifier until
    /// `rotation_grace` elapses.
    pub fn rotate_key(&self, new_key: String) {
        let mut keys = self.keys.write().expect("key lock poisoned");
        let old = std::mem::replace(&mut keys.current, new_key);
        keys.previous = Some((old, now_secs() + self.rotation_grace_secs));
        info!("signing key rotated");
    }

    pub fn issue_match_token(
        &self,
        player_id: &str,
        match_id: &str,
        player_name: &str,
    ) -> TokenResult<String> {
        let now = now_secs();
        let claims = MatchAuthClaims {
            player_id: player_id.to_string(),
            match_id: match_id.to_string(),
            player_name: player_name.to_string(),
            issued_at: now,
            expires_at: now + self.expiry_secs,
        };

        let key = self.keys.read().expect("key lock poisoned").current.clone();
        encode(&Header::default(), &claims, &EncodingKey::from_secret(key.as_bytes()))
            .map_err(|e| TokenError::NodeAuthenticationFailed(e.to_string()))
    }

    /// Verifies signature and expiry, trying the current key first and
    /// falling back to the previous one within its grace window.
    pub fn verify_match_token(&self, raw_token: &str) -> TokenResult<MatchAuthClaims> {
        let keys = self.keys.read().expect("key lock poisoned");
        let validation = build_validation();

        if let Ok(data) = decode::<MatchAuthClaims>(
            raw_token,
            &DecodingKey::from_secret(keys.current.as_bytes()),
            &validation,
        ) {
            return check_not_expired(data.claims);
        }

        if let Some((prev_key, valid_until)) = &keys.previous {
            if now_secs() < *valid_until {
                if let Ok(data) = decode::<MatchAuthClaims>(
                    raw_token,
                    &DecodingKey::from_secret(prev_key.as_bytes()),
                    &validation,
                ) {
                    return check_not_expired(data.claims);
                }
            }
        }

        Err(TokenError::NodeAuthenticationFailed(
            "signature invalid or token expired".to_string(),
        ))
    }

    pub fn verify_for_match(&self, raw_token: &str, expected_match_id: &str) -> TokenResult<MatchAuthClaims> {
        let claims = self.verify_match_token(raw_token)?;
        if claims.match_id != expected_match_id {
            return Err(TokenError::Unauthorized("token not scoped to this match".to_string()));
        }
        Ok(claims)
    }

    pub fn verify_for_player(
        &self,
        raw_token: &str,
        expected_player_id: &str,
        expected_match_id: &str,
    ) -> TokenResult<MatchAuthClaims> {
        let claims = self.verify_for_match(raw_token, expected_match_id)?;
        if claims.player_id != expected_player_id {
            return Err(TokenError::Unauthorized("token not scoped to this player".to_string()));
        }
        Ok(claims)
    }
}

fn build_validation() -> Validation {
    let mut validation = Validation::default();
    validation.required_spec_claims.clear();
    validation.validate_exp = false;
    validation
}

/// `jsonwebtoken`'s built-in expiry check looks for an `exp` claim; ours is
/// named `expires_at`, so expiry is enforced here instead.
fn check_not_expired(claims: MatchAuthClaims) -> TokenResult<MatchAuthClaims> {
    if now_secs() >= claims.expires_at {
        return Err(TokenError::NodeAuthenticationFailed("token expired".to_string()));
    }
    Ok(claims)
}
