//! stormstack-tokens — TokenIssuer (C6): mints and verifies match-scoped
//! bearer tokens, and pass-through access to the external `IdentityService`
//! for human authentication.

pub mod error;
pub mod identity;
pub mod issuer;

pub use error::{TokenError, TokenResult};
pub use identity::{HttpIdentityService, IdentityService, NoopIdentityService, OAuthTokenResponse};
#[cfg(feature = "test-util")]
pub use identity::MockIdentityService;
pub use issuer::{MatchAuthClaims, TokenIssuer};
