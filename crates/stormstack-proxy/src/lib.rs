//! stormstack-proxy — ProxyRouter (C8): forwards match-scoped requests
//! to the node currently hosting the match (spec.md §4.8).

pub mod error;
pub mod proxy;

pub use error::{ProxyError, ProxyResult};
pub use proxy::ProxyRouter;
