pub mod config;
pub mod error;
pub mod ids;
pub mod keyed_lock;
pub mod time;

pub use config::StormConfig;
pub use error::{ErrorCode, HasErrorCode};
pub use ids::{MatchId, ModuleName, ModuleVersion, NodeId, PlayerId};
pub use keyed_lock::KeyedLocks;
