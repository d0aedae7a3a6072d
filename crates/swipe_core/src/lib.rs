//! Swipe classification engine: gesture resolution, commit animation, the
//! item queue and the serialized submission pipeline behind one session.

pub mod animator;
pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod gesture;
pub mod input;
pub mod queue;
pub mod session;
pub mod submission;

pub use auth::{Credential, CredentialStore};
pub use backend::{backend_from_config, BackendCollaborator, LiveBackend, SimulatedBackend};
pub use config::{load_engine_config, BackendKind, EngineConfig};
pub use error::{BackendError, ConfigError, CoreError};
pub use session::{HostError, SessionEvent, SessionStatus, SwipeSession};
