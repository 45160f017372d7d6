//! Client-side state layer for Cirrus.
//!
//! The server enforces all authorization; this crate owns the pieces a
//! frontend needs between keystrokes and server acknowledgments: who is
//! signed in, whether navigation may proceed, and the invitation inbox with
//! its live badge count. Everything talks to the server through the
//! [`backend::Backend`] trait so tests can substitute an in-memory double.

pub mod backend;
pub mod cache;
pub mod gateway;
pub mod guards;
pub mod invites;
pub mod session;

pub use backend::{Backend, BackendError, HttpBackend};
pub use cache::{CachedIdentity, DurableCache};
pub use gateway::{GatewayError, GatewayFeed};
pub use guards::{GuardDecision, Route, require_anonymous, require_auth};
pub use session::{AuthEvent, Session, SessionManager, SessionStatus};
