//! Client-runtime session state.
//!
//! The store is the single writer-controlled mirror of session existence;
//! the synchronizer is the only component that mutates it, driven by the
//! identity provider's responses and auth events. UI layers read snapshots.

pub mod persist;
pub mod store;
pub mod sync;

pub use persist::FileStore;
pub use store::{AuthSnapshot, AuthStore, User};
pub use sync::{SessionSynchronizer, LOGIN_PATH};
