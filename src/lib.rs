//! Local mirror of a remote group/id addressed configuration store.
//!
//! Subscriptions name either an exact `(group, id)` pair or a wildcard
//! pattern. The [`ConfigMirror`] engine resolves them against a
//! [`RemoteStore`], keeps every matching value in a [`LocalCache`], and hands
//! each observed value to the handler bound to the subscription that owns it.

mod cache;
mod config;
pub mod constants;
mod engine;
mod errors;
mod store;
mod subscription;
mod utils;

pub use cache::*;
pub use config::*;
pub use engine::*;
pub use errors::*;
pub use store::*;
pub use subscription::*;
