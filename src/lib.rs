//! # surfaceserve
//!
//! Exposes a process's capability surface (a flat set of named public values
//! and functions) over HTTP, next to a static file server, under one path
//! namespace.
//!
//! The pieces, leaf first:
//!
//! - [`capabilities`] - the registry snapshot of the capability surface
//! - [`index`] - the self-healing set of resolvable paths
//! - [`resolver`] - file serving with extensionless-to-HTML fallback
//! - [`dispatch`] - per-request classification, binding and invocation
//! - [`server`] - the axum transport around the dispatcher

pub mod capabilities;
pub mod config;
pub mod dispatch;
pub mod index;
pub mod resolver;
pub mod server;
pub mod surface;
pub mod telemetry;

pub use capabilities::{CapabilityRegistry, CapabilitySurface, Member};
pub use dispatch::{DispatchError, DispatchRequest, Dispatcher, Outcome};
pub use index::PathIndex;
