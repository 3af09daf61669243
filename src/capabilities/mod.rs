//! # Capability Registry
//!
//! The capability surface is a flat, stateless list of named members that a
//! process chooses to expose over HTTP. Each member is either a readable value
//! or an invocable function with typed parameters.
//!
//! ## Resolution Flow
//!
//! 1. A [`CapabilitySurface`] declares its members (see [`crate::surface`])
//! 2. `CapabilityRegistry::load(&surface)` keeps the public, non-synthesized ones
//! 3. The path index seeds `/<name>` for every entry
//! 4. The dispatcher looks entries up by path and binds request parameters
//!
//! Nothing is inspected at request time beyond the table built in step 2.

pub mod capability;
pub mod registry;

pub use capability::{
    Arg, Arguments, CapabilityEntry, InvokeFn, Member, MemberKind, ParamType, ParameterSpec,
    Slot, ValueFn, Visibility,
};
pub use registry::{CapabilityRegistry, CapabilitySurface};
