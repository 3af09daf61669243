//! Parameter binding: untyped request fields to typed argument slots.
//!
//! Binding is total. A missing or unconvertible field becomes `None` in its
//! slot and the invocation goes ahead.

use std::collections::HashMap;

use crate::capabilities::{ParamType, ParameterSpec, Slot};

/// Bind every parameter of a signature, in order.
///
/// For each parameter: the request context is bound as [`Slot::Context`];
/// otherwise the name is looked up in `query`, then `form`. A found value is
/// coerced to the declared type (`None` on failure). A missing value takes the
/// declared default, or `None`.
pub fn bind(
    params: &[ParameterSpec],
    query: &HashMap<String, String>,
    form: &HashMap<String, String>,
) -> Vec<Slot> {
    params
        .iter()
        .map(|param| {
            if param.ty == ParamType::Context {
                return Slot::Context;
            }
            match query.get(&param.name).or_else(|| form.get(&param.name)) {
                Some(raw) => {
                    let coerced = param.ty.coerce(raw);
                    if coerced.is_none() {
                        tracing::debug!(
                            parameter = %param.name,
                            value = %raw,
                            "Could not convert parameter, binding null"
                        );
                    }
                    Slot::Value(coerced)
                }
                None => Slot::Value(param.default.clone()),
            }
        })
        .collect()
}
