//! Request dispatch engine.
//!
//! Every request walks the same states:
//!
//! ```text
//! Received -> Classified -> { CapabilityInvoke | FileServe | NotFound } -> Responded
//! ```
//!
//! Classification is a case-insensitive lookup in the [`PathIndex`]. A miss
//! triggers one rebuild and a second lookup, which lets files added after
//! startup resolve without a restart. Capability paths accept `GET` and
//! `POST`; file paths accept `GET` only.
//!
//! Faults raised by capability members are returned as [`DispatchError`] and
//! never turned into a normal outcome here.

pub mod binding;
pub mod errors;
pub mod outcome;
pub mod request;

pub use errors::DispatchError;
pub use outcome::{Outcome, OutcomeBody};
pub use request::{DispatchRequest, RequestContext};

use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use axum::http::Method;
use tokio::task::JoinError;

use crate::capabilities::{Arguments, CapabilityEntry, CapabilityRegistry, MemberKind, ParamType};
use crate::config::ServerConfig;
use crate::index::PathIndex;
use crate::resolver::ResourceResolver;

/// Resolves requests against the capability registry and the web root.
///
/// Cheap to clone; all state is shared.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<CapabilityRegistry>,
    index: Arc<PathIndex>,
    resolver: ResourceResolver,
}

impl Dispatcher {
    /// Build a dispatcher and run the initial index build.
    pub fn new(registry: CapabilityRegistry, index: PathIndex) -> Self {
        let index = Arc::new(index);
        index.rebuild();
        Self {
            registry: Arc::new(registry),
            resolver: ResourceResolver::new(Arc::clone(&index)),
            index,
        }
    }

    /// Dispatcher over `config.wwwroot`, honoring the rebuild interval guard.
    pub fn from_config(registry: CapabilityRegistry, config: &ServerConfig) -> Self {
        let index = PathIndex::new(&config.wwwroot, registry.routes().collect())
            .with_min_interval(config.rebuild_min_interval);
        Self::new(registry, index)
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn index(&self) -> &Arc<PathIndex> {
        &self.index
    }

    /// Resolve one request to an outcome.
    pub async fn dispatch(&self, request: DispatchRequest) -> Result<Outcome, DispatchError> {
        let start = Instant::now();
        tracing::info!(category = "info", "Incoming request for: {}", request.path);

        let result = self.route(request).await;

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        tracing::debug!(category = "info", elapsed_ms, "Request handled in {:.3}ms", elapsed_ms);
        result
    }

    async fn route(&self, request: DispatchRequest) -> Result<Outcome, DispatchError> {
        if request.method != Method::GET && request.method != Method::POST {
            tracing::warn!(category = "warning", method = %request.method, "Method not allowed");
            return Ok(Outcome::method_not_allowed());
        }

        if !self.index.contains(&request.path) {
            tracing::warn!(
                category = "warning",
                "Resource is not indexed, reloading resources..."
            );
            self.index.refresh().await;

            if !self.index.contains(&request.path) {
                tracing::warn!(
                    category = "failure",
                    "ERROR 404: Path not found: {}",
                    request.path
                );
                return Ok(Outcome::not_found());
            }
        }

        match self.registry.lookup(&request.path) {
            Some(entry) => self.invoke(entry, &request).await,
            None if request.method == Method::POST => {
                tracing::warn!(category = "warning", "Method not allowed");
                Ok(Outcome::method_not_allowed())
            }
            None => Ok(self.resolver.resolve(&request.path).await),
        }
    }

    async fn invoke(
        &self,
        entry: &CapabilityEntry,
        request: &DispatchRequest,
    ) -> Result<Outcome, DispatchError> {
        match &entry.kind {
            MemberKind::Value(read) => {
                let read = Arc::clone(read);
                let value = tokio::task::spawn_blocking(move || read())
                    .await
                    .map_err(|e| panicked(entry, e))?;
                log_handled(value.is_some());
                Ok(Outcome::text(value))
            }
            MemberKind::Invocable { params, call } => {
                let slots = binding::bind(params, &request.query, &request.form);
                let names = params.iter().map(|p| p.name.clone()).collect();
                let context = params
                    .iter()
                    .any(|p| p.ty == ParamType::Context)
                    .then(|| RequestContext::from_request(request));
                let mut args = Arguments::new(names, slots, context);

                let call = Arc::clone(call);
                let (result, context) = tokio::task::spawn_blocking(move || {
                    let result = call(&mut args);
                    (result, args.into_context())
                })
                .await
                .map_err(|e| panicked(entry, e))?;

                let value = result.map_err(|error| {
                    tracing::error!(
                        category = "failure",
                        member = %entry.name,
                        "Capability raised an unhandled fault: {:?}",
                        error
                    );
                    DispatchError::InvocationFault {
                        member: entry.name.clone(),
                        error,
                    }
                })?;

                log_handled(value.is_some());
                let mut outcome = Outcome::text(value);
                if let Some(context) = context {
                    apply_context(&mut outcome, context);
                }
                Ok(outcome)
            }
        }
    }
}

fn log_handled(has_body: bool) {
    if has_body {
        tracing::info!(category = "success", "Request handled successfully");
    } else {
        tracing::info!(category = "success", "Request handled successfully (empty)");
    }
}

fn apply_context(outcome: &mut Outcome, context: RequestContext) {
    if let Some(status) = context.status {
        outcome.status = status;
    }
    if context.content_type.is_some() {
        outcome.content_type = context.content_type;
    }
    outcome.headers.extend(context.headers);
}

fn panicked(entry: &CapabilityEntry, error: JoinError) -> DispatchError {
    let detail = if error.is_panic() {
        panic_message(error.into_panic())
    } else {
        error.to_string()
    };
    tracing::error!(
        category = "failure",
        member = %entry.name,
        "Capability panicked: {}",
        detail
    );
    DispatchError::InvocationPanicked {
        member: entry.name.clone(),
        detail,
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
