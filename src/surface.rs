//! The bundled capability surface served by the `server` binary.
//!
//! Every member here is reachable as `/<name>` (any case), by `GET` with query
//! parameters or by `POST` with a form body:
//!
//! - `/FormTest?name=..&age=..&appointment=..` - echoes an appointment
//! - `/Greet?name=..&times=..` - `times` defaults to 1, capped at 100
//! - `/Version` - crate version
//! - `/Status` - JSON status document

use std::time::Instant;

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::capabilities::{Arg, CapabilitySurface, Member, ParamType, ParameterSpec};

static STARTED: Lazy<Instant> = Lazy::new(Instant::now);

/// Upper bound on `Greet`'s `times`; the count comes straight off the request.
const MAX_GREETINGS: i64 = 100;

/// Demo surface.
#[derive(Debug, Default, Clone, Copy)]
pub struct Www;

#[derive(Debug, Serialize)]
struct StatusReport {
    service: &'static str,
    version: &'static str,
    uptime_secs: u64,
}

impl CapabilitySurface for Www {
    fn members(&self) -> Vec<Member> {
        Lazy::force(&STARTED);
        vec![
            Member::function(
                "FormTest",
                vec![
                    ParameterSpec::new("name", ParamType::Text),
                    ParameterSpec::new("age", ParamType::Integer),
                    ParameterSpec::new("appointment", ParamType::DateTime),
                    ParameterSpec::context("context"),
                ],
                |args| {
                    let name = args.text("name").unwrap_or_default().to_string();
                    let age = args.integer("age").unwrap_or_default();
                    let appointment = args.date_time("appointment").unwrap_or_default();
                    if let Some(context) = args.context_mut() {
                        context.set_content_type("text/plain");
                    }
                    Ok(Some(format!(
                        "{} (age: {}) made an appointment for {}.",
                        name,
                        age,
                        appointment.format("%Y-%m-%d")
                    )))
                },
            ),
            Member::function(
                "Greet",
                vec![
                    ParameterSpec::new("name", ParamType::Text),
                    ParameterSpec::new("times", ParamType::Integer).with_default(Arg::Integer(1)),
                ],
                |args| {
                    let name = args.text("name").unwrap_or("stranger");
                    let times = args
                        .integer("times")
                        .unwrap_or_default()
                        .clamp(0, MAX_GREETINGS) as usize;
                    let greeting = format!("Hello, {}!", name);
                    Ok(Some(vec![greeting; times].join(" ")))
                },
            ),
            Member::value("Version", || Some(env!("CARGO_PKG_VERSION").to_string())),
            Member::value("Status", || {
                let report = StatusReport {
                    service: env!("CARGO_PKG_NAME"),
                    version: env!("CARGO_PKG_VERSION"),
                    uptime_secs: STARTED.elapsed().as_secs(),
                };
                serde_json::to_string(&report).ok()
            }),
        ]
    }
}
