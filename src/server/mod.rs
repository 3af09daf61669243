//! HTTP server for the capability surface and the static web root.
//!
//! Every path shares one namespace:
//!
//! - `/<member>`         - capability member (`GET` or `POST`)
//! - `/`                 - `index.html`
//! - `/<page>`           - `<page>.html`
//! - `/<file.ext>`       - the file itself (`GET` only)

pub mod routes;

pub use routes::{app_router, AppState};
