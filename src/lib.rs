//! Headless core of a role-based admin dashboard front-end.
//!
//! Three cooperating concerns make up the crate: the navigation guard
//! that decides navigability per navigation event, the route
//! materializer that turns a role list or a backend route manifest into
//! mounted routes plus derived menu/breadcrumb/cache views, and the HTTP
//! client that funnels transport, HTTP, and backend business errors into
//! one result shape and reacts to session expiry. [`shell::Shell`] wires
//! them together for hosts and for the bundled CLI.

pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod guard;
pub mod route;
pub mod shell;
pub mod storage;
pub mod tab;

pub use config::{AuthRouteMode, HistoryMode, ShellConfig};
pub use shell::{Navigation, Shell, ShellError};
