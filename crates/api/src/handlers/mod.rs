//! Request handlers.
//!
//! Each submodule provides async handler functions for one resource.
//! Handlers delegate to the repositories in `flowrunner_db` (or to the run
//! manager) and map errors via [`AppError`](crate::error::AppError).

pub mod admin;
pub mod auth;
pub mod flows;
pub mod runs;
