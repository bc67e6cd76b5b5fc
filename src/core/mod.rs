// AudSleuth - core/mod.rs
//
// Core business logic layer.
// Must NOT depend on: platform, app.

pub mod decoder;
pub mod detect;
pub mod discovery;
pub mod export;
pub mod filter;
pub mod model;
pub mod projection;
