// AudSleuth - app/mod.rs
//
// Application layer: run orchestration.
// Dependencies: core, util.

pub mod run;
