//! Component launcher (spec 4.L): the only place OS `fork`/`exec`
//! occurs. Given a component and an operation, resolves the command,
//! builds argv/envp, runs it, and reports the outcome. On `CLEANUP`
//! the caller (the node event loop) multicasts a `clc_cleanup_completed`
//! event carrying `(comp_dn, exit_code)` so the presence state machine
//! reacts identically on every node; this crate only produces the
//! local result, it never multicasts.

mod exec;
mod resolve;

pub use exec::{execute, LaunchOutcome};
pub use resolve::{build_argv, build_envp, resolve_argv, ComponentCommands, LaunchOperation};
