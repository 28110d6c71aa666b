//! Command/argv/envp resolution (spec 4.L, steps 1-3).

use std::path::Path;

/// The three operations the launcher can run for a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOperation {
    Instantiate,
    Terminate,
    Cleanup,
}

/// The command strings configured on a component, one per operation.
#[derive(Debug, Clone)]
pub struct ComponentCommands {
    pub instantiate_cmd: String,
    pub terminate_cmd: Option<String>,
    pub cleanup_cmd: String,
}

impl ComponentCommands {
    fn command_for(&self, op: LaunchOperation) -> Option<&str> {
        match op {
            LaunchOperation::Instantiate => Some(&self.instantiate_cmd),
            LaunchOperation::Terminate => self.terminate_cmd.as_deref(),
            LaunchOperation::Cleanup => Some(&self.cleanup_cmd),
        }
    }
}

/// Resolves `command`'s first whitespace-separated token against the
/// `clccli_path` search chain (comp -> SU -> SG -> App) when it is not
/// already absolute. Falls back to the bare token if no candidate
/// directory contains it, letting `exec` itself report the failure.
fn resolve_path(token: &str, clccli_chain: &[Option<&str>]) -> String {
    if token.starts_with('/') {
        return token.to_string();
    }
    for dir in clccli_chain.iter().flatten() {
        let candidate = format!("{dir}/{token}");
        if Path::new(&candidate).exists() {
            return candidate;
        }
    }
    token.to_string()
}

/// Splits `command`'s configured string on whitespace and resolves the
/// first token (the executable) against `clccli_chain`.
pub fn build_argv(command: &str, clccli_chain: &[Option<&str>]) -> Vec<String> {
    let mut parts = command.split_whitespace();
    let Some(raw) = parts.next() else { return Vec::new() };
    let mut argv = vec![resolve_path(raw, clccli_chain)];
    argv.extend(parts.map(str::to_string));
    argv
}

/// The component's configured env list plus
/// `SA_AMF_COMPONENT_NAME=safComp=...,safSu=...,safSg=...,safApp=...`.
pub fn build_envp(configured: &[(String, String)], comp: &str, su: &str, sg: &str, app: &str) -> Vec<(String, String)> {
    let mut env = configured.to_vec();
    env.push(("SA_AMF_COMPONENT_NAME".to_string(), format!("safComp={comp},safSu={su},safSg={sg},safApp={app}")));
    env
}

/// Resolves the full argv for `op`, or `None` if `op` has no command
/// configured (e.g. `Terminate` on a component with no terminate
/// callback, which the presence machine already routes around).
pub fn resolve_argv(op: LaunchOperation, commands: &ComponentCommands, clccli_chain: &[Option<&str>]) -> Option<Vec<String>> {
    let command = commands.command_for(op)?;
    Some(build_argv(command, clccli_chain))
}
