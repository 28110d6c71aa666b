//! Runs the three launcher hooks a completed [`availmf_amf::Effect`]
//! asks for, and turns the result back into a presence event where the
//! presence state machine expects one directly (spec 4.L step 6).
//!
//! `RunInstantiateHook` has no such direct reply: a real component only
//! reaches `Instantiated` by calling back in through the AMF API, which
//! arrives over IPC and is out of scope here (see the crate's module
//! doc comment), so that hook only ever resolves the component's
//! eventual `InstantiateTimeout`.

use availmf_amf::{AmfGraph, PresenceEvent};
use availmf_launcher::{build_envp, execute, resolve_argv, ComponentCommands, LaunchOperation, LaunchOutcome};
use availmf_types::Name;

fn commands_and_chain<'a>(graph: &'a AmfGraph, comp_name: &Name) -> Option<(ComponentCommands, Vec<Option<&'a str>>)> {
    let comp = graph.comps.get(comp_name)?;
    let commands = ComponentCommands {
        instantiate_cmd: comp.instantiate_cmd.clone(),
        terminate_cmd: comp.terminate_cmd.clone(),
        cleanup_cmd: comp.cleanup_cmd.clone(),
    };
    let app_clccli = graph
        .sus
        .get(&comp.su)
        .and_then(|su| graph.sgs.get(&su.sg))
        .and_then(|sg| graph.apps.get(&sg.app))
        .and_then(|app| app.clccli_path.as_deref());
    Some((commands, vec![comp.clccli_path.as_deref(), app_clccli]))
}

/// `(comp, su, sg, app)` names, for `SA_AMF_COMPONENT_NAME`.
fn dn_chain(graph: &AmfGraph, comp_name: &Name) -> Option<(String, String, String, String)> {
    let comp = graph.comps.get(comp_name)?;
    let su = graph.sus.get(&comp.su)?;
    let sg = graph.sgs.get(&su.sg)?;
    Some((comp.name.as_str().to_string(), su.name.as_str().to_string(), sg.name.as_str().to_string(), sg.app.as_str().to_string()))
}

/// Launches `op` for `comp_name` and waits for it to finish. Returns
/// `None` if the component is gone, or the operation has no command
/// configured (e.g. an optional `Terminate` callback).
pub async fn run_hook(graph: &AmfGraph, comp_name: &Name, op: LaunchOperation) -> Option<LaunchOutcome> {
    let (commands, chain) = commands_and_chain(graph, comp_name)?;
    let argv = resolve_argv(op, &commands, &chain)?;
    let (comp, su, sg, app) = dn_chain(graph, comp_name)?;
    let configured_env = &graph.comps.get(comp_name)?.env;
    let envp = build_envp(configured_env, &comp, &su, &sg, &app);
    Some(execute(&argv, &envp).await)
}

/// Maps a finished `Terminate` hook's outcome to the presence event the
/// kernel expects.
pub fn terminate_event(outcome: LaunchOutcome) -> PresenceEvent {
    if outcome.success() {
        PresenceEvent::TerminateCallbackSucceeded
    } else {
        PresenceEvent::TerminateCallbackFailed
    }
}

/// Maps a finished `Cleanup` hook's outcome to the presence event the
/// kernel expects, per the launcher's own `clc_cleanup_completed`
/// contract.
pub fn cleanup_event(outcome: LaunchOutcome) -> PresenceEvent {
    PresenceEvent::CleanupCompleted { exit_code: outcome.exit_code }
}
