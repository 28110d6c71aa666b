//! fork/exec execution (spec 4.L, steps 4-5). The only place in the
//! whole system that spawns an OS process; everything else re-enters
//! the main loop only through the [`LaunchOutcome`] this produces.

use std::process::{ExitStatus, Stdio};

use tokio::process::Command;

/// Result of running a component command. `exit_code == 0` is success;
/// a negative value flags a signal (`-n` for signal number `n`) rather
/// than an exit status byte. `execve` failing is reported identically
/// to a nonzero exit, per spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchOutcome {
    pub exit_code: i32,
}

impl LaunchOutcome {
    pub fn success(self) -> bool {
        self.exit_code == 0
    }
}

fn exit_code_from_status(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        status.code().unwrap_or_else(|| -status.signal().unwrap_or(1))
    }
    #[cfg(not(unix))]
    {
        status.code().unwrap_or(-1)
    }
}

/// Spawns `argv[0]` with `argv[1..]` and `envp`, waits for exit, and
/// reports the outcome. Never blocks the caller's runtime thread
/// beyond the `await` point; callers driving the main loop should run
/// this on a dedicated task so a slow or hung component cannot stall
/// executive message processing.
pub async fn execute(argv: &[String], envp: &[(String, String)]) -> LaunchOutcome {
    let Some((program, args)) = argv.split_first() else {
        tracing::warn!("launch requested with empty argv");
        return LaunchOutcome { exit_code: -1 };
    };

    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.envs(envp.iter().cloned());
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            tracing::warn!(program, error = %err, "execve-equivalent failure launching component command");
            return LaunchOutcome { exit_code: -1 };
        }
    };

    match child.wait_with_output().await {
        Ok(output) => LaunchOutcome { exit_code: exit_code_from_status(output.status) },
        Err(err) => {
            tracing::warn!(program, error = %err, "failed waiting on spawned component command");
            LaunchOutcome { exit_code: -1 }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn success_exit_reports_zero() {
        let outcome = execute(&["/bin/true".to_string()], &[]).await;
        assert!(outcome.success());
    }

    #[tokio::test]
    async fn failure_exit_reports_nonzero() {
        let outcome = execute(&["/bin/false".to_string()], &[]).await;
        assert!(!outcome.success());
        assert_eq!(outcome.exit_code, 1);
    }

    #[tokio::test]
    async fn missing_program_reports_as_failure() {
        let outcome = execute(&["/no/such/executable-availmf-test".to_string()], &[]).await;
        assert!(!outcome.success());
        assert_eq!(outcome.exit_code, -1);
    }

    #[tokio::test]
    async fn empty_argv_is_a_failure() {
        let outcome = execute(&[], &[]).await;
        assert_eq!(outcome.exit_code, -1);
    }
}
