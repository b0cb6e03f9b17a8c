//! Single-instance guard.
//!
//! Two live sessions would double-record scores and race each other on
//! slash commands, so startup scans the process table and refuses to
//! run when another instance is found.

use sysinfo::{ProcessesToUpdate, System};
use tracing::debug;

/// Process name the guard looks for.
const INSTANCE_NAME: &str = "guesslog";

/// Whether another process on this host looks like a running instance.
pub fn another_instance_running() -> bool {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);

    let current_pid = std::process::id();
    for (pid, process) in system.processes() {
        if pid.as_u32() == current_pid {
            continue;
        }
        let name = process.name().to_string_lossy();
        let cmdline: Vec<String> = process
            .cmd()
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        if looks_like_instance(&name, &cmdline, INSTANCE_NAME) {
            debug!(pid = pid.as_u32(), name = %name, "Found running instance");
            return true;
        }
    }

    false
}

/// Matches a process by binary name or by invocation line, catching both
/// an installed binary and a `target/.../guesslog` dev run.
fn looks_like_instance(process_name: &str, cmdline: &[String], target: &str) -> bool {
    process_name == target
        || cmdline
            .iter()
            .any(|arg| arg.as_str() == target || arg.ends_with(&format!("/{}", target)))
}
