//! Detached process launching and the one stdout capture used by polled
//! widgets.
//!
//! Spawned processes are never awaited by the caller.  A short-lived reaper
//! thread collects each child's exit status so finished children do not
//! linger as zombies.

use crate::command::SpawnRequest;
use log::{debug, warn};
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Errors from launching or capturing a process.
#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    #[error("empty command")]
    Empty,
    #[error("failed to start {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{command} exited with {status}")]
    Status {
        command: String,
        status: std::process::ExitStatus,
    },
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(arg: &str) -> String {
    match (arg.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest).to_string_lossy().into_owned(),
        _ => arg.to_string(),
    }
}

/// Launch `request` without waiting for it.
///
/// Standard streams are detached.  A missing executable is reported as
/// [`SpawnError::Io`]; anything that happens after launch is only logged.
pub fn spawn_detached(request: &SpawnRequest) -> Result<(), SpawnError> {
    let program = request.program().ok_or(SpawnError::Empty)?;
    let program = PathBuf::from(expand_home(program));
    let args: Vec<String> = request.args().iter().map(|a| expand_home(a)).collect();

    let mut child = Command::new(&program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| SpawnError::Io {
            program: program.display().to_string(),
            source,
        })?;

    debug!("spawned {} (pid {})", request, child.id());
    let label = request.to_string();
    std::thread::spawn(move || match child.wait() {
        Ok(status) if !status.success() => warn!("{} exited with {}", label, status),
        Ok(_) => debug!("{} exited", label),
        Err(e) => warn!("waiting for {}: {}", label, e),
    });
    Ok(())
}

/// Run `command` through `sh -c` and return its trimmed standard output.
///
/// This blocks until the command exits; callers run it off the event loop.
pub fn capture_shell(command: &str) -> Result<String, SpawnError> {
    let output = Command::new("sh")
        .arg("-c")
        .arg(expand_home(command))
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .map_err(|source| SpawnError::Io {
            program: "sh".into(),
            source,
        })?;
    if !output.status.success() {
        return Err(SpawnError::Status {
            command: command.to_string(),
            status: output.status,
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
