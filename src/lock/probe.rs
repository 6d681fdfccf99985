//! Host and process probes used to judge lock staleness

use std::ffi::OsString;

/// Best-effort check that a local process is still running.
///
/// On unix this sends signal 0, which performs the permission and
/// existence checks without delivering anything. `EPERM` means the
/// process exists under another user, so it counts as alive. Elsewhere
/// liveness cannot be determined reliably and every pid is assumed alive,
/// so a lock is never reclaimed on a guess.
pub fn is_process_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        // 0 and negative values address process groups, not a single pid
        let Ok(pid) = libc::pid_t::try_from(pid) else {
            return false;
        };
        if pid <= 0 {
            return false;
        }

        // SAFETY: kill with signal 0 has no side effects on the target
        let rc = unsafe { libc::kill(pid, 0) };
        if rc == 0 {
            return true;
        }
        std::io::Error::last_os_error().raw_os_error() != Some(libc::ESRCH)
    }

    #[cfg(not(unix))]
    {
        let _ = pid;
        true
    }
}

/// Hostname recorded in lock files created by this process
pub fn current_hostname() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Command line recorded in lock files for diagnostics.
///
/// Arguments that are not valid UTF-8 are kept lossily.
pub fn current_command() -> String {
    join_command(std::env::args_os())
}

fn join_command(args: impl IntoIterator<Item = OsString>) -> String {
    args.into_iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}
