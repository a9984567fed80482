//! Platform process control.
//!
//! Pause is implemented by suspending the player process at the OS
//! scheduler level, so "paused" audio may resume with a brief
//! discontinuity; sample-accurate pause is not available through an
//! opaque external player.
//!
//! On Unix the capability maps to signals (SIGSTOP/SIGCONT for
//! suspension, SIGTERM/SIGKILL for termination). Other platforms compile
//! but report every operation as a `ProcessControlFailure`.

use crate::errors::PlayerError;

#[cfg(unix)]
mod imp {
    use super::PlayerError;

    fn signal(pid: u32, sig: libc::c_int) -> Result<(), PlayerError> {
        let rc = unsafe { libc::kill(pid as libc::pid_t, sig) };
        if rc == 0 {
            Ok(())
        } else {
            // Typically ESRCH: the process exited between the liveness
            // check and the signal.
            Err(PlayerError::process_control(
                std::io::Error::last_os_error(),
            ))
        }
    }

    pub fn suspend(pid: u32) -> Result<(), PlayerError> {
        signal(pid, libc::SIGSTOP)
    }

    pub fn resume(pid: u32) -> Result<(), PlayerError> {
        signal(pid, libc::SIGCONT)
    }

    pub fn request_exit(pid: u32) -> Result<(), PlayerError> {
        signal(pid, libc::SIGTERM)
    }

    pub fn force_kill(pid: u32) -> Result<(), PlayerError> {
        signal(pid, libc::SIGKILL)
    }
}

#[cfg(not(unix))]
mod imp {
    use super::PlayerError;

    fn unsupported(operation: &str) -> Result<(), PlayerError> {
        Err(PlayerError::process_control(format!(
            "{operation} is not supported on this platform"
        )))
    }

    pub fn suspend(_pid: u32) -> Result<(), PlayerError> {
        unsupported("process suspension")
    }

    pub fn resume(_pid: u32) -> Result<(), PlayerError> {
        unsupported("process resumption")
    }

    pub fn request_exit(_pid: u32) -> Result<(), PlayerError> {
        unsupported("graceful termination")
    }

    pub fn force_kill(_pid: u32) -> Result<(), PlayerError> {
        unsupported("forced termination")
    }
}

pub use imp::{force_kill, request_exit, resume, suspend};
