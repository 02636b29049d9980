//! Process-local termination flag raised by SIGINT and SIGTERM.
//!
//! Handlers are installed without `SA_RESTART`, so a process blocked in a semaphore wait wakes up
//! with `EINTR` and gets the chance to look at the flag.
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

static TERMINATION_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_termination_signal(_signum: libc::c_int) {
    TERMINATION_REQUESTED.store(true, Ordering::Release);
}

/// Installs the handler for SIGINT and SIGTERM.
pub fn initialize() -> io::Result<()> {
    for signum in [libc::SIGINT, libc::SIGTERM] {
        // SAFETY: the handler only performs an atomic store, which is async-signal-safe.
        unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = on_termination_signal as extern "C" fn(libc::c_int) as usize;
            action.sa_flags = 0;
            libc::sigemptyset(&mut action.sa_mask);
            if libc::sigaction(signum, &action, std::ptr::null_mut()) != 0 {
                return Err(io::Error::last_os_error());
            }
        }
    }
    Ok(())
}

/// Returns true once SIGINT or SIGTERM was received by this process
pub fn received_termination() -> bool {
    TERMINATION_REQUESTED.load(Ordering::Acquire)
}
