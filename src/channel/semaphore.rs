use super::ChannelError;
use log::warn;
use std::ffi::CString;
use std::io;
use std::time::Duration;

/// Result of a blocking wait that did not fail
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The semaphore was decremented
    Acquired,
    /// A signal arrived before the semaphore could be decremented
    Interrupted,
    /// The timeout elapsed before the semaphore could be decremented
    TimedOut,
}

/// A POSIX named counting semaphore visible to every process that knows its name.
///
/// The handle is closed on drop. If the handle created the semaphore, the name is also removed
/// from the system namespace on drop; processes that still have it open keep working on it.
pub struct NamedSemaphore {
    sem: *mut libc::sem_t,
    name: CString,
    owner: bool,
}

// SAFETY: sem_wait, sem_post and friends are thread-safe on a shared sem_t.
unsafe impl Send for NamedSemaphore {}
unsafe impl Sync for NamedSemaphore {}

impl NamedSemaphore {
    /// Creates a new semaphore with the passed initial value. Fails if the name already exists.
    pub fn create(name: &str, value: u32) -> Result<Self, ChannelError> {
        let c_name = c_name(name)?;
        // SAFETY: c_name is NUL-terminated; mode and value are passed as promoted varargs.
        let sem = unsafe {
            libc::sem_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL,
                0o600 as libc::c_uint,
                value as libc::c_uint,
            )
        };
        if sem == libc::SEM_FAILED {
            return Err(error("create", name, io::Error::last_os_error()));
        }

        Ok(Self {
            sem,
            name: c_name,
            owner: true,
        })
    }

    /// Opens an existing semaphore
    pub fn open(name: &str) -> Result<Self, ChannelError> {
        let c_name = c_name(name)?;
        // SAFETY: c_name is NUL-terminated.
        let sem = unsafe { libc::sem_open(c_name.as_ptr(), 0) };
        if sem == libc::SEM_FAILED {
            return Err(error("open", name, io::Error::last_os_error()));
        }

        Ok(Self {
            sem,
            name: c_name,
            owner: false,
        })
    }

    /// Removes `name` from the system namespace. A missing name is not an error.
    pub fn unlink(name: &str) -> Result<(), ChannelError> {
        let c_name = c_name(name)?;
        // SAFETY: c_name is NUL-terminated.
        if unsafe { libc::sem_unlink(c_name.as_ptr()) } != 0 {
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::NotFound {
                return Err(error("unlink", name, err));
            }
        }
        Ok(())
    }

    /// Decrements the semaphore, blocking for at most `timeout`
    pub fn wait_timeout(&self, timeout: Duration) -> Result<WaitOutcome, ChannelError> {
        let deadline = deadline_after(timeout).map_err(|e| error("wait", self.name(), e))?;
        // SAFETY: self.sem stays valid until drop.
        if unsafe { libc::sem_timedwait(self.sem, &deadline) } == 0 {
            return Ok(WaitOutcome::Acquired);
        }

        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::EINTR) => Ok(WaitOutcome::Interrupted),
            Some(libc::ETIMEDOUT) => Ok(WaitOutcome::TimedOut),
            _ => Err(error("wait", self.name(), err)),
        }
    }

    /// Increments the semaphore, waking up one waiter
    pub fn post(&self) -> Result<(), ChannelError> {
        // SAFETY: self.sem stays valid until drop.
        if unsafe { libc::sem_post(self.sem) } != 0 {
            return Err(error("post", self.name(), io::Error::last_os_error()));
        }
        Ok(())
    }

    /// Returns the current value of the semaphore
    pub fn value(&self) -> Result<i32, ChannelError> {
        let mut value: libc::c_int = 0;
        // SAFETY: self.sem stays valid until drop; value is a valid out pointer.
        if unsafe { libc::sem_getvalue(self.sem, &mut value) } != 0 {
            return Err(error("read", self.name(), io::Error::last_os_error()));
        }
        Ok(value)
    }

    pub fn name(&self) -> &str {
        self.name.to_str().unwrap_or("<invalid>")
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        // SAFETY: self.sem was returned by sem_open and is closed exactly once.
        if unsafe { libc::sem_close(self.sem) } != 0 {
            warn!(
                "Closing semaphore {} failed: {}",
                self.name(),
                io::Error::last_os_error()
            );
        }

        if self.owner {
            // SAFETY: self.name is NUL-terminated.
            if unsafe { libc::sem_unlink(self.name.as_ptr()) } != 0 {
                warn!(
                    "Removing semaphore {} failed: {}",
                    self.name(),
                    io::Error::last_os_error()
                );
            }
        }
    }
}

fn c_name(name: &str) -> Result<CString, ChannelError> {
    CString::new(name).map_err(|_| ChannelError::InvalidName(name.to_string()))
}

fn error(operation: &'static str, name: &str, source: io::Error) -> ChannelError {
    ChannelError::Semaphore {
        operation,
        name: name.to_string(),
        source,
    }
}

/// sem_timedwait expects an absolute CLOCK_REALTIME deadline
fn deadline_after(timeout: Duration) -> io::Result<libc::timespec> {
    let mut now = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: now is a valid out pointer.
    if unsafe { libc::clock_gettime(libc::CLOCK_REALTIME, &mut now) } != 0 {
        return Err(io::Error::last_os_error());
    }

    let nanos = now.tv_nsec as u64 + timeout.subsec_nanos() as u64;
    let secs = timeout.as_secs() + nanos / 1_000_000_000;
    Ok(libc::timespec {
        tv_sec: now.tv_sec + secs as libc::time_t,
        tv_nsec: (nanos % 1_000_000_000) as _,
    })
}
