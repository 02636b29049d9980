use super::ChannelError;
use log::warn;
use std::ffi::CString;
use std::io;
use std::marker::PhantomData;
use std::mem;
use std::ops::Deref;
use std::ptr::{self, NonNull};

/// Marks types that may live in a freshly created shared memory segment.
///
/// # Safety
/// The all-zero bit pattern has to be a valid value of the type, and the type has to be usable
/// through a shared reference from several processes at once (interior mutability only through
/// atomics or otherwise synchronized cells).
pub unsafe trait SharedLayout: Sync {}

/// A POSIX shared memory segment of exactly `size_of::<T>()` bytes mapped into this process.
///
/// The mapping is removed on drop. If the handle created the segment, its name is also removed
/// from the system namespace on drop; other processes keep their mappings until they drop them.
pub struct SharedMapping<T: SharedLayout> {
    ptr: NonNull<T>,
    name: CString,
    owner: bool,
    _marker: PhantomData<T>,
}

// SAFETY: T is Sync and the mapping itself is plain memory.
unsafe impl<T: SharedLayout> Send for SharedMapping<T> {}
unsafe impl<T: SharedLayout> Sync for SharedMapping<T> {}

impl<T: SharedLayout> SharedMapping<T> {
    /// Creates the segment, sizes it and maps it. The new segment is zero-filled. Fails if the
    /// name already exists.
    pub fn create(name: &str) -> Result<Self, ChannelError> {
        let c_name = c_name(name)?;
        // SAFETY: c_name is NUL-terminated.
        let fd = unsafe {
            libc::shm_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL | libc::O_RDWR,
                0o600 as libc::mode_t,
            )
        };
        if fd < 0 {
            return Err(error("create", name, io::Error::last_os_error()));
        }

        let mapped = Self::truncate_and_map(fd, name);
        // SAFETY: fd is open; the mapping does not depend on it.
        unsafe { libc::close(fd) };

        match mapped {
            Ok(ptr) => Ok(Self {
                ptr,
                name: c_name,
                owner: true,
                _marker: PhantomData,
            }),
            Err(e) => {
                // SAFETY: c_name is NUL-terminated.
                unsafe { libc::shm_unlink(c_name.as_ptr()) };
                Err(e)
            }
        }
    }

    /// Maps an existing segment. Fails if it does not exist or its size does not match
    /// `size_of::<T>()`.
    pub fn open(name: &str) -> Result<Self, ChannelError> {
        let c_name = c_name(name)?;
        // SAFETY: c_name is NUL-terminated.
        let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDWR, 0 as libc::mode_t) };
        if fd < 0 {
            return Err(error("open", name, io::Error::last_os_error()));
        }

        let mapped = Self::check_size_and_map(fd, name);
        // SAFETY: fd is open; the mapping does not depend on it.
        unsafe { libc::close(fd) };

        Ok(Self {
            ptr: mapped?,
            name: c_name,
            owner: false,
            _marker: PhantomData,
        })
    }

    /// Removes `name` from the system namespace. A missing name is not an error.
    pub fn unlink(name: &str) -> Result<(), ChannelError> {
        let c_name = c_name(name)?;
        // SAFETY: c_name is NUL-terminated.
        if unsafe { libc::shm_unlink(c_name.as_ptr()) } != 0 {
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::NotFound {
                return Err(error("unlink", name, err));
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        self.name.to_str().unwrap_or("<invalid>")
    }

    fn truncate_and_map(fd: libc::c_int, name: &str) -> Result<NonNull<T>, ChannelError> {
        // SAFETY: fd is an open shared memory object.
        if unsafe { libc::ftruncate(fd, mem::size_of::<T>() as libc::off_t) } != 0 {
            return Err(error("truncate", name, io::Error::last_os_error()));
        }
        Self::map(fd, name)
    }

    fn check_size_and_map(fd: libc::c_int, name: &str) -> Result<NonNull<T>, ChannelError> {
        // SAFETY: stat is plain old data and filled in by fstat.
        let mut stat: libc::stat = unsafe { mem::zeroed() };
        if unsafe { libc::fstat(fd, &mut stat) } != 0 {
            return Err(error("inspect", name, io::Error::last_os_error()));
        }

        if stat.st_size as usize != mem::size_of::<T>() {
            return Err(ChannelError::SizeMismatch {
                name: name.to_string(),
                expected: mem::size_of::<T>(),
                found: stat.st_size as usize,
            });
        }
        Self::map(fd, name)
    }

    fn map(fd: libc::c_int, name: &str) -> Result<NonNull<T>, ChannelError> {
        // SAFETY: the object has at least size_of::<T>() bytes; the kernel picks the address.
        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                mem::size_of::<T>(),
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(error("map", name, io::Error::last_os_error()));
        }

        NonNull::new(ptr as *mut T).ok_or_else(|| {
            error(
                "map",
                name,
                io::Error::new(io::ErrorKind::Other, "mmap returned a null pointer"),
            )
        })
    }
}

impl<T: SharedLayout> Deref for SharedMapping<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the mapping is page aligned, sized for T, zero-initialized or written by a
        // process sharing our layout, and lives until drop. T: SharedLayout covers the rest.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T: SharedLayout> Drop for SharedMapping<T> {
    fn drop(&mut self) {
        // SAFETY: ptr/size describe the mapping created in map; no references outlive self.
        if unsafe { libc::munmap(self.ptr.as_ptr() as *mut libc::c_void, mem::size_of::<T>()) }
            != 0
        {
            warn!(
                "Unmapping shared memory {} failed: {}",
                self.name(),
                io::Error::last_os_error()
            );
        }

        if self.owner {
            // SAFETY: self.name is NUL-terminated.
            if unsafe { libc::shm_unlink(self.name.as_ptr()) } != 0 {
                warn!(
                    "Removing shared memory {} failed: {}",
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
    ChannelError::SharedMemory {
        operation,
        name: name.to_string(),
        source,
    }
}
