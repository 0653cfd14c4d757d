use std::io;
use std::ptr::NonNull;

use tracing::{error, trace};

/// Size of the guest address space backed by one reservation.
pub const GUEST_SPACE_SIZE: u64 = 0x1_0000_0000;

/// Copyable handle to the start of the host mapping.
///
/// Only [`Reservation`] creates these and it outlives every holder inside [`crate::Memory`].
#[derive(Copy, Clone, Debug)]
pub(crate) struct HostWindow {
    base: NonNull<u8>,
}

// The window is a plain address range; concurrent access to disjoint guest
// addresses is allowed and torn accesses are the guest's problem.
unsafe impl Send for HostWindow {}
unsafe impl Sync for HostWindow {}

impl HostWindow {
    #[inline(always)]
    pub fn base(&self) -> *mut u8 {
        self.base.as_ptr()
    }

    /// Host pointer for a guest access of `len` bytes.
    /// Panics if the access leaves the 4 GiB window.
    #[inline(always)]
    pub fn ptr(&self, addr: u32, len: usize) -> *mut u8 {
        if addr as u64 + len as u64 > GUEST_SPACE_SIZE {
            panic!("guest access {:#010x}+{} outside the address space", addr, len);
        }
        unsafe { self.base.as_ptr().add(addr as usize) }
    }

    pub fn commit(&self, addr: u32, size: u32) -> io::Result<()> {
        trace!("commit {:#010x}..{:#010x}", addr, addr as u64 + size as u64);
        let ptr = self.ptr(addr, size as usize);
        let ret = unsafe {
            libc::mprotect(ptr as *mut libc::c_void, size as usize, libc::PROT_READ | libc::PROT_WRITE)
        };
        if ret != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    pub fn decommit(&self, addr: u32, size: u32) -> io::Result<()> {
        trace!("decommit {:#010x}..{:#010x}", addr, addr as u64 + size as u64);
        let ptr = self.ptr(addr, size as usize) as *mut libc::c_void;
        unsafe {
            if libc::madvise(ptr, size as usize, libc::MADV_DONTNEED) != 0 {
                return Err(io::Error::last_os_error());
            }
            if libc::mprotect(ptr, size as usize, libc::PROT_NONE) != 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(())
    }
}

/// Owns the 4 GiB inaccessible host mapping for the guest address space.
pub(crate) struct Reservation {
    window: HostWindow,
}

impl Reservation {
    pub fn reserve() -> io::Result<Reservation> {
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                GUEST_SPACE_SIZE as usize,
                libc::PROT_NONE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_NORESERVE,
                -1,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        let base = NonNull::new(ptr as *mut u8)
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "mmap returned null"))?;

        Ok(Reservation { window: HostWindow { base } })
    }

    pub fn window(&self) -> HostWindow {
        self.window
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        let ret = unsafe {
            libc::munmap(self.window.base() as *mut libc::c_void, GUEST_SPACE_SIZE as usize)
        };
        if ret != 0 {
            error!("Could not release guest memory: {}", io::Error::last_os_error());
        }
    }
}
