//! Guest memory manager.
//!
//! The whole 32-bit guest address space is backed by one inaccessible 4 GiB
//! host reservation. Fixed segments hand out page-granular allocations inside
//! it, committing host pages on demand. All multi-byte accesses convert between
//! the guest's big-endian byte order and the host's.

use std::io;
use std::ptr;

use common::V128;
use thiserror::Error;
use tracing::{error, info};

mod host;
mod segment;

pub use host::GUEST_SPACE_SIZE;
pub use segment::{Segment, SegmentId};

use host::{HostWindow, Reservation};

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("could not reserve the guest address space")]
    Reserve(#[source] io::Error),
    #[error("could not pre-allocate the {0} segment")]
    Prealloc(&'static str),
}

pub struct Memory {
    segments: Vec<Segment>,
    window: HostWindow,
    // Dropped last: releases the mapping every segment points into.
    _reservation: Reservation,
}

impl Memory {
    pub fn new() -> Result<Memory, MemoryError> {
        let reservation = Reservation::reserve().map_err(|e| {
            error!("Could not reserve guest memory: {}", e);
            MemoryError::Reserve(e)
        })?;
        let window = reservation.window();

        let segments: Vec<Segment> = SegmentId::ALL
            .iter()
            .map(|&id| Segment::new(id, window))
            .collect();

        let memory = Memory {
            segments,
            window,
            _reservation: reservation,
        };

        // Main memory spans the user heap; the heap keeps its own allocator.
        let (user_start, user_size) = SegmentId::UserMemory.layout();
        memory.segment(SegmentId::MainMemory).carve(user_start, user_size);

        // SPU local stores are claimed as a single block.
        let spu = memory.segment(SegmentId::Spu);
        if spu.alloc_fixed(spu.start(), spu.size()) == 0 {
            error!("Could not allocate SPU memory");
            return Err(MemoryError::Prealloc(SegmentId::Spu.name()));
        }

        info!("guest memory reserved at {:p}", window.base());
        Ok(memory)
    }

    pub fn segment(&self, id: SegmentId) -> &Segment {
        &self.segments[id as usize]
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Allocates from the user heap. Returns 0 on failure.
    pub fn alloc(&self, size: u32, align: u32) -> u32 {
        self.segment(SegmentId::UserMemory).alloc(size, align)
    }

    pub fn free(&self, addr: u32) -> bool {
        self.segment(SegmentId::UserMemory).free(addr)
    }

    /// True if `addr` is backed by a live allocation in any segment.
    pub fn check(&self, addr: u32) -> bool {
        self.segments.iter().any(|s| s.is_allocated(addr))
    }

    /// Host address of guest address 0, used by translated code.
    pub fn base(&self) -> *mut u8 {
        self.window.base()
    }

    // Addresses past the window panic in `HostWindow::ptr`. Addresses inside it
    // on pages no segment has committed are still `PROT_NONE`, and touching
    // them raises SIGSEGV in the calling thread.
    #[inline(always)]
    fn load<const N: usize>(&self, addr: u32) -> [u8; N] {
        let ptr = self.window.ptr(addr, N) as *const [u8; N];
        unsafe { ptr::read_unaligned(ptr) }
    }

    #[inline(always)]
    fn store<const N: usize>(&self, addr: u32, bytes: [u8; N]) {
        let ptr = self.window.ptr(addr, N) as *mut [u8; N];
        unsafe { ptr::write_unaligned(ptr, bytes) }
    }

    /// Big-endian reads of guest memory.
    ///
    /// # Faults
    ///
    /// The page holding `addr` must be committed, i.e. part of a live
    /// allocation or a preallocated segment (see [`Memory::check`]). Reading an
    /// uncommitted page inside the 4 GiB window raises SIGSEGV. An access that
    /// runs past the end of the window panics.
    pub fn read8(&self, addr: u32) -> u8 {
        self.load::<1>(addr)[0]
    }

    pub fn read16(&self, addr: u32) -> u16 {
        u16::from_be_bytes(self.load(addr))
    }

    pub fn read32(&self, addr: u32) -> u32 {
        u32::from_be_bytes(self.load(addr))
    }

    pub fn read64(&self, addr: u32) -> u64 {
        u64::from_be_bytes(self.load(addr))
    }

    pub fn read128(&self, addr: u32) -> V128 {
        V128(u128::from_be_bytes(self.load(addr)))
    }

    /// Big-endian writes of guest memory. Faults like [`Memory::read8`]:
    /// SIGSEGV on an uncommitted page, a panic past the end of the window.
    pub fn write8(&self, addr: u32, value: u8) {
        self.store(addr, [value]);
    }

    pub fn write16(&self, addr: u32, value: u16) {
        self.store(addr, value.to_be_bytes());
    }

    pub fn write32(&self, addr: u32, value: u32) {
        self.store(addr, value.to_be_bytes());
    }

    pub fn write64(&self, addr: u32, value: u64) {
        self.store(addr, value.to_be_bytes());
    }

    pub fn write128(&self, addr: u32, value: V128) {
        self.store(addr, value.0.to_be_bytes());
    }

    /// Copies `dst.len()` guest bytes starting at `src`, filling `dst` from its high end.
    pub fn read_left(&self, dst: &mut [u8], src: u32) {
        let size = dst.len();
        for i in 0..size {
            dst[size - 1 - i] = self.read8(src.wrapping_add(i as u32));
        }
    }

    /// Copies `dst.len()` guest bytes ending at `src + len - 1`, filling `dst` from its low end.
    pub fn read_right(&self, dst: &mut [u8], src: u32) {
        let size = dst.len();
        for i in 0..size {
            dst[i] = self.read8(src.wrapping_add((size - 1 - i) as u32));
        }
    }

    pub fn write_left(&self, dst: u32, src: &[u8]) {
        let size = src.len();
        for i in 0..size {
            self.write8(dst.wrapping_add(i as u32), src[size - 1 - i]);
        }
    }

    pub fn write_right(&self, dst: u32, src: &[u8]) {
        let size = src.len();
        for i in 0..size {
            self.write8(dst.wrapping_add((size - 1 - i) as u32), src[i]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_fixed() {
        let expected = [
            (0x0001_0000, 0x2FFF_0000),
            (0x1000_0000, 0x1000_0000),
            (0x4000_0000, 0x1000_0000),
            (0xB000_0000, 0x1000_0000),
            (0xC000_0000, 0x1000_0000),
            (0xD000_0000, 0x1000_0000),
            (0xF000_0000, 0x1000_0000),
        ];
        for (id, layout) in SegmentId::ALL.iter().zip(expected) {
            assert_eq!(id.layout(), layout, "{:?}", id);
        }
    }

    #[test]
    fn spu_segment_is_preallocated() {
        let memory = Memory::new().unwrap();
        let spu = memory.segment(SegmentId::Spu);
        assert_eq!(spu.used(), spu.size());
        assert_eq!(spu.alloc(0x1000, 0x1000), 0);
        assert!(memory.check(0xF000_0000));
        assert!(memory.check(0xFFFF_FFFF));
    }

    #[test]
    fn check_tracks_allocations() {
        let memory = Memory::new().unwrap();
        assert!(!memory.check(0x1000_0000));
        let addr = memory.alloc(0x2000, 0x1000);
        assert_ne!(addr, 0);
        assert!(memory.check(addr));
        assert!(memory.check(addr + 0x1fff));
        assert!(!memory.check(addr + 0x2000));
        assert!(memory.free(addr));
        assert!(!memory.check(addr));
        assert!(!memory.free(addr));
    }

    #[test]
    fn main_memory_skips_the_user_heap() {
        let memory = Memory::new().unwrap();
        let main = memory.segment(SegmentId::MainMemory);
        assert_eq!(main.alloc_fixed(0x1000_0000, 0x1000), 0);
        assert_eq!(main.alloc_fixed(0x0fff_f000, 0x2000), 0);
        let big = main.alloc(0x0fff_0000, 0x1000);
        assert_eq!(big, 0x0001_0000);
        let next = main.alloc(0x1000, 0x1000);
        assert_eq!(next, 0x2000_0000);
        // carved range is not an allocation of main memory
        assert!(!main.free(0x1000_0000));
    }

    #[test]
    fn big_endian_access() {
        let memory = Memory::new().unwrap();
        let addr = memory.alloc(0x1000, 0x1000);
        memory.write32(addr, 0x1234_5678);
        assert_eq!(memory.read8(addr), 0x12);
        assert_eq!(memory.read8(addr + 3), 0x78);
        assert_eq!(memory.read16(addr + 2), 0x5678);

        memory.write64(addr + 8, 0x0102_0304_0506_0708);
        assert_eq!(memory.read32(addr + 8), 0x0102_0304);
        assert_eq!(memory.read64(addr + 8), 0x0102_0304_0506_0708);

        let v = V128(0x00112233_44556677_8899aabb_ccddeeff);
        memory.write128(addr + 0x10, v);
        assert_eq!(memory.read8(addr + 0x10), 0x00);
        assert_eq!(memory.read8(addr + 0x1f), 0xff);
        assert_eq!(memory.read128(addr + 0x10), v);
    }

    #[test]
    fn left_and_right_copies_mirror_bytes() {
        let memory = Memory::new().unwrap();
        let addr = memory.alloc(0x1000, 0x1000);
        memory.write32(addr, 0x0102_0304);

        let mut left = [0u8; 4];
        memory.read_left(&mut left, addr);
        assert_eq!(left, [4, 3, 2, 1]);

        let mut right = [0u8; 3];
        memory.read_right(&mut right, addr);
        assert_eq!(right, [3, 2, 1]);

        memory.write_left(addr + 0x10, &[0xaa, 0xbb]);
        assert_eq!(memory.read16(addr + 0x10), 0xbbaa);

        memory.write_right(addr + 0x20, &[0xaa, 0xbb, 0xcc]);
        assert_eq!(memory.read8(addr + 0x20), 0xcc);
        assert_eq!(memory.read8(addr + 0x22), 0xaa);
    }

    fn killed_by_segv(access: impl FnOnce()) -> bool {
        match unsafe { libc::fork() } {
            -1 => panic!("fork: {}", io::Error::last_os_error()),
            0 => {
                access();
                unsafe { libc::_exit(0) }
            }
            child => {
                let mut status = 0;
                assert_eq!(unsafe { libc::waitpid(child, &mut status, 0) }, child);
                libc::WIFSIGNALED(status) && libc::WTERMSIG(status) == libc::SIGSEGV
            }
        }
    }

    #[test]
    fn uncommitted_pages_fault() {
        let memory = Memory::new().unwrap();
        let user = memory.segment(SegmentId::UserMemory).start();
        assert!(!memory.check(user));
        assert!(killed_by_segv(|| {
            memory.read32(user);
        }));
        assert!(killed_by_segv(|| memory.write8(user + 0x10, 1)));

        let addr = memory.alloc(0x1000, 0x1000);
        assert_ne!(addr, 0);
        assert!(!killed_by_segv(|| memory.write32(addr, 0xdead_beef)));
    }

    #[test]
    #[should_panic(expected = "outside the address space")]
    fn access_past_the_window_panics() {
        let memory = Memory::new().unwrap();
        memory.read32(0xFFFF_FFFE);
    }
}
