use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use common::util::{align_down, align_up, is_power_of_two, PAGE_SIZE};
use tracing::{debug, warn};

use crate::host::HostWindow;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SegmentId {
    MainMemory,
    UserMemory,
    RsxMapMemory,
    MmapperMemory,
    RsxLocalMemory,
    Stack,
    Spu,
}

impl SegmentId {
    pub const ALL: [SegmentId; 7] = [
        SegmentId::MainMemory,
        SegmentId::UserMemory,
        SegmentId::RsxMapMemory,
        SegmentId::MmapperMemory,
        SegmentId::RsxLocalMemory,
        SegmentId::Stack,
        SegmentId::Spu,
    ];

    /// Guest base address and size of the segment.
    pub const fn layout(self) -> (u32, u32) {
        match self {
            SegmentId::MainMemory => (0x0001_0000, 0x2FFF_0000),
            SegmentId::UserMemory => (0x1000_0000, 0x1000_0000),
            SegmentId::RsxMapMemory => (0x4000_0000, 0x1000_0000),
            SegmentId::MmapperMemory => (0xB000_0000, 0x1000_0000),
            SegmentId::RsxLocalMemory => (0xC000_0000, 0x1000_0000),
            SegmentId::Stack => (0xD000_0000, 0x1000_0000),
            SegmentId::Spu => (0xF000_0000, 0x1000_0000),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            SegmentId::MainMemory => "main",
            SegmentId::UserMemory => "user",
            SegmentId::RsxMapMemory => "rsx-map",
            SegmentId::MmapperMemory => "mmapper",
            SegmentId::RsxLocalMemory => "rsx-local",
            SegmentId::Stack => "stack",
            SegmentId::Spu => "spu",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum BlockKind {
    Allocated,
    /// Range owned by a nested segment. Never committed or freed through this one.
    Carved,
}

#[derive(Debug, Copy, Clone)]
struct Block {
    size: u32,
    kind: BlockKind,
}

#[derive(Default)]
struct SegmentState {
    blocks: BTreeMap<u32, Block>,
    used: u32,
}

/// A fixed sub-range of the guest address space with a page-granular first-fit allocator.
pub struct Segment {
    id: SegmentId,
    start: u32,
    size: u32,
    window: HostWindow,
    state: Mutex<SegmentState>,
}

impl Segment {
    pub(crate) fn new(id: SegmentId, window: HostWindow) -> Segment {
        let (start, size) = id.layout();
        Segment {
            id,
            start,
            size,
            window,
            state: Mutex::new(SegmentState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SegmentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn end(&self) -> u64 {
        self.start as u64 + self.size as u64
    }

    pub fn id(&self) -> SegmentId {
        self.id
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Bytes currently handed out by this segment.
    pub fn used(&self) -> u32 {
        self.lock().used
    }

    pub fn contains(&self, addr: u32) -> bool {
        addr >= self.start && (addr as u64) < self.end()
    }

    /// True if `addr` lies inside a live allocation of this segment.
    pub fn is_allocated(&self, addr: u32) -> bool {
        if !self.contains(addr) {
            return false;
        }
        let state = self.lock();
        match state.blocks.range(..=addr).next_back() {
            Some((&base, block)) => {
                block.kind == BlockKind::Allocated && (addr as u64) < base as u64 + block.size as u64
            }
            None => false,
        }
    }

    /// Allocates `size` bytes aligned to `align` (at least one page).
    /// Returns 0 when the segment is exhausted or the alignment is not a power of two.
    pub fn alloc(&self, size: u32, align: u32) -> u32 {
        if size == 0 || !is_power_of_two(align) {
            return 0;
        }
        let align = align.max(PAGE_SIZE) as u64;
        let Some(size) = align_up(size as u64, PAGE_SIZE as u64) else {
            return 0;
        };

        let mut state = self.lock();
        let Some(mut candidate) = align_up(self.start as u64, align) else {
            return 0;
        };
        for (&base, block) in state.blocks.iter() {
            if candidate + size <= base as u64 {
                break;
            }
            let Some(next) = align_up(base as u64 + block.size as u64, align) else {
                return 0;
            };
            candidate = candidate.max(next);
        }
        if candidate + size > self.end() {
            debug!("{} segment exhausted: {:#x} bytes requested", self.id.name(), size);
            return 0;
        }

        self.claim(&mut state, candidate as u32, size as u32)
    }

    /// Allocates exactly `[addr, addr + size)`, widened to page boundaries.
    /// Returns the page-aligned start, or 0 if the range is outside the segment or taken.
    pub fn alloc_fixed(&self, addr: u32, size: u32) -> u32 {
        if size == 0 {
            return 0;
        }
        let start = align_down(addr as u64, PAGE_SIZE as u64);
        let Some(end) = align_up(addr as u64 + size as u64, PAGE_SIZE as u64) else {
            return 0;
        };
        if start < self.start as u64 || end > self.end() {
            return 0;
        }

        let mut state = self.lock();
        if Self::overlaps(&state, start, end) {
            debug!("{} segment: fixed range {:#x}..{:#x} already taken", self.id.name(), start, end);
            return 0;
        }

        self.claim(&mut state, start as u32, (end - start) as u32)
    }

    /// Marks a range as owned elsewhere so the allocator never hands it out.
    pub(crate) fn carve(&self, addr: u32, size: u32) {
        let mut state = self.lock();
        state.blocks.insert(addr, Block { size, kind: BlockKind::Carved });
    }

    /// Releases the allocation starting at `addr`. Returns false if there is none.
    pub fn free(&self, addr: u32) -> bool {
        let mut state = self.lock();
        let size = match state.blocks.get(&addr) {
            Some(block) if block.kind == BlockKind::Allocated => block.size,
            _ => return false,
        };
        state.blocks.remove(&addr);
        state.used -= size;
        drop(state);

        if let Err(e) = self.window.decommit(addr, size) {
            warn!("{} segment: failed to decommit {:#010x}: {}", self.id.name(), addr, e);
        }
        debug!("{} segment: free {:#010x} ({:#x} bytes)", self.id.name(), addr, size);
        true
    }

    fn overlaps(state: &SegmentState, start: u64, end: u64) -> bool {
        // Blocks never overlap, so only the last one starting below `end` can reach `start`.
        match state.blocks.iter().rev().find(|(&base, _)| (base as u64) < end) {
            Some((&base, block)) => base as u64 + block.size as u64 > start,
            None => false,
        }
    }

    fn claim(&self, state: &mut SegmentState, addr: u32, size: u32) -> u32 {
        if let Err(e) = self.window.commit(addr, size) {
            warn!("{} segment: failed to commit {:#010x}: {}", self.id.name(), addr, e);
            return 0;
        }
        state.blocks.insert(addr, Block { size, kind: BlockKind::Allocated });
        state.used += size;
        debug!("{} segment: alloc {:#010x} ({:#x} bytes)", self.id.name(), addr, size);
        addr
    }
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segment")
            .field("id", &self.id)
            .field("start", &format_args!("{:#010x}", self.start))
            .field("size", &format_args!("{:#x}", self.size))
            .field("used", &format_args!("{:#x}", self.used()))
            .finish()
    }
}
