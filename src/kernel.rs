use std::{
    ptr::NonNull,
    sync::atomic::{AtomicUsize, Ordering},
};

/// Virtual memory page size of the computer. This is usually 4096.
/// This value should be a constant, but we can't do that since we
/// don't know the value at compile time. Zero means not queried yet.
static PAGE_SIZE: AtomicUsize = AtomicUsize::new(0);

/// Zero sized handle on the operating system's memory primitives.
pub(crate) struct Kernel;

/// This trait provides an abstraction to handle low level memory operations
/// and syscalls. As the allocator, our top level view of this, has nothing
/// to do with the concrete implementations / APIs offered by each kernel.
trait PlatformMemory {
    /// Request a memory region of size `len`. It returns a Pointer to the
    /// given location or None if the underlying syscall fails.
    unsafe fn request_memory(len: usize) -> Option<NonNull<u8>>;

    /// Returns the memory of size `len` starting from `addr` back to the kernel.
    unsafe fn return_memory(addr: *mut u8, len: usize);

    /// Returns the virtual memory page size of the computer in bytes.
    unsafe fn page_size() -> usize;
}

/// Wrapper to calculate the computer's page size.
#[inline]
pub(crate) fn page_size() -> usize {
    match PAGE_SIZE.load(Ordering::Relaxed) {
        0 => {
            let size = unsafe { Kernel::page_size() };
            PAGE_SIZE.store(size, Ordering::Relaxed);
            size
        }
        size => size,
    }
}

/// Wrapper to use [`Kernel::request_memory`]
#[inline]
pub(crate) unsafe fn request_memory(len: usize) -> Option<NonNull<u8>> {
    unsafe { Kernel::request_memory(len) }
}

/// Wrapper to use [`Kernel::return_memory`]
#[inline]
pub(crate) unsafe fn return_memory(addr: *mut u8, len: usize) {
    unsafe { Kernel::return_memory(addr, len); }
}

#[cfg(unix)]
pub(crate) use self::unix::extend_break;

#[cfg(windows)]
pub(crate) use self::windows::EmulatedBreak;

#[cfg(unix)]
mod unix {
    use super::{Kernel, PlatformMemory};
    use crate::utils::{align, WORD_SIZE};

    use libc::{intptr_t, mmap, munmap, off_t, sbrk, size_t};
    use log::warn;

    use std::{os::raw::{c_int, c_void}, ptr::NonNull};

    /// What `sbrk` returns when the break cannot move.
    const BREAK_FAILED: *mut c_void = usize::MAX as *mut c_void;

    impl PlatformMemory for Kernel {
        unsafe fn request_memory(len: usize) -> Option<NonNull<u8>> {
            // mmap parameters.
            const ADDR: *mut c_void = std::ptr::null_mut::<c_void>();
            // Read-Write only memory.
            const PROT: c_int = libc::PROT_READ | libc::PROT_WRITE;
            const FLAGS: c_int = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS;
            const FD: c_int = -1;
            const OFFSET: off_t = 0;

            unsafe {
                let addr = mmap(ADDR, len as size_t, PROT, FLAGS, FD, OFFSET);

                match addr {
                    libc::MAP_FAILED => None,
                    addr => NonNull::new(addr.cast::<u8>()),
                }
            }
        }

        unsafe fn return_memory(addr: *mut u8, len: usize) {
            unsafe { munmap(addr as *mut c_void, len as size_t); }
        }

        unsafe fn page_size() -> usize {
            unsafe { libc::sysconf(libc::_SC_PAGE_SIZE) as usize }
        }
    }

    /// Bytes missing when a range reserved at `base` set aside only
    /// `padding` bytes to reach the next word. Zero when the padding is enough.
    pub(super) fn alignment_shortfall(base: usize, padding: usize) -> usize {
        (align(base, WORD_SIZE) - base).saturating_sub(padding)
    }

    /// Moves the program break up by `len` bytes and returns the start of
    /// the new, word aligned range.
    ///
    /// Other code in the process (the platform `malloc` included) may move
    /// the break too and leave it misaligned, so the break is padded up to
    /// the next word first. If the break moved between being read and the
    /// increment the padding may fall short; the range is then topped up by
    /// the missing bytes, provided nobody moved the break again in between.
    /// Otherwise the reserved bytes are abandoned and the growth fails.
    ///
    /// **SAFETY**: callers must serialize calls, see [`crate::Segment`].
    pub(crate) unsafe fn extend_break(len: usize) -> Option<NonNull<u8>> {
        unsafe {
            let current = sbrk(0);

            if current == BREAK_FAILED {
                return None;
            }

            let padding = align(current as usize, WORD_SIZE) - current as usize;
            let reserved = len.checked_add(padding)?;
            let increment = intptr_t::try_from(reserved).ok()?;

            let base = sbrk(increment);

            if base == BREAK_FAILED {
                return None;
            }

            let shortfall = alignment_shortfall(base as usize, padding);

            if shortfall > 0 {
                let top = sbrk(shortfall as intptr_t);

                if top as usize != base as usize + reserved {
                    warn!(
                        "program break moved during growth, abandoning {reserved} bytes at {:p}",
                        base
                    );
                    return None;
                }
            }

            NonNull::new(align(base as usize, WORD_SIZE) as *mut u8)
        }
    }
}

#[cfg(windows)]
mod windows {
    use std::{mem::MaybeUninit, ptr::NonNull, os::raw::c_void};

    use crate::kernel::{Kernel, PlatformMemory};
    use crate::utils::align;

    use windows::Win32::System::{Memory, SystemInformation};

    impl PlatformMemory for Kernel {
        unsafe fn request_memory(len: usize) -> Option<std::ptr::NonNull<u8>> {
            // Read-Write only.
            let protection = Memory::PAGE_READWRITE;

            let flags = Memory::MEM_RESERVE | Memory::MEM_COMMIT;

            unsafe {
                let addr = Memory::VirtualAlloc(None, len, flags, protection);

                NonNull::new(addr.cast())
            }
        }

        unsafe fn return_memory(addr: *mut u8, _len: usize) {
            unsafe { let _ = Memory::VirtualFree(addr as *mut c_void, 0, Memory::MEM_RELEASE); }
        }

        unsafe fn page_size() -> usize {
            unsafe {
                let mut system_info = MaybeUninit::uninit();
                SystemInformation::GetSystemInfo(system_info.as_mut_ptr());

                system_info.assume_init().dwPageSize as usize
            }
        }
    }

    /// Address space set aside for the emulated data segment.
    const RESERVATION: usize = if usize::BITS == 64 { 1 << 36 } else { 1 << 28 };

    /// Windows has no program break, so one is emulated: a large range of
    /// address space is reserved on first use and pages are committed as
    /// the break moves through it.
    pub(crate) struct EmulatedBreak {
        base: usize,
        brk: usize,
        committed: usize,
    }

    impl EmulatedBreak {
        pub const fn new() -> Self {
            Self { base: 0, brk: 0, committed: 0 }
        }

        /// Moves the emulated break up by `len` bytes and returns its old value.
        pub unsafe fn extend(&mut self, len: usize) -> Option<NonNull<u8>> {
            unsafe {
                if self.base == 0 {
                    let addr = Memory::VirtualAlloc(
                        None,
                        RESERVATION,
                        Memory::MEM_RESERVE,
                        Memory::PAGE_NOACCESS,
                    );

                    if addr.is_null() {
                        return None;
                    }

                    self.base = addr as usize;
                    self.brk = self.base;
                    self.committed = self.base;
                }

                let limit = self.base + RESERVATION;
                let new_brk = self.brk.checked_add(len).filter(|end| *end <= limit)?;

                if new_brk > self.committed {
                    let commit_to = align(new_brk, super::page_size()).min(limit);

                    let addr = Memory::VirtualAlloc(
                        Some(self.committed as *const c_void),
                        commit_to - self.committed,
                        Memory::MEM_COMMIT,
                        Memory::PAGE_READWRITE,
                    );

                    if addr.is_null() {
                        return None;
                    }

                    self.committed = commit_to;
                }

                let old = self.brk;
                self.brk = new_brk;

                NonNull::new(old as *mut u8)
            }
        }
    }
}
