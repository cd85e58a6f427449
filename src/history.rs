//! Command history kept in a fixed-size ring of newline-terminated records.
//!
//! The ring is normally a shared mapping of a small file, so every shell
//! started from the same executable sees (and appends to) the same history.
//! There is no header: the write position is recovered from the contents, and
//! a NUL byte always marks where the live tail ends. Appends from two shells
//! are not serialized and may interleave.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::num::NonZeroUsize;
use std::ops::{Deref, DerefMut};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::ptr::NonNull;

use nix::sys::mman::{mmap, munmap, MapFlags, ProtFlags};
use tracing::{debug, warn};

use crate::types::{Context, ShellError, ShellResult};

pub const HISTORY_FILE_NAME: &str = "pipework_history";
pub const DEFAULT_CAPACITY: usize = 4096;

/// Page size of the running system, falling back to 4096.
pub fn page_size() -> usize {
    // SAFETY: sysconf has no preconditions.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as usize
    } else {
        DEFAULT_CAPACITY
    }
}

/// A file mapped `MAP_SHARED` read/write; unmapped on drop.
pub struct SharedMapping {
    ptr: NonNull<u8>,
    len: usize,
}

impl SharedMapping {
    pub fn open(path: &Path, len: usize) -> ShellResult<Self> {
        let length = NonZeroUsize::new(len)
            .ok_or_else(|| ShellError::InternalError("history capacity must be non-zero".into()))?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .mode(0o600)
            .open(path)
            .context("open history file")?;

        // A new file reads as all zeroes once extended; an existing one keeps
        // its records.
        if file.metadata().context("stat history file")?.len() < len as u64 {
            file.set_len(len as u64).context("extend history file")?;
        }

        // SAFETY: fresh mapping of `len` bytes of a file at least that long.
        let addr = unsafe {
            mmap(
                None,
                length,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                Some(&file),
                0,
            )
        }
        .context("map history file")?;

        let ptr = NonNull::new(addr as *mut u8)
            .ok_or_else(|| ShellError::InternalError("mmap returned null".into()))?;
        Ok(Self { ptr, len })
    }
}

impl Deref for SharedMapping {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // SAFETY: ptr/len describe a live mapping owned by self.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl DerefMut for SharedMapping {
    fn deref_mut(&mut self) -> &mut [u8] {
        // SAFETY: as above, and &mut self gives exclusive access within this
        // process.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for SharedMapping {
    fn drop(&mut self) {
        // SAFETY: unmaps exactly the region created in `open`.
        if let Err(errno) = unsafe { munmap(self.ptr.as_ptr().cast(), self.len) } {
            warn!(%errno, "failed to unmap history");
        }
    }
}

enum Region {
    Shared(SharedMapping),
    Private(Box<[u8]>),
}

impl Deref for Region {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Region::Shared(map) => map,
            Region::Private(buf) => buf,
        }
    }
}

impl DerefMut for Region {
    fn deref_mut(&mut self) -> &mut [u8] {
        match self {
            Region::Shared(map) => map,
            Region::Private(buf) => buf,
        }
    }
}

pub struct History {
    region: Option<Region>,
    offset: usize,
}

impl History {
    /// History that records nothing and renders nothing.
    pub fn disabled() -> Self {
        Self {
            region: None,
            offset: 0,
        }
    }

    /// A private ring, not backed by any file.
    pub fn in_memory(capacity: usize) -> Self {
        if capacity < 2 {
            warn!(capacity, "history capacity too small, history disabled");
            return Self::disabled();
        }
        Self::with_region(Region::Private(vec![0; capacity].into_boxed_slice()))
    }

    pub fn open(path: &Path, capacity: usize) -> ShellResult<Self> {
        if capacity < 2 {
            return Err(ShellError::InternalError(format!(
                "history capacity {} is too small",
                capacity
            )));
        }
        let map = SharedMapping::open(path, capacity)?;
        debug!(path = %path.display(), capacity, "mapped history file");
        Ok(Self::with_region(Region::Shared(map)))
    }

    /// Like `open`, but a failure only disables history for this session.
    pub fn open_or_disabled(path: &Path, capacity: usize) -> Self {
        match Self::open(path, capacity) {
            Ok(history) => history,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "history unavailable, continuing without it");
                Self::disabled()
            }
        }
    }

    fn with_region(region: Region) -> Self {
        // Start just past the most recent newline, or at the beginning.
        let offset = region.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
        let mut history = Self {
            region: Some(region),
            offset,
        };
        history.resync();
        history
    }

    pub fn is_available(&self) -> bool {
        self.region.is_some()
    }

    pub fn capacity(&self) -> usize {
        self.region.as_ref().map_or(0, |r| r.len())
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    // Another shell may have appended since we last looked: move forward to
    // the first NUL, wrapping at most once.
    fn resync(&mut self) {
        let Some(buf) = self.region.as_ref() else {
            return;
        };
        let cap = buf.len();
        if self.offset >= cap {
            self.offset = 0;
        }
        let from = self.offset;
        if buf[from] == 0 {
            return;
        }
        let next_free = (1..cap).map(|step| (from + step) % cap).find(|&i| buf[i] == 0);
        match next_free {
            Some(i) => self.offset = i,
            None => {
                // Not a single terminator anywhere: start over from the top.
                debug!("history buffer has no terminator, resetting");
                self.offset = 0;
            }
        }
    }

    pub fn append(&mut self, record: &str) {
        let text = record.trim_end_matches('\n').as_bytes();
        if text.is_empty() || text.contains(&0) {
            return;
        }
        let cap = self.capacity();
        if cap == 0 {
            return;
        }
        // The record, its newline and the tail terminator all have to fit.
        let len = text.len() + 1;
        if len > cap - 1 {
            debug!(len, cap, "history record too long, not stored");
            return;
        }

        self.resync();
        let mut start = self.offset;
        let Some(buf) = self.region.as_mut() else {
            return;
        };

        if start + len > cap - 1 {
            buf[start..].fill(0);
            start = 0;
        }
        buf[start..start + text.len()].copy_from_slice(text);
        buf[start + text.len()] = b'\n';

        // Terminate the tail and wipe whatever is left of the record it
        // landed in.
        let tail = start + len;
        for byte in buf[tail..].iter_mut() {
            let old = std::mem::replace(byte, 0);
            if old == b'\n' || old == 0 {
                break;
            }
        }
        self.offset = tail;
    }

    /// The most recent `limit` records (all of them for `None`), oldest first.
    pub fn records(&mut self, limit: Option<usize>) -> Vec<Vec<u8>> {
        self.resync();
        let Some(buf) = self.region.as_ref() else {
            return Vec::new();
        };
        let wanted = limit.unwrap_or(usize::MAX);
        let (newer, older) = buf.split_at(self.offset);

        let mut found = Vec::new();
        // Walk back from the tail, then on from the end of the buffer.
        for span in [newer, older] {
            // Whatever follows the final newline is never a whole record.
            for piece in span.rsplit(|&b| b == b'\n').skip(1) {
                if found.len() >= wanted {
                    break;
                }
                let record = match piece.iter().rposition(|&b| b == 0) {
                    Some(nul) => &piece[nul + 1..],
                    None => piece,
                };
                if !record.is_empty() {
                    found.push(record.to_vec());
                }
            }
        }
        found.reverse();
        found
    }

    pub fn render(&mut self, limit: Option<usize>, out: &mut dyn Write) -> io::Result<()> {
        for record in self.records(limit) {
            out.write_all(&record)?;
            out.write_all(b"\n")?;
        }
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(history: &mut History, limit: Option<usize>) -> String {
        let mut out = Vec::new();
        history.render(limit, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_fresh_buffer_is_empty() {
        let mut history = History::in_memory(64);
        assert_eq!(history.offset(), 0);
        assert_eq!(rendered(&mut history, None), "");
        assert_eq!(rendered(&mut history, Some(5)), "");
    }

    #[test]
    fn test_trailing_newline_is_not_doubled() {
        let mut history = History::in_memory(64);
        history.append("ls -l\n");
        history.append("pwd");
        assert_eq!(rendered(&mut history, None), "ls -l\npwd\n");
        assert_eq!(history.offset(), "ls -l\npwd\n".len());
    }

    #[test]
    fn test_wrap_keeps_newest_in_order() {
        // 12 bytes: records must end by index 11, which holds the terminator.
        let mut history = History::in_memory(12);
        history.append("aa"); // 0..3
        history.append("bbbb"); // 3..8
        history.append("cc"); // 8..11
        assert_eq!(history.offset(), 11);
        assert_eq!(rendered(&mut history, None), "aa\nbbbb\ncc\n");

        history.append("ddd"); // wraps to 0..4, overwrites aa and bbbb
        assert_eq!(history.offset(), 4);
        assert_eq!(rendered(&mut history, None), "cc\nddd\n");
        assert_eq!(rendered(&mut history, Some(1)), "ddd\n");

        history.append("e"); // 4..6
        assert_eq!(rendered(&mut history, None), "cc\nddd\ne\n");

        history.append("ffff"); // 6..11, overwrites cc
        assert_eq!(rendered(&mut history, None), "ddd\ne\nffff\n");
        assert_eq!(rendered(&mut history, Some(0)), "");
        assert_eq!(rendered(&mut history, Some(10)), "ddd\ne\nffff\n");
    }

    #[test]
    fn test_rejects_oversized_and_nul_records() {
        let mut history = History::in_memory(8);
        history.append("1234567"); // needs 9 bytes with newline and terminator
        history.append("ab\0cd");
        history.append("");
        assert_eq!(rendered(&mut history, None), "");
        history.append("123456"); // exactly fits
        assert_eq!(rendered(&mut history, None), "123456\n");
    }

    #[test]
    fn test_garbage_buffer_never_panics() {
        let mut history = History::with_region(Region::Private(vec![0xff; 32].into_boxed_slice()));
        assert_eq!(rendered(&mut history, None), "");
        history.append("ok");
        assert_eq!(rendered(&mut history, None), "ok\n");
    }

    #[test]
    fn test_disabled_is_a_no_op() {
        let mut history = History::disabled();
        history.append("ls");
        assert!(!history.is_available());
        assert_eq!(rendered(&mut history, None), "");
    }
}
