//! FAT directory entry structure and parsing.
//!
//! Each directory entry is 32 bytes and contains metadata about a file or
//! directory: its 8.3 short name, attributes, timestamps, first cluster and
//! size. Only the name, attributes, first cluster and size are interpreted.

use binread::{BinRead, BinReaderExt};
use getset::CopyGetters;
use std::borrow::Cow;
use std::fmt;
use std::io;

use crate::constants::DIR_ENTRY_SIZE;
use crate::filesystem::fat_error::FATError;
use crate::utils;

/// Attribute bit set on directories.
pub const ATTR_DIRECTORY: u8 = 0x10;
/// Attribute value of a long filename fragment.
pub const ATTR_LONG_NAME: u8 = 0x0F;

const END_MARKER: u8 = 0x00;
const DELETED_MARKER: u8 = 0xE5;
const DOT_NAME: &[u8; 11] = b".          ";
const DOTDOT_NAME: &[u8; 11] = b"..         ";

/// How a directory entry slot must be treated by a directory walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// First name byte 0x00: no entries follow in this cluster.
    End,
    /// First name byte 0xE5: the slot is free.
    Deleted,
    /// Attribute 0x0F: a long filename fragment.
    LongName,
    /// The "." or ".." entry of a subdirectory.
    Dot,
    /// A file or directory to report.
    Regular,
}

/// FAT directory entry structure.
///
/// # Notes
/// - Timestamp fields are prefixed with underscore as they're not currently used
/// - The name field uses the legacy 8.3 format with space padding
#[derive(BinRead, Debug, Clone, CopyGetters)]
#[br(little)]
pub struct DirEntry {
    /// Filename in 8.3 format (8 characters name + 3 characters extension)
    #[get_copy = "pub"]
    name: [u8; 11],
    /// File attributes byte
    #[get_copy = "pub"]
    attr: u8,
    /// NT reserved (unused)
    _n_t_res: u8,
    /// Creation time in 10ms units
    _ctr_time_tenth: u8,
    /// Creation time
    _crt_time: u16,
    /// Creation date
    _crt_date: u16,
    /// Last access date
    _lst_acc_date: u16,
    /// High 16 bits of first cluster number
    fst_clus_hi: u16,
    /// Last write time
    _wrt_time: u16,
    /// Last write date
    _wrt_date: u16,
    /// Low 16 bits of first cluster number
    fst_clus_lo: u16,
    /// File size in bytes (0 for directories)
    #[get_copy = "pub"]
    file_size: u32,
}

impl DirEntry {
    /// Creates a directory entry from the first 32 bytes of a slice.
    pub fn from_slice(buf: &[u8]) -> Result<Self, FATError> {
        utils::ensure_len(buf, DIR_ENTRY_SIZE)?;
        let mut reader = io::Cursor::new(&buf[..DIR_ENTRY_SIZE]);
        reader.read_le().map_err(FATError::from)
    }

    /// Classifies the entry. The name markers are checked before the attribute,
    /// and "." / ".." must match the full 11 padded bytes.
    pub fn kind(&self) -> EntryKind {
        match self.name[0] {
            END_MARKER => EntryKind::End,
            DELETED_MARKER => EntryKind::Deleted,
            _ if self.attr == ATTR_LONG_NAME => EntryKind::LongName,
            _ if &self.name == DOT_NAME || &self.name == DOTDOT_NAME => EntryKind::Dot,
            _ => EntryKind::Regular,
        }
    }

    /// Returns the raw base name: at most 8 bytes, cut at the first space.
    /// The extension is not part of it.
    ///
    /// Bytes are kept as stored; short names are in an OEM code page, not UTF-8.
    pub fn short_name(&self) -> &[u8] {
        let base = &self.name[..8];
        let len = base.iter().position(|&b| b == b' ').unwrap_or(base.len());
        &base[..len]
    }

    /// Returns the full 8.3 name for display, "NAME.EXT" or "NAME" without
    /// extension. Non-ASCII bytes are replaced.
    pub fn display_name(&self) -> String {
        let base = String::from_utf8_lossy(self.short_name());
        let ext = String::from_utf8_lossy(&self.name[8..11]);
        let ext = ext.trim_end();

        if ext.is_empty() {
            base.into_owned()
        } else {
            format!("{base}.{ext}")
        }
    }

    /// Returns the complete first cluster number for this entry:
    /// `(fst_clus_hi << 16) | fst_clus_lo`
    pub fn cluster_number(&self) -> u32 {
        ((self.fst_clus_hi as u32) << 16) | self.fst_clus_lo as u32
    }

    /// Checks if the directory attribute bit (0x10) is set.
    pub fn is_dir(&self) -> bool {
        self.attr & ATTR_DIRECTORY != 0
    }
}

impl fmt::Display for DirEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" {}B", self.display_name(), self.file_size)
    }
}

/// A directory entry as reported by a directory walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirRecord {
    /// Raw base short name, at most 8 bytes.
    pub name: Vec<u8>,
    pub is_dir: bool,
    /// First cluster of the entry's data (informational).
    pub first_cluster: u32,
    /// Size in bytes (informational, 0 for directories).
    pub file_size: u32,
}

impl From<&DirEntry> for DirRecord {
    fn from(entry: &DirEntry) -> Self {
        DirRecord {
            name: entry.short_name().to_vec(),
            is_dir: entry.is_dir(),
            first_cluster: entry.cluster_number(),
            file_size: entry.file_size,
        }
    }
}

impl DirRecord {
    /// The name decoded for display; non-ASCII bytes are replaced.
    pub fn name_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }
}

impl fmt::Display for DirRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dir {
            write!(f, "{}/", self.name_lossy())
        } else {
            write!(f, "{} {}B", self.name_lossy(), self.file_size)
        }
    }
}
