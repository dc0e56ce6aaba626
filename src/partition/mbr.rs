//! This module provides functionality for parsing the partition table of a
//! Master Boot Record (MBR).
//!
//! The table is read as four fixed 16-byte records starting at byte 446 of the
//! first sector. Records are decoded field by field in little-endian order; no
//! validation of the table itself is performed, so empty records are kept and
//! left to the caller to skip.
use binread::{BinRead, BinReaderExt};
use getset::CopyGetters;
use log::debug;
use std::fmt::Write;
use std::fmt::{self, Display};
use std::io;

use super::disk_error::DiskError;
use crate::constants::{
    BOOT_SIGNATURE, MBR_SIZE, PART_CNT, PART_ENTRY_SIZE, PART_TABLE_OFFSET, SIGNATURE_OFFSET,
};
use crate::traits::{ByteSource, LayoutDisplay};
use crate::utils;

/// Represents the type of a partition table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PTType {
    /// Unused table slot (0x00).
    Empty,
    /// FAT32 partition addressed with CHS (0x0B).
    Fat32Chs,
    /// FAT32 partition addressed with LBA (0x0C).
    Fat32Lba,
    /// Unsupported partition type, encapsulating the raw type byte.
    Unsupported(u8),
}

impl Display for PTType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PTType::Empty => write!(f, "Empty"),
            PTType::Fat32Chs => write!(f, "FAT32 CHS"),
            PTType::Fat32Lba => write!(f, "FAT32 LBA"),
            PTType::Unsupported(b) => write!(f, "Other 0x{b:02X}"),
        }
    }
}

impl PTType {
    /// Creates a `PTType` instance from the raw system id byte.
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => PTType::Empty,
            0x0B => PTType::Fat32Chs,
            0x0C => PTType::Fat32Lba,
            _ => PTType::Unsupported(byte),
        }
    }

    /// Whether this system id denotes a FAT32 volume.
    pub fn is_fat32(&self) -> bool {
        matches!(self, PTType::Fat32Chs | PTType::Fat32Lba)
    }
}

/// Represents a single 16-byte partition table entry.
///
/// The CHS addresses are kept for display only; the volume is always located
/// through `lba_start`.
#[derive(BinRead, Debug, Default, Clone, Copy, PartialEq, Eq, CopyGetters)]
#[br(little)]
pub struct PTEntry {
    /// 0x80 if the partition is bootable, 0x00 otherwise.
    #[get_copy = "pub"]
    boot_flag: u8,
    /// CHS address of the first sector.
    #[get_copy = "pub"]
    chs_start: [u8; 3],
    /// Partition type identifier.
    #[get_copy = "pub"]
    system_id: u8,
    /// CHS address of the last sector.
    #[get_copy = "pub"]
    chs_end: [u8; 3],
    /// The starting Logical Block Address (LBA) of the partition.
    #[get_copy = "pub"]
    lba_start: u32,
    /// The number of sectors in the partition.
    #[get_copy = "pub"]
    sector_cnt: u32,
}

impl PTEntry {
    /// Decodes a partition table entry from the first 16 bytes of `buf`.
    ///
    /// # Errors
    /// - `DiskError::TruncatedInput` if `buf` holds fewer than 16 bytes.
    pub fn from_slice(buf: &[u8]) -> Result<Self, DiskError> {
        utils::ensure_len(buf, PART_ENTRY_SIZE)?;
        let mut reader = io::Cursor::new(&buf[..PART_ENTRY_SIZE]);
        Ok(reader.read_le()?)
    }

    /// Returns the partition type derived from the system id.
    pub fn pt_type(&self) -> PTType {
        PTType::from_byte(self.system_id)
    }

    pub fn is_bootable(&self) -> bool {
        self.boot_flag == 0x80
    }

    /// An entry with no sectors describes no partition.
    pub fn is_empty(&self) -> bool {
        self.sector_cnt == 0
    }

    /// Returns the last sector of the partition, or `None` for an empty entry.
    pub fn end_lba(&self) -> Option<u32> {
        if self.is_empty() {
            None
        } else {
            Some(self.lba_start.wrapping_add(self.sector_cnt - 1))
        }
    }
}

/// Represents a Master Boot Record (MBR): its partition table entries and the
/// boot signature found at bytes 510-511.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mbr {
    /// The partition table entries in the MBR.
    pt_entries: [PTEntry; PART_CNT],
    /// The boot signature of the MBR, in on-disk byte order.
    boot_signature: [u8; 2],
}

impl Mbr {
    /// Reads and parses the MBR from the first sector of a byte source.
    ///
    /// # Returns
    /// - `Ok(Mbr)` if the MBR is successfully parsed.
    /// - `Err(DiskError)` if the sector cannot be read in full.
    pub fn from<S: ByteSource + ?Sized>(source: &mut S) -> Result<Mbr, DiskError> {
        let buffer = utils::read_exact_at::<_, DiskError>(source, 0, MBR_SIZE)?;
        Mbr::from_bytes(&buffer)
    }

    /// Decodes an MBR from a 512-byte buffer.
    ///
    /// The 0x55AA signature is recorded but not enforced.
    pub fn from_bytes(buffer: &[u8]) -> Result<Mbr, DiskError> {
        utils::ensure_len(buffer, MBR_SIZE)?;

        let mut pt_entries = [PTEntry::default(); PART_CNT];
        for (i, entry) in pt_entries.iter_mut().enumerate() {
            let offset = PART_TABLE_OFFSET + i * PART_ENTRY_SIZE;
            *entry = PTEntry::from_slice(&buffer[offset..offset + PART_ENTRY_SIZE])?;
            debug!(
                "Partition #{}: type 0x{:02X}, start {}, {} sectors",
                i + 1,
                entry.system_id,
                entry.lba_start,
                entry.sector_cnt
            );
        }

        Ok(Mbr {
            pt_entries,
            boot_signature: [
                utils::u8_at(buffer, SIGNATURE_OFFSET),
                utils::u8_at(buffer, SIGNATURE_OFFSET + 1),
            ],
        })
    }

    /// Returns the four partition table entries, empty ones included.
    pub fn pt_entries(&self) -> &[PTEntry; PART_CNT] {
        &self.pt_entries
    }

    /// Iterates over the entries with a non-zero sector count, along with
    /// their index in the table.
    pub fn used_entries(&self) -> impl Iterator<Item = (usize, &PTEntry)> {
        self.pt_entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.is_empty())
    }

    pub fn boot_signature(&self) -> [u8; 2] {
        self.boot_signature
    }

    /// Whether bytes 510-511 hold 0x55AA.
    pub fn has_boot_signature(&self) -> bool {
        self.boot_signature == BOOT_SIGNATURE
    }
}

/// Renders the partition table as a box-drawn table, one row per entry.
impl LayoutDisplay for Mbr {
    fn display_layout(&self, indent: u8) -> Result<String, fmt::Error> {
        let mut out = String::from("");
        let indent = " ".repeat(indent.into());

        writeln!(out, "{}┌{:─^71}┐", indent, " Master Boot Record ")?;
        writeln!(
            out,
            "{}├{:<61}{:>10}┤",
            indent,
            "Boot Signature",
            format!(
                "0x{:02X}{:02X}{}",
                self.boot_signature[0],
                self.boot_signature[1],
                if self.has_boot_signature() { "" } else { "!" }
            )
        )?;
        writeln!(
            out,
            "{}├{:^8}┬{:^6}┬{:^13}┬{:^14}┬{:^14}┬{:^11}┤",
            indent, "Part", "Boot", "Type", "Start LBA", "End LBA", "Sectors"
        )?;
        writeln!(
            out,
            "{}├{:─<8}┼{:─<6}┼{:─<13}┼{:─<14}┼{:─<14}┼{:─<11}┤",
            indent, "", "", "", "", "", ""
        )?;

        for (i, entry) in self.pt_entries.iter().enumerate() {
            let end = match entry.end_lba() {
                Some(end) => end.to_string(),
                None => String::from("-"),
            };
            writeln!(
                out,
                "{}│{:^8}│{:^6}│{:^13}│{:>14}│{:>14}│{:>11}│",
                indent,
                format!("#{}", i + 1),
                format!("0x{:02X}", entry.boot_flag),
                entry.pt_type().to_string(),
                entry.lba_start,
                end,
                entry.sector_cnt
            )?;
        }

        writeln!(
            out,
            "{}└{:─<8}┴{:─<6}┴{:─<13}┴{:─<14}┴{:─<14}┴{:─<11}┘",
            indent, "", "", "", "", "", ""
        )?;

        Ok(out)
    }
}
