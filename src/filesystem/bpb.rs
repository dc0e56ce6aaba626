//! FAT32 Bpb structure.
//!
//! This module implements:
//! - Locating a partition's boot sector from its partition table entry
//! - BIOS Parameter Block (Bpb) parsing
//! - Validation of the fields needed to address the FAT and data regions

use binread::{BinRead, BinReaderExt};
use getset::CopyGetters;
use log::debug;
use std::fmt;
use std::io;

use super::fat_error::{BpbField, FATError};
use crate::constants::{BOOT_SIGNATURE, FIRST_DATA_CLUSTER, SECTOR_SIZE};
use crate::partition::mbr::PTEntry;
use crate::traits::ByteSource;
use crate::utils;

/// How strictly the BPB fields are checked.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    /// Rejects zero or out-of-range addressing fields.
    #[default]
    Lenient,
    /// As `Lenient`, and additionally requires exactly two FAT copies.
    Strict,
}

/// BIOS Parameter Block structure for FAT32 filesystems.
///
/// The whole boot sector is decoded; only the addressing fields are exposed
/// through getters and checked by validation.
#[derive(BinRead, Debug, Clone, CopyGetters)]
#[br(little)]
pub struct Bpb {
    /// Jump instruction to boot code
    _jmp: [u8; 3],
    /// OEM identifier (e.g., "MSWIN4.1")
    oem_name: [u8; 8],
    /// Number of bytes per sector (512, 1024, 2048, or 4096)
    #[get_copy = "pub"]
    bytes_per_sec: u16,
    /// Number of sectors per cluster
    #[get_copy = "pub"]
    sec_per_clus: u8,
    /// Number of reserved sectors from start of volume
    #[get_copy = "pub"]
    rsvd_sec_cnt: u16,
    /// Number of FAT copies (typically 2 for redundancy)
    #[get_copy = "pub"]
    num_fat: u8,
    /// Maximum number of root directory entries (0 for FAT32)
    _root_ent_cnt: u16,
    /// Total sectors for volumes < 32MB (0 for FAT32)
    _tot_sec_16: u16,
    /// Media descriptor (0xF8 for fixed disk)
    _media: u8,
    /// Sectors per FAT for FAT12/FAT16 (0 for FAT32)
    _fat_sz_16: u16,
    /// Sectors per track
    _sec_per_trk: u16,
    /// Number of heads
    _num_heads: u16,
    /// Number of hidden sectors preceding the partition
    #[get_copy = "pub"]
    hidd_sec: u32,
    /// Total sectors for volumes >= 32MB
    #[get_copy = "pub"]
    tot_sec_32: u32,

    // FAT32-specific fields
    /// Sectors per FAT
    #[get_copy = "pub"]
    fat_sz_32: u32,
    /// FAT flags (mirroring, active FAT)
    _ext_flags: u16,
    /// Filesystem version
    _fs_ver: u16,
    /// First cluster of root directory (typically 2)
    #[get_copy = "pub"]
    root_clus: u32,
    /// Sector number of FSINFO structure
    _fs_info: u16,
    /// Sector number of backup boot sector
    _bk_boot_sec: u16,
    _reserved: [u8; 12],
    /// Drive number (0x80 for hard disk)
    _drv_num: u8,
    _reserved_1: u8,
    /// Extended boot signature (0x29)
    _boot_sig: u8,
    /// Volume serial number
    #[get_copy = "pub"]
    vol_id: u32,
    /// Volume label (11 bytes)
    vol_lab: [u8; 11],
    /// Filesystem type label ("FAT32   ")
    fil_sys_type: [u8; 8],

    #[br(count = 420)]
    _boot_code: Vec<u8>,
    /// Boot sector signature (0x55 0xAA)
    sig: [u8; 2],
}

impl Bpb {
    /// Reads and validates the Bpb of the volume described by a partition table entry.
    ///
    /// The boot sector lives at `lba_start × 512`: the volume's own sector
    /// size is not known until this very sector has been decoded.
    ///
    /// # Errors
    /// - `FATError::IOError` / `FATError::TruncatedInput` if the sector cannot be read
    /// - `FATError::NotFat32` if the partition type is not 0x0B or 0x0C
    /// - `FATError::BadSignature` if bytes 510-511 are not 0x55AA
    /// - `FATError::InvalidBpb` if an addressing field is out of range
    pub fn from<S: ByteSource + ?Sized>(
        source: &mut S,
        pt_entry: &PTEntry,
        validation: Validation,
    ) -> Result<Bpb, FATError> {
        let offset = pt_entry.lba_start() as u64 * SECTOR_SIZE as u64;
        debug!("Reading boot sector at byte offset {offset}");
        let buf = utils::read_exact_at::<_, FATError>(source, offset, SECTOR_SIZE)?;

        if !pt_entry.pt_type().is_fat32() {
            return Err(FATError::NotFat32(pt_entry.system_id()));
        }

        Bpb::from_bytes(&buf, validation)
    }

    /// Decodes and validates a Bpb from a 512-byte boot sector.
    pub fn from_bytes(buf: &[u8], validation: Validation) -> Result<Bpb, FATError> {
        utils::ensure_len(buf, SECTOR_SIZE)?;

        let mut reader = io::Cursor::new(&buf[..SECTOR_SIZE]);
        let bpb: Bpb = reader.read_le()?;

        bpb.validate(validation)
    }

    /// Validates the signature, then the addressing fields.
    fn validate(self, validation: Validation) -> Result<Self, FATError> {
        if self.sig != BOOT_SIGNATURE {
            return Err(FATError::BadSignature(self.sig));
        }

        const VALID_BYTES_PER_SEC: [u16; 4] = [512, 1024, 2048, 4096];
        if !VALID_BYTES_PER_SEC.contains(&self.bytes_per_sec) {
            return Err(FATError::InvalidBpb {
                field: BpbField::BytesPerSec,
                value: self.bytes_per_sec.into(),
            });
        }

        if self.sec_per_clus == 0 {
            return Err(FATError::InvalidBpb {
                field: BpbField::SecPerClus,
                value: 0,
            });
        }

        if self.fat_sz_32 == 0 {
            return Err(FATError::InvalidBpb {
                field: BpbField::FatSz,
                value: 0,
            });
        }

        if self.root_clus < FIRST_DATA_CLUSTER {
            return Err(FATError::InvalidBpb {
                field: BpbField::RootClus,
                value: self.root_clus,
            });
        }

        if validation == Validation::Strict && self.num_fat != 2 {
            return Err(FATError::InvalidBpb {
                field: BpbField::NumFat,
                value: self.num_fat.into(),
            });
        }

        Ok(self)
    }

    /// Volume label with its space padding removed.
    pub fn volume_label(&self) -> String {
        String::from_utf8_lossy(&self.vol_lab).trim_end().to_string()
    }

    /// OEM identifier with its space padding removed.
    pub fn oem_name(&self) -> String {
        String::from_utf8_lossy(&self.oem_name).trim_end().to_string()
    }

    /// Size of a cluster in bytes.
    pub fn cluster_size(&self) -> u64 {
        self.bytes_per_sec as u64 * self.sec_per_clus as u64
    }
}

/// Lists the decoded fields with their offset in the boot sector.
impl fmt::Display for Bpb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        macro_rules! field {
            ($name:expr, $off:expr, $val:expr) => {
                writeln!(f, "  {:<22} 0x{:>04X}: {}", $name, $off, $val)?
            };
        }

        writeln!(f, "FAT32 Volume Information:")?;
        field!("OEM name", 3, self.oem_name());
        field!("Bytes per sector", 11, self.bytes_per_sec);
        field!("Sectors per cluster", 13, self.sec_per_clus);
        field!("Reserved sectors", 14, self.rsvd_sec_cnt);
        field!("Number of FATs", 16, self.num_fat);
        field!("Hidden sectors", 28, self.hidd_sec);
        field!("Total sectors", 32, self.tot_sec_32);
        field!("FAT size (sectors)", 36, self.fat_sz_32);
        field!("Root cluster", 44, self.root_clus);
        field!("Volume id", 67, format!("0x{:08X}", self.vol_id));
        field!("Volume label", 71, self.volume_label());
        field!(
            "File system type",
            82,
            String::from_utf8_lossy(&self.fil_sys_type).trim_end()
        );

        Ok(())
    }
}
