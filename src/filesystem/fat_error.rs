//! Error types for FAT32 volume decoding and directory walks.
//!
//! A volume is rejected with the first failing check, in order: partition
//! type, boot sector signature, then BPB field ranges. Walk errors stop the
//! walk of the current directory only.

use std::io;
use thiserror::Error;

use crate::utils::Truncated;

/// A BPB field that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BpbField {
    BytesPerSec,
    SecPerClus,
    NumFat,
    FatSz,
    RootClus,
}

impl std::fmt::Display for BpbField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BpbField::BytesPerSec => "bytes per sector",
            BpbField::SecPerClus => "sectors per cluster",
            BpbField::NumFat => "number of FATs",
            BpbField::FatSz => "sectors per FAT",
            BpbField::RootClus => "root cluster",
        };
        write!(f, "{s}")
    }
}

/// Errors that can occur while decoding a FAT32 volume or walking its directories.
#[derive(Error, Debug)]
pub enum FATError {
    /// Underlying I/O errors that occur while reading the image.
    #[error("IO Error: `{0}`")]
    IOError(io::Error),

    /// A boot sector, FAT entry or cluster could not be read in full.
    #[error("{0}")]
    TruncatedInput(Truncated),

    /// The partition's system id is neither 0x0B nor 0x0C.
    #[error("Partition is not FAT32 (system id: 0x{0:02X})")]
    NotFat32(u8),

    /// The boot sector signature must be 0x55AA.
    #[error(
        "Invalid boot sector signature: 0x{:02X}{:02X}. Expected signature: 0x55AA",
        .0[0],
        .0[1]
    )]
    BadSignature([u8; 2]),

    /// A BPB field is zero or out of range.
    #[error("Invalid BPB field: {field} = {value}")]
    InvalidBpb { field: BpbField, value: u32 },

    /// A cluster number that cannot appear in a chain (0, 1 or the bad-cluster marker).
    #[error("Invalid cluster number in chain: 0x{0:08X}")]
    InvalidCluster(u32),

    /// The chain leads back to a cluster already visited.
    #[error("Cluster chain loops back to cluster {0}")]
    ChainCycle(u32),

    /// Parsing error occured during structure initialization
    #[error("BinRead Error: `{0}`")]
    BinReadError(binread::Error),
}

/// Converts standard I/O errors into FATError.
impl From<io::Error> for FATError {
    fn from(err: io::Error) -> Self {
        FATError::IOError(err)
    }
}

impl From<Truncated> for FATError {
    fn from(err: Truncated) -> Self {
        FATError::TruncatedInput(err)
    }
}

/// Converts BinRead errors into FATError.
impl From<binread::Error> for FATError {
    fn from(err: binread::Error) -> Self {
        FATError::BinReadError(err)
    }
}
