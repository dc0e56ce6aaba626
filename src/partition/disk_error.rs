//! Error types for disk and partition operations.
//!
//! This module provides error handling for opening a disk image and decoding
//! its Master Boot Record.

use std::io;

use crate::utils::Truncated;

/// Represents errors that can occur during MBR parsing.
#[derive(thiserror::Error, Debug)]
pub enum DiskError {
    /// Wraps an I/O error that occurred during disk operations.
    #[error("I/O error: {0}")]
    Io(io::Error),
    /// The image is too short to hold a Master Boot Record.
    #[error("Truncated MBR: {0}")]
    TruncatedInput(Truncated),
    /// A partition table entry could not be decoded.
    #[error("BinRead error: {0}")]
    BinRead(binread::Error),
    /// The selected partition holds no usable FAT32 volume.
    #[error("Partition #{0} holds no usable FAT32 volume")]
    NoVolume(usize),
}

/// Converts standard I/O errors into DiskError.
impl From<io::Error> for DiskError {
    fn from(err: io::Error) -> Self {
        DiskError::Io(err)
    }
}

impl From<Truncated> for DiskError {
    fn from(err: Truncated) -> Self {
        DiskError::TruncatedInput(err)
    }
}

impl From<binread::Error> for DiskError {
    fn from(err: binread::Error) -> Self {
        DiskError::BinRead(err)
    }
}
