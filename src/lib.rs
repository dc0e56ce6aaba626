//!
//! fat32_inspect: a read-only inspector for MBR partitioned FAT32 disk images.
//!
//! This crate provides tools for:
//! - Decoding the Master Boot Record partition table
//! - Decoding and validating the boot sector of FAT32 volumes
//! - Walking cluster chains to list the entries of a directory
//! - Printing disk and volume layouts
//!
//! Every decoder reads through the [`traits::ByteSource`] abstraction, so an
//! open image file and an in-memory buffer are used the same way.
//!
//! # Re-exports
//! - [`FATVol`]: FAT32 volume abstraction
//! - [`Disk`]: Disk abstraction with partition and volume management

pub mod commands;
pub mod constants;
pub mod filesystem;
pub mod partition;
pub mod traits;
pub mod utils;

/// FAT32 volume abstraction (see [`filesystem::fat::FATVol`]).
pub use crate::filesystem::fat::FATVol;
/// Disk abstraction with partition and volume management (see [`partition::disk::Disk`]).
pub use crate::partition::disk::Disk;
