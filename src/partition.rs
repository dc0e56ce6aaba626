//! Partition table decoding and disk image handling.
//!
//! - [`mbr`]: the Master Boot Record partition table decoder
//! - [`disk`]: an open disk image with its partition table and FAT32 volumes
//! - [`disk_error`]: errors raised while opening an image or decoding its MBR

pub mod disk;
pub mod disk_error;
pub mod mbr;
