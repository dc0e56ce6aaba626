//! FAT32 volume decoding and directory listing.
//!
//! - [`bpb`]: boot sector (BIOS Parameter Block) decoding and validation
//! - [`fat`]: the volume, its addressing arithmetic and FAT lookups
//! - [`dir_entry`]: 32-byte directory entries
//! - [`walker`]: lazy, non-recursive directory listing along a cluster chain

pub mod bpb;
pub mod dir_entry;
pub mod fat;
pub mod fat_error;
pub mod walker;
