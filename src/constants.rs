//! On-disk layout constants for MBR partitioned FAT32 images.

/// The size of the Master Boot Record in bytes.
pub const MBR_SIZE: usize = 512;

/// The number of primary partitions supported by MBR.
pub const PART_CNT: usize = 4;

/// Offset of the partition table inside the MBR.
pub const PART_TABLE_OFFSET: usize = 446;

/// Size of a partition table entry in bytes.
pub const PART_ENTRY_SIZE: usize = 16;

/// Offset of the 0x55AA signature in a boot sector (MBR or BPB).
pub const SIGNATURE_OFFSET: usize = 510;

/// Expected boot sector signature, in on-disk byte order.
pub const BOOT_SIGNATURE: [u8; 2] = [0x55, 0xAA];

/// Sector size used to locate a partition's boot sector from its LBA.
pub const SECTOR_SIZE: usize = 512;

/// Size of a FAT directory entry in bytes.
pub const DIR_ENTRY_SIZE: usize = 32;

/// Size of a FAT32 table entry in bytes.
pub const FAT_ENTRY_SIZE: u64 = 4;

/// Any FAT32 entry at or above this value ends a cluster chain.
pub const END_OF_CHAIN: u32 = 0x0FFF_FFF8;

/// FAT32 entry value marking a bad cluster.
pub const BAD_CLUSTER: u32 = 0x0FFF_FFF7;

/// Only the low 28 bits of a FAT32 entry hold the cluster number.
pub const CLUSTER_MASK: u32 = 0x0FFF_FFFF;

/// First cluster number of the data region.
pub const FIRST_DATA_CLUSTER: u32 = 2;
