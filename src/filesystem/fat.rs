//! FAT32 volume structure and operations.
//!
//! This module implements the core functions to interact with a FAT32 volume:
//! - Reading and validating the BPB of a partition
//! - Converting cluster numbers to sectors and byte offsets
//! - Following cluster chains through the first FAT
//! - Listing directory entries
//! - Displaying the volume layout

use getset::{CopyGetters, Getters};
use log::{debug, trace};
use std::collections::HashSet;
use std::fmt::{self, Write as FmtWrite};

use super::bpb::{Bpb, Validation};
use super::fat_error::FATError;
use super::walker::DirWalker;
use crate::constants::{BAD_CLUSTER, CLUSTER_MASK, END_OF_CHAIN, FAT_ENTRY_SIZE, FIRST_DATA_CLUSTER};
use crate::partition::mbr::PTEntry;
use crate::traits::{ByteSource, LayoutDisplay};
use crate::utils::{self, u32_at};

/// Structure for a FAT32 volume.
///
/// Essentially, it is a wrapper around the Bpb, anchored at the partition's
/// first sector. All sector numbers it returns are absolute on the disk.
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct FATVol {
    #[get = "pub"]
    bpb: Bpb,
    /// First sector of the partition.
    #[get_copy = "pub"]
    start: u32,
    /// Sector count from the partition table entry.
    #[get_copy = "pub"]
    sector_cnt: u32,
}

impl FATVol {
    /// Reads the Bpb of the partition described by `pt_entry` and builds the volume.
    ///
    /// # Errors
    /// See [`Bpb::from`].
    pub fn from<S: ByteSource + ?Sized>(
        source: &mut S,
        pt_entry: &PTEntry,
        validation: Validation,
    ) -> Result<FATVol, FATError> {
        let bpb = Bpb::from(source, pt_entry, validation)?;
        Ok(FATVol::new(pt_entry, bpb))
    }

    pub fn new(pt_entry: &PTEntry, bpb: Bpb) -> FATVol {
        FATVol {
            bpb,
            start: pt_entry.lba_start(),
            sector_cnt: pt_entry.sector_cnt(),
        }
    }

    /// Returns the starting sector of the first FAT.
    pub fn fat_start(&self) -> u64 {
        self.start as u64 + self.bpb.rsvd_sec_cnt() as u64
    }

    /// Returns the starting sector of the data region.
    pub fn data_start(&self) -> u64 {
        self.fat_start() + self.bpb.num_fat() as u64 * self.bpb.fat_sz_32() as u64
    }

    /// Returns the first sector past the partition.
    pub fn end(&self) -> u64 {
        self.start as u64 + self.sector_cnt as u64
    }

    /// Size of a cluster in bytes.
    pub fn cluster_size(&self) -> usize {
        self.bpb.cluster_size() as usize
    }

    /// Converts a cluster number to its first sector.
    ///
    /// # Errors
    /// - `FATError::InvalidCluster` for clusters 0 and 1, which have no data.
    pub fn clus_to_sector(&self, cluster: u32) -> Result<u64, FATError> {
        if cluster < FIRST_DATA_CLUSTER {
            return Err(FATError::InvalidCluster(cluster));
        }

        Ok(self.data_start()
            + (cluster - FIRST_DATA_CLUSTER) as u64 * self.bpb.sec_per_clus() as u64)
    }

    /// Byte offset of a cluster's data in the image.
    pub fn cluster_offset(&self, cluster: u32) -> Result<u64, FATError> {
        Ok(self.clus_to_sector(cluster)? * self.bpb.bytes_per_sec() as u64)
    }

    /// Byte offset of a cluster's entry in the first FAT.
    pub fn fat_entry_offset(&self, cluster: u32) -> u64 {
        self.fat_start() * self.bpb.bytes_per_sec() as u64 + cluster as u64 * FAT_ENTRY_SIZE
    }

    /// Reads one cluster's worth of data.
    pub fn read_cluster<S: ByteSource + ?Sized>(
        &self,
        source: &mut S,
        cluster: u32,
    ) -> Result<Vec<u8>, FATError> {
        let offset = self.cluster_offset(cluster)?;
        debug!("Reading cluster {cluster} at byte offset {offset}");
        utils::read_exact_at(source, offset, self.cluster_size())
    }

    /// Looks up the cluster following `cluster` in the first FAT.
    ///
    /// The top 4 bits of the entry are reserved and dropped.
    pub fn next_cluster<S: ByteSource + ?Sized>(
        &self,
        source: &mut S,
        cluster: u32,
    ) -> Result<u32, FATError> {
        let offset = self.fat_entry_offset(cluster);
        let buf = utils::read_exact_at::<_, FATError>(source, offset, FAT_ENTRY_SIZE as usize)?;
        let next = u32_at(&buf, 0) & CLUSTER_MASK;
        trace!("FAT[{cluster}] = 0x{next:08X}");
        Ok(next)
    }

    /// Collects the clusters of the chain starting at `cluster`.
    ///
    /// # Errors
    /// - `FATError::InvalidCluster` if the chain reaches 0, 1 or a bad cluster
    /// - `FATError::ChainCycle` if a cluster appears twice
    pub fn cluster_chain<S: ByteSource + ?Sized>(
        &self,
        source: &mut S,
        cluster: u32,
    ) -> Result<Vec<u32>, FATError> {
        let mut chain = vec![];
        let mut visited = HashSet::new();
        let mut cluster = cluster;

        while cluster < END_OF_CHAIN {
            check_chain_link(cluster, &mut visited)?;
            chain.push(cluster);
            cluster = self.next_cluster(source, cluster)?;
        }

        Ok(chain)
    }

    /// Lists the entries of the directory starting at `cluster`, one cluster at a time.
    pub fn list_dir<'a, S: ByteSource + ?Sized>(
        &'a self,
        source: &'a mut S,
        cluster: u32,
    ) -> DirWalker<'a, S> {
        DirWalker::new(self, source, cluster)
    }

    /// Lists the entries of the root directory.
    pub fn root_dir<'a, S: ByteSource + ?Sized>(&'a self, source: &'a mut S) -> DirWalker<'a, S> {
        self.list_dir(source, self.bpb.root_clus())
    }
}

/// Checks that `cluster` may be part of a chain and has not been seen yet.
pub(super) fn check_chain_link(cluster: u32, visited: &mut HashSet<u32>) -> Result<(), FATError> {
    if cluster < FIRST_DATA_CLUSTER || cluster == BAD_CLUSTER {
        return Err(FATError::InvalidCluster(cluster));
    }
    if !visited.insert(cluster) {
        return Err(FATError::ChainCycle(cluster));
    }
    Ok(())
}

/// Renders the reserved, FAT and data regions of the volume with their sector ranges.
impl LayoutDisplay for FATVol {
    fn display_layout(&self, indent: u8) -> Result<String, fmt::Error> {
        let mut out = String::from("");
        let indent = " ".repeat(indent.into());

        writeln!(out, "{}┌{:─^55}┐", indent, " FAT32 Partition Layout ")?;
        writeln!(
            out,
            "{}├{:^12}┬{:^12}┬{:^12}┬{:^16}┤",
            indent, "Region", "Start", "End", "Description"
        )?;
        writeln!(
            out,
            "{}├{:─<12}┼{:─<12}┼{:─<12}┼{:─<16}┤",
            indent, "", "", "", ""
        )?;

        writeln!(
            out,
            "{}│{:<12}│{:<12}│{:<12}│{:<16}│",
            indent,
            "Reserved",
            self.start,
            self.fat_start(),
            "Boot + Reserved"
        )?;
        for i in 0..self.bpb.num_fat() {
            let fat_i_start = self.fat_start() + i as u64 * self.bpb.fat_sz_32() as u64;
            let fat_i_end = fat_i_start + self.bpb.fat_sz_32() as u64;
            writeln!(
                out,
                "{}│{:<12}│{:<12}│{:<12}│{:<16}│",
                indent,
                format!("FAT #{}", i),
                fat_i_start,
                fat_i_end,
                "FAT Table"
            )?;
        }
        writeln!(
            out,
            "{}│{:<12}│{:<12}│{:<12}│{:<16}│",
            indent,
            "Data",
            self.data_start(),
            self.end(),
            format!("Root @ clus {}", self.bpb.root_clus())
        )?;

        writeln!(
            out,
            "{}└{:─<12}┴{:─<12}┴{:─<12}┴{:─<16}┘",
            indent, "", "", "", ""
        )?;

        Ok(out)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::constants::{PART_TABLE_OFFSET, SECTOR_SIZE};
    use crate::filesystem::bpb::tests::boot_sector;
    use crate::partition::mbr::tests::{encode_part, part_entry};
    use std::io::Cursor;

    /// Partition start of the synthetic volumes.
    pub(crate) const LBA_START: u32 = 1;
    const RSVD: u16 = 2;
    const FAT_SZ: u32 = 1;

    /// Builds a disk image holding an MBR and one FAT32 partition at sector 1,
    /// with 512-byte sectors, 2 reserved sectors and 2 one-sector FATs: the
    /// first FAT starts at sector 3 and the data region at sector 5.
    pub(crate) fn test_image(
        sec_per_clus: u8,
        fat: &[(u32, u32)],
        clusters: &[(u32, Vec<[u8; 32]>)],
    ) -> (Vec<u8>, PTEntry) {
        let max_clus = clusters.iter().map(|(c, _)| *c).max().unwrap_or(2);
        let data_start = (LBA_START + RSVD as u32 + 2 * FAT_SZ) as usize;
        let total = data_start + (max_clus as usize - 1) * sec_per_clus as usize;
        let mut image = vec![0u8; total * SECTOR_SIZE];

        let pt_entry = part_entry(0x80, [0; 3], 0x0C, [0; 3], LBA_START, total as u32 - 1);
        image[PART_TABLE_OFFSET..PART_TABLE_OFFSET + 16].copy_from_slice(&encode_part(&pt_entry));
        image[510] = 0x55;
        image[511] = 0xAA;

        let bs = LBA_START as usize * SECTOR_SIZE;
        image[bs..bs + SECTOR_SIZE]
            .copy_from_slice(&boot_sector(512, sec_per_clus, RSVD, 2, FAT_SZ, 2));

        for copy in 0..2 {
            let fat_off = (LBA_START as usize + RSVD as usize + copy) * SECTOR_SIZE;
            for (cluster, next) in fat {
                let off = fat_off + *cluster as usize * 4;
                image[off..off + 4].copy_from_slice(&next.to_le_bytes());
            }
        }

        for (cluster, entries) in clusters {
            let off = (data_start + (*cluster as usize - 2) * sec_per_clus as usize) * SECTOR_SIZE;
            for (i, raw) in entries.iter().enumerate() {
                image[off + i * 32..off + (i + 1) * 32].copy_from_slice(raw);
            }
        }

        (image, pt_entry)
    }

    fn volume(image: &[u8], pt_entry: &PTEntry) -> FATVol {
        let mut src = Cursor::new(image.to_vec());
        FATVol::from(&mut src, pt_entry, Validation::Strict).unwrap()
    }

    #[test]
    fn region_starts() {
        let (image, pt_entry) = test_image(1, &[], &[]);
        let vol = volume(&image, &pt_entry);

        assert_eq!(vol.fat_start(), 3);
        assert_eq!(vol.data_start(), 5);
        assert_eq!(vol.fat_entry_offset(5), 3 * 512 + 20);
        assert_eq!(vol.cluster_size(), 512);
    }

    #[test]
    fn cluster_to_sector_for_several_cluster_sizes() {
        for spc in [1u8, 8, 64] {
            let (image, pt_entry) = test_image(spc, &[], &[]);
            let vol = volume(&image, &pt_entry);

            for c in [2u32, 3, 10, 1000, END_OF_CHAIN - 1] {
                let expected = vol.data_start() + (c as u64 - 2) * spc as u64;
                assert_eq!(vol.clus_to_sector(c).unwrap(), expected);
                assert_eq!(vol.cluster_offset(c).unwrap(), expected * 512);
            }
            assert_eq!(vol.cluster_size(), 512 * spc as usize);
        }
    }

    #[test]
    fn clusters_zero_and_one_have_no_sector() {
        let (image, pt_entry) = test_image(1, &[], &[]);
        let vol = volume(&image, &pt_entry);

        assert!(matches!(vol.clus_to_sector(0), Err(FATError::InvalidCluster(0))));
        assert!(matches!(vol.clus_to_sector(1), Err(FATError::InvalidCluster(1))));
    }

    #[test]
    fn next_cluster_masks_reserved_bits() {
        let (image, pt_entry) = test_image(1, &[(2, 0xF000_0005), (5, 0xFFFF_FFFF)], &[]);
        let vol = volume(&image, &pt_entry);
        let mut src = Cursor::new(image);

        assert_eq!(vol.next_cluster(&mut src, 2).unwrap(), 5);
        assert_eq!(vol.next_cluster(&mut src, 5).unwrap(), 0x0FFF_FFFF);
    }

    #[test]
    fn follows_chain_to_end() {
        let (image, pt_entry) = test_image(1, &[(2, 5), (5, 3), (3, 0x0FFF_FFF8)], &[]);
        let vol = volume(&image, &pt_entry);
        let mut src = Cursor::new(image);

        assert_eq!(vol.cluster_chain(&mut src, 2).unwrap(), vec![2, 5, 3]);
    }

    #[test]
    fn chain_cycles_and_free_links_are_errors() {
        let (image, pt_entry) = test_image(1, &[(2, 4), (4, 2), (6, 0), (7, BAD_CLUSTER)], &[]);
        let vol = volume(&image, &pt_entry);
        let mut src = Cursor::new(image);

        assert!(matches!(vol.cluster_chain(&mut src, 2), Err(FATError::ChainCycle(2))));
        assert!(matches!(vol.cluster_chain(&mut src, 6), Err(FATError::InvalidCluster(0))));
        assert!(matches!(
            vol.cluster_chain(&mut src, 7),
            Err(FATError::InvalidCluster(BAD_CLUSTER))
        ));
    }

    #[test]
    fn layout_shows_each_fat_copy() {
        let (image, pt_entry) = test_image(1, &[], &[]);
        let layout = volume(&image, &pt_entry).display_layout(2).unwrap();

        assert!(layout.contains("FAT #0"));
        assert!(layout.contains("FAT #1"));
        assert!(layout.contains("Root @ clus 2"));
    }
}
