//! Disk image parsing and analysis.
//!
//! This module provides functionality for:
//! - Opening a disk image and decoding its MBR
//! - Evaluating every used partition as a FAT32 volume, independently
//! - Listing the root directory of each volume
//! - Displaying disk layout information
//!
//! A [`Disk`] owns its byte source (the open image file). The file is closed
//! when the `Disk` is dropped, whichever way the caller leaves.

use getset::{CopyGetters, Getters};
use log::{debug, error, warn};
use std::fmt;
use std::fs::File;
use std::path::Path;

use super::disk_error::DiskError;
use super::mbr::{Mbr, PTEntry};
use crate::filesystem::bpb::Validation;
use crate::filesystem::fat::FATVol;
use crate::filesystem::fat_error::FATError;
use crate::filesystem::walker::DirWalker;
use crate::traits::{ByteSource, LayoutDisplay};

/// The outcome of decoding one partition as a FAT32 volume.
#[derive(Debug, Getters, CopyGetters)]
pub struct PartitionVolume {
    /// Index of the partition in the MBR table (0-based).
    #[get_copy = "pub"]
    index: usize,
    #[get_copy = "pub"]
    pt_entry: PTEntry,
    /// The volume, or the reason it was rejected.
    #[get = "pub"]
    volume: Result<FATVol, FATError>,
}

/// Represents a disk image with its partition table and volumes.
#[derive(Getters)]
pub struct Disk<S: ByteSource = File> {
    source: S,
    /// The partition table found on the disk
    #[get = "pub"]
    mbr: Mbr,
    /// One entry per used partition, in table order
    #[get = "pub"]
    volumes: Vec<PartitionVolume>,
}

impl Disk<File> {
    /// Opens a disk image file read-only and analyzes its structure.
    ///
    /// # Errors
    /// - `DiskError::Io` if the file cannot be opened or read
    /// - `DiskError::TruncatedInput` if the image is shorter than an MBR
    pub fn from_file(path: &Path, validation: Validation) -> Result<Self, DiskError> {
        debug!("Opening disk image {}", path.display());
        let file = File::open(path)?;
        Disk::from_source(file, validation)
    }
}

impl<S: ByteSource> Disk<S> {
    /// Decodes the MBR of `source`, then every partition with a non-zero
    /// sector count. A rejected partition is recorded with its error and does
    /// not stop the others from being decoded.
    pub fn from_source(mut source: S, validation: Validation) -> Result<Self, DiskError> {
        let mbr = Mbr::from(&mut source)?;

        let mut volumes = vec![];
        for (index, pt_entry) in mbr.used_entries() {
            let volume = FATVol::from(&mut source, pt_entry, validation);
            if let Err(err) = &volume {
                warn!("Partition #{}: {err}", index + 1);
            }
            volumes.push(PartitionVolume {
                index,
                pt_entry: *pt_entry,
                volume,
            });
        }

        Ok(Disk {
            source,
            mbr,
            volumes,
        })
    }

    /// Iterates over the partitions that decoded as FAT32 volumes.
    pub fn fat32_volumes(&self) -> impl Iterator<Item = (usize, &FATVol)> {
        self.volumes
            .iter()
            .filter_map(|p| p.volume.as_ref().ok().map(|vol| (p.index, vol)))
    }

    fn volume_at(&self, part_idx: usize) -> Result<&FATVol, DiskError> {
        self.fat32_volumes()
            .find(|(index, _)| *index == part_idx)
            .map(|(_, vol)| vol)
            .ok_or(DiskError::NoVolume(part_idx + 1))
    }

    /// Lists the directory starting at `cluster` on the volume of partition `part_idx`.
    ///
    /// The walk borrows the disk's source for as long as it lives.
    pub fn list_dir(
        &mut self,
        part_idx: usize,
        cluster: u32,
    ) -> Result<DirWalker<'_, S>, DiskError> {
        let vol = self
            .volumes
            .iter()
            .find(|p| p.index == part_idx)
            .and_then(|p| p.volume.as_ref().ok())
            .ok_or(DiskError::NoVolume(part_idx + 1))?;

        Ok(vol.list_dir(&mut self.source, cluster))
    }

    /// Lists the root directory of the volume of partition `part_idx`.
    pub fn root_dir(&mut self, part_idx: usize) -> Result<DirWalker<'_, S>, DiskError> {
        let root = self.volume_at(part_idx)?.bpb().root_clus();
        self.list_dir(part_idx, root)
    }

    /// Prints the partition table followed by the layout of each volume.
    pub fn print_layout(&self, indent: u8) -> Result<(), fmt::Error> {
        print!("{}", self.mbr.display_layout(indent)?);

        for part in self.volumes.iter() {
            match &part.volume {
                Ok(vol) => print!("\n{}", vol.display_layout(indent + 3)?),
                Err(err) => println!(
                    "\n{}Partition #{}: {err}",
                    " ".repeat(indent as usize + 3),
                    part.index + 1
                ),
            }
        }

        Ok(())
    }

    /// Prints the root directory of every FAT32 volume. Directories are
    /// listed, not expanded.
    ///
    /// A failing walk is logged and the next volume is still listed.
    pub fn print_tree(&mut self) {
        let indices: Vec<usize> = self.fat32_volumes().map(|(index, _)| index).collect();

        for index in indices {
            println!("Partition #{}:", index + 1);
            let walker = match self.root_dir(index) {
                Ok(walker) => walker,
                Err(err) => {
                    error!("{err}");
                    continue;
                }
            };

            for record in walker {
                match record {
                    Ok(record) => println!("   {record}"),
                    Err(err) => error!("Listing of partition #{} stopped: {err}", index + 1),
                }
            }
        }
    }
}
