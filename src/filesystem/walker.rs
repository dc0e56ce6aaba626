//! Lazy walk of one directory level along its cluster chain.

use log::{debug, trace};
use std::collections::HashSet;

use super::dir_entry::{DirEntry, DirRecord, EntryKind};
use super::fat::{FATVol, check_chain_link};
use super::fat_error::FATError;
use crate::constants::{DIR_ENTRY_SIZE, END_OF_CHAIN};
use crate::traits::ByteSource;

enum State {
    /// The current cluster has not been read yet.
    Load,
    /// Entries of the current cluster are being decoded from `pos`.
    Scan,
    Done,
}

/// Iterator over the entries of a directory, reading one cluster at a time.
///
/// Subdirectories are reported, never entered. Deleted slots, long filename
/// fragments and the "." / ".." entries are skipped. A 0x00 name byte ends the
/// current cluster; the walk then continues with the next cluster in the chain.
///
/// The first error ends the walk: it is yielded once and the iterator then
/// returns `None`. Records yielded before it remain valid.
pub struct DirWalker<'a, S: ByteSource + ?Sized> {
    vol: &'a FATVol,
    source: &'a mut S,
    cluster: u32,
    buf: Vec<u8>,
    pos: usize,
    visited: HashSet<u32>,
    state: State,
}

impl<'a, S: ByteSource + ?Sized> DirWalker<'a, S> {
    pub(super) fn new(vol: &'a FATVol, source: &'a mut S, cluster: u32) -> Self {
        DirWalker {
            vol,
            source,
            cluster,
            buf: vec![],
            pos: 0,
            visited: HashSet::new(),
            state: State::Load,
        }
    }

    /// Number of clusters read so far.
    pub fn clusters_read(&self) -> usize {
        self.visited.len()
    }

    fn fail(&mut self, err: FATError) -> Option<Result<DirRecord, FATError>> {
        debug!("Directory walk aborted at cluster {}: {err}", self.cluster);
        self.state = State::Done;
        Some(Err(err))
    }

    fn load(&mut self) -> Result<(), FATError> {
        check_chain_link(self.cluster, &mut self.visited)?;
        self.buf = self.vol.read_cluster(self.source, self.cluster)?;
        self.pos = 0;
        Ok(())
    }
}

impl<S: ByteSource + ?Sized> Iterator for DirWalker<'_, S> {
    type Item = Result<DirRecord, FATError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.state {
                State::Done => return None,
                State::Load => {
                    if self.cluster >= END_OF_CHAIN {
                        trace!("End of chain: 0x{:08X}", self.cluster);
                        self.state = State::Done;
                        return None;
                    }
                    if let Err(err) = self.load() {
                        return self.fail(err);
                    }
                    self.state = State::Scan;
                }
                State::Scan => {
                    if self.pos + DIR_ENTRY_SIZE > self.buf.len() {
                        match self.vol.next_cluster(self.source, self.cluster) {
                            Ok(next) => {
                                self.cluster = next;
                                self.state = State::Load;
                                continue;
                            }
                            Err(err) => return self.fail(err),
                        }
                    }

                    let entry = match DirEntry::from_slice(&self.buf[self.pos..]) {
                        Ok(entry) => entry,
                        Err(err) => return self.fail(err),
                    };
                    self.pos += DIR_ENTRY_SIZE;

                    match entry.kind() {
                        EntryKind::End => {
                            trace!("End marker in cluster {}", self.cluster);
                            self.pos = self.buf.len();
                        }
                        EntryKind::Regular => return Some(Ok(DirRecord::from(&entry))),
                        kind => trace!("Skipping {kind:?} entry {entry}"),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::bpb::Validation;
    use crate::filesystem::dir_entry::tests::encode_entry;
    use crate::filesystem::dir_entry::{ATTR_DIRECTORY, ATTR_LONG_NAME};
    use crate::filesystem::fat::tests::test_image;
    use crate::partition::mbr::PTEntry;
    use std::io::{self, Cursor};

    /// Byte source that remembers every read it serves.
    struct Recorder {
        inner: Cursor<Vec<u8>>,
        reads: Vec<(u64, usize)>,
    }

    impl ByteSource for Recorder {
        fn read_at(&mut self, offset: u64, length: usize) -> io::Result<Vec<u8>> {
            self.reads.push((offset, length));
            self.inner.read_at(offset, length)
        }
    }

    fn setup(
        spc: u8,
        fat: &[(u32, u32)],
        clusters: &[(u32, Vec<[u8; 32]>)],
    ) -> (FATVol, Recorder) {
        let (image, pt_entry): (Vec<u8>, PTEntry) = test_image(spc, fat, clusters);
        let mut src = Cursor::new(image);
        let vol = FATVol::from(&mut src, &pt_entry, Validation::Lenient).unwrap();
        (
            vol,
            Recorder {
                inner: src,
                reads: vec![],
            },
        )
    }

    fn names(records: &[DirRecord]) -> Vec<String> {
        records.iter().map(|r| r.name_lossy().into_owned()).collect()
    }

    #[test]
    fn lists_single_file() {
        let (vol, mut src) = setup(
            1,
            &[(2, 0x0FFF_FFFF)],
            &[(2, vec![encode_entry(b"HELLO   TXT", 0x20, 3, 12)])],
        );

        let records: Vec<DirRecord> = vol.root_dir(&mut src).collect::<Result<_, _>>().unwrap();
        assert_eq!(
            records,
            vec![DirRecord {
                name: b"HELLO".to_vec(),
                is_dir: false,
                first_cluster: 3,
                file_size: 12,
            }]
        );
    }

    #[test]
    fn walks_each_cluster_of_the_chain_once() {
        let (vol, mut src) = setup(
            1,
            &[(2, 5), (5, 0x0FFF_FFFF)],
            &[
                (2, vec![encode_entry(b"A          ", 0x20, 0, 0)]),
                (5, vec![encode_entry(b"B          ", ATTR_DIRECTORY, 9, 0)]),
            ],
        );

        let mut walker = vol.root_dir(&mut src);
        let records: Vec<DirRecord> = walker.by_ref().collect::<Result<_, _>>().unwrap();
        assert_eq!(names(&records), vec!["A", "B"]);
        assert!(records[1].is_dir);
        assert_eq!(walker.clusters_read(), 2);
        drop(walker);

        let cluster_reads: Vec<u64> = src
            .reads
            .iter()
            .filter(|(_, len)| *len == vol.cluster_size())
            .map(|(off, _)| *off)
            .collect();
        assert_eq!(
            cluster_reads,
            vec![vol.cluster_offset(2).unwrap(), vol.cluster_offset(5).unwrap()]
        );
    }

    #[test]
    fn emits_raw_base_name_bytes() {
        let (vol, mut src) = setup(
            1,
            &[(2, 0x0FFF_FFFF)],
            &[(2, vec![encode_entry(b"\x90\x90\x90\x90\x90\x90\x90\x90TXT", 0x20, 0, 1)])],
        );

        let records: Vec<DirRecord> = vol.root_dir(&mut src).collect::<Result<_, _>>().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, [0x90u8; 8]);
        assert!(records[0].name.len() <= 8);
    }

    #[test]
    fn skips_deleted_long_name_and_dot_entries() {
        let (vol, mut src) = setup(
            1,
            &[(2, 0x0FFF_FFFF)],
            &[(
                2,
                vec![
                    encode_entry(b".          ", ATTR_DIRECTORY, 2, 0),
                    encode_entry(b"..         ", ATTR_DIRECTORY, 0, 0),
                    encode_entry(b"\xE5ONE    TXT", 0x20, 0, 0),
                    encode_entry(b"Ax\0y\0z\0\0\0\0\0", ATTR_LONG_NAME, 0, 0),
                    encode_entry(b"KEEP    DAT", 0x20, 4, 1),
                ],
            )],
        );

        let records: Vec<DirRecord> = vol.root_dir(&mut src).collect::<Result<_, _>>().unwrap();
        assert_eq!(names(&records), vec!["KEEP"]);
    }

    #[test]
    fn end_marker_stops_only_the_current_cluster() {
        let (vol, mut src) = setup(
            1,
            &[(2, 3), (3, 0x0FFF_FFF8)],
            &[
                (
                    2,
                    vec![
                        encode_entry(b"FIRST      ", 0x20, 0, 0),
                        [0u8; 32],
                        encode_entry(b"HIDDEN     ", 0x20, 0, 0),
                    ],
                ),
                (3, vec![encode_entry(b"SECOND     ", 0x20, 0, 0)]),
            ],
        );

        let records: Vec<DirRecord> = vol.root_dir(&mut src).collect::<Result<_, _>>().unwrap();
        assert_eq!(names(&records), vec!["FIRST", "SECOND"]);
    }

    #[test]
    fn cluster_larger_than_a_sector_is_scanned_whole() {
        let mut entries = vec![];
        for i in 0..40u8 {
            let mut name = *b"F00        ";
            name[1] = b'0' + i / 10;
            name[2] = b'0' + i % 10;
            entries.push(encode_entry(&name, 0x20, 0, 0));
        }
        let (vol, mut src) = setup(4, &[(2, 0x0FFF_FFFF)], &[(2, entries)]);

        let records: Vec<DirRecord> = vol.root_dir(&mut src).collect::<Result<_, _>>().unwrap();
        assert_eq!(records.len(), 40);
        assert_eq!(records[39].name, b"F39");
    }

    #[test]
    fn cycle_stops_after_yielded_entries() {
        let (vol, mut src) = setup(
            1,
            &[(2, 3), (3, 2)],
            &[
                (2, vec![encode_entry(b"ONE        ", 0x20, 0, 0)]),
                (3, vec![encode_entry(b"TWO        ", 0x20, 0, 0)]),
            ],
        );

        let results: Vec<Result<DirRecord, FATError>> = vol.root_dir(&mut src).collect();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().name, b"ONE");
        assert_eq!(results[1].as_ref().unwrap().name, b"TWO");
        assert!(matches!(results[2], Err(FATError::ChainCycle(2))));
    }

    #[test]
    fn invalid_start_cluster_is_an_error() {
        let (vol, mut src) = setup(1, &[], &[]);

        let mut walker = vol.list_dir(&mut src, 1);
        assert!(matches!(walker.next(), Some(Err(FATError::InvalidCluster(1)))));
        assert!(walker.next().is_none());
    }

    #[test]
    fn cluster_past_image_end_is_truncated() {
        let (vol, mut src) = setup(1, &[(2, 50)], &[(2, vec![])]);

        let results: Vec<Result<DirRecord, FATError>> = vol.root_dir(&mut src).collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(FATError::TruncatedInput(_))));
    }

    #[test]
    fn end_of_chain_root_lists_nothing() {
        let (vol, mut src) = setup(1, &[], &[]);

        assert_eq!(vol.list_dir(&mut src, 0x0FFF_FFFF).count(), 0);
        assert!(src.reads.is_empty());
    }
}
