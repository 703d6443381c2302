//! FAT volume structure and operations.
//!
//! This module implements the core functions to extract a FAT volume, including:
//! - Reading and validating the Bpb
//! - Decoding the File Allocation Table
//! - Scanning directory entry streams
//! - Resolving cluster chains into physical extents
//! - Recursively materializing the directory tree and file contents

use std::collections::HashSet;
use std::fmt::Write as FmtWrite;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use log::{debug, info, warn};

use super::bpb::Bpb;
use super::dir_entry::DirEntry;
use super::fat_error::FATError;
use super::fat_table::FatTable;
use super::image::ImageFile;
use crate::constants::{BOOT_SECTOR_SIZE, DIR_ENTRY_SIZE};
use crate::traits::LayoutDisplay;

/// Upper bound on directory nesting.
///
/// Keeps a crafted image that chains thousands of distinct directory
/// clusters into one another from exhausting the stack; real trees stay far
/// below it.
const MAX_DIR_DEPTH: usize = 1024;

/// Structure for a FAT volume opened for extraction.
///
/// Owns the decoded Bpb and FAT, which stay immutable for the whole run, and
/// the image handle every structure and payload is read through.
pub struct FATVol {
    bpb: Bpb,
    fat: FatTable,
    image: ImageFile,
}

impl FATVol {
    /// Opens a raw FAT32 volume image and decodes its Bpb and FAT region.
    ///
    /// # Parameters
    /// - `image_path`: The path of the volume image
    /// - `validate`: Whether to perform validation checks on the Bpb
    ///
    /// # Returns
    /// - `Ok(FATVol)`: The FAT volume, ready for extraction
    /// - `Err(FATError)`: If reading, decoding or validation fails
    ///
    /// # Errors
    /// - `FATError::ImageTruncated` if the image cannot supply the boot
    ///   sector or the FAT region
    /// - Various `FATError` variants if validation fails and `validate` is true
    pub fn from_file(image_path: &Path, validate: bool) -> Result<FATVol, FATError> {
        let mut image = ImageFile::open(image_path)?;

        let mut boot = vec![0u8; BOOT_SECTOR_SIZE];
        image.read_exact_at(0, &mut boot)?;
        let bpb = Bpb::from_slice(&boot, validate)?;

        // Reject a FAT region the image cannot hold before allocating it; a
        // corrupt sectors-per-FAT field can claim terabytes.
        let region_len = bpb.fat_region_size();
        match bpb.fat_start().checked_add(region_len) {
            Some(end) if end <= image.len() => {}
            _ => {
                return Err(FATError::ImageTruncated {
                    offset: bpb.fat_start(),
                    needed: region_len as usize,
                });
            }
        }

        let mut region = vec![0u8; region_len as usize];
        image.read_exact_at(bpb.fat_start(), &mut region)?;
        let fat = FatTable::from_bytes(&region);

        Ok(Self { bpb, fat, image })
    }

    /// The size in bytes of one cluster.
    pub fn cluster_size(&self) -> u32 {
        self.bpb.cluster_size()
    }

    /// Converts a cluster number to its physical byte offset in the image.
    ///
    /// Cluster 2 sits at the very start of the data region.
    fn cluster_addr(&self, cluster: u32) -> u64 {
        debug_assert!(cluster >= 2);
        self.bpb.data_start() + (cluster as u64 - 2) * self.bpb.cluster_size() as u64
    }

    /// Checks that a starting cluster maps into the data region.
    fn check_start_cluster(&self, cluster: u32, what: &str) -> Result<(), FATError> {
        if cluster < 2 || cluster as usize >= self.fat.len() {
            return Err(FATError::CorruptChain(format!(
                "{what} starts at cluster {cluster}, outside the data region"
            )));
        }
        Ok(())
    }

    /// Resolves a starting cluster into the ordered physical byte offsets of
    /// its chain, one per cluster.
    ///
    /// # Errors
    /// - `FATError::CorruptChain` if the chain cycles or leaves the FAT
    pub fn extents(&self, start: u32) -> Result<Vec<u64>, FATError> {
        let chain = self.fat.chain(start)?;
        Ok(chain.into_iter().map(|c| self.cluster_addr(c)).collect())
    }

    /// Scans a directory's entry stream starting at a physical address.
    ///
    /// Records are read one after the other until the end-of-directory
    /// sentinel (attribute byte 0); everything before it is yielded, deleted
    /// entries included, and everything after it is ignored.
    ///
    /// # Errors
    /// - `FATError::UnterminatedDirectory` if the image ends on a record
    ///   boundary before any sentinel
    /// - `FATError::TruncatedEntry` if fewer than 32 bytes remain for the
    ///   next record
    pub fn list_dir(&mut self, addr: u64) -> Result<Vec<DirEntry>, FATError> {
        let mut entries = Vec::new();
        let mut cursor = addr;
        let mut record = [0u8; DIR_ENTRY_SIZE];

        loop {
            let available = self.image.len().saturating_sub(cursor);
            if available == 0 {
                return Err(FATError::UnterminatedDirectory { offset: cursor });
            }
            if available < DIR_ENTRY_SIZE as u64 {
                return Err(FATError::TruncatedEntry {
                    offset: cursor,
                    available,
                });
            }

            self.image.read_exact_at(cursor, &mut record)?;
            let entry = DirEntry::from_slice(&record)?;
            if entry.is_end_marker() {
                break;
            }

            if entry.is_deleted() {
                info!(
                    "deleted entry {} found at offset 0x{cursor:X}",
                    entry
                );
            }
            entries.push(entry);
            cursor += DIR_ENTRY_SIZE as u64;
        }

        Ok(entries)
    }

    /// Extracts the volume's whole directory tree under `dest`.
    ///
    /// Every directory of the volume becomes a directory under `dest` and
    /// every non-empty regular file is materialized with exactly its declared
    /// size. Pre-existing destination directories are reused, so re-running
    /// the extraction over the same destination is harmless.
    ///
    /// # Errors
    /// - `FATError::DestinationUnwritable` if a directory or file cannot be
    ///   created at the destination
    /// - Structural errors (`CorruptChain`, `UnterminatedDirectory`,
    ///   `TruncatedEntry`, `ImageTruncated`) abort the walk rather than
    ///   produce a silently incomplete tree
    pub fn extract_to(&mut self, dest: &Path) -> Result<(), FATError> {
        create_dir(dest)?;

        let root = *self.bpb.root_clus();
        self.check_start_cluster(root, "the root directory")?;

        let mut visited = HashSet::new();
        self.extract_dir_rec(self.cluster_addr(root), dest, &mut visited, 0)
    }

    /// Recursively extracts one directory's entry stream.
    ///
    /// `visited` carries the physical start addresses of every directory
    /// already entered; a revisit means the tree loops back on itself, which
    /// a well-formed volume can never do.
    fn extract_dir_rec(
        &mut self,
        addr: u64,
        dest: &Path,
        visited: &mut HashSet<u64>,
        depth: usize,
    ) -> Result<(), FATError> {
        if !visited.insert(addr) {
            return Err(FATError::CorruptChain(format!(
                "directory at offset 0x{addr:X} visited twice"
            )));
        }
        if depth >= MAX_DIR_DEPTH {
            return Err(FATError::CorruptChain(format!(
                "directory nesting deeper than {MAX_DIR_DEPTH} levels at offset 0x{addr:X}"
            )));
        }

        for entry in self.list_dir(addr)? {
            if entry.is_dir() {
                // "." and ".." would recurse in place and escape the
                // destination root; nothing else is filtered.
                if entry.is_self_or_parent() {
                    continue;
                }

                let sub_dest = dest.join(entry.file_name());
                create_dir(&sub_dest)?;

                let cluster = entry.cluster_number();
                self.check_start_cluster(cluster, &format!("directory \"{}\"", entry.file_name()))?;
                self.extract_dir_rec(self.cluster_addr(cluster), &sub_dest, visited, depth + 1)?;
            } else if entry.is_regular_file() {
                if *entry.file_size() == 0 {
                    debug!("skipping empty file \"{}\"", entry.file_name());
                    continue;
                }
                self.extract_file(&entry, &dest.join(entry.file_name()))?;
            } else {
                debug!("ignoring entry {entry}");
            }
        }

        Ok(())
    }

    /// Extracts one regular file's contents to `path`.
    ///
    /// The cluster chain is resolved first. When its length accounts for the
    /// declared size, every cluster is read at its own physical offset and the
    /// pieces are concatenated, which reassembles fragmented files correctly.
    /// When the chain accounting disagrees with the declared size (a deleted
    /// file whose chain was released, typically), the fallback is one
    /// contiguous read from the first cluster; that approximation is only
    /// byte-accurate when the file's clusters were adjacent on disk.
    ///
    /// Whatever the image cannot supply is zero-filled, and exactly the
    /// declared number of bytes is written out.
    fn extract_file(&mut self, entry: &DirEntry, path: &Path) -> Result<(), FATError> {
        let size = *entry.file_size() as usize;
        let cluster = entry.cluster_number();
        self.check_start_cluster(cluster, &format!("file \"{}\"", entry.file_name()))?;

        let cluster_size = self.cluster_size() as usize;
        let extents = self.extents(cluster)?;

        let mut data = vec![0u8; size];
        if extents.len() == size.div_ceil(cluster_size) {
            for (i, offset) in extents.iter().enumerate() {
                let begin = i * cluster_size;
                let end = usize::min(begin + cluster_size, size);
                self.image.read_padded_at(*offset, &mut data[begin..end])?;
            }
        } else {
            warn!(
                "file \"{}\": chain of {} clusters does not cover {size} bytes; reading contiguously from cluster {cluster}",
                entry.file_name(),
                extents.len()
            );
            self.image
                .read_padded_at(self.cluster_addr(cluster), &mut data)?;
        }

        info!("{}", path.display());

        let mut out = File::create(path).map_err(|source| FATError::DestinationUnwritable {
            path: path.to_path_buf(),
            source,
        })?;
        out.write_all(&data)
            .map_err(|source| FATError::DestinationUnwritable {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(())
    }
}

/// Creates a destination directory, tolerating one that already exists.
fn create_dir(path: &Path) -> Result<(), FATError> {
    fs::create_dir_all(path).map_err(|source| FATError::DestinationUnwritable {
        path: path.to_path_buf(),
        source,
    })
}

/// Implements the LayoutDisplay trait for FATVol
impl LayoutDisplay for FATVol {
    fn display_layout(&self, indent: u8) -> Result<String, std::fmt::Error> {
        let mut out = String::from("");
        let indent = " ".repeat(indent.into());

        writeln!(out, "{}┌{:─^55}┐", indent, " FAT32 Volume Layout ")?;
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
            0,
            self.bpb.fat_start(),
            "Boot + Reserved"
        )?;
        for i in 0..*self.bpb.num_fat() {
            let fat_i_start = self.bpb.fat_start() + i as u64 * self.bpb.fat_copy_size();
            let fat_i_end = fat_i_start + self.bpb.fat_copy_size();
            writeln!(
                out,
                "{}│{:<12}│{:<12}│{:<12}│{:<16}│",
                indent,
                format!("FAT #{}", i),
                fat_i_start,
                fat_i_end,
                "FAT Tables"
            )?;
        }
        writeln!(
            out,
            "{}│{:<12}│{:<12}│{:<12}│{:<16}│",
            indent,
            "Data",
            self.bpb.data_start(),
            self.image.len(),
            "Cluster Data"
        )?;

        writeln!(
            out,
            "{}└{:─<12}┴{:─<12}┴{:─<12}┴{:─<16}┘",
            indent, "", "", "", ""
        )?;

        Ok(out)
    }
}
