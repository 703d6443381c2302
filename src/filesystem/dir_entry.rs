//! FAT directory entry structure and parsing.
//!
//! This module implements the FAT directory entry structure which contains
//! metadata about files and directories stored in the filesystem. Each
//! directory entry is 32 bytes and contains the 8.3 name, attributes,
//! timestamps, the first cluster of the entry's chain and the file size.

use binread::{BinRead, BinReaderExt};
use getset::Getters;
use std::fmt;
use std::io;

use super::fat_error::FATError;

/// Attribute bit marking a directory.
pub const ATTR_DIRECTORY: u8 = 0x10;
/// Attribute bit marking a regular file (archive).
pub const ATTR_ARCHIVE: u8 = 0x20;

/// First name byte of a deleted entry.
///
/// Deletion only overwrites this byte; the rest of the record, including the
/// first cluster and the size, stays intact and recoverable.
pub const DELETED_MARKER: u8 = 0xE5;

/// FAT directory entry structure.
///
/// Each directory entry is exactly 32 bytes. An entry whose attribute byte is
/// zero is the end-of-directory sentinel: it terminates the parent's entry
/// stream and is not a real entry.
///
/// # Notes
/// - Timestamp fields are prefixed with underscore as they're not currently used
/// - The name fields use the legacy 8.3 format with space padding
#[derive(BinRead, Debug, Clone, Getters)]
#[br(little)]
pub struct DirEntry {
    /// Base name, 8 characters with space padding
    name: [u8; 8],
    /// Extension, 3 characters with space padding
    ext: [u8; 3],
    /// File attributes byte
    attr: u8,
    /// Reserved
    _reserved: u16,
    /// Creation time
    _crt_time: u16,
    /// Creation date
    _crt_date: u16,
    /// Last access date
    _lst_acc_date: u16,
    /// High 16 bits of first cluster number
    fst_clus_hi: u16,
    /// Last write time
    _wrt_time: u16,
    /// Last write date
    _wrt_date: u16,
    /// Low 16 bits of first cluster number
    fst_clus_lo: u16,
    /// File size in bytes (0 for directories)
    #[get = "pub"]
    file_size: u32,
}

impl DirEntry {
    /// Creates a directory entry from a 32-byte record.
    ///
    /// Deleted entries decode like any other: the caller receives them with
    /// [`DirEntry::is_deleted`] set instead of having them silently dropped,
    /// so that recoverable files stay visible.
    pub fn from_slice(buf: &[u8]) -> Result<Self, FATError> {
        let mut reader = io::Cursor::new(buf);
        reader.read_le().map_err(FATError::from)
    }

    /// Checks whether this record is the end-of-directory sentinel.
    ///
    /// The caller must stop scanning the directory stream at such a record;
    /// whatever bytes follow it are not entries.
    pub fn is_end_marker(&self) -> bool {
        self.attr == 0
    }

    /// Checks whether this entry was deleted.
    pub fn is_deleted(&self) -> bool {
        self.name[0] == DELETED_MARKER
    }

    /// Checks if this directory entry represents a directory.
    pub fn is_dir(&self) -> bool {
        self.attr & ATTR_DIRECTORY != 0
    }

    /// Checks if this directory entry represents a regular file.
    ///
    /// Read-only/hidden/system bits never change the classification; entries
    /// carrying neither the directory nor the archive bit (volume labels,
    /// long-name records) are neither files nor directories.
    pub fn is_regular_file(&self) -> bool {
        !self.is_dir() && self.attr & ATTR_ARCHIVE != 0
    }

    /// Checks whether this entry is the `.` or `..` pseudo-entry of its
    /// directory.
    ///
    /// The match is exact: a real directory whose name merely starts with a
    /// dot is not filtered.
    pub fn is_self_or_parent(&self) -> bool {
        let rest = if self.name[1] == b'.' { 2 } else { 1 };
        self.name[0] == b'.' && self.name[rest..].iter().all(|b| *b == b' ')
    }

    /// Returns the complete first cluster number for this entry.
    ///
    /// Combines `fst_clus_hi` and `fst_clus_lo` to form the complete cluster
    /// number: `(fst_clus_hi << 16) | fst_clus_lo`
    pub fn cluster_number(&self) -> u32 {
        ((self.fst_clus_hi as u32) << 16) | self.fst_clus_lo as u32
    }

    /// Reconstructs the entry's filename from its 8.3 fields.
    ///
    /// Space padding is trimmed and the dot is only added when the extension
    /// is nonempty. For a deleted entry the marker byte is stripped from the
    /// base name. Decoding is lossy so that a damaged name cannot abort a
    /// recovery run.
    pub fn file_name(&self) -> String {
        let raw_name: &[u8] = if self.is_deleted() {
            &self.name[1..]
        } else {
            &self.name
        };

        let name = String::from_utf8_lossy(raw_name).trim_end().to_string();
        let ext = String::from_utf8_lossy(&self.ext).trim_end().to_string();

        if ext.is_empty() {
            name
        } else {
            format!("{name}.{ext}")
        }
    }
}

impl fmt::Display for DirEntry {
    /// Formats the directory entry for display as `"NAME.EXT" <size>B`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" {}B", self.file_name(), self.file_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &[u8; 8], ext: &[u8; 3], attr: u8, cluster: u32, size: u32) -> [u8; 32] {
        let mut buf = [0u8; 32];
        buf[0..8].copy_from_slice(name);
        buf[8..11].copy_from_slice(ext);
        buf[11] = attr;
        buf[20..22].copy_from_slice(&((cluster >> 16) as u16).to_le_bytes());
        buf[26..28].copy_from_slice(&(cluster as u16).to_le_bytes());
        buf[28..32].copy_from_slice(&size.to_le_bytes());
        buf
    }

    #[test]
    fn decodes_regular_file() {
        let entry =
            DirEntry::from_slice(&record(b"HELLO   ", b"TXT", ATTR_ARCHIVE, 0x0005_0003, 1234))
                .unwrap();
        assert!(entry.is_regular_file());
        assert!(!entry.is_dir());
        assert!(!entry.is_deleted());
        assert_eq!(entry.cluster_number(), 0x0005_0003);
        assert_eq!(*entry.file_size(), 1234);
        assert_eq!(entry.file_name(), "HELLO.TXT");
    }

    #[test]
    fn zero_attribute_is_sentinel() {
        let entry = DirEntry::from_slice(&[0u8; 32]).unwrap();
        assert!(entry.is_end_marker());
    }

    #[test]
    fn deleted_entry_is_flagged_and_stripped() {
        let mut raw = *b"DOOMED  ";
        raw[0] = DELETED_MARKER;
        let entry = DirEntry::from_slice(&record(&raw, b"TXT", ATTR_ARCHIVE, 7, 10)).unwrap();
        assert!(entry.is_deleted());
        assert_eq!(entry.file_name(), "OOMED.TXT");
    }

    #[test]
    fn directory_without_extension() {
        let entry = DirEntry::from_slice(&record(b"SUB     ", b"   ", ATTR_DIRECTORY, 4, 0)).unwrap();
        assert!(entry.is_dir());
        assert_eq!(entry.file_name(), "SUB");
    }

    #[test]
    fn readonly_bit_does_not_change_classification() {
        // 0x21 = archive + read-only: still a regular file.
        let entry = DirEntry::from_slice(&record(b"LOCKED  ", b"BIN", 0x21, 9, 5)).unwrap();
        assert!(entry.is_regular_file());
    }

    #[test]
    fn label_and_long_name_records_are_opaque() {
        for attr in [0x08u8, 0x0F] {
            let entry = DirEntry::from_slice(&record(b"VOLUME  ", b"   ", attr, 0, 0)).unwrap();
            assert!(!entry.is_dir(), "attr {attr:#04X}");
            assert!(!entry.is_regular_file(), "attr {attr:#04X}");
            assert!(!entry.is_end_marker(), "attr {attr:#04X}");
        }
    }

    #[test]
    fn dot_entries_match_exactly() {
        let dot = DirEntry::from_slice(&record(b".       ", b"   ", ATTR_DIRECTORY, 4, 0)).unwrap();
        let dotdot =
            DirEntry::from_slice(&record(b"..      ", b"   ", ATTR_DIRECTORY, 0, 0)).unwrap();
        let hidden =
            DirEntry::from_slice(&record(b".CONFIG ", b"   ", ATTR_DIRECTORY, 9, 0)).unwrap();
        assert!(dot.is_self_or_parent());
        assert!(dotdot.is_self_or_parent());
        assert!(!hidden.is_self_or_parent());
    }

    #[test]
    fn short_record_fails_to_decode() {
        assert!(DirEntry::from_slice(&[0u8; 16]).is_err());
    }
}
