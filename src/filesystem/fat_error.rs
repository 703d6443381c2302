//! Error types for FAT32 parsing, validation and extraction.
//!
//! This module defines the errors that can occur while decoding the boot
//! sector, the File Allocation Table and directory records, while resolving
//! cluster chains, and while materializing the extracted tree on the host
//! filesystem.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during FAT32 parsing and extraction.
#[derive(Error, Debug)]
pub enum FATError {
    /// The image is too short to supply a structure at a required offset.
    #[error("Image truncated: {needed} bytes required at offset 0x{offset:X}")]
    ImageTruncated { offset: u64, needed: usize },

    /// Fewer than 32 bytes remain in the image for a directory record.
    #[error(
        "Truncated directory record at offset 0x{offset:X}: only {available} of 32 bytes available"
    )]
    TruncatedEntry { offset: u64, available: u64 },

    /// A directory's entry stream reached the end of the image without an
    /// end-of-directory sentinel.
    #[error("Directory stream reached the end of the image at offset 0x{offset:X} without a sentinel")]
    UnterminatedDirectory { offset: u64 },

    /// A cluster chain or directory walk revisited a cluster or referenced
    /// one outside the FAT.
    #[error("Corrupt cluster chain: {0}")]
    CorruptChain(String),

    /// A destination directory or file could not be created or written.
    #[error("Cannot write to destination `{}`: {source}", path.display())]
    DestinationUnwritable { path: PathBuf, source: io::Error },

    /// The first three bytes of a FAT volume must contain a valid x86 jump instruction.
    #[error("Invalid jump instruction `{0}`")]
    InvalidJmp(String),

    /// Bytes per sector must be 512, 1024, 2048 or 4096.
    #[error("Invalid count of bytes per sector: `{0}`. Legal values: 512, 1024, 2048 or 4096")]
    InvalidBytesPerSec(u16),

    /// Sectors per cluster must be a power of 2: 1, 2, 4, 8, 16, 32, 64, or 128.
    #[error(
        "Invalid number of sector per cluster: `{0}`. Legal values: 1, 2, 4, 8, 16, 32, 64, 128"
    )]
    InvalidSecPerClus(u8),

    /// Total cluster size (bytes per sector × sectors per cluster) must not exceed 32 KiB.
    #[error("Invalid cluster size: `{0}`. Any value greater than 32K is invalid.")]
    InvalidClusSz(u32),

    /// The count of reserved sectors must be greater than 0.
    #[error("Invalid count of reserved sectors: `{0}`. Any value greater than 0 is valid.")]
    InvalidRsvdSecCnt(u16),

    /// The number of File Allocation Tables must be valid (typically 2 for redundancy).
    #[error("Invalid number of FATs on this volume: `{0}`.")]
    InvalidNumFat(u8),

    /// For FAT32 volumes, the root directory entries count must be 0 as the
    /// root directory is stored as a regular cluster chain.
    #[error(
        "Invalid count of directory entries in the root directory: `{0}`. It should be 0 for a FAT32 volume."
    )]
    InvalidRootEntCnt(u16),

    /// The total sector count must be valid for the volume size.
    #[error("Invalid total count of sectors on the volume: `{0}`")]
    InvalidTotSec(String),

    /// The FAT size in sectors must be valid and consistent with the volume layout.
    #[error("Invalid FAT size: `{0}`")]
    InvalidFatSz(String),

    /// The root directory's first cluster number must be at least 2.
    /// Clusters 0 and 1 are reserved, and the data area starts at cluster 2.
    #[error(
        "Invalid cluster number of the first cluster of the root directory: `{0}`. This value should be at least 2."
    )]
    InvalidRootClus(u32),

    /// The boot sector signature must be 0x55AA.
    #[error("Invalid BPB signature: `{0}`. Expected signature: 0x55AA")]
    InvalidSignature(String),

    /// The detected FAT type is not supported (only FAT32 is supported).
    #[error("Unsupported FAT type: `{0}`")]
    UnsupportedFATType(String),

    /// Underlying I/O errors that occur while reading the image.
    #[error("IO Error: `{0}`")]
    IOError(io::Error),

    /// Parsing error occured during structure initialization
    #[error("BinRead Error: `{0}`")]
    BinReadError(binread::Error),
}

/// Converts standard I/O errors into FATError.
impl From<io::Error> for FATError {
    fn from(err: io::Error) -> Self {
        FATError::IOError(err)
    }
}

/// Converts BinRead errors into FATError.
impl From<binread::Error> for FATError {
    fn from(err: binread::Error) -> Self {
        FATError::BinReadError(err)
    }
}
