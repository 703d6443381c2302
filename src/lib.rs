//!
//! fat_extract: A library and CLI for extracting the contents of raw FAT32 volume images.
//!
//! This crate provides tools for:
//! - Parsing and validating FAT32 boot sectors
//! - Decoding File Allocation Tables and resolving cluster chains
//! - Scanning directory entry streams, deleted entries included
//! - Recursively extracting a volume's directory tree and file contents
//!
//! The library reads the image without mounting it, so it works on any
//! seekable byte-for-byte copy of a FAT32 volume.
//!
//! # Re-exports
//! - [`FATVol`]: FAT volume abstraction
//! - [`FATError`]: Error type shared by all decoding and extraction operations

pub mod constants;
pub mod filesystem;
pub mod traits;
pub mod utils;

/// FAT volume abstraction (see [`filesystem::fat::FATVol`]).
pub use crate::filesystem::fat::FATVol;
/// Error type shared by all decoding and extraction operations (see [`filesystem::fat_error::FATError`]).
pub use crate::filesystem::fat_error::FATError;
