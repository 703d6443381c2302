//! FAT32 on-disk structures and the extraction engine.

pub mod bpb;
pub mod dir_entry;
pub mod fat;
pub mod fat_error;
pub mod fat_table;
pub mod image;
