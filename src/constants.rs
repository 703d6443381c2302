/// The size in bytes of the boot sector read from the start of the image.
pub const BOOT_SECTOR_SIZE: usize = 512;

/// The size in bytes of one on-disk directory record.
pub const DIR_ENTRY_SIZE: usize = 32;
