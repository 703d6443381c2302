//! FAT Bpb structure.
//!
//! This module implements:
//! - BIOS Parameter Block (Bpb) parsing and validation
//! - FAT type detection (FAT12/16/32)
//! - The volume geometry derived from the Bpb (cluster size, FAT region,
//!   data region start)

use binread::{BinRead, BinReaderExt};
use getset::Getters;
use std::fmt;
use std::io;

use super::fat_error::FATError;

/// Represents the different types of FAT filesystems.
///
/// Only FAT32 volumes can be extracted; the other two are detected so they
/// can be rejected with a precise error.
#[derive(PartialEq)]
pub enum FATType {
    FAT12,
    FAT16,
    FAT32,
}

impl fmt::Display for FATType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FATType::FAT12 => "FAT12",
            FATType::FAT16 => "FAT16",
            FATType::FAT32 => "FAT32",
        };
        write!(f, "{s}")
    }
}

/// BIOS Parameter Block structure for FAT filesystems.
///
/// The Bpb contains the volume geometry the extractor runs on: sector size,
/// cluster size, the reserved region, the FAT region and the root directory
/// cluster. It is decoded once from the first sector of the image and is
/// immutable afterwards.
#[derive(BinRead, Debug, Getters)]
#[br(little)]
pub struct Bpb {
    /// Jump instruction to boot code (must be 0xEB ?? 0x90 or 0xE9 ?? ??)
    jmp: [u8; 3],
    /// OEM identifier (e.g., "MSWIN4.1")
    _oem_name: [u8; 8],
    /// Number of bytes per sector (512, 1024, 2048, or 4096)
    #[get = "pub(super)"]
    bytes_per_sec: u16,
    /// Number of sectors per cluster (power of 2: 1, 2, 4, 8, 16, 32, 64, or 128)
    #[get = "pub(super)"]
    sec_per_clus: u8,
    /// Number of reserved sectors from start of volume
    #[get = "pub(super)"]
    rsvd_sec_cnt: u16,
    /// Number of FAT copies (typically 2 for redundancy)
    #[get = "pub(super)"]
    num_fat: u8,
    /// Maximum number of root directory entries (0 for FAT32)
    root_ent_cnt: u16,
    /// Total sectors for volumes < 32MB (0 for FAT32)
    tot_sec_16: u16,
    /// Media descriptor (0xF8 for fixed disk)
    _media: u8,
    /// Sectors per FAT for FAT12/FAT16 (0 for FAT32)
    fat_sz_16: u16,
    /// Sectors per track
    _sec_per_trk: u16,
    /// Number of heads
    _num_heads: u16,
    /// Number of hidden sectors preceding the partition
    _hidd_sec: u32,
    /// Total sectors for volumes >= 32MB
    tot_sec_32: u32,

    // FAT32-specific fields
    /// Sectors per FAT
    fat_sz_32: u32,
    /// FAT flags (mirroring, active FAT)
    _ext_flags: u16,
    /// Filesystem version (should be 0:0)
    _fs_ver: u16,
    /// First cluster of root directory (typically 2)
    #[get = "pub(super)"]
    root_clus: u32,
    /// Sector number of FSINFO structure
    _fs_info: u16,
    /// Sector number of backup boot sector
    _bk_boot_sec: u16,
    /// Reserved for future expansion
    _reserved: [u8; 12],
    /// Drive number (0x80 for hard disk)
    _drv_num: u8,
    /// Reserved (used by Windows NT)
    _reserved_1: u8,
    /// Extended boot signature (0x29)
    _boot_sig: u8,
    /// Volume serial number
    _vol_id: u32,
    /// Volume label (11 bytes)
    _vol_lab: [u8; 11],
    /// Filesystem type label ("FAT32   ")
    _fil_sys_type: [u8; 8],

    /// Boot code (not part of Bpb specification)
    #[br(count = 420)]
    _boot_code: Vec<u8>,
    /// Boot sector signature (0x55 0xAA)
    sig: [u8; 2],
}

impl Bpb {
    /// Decodes a Bpb from a boot-sector buffer and optionally validates it.
    ///
    /// # Parameters
    /// - `buf`: The raw boot sector (at least 512 bytes)
    /// - `validate`: Whether to perform validation checks on the Bpb
    ///
    /// # Returns
    /// - `Ok(Bpb)`: The parsed and optionally validated Bpb structure
    /// - `Err(FATError)`: If decoding or validation fails
    pub fn from_slice(buf: &[u8], validate: bool) -> Result<Bpb, FATError> {
        let mut reader = io::Cursor::new(buf);
        let bpb: Bpb = reader.read_le()?;

        if validate { bpb.validate() } else { Ok(bpb) }
    }

    /// The size in bytes of one cluster.
    pub fn cluster_size(&self) -> u32 {
        self.bytes_per_sec as u32 * self.sec_per_clus as u32
    }

    /// The byte offset of the FAT region, right after the reserved sectors.
    pub fn fat_start(&self) -> u64 {
        self.rsvd_sec_cnt as u64 * self.bytes_per_sec as u64
    }

    /// The size in bytes of one FAT copy.
    pub fn fat_copy_size(&self) -> u64 {
        self.fat_sz_32 as u64 * self.bytes_per_sec as u64
    }

    /// The size in bytes of the whole FAT region, all copies included.
    pub fn fat_region_size(&self) -> u64 {
        self.fat_copy_size() * self.num_fat as u64
    }

    /// The byte offset of the data region, right after the FAT region.
    ///
    /// Cluster 2 is the first cluster of the data region; a FAT32 volume has
    /// no fixed root directory area in front of it.
    pub fn data_start(&self) -> u64 {
        self.fat_start() + self.fat_region_size()
    }

    /// Determines the number of clusters in the data section.
    pub fn cluster_count(&self) -> u32 {
        let root_dir_sectors =
            (self.root_ent_cnt as u32 * 32).div_ceil(self.bytes_per_sec as u32);

        let fat_sz = if self.fat_sz_16 > 0 {
            self.fat_sz_16 as u32
        } else {
            self.fat_sz_32
        };

        let tot_sec = if self.tot_sec_16 != 0 {
            self.tot_sec_16 as u32
        } else {
            self.tot_sec_32
        };

        let data_sec = tot_sec
            .saturating_sub(self.rsvd_sec_cnt as u32 + (self.num_fat as u32 * fat_sz) + root_dir_sectors);
        data_sec / self.sec_per_clus as u32
    }

    /// Determines the FAT type of the volume.
    ///
    /// A Bpb whose 16-bit sectors-per-FAT field and root-entry count are both
    /// zero uses the FAT32 layout regardless of its cluster count; compacted
    /// images can sit far below the Microsoft cluster-count threshold while
    /// still being FAT32 on disk. Otherwise the cluster-count thresholds of
    /// Microsoft's FAT specification apply.
    pub(super) fn fat_type(&self) -> FATType {
        if self.fat_sz_16 == 0 && self.root_ent_cnt == 0 {
            return FATType::FAT32;
        }

        let clus_cnt = self.cluster_count();
        if clus_cnt < 4085 {
            FATType::FAT12
        } else if clus_cnt < 65525 {
            FATType::FAT16
        } else {
            FATType::FAT32
        }
    }

    /// Validates the Bpb structure according to FAT32 specification requirements.
    ///
    /// # Returns
    /// - `Ok(Self)`: If all validation checks pass
    /// - `Err(FATError)`: If any validation check fails
    ///
    /// # Errors
    /// - `FATError::InvalidJmp`: If the jump instruction is invalid
    /// - `FATError::InvalidBytesPerSec`: If bytes per sector is not a valid value
    /// - `FATError::InvalidSecPerClus`: If sectors per cluster is not a valid value
    /// - `FATError::InvalidClusSz`: If cluster size exceeds 32 KiB
    /// - `FATError::InvalidSignature`: If boot sector signature is not 0x55AA
    /// - `FATError::UnsupportedFATType`: If filesystem is not FAT32
    fn validate(self) -> Result<Self, FATError> {
        // General verification
        if !((self.jmp[0] == 0xEB && self.jmp[2] == 0x90) || self.jmp[0] == 0xE9) {
            return Err(FATError::InvalidJmp(format!(
                "0x{:02X}{:02X}{:02X}",
                self.jmp[0], self.jmp[1], self.jmp[2],
            )));
        }

        const VALID_BYTES_PER_SEC: [u16; 4] = [512, 1024, 2048, 4096];
        if !VALID_BYTES_PER_SEC.contains(&self.bytes_per_sec) {
            return Err(FATError::InvalidBytesPerSec(self.bytes_per_sec));
        }

        const VALID_SEC_PER_CLUS: [u8; 8] = [1, 2, 4, 8, 16, 32, 64, 128];
        if !VALID_SEC_PER_CLUS.contains(&self.sec_per_clus) {
            return Err(FATError::InvalidSecPerClus(self.sec_per_clus));
        }

        if self.cluster_size() > 32 * 1024 {
            return Err(FATError::InvalidClusSz(self.cluster_size()));
        }

        const SIG: [u8; 2] = [0x55, 0xAA];
        if !self.sig.eq(&SIG) {
            return Err(FATError::InvalidSignature(format!(
                "0x{:02X}{:02X}",
                self.sig[0], self.sig[1]
            )));
        }

        // Specific verification depending on the type of FAT
        let fat_type = self.fat_type();
        if fat_type == FATType::FAT32 {
            self.validate_fat32()
        } else {
            Err(FATError::UnsupportedFATType(fat_type.to_string()))
        }
    }

    /// Performs FAT32-specific validation checks.
    ///
    /// # Errors
    /// - `FATError::InvalidRsvdSecCnt`: If reserved sector count is 0
    /// - `FATError::InvalidNumFat`: If number of FATs is 0
    /// - `FATError::InvalidRootEntCnt`: If root directory entries is not 0
    /// - `FATError::InvalidTotSec`: If total sector fields are invalid for FAT32
    /// - `FATError::InvalidFatSz`: If FAT size fields are invalid for FAT32
    /// - `FATError::InvalidRootClus`: If root directory cluster is less than 2
    fn validate_fat32(self) -> Result<Self, FATError> {
        if self.rsvd_sec_cnt == 0 {
            return Err(FATError::InvalidRsvdSecCnt(self.rsvd_sec_cnt));
        }

        if self.num_fat == 0 {
            return Err(FATError::InvalidNumFat(self.num_fat));
        }

        if self.root_ent_cnt != 0 {
            return Err(FATError::InvalidRootEntCnt(self.root_ent_cnt));
        }

        // Check for the count of sectors
        if self.tot_sec_16 != 0 {
            return Err(FATError::InvalidTotSec(String::from(
                "BPB_TotSec16 should be 0 for a FAT32 volume.",
            )));
        }
        if self.tot_sec_32 == 0 {
            return Err(FATError::InvalidTotSec(String::from(
                "BPB_TotSec32 should be greater than 0 for a FAT32 volume.",
            )));
        }

        // Check the FAT size
        if self.fat_sz_16 != 0 {
            return Err(FATError::InvalidFatSz(String::from(
                "BPB_FATSz16 should be 0 for a FAT32 volume.",
            )));
        }
        if self.fat_sz_32 == 0 {
            return Err(FATError::InvalidFatSz(String::from(
                "BPB_FATSz32 should be greater than 0 for a FAT32 volume.",
            )));
        }

        if self.root_clus < 2 {
            return Err(FATError::InvalidRootClus(self.root_clus));
        }

        Ok(self)
    }
}
