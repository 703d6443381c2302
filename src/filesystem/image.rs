//! Bounds-checked random access to a raw volume image.
//!
//! Every structure of the filesystem is read through [`ImageFile`], which
//! pairs the open read handle with the image's byte length so that any read
//! crossing the end of the image fails with a typed error instead of a bare
//! short read.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use super::fat_error::FATError;

/// A read-only volume image opened for positioned reads.
pub struct ImageFile {
    file: File,
    len: u64,
}

impl ImageFile {
    /// Opens the image at `path` read-only and records its length.
    pub fn open(path: &Path) -> Result<ImageFile, FATError> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self { file, len })
    }

    /// Returns the total length of the image in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns `true` if the image contains no bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Fills `buf` with the bytes at `offset`.
    ///
    /// # Errors
    ///
    /// - `FATError::ImageTruncated` if the requested range extends past the
    ///   end of the image.
    /// - `FATError::IOError` if the underlying read fails.
    pub fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), FATError> {
        match offset.checked_add(buf.len() as u64) {
            Some(end) if end <= self.len => {}
            _ => {
                return Err(FATError::ImageTruncated {
                    offset,
                    needed: buf.len(),
                });
            }
        }

        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    /// Fills `buf` with the bytes at `offset`, zero-filling whatever the
    /// image cannot supply.
    ///
    /// Payload reads use this instead of [`ImageFile::read_exact_at`]: a file
    /// whose declared size runs past the end of the image is padded with
    /// zeroes rather than rejected.
    pub fn read_padded_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), FATError> {
        buf.fill(0);
        if offset >= self.len {
            return Ok(());
        }

        self.file.seek(SeekFrom::Start(offset))?;
        let mut filled = 0;
        while filled < buf.len() {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn image_with(content: &[u8]) -> (NamedTempFile, ImageFile) {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(content).unwrap();
        let image = ImageFile::open(tmp.path()).unwrap();
        (tmp, image)
    }

    #[test]
    fn exact_read_within_bounds() {
        let (_tmp, mut image) = image_with(&[1, 2, 3, 4, 5]);
        let mut buf = [0u8; 3];
        image.read_exact_at(1, &mut buf).unwrap();
        assert_eq!(buf, [2, 3, 4]);
    }

    #[test]
    fn exact_read_past_end_is_truncation() {
        let (_tmp, mut image) = image_with(&[1, 2, 3, 4, 5]);
        let mut buf = [0u8; 4];
        let err = image.read_exact_at(3, &mut buf).unwrap_err();
        assert!(matches!(
            err,
            FATError::ImageTruncated { offset: 3, needed: 4 }
        ));
    }

    #[test]
    fn padded_read_zero_fills_past_end() {
        let (_tmp, mut image) = image_with(&[9, 9, 9]);
        let mut buf = [0xFFu8; 5];
        image.read_padded_at(1, &mut buf).unwrap();
        assert_eq!(buf, [9, 9, 0, 0, 0]);
    }

    #[test]
    fn padded_read_beyond_image_is_all_zeroes() {
        let (_tmp, mut image) = image_with(&[9, 9, 9]);
        let mut buf = [0xFFu8; 4];
        image.read_padded_at(100, &mut buf).unwrap();
        assert_eq!(buf, [0, 0, 0, 0]);
    }
}
