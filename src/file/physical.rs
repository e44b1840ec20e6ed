use super::Backend;
use crate::Result;

use memmap2::Mmap;
use std::{fs, path::Path};

/// PE image or package archive mapped from disk.
#[derive(Debug)]
pub struct Physical {
    data: Mmap,
}

impl Physical {
    /// Map the file at `path` read-only.
    ///
    /// ## Arguments
    /// * 'path' - The file to map
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or mapped.
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = fs::File::open(path)?;

        // The mapping is only ever read; concurrent truncation of the file by another
        // process is outside of what this crate guards against.
        let mmap = unsafe { Mmap::map(&file) }?;

        Ok(Physical { data: mmap })
    }
}

impl Backend for Physical {
    fn data(&self) -> &[u8] {
        self.data.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn physical() {
        let mut temp = tempfile::NamedTempFile::new().unwrap();
        temp.write_all(&[0x4D, 0x5A, 0x90, 0x00]).unwrap();
        temp.flush().unwrap();

        let physical = Physical::new(temp.path()).unwrap();

        assert_eq!(physical.len(), 4);
        assert_eq!(physical.data_slice(0, 2).unwrap(), &[0x4D, 0x5A]);
        assert!(physical.data_slice(2, 3).is_err());
    }

    #[test]
    fn missing_file() {
        if Physical::new("/this/path/does/not/exist.dll").is_ok() {
            panic!("This should not work!")
        }
    }
}
