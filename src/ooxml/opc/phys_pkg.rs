//! Physical package access: the ZIP container under an OPC or ODF package.
//!
//! Reading is bounded per entry so a hostile archive cannot expand without
//! limit. Writing is deterministic: fixed timestamps, no extra attributes,
//! entries in the order they are written.

use crate::common::{Error, Result};
use crate::ooxml::opc::packuri::PackURI;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Default cap on a single decompressed entry (64 MiB).
pub const DEFAULT_MAX_ENTRY_BYTES: u64 = 64 * 1024 * 1024;

/// One member of a ZIP container, decompressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipEntry {
    /// Member name as stored (no leading slash)
    pub name: String,
    pub data: Vec<u8>,
    /// Whether the member was stored uncompressed
    pub stored: bool,
    /// Uncompressed size recorded in the central directory
    pub declared_size: u64,
}

/// Read access to a ZIP container held in memory.
pub struct PhysPkgReader<'data> {
    archive: ZipArchive<Cursor<&'data [u8]>>,
    max_entry_bytes: u64,
}

impl<'data> PhysPkgReader<'data> {
    pub fn new(data: &'data [u8]) -> Result<Self> {
        let archive = ZipArchive::new(Cursor::new(data))?;
        Ok(Self {
            archive,
            max_entry_bytes: DEFAULT_MAX_ENTRY_BYTES,
        })
    }

    /// Cap the decompressed size of any single entry.
    pub fn with_max_entry_bytes(mut self, limit: u64) -> Self {
        self.max_entry_bytes = limit;
        self
    }

    /// Number of members, directories included.
    #[inline]
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.archive.is_empty()
    }

    /// Member names in archive order, directories excluded.
    pub fn member_names(&self) -> Vec<String> {
        self.archive
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .map(String::from)
            .collect()
    }

    pub fn contains(&self, pack_uri: &PackURI) -> bool {
        self.archive.index_for_name(pack_uri.membername()).is_some()
    }

    /// Content of one part.
    pub fn blob_for(&mut self, pack_uri: &PackURI) -> Result<Vec<u8>> {
        let index = self
            .archive
            .index_for_name(pack_uri.membername())
            .ok_or_else(|| Error::integrity(pack_uri.as_str(), "part not found in package"))?;
        Ok(self.read_index(index)?.data)
    }

    /// Content of one part, or `None` if absent.
    pub fn blob_if_present(&mut self, pack_uri: &PackURI) -> Result<Option<Vec<u8>>> {
        match self.archive.index_for_name(pack_uri.membername()) {
            Some(index) => Ok(Some(self.read_index(index)?.data)),
            None => Ok(None),
        }
    }

    /// Every file member, in archive order.
    pub fn read_all(&mut self) -> Result<Vec<ZipEntry>> {
        let mut entries = Vec::with_capacity(self.archive.len());
        for index in 0..self.archive.len() {
            let entry = self.read_index(index)?;
            if !entry.name.ends_with('/') {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    fn read_index(&mut self, index: usize) -> Result<ZipEntry> {
        let limit = self.max_entry_bytes;
        let file = self.archive.by_index(index)?;
        let name = file.name().to_string();
        let declared_size = file.size();
        let stored = file.compression() == CompressionMethod::Stored;

        if declared_size > limit {
            return Err(Error::integrity(
                name,
                format!("entry declares {} bytes, limit is {}", declared_size, limit),
            ));
        }

        let mut data = Vec::with_capacity(declared_size as usize);
        file.take(limit + 1).read_to_end(&mut data)?;
        if data.len() as u64 > limit {
            return Err(Error::integrity(name, format!("entry exceeds {} bytes", limit)));
        }

        Ok(ZipEntry {
            name,
            data,
            stored,
            declared_size,
        })
    }
}

/// Writes a ZIP container to memory.
pub struct PhysPkgWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
}

impl PhysPkgWriter {
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    fn options(method: CompressionMethod) -> SimpleFileOptions {
        SimpleFileOptions::default()
            .compression_method(method)
            .last_modified_time(zip::DateTime::default())
    }

    /// Write a part with Deflate compression.
    pub fn write(&mut self, pack_uri: &PackURI, blob: &[u8]) -> Result<()> {
        self.write_member(pack_uri.membername(), blob, false)
    }

    /// Write a part without compression.
    pub fn write_stored(&mut self, pack_uri: &PackURI, blob: &[u8]) -> Result<()> {
        self.write_member(pack_uri.membername(), blob, true)
    }

    /// Write a raw member name. Used to re-emit archives that are not OPC
    /// packages (ODF) entry for entry.
    pub fn write_member(&mut self, name: &str, blob: &[u8], stored: bool) -> Result<()> {
        let method = if stored {
            CompressionMethod::Stored
        } else {
            CompressionMethod::Deflated
        };
        self.zip.start_file(name, Self::options(method))?;
        self.zip.write_all(blob)?;
        Ok(())
    }

    /// Finish the archive and return its bytes.
    pub fn finish(self) -> Result<Vec<u8>> {
        Ok(self.zip.finish()?.into_inner())
    }
}

impl Default for PhysPkgWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut writer = PhysPkgWriter::new();
        let uri = PackURI::new("/theme/theme/theme1.xml").unwrap();
        writer.write(&uri, b"<a:theme/>").unwrap();
        writer.write_member("mimetype", b"application/vnd.oasis.opendocument.presentation", true).unwrap();
        let bytes = writer.finish().unwrap();

        let mut reader = PhysPkgReader::new(&bytes).unwrap();
        assert!(reader.contains(&uri));
        assert_eq!(reader.blob_for(&uri).unwrap(), b"<a:theme/>");
        assert_eq!(reader.member_names(), ["theme/theme/theme1.xml", "mimetype"]);

        let entries = reader.read_all().unwrap();
        assert!(!entries[0].stored);
        assert!(entries[1].stored);
    }

    #[test]
    fn test_deterministic_output() {
        let build = || {
            let mut writer = PhysPkgWriter::new();
            writer.write(&PackURI::new("/a.xml").unwrap(), b"<a/>").unwrap();
            writer.finish().unwrap()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_entry_limit() {
        let mut writer = PhysPkgWriter::new();
        writer.write(&PackURI::new("/big.xml").unwrap(), &[b'x'; 4096]).unwrap();
        let bytes = writer.finish().unwrap();

        let mut reader = PhysPkgReader::new(&bytes).unwrap().with_max_entry_bytes(1024);
        assert!(matches!(reader.read_all(), Err(Error::PackageIntegrity { .. })));
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(PhysPkgReader::new(b"not a zip"), Err(Error::Zip(_))));
    }
}
