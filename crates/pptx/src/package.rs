//! In-memory view of a PPTX ZIP package.
//!
//! Entries keep their archive order, compression method, timestamp, and unix
//! mode, so a package written back without edits carries the same parts with
//! the same content.

use balaram_core::{Error, Result};
use std::io::{Cursor, Read, Seek, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// Metadata of one archive entry.
#[derive(Debug, Clone)]
pub struct EntryMeta {
    /// Entry name inside the archive, e.g. `ppt/slides/slide1.xml`.
    pub name: String,
    pub is_dir: bool,
    pub compression: CompressionMethod,
    pub last_modified: DateTime,
    pub unix_mode: Option<u32>,
}

impl EntryMeta {
    fn from_zip_file(file: &zip::read::ZipFile<'_>) -> Self {
        Self {
            name: file.name().to_string(),
            is_dir: file.is_dir(),
            compression: file.compression(),
            last_modified: file.last_modified(),
            unix_mode: file.unix_mode(),
        }
    }

    /// Writer options reproducing this entry's metadata.
    pub fn options(&self) -> FileOptions {
        // Anything other than stored is recompressed with deflate.
        let compression = match self.compression {
            CompressionMethod::Stored => CompressionMethod::Stored,
            _ => CompressionMethod::Deflated,
        };

        let options = FileOptions::default()
            .compression_method(compression)
            .last_modified_time(self.last_modified);

        match self.unix_mode {
            Some(mode) => options.unix_permissions(mode),
            None => options,
        }
    }
}

/// One entry together with its data.
#[derive(Debug, Clone)]
struct Entry {
    meta: EntryMeta,
    data: Vec<u8>,
}

/// A ZIP package held in memory.
#[derive(Debug, Clone, Default)]
pub struct Package {
    entries: Vec<Entry>,
}

impl Package {
    /// Read every entry of the archive in `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }

    /// Read every entry of an archive.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| Error::ZipError(format!("Failed to read entry {}: {}", i, e)))?;

            let meta = EntryMeta::from_zip_file(&file);
            let mut data = Vec::new();
            if !meta.is_dir {
                file.read_to_end(&mut data)
                    .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", meta.name, e)))?;
            }
            entries.push(Entry { meta, data });
        }

        log::debug!("Read package with {} entries", entries.len());
        Ok(Self { entries })
    }

    /// Data of the part at `name`.
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| !e.meta.is_dir && e.meta.name == name)
            .map(|e| e.data.as_slice())
    }

    /// Whether the package holds a part at `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.part(name).is_some()
    }

    /// Replace the data of an existing part, or append a new deflated part.
    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| !e.meta.is_dir && e.meta.name == name)
        {
            entry.data = data;
            return;
        }

        self.entries.push(Entry {
            meta: EntryMeta {
                name: name.to_string(),
                is_dir: false,
                compression: CompressionMethod::Deflated,
                last_modified: DateTime::default(),
                unix_mode: None,
            },
            data,
        });
    }

    /// Names of all parts, in archive order.
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| !e.meta.is_dir)
            .map(|e| e.meta.name.as_str())
    }

    /// Number of parts.
    pub fn len(&self) -> usize {
        self.part_names().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the package as a new archive.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        for entry in &self.entries {
            write_entry(&mut zip, &entry.meta, &entry.data)?;
        }

        let cursor = zip
            .finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish ZIP: {}", e)))?;
        Ok(cursor.into_inner())
    }
}

/// Append one entry to an archive being written.
pub(crate) fn write_entry<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    meta: &EntryMeta,
    data: &[u8],
) -> Result<()> {
    if meta.is_dir {
        zip.add_directory(meta.name.as_str(), meta.options())
            .map_err(|e| Error::ZipError(format!("Failed to add '{}': {}", meta.name, e)))?;
        return Ok(());
    }

    zip.start_file(meta.name.as_str(), meta.options())
        .map_err(|e| Error::ZipError(format!("Failed to add '{}': {}", meta.name, e)))?;
    zip.write_all(data)
        .map_err(|e| Error::ZipError(format!("Failed to write '{}': {}", meta.name, e)))?;
    Ok(())
}
