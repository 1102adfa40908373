//! Removes the edit restriction (`p:modifyVerifier`) from a PPTX package.
//!
//! The package is extracted into a temporary directory, the presentation
//! part is edited in place, and every entry is archived again in its
//! original order. Every failure degrades to returning the input unchanged;
//! the temporary directory is removed on all paths when it is dropped.

use crate::package::{write_entry, EntryMeta};
use crate::parser::PRESENTATION_PART;
use balaram_core::{Error, Result};
use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use quick_xml::Writer;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};
use zip::{ZipArchive, ZipWriter};

/// PresentationML main namespace.
pub const P_NS: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";

/// What an unlock call did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum UnlockStatus {
    /// Protection elements were removed.
    Unlocked { removed: usize },
    /// The presentation part carried no protection.
    AlreadyUnlocked,
    /// The package has no presentation part; nothing to unlock.
    NoPresentationPart,
    /// The input could not be extracted; returned unchanged.
    NotAnArchive(String),
    /// The presentation part could not be edited; it was left as is.
    XmlFailed(String),
    /// The package could not be archived again; returned unchanged.
    RepackFailed(String),
}

/// Result of [`Unlocker::unlock`].
#[derive(Debug, Clone)]
pub struct UnlockOutcome {
    pub bytes: Vec<u8>,
    pub status: UnlockStatus,
}

/// Strips edit protection from PPTX packages.
#[derive(Debug, Clone, Default)]
pub struct Unlocker {
    /// Where extraction directories are created; the system temp dir if unset.
    temp_root: Option<PathBuf>,
}

impl Unlocker {
    /// Create an unlocker that extracts under the system temp dir.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create extraction directories under `root` instead.
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }

    /// Remove every `modifyVerifier` from the presentation part.
    ///
    /// Never fails: when the package cannot be processed the input bytes
    /// are returned and the status says why.
    pub fn unlock(&self, bytes: &[u8]) -> UnlockOutcome {
        let extraction = match Extraction::extract(bytes, self.temp_root.as_deref()) {
            Ok(extraction) => extraction,
            Err(e) => {
                log::warn!("Unlock skipped, could not extract package: {}", e);
                return UnlockOutcome {
                    bytes: bytes.to_vec(),
                    status: UnlockStatus::NotAnArchive(e.to_string()),
                };
            }
        };

        let status = extraction.strip_presentation();

        match extraction.repack() {
            Ok(repacked) => {
                log::debug!("Unlock finished: {:?}", status);
                UnlockOutcome {
                    bytes: repacked,
                    status,
                }
            }
            Err(e) => {
                log::warn!("Unlock skipped, could not repack package: {}", e);
                UnlockOutcome {
                    bytes: bytes.to_vec(),
                    status: UnlockStatus::RepackFailed(e.to_string()),
                }
            }
        }
    }
}

/// A package extracted into a scoped temporary directory.
struct Extraction {
    dir: TempDir,
    /// Entries in archive order.
    entries: Vec<EntryMeta>,
}

impl Extraction {
    fn extract(bytes: &[u8], temp_root: Option<&Path>) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let builder = {
            let mut builder = tempfile::Builder::new();
            builder.prefix("balaram-unlock-");
            builder
        };
        let dir = match temp_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        log::debug!("Extracting {} entries to {}", archive.len(), dir.path().display());

        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| Error::ZipError(format!("Failed to read entry {}: {}", i, e)))?;

            let meta = EntryMeta {
                name: file.name().to_string(),
                is_dir: file.is_dir(),
                compression: file.compression(),
                last_modified: file.last_modified(),
                unix_mode: file.unix_mode(),
            };
            let relative = file
                .enclosed_name()
                .map(|p| p.to_path_buf())
                .ok_or_else(|| Error::UnsafeEntry(meta.name.clone()))?;
            let path = dir.path().join(relative);

            if meta.is_dir {
                fs::create_dir_all(&path)?;
            } else {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                let mut out = File::create(&path)?;
                io::copy(&mut file, &mut out)
                    .map_err(|e| Error::ZipError(format!("Failed to extract '{}': {}", meta.name, e)))?;
            }
            entries.push(meta);
        }

        Ok(Self { dir, entries })
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Edit the presentation part on disk. Failures leave the part as it was.
    fn strip_presentation(&self) -> UnlockStatus {
        let listed = self
            .entries
            .iter()
            .any(|e| !e.is_dir && e.name == PRESENTATION_PART);
        if !listed {
            log::debug!("No {} in package, nothing to unlock", PRESENTATION_PART);
            return UnlockStatus::NoPresentationPart;
        }

        let path = self.path_of(PRESENTATION_PART);
        let result = fs::read(&path)
            .map_err(Error::from)
            .and_then(|xml| strip_modify_verifier(&xml));

        match result {
            Ok((_, 0)) => UnlockStatus::AlreadyUnlocked,
            Ok((xml, removed)) => match self.replace_file(&path, &xml) {
                Ok(()) => {
                    log::debug!("Removed {} modifyVerifier element(s)", removed);
                    UnlockStatus::Unlocked { removed }
                }
                Err(e) => {
                    log::warn!("Could not rewrite {}: {}", PRESENTATION_PART, e);
                    UnlockStatus::XmlFailed(e.to_string())
                }
            },
            Err(e) => {
                log::warn!("Could not edit {}: {}", PRESENTATION_PART, e);
                UnlockStatus::XmlFailed(e.to_string())
            }
        }
    }

    /// Replace a file through a freshly created staging file, so a failed
    /// write never leaves it half written and no extracted entry is touched.
    fn replace_file(&self, path: &Path, data: &[u8]) -> Result<()> {
        let mut staged = NamedTempFile::new_in(self.dir.path())?;
        staged.write_all(data)?;
        staged.persist(path).map_err(|e| Error::from(e.error))?;
        Ok(())
    }

    /// Archive every extracted entry again, in the original order.
    fn repack(&self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        for meta in &self.entries {
            let data = if meta.is_dir {
                Vec::new()
            } else {
                fs::read(self.path_of(&meta.name))?
            };
            write_entry(&mut zip, meta, &data)?;
        }

        let cursor = zip
            .finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish ZIP: {}", e)))?;
        Ok(cursor.into_inner())
    }
}

/// Remove every `modifyVerifier` element of the presentation namespace.
///
/// Events are streamed through unchanged otherwise, so namespace prefixes and
/// attribute order stay exactly as declared. Returns the new part and the
/// number of elements removed. The output always starts with an XML
/// declaration.
pub fn strip_modify_verifier(xml: &[u8]) -> Result<(Vec<u8>, usize)> {
    let mut reader = NsReader::from_reader(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut buf = Vec::new();

    let mut removed = 0;
    let mut open = 0usize;
    // Depth inside a removed element.
    let mut skip_depth = 0usize;
    let mut first = true;

    loop {
        buf.clear();
        let (ns, event) = reader
            .read_resolved_event_into(&mut buf)
            .map_err(|e| Error::XmlError(format!("Error parsing {}: {}", PRESENTATION_PART, e)))?;

        if first {
            first = false;
            if !matches!(event, Event::Decl(_)) {
                let decl = BytesDecl::new("1.0", Some("UTF-8"), Some("yes"));
                writer
                    .write_event(Event::Decl(decl))
                    .map_err(|e| Error::XmlError(e.to_string()))?;
            }
        }

        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                Event::Eof => {
                    return Err(Error::XmlError("Unclosed modifyVerifier element".into()));
                }
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(ref e) if is_modify_verifier(&ns, e) => {
                removed += 1;
                skip_depth = 1;
            }
            Event::Empty(ref e) if is_modify_verifier(&ns, e) => removed += 1,
            Event::Eof if open > 0 => {
                return Err(Error::XmlError(format!("{} has unclosed elements", PRESENTATION_PART)));
            }
            Event::Eof => break,
            event => {
                match event {
                    Event::Start(_) => open += 1,
                    Event::End(_) => open = open.saturating_sub(1),
                    _ => {}
                }
                writer
                    .write_event(event)
                    .map_err(|e| Error::XmlError(e.to_string()))?;
            }
        }
    }

    Ok((writer.into_inner(), removed))
}

fn is_modify_verifier(ns: &ResolveResult, e: &BytesStart) -> bool {
    let in_presentation_ns =
        matches!(ns, ResolveResult::Bound(Namespace(uri)) if *uri == P_NS.as_bytes());
    in_presentation_ns && e.local_name().as_ref() == b"modifyVerifier"
}
