//! Collects the documents named on the command line: PDF files, ZIP archives
//! of PDFs, and directories containing either.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use anyhow::Context;
use audit::DocumentEntry;
use walkdir::WalkDir;
use zip::ZipArchive;

/// Resource-fork directory macOS adds to archives it creates.
const MACOS_METADATA_DIR: &str = "__MACOSX/";

/// Expands `inputs` into PDF and ZIP paths, sorted and de-duplicated.
///
/// Files are taken as given when they have a `.pdf` or `.zip` extension;
/// directories are walked recursively. Other files are skipped.
pub fn discover(inputs: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for input in inputs {
        let metadata = std::fs::metadata(input)
            .with_context(|| format!("cannot read input {}", input.display()))?;
        if metadata.is_dir() {
            for entry in WalkDir::new(input).follow_links(true) {
                let entry =
                    entry.with_context(|| format!("failed to walk {}", input.display()))?;
                if entry.file_type().is_file() && is_document_source(entry.path()) {
                    found.push(entry.into_path());
                }
            }
        } else if is_document_source(input) {
            found.push(input.clone());
        } else {
            tracing::warn!(path = %input.display(), "Skipping input that is neither PDF nor ZIP");
        }
    }
    found.sort();
    found.dedup();
    Ok(found)
}

/// Reads each path into [`DocumentEntry`]s, keeping the order of `paths`.
///
/// A PDF yields one entry named after its file name; a ZIP archive yields one
/// entry per PDF member.
pub fn load(paths: &[PathBuf]) -> anyhow::Result<Vec<DocumentEntry>> {
    let mut entries = Vec::with_capacity(paths.len());
    for path in paths {
        if has_extension(path, "zip") {
            entries.extend(unpack_archive(path)?);
        } else {
            let content = std::fs::read(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            entries.push(DocumentEntry::new(file_name(path), content));
        }
    }
    Ok(entries)
}

/// The PDF members of the archive at `path`, ordered by member path.
pub fn unpack_archive(path: &Path) -> anyhow::Result<Vec<DocumentEntry>> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let entries = read_archive(BufReader::new(file))
        .with_context(|| format!("failed to unpack ZIP archive {}", path.display()))?;
    tracing::info!(archive = %path.display(), documents = entries.len(), "Archive unpacked");
    Ok(entries)
}

fn read_archive<R: Read + Seek>(reader: R) -> anyhow::Result<Vec<DocumentEntry>> {
    let mut archive = ZipArchive::new(reader)?;
    let mut members: Vec<(String, Vec<u8>)> = Vec::new();
    for index in 0..archive.len() {
        let mut member = archive.by_index(index)?;
        let name = member.name().to_string();
        if !member.is_file()
            || name.starts_with(MACOS_METADATA_DIR)
            || !has_extension(Path::new(&name), "pdf")
        {
            continue;
        }
        let mut content = Vec::new();
        member
            .read_to_end(&mut content)
            .with_context(|| format!("failed to read member {name}"))?;
        members.push((name, content));
    }
    members.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(members
        .into_iter()
        .map(|(name, content)| DocumentEntry::new(base_name(&name), content))
        .collect())
}

/// Last component of a file-system or archive path. Archive members always
/// use `/`, but archives built on Windows sometimes carry `\`.
fn base_name(path: &str) -> String {
    path.rsplit(['/', '\\'])
        .next()
        .filter(|n| !n.is_empty())
        .unwrap_or(path)
        .to_string()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn is_document_source(path: &Path) -> bool {
    has_extension(path, "pdf") || has_extension(path, "zip")
}

fn has_extension(path: &Path, wanted: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(wanted))
}
