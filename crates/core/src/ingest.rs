use crate::chunking::{build_chunk_records, ChunkingConfig, TextSplitter};
use crate::error::{ExtractError, IngestError};
use crate::extractor::{extract_text_from_file, FileKind};
use crate::models::{ChunkRecord, IngestionOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiscoveredFiles {
    pub supported: Vec<PathBuf>,
    pub ignored: Vec<PathBuf>,
}

/// Lists the files of `folder`, split by whether a text extractor exists for them.
///
/// Without `recursive` only the folder's direct children are considered.
/// Symlinks are followed; broken links and loops are logged and skipped.
pub fn discover_documents(folder: &Path, recursive: bool) -> DiscoveredFiles {
    let mut walker = WalkDir::new(folder).follow_links(true);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut discovered = DiscoveredFiles::default();
    for entry in walker.into_iter() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                warn!(folder = %folder.display(), error = %error, "unable to read folder entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.into_path();
        if FileKind::from_path(&path).is_supported() {
            discovered.supported.push(path);
        } else {
            discovered.ignored.push(path);
        }
    }

    discovered.supported.sort_unstable();
    discovered.ignored.sort_unstable();
    discovered
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: ExtractError,
}

#[derive(Debug, Default)]
pub struct IngestionReport {
    pub chunks: Vec<ChunkRecord>,
    pub processed_files: Vec<PathBuf>,
    pub skipped_files: Vec<SkippedFile>,
    pub ignored_files: Vec<PathBuf>,
}

impl IngestionReport {
    /// The chunks, or `NothingToEmbed` when every file was skipped or empty.
    pub fn into_embeddable(self) -> Result<Vec<ChunkRecord>, IngestError> {
        if self.chunks.is_empty() {
            return Err(IngestError::NothingToEmbed {
                skipped: self
                    .skipped_files
                    .into_iter()
                    .map(|skipped| skipped.path)
                    .collect(),
            });
        }
        Ok(self.chunks)
    }
}

/// Extracts and chunks every PDF/DOCX under `folders`, in folder, file, chunk order.
///
/// Per-file extraction failures land in `skipped_files`. The only hard
/// failure is finding no supported file at all.
pub fn ingest_folders(
    folders: &[PathBuf],
    options: &IngestionOptions,
) -> Result<IngestionReport, IngestError> {
    if folders.is_empty() {
        return Err(IngestError::InvalidArgument(
            "at least one folder is required".to_string(),
        ));
    }

    let splitter = TextSplitter::new(ChunkingConfig::from(options))?;
    let mut report = IngestionReport::default();
    let mut supported_total = 0usize;

    for folder in folders {
        if !folder.is_dir() {
            warn!(folder = %folder.display(), "folder does not exist, skipping");
            continue;
        }

        let discovered = discover_documents(folder, options.recursive);
        supported_total += discovered.supported.len();
        debug!(
            folder = %folder.display(),
            supported = discovered.supported.len(),
            ignored = discovered.ignored.len(),
            "discovered documents"
        );

        for path in discovered.supported {
            match ingest_file(&path, &splitter) {
                Ok(chunks) => {
                    debug!(path = %path.display(), chunk_count = chunks.len(), "chunked document");
                    report.chunks.extend(chunks);
                    report.processed_files.push(path);
                }
                Err(reason) => {
                    warn!(path = %path.display(), reason = %reason, "skipping document");
                    report.skipped_files.push(SkippedFile { path, reason });
                }
            }
        }
        report.ignored_files.extend(discovered.ignored);
    }

    if supported_total == 0 {
        return Err(IngestError::NoSupportedFiles {
            folders: folders.to_vec(),
        });
    }

    Ok(report)
}

fn ingest_file(path: &Path, splitter: &TextSplitter) -> Result<Vec<ChunkRecord>, ExtractError> {
    let text = extract_text_from_file(path)?;
    let source_path = path.to_string_lossy();
    Ok(build_chunk_records(
        &source_path,
        FileKind::from_path(path),
        &text,
        splitter,
    ))
}

#[cfg(test)]
mod tests {
    use super::{discover_documents, ingest_folders};
    use crate::error::{ExtractError, IngestError};
    use crate::extractor::fixtures::{write_docx, write_pdf};
    use crate::models::IngestionOptions;
    use std::collections::BTreeSet;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn discovery_can_be_limited_to_the_top_level() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let base = dir.path();
        let nested = base.join("nested");
        fs::create_dir(&nested)?;
        fs::write(base.join("a.pdf"), b"%PDF-1.4\n%fake")?;
        fs::write(nested.join("b.DOCX"), b"fake")?;
        fs::write(base.join("notes.txt"), b"ignored")?;

        let recursive = discover_documents(base, true);
        assert_eq!(recursive.supported.len(), 2);
        assert_eq!(recursive.ignored, vec![base.join("notes.txt")]);

        let flat = discover_documents(base, false);
        assert_eq!(flat.supported, vec![base.join("a.pdf")]);
        Ok(())
    }

    #[test]
    fn mixed_folder_yields_chunks_only_for_pdf_and_docx() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let pdf = dir.path().join("roadmap.pdf");
        let docx = dir.path().join("courses.docx");
        let txt = dir.path().join("notes.txt");
        write_pdf(&pdf, &["Data engineering roadmap"])?;
        write_docx(&docx, &["Intro to distributed systems", "Advanced SQL"])?;
        fs::write(&txt, "not ingested")?;

        let report = ingest_folders(&[dir.path().to_path_buf()], &IngestionOptions::default())?;

        let sources = report
            .chunks
            .iter()
            .map(|chunk| PathBuf::from(&chunk.source_path))
            .collect::<BTreeSet<_>>();
        assert_eq!(sources, BTreeSet::from([pdf, docx]));
        assert!(report.skipped_files.is_empty());
        assert_eq!(report.ignored_files, vec![txt]);
        Ok(())
    }

    #[test]
    fn folders_are_processed_in_the_given_order() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let resume = dir.path().join("Resume");
        let courses = dir.path().join("Courses");
        fs::create_dir(&resume)?;
        fs::create_dir(&courses)?;
        write_docx(&resume.join("cv.docx"), &["Jane Doe, backend engineer"])?;
        write_docx(&courses.join("list.docx"), &["Rust in Action"])?;

        let report = ingest_folders(&[resume, courses], &IngestionOptions::default())?;

        let contents = report
            .chunks
            .iter()
            .map(|chunk| chunk.content.as_str())
            .collect::<Vec<_>>();
        assert_eq!(contents, vec!["Jane Doe, backend engineer", "Rust in Action"]);
        Ok(())
    }

    #[test]
    fn corrupted_pdf_is_skipped_and_nothing_is_embeddable() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("unreadable.pdf"), b"%PDF-1.4\n%broken")?;

        let report = ingest_folders(&[dir.path().to_path_buf()], &IngestionOptions::default())?;

        assert!(report.chunks.is_empty());
        assert_eq!(report.skipped_files.len(), 1);
        assert!(matches!(
            report.skipped_files[0].reason,
            ExtractError::ReadError { .. }
        ));
        assert!(matches!(
            report.into_embeddable(),
            Err(IngestError::NothingToEmbed { skipped }) if skipped.len() == 1
        ));
        Ok(())
    }

    #[test]
    fn ingestion_fails_without_supported_files() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("readme.md"), "# nothing here")?;
        let missing = dir.path().join("missing");

        let result = ingest_folders(
            &[dir.path().to_path_buf(), missing],
            &IngestionOptions::default(),
        );
        assert!(matches!(result, Err(IngestError::NoSupportedFiles { .. })));
        Ok(())
    }

    #[test]
    fn invalid_options_are_rejected_before_reading() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let options = IngestionOptions {
            chunk_size: 10,
            chunk_overlap: 20,
            recursive: true,
        };

        let result = ingest_folders(&[dir.path().to_path_buf()], &options);
        assert!(matches!(result, Err(IngestError::InvalidChunkConfig(_))));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_documents_are_ingested() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let outside = dir.path().join("outside");
        let resume = dir.path().join("Resume");
        fs::create_dir(&outside)?;
        fs::create_dir(&resume)?;
        write_docx(&outside.join("cv.docx"), &["Backend engineer, five years of Rust"])?;
        let link = resume.join("cv.docx");
        std::os::unix::fs::symlink(outside.join("cv.docx"), &link)?;
        std::os::unix::fs::symlink(outside.join("missing.pdf"), resume.join("broken.pdf"))?;

        let discovered = discover_documents(&resume, true);
        assert_eq!(discovered.supported, vec![link.clone()]);
        assert!(discovered.ignored.is_empty());

        let report = ingest_folders(&[resume], &IngestionOptions::default())?;
        assert_eq!(report.processed_files, vec![link]);
        assert_eq!(report.chunks.len(), 1);
        Ok(())
    }
}
