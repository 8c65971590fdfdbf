//! Archiving rendered reports into a directory.
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::NaiveDate;
use rand::distr::Alphanumeric;
use rand::Rng;
use tokio::fs;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::report::Artifact;
use crate::traits::Archive;
use crate::traits::ArchivedReport;
use crate::types::InventoryError;
use crate::types::Result;

const SUFFIX_LEN: usize = 8;
const MAX_ATTEMPTS: usize = 5;

/// `<prefix>_<DD>-<MM>-<YYYY>.<ext>`
pub fn archive_filename(prefix: &str, date: NaiveDate, extension: &str) -> String {
    format!("{prefix}_{}.{extension}", date.format("%d-%m-%Y"))
}

/// Human-friendly form of an archive file name: `Productos_16-10-2026-x1Y2z3W4.html` becomes `Productos 16/10/2026`.
/// Names that don't follow the archive pattern are returned as is.
pub fn display_filename(filename: &str) -> String {
    let stem = filename.rsplit('/').next().unwrap_or(filename);
    let stem = stem.split_once('.').map_or(stem, |(s, _)| s);

    if let Some((prefix, rest)) = stem.rsplit_once('_') {
        // A disambiguating suffix may follow the date.
        let date_part = rest.get(..10).unwrap_or(rest);
        if let Ok(date) = NaiveDate::parse_from_str(date_part, "%d-%m-%Y") {
            return format!("{prefix} {}", date.format("%d/%m/%Y"));
        }
    }

    filename.to_string()
}

fn random_suffix() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(SUFFIX_LEN)
        .map(char::from)
        .collect()
}

/// Write into a freshly created file. On failure the file is removed again so that a truncated report never
/// occupies an archive name.
async fn fill_or_remove<W: AsyncWrite + Unpin>(path: &Path, mut file: W, bytes: &[u8]) -> Result<()> {
    let written = match file.write_all(bytes).await {
        Ok(()) => file.flush().await,
        Err(err) => Err(err),
    };

    if let Err(err) = written {
        drop(file);
        if let Err(rm_err) = fs::remove_file(path).await {
            warn!("Could not remove incomplete archive file {}: {rm_err}", path.display());
        }
        return Err(err.into());
    }

    Ok(())
}

fn with_suffix(filename: &str, suffix: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}-{suffix}.{ext}"),
        None => format!("{filename}-{suffix}"),
    }
}

/// Keeps reports as files in a directory. An existing file is never overwritten: on a name collision a random
/// suffix is appended.
#[derive(Debug, Clone)]
pub struct DirArchive {
    root: PathBuf,
}

impl DirArchive {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

#[async_trait]
impl Archive for DirArchive {
    async fn store(&self, filename: &str, artifact: &Artifact) -> Result<ArchivedReport> {
        if filename.is_empty() || filename.contains(['/', '\\']) {
            return Err(InventoryError::Archive(format!("invalid archive file name {filename:?}")));
        }

        fs::create_dir_all(&self.root).await?;

        let mut name = filename.to_string();
        for _ in 0..MAX_ATTEMPTS {
            let path = self.root.join(&name);
            match fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => {
                    fill_or_remove(&path, file, &artifact.bytes).await?;
                    info!("Report archived at {}", path.display());
                    return Ok(ArchivedReport {
                        location: path.display().to_string(),
                        filename: name,
                        size:     artifact.len(),
                    });
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    debug!("{} already exists, picking another name", path.display());
                    name = with_suffix(filename, &random_suffix());
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(InventoryError::Archive(format!(
            "could not find a free name for {filename} after {MAX_ATTEMPTS} attempts"
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::pin::Pin;
    use std::task::Context;
    use std::task::Poll;

    use super::*;

    struct BrokenWriter;

    impl AsyncWrite for BrokenWriter {
        fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, _buf: &[u8]) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::other("no space left on device")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn failed_write_leaves_no_file_behind() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("Productos_01-01-2026.txt");
        fs::write(&path, b"").await.unwrap();

        let err = fill_or_remove(&path, BrokenWriter, b"report").await.unwrap_err();
        assert!(matches!(err, InventoryError::Io(_)));
        assert!(!path.exists(), "the dated name is free for the next attempt");
    }

    #[tokio::test]
    async fn successful_write_keeps_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("Productos_01-01-2026.txt");
        let file = fs::File::create(&path).await.unwrap();

        fill_or_remove(&path, file, b"report").await.unwrap();
        assert_eq!(fs::read(&path).await.unwrap(), b"report");
    }

    #[test]
    fn filename_is_date_stamped() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert_eq!(archive_filename("Productos", date, "html"), "Productos_07-03-2026.html");
    }

    #[test]
    fn display_name_from_archive_name() {
        assert_eq!(display_filename("Productos_16-10-2026.pdf"), "Productos 16/10/2026");
        assert_eq!(display_filename("archive/Productos_16-10-2026-Ab12Cd34.html"), "Productos 16/10/2026");
        assert_eq!(display_filename("notes.txt"), "notes.txt");
        assert_eq!(display_filename("Productos_99-99-2026.txt"), "Productos_99-99-2026.txt");
    }

    #[test]
    fn suffix_goes_before_extension() {
        assert_eq!(with_suffix("a_01-01-2026.txt", "XyZ"), "a_01-01-2026-XyZ.txt");
        assert_eq!(with_suffix("plain", "XyZ"), "plain-XyZ");
    }
}
