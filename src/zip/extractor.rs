use std::path::Path;
use std::sync::Arc;

use tokio::fs;
use tokio::io::AsyncWrite;
use tracing::debug;

use crate::config::ReaderOptions;
use crate::error::Result;
use crate::io::ReadAt;

use super::directory::ZipReader;
use super::entry::Entry;

/// Writes entry contents to files or arbitrary writers.
///
/// Content is streamed chunk by chunk, so memory use stays at one chunk
/// regardless of entry size.
pub struct ZipExtractor<R: ReadAt> {
    zip: ZipReader<R>,
}

impl<R: ReadAt> ZipExtractor<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self::with_options(reader, ReaderOptions::default())
    }

    pub fn with_options(reader: Arc<R>, options: ReaderOptions) -> Self {
        Self {
            zip: ZipReader::with_options(reader, options),
        }
    }

    pub fn zip(&self) -> &ZipReader<R> {
        &self.zip
    }

    /// List all entries in the archive
    pub async fn list_files(&self) -> Result<Vec<Entry<R>>> {
        self.zip.list().await
    }

    /// Stream an entry into `writer`, returning the bytes written.
    pub async fn extract_to_writer<W: AsyncWrite + Unpin>(
        &self,
        entry: &Entry<R>,
        writer: &mut W,
    ) -> Result<u64> {
        entry.content().await?.copy_to(writer).await
    }

    /// Extract an entry to `output_path`, creating parent directories.
    ///
    /// Directory entries only create the directory.
    pub async fn extract_to_file(&self, entry: &Entry<R>, output_path: &Path) -> Result<u64> {
        if entry.is_directory() {
            fs::create_dir_all(output_path).await?;
            return Ok(0);
        }

        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut file = fs::File::create(output_path).await?;
        let written = self.extract_to_writer(entry, &mut file).await?;
        debug!(path = %output_path.display(), written, "extracted entry");
        Ok(written)
    }

    /// Extract an entry to stdout
    pub async fn extract_to_stdout(&self, entry: &Entry<R>) -> Result<u64> {
        let mut stdout = tokio::io::stdout();
        self.extract_to_writer(entry, &mut stdout).await
    }
}
