//! Resumable download of a layer catalog into a single archive file.
//!
//! The archive is the concatenation of every layer blob in catalog order. The
//! only resume state is the archive's size on disk: at every step the next
//! layer and the offset inside it are recomputed from the byte count with
//! [`LayerCatalog::locate`], so a partial file left by a crash or a failed
//! request is picked up exactly where it stopped.

use crate::config::DownloadConfig;
use crate::download::events::EventChannel;
use crate::error::handlers::NetworkErrorHandler;
use crate::error::{RegistryError, Result};
use crate::image::{LayerCatalog, LayerPosition};
use crate::registry::BlobOperations;
use futures_util::StreamExt;
use reqwest::StatusCode;
use std::fmt;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Every layer is on disk
    Completed,
    /// Another `start` on this session is still running; nothing was done
    AlreadyDownloading,
}

pub struct DownloadSession {
    catalog: LayerCatalog,
    directory: PathBuf,
    blobs: BlobOperations,
    token: Option<String>,
    config: DownloadConfig,
    total: u64,
    downloaded: AtomicU64,
    downloading: AtomicBool,
    bytes_per_sec: AtomicU64,
    cancel: CancellationToken,
    started: EventChannel<DownloadSession>,
    updated: EventChannel<DownloadSession>,
    completed: EventChannel<DownloadSession>,
}

/// Clears the downloading flag however `start` returns
struct DownloadingFlag<'a>(&'a AtomicBool);

impl Drop for DownloadingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl DownloadSession {
    pub fn new(
        catalog: LayerCatalog,
        directory: impl Into<PathBuf>,
        blobs: BlobOperations,
        token: Option<String>,
        config: DownloadConfig,
    ) -> Self {
        let total = catalog.total_size();
        Self {
            catalog,
            directory: directory.into(),
            blobs,
            token,
            config,
            total,
            downloaded: AtomicU64::new(0),
            downloading: AtomicBool::new(false),
            bytes_per_sec: AtomicU64::new(0),
            cancel: CancellationToken::new(),
            started: EventChannel::new("Download Started"),
            updated: EventChannel::new("Download Updated"),
            completed: EventChannel::new("Download Completed"),
        }
    }

    /// Stop the transfer when `cancel` fires, including while a request is pending
    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Emitted once the output file is open and the transfer begins
    pub fn started(&self) -> &EventChannel<DownloadSession> {
        &self.started
    }

    /// Emitted after each layer (or layer remainder) is written
    pub fn updated(&self) -> &EventChannel<DownloadSession> {
        &self.updated
    }

    /// Emitted when every layer is on disk
    pub fn completed(&self) -> &EventChannel<DownloadSession> {
        &self.completed
    }

    pub fn catalog(&self) -> &LayerCatalog {
        &self.catalog
    }

    /// Fraction of the archive downloaded, between 0 and 1
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.downloaded() as f64 / self.total as f64
    }

    pub fn downloaded(&self) -> u64 {
        self.downloaded.load(Ordering::SeqCst)
    }

    /// Sum of the layer sizes declared in the manifest
    pub fn total_size(&self) -> u64 {
        self.total
    }

    /// Bytes currently in the output file, 0 when it does not exist
    pub fn current_size(&self) -> u64 {
        std::fs::metadata(self.file_path())
            .map(|metadata| metadata.len())
            .unwrap_or(0)
    }

    pub fn file_name(&self) -> String {
        self.catalog.file_name()
    }

    pub fn download_path(&self) -> &Path {
        &self.directory
    }

    pub fn file_path(&self) -> PathBuf {
        self.directory.join(self.file_name())
    }

    /// Throughput of the last finished layer request, in bytes per second
    pub fn speed(&self) -> u64 {
        self.bytes_per_sec.load(Ordering::SeqCst)
    }

    /// Remaining bytes at the last measured speed; `None` before any measurement
    pub fn estimated_time_remaining(&self) -> Option<Duration> {
        let speed = self.speed();
        if speed == 0 {
            return None;
        }
        let remaining = self.total.saturating_sub(self.downloaded());
        Some(Duration::from_secs_f64(remaining as f64 / speed as f64))
    }

    pub fn is_downloading(&self) -> bool {
        self.downloading.load(Ordering::SeqCst)
    }

    pub fn exists(&self) -> bool {
        self.file_path().exists()
    }

    /// Download every missing byte of the archive.
    ///
    /// With `resume` the existing output file is kept and the transfer
    /// continues after its last byte; without it the file is deleted first.
    /// A call made while another `start` on this session is running returns
    /// [`StartOutcome::AlreadyDownloading`] without touching anything.
    ///
    /// On error the bytes written so far stay on disk and a later
    /// `start(true)` continues from there.
    pub async fn start(&self, resume: bool) -> Result<StartOutcome> {
        if self
            .downloading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(file = %self.file_name(), "download already running, start ignored");
            return Ok(StartOutcome::AlreadyDownloading);
        }
        let flag = DownloadingFlag(&self.downloading);

        self.downloaded.store(0, Ordering::SeqCst);
        let path = self.file_path();

        if !resume && fs::try_exists(&path).await? {
            debug!(path = %path.display(), "removing previous download");
            fs::remove_file(&path).await?;
        }

        let mut on_disk = match fs::metadata(&path).await {
            Ok(metadata) => metadata.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };
        if on_disk > self.total {
            warn!(
                path = %path.display(),
                on_disk,
                total = self.total,
                "existing file is larger than the image, starting over"
            );
            fs::remove_file(&path).await?;
            on_disk = 0;
        }
        self.downloaded.store(on_disk, Ordering::SeqCst);

        fs::create_dir_all(&self.directory).await?;
        let file = if on_disk > 0 {
            info!(path = %path.display(), resume_from = on_disk, total = self.total, "resuming download");
            OpenOptions::new().append(true).open(&path).await?
        } else {
            info!(path = %path.display(), total = self.total, "starting download");
            File::create(&path).await?
        };
        let mut file = BufWriter::new(file);

        self.started.emit(self);

        let transferred = self.transfer(&mut file).await;
        let flushed = file.flush().await;
        drop(file);
        transferred?;
        flushed?;

        drop(flag);
        info!(path = %path.display(), bytes = self.downloaded(), "download completed");
        self.completed.emit(self);
        Ok(StartOutcome::Completed)
    }

    async fn transfer(&self, file: &mut BufWriter<File>) -> Result<()> {
        while self.downloaded() < self.total {
            let Some(position) = self.catalog.locate(self.downloaded()) else {
                break;
            };
            self.check_cancelled()?;
            self.download_layer(file, position).await?;
        }
        Ok(())
    }

    async fn download_layer(
        &self,
        file: &mut BufWriter<File>,
        position: LayerPosition<'_>,
    ) -> Result<()> {
        let layer = position.layer;
        let chunk_size = self.config.chunk_size.max(1);
        debug!(
            index = position.index,
            digest = %layer.digest,
            offset = position.offset,
            size = layer.size,
            "downloading layer"
        );

        let started = Instant::now();
        let response = self
            .until_cancelled(self.blobs.fetch_range(layer, position.offset, self.token.as_deref()))
            .await??;

        // A 200 carries the whole blob; drop what is already on disk.
        let mut skip = if response.status() == StatusCode::PARTIAL_CONTENT {
            0
        } else {
            position.offset
        };
        if skip > 0 {
            debug!(digest = %layer.digest, skip, "registry ignored range request");
        }

        let mut remaining = position.remaining();
        let mut stream = response.bytes_stream();
        while let Some(item) = self.until_cancelled(stream.next()).await? {
            let bytes = item.map_err(|e| NetworkErrorHandler::handle_network_error(&e, "blob stream"))?;
            let mut data: &[u8] = &bytes;
            if skip > 0 {
                let n = skip.min(data.len() as u64) as usize;
                data = &data[n..];
                skip -= n as u64;
            }

            for chunk in data.chunks(chunk_size) {
                self.check_cancelled()?;
                let take = remaining.min(chunk.len() as u64) as usize;
                if take == 0 {
                    break;
                }
                file.write_all(&chunk[..take]).await?;
                self.downloaded.fetch_add(take as u64, Ordering::SeqCst);
                remaining -= take as u64;
            }
            if remaining == 0 {
                break;
            }
        }

        if remaining > 0 {
            return Err(RegistryError::Transport(format!(
                "Blob {} ended early: {} of {} bytes missing",
                layer.digest, remaining, layer.size
            )));
        }

        let fetched = position.remaining();
        let elapsed = started.elapsed().as_secs_f64();
        let speed = if elapsed > 0.0 {
            (fetched as f64 / elapsed).round() as u64
        } else {
            fetched
        };
        self.bytes_per_sec.store(speed, Ordering::SeqCst);
        debug!(digest = %layer.digest, bytes = fetched, speed, "layer finished");

        self.updated.emit(self);
        Ok(())
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(self.cancelled());
        }
        Ok(())
    }

    /// Await `future` unless the cancel token fires first
    async fn until_cancelled<F: Future>(&self, future: F) -> Result<F::Output> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(self.cancelled()),
            output = future => Ok(output),
        }
    }

    fn cancelled(&self) -> RegistryError {
        RegistryError::Cancelled {
            downloaded: self.downloaded(),
        }
    }
}

impl fmt::Debug for DownloadSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadSession")
            .field("file", &self.file_path())
            .field("downloaded", &self.downloaded())
            .field("total", &self.total)
            .field("downloading", &self.is_downloading())
            .field("speed", &self.speed())
            .finish()
    }
}
