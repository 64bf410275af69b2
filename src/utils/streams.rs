//! Output sinks for a backup run
//!
//! Each run owns two sinks: the append-only tool log (stderr) and the data
//! sink (stdout), which either discards output or writes a possibly
//! compressed archive. Sinks are closed by value, so a sink can only be
//! closed once; a sink dropped without being closed is finished on a
//! best-effort basis.

use crate::config::{CompressionConfig, CompressionMethod, ConfigError};
use crate::error::{BackupError, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use tracing::{error, warn};

/// File name of the tool log inside the target directory
pub const LOG_FILE_NAME: &str = "xtrabackup.log";

/// How backup data is packaged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMethod {
    /// The tool writes files into the target directory itself
    None,
    Tar,
    Xbstream,
}

impl StreamMethod {
    /// Value for the tool's `--stream=` flag
    pub fn as_arg(&self) -> Option<&'static str> {
        match self {
            StreamMethod::None => None,
            StreamMethod::Tar => Some("tar"),
            StreamMethod::Xbstream => Some("xbstream"),
        }
    }

    pub fn archive_name(&self) -> Option<&'static str> {
        match self {
            StreamMethod::None => None,
            StreamMethod::Tar => Some("backup.tar"),
            StreamMethod::Xbstream => Some("backup.xb"),
        }
    }

    pub fn is_streaming(&self) -> bool {
        *self != StreamMethod::None
    }
}

impl FromStr for StreamMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tar" | "yes" | "true" | "1" => Ok(StreamMethod::Tar),
            "xbstream" => Ok(StreamMethod::Xbstream),
            "none" | "no" | "false" | "0" => Ok(StreamMethod::None),
            _ => Err(ConfigError::UnknownStreamMethod(s.to_string())),
        }
    }
}

/// File extension appended to the archive for a compression method
pub fn compression_extension(method: CompressionMethod) -> &'static str {
    match method {
        CompressionMethod::None => "",
        CompressionMethod::Gzip => ".gz",
        CompressionMethod::Bzip2 => ".bz2",
        CompressionMethod::Zstd => ".zst",
    }
}

/// Writer that must be explicitly finished to flush trailing data
pub trait SinkWriter: Write {
    fn finish(self: Box<Self>) -> io::Result<()>;
}

impl SinkWriter for File {
    fn finish(mut self: Box<Self>) -> io::Result<()> {
        self.flush()?;
        self.sync_all()
    }
}

impl SinkWriter for io::Sink {
    fn finish(self: Box<Self>) -> io::Result<()> {
        Ok(())
    }
}

impl SinkWriter for flate2::write::GzEncoder<File> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        flate2::write::GzEncoder::finish(*self)?.sync_all()
    }
}

impl SinkWriter for bzip2::write::BzEncoder<File> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        bzip2::write::BzEncoder::finish(*self)?.sync_all()
    }
}

impl SinkWriter for zstd::stream::write::Encoder<'static, File> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        zstd::stream::write::Encoder::finish(*self)?.sync_all()
    }
}

/// Destination of the tool's standard output
pub struct OutputSink {
    description: String,
    path: Option<PathBuf>,
    writer: Option<Box<dyn SinkWriter>>,
    discard: bool,
}

impl OutputSink {
    /// A sink that throws everything away
    pub fn discard() -> Self {
        Self {
            description: "/dev/null".to_string(),
            path: None,
            writer: Some(Box::new(io::sink())),
            discard: true,
        }
    }

    /// Wrap an arbitrary writer
    pub fn from_writer(
        description: impl Into<String>,
        path: Option<PathBuf>,
        writer: Box<dyn SinkWriter>,
    ) -> Self {
        Self {
            description: description.into(),
            path,
            writer: Some(writer),
            discard: false,
        }
    }

    /// True when the tool's output should not be read at all
    pub fn is_discard(&self) -> bool {
        self.discard
    }

    /// Archive path, when the sink writes to a file
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Finish and release the sink
    pub fn close(mut self) -> Result<()> {
        match self.writer.take() {
            Some(writer) => writer
                .finish()
                .map_err(|e| BackupError::io(format!("Error when closing {}", self.description), e)),
            None => Ok(()),
        }
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.writer.as_mut() {
            Some(writer) => writer.write(buf),
            None => Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink is closed")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for OutputSink {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finish() {
                warn!("Error when closing {}: {}", self.description, e);
            }
        }
    }
}

/// Append-only log receiving the tool's standard error
pub struct LogSink {
    path: PathBuf,
    file: Option<File>,
}

impl LogSink {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A handle to the log suitable for a child's stderr
    pub fn stdio(&self) -> Result<Stdio> {
        let file = self.file.as_ref().ok_or_else(|| {
            BackupError::io(
                format!("Log {} is closed", self.path.display()),
                io::Error::new(io::ErrorKind::BrokenPipe, "log sink is closed"),
            )
        })?;
        let handle = file
            .try_clone()
            .map_err(|e| BackupError::io(format!("Failed to duplicate {}", self.path.display()), e))?;
        Ok(Stdio::from(handle))
    }

    pub fn close(mut self) -> Result<()> {
        match self.file.take() {
            Some(mut file) => file
                .flush()
                .and_then(|_| file.sync_all())
                .map_err(|e| BackupError::io(format!("Error when closing {}", self.path.display()), e)),
            None => Ok(()),
        }
    }
}

impl Drop for LogSink {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(e) = file.sync_all() {
                warn!("Error when closing {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Open the tool log in append mode
pub fn open_log_sink(target_directory: &Path) -> Result<LogSink> {
    let path = target_directory.join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| BackupError::io(format!("Failed to open {}", path.display()), e))?;

    Ok(LogSink {
        path,
        file: Some(file),
    })
}

/// Open the data sink for a stream method
pub fn open_data_sink(
    target_directory: &Path,
    stream: StreamMethod,
    compression: &CompressionConfig,
) -> Result<OutputSink> {
    let archive_name = match stream.archive_name() {
        Some(name) => name,
        None => return Ok(OutputSink::discard()),
    };

    let path = target_directory.join(format!(
        "{}{}",
        archive_name,
        compression_extension(compression.method)
    ));
    let to_error = |e| BackupError::io(format!("Unable to create output file {}", path.display()), e);

    let file = File::create(&path).map_err(to_error)?;
    let level = compression.level;

    let writer: Box<dyn SinkWriter> = match compression.method {
        CompressionMethod::None => Box::new(file),
        CompressionMethod::Gzip => Box::new(flate2::write::GzEncoder::new(
            file,
            flate2::Compression::new(level),
        )),
        CompressionMethod::Bzip2 => Box::new(bzip2::write::BzEncoder::new(
            file,
            bzip2::Compression::new(level.clamp(1, 9)),
        )),
        CompressionMethod::Zstd => Box::new(
            zstd::stream::write::Encoder::new(file, level as i32).map_err(to_error)?,
        ),
    };

    Ok(OutputSink::from_writer(
        path.display().to_string(),
        Some(path.clone()),
        writer,
    ))
}

/// Combine the result of a primary operation with the release of a resource
///
/// A release failure becomes the error only when the primary operation
/// succeeded; otherwise it is logged and the primary error is returned.
pub fn settle<T>(primary: Result<T>, release: Result<()>, what: &str) -> Result<T> {
    match (primary, release) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(release_err)) => Err(release_err),
        (Err(primary_err), Ok(())) => Err(primary_err),
        (Err(primary_err), Err(release_err)) => {
            error!("Error when closing {}: {}", what, release_err);
            Err(primary_err)
        }
    }
}
