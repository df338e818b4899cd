use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use tracing_subscriber::fmt::MakeWriter;

/// Append-mode log file target usable as a tracing `MakeWriter`.
///
/// The parent directory is created up front; if the file cannot be
/// opened at write time the writer falls back to stderr so log lines are
/// never silently dropped.
pub struct FileWriter {
    path: PathBuf,
}

impl FileWriter {
    pub fn new(path: PathBuf) -> Self {
        if let Some(parent) = path.parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                tracing::warn!(parent = ?parent, error = %err, "could not create log directory");
            }
        }
        Self { path }
    }

    fn open(&self) -> io::Result<File> {
        OpenOptions::new().create(true).append(true).open(&self.path)
    }
}

impl<'a> MakeWriter<'a> for FileWriter {
    type Writer = Box<dyn Write + Send + Sync + 'a>;

    fn make_writer(&'a self) -> Self::Writer {
        match self.open() {
            Ok(file) => Box::new(BufWriter::new(file)),
            Err(err) => {
                tracing::error!(path = ?self.path, error = %err, "could not open log file, writing to stderr");
                Box::new(BufWriter::new(io::stderr()))
            }
        }
    }
}
