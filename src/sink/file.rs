// SPDX-License-Identifier: Apache-2.0 OR MIT
// Rolling file sink: buffered writes with size-based rotation

use super::Sink;
use crate::error::Result;
use crate::event::LogEvent;
use crate::format::{FormatSpec, Formatter};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const DEFAULT_BUFFER_CAPACITY: usize = 8192;
const DEFAULT_MAX_BACKUPS: usize = 5;

struct FileState {
    file: Option<File>,
    buffer: String,
    written: u64,
}

/// Appends rendered events to a file, rotating it once it grows past a
/// size limit.
///
/// Rotation renames the current file to `name_backup1.ext` and shifts the
/// existing backups up, dropping the oldest beyond `max_backups`. A
/// `max_file_size` of 0 disables rotation. Appends go through an in-memory
/// buffer; a buffer capacity of 0 writes through on every append.
pub struct RollingFileSink {
    path: PathBuf,
    formatter: Formatter,
    max_file_size: u64,
    max_backups: usize,
    state: Mutex<FileState>,
}

impl RollingFileSink {
    /// Open `path` for appending with the default buffer and format.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_options(path, false, DEFAULT_BUFFER_CAPACITY)
    }

    /// Open `path`, optionally truncating previous content.
    pub fn with_options(
        path: impl Into<PathBuf>,
        truncate: bool,
        buffer_capacity: usize,
    ) -> Result<Self> {
        let path = path.into();
        let file = open_log_file(&path, truncate)?;
        let written = if truncate { 0 } else { file.metadata()?.len() };

        Ok(Self {
            path,
            formatter: Formatter::default(),
            max_file_size: 0,
            max_backups: DEFAULT_MAX_BACKUPS,
            state: Mutex::new(FileState {
                file: Some(file),
                buffer: String::with_capacity(buffer_capacity),
                written,
            }),
        })
    }

    pub fn with_format(mut self, spec: FormatSpec) -> Self {
        self.formatter = Formatter::new(spec);
        self
    }

    /// Rotate once the file reaches `bytes`; 0 disables rotation.
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Keep at most `count` rotated backups; 0 discards rotated files.
    pub fn with_max_backups(mut self, count: usize) -> Self {
        self.max_backups = count;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_direct(&self, state: &mut FileState, bytes: &[u8]) -> Result<()> {
        if state.file.is_none() {
            state.file = Some(open_log_file(&self.path, false)?);
        }
        let file = state.file.as_mut().unwrap();
        file.write_all(bytes)?;
        state.written += bytes.len() as u64;
        self.rotate_if_needed(state)
    }

    fn write_buffer(&self, state: &mut FileState) -> Result<()> {
        if state.buffer.is_empty() {
            return Ok(());
        }
        if state.file.is_none() {
            state.file = Some(open_log_file(&self.path, false)?);
        }
        let file = state.file.as_mut().unwrap();
        file.write_all(state.buffer.as_bytes())?;
        state.written += state.buffer.len() as u64;
        state.buffer.clear();
        self.rotate_if_needed(state)
    }

    fn rotate_if_needed(&self, state: &mut FileState) -> Result<()> {
        if self.max_file_size > 0 && state.written >= self.max_file_size {
            self.rotate(state)?;
        }
        Ok(())
    }

    fn rotate(&self, state: &mut FileState) -> Result<()> {
        if let Some(mut file) = state.file.take() {
            file.flush()?;
        }

        if self.max_backups > 0 {
            // Shift name_backupN up, dropping the oldest
            let oldest = self.backup_path(self.max_backups);
            if oldest.exists() {
                std::fs::remove_file(&oldest)?;
            }
            for index in (2..=self.max_backups).rev() {
                let src = self.backup_path(index - 1);
                if src.exists() {
                    std::fs::rename(&src, self.backup_path(index))?;
                }
            }
            if self.path.exists() {
                std::fs::rename(&self.path, self.backup_path(1))?;
            }
        } else if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }

        state.written = 0;
        state.file = Some(open_log_file(&self.path, true)?);
        Ok(())
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("log");
        let name = match self.path.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{stem}_backup{index}.{ext}"),
            None => format!("{stem}_backup{index}"),
        };
        self.path.with_file_name(name)
    }
}

impl Sink for RollingFileSink {
    fn append(&self, event: &LogEvent) -> Result<()> {
        let mut line = self.formatter.render(event);
        if !line.ends_with('\n') {
            line.push('\n');
        }

        let mut state = self.state.lock().unwrap();
        if state.buffer.capacity() == 0 {
            return self.write_direct(&mut state, line.as_bytes());
        }
        if state.buffer.len() + line.len() > state.buffer.capacity() {
            self.write_buffer(&mut state)?;
        }
        state.buffer.push_str(&line);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        self.write_buffer(&mut state)?;
        if let Some(file) = state.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

impl Drop for RollingFileSink {
    fn drop(&mut self) {
        if let Err(err) = self.flush() {
            eprintln!("ringlog: file sink flush on drop failed: {err}");
        }
    }
}

fn open_log_file(path: &Path, truncate: bool) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut options = OpenOptions::new();
    options.create(true).write(true);
    if truncate {
        options.truncate(true);
    } else {
        options.append(true);
    }
    Ok(options.open(path)?)
}
