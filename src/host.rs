//! Host capabilities the extension components rely on.
//!
//! Each capability is a trait so the components can run against the real
//! environment (file system, terminal, system clock) or against fakes.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use colored::Colorize;

use crate::error::Result;

/// Wall clock in unix milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_millis: u64) -> Self {
        Self {
            now: AtomicU64::new(start_millis),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// User-facing feedback surface.
pub trait Notifier: Send + Sync {
    /// Transient message that disappears after `duration`.
    fn notify(&self, message: &str, duration: Duration);

    /// Blocking alert, used from detached work that has no response path.
    fn alert(&self, message: &str);
}

/// Prints notifications to stderr, leaving stdout for command output.
#[derive(Debug, Default)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, message: &str, _duration: Duration) {
        eprintln!("{} {}", "●".cyan(), message);
    }

    fn alert(&self, message: &str) {
        eprintln!("{} {}", "✗".red(), message.bold());
    }
}

pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str) -> Result<()>;
}

/// "Clipboard" for terminal use: the text goes to stdout so it can be piped.
#[derive(Debug, Default)]
pub struct StdoutClipboard;

impl Clipboard for StdoutClipboard {
    fn write_text(&self, text: &str) -> Result<()> {
        println!("{}", text);
        Ok(())
    }
}

/// Saves generated text as a downloaded file.
#[async_trait]
pub trait TextSaver: Send + Sync {
    /// Resolves once the file is fully written.
    async fn save_text(&self, filename: &str, contents: &str) -> Result<PathBuf>;
}

/// Writes files straight into the download directory.
#[derive(Debug, Clone)]
pub struct DownloadsDirSaver {
    dir: PathBuf,
}

impl DownloadsDirSaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl TextSaver for DownloadsDirSaver {
    async fn save_text(&self, filename: &str, contents: &str) -> Result<PathBuf> {
        let path = unique_path(&self.dir.join(filename));
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, contents.as_bytes()).await?;
        tracing::debug!("Saved {} bytes to {}", contents.len(), path.display());
        Ok(path)
    }
}

/// First free variant of `path`: `name.ext`, `name (1).ext`, `name (2).ext`, ...
pub fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = path.extension().map(|e| e.to_string_lossy().to_string());
    let parent = path.parent().unwrap_or_else(|| Path::new(""));

    (1u32..)
        .map(|n| {
            let name = match &ext {
                Some(ext) => format!("{} ({}).{}", stem, n, ext),
                None => format!("{} ({})", stem, n),
            };
            parent.join(name)
        })
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}
