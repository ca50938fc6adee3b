use autopost_core::LoggingConfig;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,autopost=info,pipeline=info,product_source=info,llm_interface=info,\
                              cms_publisher=info,notifier=info,content_engine=info,autopost_core=info";

fn generation(path: &Path, n: u32) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(".{}", n));
    PathBuf::from(name)
}

/// Shift `run.log` to `run.log.1` (and older generations up to `keep`) when
/// it has grown past `max_bytes`. Returns whether a rotation happened.
pub fn rotate(path: &Path, max_bytes: u64, keep: u32) -> io::Result<bool> {
    let size = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if size <= max_bytes {
        return Ok(false);
    }
    if keep == 0 {
        fs::remove_file(path)?;
        return Ok(true);
    }

    let oldest = generation(path, keep);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for n in (1..keep).rev() {
        let from = generation(path, n);
        if from.exists() {
            fs::rename(&from, generation(path, n + 1))?;
        }
    }
    fs::rename(path, generation(path, 1))?;
    Ok(true)
}

/// Create the parent directory if needed and open the log for appending.
fn open_run_log(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| io::Error::new(e.kind(), format!("creating {}: {}", parent.display(), e)))?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Console output plus an append-only, non-ANSI copy in the run log. The file
/// layer is dropped, with a warning, when the log cannot be opened.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let rotated = rotate(&config.file, config.max_bytes, config.keep);
    let (file_layer, file_error) = match open_run_log(&config.file) {
        Ok(file) => {
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(Mutex::new(file));
            (Some(layer), None)
        }
        Err(e) => (None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(file_layer)
        .init();

    match rotated {
        Err(e) => tracing::warn!(path = %config.file.display(), error = %e, "Log rotation failed"),
        Ok(true) => tracing::info!(path = %config.file.display(), keep = config.keep, "Rotated run log"),
        Ok(false) => {}
    }
    if let Some(e) = file_error {
        tracing::warn!(path = %config.file.display(), error = %e, "Run log unavailable, logging to console only");
    }
}
