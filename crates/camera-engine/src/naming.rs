//! Output file naming.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

/// Sortable, second-resolution timestamp used in file names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Prefix for still captures.
pub const STILL_PREFIX: &str = "capture";

/// Prefix for video recordings.
pub const VIDEO_PREFIX: &str = "video";

/// Format a timestamp for use in a file name.
pub fn timestamp(at: &NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Current local time, for naming.
pub fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Create the output directory if it does not exist yet.
pub fn ensure_output_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

/// `<dir>/<prefix>_<timestamp>.<ext>`, with a `_N` suffix if that file exists.
pub fn unique_path(dir: &Path, prefix: &str, at: &NaiveDateTime, ext: &str) -> PathBuf {
    let stem = format!("{}_{}", prefix, timestamp(at));
    let candidate = dir.join(format!("{stem}.{ext}"));
    if !candidate.exists() {
        return candidate;
    }

    let mut n = 1u32;
    loop {
        let candidate = dir.join(format!("{stem}_{n}.{ext}"));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}
