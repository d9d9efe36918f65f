#![allow(dead_code)]

use bytes::Bytes;
use rsyncit_core::{AppConfig, RpkiObject};
use rsyncit_publish::RsyncWriter;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use time::OffsetDateTime;
use time::macros::datetime;

pub const T0: OffsetDateTime = datetime!(2023-04-17 12:00:00 UTC);

/// Generate deterministic test data using a seeded pseudo-random generator
pub fn seeded_bytes(seed: u64, len: usize) -> Bytes {
    let mut data = vec![0u8; len];
    let mut state = seed;

    for chunk in data.chunks_mut(8) {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let bytes = state.to_le_bytes();
        for (i, byte) in chunk.iter_mut().enumerate() {
            *byte = bytes[i % 8];
        }
    }

    Bytes::from(data)
}

pub fn object(url: &str, seed: u64, modified: OffsetDateTime) -> RpkiObject {
    RpkiObject::new(url, seeded_bytes(seed, 256 + seed as usize), modified)
}

pub fn writer(base: &Path, retention_period_ms: i64, retention_copies_count: usize) -> RsyncWriter {
    let mut config = AppConfig::for_testing("https://rrdp.example.net/notification.xml", base)
        .cycle_config()
        .unwrap();
    config.retention_period = time::Duration::milliseconds(retention_period_ms);
    config.retention_copies_count = retention_copies_count;
    RsyncWriter::new(config).unwrap()
}

pub fn modified(path: &Path) -> SystemTime {
    fs::metadata(path).unwrap().modified().unwrap()
}

pub fn mode(path: &Path) -> u32 {
    fs::metadata(path).unwrap().permissions().mode() & 0o777
}

pub fn set_modified(path: &Path, to: OffsetDateTime) {
    fs::File::open(path)
        .unwrap()
        .set_modified(SystemTime::from(to))
        .unwrap();
}

/// Every directory strictly below `root`, depth first.
pub fn subdirectories(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                found.push(path.clone());
                pending.push(path);
            }
        }
    }
    found
}

pub fn entry_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
