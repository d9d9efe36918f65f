#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};

use crate::common::mocks::StubDownloader;

pub const SESSION_ID: &str = "9df4b597-af9e-4dca-bdda-719cce2c4e28";
pub const NOTIFICATION_URL: &str = "https://rrdp.example.net/notification.xml";

/// Compute SHA-256 hash of data as hex string
pub fn sha256_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    result.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Generate deterministic test data using a seeded pseudo-random generator
pub fn seeded_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    let mut state = seed;

    for chunk in data.chunks_mut(8) {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let bytes = state.to_le_bytes();
        for (i, byte) in chunk.iter_mut().enumerate() {
            *byte = bytes[i % 8];
        }
    }

    data
}

pub fn snapshot_url(serial: u64) -> String {
    format!("https://rrdp.example.net/{serial}/snapshot.xml")
}

pub fn notification_xml(serial: u64, snapshot_url: &str, snapshot_hash: &str) -> String {
    format!(
        r#"<notification xmlns="http://www.ripe.net/rpki/rrdp" version="1" session_id="{SESSION_ID}" serial="{serial}">
  <snapshot uri="{snapshot_url}" hash="{snapshot_hash}"/>
</notification>"#
    )
}

pub fn snapshot_xml(serial: u64, objects: &[(String, Vec<u8>)]) -> String {
    let mut xml = format!(
        r#"<snapshot xmlns="http://www.ripe.net/rpki/rrdp" version="1" session_id="{SESSION_ID}" serial="{serial}">"#
    );
    for (uri, content) in objects {
        xml.push_str(&format!(
            "\n  <publish uri=\"{uri}\">{}</publish>",
            STANDARD.encode(content)
        ));
    }
    xml.push_str("\n</snapshot>\n");
    xml
}

/// `count` objects below `rsync://example.net/repo/`.
pub fn repository_objects(count: usize) -> Vec<(String, Vec<u8>)> {
    (0..count)
        .map(|i| {
            (
                format!("rsync://example.net/repo/ca/object-{i}.txt"),
                seeded_bytes(i as u64, 64 + i),
            )
        })
        .collect()
}

/// Serve a notification at [`NOTIFICATION_URL`] and its matching snapshot.
pub fn serve_repository(stub: &StubDownloader, serial: u64, objects: &[(String, Vec<u8>)]) {
    let snapshot = snapshot_xml(serial, objects);
    let url = snapshot_url(serial);
    stub.serve(
        NOTIFICATION_URL,
        notification_xml(serial, &url, &sha256_hash(snapshot.as_bytes())),
    );
    stub.serve(&url, snapshot);
}

pub fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}
