#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rsyncit_core::{AppConfig, Config};
use sha2::{Digest, Sha256};
use std::net::TcpListener;

pub const SESSION_ID: &str = "1c33ba5d-4e16-448d-9a22-b12599ef1cba";

pub const ROA_URI: &str = "rsync://rsync.paas.rpki.ripe.net/repository/de7d55f7-ee60-4005-bad7-b42818cf50e8/3/326131323a646434373a333830303a3a2f34302d3430203d3e20313939353138.roa";

/// A production ROA signed at 2023-04-11T04:42:30Z.
pub const ROA: &[u8] = include_bytes!("../fixtures/ripe.roa");

/// The EE certificate embedded in [`ROA`], notBefore 2023-04-11T04:37:30Z.
pub const EE_CERTIFICATE: &[u8] = include_bytes!("../fixtures/ripe-ee.cer");

pub fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

/// Compute SHA-256 hash of data as hex string
pub fn sha256_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    result.iter().map(|b| format!("{:02x}", b)).collect()
}

pub fn notification_xml(serial: u64, snapshot_url: &str, snapshot_hash: &str) -> String {
    format!(
        r#"<notification xmlns="http://www.ripe.net/rpki/rrdp" version="1" session_id="{SESSION_ID}" serial="{serial}">
  <snapshot uri="{snapshot_url}" hash="{snapshot_hash}"/>
  <delta serial="{serial}" uri="https://rrdp.example.net/delta.xml" hash="770c21936e8129499d4f08698b0f08eadf3610a6624004a179e216d568ac04f5"/>
</notification>"#
    )
}

pub fn snapshot_xml(serial: u64, objects: &[(&str, &[u8])]) -> String {
    let mut xml = format!(
        r#"<snapshot xmlns="http://www.ripe.net/rpki/rrdp" version="1" session_id="{SESSION_ID}" serial="{serial}">"#
    );
    for (uri, content) in objects {
        xml.push_str(&format!(
            "\n  <publish uri=\"{uri}\">\n    {}\n  </publish>",
            STANDARD.encode(content)
        ));
    }
    xml.push_str("\n</snapshot>\n");
    xml
}

pub fn test_config(notification_url: &str) -> Config {
    AppConfig::for_testing(notification_url, "/nonexistent/rsync")
        .cycle_config()
        .unwrap()
}
