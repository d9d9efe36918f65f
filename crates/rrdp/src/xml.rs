//! Notification and snapshot document parsing.
//!
//! Both parsers stream over the document with xml-rs and only keep what the
//! fetcher needs. Element names are compared by local name so the RRDP
//! namespace declaration does not matter.

use xml::attribute::OwnedAttribute;
use xml::reader::{EventReader, ParserConfig, XmlEvent};

use crate::error::{Result, RrdpError};

/// The fields of a notification document the fetcher acts on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationXml {
    pub session_id: String,
    pub serial: u64,
    pub snapshot_url: String,
    pub snapshot_hash: String,
}

/// A `<publish>` element of a snapshot, content still base64 encoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishElement {
    pub uri: String,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotXml {
    pub serial: u64,
    /// In document order.
    pub publishes: Vec<PublishElement>,
}

fn reader(bytes: &[u8]) -> EventReader<&[u8]> {
    ParserConfig::new()
        .trim_whitespace(false)
        .ignore_comments(true)
        .create_reader(bytes)
}

fn attribute<'a>(attributes: &'a [OwnedAttribute], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|a| a.name.local_name == name)
        .map(|a| a.value.as_str())
}

fn parse_serial(value: Option<&str>) -> Result<u64> {
    let value = value.unwrap_or_default();
    value
        .trim()
        .parse()
        .map_err(|_| RrdpError::InvalidAttribute {
            attribute: "serial".to_string(),
            value: value.to_string(),
        })
}

fn required(attributes: &[OwnedAttribute], name: &str) -> Result<String> {
    attribute(attributes, name)
        .map(str::to_string)
        .ok_or_else(|| RrdpError::InvalidAttribute {
            attribute: name.to_string(),
            value: String::new(),
        })
}

/// Parse a notification document.
///
/// Exactly one `<snapshot>` element must be present, anywhere below the root.
pub fn parse_notification(bytes: &[u8]) -> Result<NotificationXml> {
    if bytes.is_empty() {
        return Err(RrdpError::NotificationStructure(
            "Empty notification file.".to_string(),
        ));
    }

    let mut root: Option<Vec<OwnedAttribute>> = None;
    let mut snapshots: Vec<Vec<OwnedAttribute>> = Vec::new();

    for event in reader(bytes) {
        if let XmlEvent::StartElement {
            name, attributes, ..
        } = event?
        {
            if root.is_none() {
                root = Some(attributes);
            } else if name.local_name == "snapshot" {
                snapshots.push(attributes);
            }
        }
    }

    let root = root.unwrap_or_default();
    let serial = parse_serial(attribute(&root, "serial"))?;
    let session_id = attribute(&root, "session_id").unwrap_or_default().to_string();

    let snapshot = match snapshots.as_slice() {
        [] => {
            return Err(RrdpError::NotificationStructure(
                "No snapshot tag in the notification file.".to_string(),
            ));
        }
        [snapshot] => snapshot,
        _ => {
            return Err(RrdpError::NotificationStructure(
                "More than one snapshot tag in the notification file.".to_string(),
            ));
        }
    };

    Ok(NotificationXml {
        session_id,
        serial,
        snapshot_url: required(snapshot, "uri")?,
        snapshot_hash: required(snapshot, "hash")?,
    })
}

/// Parse a snapshot document fetched from `url` and check it carries `expected_serial`.
pub fn parse_snapshot(bytes: &[u8], url: &str, expected_serial: u64) -> Result<SnapshotXml> {
    let mut events = reader(bytes);

    let serial = loop {
        match events.next()? {
            XmlEvent::StartElement {
                name, attributes, ..
            } => {
                if name.local_name != "snapshot" {
                    return Err(RrdpError::snapshot(
                        url,
                        "No <snapshot>...</snapshot> root element found",
                    ));
                }
                break parse_serial(attribute(&attributes, "serial"))?;
            }
            XmlEvent::EndDocument => {
                return Err(RrdpError::snapshot(
                    url,
                    "No <snapshot>...</snapshot> root element found",
                ));
            }
            _ => {}
        }
    };

    if serial != expected_serial {
        return Err(RrdpError::snapshot(
            url,
            format!("contained serial={serial}, expected={expected_serial}"),
        ));
    }

    let mut publishes = Vec::new();
    // Depth below the root element; 1 means a direct child.
    let mut depth = 0usize;
    let mut current: Option<PublishElement> = None;

    loop {
        match events.next()? {
            XmlEvent::StartElement {
                name, attributes, ..
            } => {
                depth += 1;
                if depth == 1 && name.local_name == "publish" {
                    current = Some(PublishElement {
                        uri: required(&attributes, "uri")?,
                        content: String::new(),
                    });
                }
            }
            XmlEvent::Characters(text) | XmlEvent::CData(text) | XmlEvent::Whitespace(text) => {
                if let Some(publish) = current.as_mut() {
                    publish.content.push_str(&text);
                }
            }
            XmlEvent::EndElement { .. } => {
                if depth == 0 {
                    break;
                }
                if depth == 1
                    && let Some(publish) = current.take()
                {
                    publishes.push(publish);
                }
                depth -= 1;
            }
            XmlEvent::EndDocument => break,
            _ => {}
        }
    }

    Ok(SnapshotXml { serial, publishes })
}
