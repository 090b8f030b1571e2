//! ILCD archive reader, flows only.
//!
//! An ILCD zip holds one folder per dataset type (`ILCD/flows/<uuid>.xml`,
//! `ILCD/processes/...`). Only flow datasets are read for now; the other
//! folders are skipped.

use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use zip::ZipArchive;

use crate::error::IlcdError;

/// Folder read order within an archive.
const FOLDER_ORDER: [&str; 7] = [
    "contacts",
    "sources",
    "unitgroups",
    "flowproperties",
    "flows",
    "processes",
    "external_docs",
];

const IGNORED_FOLDERS: [&str; 6] = [
    "contacts",
    "sources",
    "unitgroups",
    "flowproperties",
    "external_docs",
    "processes",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IlcdFlow {
    /// Path inside the archive.
    pub file: String,
    pub basename: String,
    pub uuid: String,
    /// Level-2 elementary flow category, when the flow has one.
    pub category: Option<String>,
    /// `typeOfDataSet`, e.g. "Elementary flow".
    pub kind: String,
    /// Mean value of the reference flow property.
    pub mean_value: f64,
    /// UUID of the reference flow property dataset.
    pub flow_property: String,
}

/// Second path component, e.g. `flows` for `ILCD/flows/x.xml`.
fn folder(name: &str) -> Option<&str> {
    name.split('/').filter(|p| !p.is_empty()).nth(1)
}

/// Archive entries to read, in folder order. Directories, files outside a
/// dataset folder and ignored folders are dropped.
pub fn select_entries<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut selected: Vec<(usize, String)> = names
        .into_iter()
        .filter(|name| !name.ends_with('/'))
        .filter_map(|name| {
            let folder = folder(name)?;
            if IGNORED_FOLDERS.contains(&folder) {
                return None;
            }
            let rank = FOLDER_ORDER
                .iter()
                .position(|f| *f == folder)
                .unwrap_or(FOLDER_ORDER.len());
            Some((rank, name.to_string()))
        })
        .collect();
    // Stable: archive order is kept within a folder
    selected.sort_by_key(|(rank, _)| *rank);
    selected.into_iter().map(|(_, name)| name).collect()
}

pub fn extract_flows(path: &Path) -> Result<Vec<IlcdFlow>, IlcdError> {
    let file = std::fs::File::open(path).map_err(|e| IlcdError::Archive {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let flows = read_flows(file, &path.display().to_string())?;
    tracing::info!(path = %path.display(), flows = flows.len(), "extracted ILCD flows");
    Ok(flows)
}

/// Read every flow dataset from an ILCD zip.
pub fn read_flows<R: Read + Seek>(reader: R, label: &str) -> Result<Vec<IlcdFlow>, IlcdError> {
    let archive_error = |e: zip::result::ZipError| IlcdError::Archive {
        path: label.to_string(),
        message: e.to_string(),
    };
    let mut archive = ZipArchive::new(reader).map_err(archive_error)?;
    let names: Vec<String> = archive.file_names().map(str::to_string).collect();

    let mut flows = Vec::new();
    for name in select_entries(names.iter().map(String::as_str)) {
        if folder(&name) != Some("flows") {
            tracing::debug!(file = %name, "skipping non-flow dataset");
            continue;
        }
        let mut entry = archive.by_name(&name).map_err(archive_error)?;
        let mut xml = String::new();
        entry.read_to_string(&mut xml).map_err(|e| IlcdError::Xml {
            file: name.clone(),
            message: e.to_string(),
        })?;
        flows.push(parse_flow(&name, &xml)?);
    }
    Ok(flows)
}

// ============================================================================
// Flow XML
// ============================================================================

#[derive(Default)]
struct FlowProperty {
    internal_id: Option<String>,
    mean_value: Option<String>,
    reference: Option<String>,
}

fn attr(e: &BytesStart, local: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == local)
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}

fn entity(name: &[u8]) -> Option<char> {
    match name {
        b"amp" => Some('&'),
        b"lt" => Some('<'),
        b"gt" => Some('>'),
        b"quot" => Some('"'),
        b"apos" => Some('\''),
        [b'#', b'x', hex @ ..] => u32::from_str_radix(std::str::from_utf8(hex).ok()?, 16)
            .ok()
            .and_then(char::from_u32),
        [b'#', dec @ ..] => std::str::from_utf8(dec).ok()?.parse().ok().and_then(char::from_u32),
        _ => None,
    }
}

/// Open element path equals `expected`. Namespace prefixes are already stripped.
fn path_is(stack: &[String], expected: &[&str]) -> bool {
    stack.len() == expected.len() && stack.iter().zip(expected).all(|(a, b)| a == b)
}

const BASENAME: &[&str] = &["flowDataSet", "flowInformation", "dataSetInformation", "name", "baseName"];
const UUID: &[&str] = &["flowDataSet", "flowInformation", "dataSetInformation", "UUID"];
const CATEGORY: &[&str] = &[
    "flowDataSet",
    "flowInformation",
    "dataSetInformation",
    "classificationInformation",
    "elementaryFlowCategorization",
    "category",
];
const TYPE: &[&str] = &["flowDataSet", "modellingAndValidation", "LCIMethod", "typeOfDataSet"];
const REFERENCE_PROPERTY: &[&str] = &[
    "flowDataSet",
    "flowInformation",
    "quantitativeReference",
    "referenceToReferenceFlowProperty",
];
const FLOW_PROPERTY: &[&str] = &["flowDataSet", "flowProperties", "flowProperty"];
const MEAN_VALUE: &[&str] = &["flowDataSet", "flowProperties", "flowProperty", "meanValue"];
const PROPERTY_REFERENCE: &[&str] = &[
    "flowDataSet",
    "flowProperties",
    "flowProperty",
    "referenceToFlowPropertyDataSet",
];

/// Reduce one flow dataset to an [`IlcdFlow`].
///
/// The reference flow property is the `flowProperty` whose
/// `dataSetInternalID` equals `referenceToReferenceFlowProperty`.
pub fn parse_flow(file: &str, xml: &str) -> Result<IlcdFlow, IlcdError> {
    let xml_error = |e: quick_xml::Error| IlcdError::Xml {
        file: file.to_string(),
        message: e.to_string(),
    };

    // No trim_text: entity references split text events, values are trimmed on close
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut category_level: Option<String> = None;

    let mut basename = None;
    let mut uuid = None;
    let mut category = None;
    let mut kind = None;
    let mut reference_id = None;
    let mut properties: Vec<FlowProperty> = Vec::new();

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(ref e) => {
                stack.push(String::from_utf8_lossy(e.local_name().as_ref()).to_string());
                text.clear();
                if path_is(&stack, CATEGORY) {
                    category_level = attr(e, b"level");
                } else if path_is(&stack, FLOW_PROPERTY) {
                    properties.push(FlowProperty {
                        internal_id: attr(e, b"dataSetInternalID"),
                        ..FlowProperty::default()
                    });
                } else if path_is(&stack, PROPERTY_REFERENCE) {
                    if let Some(p) = properties.last_mut() {
                        p.reference = attr(e, b"refObjectId");
                    }
                }
            }
            Event::Empty(ref e) => {
                stack.push(String::from_utf8_lossy(e.local_name().as_ref()).to_string());
                if path_is(&stack, PROPERTY_REFERENCE) {
                    if let Some(p) = properties.last_mut() {
                        p.reference = attr(e, b"refObjectId");
                    }
                }
                stack.pop();
            }
            Event::Text(ref t) => text.push_str(&String::from_utf8_lossy(t.as_ref())),
            Event::CData(ref t) => text.push_str(&String::from_utf8_lossy(t.as_ref())),
            Event::GeneralRef(ref r) => {
                if let Some(c) = entity(r) {
                    text.push(c);
                }
            }
            Event::End(_) => {
                let value = text.trim().to_string();
                if path_is(&stack, BASENAME) && basename.is_none() {
                    basename = Some(value);
                } else if path_is(&stack, UUID) {
                    uuid = Some(value);
                } else if path_is(&stack, CATEGORY) && category_level.as_deref() == Some("2") {
                    category = Some(value);
                } else if path_is(&stack, TYPE) {
                    kind = Some(value);
                } else if path_is(&stack, REFERENCE_PROPERTY) {
                    reference_id = Some(value);
                } else if path_is(&stack, MEAN_VALUE) {
                    if let Some(p) = properties.last_mut() {
                        p.mean_value = Some(value);
                    }
                }
                stack.pop();
                text.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let missing = |field| IlcdError::MissingValue {
        file: file.to_string(),
        field,
    };
    let reference_id = reference_id.ok_or_else(|| missing("referenceToReferenceFlowProperty"))?;
    let property = properties
        .into_iter()
        .find(|p| p.internal_id.as_deref() == Some(reference_id.as_str()))
        .ok_or_else(|| missing("reference flow property"))?;
    let raw_mean = property.mean_value.ok_or_else(|| missing("meanValue"))?;
    let mean_value = raw_mean.parse::<f64>().map_err(|_| IlcdError::BadValue {
        file: file.to_string(),
        field: "meanValue",
        value: raw_mean.clone(),
    })?;

    Ok(IlcdFlow {
        file: file.to_string(),
        basename: basename.ok_or_else(|| missing("baseName"))?,
        uuid: uuid.ok_or_else(|| missing("UUID"))?,
        category,
        kind: kind.ok_or_else(|| missing("typeOfDataSet"))?,
        mean_value,
        flow_property: property
            .reference
            .ok_or_else(|| missing("referenceToFlowPropertyDataSet"))?,
    })
}
