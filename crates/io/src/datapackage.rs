//! Tidy datapackage reader.
//!
//! A datapackage is a directory with a `datapackage.json` descriptor:
//!
//! ```json
//! {"name": "exiobase-3.3.17-hybrid",
//!  "resources": [
//!    {"name": "activities", "path": "activities.csv"},
//!    {"name": "hiot", "path": "hiot.csv", "rows": "products", "cols": "activities"}
//!  ]}
//! ```
//!
//! Metadata resources are CSV with at least `id` and `name` columns. Numeric
//! resources are CSV `row,col,amount`, where `row`/`col` are ids in the
//! resources named by `rows`/`cols`. An empty amount cell is an absent value.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use lcigrid_recon::source::{
    MetadataRecord, Observation, ObservationSource, Observations, ACTIVITIES, EXTENSIONS,
    EXTENSION_EXCHANGES, PRODUCTION_EXCHANGES, PRODUCTS, TECHNOSPHERE_EXCHANGES,
};
use lcigrid_recon::SourceError;
use serde::Deserialize;

pub const DESCRIPTOR_FILE: &str = "datapackage.json";

#[derive(Debug, Deserialize)]
struct Descriptor {
    #[serde(default)]
    name: Option<String>,
    resources: Vec<Resource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Resource {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub rows: Option<String>,
    #[serde(default)]
    pub cols: Option<String>,
}

/// Axis resources for the standard numeric tables when the descriptor does
/// not name them.
fn default_axes(resource: &str) -> Option<(&'static str, &'static str)> {
    match resource {
        PRODUCTION_EXCHANGES | TECHNOSPHERE_EXCHANGES => Some((PRODUCTS, ACTIVITIES)),
        EXTENSION_EXCHANGES => Some((EXTENSIONS, ACTIVITIES)),
        _ => None,
    }
}

pub struct DataPackage {
    root: PathBuf,
    name: Option<String>,
    resources: HashMap<String, Resource>,
}

impl DataPackage {
    /// Read the descriptor in `dir`. Resource files are opened lazily.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, SourceError> {
        let root = dir.as_ref().to_path_buf();
        let descriptor_path = root.join(DESCRIPTOR_FILE);
        let text = std::fs::read_to_string(&descriptor_path)
            .map_err(|e| SourceError::Io(format!("{}: {e}", descriptor_path.display())))?;
        let descriptor: Descriptor =
            serde_json::from_str(&text).map_err(|e| SourceError::Malformed {
                resource: DESCRIPTOR_FILE.to_string(),
                message: e.to_string(),
            })?;

        let resources = descriptor
            .resources
            .into_iter()
            .map(|r| (r.name.clone(), r))
            .collect::<HashMap<_, _>>();
        tracing::debug!(root = %root.display(), resources = resources.len(), "opened datapackage");

        Ok(Self {
            root,
            name: descriptor.name,
            resources,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resource(&self, name: &str) -> Result<&Resource, SourceError> {
        self.resources
            .get(name)
            .ok_or_else(|| SourceError::MissingResource(name.to_string()))
    }

    fn reader(&self, resource: &Resource) -> Result<csv::Reader<File>, SourceError> {
        let path = self.root.join(&resource.path);
        csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&path)
            .map_err(|e| SourceError::Io(format!("{}: {e}", path.display())))
    }

    fn axes(&self, resource: &Resource) -> Result<(String, String), SourceError> {
        let defaults = default_axes(&resource.name);
        let rows = resource.rows.clone().or_else(|| defaults.map(|d| d.0.to_string()));
        let cols = resource.cols.clone().or_else(|| defaults.map(|d| d.1.to_string()));
        match (rows, cols) {
            (Some(rows), Some(cols)) => Ok((rows, cols)),
            _ => Err(SourceError::Malformed {
                resource: resource.name.clone(),
                message: "numeric resource needs 'rows' and 'cols'".into(),
            }),
        }
    }

    fn id_index(&self, resource: &str) -> Result<HashMap<String, Rc<MetadataRecord>>, SourceError> {
        Ok(self
            .metadata(resource)?
            .into_iter()
            .map(|record| (record.id.clone(), Rc::new(record)))
            .collect())
    }
}

fn csv_error(resource: &str, e: csv::Error) -> SourceError {
    SourceError::Csv {
        resource: resource.to_string(),
        message: e.to_string(),
    }
}

fn column(headers: &csv::StringRecord, resource: &str, name: &str) -> Result<usize, SourceError> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| SourceError::MissingColumn {
            resource: resource.to_string(),
            column: name.to_string(),
        })
}

impl ObservationSource for DataPackage {
    fn metadata(&self, resource: &str) -> Result<Vec<MetadataRecord>, SourceError> {
        let entry = self.resource(resource)?;
        let mut reader = self.reader(entry)?;
        let headers = reader.headers().map_err(|e| csv_error(resource, e))?.clone();
        let id_col = column(&headers, resource, "id")?;
        let name_col = column(&headers, resource, "name")?;

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row.map_err(|e| csv_error(resource, e))?;
            let mut record = MetadataRecord::new(
                row.get(id_col).unwrap_or_default(),
                row.get(name_col).unwrap_or_default(),
            );
            for (i, header) in headers.iter().enumerate() {
                if i == id_col || i == name_col {
                    continue;
                }
                if let Some(value) = row.get(i) {
                    record.fields.insert(header.trim().to_string(), value.to_string());
                }
            }
            records.push(record);
        }
        Ok(records)
    }

    fn observations(&self, resource: &str) -> Result<Observations, SourceError> {
        let entry = self.resource(resource)?;
        let (rows, cols) = self.axes(entry)?;
        let rows = self.id_index(&rows)?;
        let cols = self.id_index(&cols)?;

        let mut reader = self.reader(entry)?;
        let headers = reader.headers().map_err(|e| csv_error(resource, e))?.clone();
        let columns = [
            column(&headers, resource, "row")?,
            column(&headers, resource, "col")?,
            column(&headers, resource, "amount")?,
        ];

        Ok(Box::new(ObservationRows {
            resource: resource.to_string(),
            records: reader.into_records(),
            columns,
            rows,
            cols,
        }))
    }
}

/// Lazy cursor over one numeric CSV resource.
struct ObservationRows {
    resource: String,
    records: csv::StringRecordsIntoIter<File>,
    /// Positions of `row`, `col`, `amount`.
    columns: [usize; 3],
    rows: HashMap<String, Rc<MetadataRecord>>,
    cols: HashMap<String, Rc<MetadataRecord>>,
}

impl ObservationRows {
    fn parse(&self, record: &csv::StringRecord) -> Result<Observation, SourceError> {
        let [row_col, col_col, amount_col] = self.columns;
        let lookup = |index: &HashMap<String, Rc<MetadataRecord>>, axis, pos| {
            let id = record.get(pos).unwrap_or_default();
            index.get(id).cloned().ok_or_else(|| SourceError::UnknownId {
                resource: self.resource.clone(),
                axis,
                id: id.to_string(),
            })
        };
        let row = lookup(&self.rows, "row", row_col)?;
        let col = lookup(&self.cols, "col", col_col)?;

        let raw = record.get(amount_col).unwrap_or_default().trim();
        let amount = if raw.is_empty() {
            None
        } else {
            Some(raw.parse::<f64>().map_err(|_| SourceError::BadAmount {
                resource: self.resource.clone(),
                line: record.position().map(|p| p.line()).unwrap_or(0),
                value: raw.to_string(),
            })?)
        };

        Ok(Observation { row, col, amount })
    }
}

impl Iterator for ObservationRows {
    type Item = Result<Observation, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(e) => return Some(Err(csv_error(&self.resource, e))),
        };
        Some(self.parse(&record))
    }
}
