use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Identity of a flow or dataset: `(namespace, local_id)`.
///
/// Serialized as a two-element array, `["biosphere3", "fbcb9c7a-..."]`.
/// Ordering is lexicographic, namespace first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct Key {
    pub namespace: String,
    pub local_id: String,
}

impl Key {
    pub fn new(namespace: impl Into<String>, local_id: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local_id: local_id.into(),
        }
    }
}

impl From<(String, String)> for Key {
    fn from((namespace, local_id): (String, String)) -> Self {
        Self { namespace, local_id }
    }
}

impl From<Key> for (String, String) {
    fn from(key: Key) -> Self {
        (key.namespace, key.local_id)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.namespace, self.local_id)
    }
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// Ordered category path. `("air",)` and `("air", "urban")` are distinct.
///
/// Source data sends categories as a bare string, a list, or nothing at all;
/// all three collapse into this type on deserialization. A bare empty string
/// is the same as no categories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Categories(Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCategories {
    One(String),
    Many(Vec<String>),
}

impl Categories {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Single-compartment path from an optional compartment column.
    pub fn from_compartment(compartment: Option<&str>) -> Self {
        match compartment {
            Some(c) if !c.is_empty() => Self(vec![c.to_string()]),
            _ => Self::empty(),
        }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn join(&self, sep: &str) -> String {
        self.0.join(sep)
    }
}

impl<'de> Deserialize<'de> for Categories {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<RawCategories>::deserialize(deserializer)? {
            None => Self::empty(),
            Some(RawCategories::One(s)) => Self::from_compartment(Some(&s)),
            Some(RawCategories::Many(parts)) => Self(parts),
        })
    }
}

impl From<Categories> for Vec<String> {
    fn from(categories: Categories) -> Self {
        categories.0
    }
}

impl fmt::Display for Categories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0.join(", "))
    }
}

// ---------------------------------------------------------------------------
// Flows and datasets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowKind {
    Process,
    Product,
    #[serde(alias = "emission", alias = "natural resource")]
    Biosphere,
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Process => write!(f, "process"),
            Self::Product => write!(f, "product"),
            Self::Biosphere => write!(f, "biosphere"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub key: Key,
    pub name: String,
    #[serde(default)]
    pub categories: Categories,
    #[serde(default)]
    pub unit: Option<String>,
    pub kind: FlowKind,
}

/// A process/activity record. Display attributes are optional; export code
/// substitutes placeholders for whatever is missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub name: Option<String>,
    #[serde(rename = "reference product", default, skip_serializing_if = "Option::is_none")]
    pub reference_product: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Categories::is_empty")]
    pub categories: Categories,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FlowKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

// ---------------------------------------------------------------------------
// Exchanges
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeKind {
    Production,
    Technosphere,
    Biosphere,
}

impl fmt::Display for ExchangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Production => write!(f, "production"),
            Self::Technosphere => write!(f, "technosphere"),
            Self::Biosphere => write!(f, "biosphere"),
        }
    }
}

/// Directed numeric edge from `input` into `output`. `amount` is final:
/// all disaggregation scaling has already been applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub input: Key,
    pub output: Key,
    #[serde(rename = "type")]
    pub kind: ExchangeKind,
    pub amount: f64,
}
