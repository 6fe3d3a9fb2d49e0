//! Artifact Access
//!
//! Artifacts reach the auditor in two shapes: loosely-typed key/value objects
//! (JSON corpora, ad-hoc callers) and parsed contract records produced by a
//! structural parser. Both are read through one accessor, [`Artifact::get`], so the
//! engine never branches on the shape itself. Missing or oddly-typed fields
//! degrade to empty/zero instead of failing.

use std::borrow::Cow;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, CoreResult};

/// Metadata for one contract as emitted by a structural parser.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub source_code: String,
    #[serde(default)]
    pub functions: Vec<String>,
    #[serde(default)]
    pub modifiers: Vec<String>,
    #[serde(default)]
    pub inherits: Option<Vec<String>>,
}

impl ContractRecord {
    /// Attribute lookup by field name.
    fn attribute(&self, field: &str) -> Option<Value> {
        let strings = |items: &[String]| Value::from(items.to_vec());
        match field {
            "name" => Some(Value::from(self.name.clone())),
            "source_code" | "source" => Some(Value::from(self.source_code.clone())),
            "functions" => Some(strings(&self.functions)),
            "modifiers" => Some(strings(&self.modifiers)),
            "inherits" => self.inherits.as_deref().map(strings),
            _ => None,
        }
    }
}

/// One analyzable artifact.
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    /// Key/value metadata, looked up by key.
    Map(Map<String, Value>),
    /// Parser output, looked up by attribute.
    Record(ContractRecord),
    /// Bare source text with no metadata.
    Text(String),
}

impl Artifact {
    /// Read a metadata field regardless of the backing shape.
    pub fn get(&self, field: &str) -> Option<Cow<'_, Value>> {
        match self {
            Artifact::Map(map) => map.get(field).map(Cow::Borrowed),
            Artifact::Record(record) => record.attribute(field).map(Cow::Owned),
            Artifact::Text(_) => None,
        }
    }

    /// Source text: `source_code`, then `source`, then bare text, else empty.
    pub fn source_text(&self) -> String {
        if let Artifact::Text(text) = self {
            return text.clone();
        }
        ["source_code", "source"]
            .iter()
            .filter_map(|field| self.get(field))
            .map(|value| value_to_text(&value))
            .find(|text| !text.is_empty())
            .unwrap_or_default()
    }

    /// Element count of a collection-valued field; 0 when missing or scalar.
    pub fn count(&self, field: &str) -> usize {
        match self.get(field).as_deref() {
            Some(Value::Array(items)) => items.len(),
            Some(Value::Object(map)) => map.len(),
            _ => 0,
        }
    }

    /// Names of inherited contracts; empty when none are recorded.
    pub fn inherits(&self) -> Vec<String> {
        match self.get("inherits").as_deref() {
            Some(Value::Array(items)) => items
                .iter()
                .map(value_to_text)
                .filter(|name| !name.is_empty())
                .collect(),
            Some(Value::String(name)) if !name.trim().is_empty() => vec![name.trim().to_string()],
            _ => Vec::new(),
        }
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl From<ContractRecord> for Artifact {
    fn from(record: ContractRecord) -> Self {
        Artifact::Record(record)
    }
}

impl From<Map<String, Value>> for Artifact {
    fn from(map: Map<String, Value>) -> Self {
        Artifact::Map(map)
    }
}

impl From<String> for Artifact {
    fn from(text: String) -> Self {
        Artifact::Text(text)
    }
}

impl<'de> Deserialize<'de> for Artifact {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Map(Map<String, Value>),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(text) => Artifact::Text(text),
            Raw::Map(map) => Artifact::Map(map),
        })
    }
}

/// Ordered artifact-name → artifact mapping.
///
/// Input order is significant: evidence scanning walks artifacts in this order
/// and the first artifact is the default owner of unattributed findings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    entries: Vec<(String, Artifact)>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an artifact. Re-inserting a name replaces it in place.
    pub fn insert(&mut self, name: impl Into<String>, artifact: impl Into<Artifact>) {
        let name = name.into();
        let artifact = artifact.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = artifact,
            None => self.entries.push((name, artifact)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Artifact> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, artifact)| artifact)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Artifact)> {
        self.entries
            .iter()
            .map(|(name, artifact)| (name.as_str(), artifact))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn first_name(&self) -> Option<&str> {
        self.entries.first().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a JSON object of `name → artifact`, keeping document order.
    pub fn from_json_str(json: &str) -> CoreResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        if !value.is_object() {
            return Err(CoreError::validation("corpus must be a JSON object"));
        }
        Ok(serde_json::from_str(json)?)
    }
}

impl<N: Into<String>, A: Into<Artifact>> FromIterator<(N, A)> for Corpus {
    fn from_iter<I: IntoIterator<Item = (N, A)>>(iter: I) -> Self {
        let mut corpus = Corpus::new();
        for (name, artifact) in iter {
            corpus.insert(name, artifact);
        }
        corpus
    }
}

impl<'de> Deserialize<'de> for Corpus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CorpusVisitor;

        impl<'de> Visitor<'de> for CorpusVisitor {
            type Value = Corpus;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of artifact name to artifact metadata")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<Corpus, M::Error> {
                let mut corpus = Corpus::new();
                while let Some((name, artifact)) = access.next_entry::<String, Artifact>()? {
                    corpus.insert(name, artifact);
                }
                Ok(corpus)
            }
        }

        deserializer.deserialize_map(CorpusVisitor)
    }
}
