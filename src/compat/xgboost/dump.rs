//! XGBoost JSON dump format.
//!
//! Parses the nested per-tree node format written by
//! `Booster.dump_model(..., dump_format="json")`. The file is a JSON array with
//! one entry per tree; an entry is either the root node object or a string
//! holding that object (as returned by `Booster.get_dump`).
//!
//! These are "foreign types" used only for parsing; see
//! [`super::convert`] for the conversion into an [`Ensemble`](crate::repr::Ensemble).

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::convert::ConversionError;

// =============================================================================
// Custom deserializers for dump-specific formats
// =============================================================================

/// Split feature written either as an index (`3`) or a name (`"f3"`, `"3"`).
fn deserialize_feature<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as SerdeError;

    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| SerdeError::custom(format!("invalid feature index {n}"))),
        Some(Value::String(s)) => {
            let t = s.trim();
            let digits = t.strip_prefix('f').unwrap_or(t);
            digits.parse::<u32>().map(Some).map_err(|_| {
                SerdeError::custom(format!(
                    "cannot parse split feature from '{s}' (expected 'f<index>' or an integer)"
                ))
            })
        }
        Some(other) => Err(SerdeError::custom(format!(
            "split feature must be a number or string, got {other}"
        ))),
    }
}

/// A tree entry given either inline or as a JSON-encoded string.
fn deserialize_trees<'de, D>(deserializer: D) -> Result<Vec<DumpNode>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as SerdeError;

    let entries = Vec::<Value>::deserialize(deserializer)?;
    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| match entry {
            Value::String(s) => serde_json::from_str::<DumpNode>(&s)
                .map_err(|e| SerdeError::custom(format!("tree {i}: {e}"))),
            other => serde_json::from_value::<DumpNode>(other)
                .map_err(|e| SerdeError::custom(format!("tree {i}: {e}"))),
        })
        .collect()
}

// =============================================================================
// Node / dump definitions
// =============================================================================

/// One node of a dumped tree.
///
/// Leaf nodes carry `leaf`; split nodes carry `split`, `split_condition`,
/// `yes`, `no` and exactly two `children`. Inputs with
/// `feature < split_condition` take the `yes` branch.
#[derive(Debug, Clone, Deserialize)]
pub struct DumpNode {
    pub nodeid: u32,
    #[serde(default)]
    pub depth: Option<u32>,
    #[serde(default)]
    pub leaf: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_feature")]
    pub split: Option<u32>,
    #[serde(default)]
    pub split_condition: Option<f64>,
    #[serde(default)]
    pub yes: Option<u32>,
    #[serde(default)]
    pub no: Option<u32>,
    #[serde(default)]
    pub missing: Option<u32>,
    #[serde(default)]
    pub gain: Option<f64>,
    #[serde(default)]
    pub cover: Option<f64>,
    #[serde(default)]
    pub children: Vec<DumpNode>,
}

impl DumpNode {
    /// A leaf node.
    pub fn leaf(nodeid: u32, value: f64) -> Self {
        Self {
            nodeid,
            depth: None,
            leaf: Some(value),
            split: None,
            split_condition: None,
            yes: None,
            no: None,
            missing: None,
            gain: None,
            cover: None,
            children: Vec::new(),
        }
    }

    /// A split node whose `yes` branch is the first child.
    pub fn split(nodeid: u32, feature: u32, threshold: f64, yes: DumpNode, no: DumpNode) -> Self {
        Self {
            nodeid,
            depth: None,
            leaf: None,
            split: Some(feature),
            split_condition: Some(threshold),
            yes: Some(yes.nodeid),
            no: Some(no.nodeid),
            missing: Some(yes.nodeid),
            gain: None,
            cover: None,
            children: vec![yes, no],
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.leaf.is_some()
    }

    /// Total number of nodes in the subtree rooted here.
    pub fn n_nodes(&self) -> usize {
        1 + self.children.iter().map(DumpNode::n_nodes).sum::<usize>()
    }
}

/// A complete dumped ensemble, one root node per tree.
#[derive(Debug, Clone)]
pub struct XgbDump {
    pub trees: Vec<DumpNode>,
}

impl<'de> Deserialize<'de> for XgbDump {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize_trees(deserializer).map(|trees| XgbDump { trees })
    }
}

impl XgbDump {
    pub fn new(trees: Vec<DumpNode>) -> Self {
        Self { trees }
    }

    /// Parse a dump from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConversionError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a dump from a reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ConversionError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Load a dump from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConversionError> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    #[inline]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
