//! Staging / live row shapes.
//!
//! staging → live の変換は payload をそのままコピーして `id` を落とすだけ。
//! live 側の id / created_at はバックエンドが採番する。

use serde::{Deserialize, Serialize};
use serde_json::Number;

use super::RecordId;

/// Identifier of the sensor node that produced a reading.
///
/// Opaque: carried as whatever JSON value the staging column holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(serde_json::Value);

impl NodeId {
    pub fn new(value: impl Into<serde_json::Value>) -> Self {
        Self(value.into())
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A row waiting in the staging table.
///
/// Readings keep the JSON number as received (an integer stays an integer).
/// Missing or `null` readings deserialize to `None`. Extra columns are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagingRecord {
    pub id: RecordId,
    pub node_id: NodeId,
    #[serde(default)]
    pub ph: Option<Number>,
    #[serde(default)]
    pub turbidity: Option<Number>,
    #[serde(default)]
    pub temperature: Option<Number>,
    #[serde(default)]
    pub do_level: Option<Number>,
}

impl StagingRecord {
    /// A staging row with every reading absent.
    pub fn new(id: RecordId, node_id: impl Into<NodeId>) -> Self {
        Self {
            id,
            node_id: node_id.into(),
            ph: None,
            turbidity: None,
            temperature: None,
            do_level: None,
        }
    }

    pub fn with_ph(mut self, ph: f64) -> Self {
        self.ph = Number::from_f64(ph);
        self
    }

    pub fn with_turbidity(mut self, turbidity: f64) -> Self {
        self.turbidity = Number::from_f64(turbidity);
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Number::from_f64(temperature);
        self
    }

    pub fn with_do_level(mut self, do_level: f64) -> Self {
        self.do_level = Number::from_f64(do_level);
        self
    }

    /// Destination-shaped copy of this row (the staging id is dropped).
    pub fn to_live(&self) -> LiveRecord {
        LiveRecord {
            node_id: self.node_id.clone(),
            ph: self.ph.clone(),
            turbidity: self.turbidity.clone(),
            temperature: self.temperature.clone(),
            do_level: self.do_level.clone(),
        }
    }
}

/// A row as inserted into the live table.
///
/// Absent readings serialize as explicit `null`, never as a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveRecord {
    pub node_id: NodeId,
    pub ph: Option<Number>,
    pub turbidity: Option<Number>,
    pub temperature: Option<Number>,
    pub do_level: Option<Number>,
}

impl From<&StagingRecord> for LiveRecord {
    fn from(record: &StagingRecord) -> Self {
        record.to_live()
    }
}
