//! Security archive model.
//!
//! A security archive maps dependency ids to a package report: the alerts
//! raised for the package and its normalized (0..=1) scores.

use crate::dep_id::DepId;
use crate::error::GraphError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Debug;

/// One alert raised against a package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Alert kind (`installScripts`, `criticalCVE`, ...)
    #[serde(rename = "type")]
    pub alert_type: String,

    /// Kind-specific payload (`cveId`, `cwes`, ...)
    #[serde(default)]
    pub props: Value,
}

impl Alert {
    pub fn new(alert_type: impl Into<String>) -> Self {
        Self {
            alert_type: alert_type.into(),
            props: Value::Null,
        }
    }

    pub fn with_props(mut self, props: Value) -> Self {
        self.props = props;
        self
    }
}

/// Package scores, each in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Score {
    pub overall: f64,
    pub license: f64,
    pub maintenance: f64,
    pub quality: f64,
    pub supply_chain: f64,
    pub vulnerability: f64,
}

/// Score dimensions addressable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreKind {
    Overall,
    License,
    Maintenance,
    Quality,
    SupplyChain,
    Vulnerability,
}

impl ScoreKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "overall" => Some(ScoreKind::Overall),
            "license" => Some(ScoreKind::License),
            "maintenance" => Some(ScoreKind::Maintenance),
            "quality" => Some(ScoreKind::Quality),
            "supplyChain" => Some(ScoreKind::SupplyChain),
            "vulnerability" => Some(ScoreKind::Vulnerability),
            _ => None,
        }
    }
}

impl Score {
    pub fn get(&self, kind: ScoreKind) -> f64 {
        match kind {
            ScoreKind::Overall => self.overall,
            ScoreKind::License => self.license,
            ScoreKind::Maintenance => self.maintenance,
            ScoreKind::Quality => self.quality,
            ScoreKind::SupplyChain => self.supply_chain,
            ScoreKind::Vulnerability => self.vulnerability,
        }
    }
}

/// Alerts and scores for one package.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageReport {
    pub alerts: Vec<Alert>,
    pub score: Score,
}

impl PackageReport {
    pub fn with_alert(mut self, alert: Alert) -> Self {
        self.alerts.push(alert);
        self
    }

    pub fn with_score(mut self, score: Score) -> Self {
        self.score = score;
        self
    }

    pub fn has_alert(&self, alert_type: &str) -> bool {
        self.alerts.iter().any(|a| a.alert_type == alert_type)
    }
}

/// Lookup of package reports by dependency id.
pub trait SecurityArchive: Send + Sync + Debug {
    fn get(&self, id: &DepId) -> Option<&PackageReport>;
}

/// Security archive held in memory, loadable from a JSON object keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InMemorySecurityArchive {
    reports: HashMap<DepId, PackageReport>,
}

impl InMemorySecurityArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn insert(&mut self, id: DepId, report: PackageReport) {
        self.reports.insert(id, report);
    }

    pub fn with_report(mut self, id: DepId, report: PackageReport) -> Self {
        self.insert(id, report);
        self
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

impl SecurityArchive for InMemorySecurityArchive {
    fn get(&self, id: &DepId) -> Option<&PackageReport> {
        self.reports.get(id)
    }
}
