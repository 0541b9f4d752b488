use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ── Risk ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Badge text shown next to a risk in the report.
    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "HIGH RISK",
            Self::Medium => "MEDIUM RISK",
            Self::Low => "LOW RISK",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(format!("unknown risk level: {other:?}")),
        }
    }
}

impl TryFrom<String> for RiskLevel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ── Analysis result ──────────────────────────────────────────────────────

/// A single flagged concern in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Risk {
    pub level: RiskLevel,
    pub text: String,
}

/// Clause-by-clause commentary on one part of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedSection {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskLevel>,
}

/// Structured analysis of one legal document, as returned by the model.
///
/// Field names are camelCase on the wire. Only `documentType`, `riskLevel`
/// and `plainSummary` are required; everything else defaults to empty when
/// the model leaves it out, and unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentAnalysis {
    pub document_type: String,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub risk_reason: String,
    #[serde(default)]
    pub financial_impact: String,
    #[serde(default)]
    pub key_deadline: String,
    pub plain_summary: String,
    #[serde(default)]
    pub financial_breakdown: Vec<String>,
    #[serde(default)]
    pub risks: Vec<Risk>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub questions_to_ask: Vec<String>,
    #[serde(default)]
    pub detailed_sections: Vec<DetailedSection>,
}

impl DocumentAnalysis {
    /// Number of risks at the given level.
    pub fn risk_count(&self, level: RiskLevel) -> usize {
        self.risks.iter().filter(|r| r.level == level).count()
    }
}
