//! Shared machine-readable primerdesk contracts.
//!
//! These records are what the decoder produces and what diagnostics, the
//! annotator and every exporter consume. They carry no parsing logic of
//! their own beyond small helpers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three oligos Primer3 can design or accept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Left,
    Right,
    Internal,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Left, Role::Right, Role::Internal];

    /// Key fragment used by the engine, as in `PRIMER_LEFT_0_TM`.
    pub fn key_part(self) -> &'static str {
        match self {
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
            Self::Internal => "INTERNAL",
        }
    }

    pub fn parse_key_part(text: &str) -> Option<Self> {
        match text {
            "LEFT" => Some(Self::Left),
            "RIGHT" => Some(Self::Right),
            "INTERNAL" => Some(Self::Internal),
            _ => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Left => "Left Primer",
            Self::Right => "Right Primer",
            Self::Internal => "Internal Oligo / Probe",
        }
    }

    /// Row label in result tables.
    pub fn table_label(self) -> &'static str {
        match self {
            Self::Left => "LEFT PRIMER",
            Self::Right => "RIGHT PRIMER",
            Self::Internal => "HYB OLIGO",
        }
    }

    /// Phrase the engine uses for this role inside `PRIMER_WARNING` text.
    pub fn warning_phrase(self) -> &'static str {
        match self {
            Self::Left => "left primer",
            Self::Right => "right primer",
            Self::Internal => "internal oligo",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A run of bases given as start plus length.
///
/// Whether `start` is 0-based or offset by the engine's first base index
/// depends on where the span came from; decoded records keep engine
/// coordinates, the annotator expects 0-based ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: i64,
    pub length: usize,
}

impl Span {
    pub fn new(start: i64, length: usize) -> Self {
        Self { start, length }
    }

    pub fn shifted(self, delta: i64) -> Self {
        Self {
            start: self.start + delta,
            length: self.length,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OligoRecord {
    pub start: Option<i64>,
    pub length: Option<usize>,
    pub tm: Option<f64>,
    pub gc_percent: Option<f64>,
    pub self_any: Option<f64>,
    pub self_end: Option<f64>,
    pub sequence: Option<String>,
    pub penalty: Option<f64>,
    pub problems: Option<String>,
}

impl OligoRecord {
    pub fn span(&self) -> Option<Span> {
        Some(Span::new(self.start?, self.length?))
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PairRecord {
    pub penalty: Option<f64>,
    pub product_size: Option<usize>,
    pub product_tm: Option<f64>,
    pub compl_any: Option<f64>,
    pub compl_end: Option<f64>,
}

impl PairRecord {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Everything the engine reported for one result index.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DesignResult {
    pub index: usize,
    pub left: OligoRecord,
    pub right: OligoRecord,
    pub probe: Option<OligoRecord>,
    pub pair: PairRecord,
}

impl DesignResult {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    pub fn oligo(&self, role: Role) -> Option<&OligoRecord> {
        match role {
            Role::Left => Some(&self.left),
            Role::Right => Some(&self.right),
            Role::Internal => self.probe.as_ref(),
        }
    }

    /// True when the engine reported nothing at all for this index.
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
            && self.right.is_empty()
            && self.probe.as_ref().is_none_or(OligoRecord::is_empty)
            && self.pair.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Minor,
    Blocking,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingCategory {
    Configuration,
    MissingInput,
    Engine,
    Result,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub category: FindingCategory,
    pub role: Option<Role>,
    pub result_index: Option<usize>,
    pub message: String,
}

impl Finding {
    pub fn minor(category: FindingCategory, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Minor,
            category,
            role: None,
            result_index: None,
            message: message.into(),
        }
    }

    pub fn blocking(category: FindingCategory, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Blocking,
            ..Self::minor(category, message)
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_result(mut self, index: usize) -> Self {
        self.result_index = Some(index);
        self
    }
}

/// Overall state shown as a severity indicator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Triage {
    #[default]
    Ok,
    MinorWarning,
    BlockingError,
}

impl Triage {
    pub fn from_findings(findings: &[Finding]) -> Self {
        match findings.iter().map(|f| f.severity).max() {
            Some(Severity::Blocking) => Self::BlockingError,
            Some(Severity::Minor) => Self::MinorWarning,
            None => Self::Ok,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::MinorWarning => "minor_warning",
            Self::BlockingError => "blocking_error",
        }
    }

    pub fn indicator_color(self) -> &'static str {
        match self {
            Self::Ok => "green",
            Self::MinorWarning => "yellow",
            Self::BlockingError => "red",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triage_follows_worst_severity() {
        assert_eq!(Triage::from_findings(&[]), Triage::Ok);
        let minor = Finding::minor(FindingCategory::Configuration, "a");
        let blocking = Finding::blocking(FindingCategory::MissingInput, "b");
        assert_eq!(
            Triage::from_findings(std::slice::from_ref(&minor)),
            Triage::MinorWarning
        );
        assert_eq!(
            Triage::from_findings(&[minor, blocking]),
            Triage::BlockingError
        );
    }

    #[test]
    fn test_role_key_parts_roundtrip() {
        for role in Role::ALL {
            assert_eq!(Role::parse_key_part(role.key_part()), Some(role));
        }
        assert_eq!(Role::parse_key_part("PAIR"), None);
    }

    #[test]
    fn test_unset_fields_serialize_as_null() {
        let result = DesignResult::new(1);
        assert!(result.is_empty());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["index"], 1);
        assert!(json["left"]["tm"].is_null());
        assert!(json["probe"].is_null());
        assert_eq!(json["pair"]["product_size"], serde_json::Value::Null);
    }

    #[test]
    fn test_oligo_span_requires_start_and_length() {
        let mut oligo = OligoRecord {
            start: Some(10),
            ..OligoRecord::default()
        };
        assert_eq!(oligo.span(), None);
        oligo.length = Some(20);
        assert_eq!(oligo.span(), Some(Span::new(10, 20)));
        assert_eq!(oligo.span().unwrap().shifted(-1), Span::new(9, 20));
    }
}
