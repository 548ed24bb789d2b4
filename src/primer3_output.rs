//! Decoding of the flat `KEY=VALUE` stream printed by `primer3_core`.
//!
//! Result keys look like `PRIMER_LEFT_0`, `PRIMER_RIGHT_2_TM` or
//! `PRIMER_PAIR_1_PRODUCT_SIZE`. Indices are not guaranteed to arrive in
//! order or to be dense, so records are collected by index and the number
//! of results is taken from the pair penalties.

use crate::{error::DesignError, task::RoleSelection};
use log::debug;
use primerdesk_protocol::{DesignResult, OligoRecord, PairRecord, Role, Span};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, sync::LazyLock};

/// Rows of the explanation summary, in display order.
pub const EXPLAIN_CATEGORIES: [&str; 13] = [
    "considered",
    "too many Ns",
    "in target",
    "in excl region",
    "GC content failed",
    "no GC clamp",
    "low tm",
    "high tm",
    "high any compl",
    "high end compl",
    "long poly-x seq",
    "high 3' stability",
    "ok",
];

/// Highest result index accepted from the engine.
pub const MAX_RESULT_INDEX: usize = 9_999;

static RESULT_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^PRIMER_(LEFT|RIGHT|INTERNAL_OLIGO|INTERNAL|PAIR)_(\d+)(?:_([A-Z0-9_]+))?$")
        .expect("result key pattern is valid")
});

static ROLE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^PRIMER_(LEFT|RIGHT|INTERNAL_OLIGO|INTERNAL|PAIR)_(EXPLAIN|NUM_RETURNED)$")
        .expect("role key pattern is valid")
});

fn role_from_key(part: &str) -> Option<Role> {
    match part {
        "INTERNAL_OLIGO" => Some(Role::Internal),
        other => Role::parse_key_part(other),
    }
}

/// Rejection counts for one role, in the order the engine reported them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplainCounts(pub Vec<(String, u64)>);

impl ExplainCounts {
    pub fn get(&self, category: &str) -> u64 {
        self.0
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }
}

/// Parses `considered 42, too many Ns 3, ok 10`. The category is everything
/// before the last whitespace run of each item.
pub fn parse_explain(value: &str) -> Result<ExplainCounts, String> {
    let mut ret = vec![];
    for item in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (category, count) = item
            .rsplit_once(char::is_whitespace)
            .ok_or_else(|| format!("explanation item '{item}' has no count"))?;
        let count = count
            .parse::<u64>()
            .map_err(|_| format!("explanation count '{count}' is not an integer"))?;
        ret.push((category.trim_end().to_string(), count));
    }
    Ok(ExplainCounts(ret))
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DecodedOutput {
    pub engine_errors: Vec<String>,
    pub warnings: Vec<String>,
    pub results: Vec<DesignResult>,
    pub explain: BTreeMap<Role, ExplainCounts>,
    pub pair_explain: Option<String>,
    pub num_returned: BTreeMap<Role, usize>,
    pub pair_num_returned: Option<usize>,
    /// Echoed input regions, engine coordinates.
    pub target: Option<Span>,
    pub excluded_region: Option<Span>,
}

impl DecodedOutput {
    pub fn num_results(&self) -> usize {
        self.results.len()
    }

    /// The engine's own errors as a single error value.
    pub fn engine_error(&self) -> Option<DesignError> {
        (!self.engine_errors.is_empty()).then(|| DesignError::EngineReportedError {
            messages: self.engine_errors.clone(),
        })
    }
}

struct LineContext<'a> {
    line_number: usize,
    line: &'a str,
}

impl LineContext<'_> {
    fn error(&self, reason: impl Into<String>) -> DesignError {
        DesignError::Decode {
            line_number: self.line_number,
            line: self.line.to_string(),
            reason: reason.into(),
        }
    }

    fn float(&self, value: &str) -> Result<f64, DesignError> {
        value
            .trim()
            .parse()
            .map_err(|_| self.error(format!("'{value}' is not a number")))
    }

    fn count(&self, value: &str) -> Result<usize, DesignError> {
        value
            .trim()
            .parse()
            .map_err(|_| self.error(format!("'{value}' is not a non-negative integer")))
    }

    fn result_index(&self, value: &str) -> Result<usize, DesignError> {
        let index = self.count(value)?;
        if index > MAX_RESULT_INDEX {
            return Err(self.error(format!(
                "result index {index} is larger than {MAX_RESULT_INDEX}"
            )));
        }
        Ok(index)
    }

    fn span(&self, value: &str) -> Result<Span, DesignError> {
        let first = value.split_whitespace().next().unwrap_or_default();
        let (start, length) = first
            .split_once(',')
            .ok_or_else(|| self.error("expected 'start,length'"))?;
        let start = start
            .trim()
            .parse::<i64>()
            .map_err(|_| self.error(format!("'{start}' is not an integer")))?;
        Ok(Span::new(start, self.count(length)?))
    }
}

fn set_oligo_attr(
    ctx: &LineContext,
    oligo: &mut OligoRecord,
    attr: Option<&str>,
    value: &str,
) -> Result<(), DesignError> {
    match attr {
        None => {
            let span = ctx.span(value)?;
            oligo.start = Some(span.start);
            oligo.length = Some(span.length);
        }
        Some("SEQUENCE") => oligo.sequence = Some(value.to_string()),
        Some("TM") => oligo.tm = Some(ctx.float(value)?),
        Some("GC_PERCENT") => oligo.gc_percent = Some(ctx.float(value)?),
        Some("SELF_ANY" | "SELF_ANY_TH") => oligo.self_any = Some(ctx.float(value)?),
        Some("SELF_END" | "SELF_END_TH") => oligo.self_end = Some(ctx.float(value)?),
        Some("PENALTY") => oligo.penalty = Some(ctx.float(value)?),
        Some("PROBLEMS") => oligo.problems = Some(value.to_string()),
        Some(_) => {}
    }
    Ok(())
}

fn set_pair_attr(
    ctx: &LineContext,
    pair: &mut PairRecord,
    attr: Option<&str>,
    value: &str,
) -> Result<(), DesignError> {
    match attr {
        Some("PENALTY") => pair.penalty = Some(ctx.float(value)?),
        Some("PRODUCT_SIZE") => pair.product_size = Some(ctx.count(value)?),
        Some("PRODUCT_TM") => pair.product_tm = Some(ctx.float(value)?),
        Some("COMPL_ANY" | "COMPL_ANY_TH") => pair.compl_any = Some(ctx.float(value)?),
        Some("COMPL_END" | "COMPL_END_TH") => pair.compl_end = Some(ctx.float(value)?),
        _ => {}
    }
    Ok(())
}

/// Decodes raw engine output in a single pass.
///
/// When the engine reported any `PRIMER_ERROR`, only the errors are
/// returned. Otherwise the first malformed numeric value fails the decode.
pub fn decode(raw: &str) -> Result<DecodedOutput, DesignError> {
    let mut ret = DecodedOutput::default();
    let mut records: BTreeMap<usize, DesignResult> = BTreeMap::new();
    let mut max_pair_index: Option<usize> = None;
    let mut failure: Option<DesignError> = None;

    for (line_index, line) in raw.lines().enumerate() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        let ctx = LineContext {
            line_number: line_index + 1,
            line,
        };
        let outcome = match key {
            "" => Ok(()),
            "PRIMER_ERROR" => {
                ret.engine_errors.push(value.to_string());
                Ok(())
            }
            "PRIMER_WARNING" => {
                ret.warnings.push(value.to_string());
                Ok(())
            }
            "SEQUENCE_TARGET" if !value.is_empty() => ctx.span(value).map(|s| ret.target = Some(s)),
            "EXCLUDED_REGION" | "SEQUENCE_EXCLUDED_REGION" if !value.is_empty() => {
                ctx.span(value).map(|s| ret.excluded_region = Some(s))
            }
            _ => decode_keyed(&ctx, key, value, &mut ret, &mut records, &mut max_pair_index),
        };
        if let Err(e) = outcome {
            failure.get_or_insert(e);
        }
    }

    if !ret.engine_errors.is_empty() {
        debug!("Engine reported {} error(s)", ret.engine_errors.len());
        return Ok(DecodedOutput {
            engine_errors: ret.engine_errors,
            warnings: ret.warnings,
            ..DecodedOutput::default()
        });
    }
    if let Some(e) = failure {
        return Err(e);
    }

    let num_results = max_pair_index.map_or(0, |i| i + 1);
    ret.results = (0..num_results)
        .map(|i| records.remove(&i).unwrap_or_else(|| DesignResult::new(i)))
        .collect();
    debug!(
        "Decoded {} result(s), {} warning(s), dropped {} record(s) past the last pair",
        num_results,
        ret.warnings.len(),
        records.len()
    );
    Ok(ret)
}

fn decode_keyed(
    ctx: &LineContext,
    key: &str,
    value: &str,
    ret: &mut DecodedOutput,
    records: &mut BTreeMap<usize, DesignResult>,
    max_pair_index: &mut Option<usize>,
) -> Result<(), DesignError> {
    if let Some(caps) = RESULT_KEY.captures(key) {
        let index = ctx.result_index(&caps[2])?;
        let attr = caps.get(3).map(|m| m.as_str());
        let record = records
            .entry(index)
            .or_insert_with(|| DesignResult::new(index));
        return match role_from_key(&caps[1]) {
            None => {
                if attr == Some("PENALTY") {
                    *max_pair_index = (*max_pair_index).max(Some(index));
                }
                set_pair_attr(ctx, &mut record.pair, attr, value)
            }
            Some(Role::Left) => set_oligo_attr(ctx, &mut record.left, attr, value),
            Some(Role::Right) => set_oligo_attr(ctx, &mut record.right, attr, value),
            Some(Role::Internal) => {
                let probe = record.probe.get_or_insert_with(OligoRecord::default);
                set_oligo_attr(ctx, probe, attr, value)
            }
        };
    }
    if let Some(caps) = ROLE_KEY.captures(key) {
        let role = role_from_key(&caps[1]);
        match (&caps[2], role) {
            ("EXPLAIN", Some(role)) => {
                let counts = parse_explain(value).map_err(|reason| ctx.error(reason))?;
                ret.explain.insert(role, counts);
            }
            ("EXPLAIN", None) => ret.pair_explain = Some(value.to_string()),
            (_, Some(role)) => {
                ret.num_returned.insert(role, ctx.count(value)?);
            }
            (_, None) => ret.pair_num_returned = Some(ctx.count(value)?),
        }
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplainCell {
    Count(u64),
    Provided,
}

impl fmt::Display for ExplainCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::Provided => f.write_str("provided"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplanationColumn {
    pub role: Role,
    /// One cell per entry of [`EXPLAIN_CATEGORIES`].
    pub cells: Vec<ExplainCell>,
}

/// The transposed per-role explanation table shown after the results.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplanationSummary {
    pub columns: Vec<ExplanationColumn>,
}

impl ExplanationSummary {
    pub fn build(decoded: &DecodedOutput, roles: &RoleSelection) -> Self {
        let mut shown = vec![Role::Left, Role::Right];
        if roles.probe.is_selected() {
            shown.push(Role::Internal);
        }
        let empty = ExplainCounts::default();
        let columns = shown
            .into_iter()
            .map(|role| {
                let cells = if roles.get(role).is_provided_only() {
                    vec![ExplainCell::Provided; EXPLAIN_CATEGORIES.len()]
                } else {
                    let counts = decoded.explain.get(&role).unwrap_or(&empty);
                    EXPLAIN_CATEGORIES
                        .iter()
                        .map(|c| ExplainCell::Count(counts.get(c)))
                        .collect()
                };
                ExplanationColumn { role, cells }
            })
            .collect();
        Self { columns }
    }

    /// `(category, cells)` rows in display order.
    pub fn rows(&self) -> impl Iterator<Item = (&'static str, Vec<&ExplainCell>)> + '_ {
        EXPLAIN_CATEGORIES
            .iter()
            .enumerate()
            .map(move |(i, category)| {
                let cells = self.columns.iter().map(|c| &c.cells[i]).collect();
                (*category, cells)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::RoleInput;

    const TWO_PAIRS: &str = "SEQUENCE_ID=example
SEQUENCE_TARGET=37,21
PRIMER_LEFT_EXPLAIN=considered 42, too many Ns 3, ok 10
PRIMER_RIGHT_EXPLAIN=considered 50, high tm 7, ok 12
PRIMER_PAIR_EXPLAIN=considered 9, unacceptable product size 2, ok 4
PRIMER_LEFT_NUM_RETURNED=2
PRIMER_RIGHT_NUM_RETURNED=2
PRIMER_PAIR_NUM_RETURNED=2
PRIMER_PAIR_0_PENALTY=0.412
PRIMER_LEFT_0_PENALTY=0.1
PRIMER_LEFT_0_SEQUENCE=TGACTCCGGTAGCTAGCTAG
PRIMER_LEFT_0=5,20
PRIMER_LEFT_0_TM=59.9
PRIMER_LEFT_0_GC_PERCENT=50.000
PRIMER_LEFT_0_SELF_ANY_TH=3.25
PRIMER_LEFT_0_SELF_END_TH=0.00
PRIMER_RIGHT_0_SEQUENCE=GATCGATCGGCATCGATCGA
PRIMER_RIGHT_0=120,20
PRIMER_RIGHT_0_TM=60.1
PRIMER_RIGHT_0_PROBLEMS=Tm too high
PRIMER_PAIR_0_COMPL_ANY_TH=0.00
PRIMER_PAIR_0_COMPL_END=1.00
PRIMER_PAIR_0_PRODUCT_SIZE=116
PRIMER_PAIR_0_PRODUCT_TM=80.2
PRIMER_PAIR_1_PENALTY=0.9
PRIMER_LEFT_1=6,20
=
";

    #[test]
    fn test_decode_typed_records() {
        let decoded = decode(TWO_PAIRS).unwrap();
        assert_eq!(decoded.num_results(), 2);
        let first = &decoded.results[0];
        assert_eq!(first.left.span(), Some(Span::new(5, 20)));
        assert_eq!(first.left.tm, Some(59.9));
        assert_eq!(first.left.self_any, Some(3.25));
        assert_eq!(first.right.problems.as_deref(), Some("Tm too high"));
        assert_eq!(first.pair.product_size, Some(116));
        assert_eq!(first.pair.compl_any, Some(0.0));
        assert_eq!(first.pair.compl_end, Some(1.0));
        assert_eq!(first.probe, None);
        assert_eq!(decoded.results[1].left.start, Some(6));
        assert_eq!(decoded.results[1].right.tm, None);
        assert_eq!(decoded.target, Some(Span::new(37, 21)));
        assert_eq!(decoded.num_returned.get(&Role::Left), Some(&2));
        assert_eq!(decoded.pair_num_returned, Some(2));
        assert_eq!(
            decoded.pair_explain.as_deref(),
            Some("considered 9, unacceptable product size 2, ok 4")
        );
    }

    #[test]
    fn test_sparse_pair_indices() {
        let raw = "PRIMER_PAIR_0_PENALTY=0.5\nPRIMER_PAIR_2_PENALTY=1.5\nPRIMER_LEFT_2_TM=60.0\n";
        let decoded = decode(raw).unwrap();
        assert_eq!(decoded.num_results(), 3);
        assert!(decoded.results[1].is_empty());
        assert_eq!(decoded.results[1].index, 1);
        assert_eq!(decoded.results[2].left.tm, Some(60.0));
    }

    #[test]
    fn test_oversized_result_index_is_rejected() {
        for raw in [
            "PRIMER_PAIR_18446744073709551615_PENALTY=1\n",
            "PRIMER_PAIR_4000000000_PENALTY=1\n",
            "PRIMER_LEFT_99999999999999999999999=1,20\n",
        ] {
            let err = decode(raw).unwrap_err();
            assert!(
                matches!(err, DesignError::Decode { line_number: 1, .. }),
                "{err}"
            );
        }
        let raw = format!("PRIMER_PAIR_{MAX_RESULT_INDEX}_PENALTY=1\n");
        assert_eq!(decode(&raw).unwrap().num_results(), MAX_RESULT_INDEX + 1);
    }

    #[test]
    fn test_records_past_last_pair_are_dropped() {
        let raw = "PRIMER_PAIR_0_PENALTY=0.5\nPRIMER_LEFT_4=1,20\n";
        let decoded = decode(raw).unwrap();
        assert_eq!(decoded.num_results(), 1);
    }

    #[test]
    fn test_no_pairs_means_no_results() {
        let decoded = decode("PRIMER_LEFT_0=1,20\nPRIMER_LEFT_0_TM=60.0\n=\n").unwrap();
        assert_eq!(decoded.num_results(), 0);
    }

    #[test]
    fn test_engine_error_suppresses_results() {
        let raw = "PRIMER_ERROR=Nonexistent template\nPRIMER_PAIR_0_PENALTY=nonsense\n=\n";
        let decoded = decode(raw).unwrap();
        assert_eq!(decoded.engine_errors, vec!["Nonexistent template"]);
        assert!(decoded.results.is_empty());
        let err = decoded.engine_error().unwrap();
        assert!(err.to_string().contains("Nonexistent template"));
    }

    #[test]
    fn test_all_engine_errors_collected() {
        let decoded = decode("PRIMER_ERROR=first\nPRIMER_ERROR=second\n").unwrap();
        assert_eq!(decoded.engine_errors.len(), 2);
    }

    #[test]
    fn test_malformed_number_names_line() {
        let err = decode("PRIMER_PAIR_0_PENALTY=0.5\nPRIMER_LEFT_0_TM=hot\n").unwrap_err();
        match err {
            DesignError::Decode {
                line_number, line, ..
            } => {
                assert_eq!(line_number, 2);
                assert_eq!(line, "PRIMER_LEFT_0_TM=hot");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(decode("PRIMER_LEFT_0=5\n").is_err());
    }

    #[test]
    fn test_explain_decode() {
        let counts = parse_explain("considered 42, too many Ns 3, ok 10").unwrap();
        assert_eq!(
            counts.0,
            vec![
                ("considered".to_string(), 42),
                ("too many Ns".to_string(), 3),
                ("ok".to_string(), 10)
            ]
        );
        assert_eq!(counts.get("high tm"), 0);
        assert_eq!(parse_explain("").unwrap(), ExplainCounts::default());
        assert!(parse_explain("considered many").is_err());
    }

    #[test]
    fn test_internal_oligo_keys() {
        let raw = "PRIMER_PAIR_0_PENALTY=1\nPRIMER_INTERNAL_0=40,22\nPRIMER_INTERNAL_OLIGO_EXPLAIN=considered 5, ok 1\n";
        let decoded = decode(raw).unwrap();
        assert_eq!(
            decoded.results[0].probe.as_ref().and_then(OligoRecord::span),
            Some(Span::new(40, 22))
        );
        assert_eq!(decoded.explain[&Role::Internal].get("considered"), 5);
    }

    #[test]
    fn test_explanation_summary_columns() {
        let decoded = decode(TWO_PAIRS).unwrap();
        let roles = RoleSelection {
            left: RoleInput::picked(),
            right: RoleInput::supplied("GATCGATCGGCATCGATCGA"),
            probe: RoleInput::default(),
        };
        let summary = ExplanationSummary::build(&decoded, &roles);
        assert_eq!(summary.columns.len(), 2);
        let rows: Vec<_> = summary.rows().collect();
        assert_eq!(rows.len(), 13);
        assert_eq!(rows[0].0, "considered");
        assert_eq!(rows[0].1[0], &ExplainCell::Count(42));
        assert_eq!(rows[0].1[1], &ExplainCell::Provided);
        assert_eq!(rows[1].1[0].to_string(), "3");
        assert_eq!(rows[12].1[0], &ExplainCell::Count(10));

        let with_probe = RoleSelection {
            probe: RoleInput::picked(),
            ..roles
        };
        let summary = ExplanationSummary::build(&decoded, &with_probe);
        assert_eq!(summary.columns[2].role, Role::Internal);
        assert!(summary.columns[2].cells.iter().all(|c| *c == ExplainCell::Count(0)));
    }
}
