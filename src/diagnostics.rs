//! Triage of a design before and after the engine ran.
//!
//! Every check always runs; the worst severity found decides the overall
//! state.

use crate::{
    parameters::{Bounds, DesignParameters, EngineValue, OligoConditions},
    primer3_output::DecodedOutput,
};
use primerdesk_protocol::{Finding, FindingCategory, Role, Triage};
use serde::{Deserialize, Serialize};

pub const NO_SEQUENCE: &str = "No sequence provided. Please enter a DNA sequence.";
pub const MISSING_ROLES: &str = "One or both primer sequences are missing and the corresponding \
     'Pick' option is not selected. Please provide primer sequences or select the 'Pick' option.";
pub const UNPAIRED_PRIMER: &str =
    "You must provide both primer sequences or select to pick the missing primer.";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub findings: Vec<Finding>,
    pub triage: Triage,
}

impl Diagnostics {
    pub fn new(findings: Vec<Finding>) -> Self {
        let triage = Triage::from_findings(&findings);
        Self { findings, triage }
    }

    pub fn is_blocking(&self) -> bool {
        self.triage == Triage::BlockingError
    }

    pub fn in_category(&self, category: FindingCategory) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.category == category)
    }
}

/// Runs all checks. Result checks are skipped when there is no decoded
/// output yet.
pub fn classify(params: &DesignParameters, decoded: Option<&DecodedOutput>) -> Diagnostics {
    let mut findings = check_configuration(params);
    findings.extend(check_missing_input(params));
    if let Some(decoded) = decoded {
        findings.extend(check_results(params, decoded));
    }
    Diagnostics::new(findings)
}

fn check_bounds<T: PartialOrd + Copy + EngineValue>(
    findings: &mut Vec<Finding>,
    oligo: &str,
    quantity: &str,
    bounds: &Bounds<T>,
) {
    if !bounds.opt_within() {
        findings.push(Finding::minor(
            FindingCategory::Configuration,
            format!(
                "Optimal {oligo} {quantity} ({}) should be between minimum ({}) and maximum ({}) {quantity}.",
                bounds.opt.to_engine(),
                bounds.min.to_engine(),
                bounds.max.to_engine()
            ),
        ));
    }
}

fn check_oligo(findings: &mut Vec<Finding>, oligo: &str, conditions: &OligoConditions) {
    check_bounds(findings, oligo, "size", &conditions.size);
    check_bounds(findings, oligo, "Tm", &conditions.tm);
    check_bounds(findings, oligo, "GC%", &conditions.gc_percent);
}

/// Settings that are inconsistent but still let the engine run.
pub fn check_configuration(params: &DesignParameters) -> Vec<Finding> {
    let mut ret = vec![];
    check_oligo(&mut ret, "primer", &params.primer.oligo);
    check_oligo(&mut ret, "probe", &params.probe.oligo);

    for role in Role::ALL {
        let input = params.roles.get(role);
        if !input.is_supplied() {
            continue;
        }
        let size = match role {
            Role::Internal => params.probe.oligo.size,
            _ => params.primer.oligo.size,
        };
        let len = input.sequence.trim().len();
        if len < size.min as usize || len > size.max as usize {
            ret.push(
                Finding::minor(
                    FindingCategory::Configuration,
                    format!(
                        "Supplied {} length ({len}) is outside the size range {}-{}.",
                        role.display_name(),
                        size.min,
                        size.max
                    ),
                )
                .with_role(role),
            );
        }
    }

    let ranges = params.product_size_ranges();
    if ranges.ranges.is_empty() && ranges.invalid_tokens.is_empty() {
        ret.push(Finding::minor(
            FindingCategory::Configuration,
            "No product size range given.",
        ));
    }
    for token in &ranges.invalid_tokens {
        ret.push(Finding::minor(
            FindingCategory::Configuration,
            format!("Product size range '{token}' is not a valid 'start-end' range."),
        ));
    }
    ret
}

/// Inputs the engine cannot do without.
pub fn check_missing_input(params: &DesignParameters) -> Vec<Finding> {
    let mut ret = vec![];
    if params.sequence.trim().is_empty() {
        ret.push(Finding::blocking(FindingCategory::MissingInput, NO_SEQUENCE));
    }
    let roles = &params.roles;
    if !roles.left.is_selected() || !roles.right.is_selected() {
        ret.push(Finding::blocking(FindingCategory::MissingInput, MISSING_ROLES));
    }
    for (supplied, missing) in [(Role::Left, Role::Right), (Role::Right, Role::Left)] {
        if roles.get(supplied).is_supplied() && !roles.get(missing).is_selected() {
            ret.push(
                Finding::blocking(FindingCategory::MissingInput, UNPAIRED_PRIMER)
                    .with_role(missing),
            );
        }
    }
    ret
}

/// Findings from a decoded engine run.
pub fn check_results(params: &DesignParameters, decoded: &DecodedOutput) -> Vec<Finding> {
    let mut ret: Vec<Finding> = decoded
        .engine_errors
        .iter()
        .map(|e| Finding::blocking(FindingCategory::Engine, format!("Primer3 Error: {e}")))
        .collect();

    for role in Role::ALL {
        if !params.roles.get(role).is_supplied() {
            continue;
        }
        for warning in &decoded.warnings {
            if warning.to_ascii_lowercase().contains(role.warning_phrase()) {
                ret.push(
                    Finding::minor(
                        FindingCategory::Engine,
                        format!("{} warning: {warning}", role.display_name()),
                    )
                    .with_role(role),
                );
            }
        }
    }

    let ranges = params.product_size_ranges();
    for result in &decoded.results {
        if let Some(size) = result.pair.product_size {
            if !ranges.ranges.is_empty() && !ranges.allows(size) {
                ret.push(
                    Finding::minor(
                        FindingCategory::Result,
                        format!(
                            "Product size {size} is outside the allowed range(s): {}",
                            params.product_size_range.trim()
                        ),
                    )
                    .with_result(result.index),
                );
            }
        }
        for role in Role::ALL {
            let Some(problems) = result
                .oligo(role)
                .and_then(|o| o.problems.as_deref())
                .map(str::trim)
                .filter(|p| !p.is_empty())
            else {
                continue;
            };
            ret.push(
                Finding::minor(
                    FindingCategory::Result,
                    format!("Problem {}: {problems}", role.display_name()),
                )
                .with_role(role)
                .with_result(result.index),
            );
        }
    }
    ret
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{primer3_output::decode, task::RoleInput};
    use primerdesk_protocol::Severity;

    fn ready() -> DesignParameters {
        let mut p = DesignParameters::default()
            .with_template(&"ACGT".repeat(50))
            .unwrap();
        p.roles.left = RoleInput::picked();
        p.roles.right = RoleInput::picked();
        p
    }

    #[test]
    fn test_clean_configuration_is_ok() {
        let d = classify(&ready(), None);
        assert!(d.findings.is_empty(), "{:?}", d.findings);
        assert_eq!(d.triage, Triage::Ok);
    }

    #[test]
    fn test_optimal_size_outside_bounds() {
        let mut p = ready();
        p.primer.oligo.size.opt = 15;
        let d = classify(&p, None);
        assert_eq!(d.findings.len(), 1);
        assert_eq!(
            d.findings[0].message,
            "Optimal primer size (15) should be between minimum (18) and maximum (27) size."
        );
        assert_eq!(d.findings[0].severity, Severity::Minor);
        assert_eq!(d.triage, Triage::MinorWarning);
    }

    #[test]
    fn test_float_bounds_message() {
        let mut p = ready();
        p.probe.oligo.tm.opt = 70.0;
        let d = classify(&p, None);
        assert_eq!(
            d.findings[0].message,
            "Optimal probe Tm (70.0) should be between minimum (57.0) and maximum (63.0) Tm."
        );
    }

    #[test]
    fn test_empty_template_blocks() {
        let mut p = ready();
        p.sequence.clear();
        let d = classify(&p, None);
        assert!(d.is_blocking());
        assert_eq!(d.in_category(FindingCategory::MissingInput).count(), 1);
    }

    #[test]
    fn test_fallback_task_blocks() {
        let mut p = ready();
        p.roles.left = RoleInput::default();
        p.roles.right = RoleInput::default();
        let d = classify(&p, None);
        assert!(d.is_blocking());
        assert_eq!(d.findings[0].message, MISSING_ROLES);
    }

    #[test]
    fn test_left_literal_without_right_blocks() {
        let mut p = ready();
        p.roles.left = RoleInput::supplied("ACGTACGTACGTACGTACGT");
        p.roles.right = RoleInput::default();
        let d = classify(&p, None);
        assert!(d.is_blocking());
        let messages: Vec<&str> = d
            .in_category(FindingCategory::MissingInput)
            .map(|f| f.message.as_str())
            .collect();
        assert_eq!(messages, vec![MISSING_ROLES, UNPAIRED_PRIMER]);
        let unpaired = d
            .in_category(FindingCategory::MissingInput)
            .find(|f| f.message == UNPAIRED_PRIMER)
            .unwrap();
        assert_eq!(unpaired.role, Some(Role::Right));
    }

    #[test]
    fn test_single_picked_primer_blocks() {
        let mut p = ready();
        p.roles.right = RoleInput::default();
        let d = classify(&p, None);
        assert!(d.is_blocking());
        assert_eq!(d.findings.len(), 1);
        assert_eq!(d.findings[0].message, MISSING_ROLES);
    }

    #[test]
    fn test_internal_oligo_only_design_blocks() {
        let mut p = ready();
        p.roles.left = RoleInput::default();
        p.roles.right = RoleInput::default();
        p.roles.probe = RoleInput::picked();
        let d = classify(&p, None);
        assert!(d.is_blocking());
        assert_eq!(d.findings[0].message, MISSING_ROLES);
        assert_eq!(d.findings[0].severity, Severity::Blocking);
    }

    #[test]
    fn test_supplied_literal_length() {
        let mut p = ready();
        p.roles.left = RoleInput::supplied("ACGTACGT");
        let d = classify(&p, None);
        assert_eq!(d.triage, Triage::MinorWarning);
        assert_eq!(d.findings[0].role, Some(Role::Left));
    }

    #[test]
    fn test_product_size_range_tokens() {
        let mut p = ready();
        p.product_size_range = "100-200 big".to_string();
        assert_eq!(check_configuration(&p).len(), 1);
        p.product_size_range = "  ".to_string();
        let findings = check_configuration(&p);
        assert_eq!(findings[0].message, "No product size range given.");
    }

    #[test]
    fn test_engine_error_blocks() {
        let decoded = decode("PRIMER_ERROR=Nonexistent template\n=\n").unwrap();
        let d = classify(&ready(), Some(&decoded));
        assert!(d.is_blocking());
        assert_eq!(d.findings[0].message, "Primer3 Error: Nonexistent template");
    }

    #[test]
    fn test_result_findings() {
        let mut p = ready();
        p.product_size_range = "100-150".to_string();
        p.roles.left = RoleInput::supplied("ACGTACGTACGTACGTACGT");
        let raw = "PRIMER_WARNING=Specified left primer has high Tm
PRIMER_WARNING=Unrelated engine note
PRIMER_PAIR_0_PENALTY=1.0
PRIMER_PAIR_0_PRODUCT_SIZE=120
PRIMER_PAIR_1_PENALTY=2.0
PRIMER_PAIR_1_PRODUCT_SIZE=180
PRIMER_RIGHT_1_PROBLEMS=Tm too low
PRIMER_LEFT_1_PROBLEMS=
=
";
        let decoded = decode(raw).unwrap();
        let d = classify(&p, Some(&decoded));
        let messages: Vec<&str> = d.findings.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Left Primer warning: Specified left primer has high Tm",
                "Product size 180 is outside the allowed range(s): 100-150",
                "Problem Right Primer: Tm too low",
            ]
        );
        assert_eq!(d.findings[1].result_index, Some(1));
        assert_eq!(d.triage, Triage::MinorWarning);
    }

    #[test]
    fn test_warnings_ignored_for_picked_roles() {
        let decoded = decode("PRIMER_WARNING=Specified left primer has high Tm\n").unwrap();
        assert!(check_results(&ready(), &decoded).is_empty());
    }
}
