//! One design run from parameters to report.

use crate::{
    diagnostics::{classify, Diagnostics},
    error::DesignError,
    parameters::DesignParameters,
    primer3_input::{to_boulder_io, write_input_file},
    primer3_output::{decode, DecodedOutput},
    primer3_runner::Primer3Runner,
    report_export::DesignReport,
};
use log::{info, warn};
use std::path::Path;

#[derive(Clone, Debug)]
pub struct DesignOutcome {
    /// `None` when missing input kept the engine from running.
    pub raw_output: Option<String>,
    pub decoded: DecodedOutput,
    pub diagnostics: Diagnostics,
    pub report: DesignReport,
    /// Non-fatal failures, such as an unwritable input copy.
    pub notices: Vec<String>,
}

impl DesignOutcome {
    pub fn engine_error(&self) -> Option<DesignError> {
        self.decoded.engine_error()
    }
}

/// Decodes a captured engine output against the parameters it was run with.
pub fn evaluate(params: &DesignParameters, raw_output: &str) -> Result<DesignOutcome, DesignError> {
    let decoded = decode(raw_output)?;
    let diagnostics = classify(params, Some(&decoded));
    let report = DesignReport::build(params, &decoded, &diagnostics);
    Ok(DesignOutcome {
        raw_output: Some(raw_output.to_string()),
        decoded,
        diagnostics,
        report,
        notices: vec![],
    })
}

/// Runs the engine unless the configuration is missing required input.
/// Launch, exit, timeout and decode failures are returned as errors.
pub fn run_design(
    params: &DesignParameters,
    runner: &Primer3Runner,
    save_input: Option<&Path>,
) -> Result<DesignOutcome, DesignError> {
    let pre = classify(params, None);
    if pre.is_blocking() {
        info!("Not running the engine: {} finding(s) block the design", pre.findings.len());
        let decoded = DecodedOutput::default();
        let report = DesignReport::build(params, &decoded, &pre);
        return Ok(DesignOutcome {
            raw_output: None,
            decoded,
            diagnostics: pre,
            report,
            notices: vec![],
        });
    }

    let input = to_boulder_io(params);
    let mut notices = vec![];
    if let Some(path) = save_input {
        if let Err(e) = write_input_file(params, path) {
            warn!("{e}");
            notices.push(e.to_string());
        } else {
            info!("Saved engine input to {}", path.display());
        }
    }

    let raw = runner.run(&input)?;
    let mut outcome = evaluate(params, &raw)?;
    outcome.notices = notices;
    Ok(outcome)
}
