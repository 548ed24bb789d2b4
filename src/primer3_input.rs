//! Boulder-IO input for `primer3_core`.
//!
//! The layout mirrors the engine's full settings file: user options are
//! interleaved with fixed engine settings in a stable order, and the record
//! ends with a lone `=` line. The same text is the saved parameter file.

use crate::{
    error::DesignError,
    parameters::{format_engine_region, parameter_field, DesignParameters, PARAMETER_FIELDS},
};
use std::{collections::HashMap, fs, path::Path};

#[derive(Clone, Copy, Debug)]
enum Source {
    /// Taken from [`DesignParameters`].
    User,
    Fixed(&'static str),
}

use Source::{Fixed, User};

const TEMPLATE: &[(&str, Source)] = &[
    ("SEQUENCE_ID", User),
    ("SEQUENCE_TEMPLATE", User),
    ("SEQUENCE_PRIMER", User),
    ("SEQUENCE_PRIMER_REVCOMP", User),
    ("SEQUENCE_INTERNAL_OLIGO", User),
    ("PRIMER_THERMODYNAMIC_OLIGO_ALIGNMENT", Fixed("0")),
    ("PRIMER_THERMODYNAMIC_TEMPLATE_ALIGNMENT", Fixed("0")),
    ("PRIMER_TASK", User),
    ("PRIMER_PICK_LEFT_PRIMER", User),
    ("PRIMER_PICK_INTERNAL_OLIGO", User),
    ("PRIMER_PICK_RIGHT_PRIMER", User),
    ("PRIMER_NUM_RETURN", User),
    ("PRIMER_MIN_5_PRIME_OVERLAP_OF_JUNCTION", Fixed("5")),
    ("PRIMER_PRODUCT_SIZE_RANGE", User),
    ("PRIMER_PRODUCT_OPT_SIZE", Fixed("0")),
    ("PRIMER_PAIR_WT_PRODUCT_SIZE_LT", Fixed("0.0")),
    ("PRIMER_PAIR_WT_PRODUCT_SIZE_GT", Fixed("0.0")),
    ("PRIMER_MIN_SIZE", User),
    ("PRIMER_INTERNAL_MIN_SIZE", User),
    ("PRIMER_OPT_SIZE", User),
    ("PRIMER_INTERNAL_OPT_SIZE", User),
    ("PRIMER_MAX_SIZE", User),
    ("PRIMER_INTERNAL_MAX_SIZE", User),
    ("PRIMER_WT_SIZE_LT", Fixed("1.0")),
    ("PRIMER_INTERNAL_WT_SIZE_LT", Fixed("1.0")),
    ("PRIMER_WT_SIZE_GT", Fixed("1.0")),
    ("PRIMER_INTERNAL_WT_SIZE_GT", Fixed("1.0")),
    ("PRIMER_MIN_GC", User),
    ("PRIMER_INTERNAL_MIN_GC", User),
    ("PRIMER_OPT_GC_PERCENT", User),
    ("PRIMER_INTERNAL_OPT_GC_PERCENT", User),
    ("PRIMER_MAX_GC", User),
    ("PRIMER_INTERNAL_MAX_GC", User),
    ("PRIMER_WT_GC_PERCENT_LT", Fixed("0.0")),
    ("PRIMER_INTERNAL_WT_GC_PERCENT_LT", Fixed("0.0")),
    ("PRIMER_WT_GC_PERCENT_GT", Fixed("0.0")),
    ("PRIMER_INTERNAL_WT_GC_PERCENT_GT", Fixed("0.0")),
    ("PRIMER_GC_CLAMP", User),
    ("PRIMER_MAX_END_GC", Fixed("5")),
    ("PRIMER_MIN_TM", User),
    ("PRIMER_INTERNAL_MIN_TM", User),
    ("PRIMER_OPT_TM", User),
    ("PRIMER_INTERNAL_OPT_TM", User),
    ("PRIMER_MAX_TM", User),
    ("PRIMER_INTERNAL_MAX_TM", User),
    ("PRIMER_PAIR_MAX_DIFF_TM", User),
    ("PRIMER_TM_SANTALUCIA", User),
    ("PRIMER_WT_TM_LT", Fixed("1.0")),
    ("PRIMER_INTERNAL_WT_TM_LT", Fixed("1.0")),
    ("PRIMER_WT_TM_GT", Fixed("1.0")),
    ("PRIMER_INTERNAL_WT_TM_GT", Fixed("1.0")),
    ("PRIMER_PAIR_WT_DIFF_TM", Fixed("0.0")),
    ("PRIMER_PRODUCT_MIN_TM", User),
    ("PRIMER_PRODUCT_OPT_TM", User),
    ("PRIMER_PRODUCT_MAX_TM", User),
    ("PRIMER_INTERNAL_OLIGO_MIN_QUALITY", User),
    ("PRIMER_INTERNAL_OLIGO_SALT_CONC", User),
    ("PRIMER_INTERNAL_OLIGO_DIVALENT_CONC", User),
    ("PRIMER_PAIR_WT_PRODUCT_TM_LT", Fixed("0.0")),
    ("PRIMER_PAIR_WT_PRODUCT_TM_GT", Fixed("0.0")),
    ("PRIMER_TM_FORMULA", Fixed("0")),
    ("PRIMER_SALT_MONOVALENT", Fixed("50.0")),
    ("PRIMER_INTERNAL_SALT_MONOVALENT", Fixed("50.0")),
    ("PRIMER_SALT_DIVALENT", Fixed("0.0")),
    ("PRIMER_INTERNAL_SALT_DIVALENT", Fixed("0.0")),
    ("PRIMER_DNTP_CONC", User),
    ("PRIMER_INTERNAL_DNTP_CONC", User),
    ("PRIMER_SALT_CONC", User),
    ("PRIMER_SALT_CORRECTIONS", User),
    ("PRIMER_DIVALENT_CONC", User),
    ("PRIMER_DNA_CONC", User),
    ("PRIMER_INTERNAL_DNA_CONC", User),
    ("PRIMER_MAX_SELF_ANY", User),
    ("PRIMER_INTERNAL_MAX_SELF_ANY", User),
    ("PRIMER_PAIR_MAX_COMPL_ANY", Fixed("8.00")),
    ("PRIMER_WT_SELF_ANY", Fixed("0.0")),
    ("PRIMER_INTERNAL_WT_SELF_ANY", Fixed("0.0")),
    ("PRIMER_PAIR_WT_COMPL_ANY", Fixed("0.0")),
    ("PRIMER_MAX_SELF_END", User),
    ("PRIMER_INTERNAL_MAX_SELF_END", User),
    ("PRIMER_PAIR_MAX_COMPL_END", Fixed("3.00")),
    ("PRIMER_WT_SELF_END", Fixed("0.0")),
    ("PRIMER_INTERNAL_WT_SELF_END", Fixed("0.0")),
    ("PRIMER_PAIR_WT_COMPL_END", Fixed("0.0")),
    ("PRIMER_MAX_END_STABILITY", User),
    ("PRIMER_WT_END_STABILITY", Fixed("0.0")),
    ("PRIMER_MAX_NS_ACCEPTED", User),
    ("PRIMER_INTERNAL_MAX_NS_ACCEPTED", User),
    ("PRIMER_MAX_POLY_X", User),
    ("PRIMER_INTERNAL_MAX_POLY_X", User),
    ("PRIMER_MIN_THREE_PRIME_DISTANCE", Fixed("-1")),
    ("PRIMER_PICK_ANYWAY", Fixed("1")),
    ("PRIMER_LOWERCASE_MASKING", User),
    ("PRIMER_EXPLAIN_FLAG", Fixed("1")),
    ("PRIMER_LIBERAL_BASE", User),
    ("PRIMER_FIRST_BASE_INDEX", User),
    ("PRIMER_MAX_MISPRIMING", User),
    ("PRIMER_PAIR_MAX_MISPRIMING", User),
    ("PRIMER_MAX_TEMPLATE_MISPRIMING", User),
    ("PRIMER_PAIR_MAX_TEMPLATE_MISPRIMING", User),
    ("PRIMER_WT_TEMPLATE_MISPRIMING", Fixed("0.0")),
    ("PRIMER_PAIR_WT_TEMPLATE_MISPRIMING", Fixed("0.0")),
    ("PRIMER_LIB_AMBIGUITY_CODES_CONSENSUS", User),
    ("PRIMER_MAX_LIBRARY_MISPRIMING", Fixed("12.00")),
    ("PRIMER_INTERNAL_MAX_LIBRARY_MISHYB", Fixed("12.00")),
    ("PRIMER_PAIR_MAX_LIBRARY_MISPRIMING", Fixed("24.00")),
    ("PRIMER_WT_LIBRARY_MISPRIMING", Fixed("0.0")),
    ("PRIMER_INTERNAL_WT_LIBRARY_MISHYB", Fixed("0.0")),
    ("PRIMER_PAIR_WT_LIBRARY_MISPRIMING", Fixed("0.0")),
    ("PRIMER_MIN_QUALITY", Fixed("0")),
    ("PRIMER_INTERNAL_MIN_QUALITY", Fixed("0")),
    ("PRIMER_MIN_END_QUALITY", Fixed("0")),
    ("PRIMER_QUALITY_RANGE_MIN", Fixed("0")),
    ("PRIMER_QUALITY_RANGE_MAX", Fixed("100")),
    ("PRIMER_WT_SEQ_QUAL", Fixed("0.0")),
    ("PRIMER_INTERNAL_WT_SEQ_QUAL", Fixed("0.0")),
    ("PRIMER_PAIR_WT_PR_PENALTY", Fixed("1.0")),
    ("PRIMER_PAIR_WT_IO_PENALTY", Fixed("0.0")),
    ("PRIMER_INSIDE_PENALTY", User),
    ("PRIMER_OUTSIDE_PENALTY", User),
    ("PRIMER_WT_POS_PENALTY", Fixed("0.0")),
    ("PRIMER_SEQUENCING_LEAD", Fixed("50")),
    ("PRIMER_SEQUENCING_SPACING", Fixed("500")),
    ("PRIMER_SEQUENCING_INTERVAL", Fixed("250")),
    ("PRIMER_SEQUENCING_ACCURACY", Fixed("20")),
    ("PRIMER_WT_END_QUAL", Fixed("0.0")),
    ("PRIMER_INTERNAL_WT_END_QUAL", Fixed("0.0")),
    ("SEQUENCE_TARGET", User),
    ("EXCLUDED_REGION", User),
];

/// Value for a user key, `None` when the line is left out.
fn user_value(params: &DesignParameters, key: &str) -> Option<String> {
    let non_empty = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_string())
    };
    let first_base_index = params.primer.first_base_index;
    match key {
        "SEQUENCE_ID" => Some(params.seq_id.clone()),
        "SEQUENCE_TEMPLATE" => Some(params.sequence.clone()),
        "SEQUENCE_PRIMER" => non_empty(&params.roles.left.sequence),
        "SEQUENCE_PRIMER_REVCOMP" => non_empty(&params.roles.right.sequence),
        "SEQUENCE_INTERNAL_OLIGO" => non_empty(&params.roles.probe.sequence),
        "PRIMER_TASK" => Some(params.task().as_str().to_string()),
        "PRIMER_PRODUCT_SIZE_RANGE" => Some(params.product_size_range.trim().to_string()),
        "SEQUENCE_TARGET" => params
            .target
            .as_ref()
            .map(|span| format_engine_region(span, first_base_index)),
        "EXCLUDED_REGION" => params
            .excluded_region
            .as_ref()
            .map(|span| format_engine_region(span, first_base_index)),
        _ => parameter_field(key).map(|field| (field.get)(params)),
    }
}

pub fn to_boulder_io(params: &DesignParameters) -> String {
    let mut ret = String::new();
    for (key, source) in TEMPLATE {
        let value = match source {
            Fixed(value) => Some(value.to_string()),
            User => user_value(params, key),
        };
        if let Some(value) = value {
            ret.push_str(key);
            ret.push('=');
            ret.push_str(&value);
            ret.push('\n');
        }
    }
    ret.push_str("=\n");
    ret
}

/// `KEY=VALUE` pairs in file order. Lines without `=` and the record
/// terminator are skipped.
pub fn parse_boulder_io(text: &str) -> Vec<(String, String)> {
    text.lines()
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            (!key.is_empty()).then(|| (key.to_string(), value.trim().to_string()))
        })
        .collect()
}

impl DesignParameters {
    /// Rebuilds parameters from a saved input file. Every required numeric
    /// option must be present and non-blank.
    pub fn from_saved(entries: &[(String, String)]) -> Result<Self, DesignError> {
        let map: HashMap<&str, &str> = entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        // Keys absent from the file keep their defaults.
        let mut ret = Self::default();
        for field in PARAMETER_FIELDS.iter().filter(|f| f.required) {
            if !map.contains_key(field.key) {
                return Err(DesignError::ParameterFile {
                    key: field.key.to_string(),
                    value: String::new(),
                    reason: "missing from saved file".to_string(),
                });
            }
        }
        // First base index before regions, which depend on it.
        if let Some(value) = map.get("PRIMER_FIRST_BASE_INDEX") {
            ret.apply("PRIMER_FIRST_BASE_INDEX", value)?;
        }
        for (key, value) in entries {
            ret.apply(key, value)?;
        }
        for (key, role) in [
            ("PRIMER_PICK_LEFT_PRIMER", &mut ret.roles.left),
            ("PRIMER_PICK_RIGHT_PRIMER", &mut ret.roles.right),
            ("PRIMER_PICK_INTERNAL_OLIGO", &mut ret.roles.probe),
        ] {
            if !map.contains_key(key) {
                role.pick = !role.is_supplied();
            }
        }
        Ok(ret)
    }

    pub fn load_saved(path: &Path) -> Result<Self, DesignError> {
        let text = fs::read_to_string(path).map_err(|e| {
            DesignError::io("Could not read parameter file", path.display().to_string(), e)
        })?;
        Self::from_saved(&parse_boulder_io(&text))
    }
}

pub fn write_input_file(params: &DesignParameters, path: &Path) -> Result<(), DesignError> {
    fs::write(path, to_boulder_io(params)).map_err(|e| {
        DesignError::io("Could not write input file", path.display().to_string(), e)
    })
}
