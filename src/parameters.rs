//! The configuration record handed to Primer3.
//!
//! Every user-facing engine option lives in [`DesignParameters`]. The
//! [`PARAMETER_FIELDS`] table ties each option to its engine key so that
//! serialization, saved-file re-ingestion and `KEY=VALUE` overrides share one
//! source of truth.

use crate::{
    error::DesignError,
    sequence_template::parse_template,
    task::{PrimerTask, RoleSelection},
};
use primerdesk_protocol::Span;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PRODUCT_SIZE_RANGE: &str =
    "100-300 150-250 301-400 401-500 501-600 601-700 701-850 851-1000";

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds<T> {
    pub min: T,
    pub opt: T,
    pub max: T,
}

impl<T: PartialOrd + Copy> Bounds<T> {
    pub fn new(min: T, opt: T, max: T) -> Self {
        Self { min, opt, max }
    }

    pub fn opt_within(&self) -> bool {
        self.opt >= self.min && self.opt <= self.max
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TmTable {
    #[default]
    Breslauer1986,
    SantaLucia1998,
}

impl TmTable {
    pub fn code(self) -> u8 {
        match self {
            Self::Breslauer1986 => 0,
            Self::SantaLucia1998 => 1,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Breslauer1986),
            1 => Some(Self::SantaLucia1998),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaltCorrection {
    #[default]
    Schildkraut1965,
    SantaLucia1998,
    Owczarzy2004,
}

impl SaltCorrection {
    pub fn code(self) -> u8 {
        match self {
            Self::Schildkraut1965 => 0,
            Self::SantaLucia1998 => 1,
            Self::Owczarzy2004 => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Schildkraut1965),
            1 => Some(Self::SantaLucia1998),
            2 => Some(Self::Owczarzy2004),
            _ => None,
        }
    }
}

/// Constraints shared by primers and the probe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OligoConditions {
    pub size: Bounds<u32>,
    pub tm: Bounds<f64>,
    pub gc_percent: Bounds<f64>,
    pub max_self_any: f64,
    pub max_self_end: f64,
    pub max_ns: u32,
    pub max_poly_x: u32,
    pub salt_monovalent: f64,
    pub salt_divalent: f64,
    pub dna_conc: f64,
    pub dntp_conc: f64,
}

impl Default for OligoConditions {
    fn default() -> Self {
        Self {
            size: Bounds::new(18, 20, 27),
            tm: Bounds::new(57.0, 60.0, 63.0),
            gc_percent: Bounds::new(20.0, 50.0, 80.0),
            max_self_any: 8.0,
            max_self_end: 3.0,
            max_ns: 0,
            max_poly_x: 5,
            salt_monovalent: 50.0,
            salt_divalent: 0.0,
            dna_conc: 50.0,
            dntp_conc: 0.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrimerSettings {
    pub oligo: OligoConditions,
    pub product_tm: Bounds<f64>,
    pub max_tm_diff: f64,
    pub tm_table: TmTable,
    pub inside_penalty: f64,
    pub outside_penalty: f64,
    pub first_base_index: i64,
    pub gc_clamp: u32,
    pub salt_correction: SaltCorrection,
    pub liberal_base: bool,
    pub ambiguity_codes_consensus: bool,
    pub lowercase_masking: bool,
}

impl Default for PrimerSettings {
    fn default() -> Self {
        Self {
            oligo: OligoConditions::default(),
            product_tm: Bounds::new(-1_000_000.0, 0.0, 1_000_000.0),
            max_tm_diff: 100.0,
            tm_table: TmTable::default(),
            inside_penalty: -1.0,
            outside_penalty: 0.0,
            first_base_index: 1,
            gc_clamp: 0,
            salt_correction: SaltCorrection::default(),
            liberal_base: true,
            ambiguity_codes_consensus: false,
            lowercase_masking: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProbeSettings {
    pub oligo: OligoConditions,
    pub min_quality: f64,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            oligo: OligoConditions {
                max_self_any: 12.0,
                max_self_end: 12.0,
                ..OligoConditions::default()
            },
            min_quality: 0.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignParameters {
    pub seq_id: String,
    /// Template with whitespace and annotation markers removed.
    pub sequence: String,
    /// 0-based.
    pub target: Option<Span>,
    /// 0-based.
    pub excluded_region: Option<Span>,
    pub roles: RoleSelection,
    pub product_size_range: String,
    pub num_return: u32,
    pub max_repeat_mispriming: f64,
    pub pair_max_repeat_mispriming: f64,
    pub max_template_mispriming: f64,
    pub pair_max_template_mispriming: f64,
    pub max_end_stability: f64,
    pub primer: PrimerSettings,
    pub probe: ProbeSettings,
}

impl Default for DesignParameters {
    fn default() -> Self {
        Self {
            seq_id: "example sequence".to_string(),
            sequence: String::new(),
            target: None,
            excluded_region: None,
            roles: RoleSelection::default(),
            product_size_range: DEFAULT_PRODUCT_SIZE_RANGE.to_string(),
            num_return: 5,
            max_repeat_mispriming: 12.0,
            pair_max_repeat_mispriming: 24.0,
            max_template_mispriming: 12.0,
            pair_max_template_mispriming: 24.0,
            max_end_stability: 9.0,
            primer: PrimerSettings::default(),
            probe: ProbeSettings::default(),
        }
    }
}

impl DesignParameters {
    /// Takes a raw template that may carry `[target]` and `<excluded>`
    /// markers. Regions found inline replace manually set ones.
    pub fn with_template(mut self, raw: &str) -> Result<Self, DesignError> {
        let annotated = parse_template(raw)?;
        self.sequence = annotated.sequence;
        if annotated.target.is_some() {
            self.target = annotated.target;
        }
        if annotated.excluded_region.is_some() {
            self.excluded_region = annotated.excluded_region;
        }
        Ok(self)
    }

    pub fn task(&self) -> PrimerTask {
        self.roles.task()
    }

    pub fn product_size_ranges(&self) -> ProductSizeRanges {
        ProductSizeRanges::parse(&self.product_size_range)
    }

    /// Sets one option from its engine key. Returns `Ok(false)` for keys
    /// that are not user options.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<bool, DesignError> {
        let key = key.trim();
        let value = value.trim();
        match key {
            "SEQUENCE_ID" => self.seq_id = value.to_string(),
            "SEQUENCE_TEMPLATE" => {
                let annotated = parse_template(value)?;
                self.sequence = annotated.sequence;
                self.target = annotated.target.or(self.target);
                self.excluded_region = annotated.excluded_region.or(self.excluded_region);
            }
            "SEQUENCE_PRIMER" => self.roles.left.sequence = value.to_string(),
            "SEQUENCE_PRIMER_REVCOMP" => self.roles.right.sequence = value.to_string(),
            "SEQUENCE_INTERNAL_OLIGO" => self.roles.probe.sequence = value.to_string(),
            "PRIMER_PRODUCT_SIZE_RANGE" => self.product_size_range = value.to_string(),
            "SEQUENCE_TARGET" => {
                self.target = parse_engine_region(key, value, self.primer.first_base_index)?;
            }
            "EXCLUDED_REGION" | "SEQUENCE_EXCLUDED_REGION" => {
                self.excluded_region =
                    parse_engine_region(key, value, self.primer.first_base_index)?;
            }
            _ => {
                let Some(field) = parameter_field(key) else {
                    return Ok(false);
                };
                (field.set)(self, value).map_err(|reason| DesignError::ParameterFile {
                    key: key.to_string(),
                    value: value.to_string(),
                    reason,
                })?;
            }
        }
        Ok(true)
    }
}

/// Engine `start,length` (first base index applied) to a 0-based span.
/// Only the first region is used when several are listed.
pub fn parse_engine_region(
    key: &str,
    value: &str,
    first_base_index: i64,
) -> Result<Option<Span>, DesignError> {
    let Some(first) = value.split_whitespace().next() else {
        return Ok(None);
    };
    let err = |reason: &str| DesignError::ParameterFile {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    };
    let (start, length) = first
        .split_once(',')
        .ok_or_else(|| err("expected 'start,length'"))?;
    let start: i64 = start
        .trim()
        .parse()
        .map_err(|_| err("start is not an integer"))?;
    let length: usize = length
        .trim()
        .parse()
        .map_err(|_| err("length is not a non-negative integer"))?;
    Ok(Some(Span::new(start - first_base_index, length)))
}

pub fn format_engine_region(span: &Span, first_base_index: i64) -> String {
    format!("{},{}", span.start + first_base_index, span.length)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeRange {
    pub start: usize,
    pub end: usize,
}

impl SizeRange {
    pub fn contains(&self, size: usize) -> bool {
        self.start <= size && size <= self.end
    }
}

/// Parsed `start-end` tokens. Malformed tokens are kept aside so they can
/// be reported instead of silently dropped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProductSizeRanges {
    pub ranges: Vec<SizeRange>,
    pub invalid_tokens: Vec<String>,
}

impl ProductSizeRanges {
    pub fn parse(text: &str) -> Self {
        let mut ret = Self::default();
        for token in text.split_whitespace() {
            let parsed = token.split_once('-').and_then(|(a, b)| {
                let start = a.trim().parse::<usize>().ok()?;
                let end = b.trim().parse::<usize>().ok()?;
                (start <= end).then_some(SizeRange { start, end })
            });
            match parsed {
                Some(range) => ret.ranges.push(range),
                None => ret.invalid_tokens.push(token.to_string()),
            }
        }
        ret
    }

    pub fn allows(&self, size: usize) -> bool {
        self.ranges.iter().any(|r| r.contains(size))
    }
}

/// Conversion between a typed option and its engine text.
pub trait EngineValue: Sized {
    fn to_engine(&self) -> String;
    fn from_engine(text: &str) -> Result<Self, String>;
}

impl EngineValue for f64 {
    fn to_engine(&self) -> String {
        if self.is_finite() && self.fract() == 0.0 && self.abs() < 1e15 {
            format!("{self:.1}")
        } else {
            format!("{self}")
        }
    }

    fn from_engine(text: &str) -> Result<Self, String> {
        let text = text.trim();
        if text.is_empty() {
            return Err("missing numeric value".to_string());
        }
        text.parse()
            .map_err(|_| format!("'{text}' is not a number"))
    }
}

macro_rules! integer_engine_value {
    ($($t:ty),*) => {$(
        impl EngineValue for $t {
            fn to_engine(&self) -> String {
                self.to_string()
            }

            fn from_engine(text: &str) -> Result<Self, String> {
                let text = text.trim();
                if text.is_empty() {
                    return Err("missing integer value".to_string());
                }
                text.parse()
                    .map_err(|_| format!("'{text}' is not an integer"))
            }
        }
    )*};
}

integer_engine_value!(u32, i64);

impl EngineValue for bool {
    fn to_engine(&self) -> String {
        if *self { "1" } else { "0" }.to_string()
    }

    fn from_engine(text: &str) -> Result<Self, String> {
        match text.trim() {
            "1" => Ok(true),
            "0" => Ok(false),
            "" => Err("missing flag value".to_string()),
            other => Err(format!("'{other}' is not 0 or 1")),
        }
    }
}

impl EngineValue for TmTable {
    fn to_engine(&self) -> String {
        self.code().to_string()
    }

    fn from_engine(text: &str) -> Result<Self, String> {
        let code: u8 = text
            .trim()
            .parse()
            .map_err(|_| format!("'{text}' is not a table code"))?;
        Self::from_code(code).ok_or_else(|| format!("unknown thermodynamic table {code}"))
    }
}

impl EngineValue for SaltCorrection {
    fn to_engine(&self) -> String {
        self.code().to_string()
    }

    fn from_engine(text: &str) -> Result<Self, String> {
        let code: u8 = text
            .trim()
            .parse()
            .map_err(|_| format!("'{text}' is not a formula code"))?;
        Self::from_code(code).ok_or_else(|| format!("unknown salt correction formula {code}"))
    }
}

pub struct ParameterField {
    pub key: &'static str,
    /// Missing or blank values are a hard failure on re-ingestion.
    pub required: bool,
    pub get: fn(&DesignParameters) -> String,
    pub set: fn(&mut DesignParameters, &str) -> Result<(), String>,
}

macro_rules! field {
    ($key:literal, $required:literal, $($path:ident).+) => {
        ParameterField {
            key: $key,
            required: $required,
            get: |p| EngineValue::to_engine(&p.$($path).+),
            set: |p, v| {
                p.$($path).+ = EngineValue::from_engine(v)?;
                Ok(())
            },
        }
    };
}

pub static PARAMETER_FIELDS: &[ParameterField] = &[
    field!("PRIMER_PICK_LEFT_PRIMER", false, roles.left.pick),
    field!("PRIMER_PICK_INTERNAL_OLIGO", false, roles.probe.pick),
    field!("PRIMER_PICK_RIGHT_PRIMER", false, roles.right.pick),
    field!("PRIMER_NUM_RETURN", true, num_return),
    field!("PRIMER_MIN_SIZE", true, primer.oligo.size.min),
    field!("PRIMER_INTERNAL_MIN_SIZE", true, probe.oligo.size.min),
    field!("PRIMER_OPT_SIZE", true, primer.oligo.size.opt),
    field!("PRIMER_INTERNAL_OPT_SIZE", true, probe.oligo.size.opt),
    field!("PRIMER_MAX_SIZE", true, primer.oligo.size.max),
    field!("PRIMER_INTERNAL_MAX_SIZE", true, probe.oligo.size.max),
    field!("PRIMER_MIN_GC", true, primer.oligo.gc_percent.min),
    field!("PRIMER_INTERNAL_MIN_GC", true, probe.oligo.gc_percent.min),
    field!("PRIMER_OPT_GC_PERCENT", true, primer.oligo.gc_percent.opt),
    field!("PRIMER_INTERNAL_OPT_GC_PERCENT", true, probe.oligo.gc_percent.opt),
    field!("PRIMER_MAX_GC", true, primer.oligo.gc_percent.max),
    field!("PRIMER_INTERNAL_MAX_GC", true, probe.oligo.gc_percent.max),
    field!("PRIMER_GC_CLAMP", true, primer.gc_clamp),
    field!("PRIMER_MIN_TM", true, primer.oligo.tm.min),
    field!("PRIMER_INTERNAL_MIN_TM", true, probe.oligo.tm.min),
    field!("PRIMER_OPT_TM", true, primer.oligo.tm.opt),
    field!("PRIMER_INTERNAL_OPT_TM", true, probe.oligo.tm.opt),
    field!("PRIMER_MAX_TM", true, primer.oligo.tm.max),
    field!("PRIMER_INTERNAL_MAX_TM", true, probe.oligo.tm.max),
    field!("PRIMER_PAIR_MAX_DIFF_TM", true, primer.max_tm_diff),
    field!("PRIMER_TM_SANTALUCIA", true, primer.tm_table),
    field!("PRIMER_PRODUCT_MIN_TM", true, primer.product_tm.min),
    field!("PRIMER_PRODUCT_OPT_TM", true, primer.product_tm.opt),
    field!("PRIMER_PRODUCT_MAX_TM", true, primer.product_tm.max),
    field!("PRIMER_INTERNAL_OLIGO_MIN_QUALITY", true, probe.min_quality),
    field!("PRIMER_INTERNAL_OLIGO_SALT_CONC", true, probe.oligo.salt_monovalent),
    field!("PRIMER_INTERNAL_OLIGO_DIVALENT_CONC", true, probe.oligo.salt_divalent),
    field!("PRIMER_DNTP_CONC", true, primer.oligo.dntp_conc),
    field!("PRIMER_INTERNAL_DNTP_CONC", true, probe.oligo.dntp_conc),
    field!("PRIMER_SALT_CONC", true, primer.oligo.salt_monovalent),
    field!("PRIMER_SALT_CORRECTIONS", true, primer.salt_correction),
    field!("PRIMER_DIVALENT_CONC", true, primer.oligo.salt_divalent),
    field!("PRIMER_DNA_CONC", true, primer.oligo.dna_conc),
    field!("PRIMER_INTERNAL_DNA_CONC", true, probe.oligo.dna_conc),
    field!("PRIMER_MAX_SELF_ANY", true, primer.oligo.max_self_any),
    field!("PRIMER_INTERNAL_MAX_SELF_ANY", true, probe.oligo.max_self_any),
    field!("PRIMER_MAX_SELF_END", true, primer.oligo.max_self_end),
    field!("PRIMER_INTERNAL_MAX_SELF_END", true, probe.oligo.max_self_end),
    field!("PRIMER_MAX_END_STABILITY", true, max_end_stability),
    field!("PRIMER_MAX_NS_ACCEPTED", true, primer.oligo.max_ns),
    field!("PRIMER_INTERNAL_MAX_NS_ACCEPTED", true, probe.oligo.max_ns),
    field!("PRIMER_MAX_POLY_X", true, primer.oligo.max_poly_x),
    field!("PRIMER_INTERNAL_MAX_POLY_X", true, probe.oligo.max_poly_x),
    field!("PRIMER_LOWERCASE_MASKING", true, primer.lowercase_masking),
    field!("PRIMER_LIBERAL_BASE", true, primer.liberal_base),
    field!("PRIMER_FIRST_BASE_INDEX", true, primer.first_base_index),
    field!("PRIMER_MAX_MISPRIMING", true, max_repeat_mispriming),
    field!("PRIMER_PAIR_MAX_MISPRIMING", true, pair_max_repeat_mispriming),
    field!("PRIMER_MAX_TEMPLATE_MISPRIMING", true, max_template_mispriming),
    field!("PRIMER_PAIR_MAX_TEMPLATE_MISPRIMING", true, pair_max_template_mispriming),
    field!("PRIMER_LIB_AMBIGUITY_CODES_CONSENSUS", true, primer.ambiguity_codes_consensus),
    field!("PRIMER_INSIDE_PENALTY", true, primer.inside_penalty),
    field!("PRIMER_OUTSIDE_PENALTY", true, primer.outside_penalty),
];

pub fn parameter_field(key: &str) -> Option<&'static ParameterField> {
    PARAMETER_FIELDS.iter().find(|f| f.key == key)
}
