//! Rendering of a finished design as HTML, plain text, CSV, JSON and SVG.

use crate::{
    binding_sites::{annotate, render_block, AnnotatedRow, BindingSpans, LEGEND},
    diagnostics::Diagnostics,
    error::DesignError,
    parameters::DesignParameters,
    primer3_output::{DecodedOutput, ExplanationSummary},
    task::PrimerTask,
};
use itertools::Itertools;
use primerdesk_protocol::{DesignResult, Finding, PairRecord, Role, Span, Triage};
use serde::{Deserialize, Serialize};
use std::{fmt::Write as _, fs, path::Path};
use svg::node::element::path::Data;
use svg::node::element::{Line, Path as SvgPath, Rectangle, Text};
use svg::Document;

const MAP_W: f32 = 1000.0;
const MAP_H: f32 = 170.0;
const MAP_SIDE_MARGIN: f32 = 50.0;
const OLIGO_BLOCK_HEIGHT: f32 = 10.0;
const OLIGO_SIDE_MARGIN: f32 = 22.0;

const OLIGO_HEADERS: [&str; 8] = ["Type", "Start", "Len", "Tm", "GC%", "Any", "3'", "Seq"];
const PRODUCT_HEADERS: [&str; 4] = [
    "Product size",
    "Product Tm",
    "Self complementary",
    "3' end complementary",
];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OligoRow {
    pub role: Role,
    pub start: Option<i64>,
    pub length: Option<usize>,
    pub tm: Option<f64>,
    pub gc_percent: Option<f64>,
    pub self_any: Option<f64>,
    pub self_end: Option<f64>,
    pub sequence: Option<String>,
    pub penalty: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultReport {
    pub index: usize,
    pub oligos: Vec<OligoRow>,
    pub product: PairRecord,
    /// 0-based, for the binding map.
    pub forward: Option<Span>,
    pub reverse: Option<Span>,
    pub probe: Option<Span>,
    pub rows: Vec<AnnotatedRow>,
}

impl ResultReport {
    pub fn title(&self) -> String {
        format!("Result {}", self.index + 1)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DesignReport {
    pub seq_id: String,
    pub task: PrimerTask,
    pub template_length: usize,
    pub target: Option<Span>,
    pub excluded_region: Option<Span>,
    pub triage: Triage,
    pub findings: Vec<Finding>,
    pub engine_errors: Vec<String>,
    pub warnings: Vec<String>,
    pub results: Vec<ResultReport>,
    pub explanation: ExplanationSummary,
    pub pair_explain: Option<String>,
}

fn oligo_row(role: Role, result: &DesignResult) -> OligoRow {
    let oligo = result.oligo(role).cloned().unwrap_or_default();
    OligoRow {
        role,
        start: oligo.start,
        length: oligo.length,
        tm: oligo.tm,
        gc_percent: oligo.gc_percent,
        self_any: oligo.self_any,
        self_end: oligo.self_end,
        sequence: oligo.sequence,
        penalty: oligo.penalty,
    }
}

impl DesignReport {
    pub fn build(
        params: &DesignParameters,
        decoded: &DecodedOutput,
        diagnostics: &Diagnostics,
    ) -> Self {
        let mut roles = vec![Role::Left, Role::Right];
        if params.roles.probe.is_selected() {
            roles.push(Role::Internal);
        }
        let results = decoded
            .results
            .iter()
            .map(|result| {
                let spans = BindingSpans::from_result(
                    result,
                    params.target,
                    params.excluded_region,
                    params.primer.first_base_index,
                );
                ResultReport {
                    index: result.index,
                    oligos: roles.iter().map(|role| oligo_row(*role, result)).collect(),
                    product: result.pair.clone(),
                    forward: spans.forward,
                    reverse: spans.reverse,
                    probe: spans.probe,
                    rows: annotate(&params.sequence, &spans),
                }
            })
            .collect();
        Self {
            seq_id: params.seq_id.clone(),
            task: params.task(),
            template_length: params.sequence.chars().count(),
            target: params.target,
            excluded_region: params.excluded_region,
            triage: diagnostics.triage,
            findings: diagnostics.findings.clone(),
            engine_errors: decoded.engine_errors.clone(),
            warnings: decoded.warnings.clone(),
            results,
            explanation: ExplanationSummary::build(decoded, &params.roles),
            pair_explain: decoded.pair_explain.clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_text(&self) -> String {
        let mut ret = String::new();
        let _ = writeln!(ret, "Primer3 Results - {}", self.seq_id);
        let _ = writeln!(ret, "Task: {}", self.task.as_str());
        let _ = writeln!(ret, "Status: {}\n", self.triage.as_str());
        for f in &self.findings {
            let _ = writeln!(ret, "{}", finding_line(f));
        }
        if !self.findings.is_empty() {
            ret.push('\n');
        }
        for result in &self.results {
            let _ = writeln!(ret, "{}", result.title());
            ret.push_str(&text_table(&OLIGO_HEADERS, &oligo_cells(result)));
            ret.push('\n');
            ret.push_str(&text_table(&PRODUCT_HEADERS, &[product_cells(&result.product)]));
            ret.push_str("\nBinding Sites\n");
            ret.push_str(&render_block(&result.rows));
        }
        if !self.results.is_empty() {
            let _ = writeln!(ret, "Legend: {}\n", legend_text());
        }
        ret.push_str("Primer Explanation Summary\n");
        let (headers, rows) = self.explanation_table();
        let headers: Vec<&str> = headers.iter().map(String::as_str).collect();
        ret.push_str(&text_table(&headers, &rows));
        if let Some(pair) = &self.pair_explain {
            let _ = writeln!(ret, "\nPair summary: {pair}");
        }
        ret
    }

    pub fn to_html(&self) -> String {
        let mut ret = String::from(
            "<html><head><meta charset=\"utf-8\">\n<style>\n\
             body { font-family: Arial, sans-serif; margin: 20px; }\n\
             h2 { color: #2c3e50; }\n\
             table.dataframe { border-collapse: collapse; width: 100%; margin-bottom: 20px; }\n\
             table.dataframe th, table.dataframe td { border: 1px solid #ccc; padding: 8px; text-align: center; }\n\
             pre { background-color: #f4f4f4; padding: 10px; font-family: monospace; }\n\
             .status { padding: 4px 8px; border-radius: 4px; }\n\
             </style></head><body>\n",
        );
        let _ = writeln!(ret, "<h1>Primer3 Results - {}</h1>", escape_html(&self.seq_id));
        let _ = writeln!(
            ret,
            "<p>Task: <code>{}</code> <span class=\"status\" style=\"background-color: {}\">{}</span></p>",
            self.task.as_str(),
            self.triage.indicator_color(),
            self.triage.as_str()
        );
        if !self.findings.is_empty() {
            ret.push_str("<ul>\n");
            for f in &self.findings {
                let _ = writeln!(ret, "<li>{}</li>", escape_html(&finding_line(f)));
            }
            ret.push_str("</ul>\n");
        }
        for result in &self.results {
            let _ = writeln!(ret, "<h2>{}</h2>", result.title());
            ret.push_str(&html_table(&OLIGO_HEADERS, &oligo_cells(result)));
            ret.push_str(&html_table(&PRODUCT_HEADERS, &[product_cells(&result.product)]));
            ret.push_str("<h3>Binding Sites</h3>\n<pre>");
            ret.push_str(&escape_html(&render_block(&result.rows)));
            ret.push_str("</pre>\n");
            let _ = writeln!(ret, "<p>{}</p>\n<br><hr>", escape_html(&legend_text()));
        }
        ret.push_str("<h2>Primer Explanation Summary</h2>\n");
        let (headers, rows) = self.explanation_table();
        let headers: Vec<&str> = headers.iter().map(String::as_str).collect();
        ret.push_str(&html_table(&headers, &rows));
        if let Some(pair) = &self.pair_explain {
            let _ = writeln!(
                ret,
                "<p><strong>Pair summary:</strong> {}</p>",
                escape_html(pair)
            );
        }
        ret.push_str("</body></html>\n");
        ret
    }

    /// One row per oligo per result.
    pub fn to_csv(&self) -> Result<String, csv::Error> {
        let mut writer = csv::Writer::from_writer(vec![]);
        writer.write_record([
            "result",
            "type",
            "start",
            "length",
            "tm",
            "gc_percent",
            "self_any",
            "self_end",
            "sequence",
            "penalty",
            "product_size",
            "product_tm",
            "pair_penalty",
        ])?;
        for result in &self.results {
            for oligo in &result.oligos {
                writer.write_record([
                    (result.index + 1).to_string(),
                    oligo.role.table_label().to_string(),
                    opt(&oligo.start),
                    opt(&oligo.length),
                    opt(&oligo.tm),
                    opt(&oligo.gc_percent),
                    opt(&oligo.self_any),
                    opt(&oligo.self_end),
                    oligo.sequence.clone().unwrap_or_default(),
                    opt(&oligo.penalty),
                    opt(&result.product.product_size),
                    opt(&result.product.product_tm),
                    opt(&result.product.penalty),
                ])?;
            }
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Transposed explanation table: one row per role, one column per
    /// category.
    pub fn explanation_table(&self) -> (Vec<String>, Vec<Vec<String>>) {
        let mut headers = vec!["Oligo".to_string()];
        headers.extend(self.explanation.rows().map(|(category, _)| category.to_string()));
        let rows = self
            .explanation
            .columns
            .iter()
            .map(|column| {
                std::iter::once(column.role.key_part().to_string())
                    .chain(column.cells.iter().map(ToString::to_string))
                    .collect()
            })
            .collect();
        (headers, rows)
    }

    /// Linear map of where the oligos of one result bind.
    pub fn binding_map_svg(&self, result: &ResultReport) -> String {
        let len = self.template_length;
        let left = MAP_SIDE_MARGIN;
        let right = MAP_W - MAP_SIDE_MARGIN;
        let baseline = MAP_H * 0.55;
        let x = |bp: i64| bp_to_x(bp.max(0) as usize, len, left, right);

        let mut doc = Document::new()
            .set("viewBox", (0, 0, MAP_W, MAP_H))
            .set("width", MAP_W)
            .set("height", MAP_H)
            .add(
                Rectangle::new()
                    .set("x", 0)
                    .set("y", 0)
                    .set("width", MAP_W)
                    .set("height", MAP_H)
                    .set("fill", "#ffffff"),
            );

        for (span, color) in [
            (self.target, "#fff3b0"),
            (self.excluded_region, "#e0e0e0"),
        ] {
            if let Some(s) = span {
                let x1 = x(s.start);
                let x2 = x(s.start + s.length as i64).max(x1 + 1.0);
                doc = doc.add(
                    Rectangle::new()
                        .set("x", x1)
                        .set("y", baseline - 30.0)
                        .set("width", x2 - x1)
                        .set("height", 60.0)
                        .set("fill", color),
                );
            }
        }

        doc = doc.add(
            Line::new()
                .set("x1", left)
                .set("y1", baseline)
                .set("x2", right)
                .set("y2", baseline)
                .set("stroke", "#000000")
                .set("stroke-width", 2),
        );

        let mut labels = vec![];
        let oligos = [
            (result.forward.map(|s| (s.start, s.start + s.length as i64)), Role::Left, "#1f4fcc"),
            (
                result.reverse.map(|s| (s.start - s.length as i64 + 1, s.start + 1)),
                Role::Right,
                "#cc1f1f",
            ),
            (result.probe.map(|s| (s.start, s.start + s.length as i64)), Role::Internal, "#238023"),
        ];
        for (range, role, color) in oligos {
            let Some((from, to)) = range else {
                continue;
            };
            let x1 = x(from);
            let x2 = x(to).max(x1 + 1.0);
            let y = match role {
                Role::Left => baseline - OLIGO_SIDE_MARGIN,
                Role::Right => baseline + OLIGO_SIDE_MARGIN,
                Role::Internal => baseline,
            };
            let half = OLIGO_BLOCK_HEIGHT * 0.5;
            doc = doc.add(
                Rectangle::new()
                    .set("x", x1)
                    .set("y", y - half)
                    .set("width", x2 - x1)
                    .set("height", OLIGO_BLOCK_HEIGHT)
                    .set("fill", color),
            );
            let arrow_dx = 6.0;
            let data = match role {
                Role::Right => Data::new()
                    .move_to((x1, y - half))
                    .line_to((x1 - arrow_dx, y))
                    .line_to((x1, y + half))
                    .close(),
                _ => Data::new()
                    .move_to((x2, y - half))
                    .line_to((x2 + arrow_dx, y))
                    .line_to((x2, y + half))
                    .close(),
            };
            doc = doc.add(SvgPath::new().set("d", data).set("fill", color));
            let text_y = match role {
                Role::Right => y + 18.0,
                _ => y - 9.0,
            };
            labels.push(
                Text::new(format!("{} {}..{}", role.table_label(), from + 1, to))
                    .set("x", x1)
                    .set("y", text_y)
                    .set("font-family", "monospace")
                    .set("font-size", 10)
                    .set("fill", "#111111"),
            );
        }

        labels.push(
            Text::new(format!("{} - {}", self.seq_id, result.title()))
                .set("x", 12)
                .set("y", 20)
                .set("font-family", "monospace")
                .set("font-size", 14)
                .set("fill", "#111111"),
        );
        labels.push(
            Text::new(format!("{len} bp"))
                .set("x", MAP_W - 12.0)
                .set("y", 20)
                .set("text-anchor", "end")
                .set("font-family", "monospace")
                .set("font-size", 12)
                .set("fill", "#444444"),
        );
        for label in labels {
            doc = doc.add(label);
        }
        doc.to_string()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportFormat {
    Html,
    Text,
    Csv,
    Json,
}

pub fn save_report(
    report: &DesignReport,
    format: ReportFormat,
    path: &Path,
) -> Result<(), DesignError> {
    let path_text = path.display().to_string();
    let content = match format {
        ReportFormat::Json => report.to_json().map_err(|source| DesignError::State {
            path: path_text.clone(),
            source,
        })?,
        ReportFormat::Csv => report.to_csv().map_err(|e| {
            DesignError::io("Could not write CSV report", path_text.clone(), e.into())
        })?,
        ReportFormat::Html => report.to_html(),
        ReportFormat::Text => report.to_text(),
    };
    fs::write(path, content).map_err(|e| DesignError::io("Could not write report", path_text, e))
}

/// Writes one `result_<n>.svg` per result into `dir`.
pub fn save_binding_maps(report: &DesignReport, dir: &Path) -> Result<Vec<String>, DesignError> {
    fs::create_dir_all(dir).map_err(|e| {
        DesignError::io("Could not create directory", dir.display().to_string(), e)
    })?;
    let mut ret = vec![];
    for result in &report.results {
        let path = dir.join(format!("result_{}.svg", result.index + 1));
        fs::write(&path, report.binding_map_svg(result)).map_err(|e| {
            DesignError::io("Could not write binding map", path.display().to_string(), e)
        })?;
        ret.push(path.display().to_string());
    }
    Ok(ret)
}

fn bp_to_x(bp: usize, len: usize, left: f32, right: f32) -> f32 {
    if len == 0 {
        return left;
    }
    let frac = bp.min(len) as f32 / len as f32;
    left + (right - left) * frac
}

fn opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

fn oligo_cells(result: &ResultReport) -> Vec<Vec<String>> {
    result
        .oligos
        .iter()
        .map(|o| {
            vec![
                o.role.table_label().to_string(),
                opt(&o.start),
                opt(&o.length),
                opt(&o.tm),
                opt(&o.gc_percent),
                opt(&o.self_any),
                opt(&o.self_end),
                o.sequence.clone().unwrap_or_default(),
            ]
        })
        .collect()
}

fn product_cells(pair: &PairRecord) -> Vec<String> {
    vec![
        opt(&pair.product_size),
        opt(&pair.product_tm),
        opt(&pair.compl_any),
        opt(&pair.compl_end),
    ]
}

fn finding_line(finding: &Finding) -> String {
    let severity = match finding.severity {
        primerdesk_protocol::Severity::Minor => "warning",
        primerdesk_protocol::Severity::Blocking => "error",
    };
    match finding.result_index {
        Some(i) => format!("[{severity}] Result {}: {}", i + 1, finding.message),
        None => format!("[{severity}] {}", finding.message),
    }
}

fn legend_text() -> String {
    LEGEND
        .iter()
        .map(|(c, name)| format!("{name}: {c}"))
        .join(", ")
}

fn text_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }
    let line = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{cell:<w$}"))
            .join("  ")
            .trim_end()
            .to_string()
    };
    let mut ret = line(headers.to_vec());
    ret.push('\n');
    for row in rows {
        ret.push_str(&line(row.iter().map(String::as_str).collect()));
        ret.push('\n');
    }
    ret
}

fn html_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut ret = String::from("<table border=\"1\" class=\"dataframe\">\n<thead><tr>");
    for h in headers {
        let _ = write!(ret, "<th>{}</th>", escape_html(h));
    }
    ret.push_str("</tr></thead>\n<tbody>\n");
    for row in rows {
        let cells = row
            .iter()
            .map(|c| format!("<td>{}</td>", escape_html(c)))
            .join("");
        let _ = writeln!(ret, "<tr>{cells}</tr>");
    }
    ret.push_str("</tbody>\n</table>\n");
    ret
}

fn escape_html(text: &str) -> String {
    let mut ret = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => ret.push_str("&amp;"),
            '<' => ret.push_str("&lt;"),
            '>' => ret.push_str("&gt;"),
            '"' => ret.push_str("&quot;"),
            '\'' => ret.push_str("&#39;"),
            _ => ret.push(c),
        }
    }
    ret
}
