//! Binding-site view of a design result on its template.
//!
//! The template is shown in rows of 60 bases, each with a marker row of the
//! same width.

use primerdesk_protocol::{DesignResult, Span};
use serde::{Deserialize, Serialize};

pub const ROW_WIDTH: usize = 60;

pub const FORWARD_MARK: char = '>';
pub const REVERSE_MARK: char = '<';
pub const PROBE_MARK: char = '^';
pub const TARGET_MARK: char = '*';
pub const EXCLUDED_MARK: char = 'X';

pub const LEGEND: [(char, &str); 5] = [
    (FORWARD_MARK, "Forward Primer"),
    (REVERSE_MARK, "Reverse Primer"),
    (PROBE_MARK, "Probe/Internal Oligo"),
    (TARGET_MARK, "Target Region"),
    (EXCLUDED_MARK, "Excluded Region"),
];

/// Spans to mark, all 0-based. The reverse span starts at the primer's
/// 3' end, as reported by the engine, and extends leftwards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BindingSpans {
    pub forward: Option<Span>,
    pub reverse: Option<Span>,
    pub probe: Option<Span>,
    pub target: Option<Span>,
    pub excluded: Option<Span>,
}

impl BindingSpans {
    /// Oligo positions come in engine coordinates and are shifted by
    /// `first_base_index`; `target` and `excluded` are already 0-based.
    pub fn from_result(
        result: &DesignResult,
        target: Option<Span>,
        excluded: Option<Span>,
        first_base_index: i64,
    ) -> Self {
        let shift = |span: Option<Span>| span.map(|s| s.shifted(-first_base_index));
        Self {
            forward: shift(result.left.span()),
            reverse: shift(result.right.span()),
            probe: shift(result.probe.as_ref().and_then(|p| p.span())),
            target,
            excluded,
        }
    }
}

fn mark(markers: &mut [char], from: i64, to: i64, c: char) {
    let len = markers.len() as i64;
    for i in from.max(0)..to.min(len) {
        markers[i as usize] = c;
    }
}

/// One marker per base. Later marks overwrite earlier ones and positions
/// outside the template are dropped.
pub fn marker_line(len: usize, spans: &BindingSpans) -> Vec<char> {
    let mut markers = vec![' '; len];
    if let Some(s) = spans.forward {
        mark(&mut markers, s.start, s.start + s.length as i64, FORWARD_MARK);
    }
    if let Some(s) = spans.reverse {
        mark(&mut markers, s.start - s.length as i64 + 1, s.start + 1, REVERSE_MARK);
    }
    for (span, c) in [
        (spans.probe, PROBE_MARK),
        (spans.target, TARGET_MARK),
        (spans.excluded, EXCLUDED_MARK),
    ] {
        if let Some(s) = span {
            mark(&mut markers, s.start, s.start + s.length as i64, c);
        }
    }
    markers
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedRow {
    /// 0-based position of the first base.
    pub start: usize,
    pub sequence: String,
    pub markers: String,
}

pub fn annotate(sequence: &str, spans: &BindingSpans) -> Vec<AnnotatedRow> {
    let bases: Vec<char> = sequence.chars().collect();
    let mut markers = marker_line(bases.len(), spans);

    // A forward primer crossing a row boundary keeps its edge on the
    // previous row, unless a later mark took that cell.
    for boundary in (ROW_WIDTH..bases.len()).step_by(ROW_WIDTH) {
        if markers[boundary] == FORWARD_MARK && markers[boundary - 1] == FORWARD_MARK {
            markers[boundary - 1] = FORWARD_MARK;
            markers[boundary] = ' ';
        }
    }

    bases
        .chunks(ROW_WIDTH)
        .zip(markers.chunks(ROW_WIDTH))
        .enumerate()
        .map(|(i, (seq, mk))| AnnotatedRow {
            start: i * ROW_WIDTH,
            sequence: seq.iter().collect(),
            markers: mk.iter().collect(),
        })
        .collect()
}

/// Monospace block: 1-based row start, the bases, and the markers aligned
/// underneath, with a blank line between rows.
pub fn render_block(rows: &[AnnotatedRow]) -> String {
    let mut ret = String::new();
    for row in rows {
        ret.push_str(&format!("{:>6}  {}\n", row.start + 1, row.sequence));
        ret.push_str(&format!("{:8}{}\n\n", "", row.markers.trim_end()));
    }
    ret
}

#[cfg(test)]
mod tests {
    use super::*;
    use primerdesk_protocol::OligoRecord;

    #[test]
    fn test_forward_and_reverse_markers() {
        let spans = BindingSpans {
            forward: Some(Span::new(0, 4)),
            reverse: Some(Span::new(11, 4)),
            ..Default::default()
        };
        let line: String = marker_line(12, &spans).into_iter().collect();
        assert_eq!(line, ">>>>    <<<<");
    }

    #[test]
    fn test_later_marks_win() {
        let spans = BindingSpans {
            forward: Some(Span::new(0, 6)),
            target: Some(Span::new(2, 2)),
            excluded: Some(Span::new(3, 2)),
            ..Default::default()
        };
        let line: String = marker_line(8, &spans).into_iter().collect();
        assert_eq!(line, ">>*XX>  ");
    }

    #[test]
    fn test_out_of_range_is_clipped() {
        let spans = BindingSpans {
            forward: Some(Span::new(-3, 5)),
            reverse: Some(Span::new(12, 5)),
            probe: Some(Span::new(100, 5)),
            ..Default::default()
        };
        let line: String = marker_line(10, &spans).into_iter().collect();
        assert_eq!(line, ">>      <<");
    }

    #[test]
    fn test_boundary_carry() {
        let sequence = "A".repeat(130);
        let spans = BindingSpans {
            forward: Some(Span::new(50, 11)),
            ..Default::default()
        };
        let rows = annotate(&sequence, &spans);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].markers.chars().nth(59), Some('>'));
        assert_eq!(rows[1].markers.chars().next(), Some(' '));
        assert_eq!(rows[1].start, 60);
    }

    #[test]
    fn test_no_carry_over_a_later_mark() {
        let sequence = "A".repeat(90);
        let spans = BindingSpans {
            forward: Some(Span::new(50, 11)),
            target: Some(Span::new(59, 1)),
            ..Default::default()
        };
        let rows = annotate(&sequence, &spans);
        assert_eq!(rows[0].markers.chars().nth(58), Some('>'));
        assert_eq!(rows[0].markers.chars().nth(59), Some('*'));
        assert_eq!(rows[1].markers.chars().next(), Some('>'));
    }

    #[test]
    fn test_no_carry_when_forward_starts_on_boundary() {
        let sequence = "A".repeat(70);
        let spans = BindingSpans {
            forward: Some(Span::new(60, 5)),
            ..Default::default()
        };
        let rows = annotate(&sequence, &spans);
        assert_eq!(rows[0].markers.chars().nth(59), Some(' '));
        assert!(rows[1].markers.starts_with(">>>>>"));
    }

    #[test]
    fn test_marker_rows_match_sequence_rows() {
        let sequence = "ACGT".repeat(40);
        let spans = BindingSpans {
            forward: Some(Span::new(55, 20)),
            reverse: Some(Span::new(159, 20)),
            target: Some(Span::new(80, 10)),
            ..Default::default()
        };
        let rows = annotate(&sequence, &spans);
        assert_eq!(rows.len(), 3);
        for row in &rows {
            assert_eq!(row.sequence.chars().count(), row.markers.chars().count());
        }
        assert_eq!(rows[2].sequence.len(), 40);
    }

    #[test]
    fn test_from_result_shifts_oligos_only() {
        let mut result = DesignResult::new(0);
        result.left = OligoRecord {
            start: Some(5),
            length: Some(20),
            ..Default::default()
        };
        result.right = OligoRecord {
            start: Some(120),
            length: Some(20),
            ..Default::default()
        };
        let spans = BindingSpans::from_result(&result, Some(Span::new(40, 10)), None, 1);
        assert_eq!(spans.forward, Some(Span::new(4, 20)));
        assert_eq!(spans.reverse, Some(Span::new(119, 20)));
        assert_eq!(spans.probe, None);
        assert_eq!(spans.target, Some(Span::new(40, 10)));
    }

    #[test]
    fn test_render_block_layout() {
        let rows = annotate(
            &"C".repeat(62),
            &BindingSpans {
                forward: Some(Span::new(0, 2)),
                ..Default::default()
            },
        );
        let block = render_block(&rows);
        let lines: Vec<&str> = block.lines().collect();
        assert_eq!(lines[0], format!("     1  {}", "C".repeat(60)));
        assert_eq!(lines[1], "        >>");
        assert_eq!(lines[2], "");
        assert_eq!(lines[3], "    61  CC");
    }
}
