//! Inline template annotations.
//!
//! Users mark the amplification target with `[...]` and a region primers must
//! avoid with `<...>`, e.g. `TCA<CTG>GAT[CAT]GAT`. Both markers are stripped
//! before the template is handed to the engine.

use crate::error::DesignError;
use primerdesk_protocol::Span;

const MARKERS: [char; 4] = ['[', ']', '<', '>'];

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnnotatedTemplate {
    pub sequence: String,
    pub target: Option<Span>,
    pub excluded_region: Option<Span>,
}

fn is_marker(c: char) -> bool {
    MARKERS.contains(&c)
}

/// Whitespace and marker characters removed.
pub fn strip_template(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && !is_marker(*c))
        .collect()
}

/// Region enclosed by the first `open` and first `close`, in 0-based
/// coordinates of the stripped sequence.
fn find_region(cleaned: &[char], open: char, close: char) -> Result<Option<Span>, DesignError> {
    let start = cleaned.iter().position(|&c| c == open);
    let end = cleaned.iter().position(|&c| c == close);
    match (start, end) {
        (None, None) => Ok(None),
        (Some(_), None) | (None, Some(_)) => Err(DesignError::MalformedAnnotation { open, close }),
        (Some(start), Some(end)) if end > start => {
            let offset = cleaned[..start].iter().filter(|c| !is_marker(**c)).count();
            let length = cleaned[start + 1..end]
                .iter()
                .filter(|c| !is_marker(**c))
                .count();
            Ok(Some(Span::new(offset as i64, length)))
        }
        _ => Ok(None),
    }
}

pub fn parse_template(raw: &str) -> Result<AnnotatedTemplate, DesignError> {
    let cleaned: Vec<char> = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let target = find_region(&cleaned, '[', ']')?;
    let excluded_region = find_region(&cleaned, '<', '>')?;
    Ok(AnnotatedTemplate {
        sequence: strip_template(raw),
        target,
        excluded_region,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_brackets() {
        let t = parse_template("TCAT[CAT]GAT").unwrap();
        assert_eq!(t.sequence, "TCATCATGAT");
        assert_eq!(t.target, Some(Span::new(4, 3)));
        assert_eq!(t.excluded_region, None);
    }

    #[test]
    fn test_excluded_region_angles() {
        let t = parse_template("TCA<CTG>GAT").unwrap();
        assert_eq!(t.sequence, "TCACTGGAT");
        assert_eq!(t.excluded_region, Some(Span::new(3, 3)));
        assert_eq!(t.target, None);
    }

    #[test]
    fn test_both_markers_account_for_each_other() {
        let t = parse_template("AA<CC>GG[TT]AA").unwrap();
        assert_eq!(t.sequence, "AACCGGTTAA");
        assert_eq!(t.excluded_region, Some(Span::new(2, 2)));
        assert_eq!(t.target, Some(Span::new(6, 2)));
    }

    #[test]
    fn test_whitespace_and_newlines_removed() {
        let t = parse_template("ACGT\nAC[GT\r\nAC]GT  ").unwrap();
        assert_eq!(t.sequence, "ACGTACGTACGT");
        assert_eq!(t.target, Some(Span::new(6, 4)));
    }

    #[test]
    fn test_single_bracket_is_malformed() {
        assert!(matches!(
            parse_template("ACGT[ACGT"),
            Err(DesignError::MalformedAnnotation {
                open: '[',
                close: ']'
            })
        ));
        assert!(matches!(
            parse_template("ACGT>ACGT"),
            Err(DesignError::MalformedAnnotation {
                open: '<',
                close: '>'
            })
        ));
    }

    #[test]
    fn test_reversed_brackets_give_no_target() {
        let t = parse_template("AC]GT[AC").unwrap();
        assert_eq!(t.sequence, "ACGTAC");
        assert_eq!(t.target, None);
    }

    #[test]
    fn test_no_markers() {
        let t = parse_template("acgt").unwrap();
        assert_eq!(t, AnnotatedTemplate {
            sequence: "acgt".to_string(),
            target: None,
            excluded_region: None,
        });
        assert_eq!(strip_template("a[c]g<t>"), "acgt");
    }
}
