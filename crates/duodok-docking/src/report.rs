//! Tolerant line scanner for the affinity tool's text report.
//!
//! The report format is not a contract. Each field is looked up by a label
//! substring; an absent line leaves the field empty, and malformed numeric
//! text only costs the field it appears in.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use duodok_common::ParseError;
use regex::Regex;

pub const AFFINITY_LABEL: &str = "Predicted binding affinity";
pub const DISSOCIATION_LABEL: &str = "Predicted dissociation constant";

/// Fields extracted from one affinity report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AffinityReport {
    /// kcal/mol
    pub binding_affinity: Option<f64>,
    /// Kept verbatim; the tool's units vary.
    pub dissociation_constant: Option<String>,
    pub contact_counts: BTreeMap<String, u32>,
    /// Fields dropped because their line matched but did not parse.
    pub field_errors: Vec<ParseError>,
}

/// Binding affinity from the first line carrying the affinity label.
///
/// `Ok(None)` when no line matches.
pub fn parse_affinity_report(text: &str) -> Result<Option<f64>, ParseError> {
    let Some((line, value)) = labelled_value(text, AFFINITY_LABEL) else {
        return Ok(None);
    };
    value.parse::<f64>().map(Some).map_err(|e| ParseError {
        field: "binding_affinity".to_string(),
        line: line.to_string(),
        reason: e.to_string(),
    })
}

/// Dissociation constant text from the first matching line.
pub fn parse_dissociation_constant(text: &str) -> Option<String> {
    labelled_value(text, DISSOCIATION_LABEL)
        .map(|(_, v)| v.to_string())
        .filter(|v| !v.is_empty())
}

/// One entry per `No. of <TYPE> contacts: <N>` line. Lines whose count does
/// not parse are reported separately and left out of the map.
pub fn parse_contact_counts(text: &str) -> (BTreeMap<String, u32>, Vec<ParseError>) {
    let mut counts = BTreeMap::new();
    let mut errors = Vec::new();

    for line in text.lines() {
        let Some(caps) = contact_re().captures(line) else {
            continue;
        };
        let label = caps[1].to_string();
        let raw = caps[2].trim();
        match raw.parse::<u32>() {
            Ok(n) => {
                counts.insert(label, n);
            }
            Err(e) => errors.push(ParseError {
                field: format!("contacts[{label}]"),
                line: line.trim().to_string(),
                reason: e.to_string(),
            }),
        }
    }
    (counts, errors)
}

/// Parse everything the pipeline keeps from a report.
pub fn parse_report(text: &str) -> AffinityReport {
    let mut report = AffinityReport::default();

    match parse_affinity_report(text) {
        Ok(v) => report.binding_affinity = v,
        Err(e) => report.field_errors.push(e),
    }
    report.dissociation_constant = parse_dissociation_constant(text);

    let (counts, errors) = parse_contact_counts(text);
    report.contact_counts = counts;
    report.field_errors.extend(errors);
    report
}

fn labelled_value<'a>(text: &'a str, label: &str) -> Option<(&'a str, &'a str)> {
    text.lines()
        .find(|line| line.contains(label))
        .map(|line| {
            // Only the segment between the first and second colon.
            let value = line.split(':').nth(1).unwrap_or("");
            (line.trim(), value.trim())
        })
}

fn contact_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"No\. of (\S+) contacts\s*:(.*)$").expect("contact pattern is valid")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODIGY_OUTPUT: &str = "\
[+] Reading structure file: /work/r1_a1/Protein_Peptide.pdb
[+] Parsed structure file Protein_Peptide (2 chains, 312 residues)
[+] No. of intermolecular contacts: 61
[+] No. of charged-charged contacts: 4
[+] No. of charged-polar contacts: 9
[+] No. of polar-polar contacts: 7
[+] Percentage of apolar NIS residues: 36.21
[++] Predicted binding affinity (kcal/mol):    -12.3
[++] Predicted dissociation constant (M) at 25.0C:  9.6e-10
";

    #[test]
    fn test_affinity_value_is_parsed() {
        let text = "Predicted binding affinity (kcal/mol):    -12.3\n";
        assert_eq!(parse_affinity_report(text).unwrap(), Some(-12.3));
    }

    #[test]
    fn test_missing_affinity_is_none_not_error() {
        assert_eq!(parse_affinity_report("no useful lines here\n").unwrap(), None);
        assert_eq!(parse_affinity_report("").unwrap(), None);
    }

    #[test]
    fn test_first_matching_line_wins() {
        let text = "Predicted binding affinity: -7.0\nPredicted binding affinity: -9.0\n";
        assert_eq!(parse_affinity_report(text).unwrap(), Some(-7.0));
    }

    #[test]
    fn test_malformed_affinity_is_field_error() {
        let text = "Predicted binding affinity (kcal/mol): n/a\n";
        let err = parse_affinity_report(text).unwrap_err();
        assert_eq!(err.field, "binding_affinity");
        assert!(err.line.contains("n/a"));
    }

    #[test]
    fn test_contact_map() {
        let text = "No. of charged-charged contacts:    4\nNo. of polar-polar contacts: 7\n";
        let (counts, errors) = parse_contact_counts(text);
        assert!(errors.is_empty());
        let expected: BTreeMap<String, u32> =
            [("charged-charged".to_string(), 4), ("polar-polar".to_string(), 7)].into();
        assert_eq!(counts, expected);
    }

    #[test]
    fn test_full_report() {
        let report = parse_report(PRODIGY_OUTPUT);
        assert_eq!(report.binding_affinity, Some(-12.3));
        assert_eq!(report.dissociation_constant.as_deref(), Some("9.6e-10"));
        assert_eq!(report.contact_counts.get("intermolecular"), Some(&61));
        assert_eq!(report.contact_counts.get("charged-polar"), Some(&9));
        assert_eq!(report.contact_counts.len(), 4);
        assert!(report.field_errors.is_empty());
    }

    #[test]
    fn test_bad_field_does_not_spoil_the_rest() {
        let text = "\
No. of charged-charged contacts: four
No. of polar-polar contacts: 7
Predicted binding affinity (kcal/mol): -8.25
";
        let report = parse_report(text);
        assert_eq!(report.binding_affinity, Some(-8.25));
        assert_eq!(report.contact_counts.len(), 1);
        assert_eq!(report.contact_counts["polar-polar"], 7);
        assert_eq!(report.field_errors.len(), 1);
        assert_eq!(report.field_errors[0].field, "contacts[charged-charged]");
    }

    #[test]
    fn test_value_stops_at_next_colon() {
        let text = "Predicted binding affinity (kcal/mol): -10.4 : model 1\n";
        assert_eq!(parse_affinity_report(text).unwrap(), Some(-10.4));
        let text = "Predicted dissociation constant (M): 2.0e-09: at 25.0C\n";
        assert_eq!(parse_dissociation_constant(text).as_deref(), Some("2.0e-09"));
    }

    #[test]
    fn test_report_with_field_errors_serialises() {
        let report = parse_report("Predicted binding affinity: ???\nNo. of polar-polar contacts: 3\n");
        let json = serde_json::to_string(&report).unwrap();
        let back: AffinityReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
        assert_eq!(back.field_errors[0].field, "binding_affinity");
    }

    #[test]
    fn test_bad_affinity_keeps_contacts() {
        let text = "Predicted binding affinity: ???\nNo. of apolar-apolar contacts: 12\n";
        let report = parse_report(text);
        assert_eq!(report.binding_affinity, None);
        assert_eq!(report.contact_counts["apolar-apolar"], 12);
        assert_eq!(report.field_errors.len(), 1);
    }
}
