//! Robust parsing of LLM value-output: three labeled numeric fields plus a
//! justification line (`spec.md` §4.5). Same tolerant philosophy as the
//! proposer's parser — accept loosely-formatted text rather than demand
//! strict JSON.

use crate::ParsedScores;

/// Parse `raw` for `progress:`, `promise:`, `confidence:` lines (any order,
/// case-insensitive label, values clamped to `[0,10]`). Returns `None` if
/// fewer than all three dimensions are found.
pub fn parse_value_output(raw: &str) -> Option<ParsedScores> {
    let mut progress = None;
    let mut promise = None;
    let mut confidence = None;

    for line in raw.lines() {
        let Some((label, value)) = line.split_once(':') else { continue };
        let label = label.trim().to_lowercase();
        let Some(number) = extract_number(value) else { continue };
        let clamped = number.clamp(0.0, 10.0);
        match label.as_str() {
            "progress" => progress = Some(clamped),
            "promise" => promise = Some(clamped),
            "confidence" => confidence = Some(clamped),
            _ => {}
        }
    }

    Some(ParsedScores { progress: progress?, promise: promise?, confidence: confidence? })
}

fn extract_number(text: &str) -> Option<f64> {
    let token: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    token.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_output() {
        let raw = "progress: 7\npromise: 8.5\nconfidence: 6\njustification: looks promising";
        let scores = parse_value_output(raw).unwrap();
        assert_eq!(scores.progress, 7.0);
        assert_eq!(scores.promise, 8.5);
        assert_eq!(scores.confidence, 6.0);
    }

    #[test]
    fn order_does_not_matter() {
        let raw = "confidence: 3\nprogress: 1\npromise: 2";
        let scores = parse_value_output(raw).unwrap();
        assert_eq!(scores.progress, 1.0);
        assert_eq!(scores.promise, 2.0);
        assert_eq!(scores.confidence, 3.0);
    }

    #[test]
    fn missing_dimension_fails_parse() {
        let raw = "progress: 7\npromise: 8";
        assert!(parse_value_output(raw).is_none());
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let raw = "progress: 15\npromise: -3\nconfidence: 5";
        let scores = parse_value_output(raw).unwrap();
        assert_eq!(scores.progress, 10.0);
        assert_eq!(scores.promise, 0.0);
    }

    #[test]
    fn garbage_input_fails_parse() {
        assert!(parse_value_output("not a value response at all").is_none());
    }
}
