//! Cheap, deterministic scoring rules applied before paying for an LLM call
//! (`spec.md` §4.5 step 1).

use crate::ParsedScores;

const MIN_LENGTH: usize = 8;
const MAX_LENGTH: usize = 1000;

/// A thought that self-declares dead-endedness via the prompt contract's
/// `FAILED:` marker, mirroring the proposer's `SOLVED:` marker.
pub fn declares_failure(thought: &str) -> bool {
    thought.to_uppercase().contains("FAILED:")
}

/// Returns a heuristic score if one of the short-circuit rules fires, or
/// `None` if the thought needs the LLM value prompt.
pub fn heuristic_score(thought: &str) -> Option<ParsedScores> {
    let trimmed = thought.trim();
    if declares_failure(trimmed) {
        return Some(ParsedScores { progress: 0.0, promise: 0.0, confidence: 10.0 });
    }
    if trimmed.len() < MIN_LENGTH {
        return Some(ParsedScores { progress: 1.0, promise: 1.0, confidence: 9.0 });
    }
    if trimmed.len() > MAX_LENGTH {
        return Some(ParsedScores { progress: 3.0, promise: 3.0, confidence: 7.0 });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_short_thought_is_capped() {
        let scores = heuristic_score("short").unwrap();
        assert_eq!(scores, ParsedScores { progress: 1.0, promise: 1.0, confidence: 9.0 });
    }

    #[test]
    fn too_long_thought_is_capped() {
        let long = "x".repeat(1001);
        let scores = heuristic_score(&long).unwrap();
        assert_eq!(scores, ParsedScores { progress: 3.0, promise: 3.0, confidence: 7.0 });
    }

    #[test]
    fn failure_marker_zeroes_out_the_thought() {
        let scores = heuristic_score("FAILED: dead end, no path forward here").unwrap();
        assert_eq!(scores, ParsedScores { progress: 0.0, promise: 0.0, confidence: 10.0 });
    }

    #[test]
    fn normal_thought_defers_to_llm() {
        assert!(heuristic_score("a reasonably sized candidate thought").is_none());
    }
}
