//! Robust parsing of LLM propose-output: first try a JSON array of strings,
//! then fall back to newline-splitting with ordinal-prefix stripping
//! (`spec.md` §4.4).

/// Parse `raw` into up to `k` non-empty candidate thoughts.
pub fn parse_candidates(raw: &str, k: usize) -> Vec<String> {
    let candidates = serde_json::from_str::<Vec<String>>(raw.trim())
        .unwrap_or_else(|_| raw.lines().map(strip_ordinal_prefix).collect());

    candidates
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .take(k)
        .collect()
}

/// Strip a leading list marker — `"1. "`, `"2) "`, `"- "`, `"* "` — from one
/// line, leaving the thought text.
fn strip_ordinal_prefix(line: &str) -> String {
    let trimmed = line.trim();
    let without_digits = trimmed.trim_start_matches(|c: char| c.is_ascii_digit());
    let without_punct = without_digits.trim_start_matches(['.', ')', ':']);
    let without_bullet = without_punct.trim_start_matches(['-', '*']);
    without_bullet.trim().to_string()
}

/// Whether a parsed thought self-declares completion via the prompt
/// contract's `SOLVED:` marker (see `tot_prompt`'s default PROPOSE template).
pub fn declares_solution(thought: &str) -> bool {
    thought.to_uppercase().contains("SOLVED:")
}
