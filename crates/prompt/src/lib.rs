//! The three prompt templates — PROPOSE, VALUE, FINALIZE — consumed by the
//! Proposer, Evaluator, and Finalizer respectively (`spec.md` §6). Templates
//! are injectable configuration: callers may substitute their own template
//! text as long as it still asks for the contracted output shape (a JSON
//! list for PROPOSE, three numeric fields + justification for VALUE, free
//! text for FINALIZE) — the robust parsers on the other end only understand
//! those shapes.

use tot_config::Task;

const DEFAULT_PROPOSE_TEMPLATE: &str = "You are exploring possible next reasoning steps for a task.\n\
\n\
TASK: {instruction}\n\
CONSTRAINTS: {constraints}\n\
\n\
REASONING SO FAR (root to current):\n\
{path}\n\
\n\
Propose up to {k} diverse, concrete next thoughts that make distinct progress \
toward solving the task. Avoid near-duplicate phrasings of each other. If a \
thought fully solves the task, include the marker \"SOLVED:\" at its start.\n\
\n\
Respond with a JSON array of strings, one per candidate thought, and nothing else.";

const DEFAULT_VALUE_TEMPLATE: &str = "You are scoring a candidate reasoning step.\n\
\n\
TASK: {instruction}\n\
CONSTRAINTS: {constraints}\n\
\n\
REASONING SO FAR (root to candidate):\n\
{path}\n\
\n\
Score the candidate on three dimensions, each from 0 to 10:\n\
- progress: how much closer this gets to solving the task\n\
- promise: how likely this path is to lead to a full solution\n\
- confidence: how sure you are in this assessment\n\
\n\
Respond with exactly this format:\n\
progress: <number>\n\
promise: <number>\n\
confidence: <number>\n\
justification: <one sentence>";

const DEFAULT_FINALIZE_TEMPLATE: &str = "Synthesize a final, concise answer to the task from the \
winning reasoning path below. Do not restate the path verbatim — give the answer itself.\n\
\n\
TASK: {instruction}\n\
CONSTRAINTS: {constraints}\n\
\n\
WINNING PATH (root to solution):\n\
{path}\n\
\n\
FINAL ANSWER:";

/// Injectable template set for the three prompt kinds. Defaults match
/// `spec.md` §6's output-shape contract.
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    propose: String,
    value: String,
    finalize: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            propose: DEFAULT_PROPOSE_TEMPLATE.to_string(),
            value: DEFAULT_VALUE_TEMPLATE.to_string(),
            finalize: DEFAULT_FINALIZE_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplates {
    pub fn new(propose: impl Into<String>, value: impl Into<String>, finalize: impl Into<String>) -> Self {
        Self { propose: propose.into(), value: value.into(), finalize: finalize.into() }
    }

    pub fn with_propose(mut self, template: impl Into<String>) -> Self {
        self.propose = template.into();
        self
    }

    pub fn with_value(mut self, template: impl Into<String>) -> Self {
        self.value = template.into();
        self
    }

    pub fn with_finalize(mut self, template: impl Into<String>) -> Self {
        self.finalize = template.into();
        self
    }

    pub fn render_propose(&self, task: &Task, path: &[String], k: u32) -> String {
        fill(&self.propose, task, path).replace("{k}", &k.to_string())
    }

    pub fn render_value(&self, task: &Task, path: &[String]) -> String {
        fill(&self.value, task, path)
    }

    pub fn render_finalize(&self, task: &Task, path: &[String]) -> String {
        fill(&self.finalize, task, path)
    }
}

fn fill(template: &str, task: &Task, path: &[String]) -> String {
    let path_block = path
        .iter()
        .enumerate()
        .map(|(i, thought)| format!("{}. {}", i, thought))
        .collect::<Vec<_>>()
        .join("\n");
    template
        .replace("{instruction}", &task.instruction)
        .replace("{constraints}", task.constraints.as_deref().unwrap_or("(none)"))
        .replace("{path}", &path_block)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_propose_substitutes_all_placeholders() {
        let templates = PromptTemplates::default();
        let task = Task::new("make 24").with_constraints("use +,-,*,/");
        let path = vec!["root".to_string(), "step one".to_string()];
        let rendered = templates.render_propose(&task, &path, 3);

        assert!(rendered.contains("make 24"));
        assert!(rendered.contains("use +,-,*,/"));
        assert!(rendered.contains("0. root"));
        assert!(rendered.contains("1. step one"));
        assert!(rendered.contains("up to 3"));
        assert!(!rendered.contains("{instruction}"));
    }

    #[test]
    fn missing_constraints_renders_placeholder_text() {
        let templates = PromptTemplates::default();
        let task = Task::new("make 24");
        let rendered = templates.render_value(&task, &["root".to_string()]);
        assert!(rendered.contains("(none)"));
    }

    #[test]
    fn custom_template_is_honored() {
        let templates = PromptTemplates::default().with_finalize("ANSWER FOR {instruction}: {path}");
        let task = Task::new("2+2");
        let rendered = templates.render_finalize(&task, &["root".to_string(), "4".to_string()]);
        assert_eq!(rendered, "ANSWER FOR 2+2: 0. root\n1. 4");
    }
}
