//! Prompt assembly for recommendation generation.
//!
//! The instruction and output template are fixed here and never taken from
//! user input; they are what keeps recommendations tied to the catalog.

use super::context::format_context;
use super::{ContextEntry, RetrievedContext};
use tracing::{debug, warn};

/// Fixed task policy and output template for the recommendation model.
pub const SYSTEM_INSTRUCTION: &str = r#"You are a film recommendation assistant. Your goal is to recommend films to the user based on their query and the films supplied in the context.

Rules:
1. Only recommend films that appear in the supplied context. Never mention a film that is not in the context.
2. Recommend no more than five films.
3. If a film in the context does not fit the query, leave it out.
4. Each recommendation must be original and insightful: two to three sentences explaining why the film fits the query.
5. If the context says that no films matched, tell the user that no matching films were found and do not name any film.

Use this template for every recommendation:

- [Title of Film]:
    - Runtime: [runtime from the context]
    - Release Date: [release date from the context]
    - Recommendation: [one-line justification, then your reasoning]
    - Source: [source from the context]
"#;

/// Context used when retrieval found nothing.
pub const NO_MATCHES_CONTEXT: &str =
    "No films in the catalog matched this query. There are no films to recommend.";

/// Heading placed before the context block.
const CONTEXT_HEADING: &str = "Films retrieved from the catalog:";

/// Rough characters-per-token ratio for budget estimates.
const CHARS_PER_TOKEN: usize = 4;

/// Per-message framing overhead in tokens.
const MESSAGE_OVERHEAD_TOKENS: usize = 8;

/// A structured prompt: system instruction, context block, user question.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub context: String,
    /// The user's question, verbatim.
    pub question: String,
}

impl Prompt {
    /// The context turn as sent to the model.
    pub fn context_message(&self) -> String {
        format!("{}\n\n{}", CONTEXT_HEADING, self.context)
    }

    /// Whether the prompt carries the explicit "no matching films" context.
    pub fn has_no_matches(&self) -> bool {
        self.context == NO_MATCHES_CONTEXT
    }

    /// Plain-text rendering of all three turns, for logs and budgeting.
    pub fn render(&self) -> String {
        format!(
            "[system]\n{}\n\n[context]\n{}\n\n[user]\n{}",
            self.system,
            self.context_message(),
            self.question
        )
    }

    pub fn estimated_tokens(&self) -> usize {
        estimate_tokens(&self.system)
            + estimate_tokens(&self.context_message())
            + estimate_tokens(&self.question)
            + 3 * MESSAGE_OVERHEAD_TOKENS
    }
}

/// Estimate the token count of a text.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Build a prompt from its three parts. An empty context is replaced by
/// the explicit "no matching films" context.
pub fn assemble(system_instruction: &str, context: &str, question: &str) -> Prompt {
    let context = if context.trim().is_empty() {
        NO_MATCHES_CONTEXT.to_string()
    } else {
        context.to_string()
    };

    Prompt {
        system: system_instruction.to_string(),
        context,
        question: question.to_string(),
    }
}

/// Assembles prompts within a token budget.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    max_context_tokens: usize,
}

impl PromptAssembler {
    pub fn new(max_context_tokens: usize) -> Self {
        Self { max_context_tokens }
    }

    /// Build the prompt for a question, dropping the lowest-ranked entries
    /// until everything fits the budget. The instruction and question are
    /// never dropped.
    pub fn build(&self, context: &RetrievedContext, question: &str) -> Prompt {
        let kept = self.fit_to_budget(context.entries(), question);
        if kept.len() < context.len() {
            warn!(
                "Dropped {} of {} films to fit the {} token budget",
                context.len() - kept.len(),
                context.len(),
                self.max_context_tokens
            );
        }

        let prompt = assemble(SYSTEM_INSTRUCTION, &format_context(kept), question);
        debug!(
            films = kept.len(),
            tokens = prompt.estimated_tokens(),
            "Assembled prompt"
        );
        prompt
    }

    /// Longest prefix of `entries` (highest ranked first) that fits.
    pub fn fit_to_budget<'a>(
        &self,
        entries: &'a [ContextEntry],
        question: &str,
    ) -> &'a [ContextEntry] {
        let fixed = assemble(SYSTEM_INSTRUCTION, "", question);
        // The no-matches text is a stand-in for the context; count only the heading.
        let fixed_tokens = fixed.estimated_tokens() - estimate_tokens(&fixed.context_message())
            + estimate_tokens(CONTEXT_HEADING)
            + 1;

        let mut available = self.max_context_tokens.saturating_sub(fixed_tokens);
        let mut count = 0;
        for entry in entries {
            let cost = estimate_tokens(&entry.text) + 1;
            if cost > available {
                break;
            }
            available -= cost;
            count += 1;
        }

        &entries[..count]
    }
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::new(12_000)
    }
}
