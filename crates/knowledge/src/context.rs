//! Context assembly: relevance gate, attributed formatting and a greedy
//! token budget over the fan-out outcomes.

use crate::types::{CollectionOutcome, Match};
use odes_core::{Collection, ContextConfig};
use odes_prompt::EvidenceSection;
use serde::Serialize;

const BLOCK_SEPARATOR: &str = "\n\n";

/// Running token estimate against a fixed ceiling. Owned by one assembly pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextBudget {
    used: usize,
    reserve: usize,
    ceiling: usize,
}

impl ContextBudget {
    pub fn new(reserve: usize, ceiling: usize) -> Self {
        Self {
            used: 0,
            reserve,
            ceiling,
        }
    }

    pub fn fits(&self, cost: usize) -> bool {
        self.reserve + self.used + cost <= self.ceiling
    }

    /// Spend `cost` tokens if they fit.
    pub fn try_spend(&mut self, cost: usize) -> bool {
        if self.fits(cost) {
            self.used += cost;
            true
        } else {
            false
        }
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn remaining(&self) -> usize {
        self.ceiling.saturating_sub(self.reserve + self.used)
    }
}

/// Evidence text for one collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextSection {
    pub collection: Collection,

    /// Accepted blocks joined by blank lines; empty when nothing survived
    pub text: String,

    /// Estimated tokens of `text`
    pub tokens: usize,

    pub blocks: usize,
}

/// Per-collection evidence in catalog order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssembledContext {
    pub sections: Vec<ContextSection>,
    pub budget: ContextBudget,
}

impl AssembledContext {
    /// Blob for a collection id.
    pub fn get(&self, id: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.collection.id == id)
            .map(|s| s.text.as_str())
    }

    /// Ids of collections that contributed evidence.
    pub fn sources(&self) -> Vec<String> {
        self.sections
            .iter()
            .filter(|s| !s.text.is_empty())
            .map(|s| s.collection.id.clone())
            .collect()
    }

    pub fn total_tokens(&self) -> usize {
        self.sections.iter().map(|s| s.tokens).sum()
    }

    pub fn evidence_sections(&self) -> Vec<EvidenceSection> {
        self.sections
            .iter()
            .map(|s| EvidenceSection {
                id: s.collection.id.clone(),
                name: s.collection.name.clone(),
                text: s.text.clone(),
            })
            .collect()
    }
}

/// Turns fan-out outcomes into a bounded context.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    relevance_threshold: f64,
    chars_per_token: usize,
    max_tokens: usize,
    system_prompt_tokens: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(&ContextConfig::default())
    }
}

impl ContextAssembler {
    pub fn new(config: &ContextConfig) -> Self {
        Self {
            relevance_threshold: config.relevance_threshold,
            // Guard the divisor; a validated config never has zero
            chars_per_token: config.chars_per_token.max(1),
            max_tokens: config.max_tokens,
            system_prompt_tokens: config.system_prompt_tokens,
        }
    }

    /// Estimated tokens for a piece of text.
    pub fn estimate_tokens(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_token)
    }

    /// True when a match passes the relevance gate. NaN distances never pass.
    pub fn is_relevant(&self, m: &Match) -> bool {
        m.distance <= self.relevance_threshold
    }

    /// Assemble outcomes in the order given, which must be authority order.
    pub fn assemble(&self, outcomes: &[CollectionOutcome]) -> AssembledContext {
        let mut budget = ContextBudget::new(self.system_prompt_tokens, self.max_tokens);
        let mut sections = Vec::with_capacity(outcomes.len());

        for outcome in outcomes {
            let id = outcome.collection.id.as_str();
            let mut text = String::new();
            let mut tokens = 0;
            let mut blocks = 0;

            for m in &outcome.outcome.matches {
                if !self.is_relevant(m) {
                    tracing::debug!(
                        collection = id,
                        distance = m.distance,
                        "Skipping low-relevance match"
                    );
                    continue;
                }

                let block = format_block(m);
                let cost = if text.is_empty() {
                    self.estimate_tokens(&block)
                } else {
                    self.estimate_tokens(&block) + self.estimate_tokens(BLOCK_SEPARATOR)
                };

                if !budget.try_spend(cost) {
                    tracing::info!(
                        collection = id,
                        used = budget.used(),
                        remaining = budget.remaining(),
                        cost,
                        "Context budget exhausted for collection"
                    );
                    break;
                }

                if !text.is_empty() {
                    text.push_str(BLOCK_SEPARATOR);
                }
                text.push_str(&block);
                tokens += cost;
                blocks += 1;
            }

            sections.push(ContextSection {
                collection: outcome.collection.clone(),
                text,
                tokens,
                blocks,
            });
        }

        tracing::debug!(tokens = budget.used(), "Context assembled");
        AssembledContext { sections, budget }
    }
}

/// Render one match with its attribution.
pub fn format_block(m: &Match) -> String {
    let mut block = m.text.clone();

    if let Some(meta) = &m.metadata {
        if let Some(source) = meta.source.as_deref().filter(|s| !s.is_empty()) {
            block.push_str(&format!("\nSource: {}", source));
        }
        if let Some(page) = meta.page.filter(|p| *p != 0) {
            block.push_str(&format!(" (Page {})", page));
        }
        block.push_str(&format!("\nRaw Distance: {:.4}", m.distance));
    }

    block
}
