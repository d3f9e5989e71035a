//! Prompt assembly.
//!
//! Builds the single text prompt sent to the model from a session transcript
//! and whatever auxiliary data blocks were fetched for the current message.
//! Output is a pure function of the inputs.

use krishi_conversation::ChatTurn;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Instruction appended after the auxiliary data sections.
pub const DATA_USAGE_INSTRUCTION: &str = "Use the information above where it is relevant to the \
     farmer's question. Keep the advice practical, specific and farmer-friendly.";

/// Formatted auxiliary data, one optional block per source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxiliaryBlocks {
    pub weather: Option<String>,
    pub market: Option<String>,
    pub knowledge: Option<String>,
    pub seasonal: Option<String>,
}

impl AuxiliaryBlocks {
    /// Returns the present blocks in prompt order, paired with their headers.
    fn sections(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("CURRENT WEATHER DATA", self.weather.as_deref()),
            ("CURRENT MARKET PRICES", self.market.as_deref()),
            ("RELEVANT AGRICULTURAL KNOWLEDGE", self.knowledge.as_deref()),
            ("SEASONAL FARMING GUIDANCE", self.seasonal.as_deref()),
        ]
        .into_iter()
        .filter_map(|(header, block)| block.map(|b| (header, b)))
    }

    /// Returns true if no block is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections().next().is_none()
    }
}

/// Renders transcripts and auxiliary data into model prompts.
#[derive(Debug, Clone, Default)]
pub struct PromptAssembler;

impl PromptAssembler {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Assembles the prompt.
    ///
    /// Layout: system turn content, each present auxiliary block under its
    /// header (weather, market, knowledge, seasonal), the data usage
    /// instruction, then the non-system turns as `role: content` lines and a
    /// trailing `assistant:` cue.
    #[must_use]
    pub fn assemble(&self, transcript: &[ChatTurn], blocks: &AuxiliaryBlocks) -> String {
        let mut prompt = String::new();

        if let Some(system) = transcript.iter().find(|t| t.is_system()) {
            prompt.push_str(&system.content);
        }

        for (header, block) in blocks.sections() {
            let _ = write!(prompt, "\n\n=== {header} ===\n{}", block.trim_end());
        }

        prompt.push_str("\n\n");
        prompt.push_str(DATA_USAGE_INSTRUCTION);
        prompt.push_str("\n\n");

        let lines: Vec<String> = transcript
            .iter()
            .filter(|t| !t.is_system())
            .map(|t| format!("{}: {}", t.role, t.content))
            .collect();
        prompt.push_str(&lines.join("\n"));
        prompt.push_str("\n\nassistant:");

        prompt
    }
}
