//! Review prompt
//!
//! The rubric is data so the prompt the reviewer sees and the clamp applied to
//! its answer always use the same ceilings.

use std::fmt::Write;

/// Point ceilings for each quality criterion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rubric {
    /// Logic and correctness
    pub logic: f64,
    /// Duplicated code, unnecessary variables, redundant logic
    pub redundancy: f64,
    /// Organisation, naming, comments
    pub structure: f64,
    /// Algorithmic efficiency and resource use
    pub efficiency: f64,
}

impl Default for Rubric {
    fn default() -> Self {
        Self {
            logic: 10.0,
            redundancy: 10.0,
            structure: 5.0,
            efficiency: 5.0,
        }
    }
}

impl Rubric {
    /// Sum of all criterion ceilings
    pub fn total(&self) -> f64 {
        self.logic + self.redundancy + self.structure + self.efficiency
    }
}

/// Build the review prompt for one submission
pub fn render_prompt(rubric: &Rubric, source: &str, actual_output: &str, expected_output: &str) -> String {
    let mut prompt = String::new();

    // Writing into a String never fails
    let _ = write!(
        prompt,
        "You are an experienced code reviewer. Grade the quality of the program \
         below out of {total} points.\n\n\
         ## Rubric\n\n\
         1. Logic and correctness ({logic} points): is the logic clear and correct?\n\
         2. Redundancy ({redundancy} points): duplicated code, unnecessary variables, redundant logic.\n\
         3. Structure and readability ({structure} points): organisation, naming, comments.\n\
         4. Efficiency ({efficiency} points): algorithmic efficiency and resource use.\n\n",
        total = rubric.total(),
        logic = rubric.logic,
        redundancy = rubric.redundancy,
        structure = rubric.structure,
        efficiency = rubric.efficiency,
    );

    prompt.push_str("## Source\n\n```\n");
    prompt.push_str(source);
    prompt.push_str("\n```\n\n");

    prompt.push_str("## Program output\n\nActual:\n```\n");
    prompt.push_str(actual_output);
    prompt.push_str("\n```\n\nExpected:\n```\n");
    prompt.push_str(expected_output);
    prompt.push_str("\n```\n\n");

    let _ = write!(
        prompt,
        "## Answer format\n\n\
         Reply with a single JSON object and nothing else:\n\
         {{\n  \
           \"score\": <total, 0-{total}>,\n  \
           \"logicScore\": <0-{logic}>,\n  \
           \"redundancyScore\": <0-{redundancy}>,\n  \
           \"structureScore\": <0-{structure}>,\n  \
           \"efficiencyScore\": <0-{efficiency}>,\n  \
           \"issues\": [\"...\"],\n  \
           \"suggestions\": [\"...\"],\n  \
           \"detailedFeedback\": \"...\"\n\
         }}\n\n\
         Deduct heavily for serious redundancy or logic problems; severe cases may \
         score at or near 0. Point to concrete locations in issues and suggestions.\n",
        total = rubric.total(),
        logic = rubric.logic,
        redundancy = rubric.redundancy,
        structure = rubric.structure,
        efficiency = rubric.efficiency,
    );

    prompt
}
