//! Output rendering: plain text for terminals, JSON for programs

use mcq_core::{option_letter, McqError, McqRecord, Result};
use serde::Serialize;

const BANNER_WIDTH: usize = 40;

/// JSON body `{"mcqs": [...]}`
#[derive(Debug, Serialize)]
pub struct McqOutput<'a> {
    pub mcqs: &'a [McqRecord],
}

pub fn render_json(mcqs: &[McqRecord]) -> Result<String> {
    serde_json::to_string_pretty(&McqOutput { mcqs }).map_err(|e| McqError::Other(e.into()))
}

/// Numbered questions with lettered options, answer and explanation
pub fn render_text(mcqs: &[McqRecord]) -> String {
    let rule = "=".repeat(BANNER_WIDTH);
    let mut out = format!("\n{rule} Generated MCQs {rule}\n");

    for (i, mcq) in mcqs.iter().enumerate() {
        out.push_str(&format!("\nQ{}: {}\n", i + 1, mcq.question));
        for (j, option) in mcq.options.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", option_letter(j), option));
        }
        out.push_str(&format!(
            "\nCorrect Answer: {}. {}\n",
            mcq.correct_letter(),
            mcq.answer
        ));
        out.push_str(&format!("Explanation: {}\n", mcq.explanation));
    }

    out
}
