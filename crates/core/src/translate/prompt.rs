//! System instructions and response schema sent with every batch.

use serde_json::{json, Value};

/// Source-language label meaning "let the model figure it out".
pub const AUTO_DETECT: &str = "auto";

/// Build the system instruction for translating from `source` to `target`.
pub fn system_prompt(source: &str, target: &str) -> String {
    let source = if source.trim().is_empty() || source.eq_ignore_ascii_case(AUTO_DETECT) {
        "the source language (detect it from the text)".to_string()
    } else {
        format!("'{source}'")
    };
    format!(
        r#"You are a professional subtitle translator for film and television.

You receive a JSON array of subtitle entries, each with an integer "index" and a "text".
Translate every "text" from {source} to '{target}'.

Rules:
- Keep the tone, meaning, style, punctuation and capitalization of each line.
- Keep lines roughly the same length so they still fit the on-screen timing.
- A line already written in '{target}' is returned unchanged.
- If a line is in a language other than {source} and you can recognize it, translate it to '{target}' as well.
- Empty lines and lines made only of symbols or numbers are returned as-is.
- Read the whole batch first. Use earlier lines to resolve gender, formality, speaker identity and recurring names, and translate consistently across the batch.
- Never add, remove, merge, split or reorder entries. Each output "index" must equal its input "index".
- Reply with the JSON array only. No explanations, no comments, no questions.

Example input:
[{{"index": 47, "text": "Maria walked into the room."}}, {{"index": 48, "text": "Good morning, doctor."}}]
Example output (English to Spanish):
[{{"index": 47, "text": "María entró en la habitación."}}, {{"index": 48, "text": "Buenos días, doctora."}}]"#
    )
}

/// JSON schema of the expected reply: `[{index: integer, text: string}, ...]`.
pub fn response_schema() -> Value {
    json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": {
                "index": {"type": "integer"},
                "text": {"type": "string"}
            },
            "required": ["index", "text"],
            "additionalProperties": false
        }
    })
}
