//! Extraction instructions sent alongside each score-sheet image.
//!
//! Callers can override the default via
//! [`crate::config::ExtractionConfig::system_prompt`]; the custom-column
//! section is appended either way, because the response schema depends on it.

use crate::columns::{ColumnSpec, SCORE_KEY, STUDENT_NAME_KEY};

/// Default instructions for reading a test paper or score list.
pub const DEFAULT_INSTRUCTIONS: &str = r#"You are an expert at reading graded test papers and score lists. Extract data from this image.

Follow these rules precisely:

1. COMPLETENESS
   - Extract EVERY student record in the image, not just the first one
   - A single sheet may list many students; return one object per student

2. NAMES
   - Copy each name exactly as written, in its original script
   - Keep every diacritic and accent (e.g. Vietnamese tone marks)
   - Never transliterate, romanise, or drop characters

3. SCORES
   - Return the final score as a single value, without rounding
   - If the sheet clearly uses a scale other than 10 points, convert the score to a 10-point scale
   - Letter grades or symbols that cannot be converted are returned as written

4. OUTPUT FORMAT
   - Respond with ONE JSON array matching the provided schema
   - If no student records are found, respond with an empty array []
   - Do NOT add commentary or explanations"#;

/// Build the full instruction text for a column list.
pub fn build_instructions(columns: &ColumnSpec, override_prompt: Option<&str>) -> String {
    let mut text = override_prompt.unwrap_or(DEFAULT_INSTRUCTIONS).to_string();

    text.push_str(&format!(
        "\n\nFIELDS\n   - \"{STUDENT_NAME_KEY}\": the student's full name\n   - \"{SCORE_KEY}\": the student's score"
    ));
    for column in columns.custom_columns() {
        text.push_str(&format!("\n   - \"{}\": {}", column.key, column.label));
    }
    if !columns.custom_columns().is_empty() {
        text.push_str("\n   Use an empty string for any field that does not appear on the sheet.");
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prompt_covers_required_rules() {
        let text = build_instructions(&ColumnSpec::mandatory_only(), None);
        assert!(text.contains("EVERY student record"));
        assert!(text.contains("original script"));
        assert!(text.contains("10-point scale"));
        assert!(text.contains("empty array"));
        assert!(!text.contains("empty string for any field"));
    }

    #[test]
    fn custom_columns_are_listed_with_keys() {
        let columns = ColumnSpec::new(["Student ID", "Class"]).unwrap();
        let text = build_instructions(&columns, None);
        assert!(text.contains("\"student_id\": Student ID"));
        assert!(text.contains("\"class\": Class"));
        assert!(text.contains("empty string"));
    }

    #[test]
    fn override_replaces_rules_but_keeps_fields() {
        let text = build_instructions(&ColumnSpec::mandatory_only(), Some("Read the sheet."));
        assert!(text.starts_with("Read the sheet."));
        assert!(!text.contains("COMPLETENESS"));
        assert!(text.contains("\"student_name\""));
    }
}
