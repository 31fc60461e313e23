//! Scoring request text.

use crate::error::Result;
use crate::models::AiTranslation;

/// Build the user message asking the assistant to score `batch`
pub fn scoring_request(batch: &[AiTranslation]) -> Result<String> {
    let records = serde_json::to_string_pretty(batch)?;

    Ok(format!(
        r"Score each source record in the following JSON array.
{records}

Return one record per source record. Each returned record keeps every field of its source record (key, en, fr) unchanged and adds:
    aiComments: string          // problems found with the translation or with its consistency; omit when the translation is good and consistent
    aiSuggestion: string        // a better French translation; omit when the translation is good and consistent
    aiTranslationScore: number  // integer from 0 to 5, 5 when the French is the best possible translation of the English, 0 when it is wrong
    aiConsistencyScore: number  // integer from 0 to 5, 5 when the French matches how similar English is translated in translations.json, 0 when it is very inconsistent
Placeholders, usually written in {{}}, are not part of the text to judge.
HTML markup, usually written in <>, is not part of the text to judge.
Output the records as a JSON array inside a ```json fenced block.
"
    ))
}
