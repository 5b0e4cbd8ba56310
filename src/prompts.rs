// src/prompts.rs
//! Prompt builders for the three semantic call sites. Each asks for a strict
//! JSON payload; the tolerant decoder in `llm` handles whatever comes back.

/// One call per run: a JSON object mapping every topic to an array of
/// diverse search-query strings.
pub fn search_terms_prompt(topics: &[String]) -> String {
    let list = topics
        .iter()
        .map(|t| format!("- {t}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Generate diverse academic search queries for each of the following \
research topics. Queries should mix exact phrases (quoted) and keyword \
combinations suitable for a paper-search engine.\n\n\
Topics:\n{list}\n\n\
Return ONLY a JSON object mapping each topic name, exactly as written above, \
to an array of 2-4 query strings. No other text."
    )
}

/// One call per candidate: which of the configured topics apply.
pub fn classify_prompt(topics: &[String], title: &str, abstract_text: &str) -> String {
    let list = topics
        .iter()
        .map(|t| format!("- {t}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Decide which of the following topics this paper belongs to. A paper \
may match several topics or none.\n\n\
Topics:\n{list}\n\n\
Title: {title}\n\
Abstract: {abstract_text}\n\n\
Return ONLY a JSON object of the form {{\"topics\": [...]}} listing the \
matching topic names exactly as written above. Use an empty array if none apply."
    )
}

/// One call per accepted candidate: summary, keywords, translated abstract.
pub fn insights_prompt(title: &str, abstract_text: &str, translation_language: &str) -> String {
    format!(
        "Analyze the following paper.\n\n\
Title: {title}\n\
Abstract: {abstract_text}\n\n\
Return ONLY a JSON object with these fields:\n\
{{\n\
  \"keywords\": [\"3-5 keywords\"],\n\
  \"summary\": \"a summary of at most 100 words in {translation_language}\",\n\
  \"translated_abstract\": \"the abstract translated into {translation_language}, \
keeping technical terms in English in parentheses\"\n\
}}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_prompt_lists_every_topic() {
        let topics = vec!["Medical LLM".to_string(), "Medical Agent".to_string()];
        let p = classify_prompt(&topics, "T", "A");
        assert!(p.contains("- Medical LLM"));
        assert!(p.contains("- Medical Agent"));
        assert!(p.contains("\"topics\""));
    }

    #[test]
    fn insights_prompt_names_the_target_language() {
        let p = insights_prompt("T", "A", "Chinese");
        assert!(p.contains("Chinese"));
    }
}
