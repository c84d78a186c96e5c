//! Prompt templates for query overviews and per-capability summaries.

use crate::config::GenerationConfig;
use crate::generation::GenerationRequest;
use crate::models::CapabilityMatch;

pub const OVERVIEW_SYSTEM_PROMPT: &str =
    "You are a business analyst providing capability analysis. \
     Provide a comprehensive summary (under 200 words) covering:\n\
     - Overview of matching capabilities\n\
     - Key systems and changes involved\n\
     - Business impact and value\n\
     Then mention source files with similar capabilities for further reference.";

pub const SUMMARY_SYSTEM_PROMPT: &str =
    "You are a business analyst summarizing capability information. \
     Provide clear, concise summaries that highlight business value and technical changes.";

pub const SUMMARY_MAX_TOKENS: u32 = 200;

fn or_na(value: &str) -> &str {
    if value.trim().is_empty() {
        "N/A"
    } else {
        value
    }
}

/// Overview prompt over the top `overview_matches` matches, listing up to
/// `source_links` source files.
pub fn overview_prompt(
    query: &str,
    matches: &[CapabilityMatch],
    overview_matches: usize,
    source_links: usize,
) -> String {
    let capabilities = matches
        .iter()
        .take(overview_matches)
        .map(|m| format!("- {}: {}", or_na(&m.capability), or_na(&m.business_description)))
        .collect::<Vec<_>>()
        .join("\n");

    let sources = matches
        .iter()
        .take(source_links)
        .enumerate()
        .map(|(i, m)| format!("{}. {}", i + 1, or_na(&m.file_name)))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Query: \"{query}\"\n\n\
         Matching capabilities found:\n{capabilities}\n\n\
         Provide an overview summary and mention these source files \
         contain similar capabilities:\n{sources}\n"
    )
}

pub fn overview_request(
    query: &str,
    matches: &[CapabilityMatch],
    overview_matches: usize,
    source_links: usize,
    generation: &GenerationConfig,
) -> GenerationRequest {
    GenerationRequest {
        prompt: overview_prompt(query, matches, overview_matches, source_links),
        system: Some(OVERVIEW_SYSTEM_PROMPT.to_string()),
        max_tokens: generation.max_tokens,
        temperature: generation.temperature,
    }
}

pub fn summary_prompt(m: &CapabilityMatch) -> String {
    format!(
        "Based on the following capability information, provide a concise summary:\n\n\
         Capability: {}\n\
         Scope/Business Description: {}\n\
         System Changes: {}\n\n\
         Please provide a brief, informative summary that captures the key aspects \
         of this capability and its business impact.",
        or_na(&m.capability),
        or_na(&m.business_description),
        or_na(&m.system_changes),
    )
}

pub fn summary_request(m: &CapabilityMatch, generation: &GenerationConfig) -> GenerationRequest {
    GenerationRequest {
        prompt: summary_prompt(m),
        system: Some(SUMMARY_SYSTEM_PROMPT.to_string()),
        max_tokens: SUMMARY_MAX_TOKENS.min(generation.max_tokens),
        temperature: generation.temperature,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capability(rank: usize, name: &str, file: &str) -> CapabilityMatch {
        CapabilityMatch {
            rank,
            capability: name.to_string(),
            business_description: format!("{} description", name),
            system_changes: String::new(),
            similarity_score: 0.9,
            distance: 0.1,
            file_name: file.to_string(),
            source_link: String::new(),
            summary: None,
        }
    }

    #[test]
    fn test_overview_uses_top_three_and_five_sources() {
        let matches: Vec<CapabilityMatch> = (1..=6)
            .map(|i| capability(i, &format!("Cap{}", i), &format!("file{}.xlsx", i)))
            .collect();
        let prompt = overview_prompt("consent", &matches, 3, 5);
        assert!(prompt.contains("Query: \"consent\""));
        assert!(prompt.contains("- Cap3: Cap3 description"));
        assert!(!prompt.contains("- Cap4:"));
        assert!(prompt.contains("5. file5.xlsx"));
        assert!(!prompt.contains("file6.xlsx"));
        assert!(prompt.contains(
            "mention these source files contain similar capabilities:\n1. file1.xlsx"
        ));
    }

    #[test]
    fn test_overview_request_settings() {
        let generation = GenerationConfig::default();
        let req = overview_request("q", &[capability(1, "Login", "a.xlsx")], 3, 5, &generation);
        assert_eq!(req.max_tokens, 300);
        assert!((req.temperature - 0.1).abs() < f32::EPSILON);
        assert!(req.system.unwrap().contains("under 200 words"));
    }

    #[test]
    fn test_summary_prompt_fills_missing_fields() {
        let m = capability(1, "Login", "a.xlsx");
        let prompt = summary_prompt(&m);
        assert!(prompt.contains("Capability: Login"));
        assert!(prompt.contains("System Changes: N/A"));
        assert!(prompt.ends_with("key aspects of this capability and its business impact."));
        assert!(SUMMARY_SYSTEM_PROMPT.contains("information. Provide clear"));
        assert!(OVERVIEW_SYSTEM_PROMPT.contains("covering:\n- Overview of matching"));
        assert_eq!(summary_request(&m, &GenerationConfig::default()).max_tokens, 200);
    }
}
