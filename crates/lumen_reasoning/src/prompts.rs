use crate::orchestrator::ReflectionRequest;

const REFLECTION_INSTRUCTIONS: &str = r#"You are an empathetic reflection generator for a personal journal.

Return only a valid JSON object. Do not include any explanation, notes, or extra text.

Required keys:
- reflection: A deeply empathetic reflection (2-3 sentences).
- summary: One-line summary of the writer's emotion or theme.
- followups: A list of exactly 2 follow-up objects, each containing:
  {"question": "A supportive open-ended follow-up question", "follow_up": "Why this question may help"}
- tone: The tone you used (e.g. warm, gentle, supportive, hopeful).
- safety_flag: true if the entry shows distress or risk, false otherwise.

Example (strict format):
{
  "reflection": "It sounds like you're feeling overwhelmed but still trying your best.",
  "summary": "Feeling emotionally exhausted but resilient.",
  "followups": [
    {"question": "What usually helps you recharge when you feel this way?", "follow_up": "Encourages awareness of coping methods."},
    {"question": "Would you like to talk about what has been hardest lately?", "follow_up": "Invites deeper reflection."}
  ],
  "tone": "warm",
  "safety_flag": false
}"#;

/// Build the single reflection prompt for a request.
pub fn reflection_prompt(request: &ReflectionRequest) -> String {
    let mut prompt = String::from(REFLECTION_INSTRUCTIONS);

    let context: Vec<&str> = request
        .context
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    if !context.is_empty() {
        prompt.push_str("\n\n== EARLIER ENTRIES (oldest first) ==\n");
        for entry in context {
            prompt.push_str("- ");
            prompt.push_str(entry);
            prompt.push('\n');
        }
    }

    if request.emotion.is_some() || request.sentiment.is_some() {
        prompt.push_str("\n\n== ANALYSIS HINTS ==\n");
        if let Some(emotion) = request.emotion {
            prompt.push_str(&format!("Detected emotion: {}\n", emotion));
        }
        if let Some(sentiment) = request.sentiment {
            prompt.push_str(&format!("Sentiment score (-1 to 1): {:.2}\n", sentiment));
        }
    }

    prompt.push_str(&format!(
        "\n\nNow generate the JSON response for this entry:\n\"\"\"{}\"\"\"\n",
        request.text.trim()
    ));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::EmotionLabel;

    #[test]
    fn test_prompt_embeds_entry_and_schema() {
        let p = reflection_prompt(&ReflectionRequest::new("Rough day at work"));
        assert!(p.contains("\"\"\"Rough day at work\"\"\""));
        assert!(p.contains("safety_flag"));
        assert!(p.contains("exactly 2"));
        assert!(!p.contains("EARLIER ENTRIES"));
        assert!(!p.contains("ANALYSIS HINTS"));
    }

    #[test]
    fn test_prompt_includes_hints_and_context() {
        let request = ReflectionRequest {
            text: "Better today".into(),
            emotion: Some(EmotionLabel::Positive),
            sentiment: Some(0.456),
            context: vec!["Slept badly".into(), "  ".into(), "Long meeting".into()],
        };
        let p = reflection_prompt(&request);
        assert!(p.contains("Detected emotion: positive"));
        assert!(p.contains("0.46"));
        assert!(p.contains("- Slept badly\n- Long meeting\n"));
        assert!(p.find("Slept badly").unwrap() < p.find("Better today").unwrap());
    }
}
