//! Prompt definitions for the learning advisor.
//!
//! The recommendation prompt is built per request from the learner's mastery
//! snapshot. Building it is pure and deterministic so it can be tested
//! without a completion service.

use crate::storage::MasteryScore;

/// System prompt installed on the advisor pipe.
pub const ADVISOR_SYSTEM_PROMPT: &str = r#"You are an AI learning advisor for a knowledge-graph learning app. You recommend what a learner should study next based on their per-topic mastery scores.

Always answer with a single JSON object and nothing else."#;

/// Summary text used when the learner has no mastery records yet.
pub const NO_TOPICS_SENTINEL: &str = "no topics learned yet";

/// Instruction block appended after the mastery summary.
pub const RECOMMENDATION_INSTRUCTIONS: &str = r#"NOTE: In this system, >50% mastery means the user has solid understanding. 70%+ means advanced. 100% means expert.

Suggest exactly 3 topics they should learn next that would:
1. Build on what they already know (complement existing knowledge, especially topics >50%)
2. Fill gaps in foundational understanding (topics <30%)
3. Unlock new areas of study

For each recommendation, explain:
- Why this topic is valuable now
- How it connects to their current knowledge (especially their 50%+ topics)
- What mastery level they should aim for (50%+ is good, 70%+ is strong)

IMPORTANT: Topic names should use spaces instead of hyphens or dashes. Write "Machine Learning" not "Machine-Learning", "Neural Networks" not "Neural-Networks", etc.

Respond ONLY with JSON in exactly this format:
{
  "recommendations": [
    {
      "topic": "topic name",
      "reason": "why learn this now",
      "connections": ["topic1", "topic2"],
      "targetMastery": 60
    }
  ]
}"#;

/// Build the recommendation prompt.
///
/// `scores` is rendered in the order given; the store returns it weakest
/// first, which anchors the "build on strengths / fill gaps" instruction.
pub fn build_recommendation_prompt(
    scores: &[MasteryScore],
    current_node_id: Option<&str>,
) -> String {
    let mut prompt =
        String::from("You are an AI learning advisor. Based on this user's mastery data:\n\n");

    if let Some(node_id) = current_node_id {
        prompt.push_str(&format!("Currently viewing: {}\n\n", node_id));
    }

    prompt.push_str("Mastery Scores:\n");
    prompt.push_str(&mastery_summary(scores));
    prompt.push_str("\n\n");
    prompt.push_str(RECOMMENDATION_INSTRUCTIONS);

    prompt
}

/// Render one line per score, or the sentinel for an empty snapshot.
pub fn mastery_summary(scores: &[MasteryScore]) -> String {
    if scores.is_empty() {
        return format!("({})", NO_TOPICS_SENTINEL);
    }

    scores
        .iter()
        .map(|s| format!("- {}: {:.1}% mastery", s.node_id, s.mastery_score))
        .collect::<Vec<_>>()
        .join("\n")
}
