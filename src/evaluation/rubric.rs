//! Fixed instruction text sent with every evaluation.

/// Coaching rubric: six scored categories with 1-10 anchors, plus a
/// disfluency analysis section.
pub const SYSTEM_INSTRUCTION: &str = include_str!("../../prompts/speaking_style_rubric.md");

/// User turn that accompanies the uploaded media.
pub const USER_PROMPT: &str = "Evaluate the speaker according to your role.";
