//! Prompt System - phase planning and template rendering
//!
//! This module provides the PhasePlanner trait with its command and code
//! implementations, and the Handlebars renderer they share.

mod planner;
mod render;
mod templates;

pub use planner::{
    CODE_PHASES, COMMAND_PHASES, CodePlanner, CommandPlanner, Phase, PhasePlanner, PromptLimits, phase_index,
};
pub use render::{FEEDBACK_HEADING, PromptRenderer};

/// Keep at most `max_chars` characters of `text`, marking the cut
pub fn clip(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}\n[... {} more bytes clipped]", &text[..cut], text.len() - cut),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_short_text_unchanged() {
        assert_eq!(clip("hello", 10), "hello");
        assert_eq!(clip("hello", 5), "hello");
    }

    #[test]
    fn test_clip_marks_cut() {
        let clipped = clip("abcdefgh", 3);
        assert!(clipped.starts_with("abc\n"));
        assert!(clipped.contains("5 more bytes clipped"));
    }

    #[test]
    fn test_clip_char_boundary() {
        let clipped = clip("ééé", 2);
        assert!(clipped.starts_with("éé\n"));
    }
}
