//! Prompt Renderer - Render templates with context variables using Handlebars
//!
//! Strict mode is off (missing variables render empty) and HTML escaping is
//! disabled, since prompts routinely carry tool output and source code.

use handlebars::Handlebars;
use serde::Serialize;

use crate::error::{AgentError, Result};

/// Heading under which the previous iteration's feedback is appended
pub const FEEDBACK_HEADING: &str = "## Previous Iteration Feedback";

/// Renders prompt templates using Handlebars templating
pub struct PromptRenderer {
    handlebars: Handlebars<'static>,
}

impl Default for PromptRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptRenderer {
    /// Create a new PromptRenderer with default settings
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        handlebars.register_escape_fn(handlebars::no_escape);
        Self { handlebars }
    }

    /// Register a named template for later use
    pub fn register_template(&mut self, name: &str, template: &str) -> Result<()> {
        self.handlebars
            .register_template_string(name, template)
            .map_err(|e| AgentError::Template(format!("Failed to register template '{}': {}", name, e)))
    }

    /// Render a previously registered template
    pub fn render_named<T: Serialize>(&self, name: &str, context: &T) -> Result<String> {
        self.handlebars
            .render(name, context)
            .map_err(|e| AgentError::Template(format!("Failed to render template '{}': {}", name, e)))
    }

    /// Render a registered template and append a feedback section when there is one
    pub fn render_with_feedback<T: Serialize>(&self, name: &str, context: &T, feedback: Option<&str>) -> Result<String> {
        let rendered = self.render_named(name, context)?;

        match feedback.map(str::trim) {
            Some(text) if !text.is_empty() => Ok(format!("{}\n\n---\n\n{}\n\n{}\n", rendered.trim_end(), FEEDBACK_HEADING, text)),
            _ => Ok(rendered),
        }
    }
}
