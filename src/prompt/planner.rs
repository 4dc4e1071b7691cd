//! Phase planners - map a session's progress to a phase and build its prompt
//!
//! Planners are pure: the same session and feedback always produce the same
//! prompt text. The phase is chosen from the iteration index alone:
//! `min(iteration * phases / max_iterations, phases - 1)`.

use serde::Serialize;
use serde_json::json;

use crate::domain::Session;
use crate::error::Result;
use crate::prompt::render::PromptRenderer;
use crate::prompt::templates::{CODE_TEMPLATE, COMMAND_TEMPLATE};
use crate::prompt::clip;
use crate::validation::SourceLanguage;

const COMMAND_TEMPLATE_NAME: &str = "command";
const CODE_TEMPLATE_NAME: &str = "code";

/// A named stage of a session with its instructions and example actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Phase {
    pub name: &'static str,
    pub instructions: &'static str,
    pub examples: &'static [&'static str],
}

/// Reconnaissance → Enumeration → Vulnerability Testing → Exploitation
pub const COMMAND_PHASES: &[Phase] = &[
    Phase {
        name: "Reconnaissance",
        instructions: "Map the target. Identify open ports, running services and their versions. Prefer quick, low-noise scans first.",
        examples: &["nmap -sV -p {port} {target}", "whatweb {url}", "curl -I {url}"],
    },
    Phase {
        name: "Enumeration",
        instructions: "Enumerate what the services expose: directories, files, virtual hosts, parameters and technologies. Build on the discoveries so far.",
        examples: &["gobuster dir -u {url}", "ffuf -u {url}/FUZZ", "curl -s {url}/robots.txt"],
    },
    Phase {
        name: "Vulnerability Testing",
        instructions: "Test the enumerated surface for known vulnerabilities and misconfigurations. Verify each suspicion with a concrete request.",
        examples: &["nikto -h {target}", "nmap --script vuln -p {port} {target}", "curl -s {url}/admin"],
    },
    Phase {
        name: "Exploitation",
        instructions: "Confirm the impact of the vulnerabilities found. Gather evidence for each finding and stop once the assessment is complete.",
        examples: &["curl -s -X POST {url}/login -d user=admin", "curl -s {url}/.git/config"],
    },
];

/// Implementation → Refinement
pub const CODE_PHASES: &[Phase] = &[
    Phase {
        name: "Implementation",
        instructions: "Write a complete, working implementation of the task together with tests that exercise it, including edge cases and error handling.",
        examples: &[],
    },
    Phase {
        name: "Refinement",
        instructions: "Fix whatever the previous test run or syntax check reported. Keep what already works; return the full files, not a diff.",
        examples: &[],
    },
];

/// Phase index for `iteration` out of `max_iterations` across `count` phases
pub fn phase_index(iteration: u32, max_iterations: u32, count: usize) -> usize {
    if count == 0 || max_iterations == 0 {
        return 0;
    }
    let raw = iteration as usize * count / max_iterations as usize;
    raw.min(count - 1)
}

/// Builds the prompt for each iteration of a session
pub trait PhasePlanner: Send + Sync {
    /// Ordered, non-empty phase list
    fn phases(&self) -> &[Phase];

    /// Phase the session is currently in
    fn phase_for(&self, session: &Session) -> &Phase {
        let phases = self.phases();
        &phases[phase_index(session.iteration, session.max_iterations, phases.len())]
    }

    /// Render the prompt for the session's current iteration
    fn build_prompt(&self, session: &Session, previous_feedback: Option<&str>) -> Result<String>;
}

/// Limits that keep prompts bounded as a session accumulates output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptLimits {
    /// Most discoveries embedded, newest first
    pub max_discoveries: usize,
    /// Characters kept from each discovery output
    pub output_clip: usize,
    /// Characters kept from the previous feedback
    pub feedback_clip: usize,
}

impl Default for PromptLimits {
    fn default() -> Self {
        Self {
            max_discoveries: 10,
            output_clip: 2000,
            feedback_clip: 4000,
        }
    }
}

#[derive(Serialize)]
struct DiscoveryView {
    action: String,
    output: String,
}

/// Planner for command sessions
pub struct CommandPlanner {
    renderer: PromptRenderer,
    tools: Vec<String>,
    limits: PromptLimits,
}

impl CommandPlanner {
    pub fn new(tools: Vec<String>) -> Result<Self> {
        let mut renderer = PromptRenderer::new();
        renderer.register_template(COMMAND_TEMPLATE_NAME, COMMAND_TEMPLATE)?;
        Ok(Self {
            renderer,
            tools,
            limits: PromptLimits::default(),
        })
    }

    pub fn with_limits(mut self, limits: PromptLimits) -> Self {
        self.limits = limits;
        self
    }
}

impl PhasePlanner for CommandPlanner {
    fn phases(&self) -> &[Phase] {
        COMMAND_PHASES
    }

    fn build_prompt(&self, session: &Session, previous_feedback: Option<&str>) -> Result<String> {
        let index = phase_index(session.iteration, session.max_iterations, COMMAND_PHASES.len());
        let phase = &COMMAND_PHASES[index];

        let discoveries: Vec<DiscoveryView> = session
            .discoveries
            .iter()
            .rev()
            .take(self.limits.max_discoveries)
            .map(|(action, output)| DiscoveryView {
                action: action.clone(),
                output: clip(output.trim_end(), self.limits.output_clip),
            })
            .collect();

        // no port: a {port} example would be rejected as unresolved
        let examples: Vec<&str> = phase
            .examples
            .iter()
            .copied()
            .filter(|example| session.port.is_some() || !example.contains("{port}"))
            .collect();

        let context = json!({
            "target": session.target,
            "port": session.port,
            "url": session.url(),
            "iteration_number": session.iteration + 1,
            "max_iterations": session.max_iterations,
            "phase_number": index + 1,
            "phase_count": COMMAND_PHASES.len(),
            "phase_name": phase.name,
            "instructions": phase.instructions,
            "examples": examples,
            "tools": self.tools.join(", "),
            "discoveries": discoveries,
            "findings": session.findings,
        });

        let feedback = previous_feedback.map(|f| clip(f, self.limits.feedback_clip));
        self.renderer
            .render_with_feedback(COMMAND_TEMPLATE_NAME, &context, feedback.as_deref())
    }
}

#[derive(Serialize)]
struct FileView {
    name: String,
    source: String,
}

/// Planner for code sessions
pub struct CodePlanner {
    renderer: PromptRenderer,
    language: SourceLanguage,
    solution_file: String,
    tests_file: String,
    limits: PromptLimits,
}

impl CodePlanner {
    pub fn new(language: SourceLanguage, solution_file: impl Into<String>, tests_file: impl Into<String>) -> Result<Self> {
        let mut renderer = PromptRenderer::new();
        renderer.register_template(CODE_TEMPLATE_NAME, CODE_TEMPLATE)?;
        Ok(Self {
            renderer,
            language,
            solution_file: solution_file.into(),
            tests_file: tests_file.into(),
            limits: PromptLimits::default(),
        })
    }

    pub fn with_limits(mut self, limits: PromptLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Python module name tests import from, derived from the solution file
    fn module(&self) -> Option<&str> {
        match self.language {
            SourceLanguage::Python => Some(
                self.solution_file
                    .strip_suffix(".py")
                    .unwrap_or(&self.solution_file),
            ),
            SourceLanguage::Rust => None,
        }
    }
}

impl PhasePlanner for CodePlanner {
    fn phases(&self) -> &[Phase] {
        CODE_PHASES
    }

    fn build_prompt(&self, session: &Session, previous_feedback: Option<&str>) -> Result<String> {
        let index = phase_index(session.iteration, session.max_iterations, CODE_PHASES.len());
        let phase = &CODE_PHASES[index];

        // discoveries hold the current source of each workspace file
        let files: Vec<FileView> = session
            .discoveries
            .iter()
            .map(|(name, source)| FileView {
                name: name.clone(),
                source: source.trim_end().to_string(),
            })
            .collect();

        let context = json!({
            "task": session.target,
            "language": self.language.as_str(),
            "iteration_number": session.iteration + 1,
            "max_iterations": session.max_iterations,
            "phase_number": index + 1,
            "phase_count": CODE_PHASES.len(),
            "phase_name": phase.name,
            "instructions": phase.instructions,
            "files": files,
            "solution_file": self.solution_file,
            "tests_file": self.tests_file,
            "module": self.module(),
        });

        let feedback = previous_feedback.map(|f| clip(f, self.limits.feedback_clip));
        self.renderer
            .render_with_feedback(CODE_TEMPLATE_NAME, &context, feedback.as_deref())
    }
}
