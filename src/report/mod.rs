//! Markdown report for a finished session.
//!
//! One file per session, named after the domain and the time it was written.
//! Discovery outputs are clipped; code sessions also carry the final files.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use log::info;

use crate::domain::{ActionDomain, Session};
use crate::error::Result;
use crate::prompt::clip;

/// Default characters kept from each discovery output
pub const DEFAULT_OUTPUT_CLIP: usize = 4000;

pub struct ReportWriter {
    dir: PathBuf,
    output_clip: usize,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            output_clip: DEFAULT_OUTPUT_CLIP,
        }
    }

    pub fn with_output_clip(mut self, output_clip: usize) -> Self {
        self.output_clip = output_clip;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Render the report text
    pub fn render(&self, session: &Session, model: &str, generated: DateTime<Local>) -> String {
        let mut out = String::new();

        let title = match session.domain {
            ActionDomain::Command => "Assessment Report",
            ActionDomain::Code => "Development Report",
        };
        out.push_str(&format!("# {}\n\n", title));

        let label = match session.domain {
            ActionDomain::Command => "Target",
            ActionDomain::Code => "Task",
        };
        let subject = match session.domain {
            ActionDomain::Command => session.address(),
            ActionDomain::Code => session.target.clone(),
        };
        out.push_str(&format!("- **{}:** {}\n", label, subject));
        out.push_str(&format!("- **Status:** {}\n", session.status));
        out.push_str(&format!(
            "- **Iterations:** {} of {}\n",
            session.iterations_run(),
            session.max_iterations
        ));
        out.push_str(&format!(
            "- **Service calls:** {} ({} answered)\n",
            session.service_calls, session.successful_calls
        ));
        out.push_str(&format!("- **Model:** {}\n", model));
        out.push_str(&format!("- **Generated:** {}\n", generated.format("%Y-%m-%d %H:%M:%S")));

        if !session.last_analysis.is_empty() {
            out.push_str(&format!("\n## Analysis\n\n{}\n", session.last_analysis.trim()));
        }

        out.push_str("\n## Findings\n\n");
        if session.findings.is_empty() {
            out.push_str("None reported.\n");
        } else {
            for finding in &session.findings {
                out.push_str(&format!("- {}\n", finding));
            }
        }

        out.push_str("\n## Iterations\n\n");
        out.push_str("| # | Phase | Proposed | Rejected | Executed | Succeeded | Tests |\n");
        out.push_str("|---|-------|----------|----------|----------|-----------|-------|\n");
        for record in &session.history {
            let tests = match (record.tests_passed, &record.service_error) {
                (_, Some(_)) => "service error",
                (Some(true), _) => "passed",
                (Some(false), _) => "failed",
                (None, _) => "-",
            };
            out.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} |\n",
                record.index + 1,
                record.phase,
                record.proposed,
                record.rejected,
                record.executed,
                record.succeeded,
                tests
            ));
        }

        match session.domain {
            ActionDomain::Command => {
                out.push_str("\n## Discoveries\n");
                if session.discoveries.is_empty() {
                    out.push_str("\nNone.\n");
                }
                for (action, output) in &session.discoveries {
                    out.push_str(&format!(
                        "\n### `{}`\n\n```\n{}\n```\n",
                        action,
                        clip(output.trim_end(), self.output_clip)
                    ));
                }
            }
            ActionDomain::Code => {
                out.push_str("\n## Final Code\n");
                if session.discoveries.is_empty() {
                    out.push_str("\nNo code was written.\n");
                }
                for (file, source) in &session.discoveries {
                    out.push_str(&format!("\n### {}\n\n```\n{}\n```\n", file, source.trim_end()));
                }
            }
        }

        out
    }

    /// Write the report into the report directory and return its path
    pub fn write(&self, session: &Session, model: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let now = Local::now();
        let path = self.dir.join(format!(
            "{}_report_{}.md",
            session.domain,
            now.format("%Y%m%d_%H%M%S")
        ));
        std::fs::write(&path, self.render(session, model, now))?;
        info!("Report written to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IterationRecord, SessionStatus};
    use tempfile::TempDir;

    fn finished_command_session() -> Session {
        let mut session = Session::for_commands("10.0.0.5", Some(80), 5);
        session.status = SessionStatus::Succeeded;
        session.service_calls = 2;
        session.successful_calls = 2;
        session.last_analysis = "Web server exposes an admin panel".to_string();
        session.add_findings(["Admin panel without auth"]);
        session.record_discovery("curl -I http://10.0.0.5:80", "HTTP/1.1 200 OK\n");
        session.record_discovery("nmap -sV 10.0.0.5", "x".repeat(50));
        let mut record = IterationRecord::new(0, "Reconnaissance");
        record.proposed = 2;
        record.executed = 2;
        record.succeeded = 2;
        session.history.push(record);
        session
    }

    #[test]
    fn test_render_command_report() {
        let writer = ReportWriter::new("/tmp").with_output_clip(10);
        let report = writer.render(&finished_command_session(), "llama3.1:latest", Local::now());

        assert!(report.starts_with("# Assessment Report"));
        assert!(report.contains("- **Target:** 10.0.0.5:80"));
        assert!(report.contains("- **Status:** succeeded"));
        assert!(report.contains("- **Iterations:** 1 of 5"));
        assert!(report.contains("- Admin panel without auth"));
        assert!(report.contains("| 1 | Reconnaissance | 2 | 0 | 2 | 2 | - |"));
        assert!(report.contains("### `curl -I http://10.0.0.5:80`"));
        assert!(report.contains("more bytes clipped"));
        assert!(!report.contains(&"x".repeat(11)));
    }

    #[test]
    fn test_render_code_report() {
        let mut session = Session::for_code("Write factorial", 3);
        session.status = SessionStatus::Exhausted;
        session.record_discovery("solution.py", "def factorial(n):\n    return 1\n");
        let mut record = IterationRecord::new(0, "Implementation");
        record.tests_passed = Some(false);
        session.history.push(record);

        let report = ReportWriter::new("/tmp").render(&session, "m", Local::now());
        assert!(report.starts_with("# Development Report"));
        assert!(report.contains("- **Task:** Write factorial"));
        assert!(report.contains("## Final Code"));
        assert!(report.contains("### solution.py"));
        assert!(report.contains("def factorial(n):"));
        assert!(report.contains("| failed |"));
        assert!(report.contains("None reported."));
    }

    #[test]
    fn test_write_report_file() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path().join("reports"));
        let path = writer.write(&finished_command_session(), "llama3.1:latest").unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("command_report_"));
        assert!(name.ends_with(".md"));
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("## Discoveries"));
    }
}
