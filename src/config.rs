use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use agentloop::interpret::CodeFallback;
use agentloop::llm::{DEFAULT_HOSTS, OllamaConfig};
use agentloop::report::DEFAULT_OUTPUT_CLIP;
use agentloop::runner::ControllerConfig;
use agentloop::validation::{DEFAULT_ALLOWED_TOOLS, DEFAULT_WORDLIST, SourceLanguage, ValidatorConfig};
use agentloop::workspace::{DEFAULT_SOLUTION_FILE, DEFAULT_TESTS_FILE, TestRunnerConfig, pytest_command};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub llm: LlmConfig,
    #[serde(rename = "loop")]
    pub iteration: LoopConfig,
    pub command: CommandConfig,
    pub code: CodeConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    /// Candidate base URLs, probed in order
    pub hosts: Vec<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let defaults = OllamaConfig::default();
        Self {
            model: defaults.model,
            hosts: DEFAULT_HOSTS.iter().map(|h| h.to_string()).collect(),
            temperature: defaults.temperature,
            max_tokens: defaults.max_tokens,
            timeout_ms: 120000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    pub max_iterations: u32,
    pub action_timeout_ms: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            action_timeout_ms: 600000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    pub allowed_tools: Vec<String>,
    pub wordlist: String,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            allowed_tools: DEFAULT_ALLOWED_TOOLS.iter().map(|t| t.to_string()).collect(),
            wordlist: DEFAULT_WORDLIST.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeConfig {
    pub language: SourceLanguage,
    pub workspace: PathBuf,
    pub solution_file: String,
    pub tests_file: String,
    /// Defaults to running pytest on `tests_file`
    pub test_command: Option<String>,
    pub test_timeout_ms: u64,
    pub stop_on_test_pass: bool,
    /// Replaces the built-in fallback solution when set
    pub fallback_solution: Option<String>,
    pub fallback_tests: Option<String>,
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self {
            language: SourceLanguage::default(),
            workspace: PathBuf::from("workspace"),
            solution_file: DEFAULT_SOLUTION_FILE.to_string(),
            tests_file: DEFAULT_TESTS_FILE.to_string(),
            test_command: None,
            test_timeout_ms: 300000,
            stop_on_test_pass: true,
            fallback_solution: None,
            fallback_tests: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub dir: PathBuf,
    pub output_clip: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("reports"),
            output_clip: DEFAULT_OUTPUT_CLIP,
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Client settings; the base URL is chosen later by host discovery
    pub fn ollama(&self) -> OllamaConfig {
        OllamaConfig {
            model: self.llm.model.clone(),
            temperature: self.llm.temperature,
            max_tokens: self.llm.max_tokens,
            timeout: Duration::from_millis(self.llm.timeout_ms),
            ..OllamaConfig::default()
        }
    }

    pub fn validator(&self) -> ValidatorConfig {
        ValidatorConfig {
            allowed_tools: self.command.allowed_tools.clone(),
            wordlist: self.command.wordlist.clone(),
            language: self.code.language,
        }
    }

    pub fn controller(&self) -> ControllerConfig {
        ControllerConfig {
            action_timeout: Duration::from_millis(self.iteration.action_timeout_ms),
            stop_on_test_pass: self.code.stop_on_test_pass,
        }
    }

    pub fn test_runner(&self) -> TestRunnerConfig {
        let command = self
            .code
            .test_command
            .clone()
            .unwrap_or_else(|| pytest_command(&self.code.tests_file));
        TestRunnerConfig::new(command)
            .with_timeout(Duration::from_millis(self.code.test_timeout_ms))
    }

    pub fn fallback(&self) -> CodeFallback {
        let defaults = CodeFallback::default();
        CodeFallback {
            solution: self.code.fallback_solution.clone().unwrap_or(defaults.solution),
            tests: self.code.fallback_tests.clone().unwrap_or(defaults.tests),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.llm.model, "llama3.1:latest");
        assert_eq!(config.llm.hosts.len(), 4);
        assert_eq!(config.iteration.max_iterations, 10);
        assert_eq!(config.iteration.action_timeout_ms, 600000);
        assert!(config.command.allowed_tools.contains(&"gobuster".to_string()));
        assert_eq!(config.code.solution_file, "solution.py");
        assert_eq!(config.test_runner().command, "python3 -m pytest tests.py -v");
        assert!(config.code.stop_on_test_pass);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
llm:
  model: mistral:latest
loop:
  max_iterations: 3
command:
  allowed_tools: [nmap, curl]
code:
  language: rust
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.llm.model, "mistral:latest");
        assert_eq!(config.llm.timeout_ms, 120000);
        assert_eq!(config.iteration.max_iterations, 3);
        assert_eq!(config.iteration.action_timeout_ms, 600000);
        assert_eq!(config.command.allowed_tools, vec!["nmap", "curl"]);
        assert_eq!(config.code.language, SourceLanguage::Rust);
        assert_eq!(config.report.dir, PathBuf::from("reports"));
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("agentloop.yml");
        fs::write(&path, "loop:\n  max_iterations: 7\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.iteration.max_iterations, 7);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let path = PathBuf::from("/nonexistent/agentloop.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_test_command_follows_tests_file() {
        let yaml = "code:\n  tests_file: test_solution.py\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.test_runner().command, "python3 -m pytest test_solution.py -v");

        let yaml = "code:\n  tests_file: test_solution.py\n  test_command: make check\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.test_runner().command, "make check");
    }

    #[test]
    fn test_derived_configs() {
        let mut config = Config::default();
        config.code.fallback_tests = Some("def test_x():\n    assert True\n".to_string());
        config.iteration.action_timeout_ms = 1500;

        assert_eq!(config.controller().action_timeout, Duration::from_millis(1500));
        assert_eq!(config.ollama().timeout, Duration::from_secs(120));
        assert_eq!(config.validator().wordlist, "/usr/share/wordlists/dirb/common.txt");
        let fallback = config.fallback();
        assert!(fallback.solution.contains("def factorial"));
        assert!(fallback.tests.starts_with("def test_x"));
    }
}
