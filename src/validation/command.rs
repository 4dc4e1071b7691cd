// Command actions: allow-list gate and per-tool repair

use crate::domain::Session;
use crate::validation::Rejection;

/// Submodes gobuster accepts as its positional argument
const GOBUSTER_MODES: &[&str] = &["dir", "dns", "vhost", "fuzz", "s3", "gcs", "tftp"];

/// Default tool allow-list
pub const DEFAULT_ALLOWED_TOOLS: &[&str] = &["nmap", "gobuster", "ffuf", "nikto", "curl", "whatweb"];

/// Default wordlist injected into brute-force tools
pub const DEFAULT_WORDLIST: &str = "/usr/share/wordlists/dirb/common.txt";

/// Gate and repair rules for shell-tool actions
#[derive(Debug, Clone)]
pub struct CommandPolicy {
    allowed: Vec<String>,
    wordlist: String,
}

impl Default for CommandPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_TOOLS.iter().map(|t| t.to_string()).collect(), DEFAULT_WORDLIST)
    }
}

impl CommandPolicy {
    /// Create a policy from an allow-list and a default wordlist
    pub fn new(allowed: Vec<String>, wordlist: impl Into<String>) -> Self {
        let allowed = allowed
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        Self {
            allowed,
            wordlist: wordlist.into(),
        }
    }

    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    pub fn wordlist(&self) -> &str {
        &self.wordlist
    }

    /// Check the leading token against the allow-list
    pub fn check_allowed(&self, command: &str) -> Result<(), Rejection> {
        let program = command.split_whitespace().next().ok_or(Rejection::Empty)?;
        if self.allowed.iter().any(|t| t == program) {
            Ok(())
        } else {
            Err(Rejection::NotPermitted {
                tool: program.to_string(),
            })
        }
    }

    /// Inject flags and submodes known tools require.
    ///
    /// Whitespace is collapsed, and applying this twice yields the same text.
    pub fn repair(&self, command: &str, session: &Session) -> String {
        let mut tokens: Vec<String> = command.split_whitespace().map(str::to_string).collect();

        match tokens.first().map(String::as_str) {
            Some("gobuster") => {
                if !tokens[1..].iter().any(|t| GOBUSTER_MODES.contains(&t.as_str())) {
                    tokens.insert(1, "dir".to_string());
                }
                if !has_flag(&tokens, &["-w", "--wordlist"]) {
                    tokens.push("-w".to_string());
                    tokens.push(self.wordlist.clone());
                }
            }
            Some("nikto") => {
                if !has_flag(&tokens, &["-h", "-host", "--host"]) {
                    tokens.push("-h".to_string());
                    tokens.push(session.target.clone());
                }
                if let Some(port) = session.port
                    && !has_flag(&tokens, &["-p", "-port", "--port"])
                {
                    tokens.push("-p".to_string());
                    tokens.push(port.to_string());
                }
            }
            Some("ffuf") => {
                if !has_flag(&tokens, &["-w"]) {
                    tokens.push("-w".to_string());
                    tokens.push(self.wordlist.clone());
                }
            }
            _ => {}
        }

        tokens.join(" ")
    }
}

/// True when any token is one of `flags`, alone or in `flag=value` form
fn has_flag(tokens: &[String], flags: &[&str]) -> bool {
    tokens.iter().any(|token| {
        flags
            .iter()
            .any(|flag| token == flag || token.strip_prefix(flag).is_some_and(|rest| rest.starts_with('=')))
    })
}
