//! Heuristic tier: best-effort command extraction from free text
//!
//! Used only when the structured tier fails. A line is a candidate when it
//! mentions an allow-listed tool as a whole word (case-insensitive). The
//! candidate starts at the earliest such mention, so list markers and lead-ins
//! like `1.` or `Run:` fall away, and the tool name takes its configured
//! spelling. Candidates still go through the validator.

/// Commands found in `text`, one per line that mentions one of `tools`
pub fn candidate_lines(text: &str, tools: &[String]) -> Vec<String> {
    text.lines()
        .map(clean_line)
        .filter(|line| !line.is_empty())
        .filter_map(|line| extract(line, tools))
        .collect()
}

/// Strip shell prompts and list bullets
fn clean_line(line: &str) -> &str {
    let mut line = line.trim();
    for prefix in ["$ ", "# ", "> ", "- ", "* "] {
        if let Some(rest) = line.strip_prefix(prefix) {
            line = rest.trim_start();
            break;
        }
    }
    line
}

/// Slice `line` from its earliest whole-word tool mention
fn extract(line: &str, tools: &[String]) -> Option<String> {
    // ascii lowercasing keeps byte offsets valid for `line`
    let lower = line.to_ascii_lowercase();
    let (start, tool) = tools
        .iter()
        .filter_map(|tool| find_word(&lower, &tool.to_ascii_lowercase()).map(|at| (at, tool)))
        .min_by_key(|(at, _)| *at)?;

    let mut rest = &line[start + tool.len()..];
    // inline code: stop at the closing backtick
    if line[..start].ends_with('`')
        && let Some(end) = rest.find('`')
    {
        rest = &rest[..end];
    }

    Some(format!("{}{}", tool, rest.trim_end_matches('`').trim_end()))
}

fn find_word(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack.match_indices(needle).map(|(at, _)| at).find(|&at| {
        let before = haystack[..at].chars().next_back();
        let after = haystack[at + needle.len()..].chars().next();
        before.is_none_or(|c| !is_word_char(c)) && after.is_none_or(|c| c.is_whitespace() || c == '`')
    })
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '/' | '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tools() -> Vec<String> {
        vec!["nmap".to_string(), "gobuster".to_string(), "curl".to_string()]
    }

    #[test]
    fn test_single_command_line() {
        let text = "Let's start with a service scan.\nnmap -sV 10.0.0.5\nThat should reveal versions.";
        assert_eq!(candidate_lines(text, &tools()), vec!["nmap -sV 10.0.0.5"]);
    }

    #[test]
    fn test_case_insensitive_match_uses_configured_name() {
        let text = "NMAP -sV host";
        assert_eq!(candidate_lines(text, &tools()), vec!["nmap -sV host"]);
    }

    #[test]
    fn test_cleans_prompts_and_bullets() {
        let text = "$ nmap -p- 10.0.0.5\n- `gobuster dir -u http://x`\n";
        assert_eq!(
            candidate_lines(text, &tools()),
            vec!["nmap -p- 10.0.0.5", "gobuster dir -u http://x"]
        );
    }

    #[test]
    fn test_numbered_list() {
        let text = "Plan:\n1. nmap -sV 10.0.0.5\n2) curl -I http://10.0.0.5";
        assert_eq!(
            candidate_lines(text, &tools()),
            vec!["nmap -sV 10.0.0.5", "curl -I http://10.0.0.5"]
        );
    }

    #[test]
    fn test_lead_in_text_is_dropped() {
        let text = "Run: nmap -sV 10.0.0.5\nNext, try `curl -I http://10.0.0.5` to see the headers.";
        assert_eq!(
            candidate_lines(text, &tools()),
            vec!["nmap -sV 10.0.0.5", "curl -I http://10.0.0.5"]
        );
    }

    #[test]
    fn test_tool_inside_other_words_ignored() {
        let text = "libcurl is linked\nsee /usr/bin/nmap\nnmap.conf is missing";
        assert!(candidate_lines(text, &tools()).is_empty());
    }

    #[test]
    fn test_no_matches() {
        assert!(candidate_lines("nothing useful here\n\n", &tools()).is_empty());
        assert!(candidate_lines("", &tools()).is_empty());
    }
}
