//! Placeholder substitution for command actions

use crate::domain::Session;

const TARGET_TOKENS: &[&str] = &["{target}", "<target>", "{host}", "<host>"];
const PORT_TOKENS: &[&str] = &["{port}", "<port>"];
const URL_TOKENS: &[&str] = &["{url}", "<url>"];

/// Replace target/port/url placeholders with the session's concrete values.
///
/// Port placeholders are left untouched when the session has no port.
pub fn substitute(raw: &str, session: &Session) -> String {
    let mut text = raw.to_string();

    // url first: it expands to something containing the target
    for token in URL_TOKENS {
        if text.contains(token) {
            text = text.replace(token, &session.url());
        }
    }

    for token in TARGET_TOKENS {
        if text.contains(token) {
            text = text.replace(token, &session.target);
        }
    }

    if let Some(port) = session.port {
        let port = port.to_string();
        for token in PORT_TOKENS {
            if text.contains(token) {
                text = text.replace(token, &port);
            }
        }
    }

    text
}

/// First placeholder token still present in `text`, if any
pub fn unresolved(text: &str) -> Option<&'static str> {
    URL_TOKENS
        .iter()
        .chain(TARGET_TOKENS)
        .chain(PORT_TOKENS)
        .copied()
        .find(|token| text.contains(token))
}
