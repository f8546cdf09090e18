//! Lenient JSON input.
//!
//! Python's `json.dumps` writes non-finite floats as bare `NaN`,
//! `Infinity` and `-Infinity`, which strict JSON parsers reject. Scored
//! files routinely contain them, so they are rewritten to `null` before
//! parsing.

const TOKENS: [&str; 3] = ["-Infinity", "Infinity", "NaN"];

/// Replace non-finite number tokens outside string literals with `null`.
pub fn sanitize_json(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut rest = input;

    while let Some(c) = rest.chars().next() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        } else if let Some(token) = TOKENS.iter().find(|t| rest.starts_with(**t)) {
            output.push_str("null");
            rest = &rest[token.len()..];
            continue;
        }

        output.push(c);
        rest = &rest[c.len_utf8()..];
    }

    output
}
