//! Recover a JSON document from model output.
//!
//! Stage one parses the whole reply, after removing a Markdown code fence if
//! there is one. Stage two scans for the first balanced `{...}` span that
//! parses. Failure is `None`, never an error.

use serde_json::Value;

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// End index (exclusive) of the object opening at `start`, honoring string
/// literals and escapes.
fn balanced_object_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + offset + ch.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

pub fn extract_json(text: &str) -> Option<Value> {
    let candidate = strip_code_fence(text);
    if let Ok(value) = serde_json::from_str::<Value>(candidate) {
        if value.is_object() || value.is_array() {
            return Some(value);
        }
    }

    text.match_indices('{').find_map(|(start, _)| {
        let end = balanced_object_end(text, start)?;
        serde_json::from_str::<Value>(&text[start..end])
            .ok()
            .filter(Value::is_object)
    })
}
