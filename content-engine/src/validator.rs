//! Heuristic checks run against a generated article before it is published.
//!
//! Every check runs, and the violation codes come back in a fixed order:
//! length, table, call-to-action count, then the strict markup checks.

use autopost_core::{ContentConfig, ValidationResult};

/// Literal class WordPress puts on button block links.
const BUTTON_LINK_CLASS: &str = "wp-block-button__link";

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationRules {
    pub min_chars: usize,
    pub max_chars: usize,
    pub min_cta: usize,
    pub cta_phrases: Vec<String>,
    pub strict_markup: bool,
    pub required_sections: Vec<String>,
}

impl ValidationRules {
    pub fn from_config(content: &ContentConfig) -> Self {
        Self {
            min_chars: content.min_chars,
            max_chars: content.max_chars,
            min_cta: content.min_cta,
            cta_phrases: content.cta_phrases.clone(),
            strict_markup: content.strict_markup,
            required_sections: content.required_sections.clone(),
        }
    }
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self::from_config(&ContentConfig::default())
    }
}

/// Remove `<!-- ... -->` comments. An unterminated comment swallows the rest.
pub fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("<!--") {
        out.push_str(&rest[..start]);
        match rest[start + 4..].find("-->") {
            Some(end) => rest = &rest[start + 4 + end + 3..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

/// Remove anything shaped like an HTML tag. A `<` not followed by a letter,
/// `/` or `!` is kept as text.
pub fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('<') {
        let after = &rest[pos + 1..];
        let opens_tag = after
            .chars()
            .next()
            .map_or(false, |c| c.is_ascii_alphabetic() || c == '/' || c == '!');
        match (opens_tag, after.find('>')) {
            (true, Some(end)) => {
                out.push_str(&rest[..pos]);
                rest = &after[end + 1..];
            }
            _ => {
                out.push_str(&rest[..pos + 1]);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn visible_text(text: &str) -> String {
    strip_tags(&strip_comments(text))
}

/// Characters a reader sees, whitespace excluded.
pub fn visible_char_count(text: &str) -> usize {
    visible_text(text)
        .chars()
        .filter(|c| !c.is_whitespace())
        .count()
}

pub fn has_table(text: &str) -> bool {
    let pipe_row = text.lines().any(|line| {
        let line = line.trim();
        line.starts_with('|') && line.matches('|').count() >= 2
    });
    pipe_row || text.to_ascii_lowercase().contains("<table") || text.contains("wp:table")
}

/// Phrase hits or button links, whichever is larger, so a button whose label
/// is one of the phrases is not counted twice.
pub fn count_ctas(text: &str, phrases: &[String]) -> usize {
    let phrase_hits: usize = phrases
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| text.matches(p.as_str()).count())
        .sum();
    let buttons = text.matches(BUTTON_LINK_CLASS).count();
    phrase_hits.max(buttons)
}

pub fn has_sponsored_rel(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    ['"', '\''].iter().any(|q| {
        lower.contains(&format!("rel={q}sponsored nofollow{q}", q = q))
            || lower.contains(&format!("rel={q}nofollow sponsored{q}", q = q))
    })
}

pub fn has_section(text: &str, id: &str) -> bool {
    text.contains(&format!("id=\"{}\"", id))
        || text.contains(&format!("id='{}'", id))
        || text.contains(&format!("{{#{}}}", id))
}

pub fn validate(text: &str, rules: &ValidationRules) -> ValidationResult {
    let mut violations = Vec::new();

    let length = visible_char_count(text);
    if length < rules.min_chars {
        violations.push(format!("too_short:{}", length));
    } else if length > rules.max_chars {
        violations.push(format!("too_long:{}", length));
    }

    if !has_table(text) {
        violations.push("missing_table".to_string());
    }

    if count_ctas(text, &rules.cta_phrases) < rules.min_cta {
        violations.push("few_buttons".to_string());
    }

    if rules.strict_markup {
        if !has_sponsored_rel(text) {
            violations.push("missing_sponsored_rel".to_string());
        }
        for id in &rules.required_sections {
            if !has_section(text, id) {
                violations.push(format!("missing_section:{}", id));
            }
        }
    }

    ValidationResult::from_violations(violations)
}
