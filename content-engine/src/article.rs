use crate::validator::visible_text;
use sha2::{Digest, Sha256};

pub use autopost_core::SLUG_MAX_LEN;
pub const EXCERPT_MAX_CHARS: usize = 120;
const SLUG_HASH_LEN: usize = 8;
const FALLBACK_TITLE_TEMPLATE: &str = "{keyword}の選び方とおすすめ比較【最新ガイド】";

fn digest(key: &str) -> [u8; 32] {
    Sha256::digest(key.as_bytes()).into()
}

/// Stable bucket in `0..buckets` derived from a SHA-256 of `key`.
pub fn bucket(key: &str, buckets: usize) -> usize {
    if buckets == 0 {
        return 0;
    }
    let hash = digest(key);
    let mut head = [0u8; 8];
    head.copy_from_slice(&hash[..8]);
    (u64::from_be_bytes(head) % buckets as u64) as usize
}

/// First `len` hex digits of the SHA-256 of `key`.
pub fn hash_hex(key: &str, len: usize) -> String {
    digest(key)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<String>()
        .chars()
        .take(len)
        .collect()
}

pub fn choose_title(keyword: &str, templates: &[String]) -> String {
    let template = match templates.len() {
        0 => FALLBACK_TITLE_TEMPLATE,
        n => templates[bucket(keyword, n)].as_str(),
    };
    template.replace("{keyword}", keyword)
}

/// The configured CTA phrases rotated to a keyword-specific starting point.
pub fn cta_labels(keyword: &str, phrases: &[String]) -> Vec<String> {
    if phrases.is_empty() {
        return Vec::new();
    }
    let start = bucket(&format!("cta:{}", keyword), phrases.len());
    phrases[start..]
        .iter()
        .chain(phrases[..start].iter())
        .cloned()
        .collect()
}

/// Lowercase ASCII alphanumeric runs joined by `-`. When non-ASCII letters or
/// digits had to be dropped, a short hash of the keyword is appended so two
/// keywords that differ only in those characters get different slugs.
pub fn slugify(keyword: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut dropped = false;

    for ch in keyword.chars() {
        if ch.is_ascii_alphanumeric() {
            current.push(ch.to_ascii_lowercase());
            continue;
        }
        if !ch.is_ascii() && ch.is_alphanumeric() {
            dropped = true;
        }
        if !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }

    let mut slug = parts.join("-");
    let suffix = if dropped || slug.is_empty() {
        Some(hash_hex(keyword, SLUG_HASH_LEN))
    } else {
        None
    };

    let budget = SLUG_MAX_LEN - suffix.as_ref().map_or(0, |s| s.len() + 1);
    if slug.len() > budget {
        slug.truncate(budget);
        while slug.ends_with('-') {
            slug.pop();
        }
    }

    match suffix {
        Some(suffix) if slug.is_empty() => suffix,
        Some(suffix) => format!("{}-{}", slug, suffix),
        None => slug,
    }
}

/// `[label](url)` becomes `label`. The label starts at the last `[` before
/// `](`; brackets that close earlier are left as text.
fn strip_markdown_links(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(mid) = rest.find("](") {
        let head = &rest[..mid];
        let tail = &rest[mid + 2..];
        let Some(close) = tail.find(')') else {
            break;
        };
        match head.rfind('[') {
            Some(open) if !head[open + 1..].contains(']') => {
                out.push_str(&head[..open]);
                out.push_str(&head[open + 1..]);
                rest = &tail[close + 1..];
            }
            _ => {
                out.push_str(&rest[..mid + 2]);
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

/// First prose paragraph of the body, markup removed, at most
/// [`EXCERPT_MAX_CHARS`] characters. Headings, tables, quotes and the
/// disclosure line are skipped.
pub fn excerpt_from_body(body: &str, disclosure: &str) -> String {
    let disclosure = disclosure.trim();
    let visible = visible_text(body);

    let mut block = String::new();
    let mut blocks: Vec<String> = Vec::new();
    for line in visible.lines() {
        if line.trim().is_empty() {
            if !block.is_empty() {
                blocks.push(std::mem::take(&mut block));
            }
        } else {
            block.push_str(line.trim());
            block.push(' ');
        }
    }
    if !block.is_empty() {
        blocks.push(block);
    }

    blocks
        .iter()
        .map(|b| b.trim())
        .filter(|b| !b.starts_with('#') && !b.starts_with('|') && !b.starts_with('>'))
        .map(|b| {
            strip_markdown_links(b)
                .replace(['*', '`'], "")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .find(|b| !b.is_empty() && (disclosure.is_empty() || !b.contains(disclosure)))
        .map(|b| truncate_chars(&b, EXCERPT_MAX_CHARS))
        .unwrap_or_default()
}
