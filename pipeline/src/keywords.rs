use autopost_core::{KeywordConfig, KeywordMode};
use product_source::sanitize_keyword;
use tracing::debug;

fn push_unique(out: &mut Vec<String>, keyword: String) {
    if !keyword.is_empty() && !out.contains(&keyword) {
        out.push(keyword);
    }
}

/// Candidate keywords for this run. Explicit `overrides` replace selection
/// entirely and are only sanitized and deduplicated.
pub fn select_keywords(config: &KeywordConfig, overrides: &[String]) -> Vec<String> {
    select_keywords_with(config, overrides, &mut fastrand::Rng::new())
}

pub fn select_keywords_with(
    config: &KeywordConfig,
    overrides: &[String],
    rng: &mut fastrand::Rng,
) -> Vec<String> {
    let mut keywords = Vec::new();

    if !overrides.is_empty() {
        for keyword in overrides {
            push_unique(&mut keywords, sanitize_keyword(keyword));
        }
        debug!(count = keywords.len(), "Using keywords from the command line");
        return keywords;
    }

    for seed in config.seeds.iter().map(|s| sanitize_keyword(s)) {
        if seed.is_empty() {
            continue;
        }
        push_unique(&mut keywords, seed.clone());
        if config.mode == KeywordMode::Expand {
            for modifier in config.modifiers.iter().map(|m| sanitize_keyword(m)) {
                if !modifier.is_empty() {
                    push_unique(&mut keywords, format!("{} {}", seed, modifier));
                }
            }
        }
    }

    if config.shuffle {
        rng.shuffle(&mut keywords);
    }
    keywords.truncate(config.max_candidates);
    debug!(count = keywords.len(), mode = ?config.mode, "Selected keywords");
    keywords
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(mode: KeywordMode, shuffle: bool) -> KeywordConfig {
        KeywordConfig {
            mode,
            seeds: vec![
                " USB充電器   65W ".to_string(),
                "電気ケトル".to_string(),
                "".to_string(),
                "USB充電器 65W".to_string(),
            ],
            modifiers: vec!["おすすめ".to_string(), "比較".to_string()],
            max_candidates: 10,
            shuffle,
        }
    }

    #[test]
    fn test_seeds_are_sanitized_and_deduplicated() {
        let keywords = select_keywords(&config(KeywordMode::Seeds, false), &[]);
        assert_eq!(keywords, vec!["USB充電器 65W", "電気ケトル"]);
    }

    #[test]
    fn test_expand_adds_modifiers() {
        let keywords = select_keywords(&config(KeywordMode::Expand, false), &[]);
        assert_eq!(
            keywords,
            vec![
                "USB充電器 65W",
                "USB充電器 65W おすすめ",
                "USB充電器 65W 比較",
                "電気ケトル",
                "電気ケトル おすすめ",
                "電気ケトル 比較",
            ]
        );
    }

    #[test]
    fn test_shuffle_keeps_the_same_set_and_caps() {
        let mut cfg = config(KeywordMode::Expand, true);
        cfg.max_candidates = 4;
        let mut rng = fastrand::Rng::with_seed(7);
        let keywords = select_keywords_with(&cfg, &[], &mut rng);
        assert_eq!(keywords.len(), 4);

        let all = select_keywords(&config(KeywordMode::Expand, false), &[]);
        for keyword in &keywords {
            assert!(all.contains(keyword));
        }
    }

    #[test]
    fn test_overrides_bypass_selection() {
        let overrides = vec!["  加湿器  ".to_string(), "加湿器".to_string(), "".to_string()];
        let keywords = select_keywords(&config(KeywordMode::Expand, true), &overrides);
        assert_eq!(keywords, vec!["加湿器"]);
    }

    #[test]
    fn test_no_seeds() {
        let cfg = KeywordConfig {
            seeds: vec![],
            ..KeywordConfig::default()
        };
        assert!(select_keywords(&cfg, &[]).is_empty());
    }
}
