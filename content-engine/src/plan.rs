use serde::Deserialize;
use serde_json::Value;

/// Structured article returned in JSON plan mode.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ArticlePlan {
    pub title: String,
    pub meta_description: String,
    pub outline: Vec<String>,
    pub body: String,
    pub ctas: Vec<PlanCta>,
    pub footnotes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PlanCta {
    Link { label: String, url: String },
    Text(String),
}

impl ArticlePlan {
    /// `None` when the value is not a plan object or its body is blank.
    pub fn from_value(value: Value) -> Option<Self> {
        let plan: ArticlePlan = serde_json::from_value(value).ok()?;
        if plan.body.trim().is_empty() {
            return None;
        }
        Some(plan)
    }

    /// Body followed by any CTA links the body does not already contain, then
    /// the footnotes.
    pub fn render_markdown(&self) -> String {
        let mut out = self.body.trim_end().to_string();

        let missing: Vec<String> = self
            .ctas
            .iter()
            .filter_map(|cta| match cta {
                PlanCta::Link { label, url } if !url.is_empty() && !self.body.contains(url.as_str()) => {
                    Some(format!("- [{}]({})", label, url))
                }
                PlanCta::Text(text) if !text.is_empty() && !self.body.contains(text.as_str()) => {
                    Some(format!("- {}", text))
                }
                _ => None,
            })
            .collect();
        if !missing.is_empty() {
            out.push_str("\n\n");
            out.push_str(&missing.join("\n"));
        }

        let notes: Vec<&String> = self.footnotes.iter().filter(|n| !n.trim().is_empty()).collect();
        if !notes.is_empty() {
            out.push_str("\n\n");
            for note in notes {
                out.push_str("※ ");
                out.push_str(note.trim());
                out.push('\n');
            }
        }
        out
    }

    pub fn title(&self) -> Option<&str> {
        Some(self.title.trim()).filter(|t| !t.is_empty())
    }

    pub fn meta_description(&self) -> Option<&str> {
        Some(self.meta_description.trim()).filter(|m| !m.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plan_from_value() {
        let plan = ArticlePlan::from_value(json!({
            "title": "USB充電器 65Wの選び方",
            "meta_description": "65W充電器の比較",
            "outline": ["結論", "比較表"],
            "body": "## 結論\n本文",
            "ctas": [{"label": "楽天で見る", "url": "https://a.example"}, "公式で見る"],
            "footnotes": ["価格は執筆時点のものです"]
        }))
        .unwrap();

        assert_eq!(plan.title(), Some("USB充電器 65Wの選び方"));
        assert_eq!(plan.outline.len(), 2);
        let rendered = plan.render_markdown();
        assert!(rendered.starts_with("## 結論\n本文\n\n- [楽天で見る](https://a.example)\n- 公式で見る"));
        assert!(rendered.ends_with("※ 価格は執筆時点のものです\n"));
    }

    #[test]
    fn test_plan_without_body_is_rejected() {
        assert!(ArticlePlan::from_value(json!({"title": "x", "body": "  "})).is_none());
        assert!(ArticlePlan::from_value(json!(["not", "an", "object"])).is_none());
    }

    #[test]
    fn test_ctas_already_in_body_are_not_repeated() {
        let plan = ArticlePlan {
            body: "[楽天で見る](https://a.example)".to_string(),
            ctas: vec![PlanCta::Link {
                label: "楽天で見る".to_string(),
                url: "https://a.example".to_string(),
            }],
            ..Default::default()
        };
        assert_eq!(plan.render_markdown(), "[楽天で見る](https://a.example)");
        assert_eq!(plan.meta_description(), None);
    }
}
