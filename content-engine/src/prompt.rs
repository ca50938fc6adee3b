//! Prompt rendering. Everything here is a pure function of its inputs, so a
//! retry for the same keyword and candidates sends the same text.

use crate::article::cta_labels;
use crate::ranking::price_stats;
use autopost_core::{GenerationMode, ProductCandidate, PromptMessages, RunConfig};
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq)]
pub struct PromptOptions {
    pub disclosure: String,
    pub prompt_items: usize,
    pub min_chars: usize,
    pub max_chars: usize,
    pub min_cta: usize,
    pub cta_phrases: Vec<String>,
    pub mode: GenerationMode,
    pub strict_markup: bool,
    pub required_sections: Vec<String>,
}

impl PromptOptions {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            disclosure: config.site.affiliate_disclosure.clone(),
            prompt_items: config.content.prompt_items,
            min_chars: config.content.min_chars,
            max_chars: config.content.max_chars,
            min_cta: config.content.min_cta,
            cta_phrases: config.content.cta_phrases.clone(),
            mode: config.llm.mode,
            strict_markup: config.content.strict_markup,
            required_sections: config.content.required_sections.clone(),
        }
    }
}

/// `3980` -> `3,980`
pub fn format_yen(price: u64) -> String {
    let digits = price.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn system_prompt(options: &PromptOptions) -> String {
    format!(
        "あなたは一次情報を重視し、法令を守るアフィリエイト記事のライター兼編集者です。\n\
         日本語で、H2中心・短文・結論先出しの構成で書き、煽らない落ち着いたトーンを保ちます。\n\
         誇大表現や断定は避け、医療・効果効能に関する断定は書きません。\n\
         価格と在庫は変動するため「執筆時点」の情報であることを明記します。\n\
         本文の先頭付近に次の開示文をそのまま含めてください:『{}』\n\
         比較は公正に行い、長所・短所・向いている人を必ず併記します。",
        options.disclosure
    )
}

fn candidate_lines(items: &[ProductCandidate], limit: usize) -> String {
    if items.is_empty() {
        return "- (十分な商品候補がありませんでした)".to_string();
    }
    let mut out = String::new();
    for (i, item) in items.iter().take(limit).enumerate() {
        let _ = write!(
            out,
            "- {}. {} / 参考価格: {}円 / レビュー: {:.2}（{}件）",
            i + 1,
            item.name,
            format_yen(item.price),
            item.review_average,
            item.review_count
        );
        if !item.shop.is_empty() {
            let _ = write!(out, " / ショップ: {}", item.shop);
        }
        let _ = writeln!(out, " / URL: {}", item.url);
    }
    out.trim_end().to_string()
}

fn markup_rules(options: &PromptOptions) -> String {
    let mut rules = String::new();
    if options.strict_markup {
        rules.push_str(
            "- 商品リンクは <a href=\"URL\" rel=\"sponsored nofollow\">文言</a> のHTML形式で書く\n",
        );
    }
    if !options.required_sections.is_empty() {
        let ids: Vec<String> = options
            .required_sections
            .iter()
            .map(|id| format!("<h2 id=\"{}\">", id))
            .collect();
        let _ = writeln!(rules, "- 次の見出しを必ず含める: {}", ids.join(" "));
    }
    rules
}

const JSON_PLAN_SCHEMA: &str = r#"{
  "title": "記事タイトル",
  "meta_description": "120字以内の要約",
  "outline": ["見出し1", "見出し2"],
  "body": "Markdownの記事本文（比較表とCTAを含む）",
  "ctas": [{"label": "楽天で見る", "url": "https://..."}],
  "footnotes": ["価格は執筆時点のものです"]
}"#;

/// Article request for one keyword. `items` should already be ranked; only
/// the first `prompt_items` are listed.
pub fn build_article_prompt(
    keyword: &str,
    items: &[ProductCandidate],
    options: &PromptOptions,
) -> PromptMessages {
    let shown = &items[..items.len().min(options.prompt_items)];
    let labels = cta_labels(keyword, &options.cta_phrases);
    let labels: Vec<String> = labels.iter().take(3).map(|l| format!("「{}」", l)).collect();

    let mut user = String::new();
    let _ = writeln!(user, "【キーワード】{}\n", keyword);
    let _ = writeln!(user, "【比較候補（楽天市場）】\n{}", candidate_lines(shown, options.prompt_items));
    if let Some(stats) = price_stats(shown) {
        let _ = writeln!(
            user,
            "- 価格帯（参考）: {}〜{}円 / 中央値 {}円",
            format_yen(stats.min),
            format_yen(stats.max),
            format_yen(stats.median)
        );
    }

    let _ = writeln!(user, "\n【出力仕様】");
    let _ = writeln!(
        user,
        "- 文字数: {}字以上、{}字以内",
        options.min_chars, options.max_chars
    );
    user.push_str(
        "- 構成: 冒頭で結論要約 → 選び方（評価軸3〜5） → 比較表と短評 → おすすめ1〜3製品（長所/短所/向いている人） → FAQ（5問） → まとめ（要点3つ＋CTA）\n",
    );
    user.push_str("- 比較表はMarkdownの表（| 区切り）で出す\n");
    let _ = writeln!(
        user,
        "- CTAボタン風リンクを{}個以上入れ、文言は{}を使う",
        options.min_cta,
        labels.join("")
    );
    user.push_str("- 確信のない仕様数値は断定せず「目安」「例」と書く\n");
    user.push_str(&markup_rules(options));

    user.push_str("\n【注意】\n- 医療・効果効能の断定は禁止\n- 価格/在庫は変動前提で「執筆時点」と表記\n- クリックベイト禁止\n\n");

    match options.mode {
        GenerationMode::JsonPlan => {
            user.push_str(
                "次の形のJSONオブジェクトだけを出力してください。前後に説明文やコードフェンスを付けないこと。\n",
            );
            user.push_str(JSON_PLAN_SCHEMA);
        }
        GenerationMode::Markdown | GenerationMode::Template => {
            user.push_str("この条件を満たす記事本文（Markdownのみ）を出力してください。");
        }
    }

    PromptMessages::new(system_prompt(options), user)
}

fn describe_violation(code: &str, options: &PromptOptions) -> String {
    let (name, detail) = code.split_once(':').unwrap_or((code, ""));
    match name {
        "too_short" => format!(
            "本文が短すぎます（{}字）。{}字以上になるよう具体的な説明を加筆してください。",
            detail, options.min_chars
        ),
        "too_long" => format!(
            "本文が長すぎます（{}字）。{}字以内に要約してください。",
            detail, options.max_chars
        ),
        "missing_table" => "Markdownの比較表（| 区切り）がありません。".to_string(),
        "few_buttons" => format!(
            "CTAリンクが{}個未満です。「{}」などの文言でリンクを追加してください。",
            options.min_cta,
            options.cta_phrases.join("」「")
        ),
        "missing_sponsored_rel" => {
            "商品リンクに rel=\"sponsored nofollow\" がありません。".to_string()
        }
        "missing_section" => format!("id=\"{}\" の見出しがありません。", detail),
        _ => code.to_string(),
    }
}

/// Ask for a corrected article. The reply is always a full body in the same
/// markup as the draft, never a JSON plan.
pub fn build_repair_prompt(
    keyword: &str,
    draft_body: &str,
    violations: &[String],
    options: &PromptOptions,
) -> PromptMessages {
    let mut user = String::new();
    let _ = writeln!(user, "【キーワード】{}\n", keyword);
    user.push_str("次の記事は自動チェックで以下の問題が見つかりました。\n");
    for code in violations {
        let _ = writeln!(user, "- {}", describe_violation(code, options));
    }
    user.push_str(&markup_rules(options));
    user.push_str("\n問題をすべて直した記事本文の全文だけを出力してください。内容と事実関係は変えないこと。\n\n");
    user.push_str("-----記事ここから-----\n");
    user.push_str(draft_body.trim());
    user.push_str("\n-----記事ここまで-----");

    PromptMessages::new(system_prompt(options), user)
}
