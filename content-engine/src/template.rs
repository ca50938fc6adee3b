use crate::article::cta_labels;
use crate::prompt::format_yen;
use crate::ranking::price_stats;
use autopost_core::ProductCandidate;
use std::fmt::Write as _;

const TEMPLATE_MAX_ITEMS: usize = 5;
const TEMPLATE_MODEL: &str = "template";

/// Model name recorded on drafts produced without a model call.
pub fn template_model_name() -> &'static str {
    TEMPLATE_MODEL
}

fn stars(average: f64) -> String {
    format!("★{:.1}", average)
}

fn label_at(labels: &[String], i: usize) -> &str {
    labels
        .get(i % labels.len().max(1))
        .map(String::as_str)
        .unwrap_or("楽天で見る")
}

fn cta_line(item: &ProductCandidate, label: &str) -> String {
    format!("👉 [{}]({})", label, item.url)
}

/// Markdown article assembled from the ranked candidates alone.
pub fn render_template_article(
    keyword: &str,
    items: &[ProductCandidate],
    disclosure: &str,
    cta_phrases: &[String],
) -> String {
    let items = &items[..items.len().min(TEMPLATE_MAX_ITEMS)];
    let labels = cta_labels(keyword, cta_phrases);
    let label = |i: usize| label_at(&labels, i).to_string();
    let mut md = String::new();

    let _ = writeln!(md, "{}\n", disclosure);
    let _ = writeln!(
        md,
        "「{kw}」を探している方に向けて、楽天市場のレビュー件数と評価をもとに候補を{n}点に絞り込みました。\
         レビューの平均点だけでなく件数も加味して順位を付けているため、少数の高評価だけで上位に来ることはありません。\
         価格と在庫は変動するため、掲載している価格は執筆時点の参考値です。購入前に販売ページで最新情報を確認してください。\n",
        kw = keyword,
        n = items.len()
    );

    md.push_str("## 結論\n\n");
    if let Some(top) = items.first() {
        let _ = writeln!(
            md,
            "迷ったら **{}** が第一候補です。レビュー{}件で平均{}と、評価の安定感が頭ひとつ抜けています。\
             予算を抑えたい場合は比較表から価格の近い候補を選ぶと失敗しにくくなります。\n",
            top.name,
            top.review_count,
            stars(top.review_average)
        );
        let _ = writeln!(md, "{}\n", cta_line(top, &label(0)));
    }

    let _ = writeln!(md, "## {}の選び方\n", keyword);
    md.push_str(
        "- **用途に合うスペックか**: 使う場面を先に決め、必要な性能を満たすものに絞ります。数値は目安として読み、過剰なスペックにお金を払わないことが大切です。\n\
         - **レビュー件数と評価のバランス**: 件数が多いほど評価は安定します。平均点が高くても件数が極端に少ない場合は慎重に判断しましょう。\n\
         - **価格とサポート**: 保証期間や販売店の対応も含めて比較すると、長く使ったときの満足度が変わります。\n\
         - **サイズと重さ**: 置き場所や持ち運びの有無を考え、使い続けられる大きさかを確認します。\n\n",
    );

    md.push_str("## 比較表\n\n| 順位 | 商品 | 参考価格 | レビュー |\n|---|---|---|---|\n");
    for (i, item) in items.iter().enumerate() {
        let _ = writeln!(
            md,
            "| {} | {} | {}円 | {}（{}件） |",
            i + 1,
            item.name.replace('|', "／"),
            format_yen(item.price),
            stars(item.review_average),
            item.review_count
        );
    }
    if let Some(stats) = price_stats(items) {
        let _ = writeln!(
            md,
            "\n価格帯は{}円から{}円、中央値は{}円です（執筆時点）。\n",
            format_yen(stats.min),
            format_yen(stats.max),
            format_yen(stats.median)
        );
    }

    md.push_str("## おすすめ商品\n\n");
    for (i, item) in items.iter().enumerate() {
        let _ = writeln!(md, "### {}. {}\n", i + 1, item.name);
        let _ = writeln!(
            md,
            "参考価格は{}円、レビューは{}件で平均{}です。",
            format_yen(item.price),
            item.review_count,
            stars(item.review_average)
        );
        if !item.shop.is_empty() {
            let _ = writeln!(md, "販売店は{}です。", item.shop);
        }
        md.push_str(
            "\n- 長所: 実際の購入者による評価が集まっており、使い勝手を事前に把握しやすい\n\
             - 短所: 仕様の細部は販売ページで確認が必要\n\
             - 向いている人: 定番の中から堅実に選びたい人\n\n",
        );
        let _ = writeln!(md, "{}\n", cta_line(item, &label(i)));
    }

    md.push_str("## よくある質問\n\n");
    let faqs = [
        ("価格はいつ時点のものですか？", "執筆時点の楽天市場の表示価格です。セールや在庫状況で変わるため、購入前に販売ページをご確認ください。"),
        ("順位はどのように決めていますか？", "レビュー平均点とレビュー件数を組み合わせた指標で並べ、同点の場合は価格の安いものを上にしています。"),
        ("レビュー件数が少ない商品は避けるべきですか？", "必ずしもそうではありませんが、評価のばらつきが大きくなりやすいため、複数のレビューを読んでから判断するのがおすすめです。"),
        ("保証はありますか？", "保証の有無や期間は商品と販売店ごとに異なります。販売ページの記載を確認してください。"),
        ("ほかの通販サイトでも買えますか？", "同じ商品が他の通販サイトで販売されている場合もあります。価格と配送条件を比べて選ぶと安心です。"),
    ];
    for (q, a) in faqs {
        let _ = writeln!(md, "**Q. {}**\n\nA. {}\n", q, a);
    }

    md.push_str("## まとめ\n\n");
    let _ = writeln!(
        md,
        "- 「{}」はレビュー件数と平均点の両方を見て選ぶと失敗しにくい\n\
         - 比較表で価格帯をつかみ、予算に合う候補を絞る\n\
         - 価格と在庫は変動するため、購入前に最新情報を確認する\n",
        keyword
    );
    for (i, item) in items.iter().take(2).enumerate() {
        let _ = writeln!(md, "{}\n", cta_line(item, &label(i + 1)));
    }
    md.push_str("※ 本記事の価格・在庫・レビュー件数は執筆時点の情報です。\n");
    md
}
