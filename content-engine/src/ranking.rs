use autopost_core::ProductCandidate;
use std::cmp::Ordering;
use tracing::debug;

/// `price >= price_floor && review_average >= review_floor`
pub fn passes_floors(item: &ProductCandidate, price_floor: u64, review_floor: f64) -> bool {
    item.price >= price_floor && item.review_average >= review_floor
}

/// Descending score, then ascending price. Name and URL break the remaining
/// ties so the order is total.
pub fn compare_rank(a: &ProductCandidate, b: &ProductCandidate) -> Ordering {
    b.score()
        .total_cmp(&a.score())
        .then_with(|| a.price.cmp(&b.price))
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.url.cmp(&b.url))
}

pub fn sort_by_rank(items: &mut [ProductCandidate]) {
    items.sort_by(compare_rank);
}

/// Filter by both floors and sort best-first.
pub fn rank_candidates(
    items: Vec<ProductCandidate>,
    price_floor: u64,
    review_floor: f64,
) -> Vec<ProductCandidate> {
    let total = items.len();
    let mut kept: Vec<ProductCandidate> = items
        .into_iter()
        .filter(|item| passes_floors(item, price_floor, review_floor))
        .collect();
    sort_by_rank(&mut kept);

    debug!(
        total,
        kept = kept.len(),
        price_floor,
        review_floor,
        "Ranked product candidates"
    );
    kept
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceStats {
    pub min: u64,
    pub median: u64,
    pub max: u64,
}

/// Min/median/max price. The median of an even count is the mean of the two
/// middle prices, rounded down.
pub fn price_stats(items: &[ProductCandidate]) -> Option<PriceStats> {
    let mut prices: Vec<u64> = items.iter().map(|item| item.price).collect();
    if prices.is_empty() {
        return None;
    }
    prices.sort_unstable();

    let mid = prices.len() / 2;
    let median = if prices.len() % 2 == 0 {
        (prices[mid - 1] + prices[mid]) / 2
    } else {
        prices[mid]
    };

    Some(PriceStats {
        min: prices[0],
        median,
        max: prices[prices.len() - 1],
    })
}
