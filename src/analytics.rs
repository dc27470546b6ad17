//! Spending Analytics
//!
//! Aggregates over receipts and price history for the statistics screen.
//! Pure functions; callers pass whatever the stores currently hold.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::Datelike;
use serde::Serialize;

use crate::domain::seed::month_name;
use crate::domain::{PriceRecord, ReceiptWithItems};

/// Number of buckets shown per chart
pub const CHART_BUCKETS: usize = 6;

pub const UNNAMED_MARKET: &str = "Não especificado";
pub const UNNAMED_PRICE_MARKET: &str = "Outros";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySpending {
    /// `YYYY-MM`
    pub month: String,
    /// Short month name, e.g. `mar`
    pub label: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSpending {
    pub name: String,
    pub total: f64,
    pub count: usize,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketPrices {
    pub name: String,
    pub value: f64,
}

fn by_total_desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Sum of first-seen-ordered groups, so ties keep a stable order
fn group_sums<'a>(entries: impl Iterator<Item = (&'a str, f64)>) -> Vec<(String, f64, usize)> {
    let mut groups: Vec<(String, f64, usize)> = Vec::new();
    for (name, amount) in entries {
        match groups.iter_mut().find(|(existing, _, _)| existing == name) {
            Some((_, total, count)) => {
                *total += amount;
                *count += 1;
            }
            None => groups.push((name.to_string(), amount, 1)),
        }
    }
    groups
}

pub fn total_spent(receipts: &[ReceiptWithItems]) -> f64 {
    receipts.iter().map(|r| r.receipt.total_amount).sum()
}

pub fn average_per_trip(receipts: &[ReceiptWithItems]) -> f64 {
    if receipts.is_empty() {
        return 0.0;
    }
    total_spent(receipts) / receipts.len() as f64
}

/// Spending per calendar month (UTC), the last six months with purchases, oldest first
pub fn monthly_spending(receipts: &[ReceiptWithItems]) -> Vec<MonthlySpending> {
    let mut months: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for r in receipts {
        let date = r.receipt.purchase_date;
        *months.entry((date.year(), date.month())).or_default() += r.receipt.total_amount;
    }

    let skip = months.len().saturating_sub(CHART_BUCKETS);
    months
        .into_iter()
        .skip(skip)
        .map(|((year, month), total)| MonthlySpending {
            month: format!("{}-{:02}", year, month),
            label: month_name(month).chars().take(3).collect::<String>().to_lowercase(),
            total,
        })
        .collect()
}

/// Markets ranked by total spent, top six
pub fn market_comparison(receipts: &[ReceiptWithItems]) -> Vec<MarketSpending> {
    let entries = receipts.iter().map(|r| {
        let market = r
            .receipt
            .market
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(UNNAMED_MARKET);
        (market, r.receipt.total_amount)
    });

    let mut markets: Vec<MarketSpending> = group_sums(entries)
        .into_iter()
        .map(|(name, total, count)| MarketSpending {
            name,
            total,
            count,
            average: total / count as f64,
        })
        .collect();
    markets.sort_by(|a, b| by_total_desc(a.total, b.total));
    markets.truncate(CHART_BUCKETS);
    markets
}

/// Market with the highest total spent
pub fn most_used_market(receipts: &[ReceiptWithItems]) -> Option<String> {
    market_comparison(receipts).into_iter().next().map(|m| m.name)
}

/// Sum of recorded unit prices per market, top six
pub fn price_by_market(history: &[PriceRecord]) -> Vec<MarketPrices> {
    let entries = history.iter().map(|p| {
        let market = p
            .market
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(UNNAMED_PRICE_MARKET);
        (market, p.unit_price)
    });

    let mut markets: Vec<MarketPrices> = group_sums(entries)
        .into_iter()
        .map(|(name, value, _)| MarketPrices { name, value })
        .collect();
    markets.sort_by(|a, b| by_total_desc(a.value, b.value));
    markets.truncate(CHART_BUCKETS);
    markets
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::domain::Receipt;

    fn receipt(total: f64, market: Option<&str>, date: &str) -> ReceiptWithItems {
        ReceiptWithItems {
            receipt: Receipt {
                id: Uuid::new_v4(),
                user_id: Uuid::nil(),
                list_id: None,
                title: "Compra".to_string(),
                total_amount: total,
                payment_method: None,
                has_discount: false,
                discount_amount: 0.0,
                market: market.map(str::to_string),
                purchase_date: date.parse::<DateTime<Utc>>().unwrap(),
                created_at: None,
            },
            items: Vec::new(),
        }
    }

    fn price(value: f64, market: Option<&str>) -> PriceRecord {
        PriceRecord {
            id: Uuid::new_v4(),
            item_name: "Arroz".to_string(),
            user_id: Uuid::nil(),
            unit_price: value,
            market: market.map(str::to_string),
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_totals_and_average() {
        let receipts = vec![
            receipt(100.0, Some("Extra"), "2025-01-05T10:00:00Z"),
            receipt(50.0, None, "2025-01-20T10:00:00Z"),
        ];
        assert_eq!(total_spent(&receipts), 150.0);
        assert_eq!(average_per_trip(&receipts), 75.0);
        assert_eq!(average_per_trip(&[]), 0.0);
    }

    #[test]
    fn test_monthly_keeps_last_six_ascending() {
        let receipts: Vec<_> = (1..=8)
            .map(|month| receipt(month as f64, None, &format!("2024-{:02}-10T10:00:00Z", month)))
            .chain(std::iter::once(receipt(2.5, None, "2024-08-28T10:00:00Z")))
            .collect();

        let months = monthly_spending(&receipts);

        assert_eq!(months.len(), 6);
        assert_eq!(months[0].month, "2024-03");
        assert_eq!(months[0].label, "mar");
        assert_eq!(months[5].month, "2024-08");
        assert_eq!(months[5].total, 10.5);
    }

    #[test]
    fn test_market_comparison_groups_unnamed() {
        let receipts = vec![
            receipt(30.0, Some("Atacadão"), "2025-01-05T10:00:00Z"),
            receipt(50.0, Some("Atacadão"), "2025-01-06T10:00:00Z"),
            receipt(20.0, None, "2025-01-07T10:00:00Z"),
            receipt(10.0, Some(" "), "2025-01-08T10:00:00Z"),
        ];

        let markets = market_comparison(&receipts);

        assert_eq!(markets[0].name, "Atacadão");
        assert_eq!(markets[0].count, 2);
        assert_eq!(markets[0].average, 40.0);
        assert_eq!(markets[1].name, UNNAMED_MARKET);
        assert_eq!(markets[1].total, 30.0);
        assert_eq!(most_used_market(&receipts).as_deref(), Some("Atacadão"));
        assert_eq!(most_used_market(&[]), None);
    }

    #[test]
    fn test_price_by_market() {
        let history = vec![
            price(10.0, Some("Extra")),
            price(4.0, None),
            price(5.0, Some("Extra")),
        ];
        let markets = price_by_market(&history);
        assert_eq!(
            markets,
            vec![
                MarketPrices { name: "Extra".to_string(), value: 15.0 },
                MarketPrices { name: UNNAMED_PRICE_MARKET.to_string(), value: 4.0 },
            ]
        );
    }
}
