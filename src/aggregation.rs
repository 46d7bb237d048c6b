//! Transaction aggregation for a resolved period.
//!
//! Produces the totals, the per-category breakdown and the trend series that
//! the statistics views and charts are built from. [aggregate] is a pure
//! function: the only clock input is the explicit `today` argument, which is
//! used to hide the future days of the current month from the trend series.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::{Date, Month, Weekday};

use crate::{
    calendar::LocalCalendar,
    category,
    range::{Granularity, ResolvedRange, month_abbrev},
    transaction::{Kind, Transaction},
};

/// Which transactions the category breakdown is computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Totals and trend only, no category breakdown.
    #[default]
    Overview,
    /// Break expenses down by category.
    Expense,
    /// Break income down by category.
    Income,
}

impl ViewMode {
    /// The kind of transaction broken down by category in this view.
    pub fn kind(self) -> Option<Kind> {
        match self {
            Self::Overview => None,
            Self::Expense => Some(Kind::Expense),
            Self::Income => Some(Kind::Income),
        }
    }
}

impl std::str::FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "overview" => Ok(Self::Overview),
            "expense" => Ok(Self::Expense),
            "income" => Ok(Self::Income),
            _ => Err(format!(
                "\"{s}\" is not a view, expected overview, expense or income"
            )),
        }
    }
}

/// One entry of the category breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    /// The category id as stored on the transactions.
    pub category: String,
    /// The display label, the fallback label for unknown ids.
    pub label: &'static str,
    /// The color token of the category.
    pub color: &'static str,
    /// The summed amount.
    pub value: f64,
    /// `value` as a percentage of the total for the viewed kind.
    pub percent: f64,
}

/// One sub-period slot of the trend series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendBucket {
    /// The label shown on the chart axis, e.g. "Mon", "15" or "Mar".
    pub label: String,
    /// Total income within the bucket.
    pub income: f64,
    /// Total expenses within the bucket.
    pub expense: f64,
}

impl TrendBucket {
    fn empty(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            income: 0.0,
            expense: 0.0,
        }
    }

    fn add(&mut self, transaction: &Transaction) {
        match transaction.kind {
            Kind::Income => self.income += transaction.amount,
            Kind::Expense => self.expense += transaction.amount,
        }
    }
}

/// Aggregated statistics for one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// The period the statistics cover.
    pub range: ResolvedRange,
    /// The view mode the breakdown was computed for.
    pub view_mode: ViewMode,
    /// The number of transactions within the period.
    pub transaction_count: usize,
    /// Sum of income within the period.
    pub total_income: f64,
    /// Sum of expenses within the period.
    pub total_expense: f64,
    /// `total_income - total_expense`.
    pub balance: f64,
    /// Per-category totals, largest first. Empty for [ViewMode::Overview].
    pub category_breakdown: Vec<CategoryShare>,
    /// Sub-period totals in chronological order.
    pub trend: Vec<TrendBucket>,
}

/// Aggregate `transactions` over `range`.
///
/// Transactions outside the range are ignored. `today` is only consulted
/// when the range is the current month.
pub fn aggregate<'a>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
    range: &ResolvedRange,
    view_mode: ViewMode,
    today: Date,
    calendar: &LocalCalendar,
) -> Summary {
    let in_range: Vec<&Transaction> = transactions
        .into_iter()
        .filter(|transaction| range.contains(transaction.timestamp))
        .collect();

    let (total_income, total_expense) = sum_by_kind(&in_range);

    let category_breakdown = match view_mode.kind() {
        Some(kind) => {
            let total = match kind {
                Kind::Income => total_income,
                Kind::Expense => total_expense,
            };
            category_breakdown(&in_range, kind, total)
        }
        None => Vec::new(),
    };

    let trend = trend_series(&in_range, range, today, calendar, total_income, total_expense);

    Summary {
        range: range.clone(),
        view_mode,
        transaction_count: in_range.len(),
        total_income,
        total_expense,
        balance: total_income - total_expense,
        category_breakdown,
        trend,
    }
}

fn sum_by_kind(transactions: &[&Transaction]) -> (f64, f64) {
    transactions
        .iter()
        .fold((0.0, 0.0), |(income, expense), transaction| {
            match transaction.kind {
                Kind::Income => (income + transaction.amount, expense),
                Kind::Expense => (income, expense + transaction.amount),
            }
        })
}

/// Sums transactions of `kind` by category, largest first.
///
/// Ties are ordered by category id so the output is deterministic.
fn category_breakdown(transactions: &[&Transaction], kind: Kind, total: f64) -> Vec<CategoryShare> {
    let mut totals: HashMap<&str, f64> = HashMap::new();

    for transaction in transactions.iter().filter(|t| t.kind == kind) {
        *totals.entry(transaction.category.as_str()).or_insert(0.0) += transaction.amount;
    }

    let mut breakdown: Vec<CategoryShare> = totals
        .into_iter()
        .map(|(id, value)| {
            let definition = category::lookup(id);
            CategoryShare {
                category: id.to_owned(),
                label: definition.label,
                color: definition.color,
                value,
                percent: percent_of(value, total),
            }
        })
        .collect();

    breakdown.sort_by(|a, b| {
        b.value
            .total_cmp(&a.value)
            .then_with(|| a.category.cmp(&b.category))
    });

    breakdown
}

/// `value` as a percentage of `total`, zero when `total` is zero.
pub fn percent_of(value: f64, total: f64) -> f64 {
    if total == 0.0 {
        0.0
    } else {
        value / total * 100.0
    }
}

fn trend_series(
    transactions: &[&Transaction],
    range: &ResolvedRange,
    today: Date,
    calendar: &LocalCalendar,
    total_income: f64,
    total_expense: f64,
) -> Vec<TrendBucket> {
    match range.granularity {
        Granularity::Day => vec![TrendBucket {
            label: "Today".to_owned(),
            income: total_income,
            expense: total_expense,
        }],
        Granularity::Week => {
            let mut buckets: Vec<TrendBucket> = WEEKDAYS
                .iter()
                .map(|&weekday| TrendBucket::empty(weekday_abbrev(weekday)))
                .collect();

            for transaction in transactions {
                let weekday = calendar.date_of(transaction.timestamp).weekday();
                buckets[weekday.number_days_from_monday() as usize].add(transaction);
            }

            buckets
        }
        Granularity::Month => {
            let bucket_count = month_bucket_count(range, today);
            let mut buckets: Vec<TrendBucket> = (1..=bucket_count)
                .map(|day| TrendBucket::empty(day.to_string()))
                .collect();

            for transaction in transactions {
                let day = calendar.date_of(transaction.timestamp).day() as usize;
                // Future days of the current month have no bucket.
                if let Some(bucket) = buckets.get_mut(day - 1) {
                    bucket.add(transaction);
                }
            }

            buckets
        }
        Granularity::Year => {
            let mut buckets: Vec<TrendBucket> = MONTHS
                .iter()
                .map(|&month| TrendBucket::empty(month_abbrev(month)))
                .collect();

            for transaction in transactions {
                let month = calendar.date_of(transaction.timestamp).month();
                buckets[u8::from(month) as usize - 1].add(transaction);
            }

            buckets
        }
    }
}

/// The number of day buckets shown for a month.
///
/// This is the length of the month, or today's day of the month when the
/// range is the current month.
pub fn month_bucket_count(range: &ResolvedRange, today: Date) -> u8 {
    let start = range.start_date;

    if start.year() == today.year() && start.month() == today.month() {
        today.day()
    } else {
        start.month().length(start.year())
    }
}

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Monday,
    Weekday::Tuesday,
    Weekday::Wednesday,
    Weekday::Thursday,
    Weekday::Friday,
    Weekday::Saturday,
    Weekday::Sunday,
];

const MONTHS: [Month; 12] = [
    Month::January,
    Month::February,
    Month::March,
    Month::April,
    Month::May,
    Month::June,
    Month::July,
    Month::August,
    Month::September,
    Month::October,
    Month::November,
    Month::December,
];

fn weekday_abbrev(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Monday => "Mon",
        Weekday::Tuesday => "Tue",
        Weekday::Wednesday => "Wed",
        Weekday::Thursday => "Thu",
        Weekday::Friday => "Fri",
        Weekday::Saturday => "Sat",
        Weekday::Sunday => "Sun",
    }
}
