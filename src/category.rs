//! The static category registry.
//!
//! Categories are a closed set partitioned into expense and income
//! categories. Looking up an unknown id never fails: it returns [FALLBACK],
//! the final "other" entry in the registry.

use serde::Serialize;

use crate::transaction::Kind;

/// Static display metadata for a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryDefinition {
    /// The identifier stored on transactions.
    pub id: &'static str,
    /// The display label.
    pub label: &'static str,
    /// The name of the icon used to render the category.
    pub icon: &'static str,
    /// The color token used in charts.
    pub color: &'static str,
    /// Which kind of transaction the category is meant for.
    pub kind: Kind,
}

const fn category(
    id: &'static str,
    label: &'static str,
    icon: &'static str,
    color: &'static str,
    kind: Kind,
) -> CategoryDefinition {
    CategoryDefinition {
        id,
        label,
        icon,
        color,
        kind,
    }
}

/// Every registered category. The last entry is the fallback.
pub static CATEGORIES: [CategoryDefinition; 14] = [
    category("food", "Food & Dining", "utensils", "#f97316", Kind::Expense),
    category("transport", "Transport", "bus", "#3b82f6", Kind::Expense),
    category("shopping", "Shopping", "shopping-bag", "#ec4899", Kind::Expense),
    category("entertainment", "Entertainment", "film", "#a855f7", Kind::Expense),
    category("housing", "Housing", "home", "#14b8a6", Kind::Expense),
    category("utilities", "Utilities", "bolt", "#eab308", Kind::Expense),
    category("medical", "Medical", "heart-pulse", "#ef4444", Kind::Expense),
    category("education", "Education", "book", "#6366f1", Kind::Expense),
    category("salary", "Salary", "briefcase", "#22c55e", Kind::Income),
    category("bonus", "Bonus", "gift", "#84cc16", Kind::Income),
    category("investment", "Investment", "chart-line", "#0ea5e9", Kind::Income),
    category("part_time", "Part-time Work", "clock", "#10b981", Kind::Income),
    category("gift", "Gifts Received", "hand-holding-heart", "#f43f5e", Kind::Income),
    OTHER,
];

const OTHER: CategoryDefinition = category("other", "Other", "ellipsis", "#6b7280", Kind::Expense);

/// The definition returned for ids that are not registered.
pub static FALLBACK: CategoryDefinition = OTHER;

/// Look up the definition for `id`, falling back to [FALLBACK] for unknown ids.
pub fn lookup(id: &str) -> &'static CategoryDefinition {
    CATEGORIES
        .iter()
        .find(|definition| definition.id == id)
        .unwrap_or(&FALLBACK)
}

/// Whether `id` is a registered category.
pub fn is_registered(id: &str) -> bool {
    CATEGORIES.iter().any(|definition| definition.id == id)
}

/// The categories intended for transactions of `kind`.
///
/// [FALLBACK] is offered for both kinds.
pub fn categories_for(kind: Kind) -> impl Iterator<Item = &'static CategoryDefinition> {
    CATEGORIES
        .iter()
        .filter(move |definition| definition.kind == kind || definition.id == FALLBACK.id)
}
