use super::spend_desc_then;
use crate::schema::{Table, Transaction};
use crate::util::ratio;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplierMetrics {
    pub supplier: String,
    pub total_spend: f64,
    pub po_count: usize,
    pub avg_po_value: f64,
    pub category_count: usize,
}

/// One row per supplier, largest spend first.
pub fn supplier_metrics(table: &Table) -> Vec<SupplierMetrics> {
    #[derive(Default)]
    struct Acc<'a> {
        spend: f64,
        rows: usize,
        categories: BTreeSet<&'a str>,
    }
    let mut map: BTreeMap<&str, Acc> = BTreeMap::new();
    for tx in table {
        let e = map.entry(tx.supplier.as_str()).or_default();
        e.spend += tx.spend();
        e.rows += 1;
        e.categories.insert(tx.category.as_str());
    }
    let mut out: Vec<SupplierMetrics> = map
        .into_iter()
        .map(|(supplier, acc)| SupplierMetrics {
            supplier: supplier.to_string(),
            total_spend: acc.spend,
            po_count: acc.rows,
            // Grouping guarantees at least one row per supplier.
            avg_po_value: acc.spend / acc.rows as f64,
            category_count: acc.categories.len(),
        })
        .collect();
    out.sort_by(|a, b| spend_desc_then(a.total_spend, b.total_spend, &a.supplier, &b.supplier));
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplierSpend {
    pub supplier: String,
    pub total_spend: f64,
    /// Share of the table's total spend; `None` when that total is zero.
    pub share: Option<f64>,
}

/// The `n` largest suppliers by spend (fewer when the table has fewer).
pub fn top_suppliers(table: &Table, n: usize) -> Vec<SupplierSpend> {
    let total = table.total_spend();
    supplier_metrics(table)
        .into_iter()
        .take(n)
        .map(|m| SupplierSpend {
            share: ratio(m.total_spend, total),
            supplier: m.supplier,
            total_spend: m.total_spend,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Concentration {
    pub top_n: usize,
    /// Suppliers actually counted (`min(top_n, supplier count)`).
    pub suppliers_counted: usize,
    pub top_n_spend: f64,
    pub total_spend: f64,
    pub remaining_spend: f64,
    /// `top_n_spend / total_spend`; `None` when total spend is zero.
    pub ratio: Option<f64>,
}

/// Share of spend held by the `n` largest suppliers.
pub fn concentration(table: &Table, n: usize) -> Concentration {
    let total_spend = table.total_spend();
    let top = top_suppliers(table, n);
    let top_n_spend: f64 = top.iter().map(|s| s.total_spend).sum();
    Concentration {
        top_n: n,
        suppliers_counted: top.len(),
        top_n_spend,
        total_spend,
        remaining_spend: total_spend - top_n_spend,
        ratio: ratio(top_n_spend, total_spend),
    }
}

pub const SPEND_BUCKETS: [(f64, &str); 5] = [
    (10_000.0, "<$10K"),
    (50_000.0, "$10K-$50K"),
    (100_000.0, "$50K-$100K"),
    (500_000.0, "$100K-$500K"),
    (f64::INFINITY, ">$500K"),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendBucket {
    pub label: &'static str,
    pub supplier_count: usize,
}

/// Supplier counts per spend band. Bands are right-inclusive; suppliers with
/// zero or negative net spend fall outside every band. All bands are always
/// present, so the result has a fixed shape.
pub fn spend_distribution(table: &Table) -> Vec<SpendBucket> {
    let mut counts = [0usize; SPEND_BUCKETS.len()];
    for m in supplier_metrics(table) {
        if m.total_spend <= 0.0 {
            continue;
        }
        if let Some(i) = SPEND_BUCKETS.iter().position(|(upper, _)| m.total_spend <= *upper) {
            counts[i] += 1;
        }
    }
    SPEND_BUCKETS
        .iter()
        .zip(counts)
        .map(|((_, label), supplier_count)| SpendBucket {
            label: *label,
            supplier_count,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedSpend {
    pub name: String,
    pub total_spend: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplierProfile {
    pub supplier: String,
    pub total_spend: f64,
    pub po_count: usize,
    pub avg_po_value: f64,
    /// Most frequent supplier state; ties go to the alphabetically first.
    pub primary_state: Option<String>,
    pub first_order: Option<NaiveDate>,
    pub last_order: Option<NaiveDate>,
    pub by_category: Vec<NamedSpend>,
    pub by_supplier_state: Vec<NamedSpend>,
}

/// Drill-down for one supplier; `None` when the supplier has no rows.
pub fn supplier_profile(table: &Table, supplier: &str) -> Option<SupplierProfile> {
    let rows: Vec<&Transaction> = table.iter().filter(|tx| tx.supplier == supplier).collect();
    if rows.is_empty() {
        return None;
    }
    let total_spend: f64 = rows.iter().map(|tx| tx.spend()).sum();
    let mut state_freq: BTreeMap<&str, usize> = BTreeMap::new();
    for tx in rows.iter().filter(|tx| tx.has_known_supplier_state()) {
        *state_freq.entry(tx.supplier_state.as_str()).or_default() += 1;
    }
    let primary_state = state_freq
        .iter()
        .fold(None::<(&str, usize)>, |best, (s, n)| match best {
            Some((_, bn)) if bn >= *n => best,
            _ => Some((*s, *n)),
        })
        .map(|(s, _)| s.to_string());
    let dates = rows.iter().filter_map(|tx| tx.order_date);

    Some(SupplierProfile {
        supplier: supplier.to_string(),
        total_spend,
        po_count: rows.len(),
        avg_po_value: total_spend / rows.len() as f64,
        primary_state,
        first_order: dates.clone().min(),
        last_order: dates.max(),
        by_category: spend_by(&rows, |tx| tx.category.as_str()),
        by_supplier_state: spend_by(&rows, |tx| tx.supplier_state.as_str()),
    })
}

fn spend_by<'a, F>(rows: &[&'a Transaction], key: F) -> Vec<NamedSpend>
where
    F: Fn(&'a Transaction) -> &'a str,
{
    let mut map: HashMap<&str, f64> = HashMap::new();
    for tx in rows {
        *map.entry(key(*tx)).or_default() += tx.spend();
    }
    let mut out: Vec<NamedSpend> = map
        .into_iter()
        .map(|(name, total_spend)| NamedSpend {
            name: name.to_string(),
            total_spend,
        })
        .collect();
    out.sort_by(|a, b| spend_desc_then(a.total_spend, b.total_spend, &a.name, &b.name));
    out
}
