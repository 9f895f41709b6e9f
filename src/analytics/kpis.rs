use crate::filter::date_bounds;
use crate::schema::Table;
use crate::util::{average, median, ratio};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Headline figures for the executive view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSummary {
    pub total_spend: f64,
    pub total_records: usize,
    pub unique_pos: usize,
    pub unique_suppliers: usize,
    pub unique_supplier_states: usize,
    pub unique_cities: usize,
    pub categories: usize,
    pub subcategories: usize,
    pub date_min: Option<NaiveDate>,
    pub date_max: Option<NaiveDate>,
}

pub fn data_summary(table: &Table) -> DataSummary {
    fn distinct<'a>(it: impl Iterator<Item = &'a str>) -> usize {
        it.collect::<BTreeSet<_>>().len()
    }
    let bounds = date_bounds(table);
    DataSummary {
        total_spend: table.total_spend(),
        total_records: table.len(),
        unique_pos: distinct(table.iter().filter_map(|tx| tx.po_number.as_deref())),
        unique_suppliers: distinct(table.iter().map(|tx| tx.supplier.as_str())),
        unique_supplier_states: distinct(
            table
                .iter()
                .filter(|tx| tx.has_known_supplier_state())
                .map(|tx| tx.supplier_state.as_str()),
        ),
        unique_cities: distinct(table.iter().filter_map(|tx| tx.supplier_city.as_deref())),
        categories: distinct(table.iter().map(|tx| tx.category.as_str())),
        subcategories: distinct(table.iter().filter_map(|tx| tx.subcategory.as_deref())),
        date_min: bounds.map(|b| b.0),
        date_max: bounds.map(|b| b.1),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoMetrics {
    pub total_pos: usize,
    pub avg_line_value: f64,
    pub median_line_value: f64,
    pub max_line_value: Option<f64>,
    pub min_line_value: Option<f64>,
    pub status_counts: BTreeMap<String, usize>,
    /// Share of lines in `Closed` status; `None` without status data.
    pub closure_rate: Option<f64>,
}

/// Line-value statistics over rows with a valid amount, plus PO status mix.
pub fn po_metrics(table: &Table) -> PoMetrics {
    let amounts: Vec<f64> = table.iter().filter_map(|tx| tx.amount).collect();
    let mut status_counts: BTreeMap<String, usize> = BTreeMap::new();
    for tx in table {
        if let Some(s) = &tx.po_status {
            *status_counts.entry(s.clone()).or_default() += 1;
        }
    }
    let with_status: usize = status_counts.values().sum();
    let closed = status_counts.get("Closed").copied().unwrap_or(0);
    PoMetrics {
        total_pos: table
            .iter()
            .filter_map(|tx| tx.po_number.as_deref())
            .collect::<BTreeSet<_>>()
            .len(),
        avg_line_value: average(&amounts),
        median_line_value: median(amounts.clone()),
        max_line_value: amounts.iter().copied().reduce(f64::max),
        min_line_value: amounts.iter().copied().reduce(f64::min),
        closure_rate: ratio(closed as f64, with_status as f64),
        status_counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Columns, UNKNOWN_STATE};
    use crate::test_support::{date, tx};

    fn sample() -> Table {
        Table::new(
            vec![
                tx("A", "Janitorial", "CA", 100.0).po("PO-1").status("Closed").dated(2024, 1, 1).subcat("Paper"),
                tx("A", "Janitorial", "CA", 300.0).po("PO-1").status("Closed").dated(2024, 3, 1),
                tx("B", "IT", UNKNOWN_STATE, 200.0).po("PO-2").status("Open").dated(2023, 12, 1),
                tx("C", "IT", "NY", 0.0).without_amount(),
            ],
            Columns::ALL,
        )
    }

    #[test]
    fn summary_counts() {
        let s = data_summary(&sample());
        assert_eq!(s.total_spend, 600.0);
        assert_eq!(s.total_records, 4);
        assert_eq!(s.unique_pos, 2);
        assert_eq!(s.unique_suppliers, 3);
        assert_eq!(s.unique_supplier_states, 2);
        assert_eq!(s.categories, 2);
        assert_eq!(s.subcategories, 1);
        assert_eq!(s.date_min, Some(date(2023, 12, 1)));
        assert_eq!(s.date_max, Some(date(2024, 3, 1)));
    }

    #[test]
    fn po_statistics() {
        let m = po_metrics(&sample());
        assert_eq!(m.total_pos, 2);
        assert_eq!(m.avg_line_value, 200.0);
        assert_eq!(m.median_line_value, 200.0);
        assert_eq!(m.max_line_value, Some(300.0));
        assert_eq!(m.min_line_value, Some(100.0));
        assert_eq!(m.status_counts.get("Closed"), Some(&2));
        assert!((m.closure_rate.unwrap() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn empty_input() {
        let s = data_summary(&Table::default());
        assert_eq!(s.total_spend, 0.0);
        assert_eq!(s.date_min, None);
        let m = po_metrics(&Table::default());
        assert_eq!(m.max_line_value, None);
        assert_eq!(m.closure_rate, None);
    }
}
