// Row selection over a loaded `Table`.
//
// Every dimension of a `FilterSpec` is optional. Supplied dimensions are
// combined with AND; the values inside one multi-select dimension are
// combined with OR. Filtering never touches the source table and keeps the
// source row order.

use crate::schema::{Table, Transaction};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct FilterSpec {
    /// Inclusive order-date bounds. Rows without a valid date never match a
    /// date restriction.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub categories: BTreeSet<String>,
    pub subcategories: BTreeSet<String>,
    /// Supplier states (where the vendor is located).
    pub supplier_states: BTreeSet<String>,
    pub supplier_cities: BTreeSet<String>,
    pub suppliers: BTreeSet<String>,
    /// Ship-to states (where goods were delivered).
    pub ship_to_states: BTreeSet<String>,
    pub po_statuses: BTreeSet<String>,
}

impl FilterSpec {
    pub fn is_unrestricted(&self) -> bool {
        *self == FilterSpec::default()
    }

    pub fn with_date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_range = Some((start, end));
        self
    }

    pub fn with_categories<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories.extend(values.into_iter().map(Into::into));
        self
    }

    pub fn with_supplier_states<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supplier_states.extend(values.into_iter().map(Into::into));
        self
    }

    pub fn with_po_statuses<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.po_statuses.extend(values.into_iter().map(Into::into));
        self
    }

    /// Short human-readable description, e.g. for report headers.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some((start, end)) = self.date_range {
            parts.push(format!("{} to {}", start, end));
        }
        let sets: [(&str, &BTreeSet<String>); 7] = [
            ("categories", &self.categories),
            ("subcategories", &self.subcategories),
            ("supplier states", &self.supplier_states),
            ("supplier cities", &self.supplier_cities),
            ("suppliers", &self.suppliers),
            ("ship-to states", &self.ship_to_states),
            ("PO statuses", &self.po_statuses),
        ];
        for (label, values) in sets {
            if !values.is_empty() {
                let joined: Vec<&str> = values.iter().map(String::as_str).collect();
                parts.push(format!("{}: {}", label, joined.join(", ")));
            }
        }
        if parts.is_empty() {
            "All data".to_string()
        } else {
            parts.join("; ")
        }
    }

    fn matches(&self, tx: &Transaction, status_column: bool) -> bool {
        if let Some((start, end)) = self.date_range {
            match tx.order_date {
                Some(d) if d >= start && d <= end => {}
                _ => return false,
            }
        }
        in_set(&self.categories, Some(&tx.category))
            && in_set(&self.subcategories, tx.subcategory.as_ref())
            && in_set(&self.supplier_states, Some(&tx.supplier_state))
            && in_set(&self.supplier_cities, tx.supplier_city.as_ref())
            && in_set(&self.suppliers, Some(&tx.supplier))
            && in_set(&self.ship_to_states, tx.ship_to_state.as_ref())
            && (!status_column || in_set(&self.po_statuses, tx.po_status.as_ref()))
    }
}

fn in_set(set: &BTreeSet<String>, value: Option<&String>) -> bool {
    set.is_empty() || value.is_some_and(|v| set.contains(v))
}

/// Rows of `table` matching every supplied predicate, in source order.
/// A status restriction is ignored when the source had no status column.
pub fn apply(table: &Table, spec: &FilterSpec) -> Table {
    if spec.is_unrestricted() {
        return table.clone();
    }
    let status_column = table.columns().po_status;
    let rows = table
        .iter()
        .filter(|tx| spec.matches(tx, status_column))
        .cloned()
        .collect();
    Table::new(rows, table.columns())
}

/// Distinct values offered by the filter widgets.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterOptions {
    pub date_bounds: Option<(NaiveDate, NaiveDate)>,
    pub categories: Vec<String>,
    pub subcategories: Vec<String>,
    pub supplier_states: Vec<String>,
    pub supplier_cities: Vec<String>,
    pub ship_to_states: Vec<String>,
    pub po_statuses: Vec<String>,
}

/// Option lists for the filter widgets. Subcategories narrow to the selected
/// categories and cities to the selected supplier states, when any are
/// selected.
pub fn filter_options(table: &Table, selection: &FilterSpec) -> FilterOptions {
    let mut opts = FilterOptions {
        date_bounds: date_bounds(table),
        ..FilterOptions::default()
    };
    let mut categories = BTreeSet::new();
    let mut subcategories = BTreeSet::new();
    let mut states = BTreeSet::new();
    let mut cities = BTreeSet::new();
    let mut ship_to = BTreeSet::new();
    let mut statuses = BTreeSet::new();
    for tx in table {
        categories.insert(tx.category.as_str());
        if in_set(&selection.categories, Some(&tx.category)) {
            if let Some(s) = &tx.subcategory {
                subcategories.insert(s.as_str());
            }
        }
        if tx.has_known_supplier_state() {
            states.insert(tx.supplier_state.as_str());
        }
        if in_set(&selection.supplier_states, Some(&tx.supplier_state)) {
            if let Some(c) = &tx.supplier_city {
                cities.insert(c.as_str());
            }
        }
        if let Some(s) = &tx.ship_to_state {
            ship_to.insert(s.as_str());
        }
        if let Some(s) = &tx.po_status {
            statuses.insert(s.as_str());
        }
    }
    let owned = |set: BTreeSet<&str>| set.into_iter().map(str::to_string).collect::<Vec<_>>();
    opts.categories = owned(categories);
    opts.subcategories = owned(subcategories);
    opts.supplier_states = owned(states);
    opts.supplier_cities = owned(cities);
    opts.ship_to_states = owned(ship_to);
    opts.po_statuses = owned(statuses);
    opts
}

/// Earliest and latest valid order date.
pub fn date_bounds(table: &Table) -> Option<(NaiveDate, NaiveDate)> {
    let mut dates = table.iter().filter_map(|tx| tx.order_date);
    let first = dates.next()?;
    Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
}

/// Supplier names containing `query`, case-insensitively, sorted.
pub fn search_suppliers(table: &Table, query: &str) -> Vec<String> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }
    table
        .iter()
        .map(|tx| tx.supplier.as_str())
        .filter(|s| s.to_lowercase().contains(&query))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Columns;
    use crate::test_support::{date, tx};

    fn sample() -> Table {
        Table::new(
            vec![
                tx("SupplierA", "Janitorial", "CA", 1000.0).dated(2024, 1, 10).status("Open"),
                tx("SupplierB", "Janitorial", "CA", 2000.0).dated(2024, 2, 10).status("Closed"),
                tx("SupplierA", "Facilities", "NY", 500.0).dated(2024, 3, 10).status("Closed"),
                tx("SupplierC", "IT", "TX", 50.0),
            ],
            Columns::ALL,
        )
    }

    #[test]
    fn unrestricted_spec_returns_everything() {
        let t = sample();
        assert_eq!(apply(&t, &FilterSpec::default()), t);
    }

    #[test]
    fn dimensions_are_anded_values_are_ored() {
        let t = sample();
        let spec = FilterSpec::default()
            .with_categories(["Janitorial", "Facilities"])
            .with_supplier_states(["CA"]);
        let got = apply(&t, &spec);
        let names: Vec<&str> = got.iter().map(|r| r.supplier.as_str()).collect();
        assert_eq!(names, vec!["SupplierA", "SupplierB"]);
    }

    #[test]
    fn date_range_is_inclusive_and_skips_undated_rows() {
        let t = sample();
        let spec = FilterSpec::default().with_date_range(date(2024, 2, 10), date(2024, 3, 10));
        let got = apply(&t, &spec);
        assert_eq!(got.len(), 2);
        assert!(got.iter().all(|r| r.order_date.is_some()));
    }

    #[test]
    fn status_filter_ignored_without_status_column() {
        let mut rows = sample().rows().to_vec();
        rows.iter_mut().for_each(|r| r.po_status = None);
        let t = Table::new(rows, Columns::default());
        let spec = FilterSpec::default().with_po_statuses(["Closed"]);
        assert_eq!(apply(&t, &spec).len(), 4);

        let got = apply(&sample(), &spec);
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn no_match_is_an_empty_table() {
        let spec = FilterSpec::default().with_categories(["Nope"]);
        let got = apply(&sample(), &spec);
        assert!(got.is_empty());
        assert_eq!(got.columns(), Columns::ALL);
    }

    #[test]
    fn narrower_spec_never_returns_more_rows() {
        let t = sample();
        let wide = FilterSpec::default().with_categories(["Janitorial", "Facilities"]);
        let narrow = wide.clone().with_supplier_states(["CA"]);
        assert!(apply(&t, &narrow).len() <= apply(&t, &wide).len());
    }

    #[test]
    fn applying_twice_is_idempotent() {
        let t = sample();
        let spec = FilterSpec::default()
            .with_categories(["Janitorial"])
            .with_date_range(date(2024, 1, 1), date(2024, 12, 31));
        let once = apply(&t, &spec);
        assert_eq!(apply(&once, &spec), once);
    }

    #[test]
    fn options_and_search() {
        let t = sample();
        let opts = filter_options(&t, &FilterSpec::default());
        assert_eq!(opts.categories, vec!["Facilities", "IT", "Janitorial"]);
        assert_eq!(opts.supplier_states, vec!["CA", "NY", "TX"]);
        assert_eq!(opts.po_statuses, vec!["Closed", "Open"]);
        assert_eq!(opts.date_bounds, Some((date(2024, 1, 10), date(2024, 3, 10))));

        assert_eq!(search_suppliers(&t, "supplier"), vec!["SupplierA", "SupplierB", "SupplierC"]);
        assert_eq!(search_suppliers(&t, "RB"), vec!["SupplierB"]);
        assert!(search_suppliers(&t, "  ").is_empty());
    }

    #[test]
    fn describe_lists_active_dimensions() {
        assert_eq!(FilterSpec::default().describe(), "All data");
        let spec = FilterSpec::default().with_supplier_states(["NY", "CA"]);
        assert_eq!(spec.describe(), "supplier states: CA, NY");
    }
}
