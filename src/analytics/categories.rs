use super::spend_desc_then;
use crate::schema::Table;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryMetrics {
    pub category: String,
    pub total_spend: f64,
    pub po_count: usize,
    pub avg_po_value: f64,
    pub supplier_count: usize,
    pub subcategory_count: usize,
}

pub fn category_metrics(table: &Table) -> Vec<CategoryMetrics> {
    #[derive(Default)]
    struct Acc<'a> {
        spend: f64,
        rows: usize,
        suppliers: BTreeSet<&'a str>,
        subcategories: BTreeSet<&'a str>,
    }
    let mut map: BTreeMap<&str, Acc> = BTreeMap::new();
    for tx in table {
        let e = map.entry(tx.category.as_str()).or_default();
        e.spend += tx.spend();
        e.rows += 1;
        e.suppliers.insert(tx.supplier.as_str());
        if let Some(sub) = &tx.subcategory {
            e.subcategories.insert(sub.as_str());
        }
    }
    let mut out: Vec<CategoryMetrics> = map
        .into_iter()
        .map(|(category, acc)| CategoryMetrics {
            category: category.to_string(),
            total_spend: acc.spend,
            po_count: acc.rows,
            avg_po_value: acc.spend / acc.rows as f64,
            supplier_count: acc.suppliers.len(),
            subcategory_count: acc.subcategories.len(),
        })
        .collect();
    out.sort_by(|a, b| spend_desc_then(a.total_spend, b.total_spend, &a.category, &b.category));
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubcategorySpend {
    pub category: String,
    pub subcategory: String,
    pub total_spend: f64,
    pub supplier_count: usize,
}

/// Spend per (category, subcategory), optionally within one category. Rows
/// without a subcategory are left out.
pub fn subcategory_spend(table: &Table, category: Option<&str>) -> Vec<SubcategorySpend> {
    let mut map: BTreeMap<(&str, &str), (f64, BTreeSet<&str>)> = BTreeMap::new();
    for tx in table {
        if category.is_some_and(|c| c != tx.category) {
            continue;
        }
        let Some(sub) = &tx.subcategory else { continue };
        let e = map.entry((tx.category.as_str(), sub.as_str())).or_default();
        e.0 += tx.spend();
        e.1.insert(tx.supplier.as_str());
    }
    let mut out: Vec<SubcategorySpend> = map
        .into_iter()
        .map(|((category, subcategory), (spend, suppliers))| SubcategorySpend {
            category: category.to_string(),
            subcategory: subcategory.to_string(),
            total_spend: spend,
            supplier_count: suppliers.len(),
        })
        .collect();
    out.sort_by(|a, b| {
        spend_desc_then(a.total_spend, b.total_spend, &a.category, &b.category)
            .then_with(|| a.subcategory.cmp(&b.subcategory))
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Columns;
    use crate::test_support::tx;

    fn sample() -> Table {
        Table::new(
            vec![
                tx("SupplierA", "Janitorial", "CA", 1000.0).subcat("Paper"),
                tx("SupplierB", "Janitorial", "CA", 2000.0).subcat("Chemicals"),
                tx("SupplierB", "Janitorial", "CA", 300.0).subcat("Paper"),
                tx("SupplierA", "Facilities", "NY", 500.0),
            ],
            Columns::ALL,
        )
    }

    #[test]
    fn per_category_metrics() {
        let got = category_metrics(&sample());
        assert_eq!(got.len(), 2);
        let jan = &got[0];
        assert_eq!(jan.category, "Janitorial");
        assert_eq!(jan.total_spend, 3300.0);
        assert_eq!(jan.po_count, 3);
        assert_eq!(jan.avg_po_value, 1100.0);
        assert_eq!(jan.supplier_count, 2);
        assert_eq!(jan.subcategory_count, 2);
        assert_eq!(got[1].subcategory_count, 0);
    }

    #[test]
    fn subcategory_breakdown() {
        let got = subcategory_spend(&sample(), Some("Janitorial"));
        let names: Vec<&str> = got.iter().map(|s| s.subcategory.as_str()).collect();
        assert_eq!(names, vec!["Chemicals", "Paper"]);
        assert_eq!(got[1].total_spend, 1300.0);
        assert_eq!(got[1].supplier_count, 2);
        assert!(subcategory_spend(&sample(), Some("Facilities")).is_empty());
    }

    #[test]
    fn empty_input() {
        assert!(category_metrics(&Table::default()).is_empty());
        assert!(subcategory_spend(&Table::default(), None).is_empty());
    }
}
