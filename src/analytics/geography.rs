// Geographic breakdowns.
//
// Supplier-centric views group by `supplier_state` (vendor location). The
// one delivery-side view, `ship_to_state_spend`, is named as such and reads
// only `ship_to_state`.
use super::spend_desc_then;
use crate::schema::{Region, Table, Transaction};
use crate::util::ratio;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateMetrics {
    pub state: String,
    pub total_spend: f64,
    pub supplier_count: usize,
    pub po_count: usize,
    /// Share of total spend; `None` when the total is zero.
    pub share: Option<f64>,
}

/// Distinct PO identifiers when the source carries them, line items otherwise.
fn po_count<'a, I>(rows: I, has_po_column: bool) -> usize
where
    I: IntoIterator<Item = &'a Transaction>,
{
    if has_po_column {
        rows.into_iter()
            .filter_map(|tx| tx.po_number.as_deref())
            .collect::<BTreeSet<_>>()
            .len()
    } else {
        rows.into_iter().count()
    }
}

/// Spend, supplier and PO counts per supplier state. Rows whose supplier
/// location did not resolve are reported under the `Unknown` key.
pub fn state_metrics(table: &Table) -> Vec<StateMetrics> {
    let has_po = table.columns().po_number;
    let total = table.total_spend();
    let mut groups: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
    for tx in table {
        groups.entry(tx.supplier_state.as_str()).or_default().push(tx);
    }
    let mut out: Vec<StateMetrics> = groups
        .into_iter()
        .map(|(state, rows)| {
            let spend: f64 = rows.iter().map(|tx| tx.spend()).sum();
            let suppliers: BTreeSet<&str> = rows.iter().map(|tx| tx.supplier.as_str()).collect();
            StateMetrics {
                state: state.to_string(),
                total_spend: spend,
                supplier_count: suppliers.len(),
                po_count: po_count(rows.iter().copied(), has_po),
                share: ratio(spend, total),
            }
        })
        .collect();
    out.sort_by(|a, b| spend_desc_then(a.total_spend, b.total_spend, &a.state, &b.state));
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShipToStateSpend {
    pub ship_to_state: String,
    pub total_spend: f64,
    pub line_count: usize,
}

/// Spend by delivery destination. Rows without a ship-to state are skipped.
pub fn ship_to_state_spend(table: &Table) -> Vec<ShipToStateSpend> {
    let mut map: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for tx in table {
        if let Some(state) = &tx.ship_to_state {
            let e = map.entry(state.as_str()).or_default();
            e.0 += tx.spend();
            e.1 += 1;
        }
    }
    let mut out: Vec<ShipToStateSpend> = map
        .into_iter()
        .map(|(state, (spend, lines))| ShipToStateSpend {
            ship_to_state: state.to_string(),
            total_spend: spend,
            line_count: lines,
        })
        .collect();
    out.sort_by(|a, b| {
        spend_desc_then(a.total_spend, b.total_spend, &a.ship_to_state, &b.ship_to_state)
    });
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionMetrics {
    pub region: Region,
    pub total_spend: f64,
    pub supplier_count: usize,
    pub po_count: usize,
    pub avg_spend_per_supplier: f64,
}

/// Census-region rollup of supplier states.
pub fn regional_metrics(table: &Table) -> Vec<RegionMetrics> {
    #[derive(Default)]
    struct Acc<'a> {
        spend: f64,
        rows: usize,
        suppliers: BTreeSet<&'a str>,
    }
    let mut map: BTreeMap<Region, Acc> = BTreeMap::new();
    for tx in table {
        let e = map.entry(Region::of(&tx.supplier_state)).or_default();
        e.spend += tx.spend();
        e.rows += 1;
        e.suppliers.insert(tx.supplier.as_str());
    }
    let mut out: Vec<RegionMetrics> = map
        .into_iter()
        .map(|(region, acc)| RegionMetrics {
            region,
            total_spend: acc.spend,
            supplier_count: acc.suppliers.len(),
            po_count: acc.rows,
            avg_spend_per_supplier: acc.spend / acc.suppliers.len() as f64,
        })
        .collect();
    out.sort_by(|a, b| {
        b.total_spend
            .total_cmp(&a.total_spend)
            .then_with(|| a.region.cmp(&b.region))
    });
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiStateSupplier {
    pub supplier: String,
    pub states: BTreeSet<String>,
    pub total_spend: f64,
}

impl MultiStateSupplier {
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// `"CA, NY"`.
    pub fn states_label(&self) -> String {
        self.states.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
    }
}

/// Suppliers located in two or more known supplier states, with the state
/// set listed. The `Unknown` sentinel is not a location and never counts.
pub fn multi_state_suppliers(table: &Table) -> Vec<MultiStateSupplier> {
    let mut map: BTreeMap<&str, (BTreeSet<&str>, f64)> = BTreeMap::new();
    for tx in table {
        let e = map.entry(tx.supplier.as_str()).or_default();
        if tx.has_known_supplier_state() {
            e.0.insert(tx.supplier_state.as_str());
        }
        e.1 += tx.spend();
    }
    let mut out: Vec<MultiStateSupplier> = map
        .into_iter()
        .filter(|(_, (states, _))| states.len() >= 2)
        .map(|(supplier, (states, spend))| MultiStateSupplier {
            supplier: supplier.to_string(),
            states: states.into_iter().map(str::to_string).collect(),
            total_spend: spend,
        })
        .collect();
    out.sort_by(|a, b| spend_desc_then(a.total_spend, b.total_spend, &a.supplier, &b.supplier));
    out
}
