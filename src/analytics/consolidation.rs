// Consolidation-opportunity detection.
//
// A (category, subcategory) group is an opportunity when purchasing is spread
// over at least `min_suppliers` vendors and the group's spend reaches
// `min_spend`. Rows without a subcategory form their own group under the
// category.
use super::spend_desc_then;
use crate::config::{Config, SAVINGS_PERCENT_RANGE};
use crate::error::{DashboardError, Result};
use crate::schema::Table;
use crate::util::ratio;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConsolidationParams {
    pub min_suppliers: usize,
    pub min_spend: f64,
    /// Fraction of spend assumed recoverable (0.05..=0.30).
    pub savings_rate: f64,
}

impl ConsolidationParams {
    pub fn new(min_suppliers: usize, min_spend: f64, savings_percent: u8) -> Result<Self> {
        if !SAVINGS_PERCENT_RANGE.contains(&savings_percent) {
            return Err(DashboardError::InvalidParameter(format!(
                "savings rate must be between {}% and {}%, got {}%",
                SAVINGS_PERCENT_RANGE.start(),
                SAVINGS_PERCENT_RANGE.end(),
                savings_percent
            )));
        }
        if !min_spend.is_finite() {
            return Err(DashboardError::InvalidParameter(
                "minimum spend must be finite".to_string(),
            ));
        }
        Ok(ConsolidationParams {
            min_suppliers,
            min_spend,
            savings_rate: f64::from(savings_percent) / 100.0,
        })
    }

    pub fn from_config(config: &Config) -> Self {
        ConsolidationParams {
            min_suppliers: config.min_suppliers,
            min_spend: config.min_spend,
            savings_rate: config.savings_rate(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsolidationOpportunity {
    pub category: String,
    pub subcategory: Option<String>,
    pub supplier_count: usize,
    pub total_spend: f64,
    /// Distinct known supplier states serving the group.
    pub state_count: usize,
    pub avg_per_supplier: f64,
    pub potential_savings: f64,
}

impl ConsolidationOpportunity {
    pub fn label(&self) -> String {
        match &self.subcategory {
            Some(sub) => format!("{} / {}", self.category, sub),
            None => self.category.clone(),
        }
    }
}

/// Flagged groups ranked by potential savings, then spend, then name.
pub fn consolidation_opportunities(
    table: &Table,
    params: &ConsolidationParams,
) -> Vec<ConsolidationOpportunity> {
    #[derive(Default)]
    struct Acc<'a> {
        spend: f64,
        suppliers: BTreeSet<&'a str>,
        states: BTreeSet<&'a str>,
    }
    let mut map: BTreeMap<(&str, Option<&str>), Acc> = BTreeMap::new();
    for tx in table {
        let key = (tx.category.as_str(), tx.subcategory.as_deref());
        let e = map.entry(key).or_default();
        e.spend += tx.spend();
        e.suppliers.insert(tx.supplier.as_str());
        if tx.has_known_supplier_state() {
            e.states.insert(tx.supplier_state.as_str());
        }
    }
    let mut out: Vec<ConsolidationOpportunity> = map
        .into_iter()
        .filter(|(_, acc)| acc.suppliers.len() >= params.min_suppliers && acc.spend >= params.min_spend)
        .map(|((category, subcategory), acc)| ConsolidationOpportunity {
            category: category.to_string(),
            subcategory: subcategory.map(str::to_string),
            supplier_count: acc.suppliers.len(),
            total_spend: acc.spend,
            state_count: acc.states.len(),
            avg_per_supplier: acc.spend / acc.suppliers.len() as f64,
            potential_savings: acc.spend * params.savings_rate,
        })
        .collect();
    out.sort_by(|a, b| {
        b.potential_savings
            .total_cmp(&a.potential_savings)
            .then_with(|| b.total_spend.total_cmp(&a.total_spend))
            .then_with(|| a.category.cmp(&b.category))
            .then_with(|| a.subcategory.cmp(&b.subcategory))
    });
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsolidationSummary {
    pub opportunities: usize,
    pub addressable_spend: f64,
    pub potential_savings: f64,
    /// Zero when there are no opportunities.
    pub avg_suppliers: f64,
}

pub fn consolidation_summary(opportunities: &[ConsolidationOpportunity]) -> ConsolidationSummary {
    let n = opportunities.len();
    ConsolidationSummary {
        opportunities: n,
        addressable_spend: opportunities.iter().map(|o| o.total_spend).sum(),
        potential_savings: opportunities.iter().map(|o| o.potential_savings).sum(),
        avg_suppliers: if n == 0 {
            0.0
        } else {
            opportunities.iter().map(|o| o.supplier_count).sum::<usize>() as f64 / n as f64
        },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpportunitySupplier {
    pub supplier: String,
    pub total_spend: f64,
    pub po_count: usize,
    pub share: Option<f64>,
}

/// Suppliers inside one (category, subcategory) group, largest first.
pub fn opportunity_suppliers(
    table: &Table,
    category: &str,
    subcategory: Option<&str>,
) -> Vec<OpportunitySupplier> {
    let mut map: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    let mut group_spend = 0.0;
    for tx in table
        .iter()
        .filter(|tx| tx.category == category && tx.subcategory.as_deref() == subcategory)
    {
        let e = map.entry(tx.supplier.as_str()).or_default();
        e.0 += tx.spend();
        e.1 += 1;
        group_spend += tx.spend();
    }
    let mut out: Vec<OpportunitySupplier> = map
        .into_iter()
        .map(|(supplier, (spend, rows))| OpportunitySupplier {
            supplier: supplier.to_string(),
            total_spend: spend,
            po_count: rows,
            share: ratio(spend, group_spend),
        })
        .collect();
    out.sort_by(|a, b| spend_desc_then(a.total_spend, b.total_spend, &a.supplier, &b.supplier));
    out
}
