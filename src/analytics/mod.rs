// Aggregation library.
//
// Every function here takes an already-filtered `Table`
// plus plain parameters and returns owned result rows, one row per key.
// Empty input yields an empty (or zero-valued) result, never an error.
// Rows with an unparseable amount add nothing to spend sums but still count
// as line items.

pub mod categories;
pub mod consolidation;
pub mod geography;
pub mod kpis;
pub mod suppliers;
pub mod trends;

pub use categories::{category_metrics, subcategory_spend, CategoryMetrics, SubcategorySpend};
pub use consolidation::{
    consolidation_opportunities, consolidation_summary, opportunity_suppliers,
    ConsolidationOpportunity, ConsolidationParams, ConsolidationSummary, OpportunitySupplier,
};
pub use geography::{
    multi_state_suppliers, regional_metrics, ship_to_state_spend, state_metrics,
    MultiStateSupplier, RegionMetrics, ShipToStateSpend, StateMetrics,
};
pub use kpis::{data_summary, po_metrics, DataSummary, PoMetrics};
pub use suppliers::{
    concentration, spend_distribution, supplier_metrics, supplier_profile, top_suppliers,
    Concentration, NamedSpend, SpendBucket, SupplierMetrics, SupplierProfile, SupplierSpend,
};
pub use trends::{
    growth_rate, period_growth, spend_trend, trend_stats, Granularity, Growth, Period,
    PeriodGrowth, TrendDirection, TrendPoint, TrendStats,
};

use std::cmp::Ordering;

/// Larger spend first, then name ascending.
pub(crate) fn spend_desc_then(a_spend: f64, b_spend: f64, a_name: &str, b_name: &str) -> Ordering {
    b_spend.total_cmp(&a_spend).then_with(|| a_name.cmp(b_name))
}
