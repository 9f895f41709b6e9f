// Report kinds and their sheet layouts.
//
// A report is a fixed list of named sheets built from aggregation results.
// Column headers are the export contract: CSV headers and workbook header
// rows match them exactly.
use crate::analytics::{
    category_metrics, concentration, consolidation_opportunities, consolidation_summary,
    data_summary, multi_state_suppliers, opportunity_suppliers, period_growth, po_metrics,
    regional_metrics, ship_to_state_spend, spend_distribution, spend_trend, state_metrics,
    subcategory_spend, supplier_metrics, top_suppliers, trend_stats, CategoryMetrics,
    ConsolidationOpportunity, ConsolidationParams, Granularity, MultiStateSupplier,
    OpportunitySupplier, RegionMetrics, ShipToStateSpend, SpendBucket, StateMetrics,
    SubcategorySpend, SupplierMetrics, SupplierSpend,
};
use crate::config::Config;
use crate::error::DashboardError;
use crate::export::{Cell, Sheet, Tabular};
use crate::loader::QualityReport;
use crate::schema::{Table, Transaction};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    ExecutiveSummary,
    SupplierAnalysis,
    CategoryAnalysis,
    GeographicAnalysis,
    ConsolidationOpportunities,
    SpendTrend(Granularity),
    RawTransactions,
}

impl ReportKind {
    pub const ALL: [ReportKind; 7] = [
        ReportKind::ExecutiveSummary,
        ReportKind::SupplierAnalysis,
        ReportKind::CategoryAnalysis,
        ReportKind::GeographicAnalysis,
        ReportKind::ConsolidationOpportunities,
        ReportKind::SpendTrend(Granularity::Month),
        ReportKind::RawTransactions,
    ];

    pub fn title(self) -> &'static str {
        match self {
            ReportKind::ExecutiveSummary => "Executive Summary",
            ReportKind::SupplierAnalysis => "Supplier Analysis",
            ReportKind::CategoryAnalysis => "Category Analysis",
            ReportKind::GeographicAnalysis => "Geographic Analysis",
            ReportKind::ConsolidationOpportunities => "Consolidation Opportunities",
            ReportKind::SpendTrend(_) => "Spend Trend",
            ReportKind::RawTransactions => "Raw Transactions",
        }
    }

    /// File-name stem for exports.
    pub fn slug(self) -> String {
        let base = self.title().to_lowercase().replace(' ', "_");
        match self {
            ReportKind::SpendTrend(g) => format!("{}_{:?}", base, g).to_lowercase(),
            _ => base,
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportKind::SpendTrend(g) => write!(f, "{} ({:?})", self.title(), g),
            _ => f.write_str(self.title()),
        }
    }
}

impl FromStr for ReportKind {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let kind = match s.as_str() {
            "executive" | "summary" | "executive summary" => ReportKind::ExecutiveSummary,
            "supplier" | "suppliers" | "supplier analysis" => ReportKind::SupplierAnalysis,
            "category" | "categories" | "category analysis" => ReportKind::CategoryAnalysis,
            "geographic" | "geography" | "geographic analysis" => ReportKind::GeographicAnalysis,
            "consolidation" | "consolidation opportunities" => {
                ReportKind::ConsolidationOpportunities
            }
            "raw" | "transactions" | "raw transactions" => ReportKind::RawTransactions,
            other => match other.strip_prefix("trend") {
                Some(rest) => {
                    let rest = rest.trim_start_matches([':', ' ']);
                    let g = if rest.is_empty() {
                        Granularity::Month
                    } else {
                        rest.parse()?
                    };
                    ReportKind::SpendTrend(g)
                }
                None => {
                    return Err(DashboardError::InvalidParameter(format!(
                        "unknown report {:?}",
                        other
                    )))
                }
            },
        };
        Ok(kind)
    }
}

/// Tunables for report assembly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportParams {
    pub consolidation: ConsolidationParams,
    pub top_n_suppliers: usize,
    pub concentration_top_n: usize,
}

impl ReportParams {
    pub fn from_config(config: &Config) -> Self {
        ReportParams {
            consolidation: ConsolidationParams::from_config(config),
            top_n_suppliers: config.top_n_suppliers,
            concentration_top_n: config.concentration_top_n,
        }
    }
}

pub fn build_report(kind: ReportKind, table: &Table, params: &ReportParams) -> Vec<Sheet> {
    match kind {
        ReportKind::ExecutiveSummary => vec![
            summary_sheet(table, params),
            Sheet::from_records("Top Suppliers", &top_suppliers(table, params.top_n_suppliers)),
            Sheet::from_records("Category Breakdown", &category_metrics(table)),
        ],
        ReportKind::SupplierAnalysis => vec![
            Sheet::from_records("Supplier Metrics", &supplier_metrics(table)),
            Sheet::from_records("Spend Distribution", &spend_distribution(table)),
        ],
        ReportKind::CategoryAnalysis => vec![
            Sheet::from_records("Category Metrics", &category_metrics(table)),
            Sheet::from_records("Subcategory Spend", &subcategory_spend(table, None)),
        ],
        ReportKind::GeographicAnalysis => vec![
            Sheet::from_records("Supplier State Spend", &state_metrics(table)),
            Sheet::from_records("Regional Summary", &regional_metrics(table)),
            Sheet::from_records("Multi-State Suppliers", &multi_state_suppliers(table)),
            Sheet::from_records("Ship-To State Spend", &ship_to_state_spend(table)),
        ],
        ReportKind::ConsolidationOpportunities => {
            let opps = consolidation_opportunities(table, &params.consolidation);
            let top_breakdown = opps
                .first()
                .map(|o| opportunity_suppliers(table, &o.category, o.subcategory.as_deref()))
                .unwrap_or_default();
            vec![
                consolidation_summary_sheet(&opps, &params.consolidation),
                Sheet::from_records("Opportunities", &opps),
                Sheet::from_records("Top Opportunity Suppliers", &top_breakdown),
            ]
        }
        ReportKind::SpendTrend(g) => trend_sheets(table, g),
        ReportKind::RawTransactions => vec![Sheet::from_records("Transactions", table.rows())],
    }
}

fn metric_sheet(name: &str, metrics: Vec<(&str, Cell)>) -> Sheet {
    let mut sheet = Sheet::new(name, vec!["Metric".to_string(), "Value".to_string()]);
    for (label, value) in metrics {
        sheet.push_row(vec![Cell::text(label), value]);
    }
    sheet
}

fn summary_sheet(table: &Table, params: &ReportParams) -> Sheet {
    let s = data_summary(table);
    let po = po_metrics(table);
    let conc = concentration(table, params.concentration_top_n);
    let conc_label = format!("Top {} Supplier Concentration", conc.top_n);
    metric_sheet(
        "Summary Metrics",
        vec![
            ("Total Spend", Cell::Money(s.total_spend)),
            ("Line Items", Cell::count(s.total_records)),
            ("Purchase Orders", Cell::count(s.unique_pos)),
            ("Suppliers", Cell::count(s.unique_suppliers)),
            ("Supplier States", Cell::count(s.unique_supplier_states)),
            ("Categories", Cell::count(s.categories)),
            ("Subcategories", Cell::count(s.subcategories)),
            ("Avg Line Value", Cell::Money(po.avg_line_value)),
            ("Median Line Value", Cell::Money(po.median_line_value)),
            ("Closure Rate", Cell::opt_percent(po.closure_rate)),
            (conc_label.as_str(), Cell::opt_percent(conc.ratio)),
            ("First Order", Cell::opt_date(s.date_min)),
            ("Last Order", Cell::opt_date(s.date_max)),
        ],
    )
}

fn consolidation_summary_sheet(
    opps: &[ConsolidationOpportunity],
    params: &ConsolidationParams,
) -> Sheet {
    let s = consolidation_summary(opps);
    metric_sheet(
        "Consolidation Summary",
        vec![
            ("Opportunities Found", Cell::count(s.opportunities)),
            ("Total Addressable Spend", Cell::Money(s.addressable_spend)),
            ("Potential Savings", Cell::Money(s.potential_savings)),
            ("Avg Suppliers per Opportunity", Cell::Number(s.avg_suppliers)),
            ("Minimum Suppliers", Cell::count(params.min_suppliers)),
            ("Minimum Spend", Cell::Money(params.min_spend)),
            ("Savings Rate", Cell::Percent(params.savings_rate)),
        ],
    )
}

fn trend_sheets(table: &Table, granularity: Granularity) -> Vec<Sheet> {
    let points = spend_trend(table, granularity);
    let mut trend = Sheet::new(
        "Spend Trend",
        ["Period", "Total Spend", "Line Items", "Growth"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    );
    for (p, g) in points.iter().zip(period_growth(&points)) {
        trend.push_row(vec![
            Cell::text(p.period.to_string()),
            Cell::Money(p.total_spend),
            Cell::count(p.po_count),
            Cell::opt_percent(g.growth.rate()),
        ]);
    }
    let stats = match trend_stats(&points) {
        Some(st) => metric_sheet(
            "Trend Statistics",
            vec![
                ("Periods", Cell::count(st.periods)),
                ("Average", Cell::Money(st.average)),
                ("Median", Cell::Money(st.median)),
                ("Std Dev", Cell::Money(st.std_dev)),
                ("Min", Cell::Money(st.min)),
                ("Max", Cell::Money(st.max)),
                ("Direction", Cell::text(format!("{:?}", st.direction))),
                ("Change", Cell::opt_percent(st.change.rate())),
            ],
        ),
        None => metric_sheet(
            "Trend Statistics",
            vec![("Periods", Cell::count(points.len()))],
        ),
    };
    vec![trend, stats]
}

/// Data-quality accounting as a two-column sheet.
pub fn quality_sheet(report: &QualityReport) -> Sheet {
    metric_sheet(
        "Data Quality",
        vec![
            ("Total Rows", Cell::count(report.total_rows)),
            ("Loaded Rows", Cell::count(report.loaded_rows)),
            ("Malformed Rows", Cell::count(report.malformed_rows)),
            ("Valid Dates", Cell::count(report.valid_date_rows)),
            ("Valid Amounts", Cell::count(report.valid_amount_rows)),
            ("Unknown Supplier State", Cell::count(report.unknown_supplier_state_rows)),
            ("Missing Supplier", Cell::count(report.missing_supplier_rows)),
            ("Missing Category", Cell::count(report.missing_category_rows)),
        ],
    )
}

impl Tabular for Transaction {
    fn headers() -> Vec<&'static str> {
        vec![
            "PO Number",
            "PO Order Date",
            "Supplier",
            "Supplier City/State",
            "Supplier State",
            "Ship-To State",
            "Category",
            "SubCategory",
            "Amount",
            "PO Status",
        ]
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::opt_text(self.po_number.as_deref()),
            Cell::opt_date(self.order_date),
            Cell::text(&self.supplier),
            Cell::text(&self.supplier_city_state),
            Cell::text(&self.supplier_state),
            Cell::opt_text(self.ship_to_state.as_deref()),
            Cell::text(&self.category),
            Cell::opt_text(self.subcategory.as_deref()),
            Cell::opt_money(self.amount),
            Cell::opt_text(self.po_status.as_deref()),
        ]
    }
}

impl Tabular for SupplierMetrics {
    fn headers() -> Vec<&'static str> {
        vec!["Supplier", "Total Spend", "PO Count", "Avg PO Value", "Category Count"]
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::text(&self.supplier),
            Cell::Money(self.total_spend),
            Cell::count(self.po_count),
            Cell::Money(self.avg_po_value),
            Cell::count(self.category_count),
        ]
    }
}

impl Tabular for SupplierSpend {
    fn headers() -> Vec<&'static str> {
        vec!["Supplier", "Total Spend", "% of Total"]
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::text(&self.supplier),
            Cell::Money(self.total_spend),
            Cell::opt_percent(self.share),
        ]
    }
}

impl Tabular for SpendBucket {
    fn headers() -> Vec<&'static str> {
        vec!["Spend Range", "Number of Suppliers"]
    }

    fn cells(&self) -> Vec<Cell> {
        vec![Cell::text(self.label), Cell::count(self.supplier_count)]
    }
}

impl Tabular for CategoryMetrics {
    fn headers() -> Vec<&'static str> {
        vec![
            "Category",
            "Total Spend",
            "PO Count",
            "Avg PO Value",
            "Suppliers",
            "Subcategories",
        ]
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::text(&self.category),
            Cell::Money(self.total_spend),
            Cell::count(self.po_count),
            Cell::Money(self.avg_po_value),
            Cell::count(self.supplier_count),
            Cell::count(self.subcategory_count),
        ]
    }
}

impl Tabular for SubcategorySpend {
    fn headers() -> Vec<&'static str> {
        vec!["Category", "Subcategory", "Total Spend", "Suppliers"]
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::text(&self.category),
            Cell::text(&self.subcategory),
            Cell::Money(self.total_spend),
            Cell::count(self.supplier_count),
        ]
    }
}

impl Tabular for StateMetrics {
    fn headers() -> Vec<&'static str> {
        vec!["Supplier State", "Total Spend", "Unique Suppliers", "PO Count", "% of Total Spend"]
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::text(&self.state),
            Cell::Money(self.total_spend),
            Cell::count(self.supplier_count),
            Cell::count(self.po_count),
            Cell::opt_percent(self.share),
        ]
    }
}

impl Tabular for ShipToStateSpend {
    fn headers() -> Vec<&'static str> {
        vec!["Ship-To State", "Total Spend", "Line Items"]
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::text(&self.ship_to_state),
            Cell::Money(self.total_spend),
            Cell::count(self.line_count),
        ]
    }
}

impl Tabular for RegionMetrics {
    fn headers() -> Vec<&'static str> {
        vec!["Region", "Total Spend", "Suppliers", "PO Count", "Avg Spend/Supplier"]
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::text(self.region.as_str()),
            Cell::Money(self.total_spend),
            Cell::count(self.supplier_count),
            Cell::count(self.po_count),
            Cell::Money(self.avg_spend_per_supplier),
        ]
    }
}

impl Tabular for MultiStateSupplier {
    fn headers() -> Vec<&'static str> {
        vec!["Supplier", "States", "State Count", "Total Spend"]
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::text(&self.supplier),
            Cell::text(self.states_label()),
            Cell::count(self.state_count()),
            Cell::Money(self.total_spend),
        ]
    }
}

impl Tabular for ConsolidationOpportunity {
    fn headers() -> Vec<&'static str> {
        vec![
            "Category",
            "SubCategory",
            "Suppliers",
            "Total Spend",
            "States",
            "Avg per Supplier",
            "Potential Savings",
        ]
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::text(&self.category),
            Cell::opt_text(self.subcategory.as_deref()),
            Cell::count(self.supplier_count),
            Cell::Money(self.total_spend),
            Cell::count(self.state_count),
            Cell::Money(self.avg_per_supplier),
            Cell::Money(self.potential_savings),
        ]
    }
}

impl Tabular for OpportunitySupplier {
    fn headers() -> Vec<&'static str> {
        vec!["Supplier", "Total Spend", "PO Count", "Share of Group"]
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::text(&self.supplier),
            Cell::Money(self.total_spend),
            Cell::count(self.po_count),
            Cell::opt_percent(self.share),
        ]
    }
}
