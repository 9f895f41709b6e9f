use crate::error::DashboardError;
use crate::schema::Table;
use crate::util::{average, median, std_dev};
use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Granularity {
    #[default]
    Month,
    Quarter,
    Year,
}

impl FromStr for Granularity {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m" | "month" | "monthly" => Ok(Granularity::Month),
            "q" | "quarter" | "quarterly" => Ok(Granularity::Quarter),
            "y" | "year" | "yearly" | "annual" => Ok(Granularity::Year),
            other => Err(DashboardError::InvalidParameter(format!(
                "unknown period granularity {:?}",
                other
            ))),
        }
    }
}

/// Calendar bucket. Ordering is chronological within one granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Period {
    Month { year: i32, month: u32 },
    Quarter { year: i32, quarter: u32 },
    Year { year: i32 },
}

impl Period {
    pub fn of(date: NaiveDate, granularity: Granularity) -> Period {
        match granularity {
            Granularity::Month => Period::Month {
                year: date.year(),
                month: date.month(),
            },
            Granularity::Quarter => Period::Quarter {
                year: date.year(),
                quarter: (date.month() - 1) / 3 + 1,
            },
            Granularity::Year => Period::Year { year: date.year() },
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Month { year, month } => write!(f, "{}-{:02}", year, month),
            Period::Quarter { year, quarter } => write!(f, "{}Q{}", year, quarter),
            Period::Year { year } => write!(f, "{}", year),
        }
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub period: Period,
    pub total_spend: f64,
    pub po_count: usize,
}

/// Spend per calendar period, oldest first. Rows without a valid date
/// cannot be placed in a period and are left out.
pub fn spend_trend(table: &Table, granularity: Granularity) -> Vec<TrendPoint> {
    let mut map: BTreeMap<Period, (f64, usize)> = BTreeMap::new();
    for tx in table {
        if let Some(d) = tx.order_date {
            let e = map.entry(Period::of(d, granularity)).or_default();
            e.0 += tx.spend();
            e.1 += 1;
        }
    }
    map.into_iter()
        .map(|(period, (total_spend, po_count))| TrendPoint {
            period,
            total_spend,
            po_count,
        })
        .collect()
}

/// Relative change between two periods. A zero baseline has no defined
/// growth; this is a value, not an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Growth {
    Rate(f64),
    Undefined,
}

impl Growth {
    pub fn rate(self) -> Option<f64> {
        match self {
            Growth::Rate(r) => Some(r),
            Growth::Undefined => None,
        }
    }
}

impl fmt::Display for Growth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Growth::Rate(r) => f.write_str(&crate::util::format_percent(*r)),
            Growth::Undefined => f.write_str("undefined"),
        }
    }
}

impl Serialize for Growth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Growth::Rate(r) => serializer.serialize_f64(*r),
            Growth::Undefined => serializer.serialize_str("undefined"),
        }
    }
}

/// `(current - previous) / previous`.
pub fn growth_rate(previous: f64, current: f64) -> Growth {
    if previous == 0.0 {
        Growth::Undefined
    } else {
        Growth::Rate((current - previous) / previous)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodGrowth {
    pub period: Period,
    pub total_spend: f64,
    /// Change against the preceding period; the first period has none.
    pub growth: Growth,
}

/// Period-over-period growth along a trend series.
pub fn period_growth(points: &[TrendPoint]) -> Vec<PeriodGrowth> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| PeriodGrowth {
            period: p.period,
            total_spend: p.total_spend,
            growth: match i.checked_sub(1) {
                Some(prev) => growth_rate(points[prev].total_spend, p.total_spend),
                None => Growth::Undefined,
            },
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Flat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendStats {
    pub periods: usize,
    pub average: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub direction: TrendDirection,
    /// First period to last period.
    pub change: Growth,
}

/// Summary statistics of a trend series; `None` for fewer than two periods,
/// where a trend is not meaningful.
pub fn trend_stats(points: &[TrendPoint]) -> Option<TrendStats> {
    if points.len() < 2 {
        return None;
    }
    let values: Vec<f64> = points.iter().map(|p| p.total_spend).collect();
    let first = values[0];
    let last = values[values.len() - 1];
    Some(TrendStats {
        periods: values.len(),
        average: average(&values),
        median: median(values.clone()),
        std_dev: std_dev(&values),
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        direction: if last > first {
            TrendDirection::Increasing
        } else if last < first {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Flat
        },
        change: growth_rate(first, last),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Columns;
    use crate::test_support::{date, tx};
    use rstest::rstest;

    fn sample() -> Table {
        Table::new(
            vec![
                tx("A", "X", "CA", 100.0).dated(2024, 1, 5),
                tx("A", "X", "CA", 50.0).dated(2024, 1, 20),
                tx("B", "X", "CA", 200.0).dated(2024, 2, 1),
                tx("B", "X", "CA", 400.0).dated(2024, 4, 1),
                tx("B", "X", "CA", 999.0),
            ],
            Columns::ALL,
        )
    }

    #[rstest]
    #[case(Granularity::Month, vec!["2024-01", "2024-02", "2024-04"])]
    #[case(Granularity::Quarter, vec!["2024Q1", "2024Q2"])]
    #[case(Granularity::Year, vec!["2024"])]
    fn test_trend_labels(#[case] g: Granularity, #[case] want: Vec<&str>) {
        let got: Vec<String> = spend_trend(&sample(), g).iter().map(|p| p.period.to_string()).collect();
        assert_eq!(got, want);
    }

    #[test]
    fn trend_skips_undated_rows_and_sums_per_period() {
        let got = spend_trend(&sample(), Granularity::Month);
        assert_eq!(got[0].total_spend, 150.0);
        assert_eq!(got[0].po_count, 2);
        let total: f64 = got.iter().map(|p| p.total_spend).sum();
        assert_eq!(total, 750.0);
    }

    #[test]
    fn quarter_boundaries() {
        assert_eq!(
            Period::of(date(2023, 3, 31), Granularity::Quarter),
            Period::Quarter { year: 2023, quarter: 1 }
        );
        assert_eq!(
            Period::of(date(2023, 10, 1), Granularity::Quarter),
            Period::Quarter { year: 2023, quarter: 4 }
        );
    }

    #[rstest]
    #[case(0.0, 500.0, Growth::Undefined)]
    #[case(100.0, 150.0, Growth::Rate(0.5))]
    #[case(200.0, 100.0, Growth::Rate(-0.5))]
    fn test_growth_rate(#[case] prev: f64, #[case] curr: f64, #[case] want: Growth) {
        assert_eq!(growth_rate(prev, curr), want);
    }

    #[test]
    fn undefined_growth_renders_as_text() {
        let g = growth_rate(0.0, 500.0);
        assert_eq!(g.to_string(), "undefined");
        assert_eq!(serde_json::to_string(&g).unwrap(), "\"undefined\"");
        assert_eq!(g.rate(), None);
    }

    #[test]
    fn growth_series_and_stats() {
        let trend = spend_trend(&sample(), Granularity::Month);
        let growth = period_growth(&trend);
        assert_eq!(growth[0].growth, Growth::Undefined);
        assert_eq!(growth[2].growth, Growth::Rate(1.0));

        let stats = trend_stats(&trend).unwrap();
        assert_eq!(stats.periods, 3);
        assert_eq!(stats.min, 150.0);
        assert_eq!(stats.max, 400.0);
        assert_eq!(stats.median, 200.0);
        assert_eq!(stats.direction, TrendDirection::Increasing);
    }

    #[test]
    fn fewer_than_two_periods_is_not_an_error() {
        let trend = spend_trend(&sample(), Granularity::Year);
        assert_eq!(trend.len(), 1);
        assert!(trend_stats(&trend).is_none());
        assert!(spend_trend(&Table::default(), Granularity::Month).is_empty());
    }

    #[test]
    fn granularity_parsing() {
        assert_eq!("Q".parse::<Granularity>().unwrap(), Granularity::Quarter);
        assert_eq!(" yearly ".parse::<Granularity>().unwrap(), Granularity::Year);
        assert!("weekly".parse::<Granularity>().is_err());
    }
}
