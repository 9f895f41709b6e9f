// Serialization of result sets to CSV, XLSX workbooks and JSON, plus the
// markdown console preview.
//
// Sheets carry typed cells. Currency symbols, separators and percent signs
// are applied while rendering (formatted CSV, workbook number formats,
// preview) and never stored back into the cells.
use crate::error::{DashboardError, Result};
use crate::util::{format_currency, format_number, format_percent};
use chrono::{Datelike, NaiveDate};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tabled::{builder::Builder, settings::Style};
use tracing::info;

/// Excel's sheet-name length limit.
const MAX_SHEET_NAME: usize = 31;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Int(i64),
    Number(f64),
    Money(f64),
    /// A fraction; `0.125` renders as `12.5%`.
    Percent(f64),
    Date(NaiveDate),
    /// A value that exists but has no numeric meaning (e.g. growth over a
    /// zero baseline).
    Undefined,
    Empty,
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Cell {
        Cell::Text(s.into())
    }

    pub fn opt_text(s: Option<&str>) -> Cell {
        s.map_or(Cell::Empty, |t| Cell::Text(t.to_string()))
    }

    pub fn count(n: usize) -> Cell {
        Cell::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }

    pub fn opt_money(v: Option<f64>) -> Cell {
        v.map_or(Cell::Empty, Cell::Money)
    }

    pub fn opt_percent(v: Option<f64>) -> Cell {
        v.map_or(Cell::Undefined, Cell::Percent)
    }

    pub fn opt_date(d: Option<NaiveDate>) -> Cell {
        d.map_or(Cell::Empty, Cell::Date)
    }

    /// Plain machine-readable rendering.
    pub fn raw(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Int(n) => n.to_string(),
            Cell::Number(v) | Cell::Money(v) | Cell::Percent(v) => v.to_string(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
            Cell::Undefined => "undefined".to_string(),
            Cell::Empty => String::new(),
        }
    }

    /// Human-readable rendering.
    pub fn display(&self) -> String {
        match self {
            Cell::Int(n) => crate::util::format_int(*n),
            Cell::Number(v) => format_number(*v, 2),
            Cell::Money(v) => format_currency(*v),
            Cell::Percent(v) => format_percent(*v),
            other => other.raw(),
        }
    }
}

/// Row types that can be laid out as a sheet.
pub trait Tabular {
    fn headers() -> Vec<&'static str>;
    fn cells(&self) -> Vec<Cell>;
}

/// A named, column-ordered result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Sheet {
        Sheet {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_records<T: Tabular>(name: impl Into<String>, records: &[T]) -> Sheet {
        Sheet {
            name: name.into(),
            columns: T::headers().into_iter().map(str::to_string).collect(),
            rows: records.iter().map(Tabular::cells).collect(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    /// Multi-sheet `.xlsx` workbook.
    Workbook,
    /// Comma-delimited file(s), one per sheet.
    Csv,
}

impl FromStr for ExportFormat {
    type Err = DashboardError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xlsx" | "excel" | "workbook" => Ok(ExportFormat::Workbook),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(DashboardError::InvalidParameter(format!(
                "unknown export format {:?}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// When false, a zero-row sheet fails with `EmptyResult`.
    pub allow_empty: bool,
    /// CSV only: write the presentation rendering instead of raw values.
    pub formatted: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            allow_empty: true,
            formatted: false,
        }
    }
}

/// Write `sheets` to `dest` and return the files produced.
///
/// For CSV, a single sheet goes to `dest` itself; several sheets go to
/// `<stem>_<sheet>.csv` next to it.
pub fn export(
    sheets: &[Sheet],
    format: ExportFormat,
    dest: &Path,
    options: ExportOptions,
) -> Result<Vec<PathBuf>> {
    if !options.allow_empty {
        if let Some(empty) = sheets.iter().find(|s| s.is_empty()) {
            return Err(DashboardError::EmptyResult {
                sheet: empty.name.clone(),
            });
        }
    }
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| DashboardError::export(dest, e))?;
    }
    match format {
        ExportFormat::Workbook => {
            write_workbook(dest, sheets)?;
            Ok(vec![dest.to_path_buf()])
        }
        ExportFormat::Csv if sheets.len() == 1 => {
            write_csv(dest, &sheets[0], options.formatted)?;
            Ok(vec![dest.to_path_buf()])
        }
        ExportFormat::Csv => {
            let stem = dest
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "report".to_string());
            let dir = dest.parent().unwrap_or_else(|| Path::new(""));
            let mut written = Vec::with_capacity(sheets.len());
            for (sheet, slug) in sheets.iter().zip(file_slugs(sheets)) {
                let path = dir.join(format!("{}_{}.csv", stem, slug));
                write_csv(&path, sheet, options.formatted)?;
                written.push(path);
            }
            Ok(written)
        }
    }
}

/// One sheet as a flat CSV file: header row, then rows in sheet order.
pub fn write_csv(path: &Path, sheet: &Sheet, formatted: bool) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| DashboardError::export(path, e))?;
    wtr.write_record(&sheet.columns)
        .map_err(|e| DashboardError::export(path, e))?;
    for row in &sheet.rows {
        let record: Vec<String> = row
            .iter()
            .map(|c| if formatted { c.display() } else { c.raw() })
            .collect();
        wtr.write_record(&record)
            .map_err(|e| DashboardError::export(path, e))?;
    }
    wtr.flush().map_err(|e| DashboardError::export(path, e))?;
    info!(path = %path.display(), rows = sheet.rows.len(), "wrote CSV");
    Ok(())
}

/// All sheets into one workbook, one worksheet each. Numbers stay numeric;
/// currency, percent and date cells get Excel number formats.
pub fn write_workbook(path: &Path, sheets: &[Sheet]) -> Result<()> {
    let header = Format::new().set_bold();
    let money = Format::new().set_num_format("$#,##0.00");
    let percent = Format::new().set_num_format("0.0%");
    let number = Format::new().set_num_format("#,##0.00");
    let date = Format::new().set_num_format("yyyy-mm-dd");

    let mut workbook = Workbook::new();
    let names = sheet_names(sheets);
    for (sheet, name) in sheets.iter().zip(names) {
        let ws = workbook.add_worksheet();
        ws.set_name(&name).map_err(|e| DashboardError::export(path, e))?;
        for (col, title) in sheet.columns.iter().enumerate() {
            ws.write_string_with_format(0, col as u16, title, &header)
                .map_err(|e| DashboardError::export(path, e))?;
        }
        for (r, row) in sheet.rows.iter().enumerate() {
            let r = (r + 1) as u32;
            for (c, cell) in row.iter().enumerate() {
                let c = c as u16;
                let res = match cell {
                    Cell::Text(s) => ws.write_string(r, c, s),
                    Cell::Int(n) => ws.write_number(r, c, *n as f64),
                    Cell::Number(v) => ws.write_number_with_format(r, c, *v, &number),
                    Cell::Money(v) => ws.write_number_with_format(r, c, *v, &money),
                    Cell::Percent(v) => ws.write_number_with_format(r, c, *v, &percent),
                    Cell::Date(d) => match excel_date(*d) {
                        Some(dt) => ws.write_datetime_with_format(r, c, &dt, &date),
                        None => ws.write_string(r, c, d.format("%Y-%m-%d").to_string()),
                    },
                    Cell::Undefined => ws.write_string(r, c, "undefined"),
                    Cell::Empty => continue,
                };
                res.map_err(|e| DashboardError::export(path, e))?;
            }
        }
        ws.autofit();
    }
    workbook
        .save(path)
        .map_err(|e| DashboardError::export(path, e))?;
    info!(path = %path.display(), sheets = sheets.len(), "wrote workbook");
    Ok(())
}

/// `None` for dates a worksheet cannot hold (years outside 1900..=9999);
/// those are written as ISO text instead.
fn excel_date(d: NaiveDate) -> Option<ExcelDateTime> {
    let year = u16::try_from(d.year()).ok()?;
    ExcelDateTime::from_ymd(year, d.month() as u8, d.day() as u8).ok()
}

/// Workbook-safe, unique sheet names.
pub fn sheet_names(sheets: &[Sheet]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    sheets
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let cleaned: String = s
                .name
                .chars()
                .map(|c| if "[]:*?/\\".contains(c) { '_' } else { c })
                .collect();
            let cleaned = cleaned.trim_matches('\'').trim().to_string();
            let base = if cleaned.is_empty() {
                format!("Sheet{}", i + 1)
            } else {
                cleaned
            };
            let mut candidate: String = base.chars().take(MAX_SHEET_NAME).collect();
            let mut n = 2;
            while used.contains(&candidate.to_lowercase()) {
                let suffix = format!(" ({})", n);
                let keep = MAX_SHEET_NAME - suffix.chars().count();
                candidate = base.chars().take(keep).collect::<String>() + &suffix;
                n += 1;
            }
            used.insert(candidate.to_lowercase());
            candidate
        })
        .collect()
}

fn file_slug(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .split('_')
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// File-name slugs for per-sheet CSVs, unique case-insensitively so no
/// sheet overwrites another.
fn file_slugs(sheets: &[Sheet]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    sheets
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let base = match file_slug(&s.name) {
                slug if slug.is_empty() => format!("Sheet{}", i + 1),
                slug => slug,
            };
            let mut candidate = base.clone();
            let mut n = 2;
            while !used.insert(candidate.to_lowercase()) {
                candidate = format!("{}_{}", base, n);
                n += 1;
            }
            candidate
        })
        .collect()
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value).map_err(|e| DashboardError::export(path, e))?;
    std::fs::write(path, s).map_err(|e| DashboardError::export(path, e))?;
    info!(path = %path.display(), "wrote JSON");
    Ok(())
}

/// Markdown rendering of the first `max_rows` rows.
pub fn preview(sheet: &Sheet, max_rows: usize) -> String {
    if sheet.rows.is_empty() {
        return "(no rows)".to_string();
    }
    let mut builder = Builder::default();
    builder.push_record(sheet.columns.iter().cloned());
    for row in sheet.rows.iter().take(max_rows) {
        builder.push_record(row.iter().map(Cell::display));
    }
    let mut table = builder.build();
    table.with(Style::markdown());
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sheet(name: &str) -> Sheet {
        let mut s = Sheet::new(name, vec!["Supplier".into(), "Total Spend".into(), "Share".into()]);
        s.push_row(vec![Cell::text("Acme, Inc."), Cell::Money(1234.5), Cell::Percent(0.125)]);
        s.push_row(vec![Cell::text("Beta"), Cell::Money(-20.0), Cell::Undefined]);
        s
    }

    #[test]
    fn raw_and_display_renderings() {
        assert_eq!(Cell::Money(1234.5).raw(), "1234.5");
        assert_eq!(Cell::Money(1234.5).display(), "$1,234.50");
        assert_eq!(Cell::Percent(0.125).display(), "12.5%");
        assert_eq!(Cell::count(12_345).display(), "12,345");
        assert_eq!(Cell::Undefined.display(), "undefined");
        assert_eq!(Cell::opt_date(None).raw(), "");
    }

    #[test]
    fn formatted_csv_keeps_values_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let s = sheet("Suppliers");
        let path = dir.path().join("out.csv");
        write_csv(&path, &s, true).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"$1,234.50\""));
        assert!(text.contains("12.5%"));
        assert_eq!(s.rows[0][1], Cell::Money(1234.5));
    }

    #[test]
    fn empty_sheets_rejected_when_disallowed() {
        let dir = tempfile::tempdir().unwrap();
        let empty = Sheet::new("Nothing", vec!["A".into()]);
        let opts = ExportOptions {
            allow_empty: false,
            ..ExportOptions::default()
        };
        let err = export(&[empty.clone()], ExportFormat::Csv, &dir.path().join("x.csv"), opts)
            .unwrap_err();
        assert!(matches!(err, DashboardError::EmptyResult { ref sheet } if sheet == "Nothing"));

        let written = export(
            &[empty],
            ExportFormat::Csv,
            &dir.path().join("x.csv"),
            ExportOptions::default(),
        )
        .unwrap();
        assert_eq!(std::fs::read_to_string(&written[0]).unwrap(), "A\n");
    }

    #[test]
    fn several_sheets_to_csv_write_one_file_each() {
        let dir = tempfile::tempdir().unwrap();
        let written = export(
            &[sheet("Top Suppliers"), sheet("State Spend")],
            ExportFormat::Csv,
            &dir.path().join("report.csv"),
            ExportOptions::default(),
        )
        .unwrap();
        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["report_Top_Suppliers.csv", "report_State_Spend.csv"]);
        assert!(written.iter().all(|p| p.exists()));
    }

    #[test]
    fn colliding_sheet_slugs_get_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let written = export(
            &[sheet("Top/Suppliers"), sheet("Top Suppliers"), sheet("???")],
            ExportFormat::Csv,
            &dir.path().join("report.csv"),
            ExportOptions::default(),
        )
        .unwrap();
        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["report_Top_Suppliers.csv", "report_Top_Suppliers_2.csv", "report_Sheet3.csv"]
        );
        assert!(written.iter().all(|p| p.exists()));
    }

    #[test]
    fn workbook_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.xlsx");
        let mut s = sheet("Suppliers");
        s.push_row(vec![
            Cell::Date(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()),
            Cell::Int(3),
            Cell::Empty,
        ]);
        let written = export(&[s, sheet("Suppliers")], ExportFormat::Workbook, &path, ExportOptions::default())
            .unwrap();
        assert_eq!(written, vec![path.clone()]);
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[rstest]
    #[case(NaiveDate::from_ymd_opt(202, 1, 15).unwrap())]
    #[case(NaiveDate::from_ymd_opt(1899, 1, 5).unwrap())]
    #[case(NaiveDate::from_ymd_opt(-44, 3, 15).unwrap())]
    fn workbook_writes_out_of_range_dates_as_text(#[case] d: NaiveDate) {
        assert!(excel_date(d).is_none());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dates.xlsx");
        let mut s = Sheet::new("Dates", vec!["Order Date".into()]);
        s.push_row(vec![Cell::Date(d)]);
        s.push_row(vec![Cell::Date(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap())]);
        write_workbook(&path, &[s]).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn unwritable_destination_is_an_export_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let err = write_csv(&blocker.join("out.csv"), &sheet("S"), false).unwrap_err();
        assert!(matches!(err, DashboardError::Export { .. }));
    }

    #[rstest]
    #[case(&["Summary"], &["Summary"])]
    #[case(&["a/b:c"], &["a_b_c"])]
    #[case(&["Janitorial Services - Subcategories"], &["Janitorial Services - Subcatego"])]
    #[case(&["Spend", "spend"], &["Spend", "spend (2)"])]
    #[case(&[""], &["Sheet1"])]
    fn test_sheet_names(#[case] input: &[&str], #[case] want: &[&str]) {
        let sheets: Vec<Sheet> = input.iter().map(|n| Sheet::new(*n, vec![])).collect();
        assert_eq!(sheet_names(&sheets), want);
    }

    #[test]
    fn preview_renders_markdown() {
        let out = preview(&sheet("S"), 1);
        assert!(out.contains("| Supplier"));
        assert!(out.contains("$1,234.50"));
        assert!(!out.contains("Beta"));
        assert_eq!(preview(&Sheet::new("E", vec!["A".into()]), 5), "(no rows)");
    }
}
