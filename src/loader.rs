use crate::error::{DashboardError, Result};
use crate::schema::{
    normalize_state, Columns, RawRow, Table, Transaction, PO_NUMBER_COLUMN, PO_STATUS_COLUMN,
    REQUIRED_COLUMNS, SHIP_TO_STATE_COLUMN, SUBCATEGORY_COLUMN, UNCATEGORIZED, UNKNOWN_STATE,
    UNKNOWN_SUPPLIER,
};
use crate::util::{clean_text, parse_date_safe, parse_f64_safe};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Row-level accounting for one load. Defective rows are kept in the table
/// and counted here; only records the CSV reader cannot decode at all are
/// skipped, and those are counted as `malformed_rows`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QualityReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub malformed_rows: usize,
    pub valid_date_rows: usize,
    pub valid_amount_rows: usize,
    pub unknown_supplier_state_rows: usize,
    pub missing_supplier_rows: usize,
    pub missing_category_rows: usize,
}

impl QualityReport {
    pub fn invalid_date_rows(&self) -> usize {
        self.loaded_rows - self.valid_date_rows
    }

    pub fn invalid_amount_rows(&self) -> usize {
        self.loaded_rows - self.valid_amount_rows
    }

    /// Non-fatal defects worth surfacing, one entry per defect class.
    pub fn warnings(&self) -> Vec<DataQualityWarning> {
        let mut out = Vec::new();
        if self.malformed_rows > 0 {
            out.push(DataQualityWarning::MalformedRows(self.malformed_rows));
        }
        if self.invalid_date_rows() > 0 {
            out.push(DataQualityWarning::InvalidDates(self.invalid_date_rows()));
        }
        if self.invalid_amount_rows() > 0 {
            out.push(DataQualityWarning::InvalidAmounts(self.invalid_amount_rows()));
        }
        if self.unknown_supplier_state_rows > 0 {
            out.push(DataQualityWarning::UnknownSupplierState(
                self.unknown_supplier_state_rows,
            ));
        }
        if self.missing_supplier_rows > 0 {
            out.push(DataQualityWarning::MissingSupplier(self.missing_supplier_rows));
        }
        if self.missing_category_rows > 0 {
            out.push(DataQualityWarning::MissingCategory(self.missing_category_rows));
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataQualityWarning {
    MalformedRows(usize),
    InvalidDates(usize),
    InvalidAmounts(usize),
    UnknownSupplierState(usize),
    MissingSupplier(usize),
    MissingCategory(usize),
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataQualityWarning::MalformedRows(n) => write!(f, "{} rows could not be decoded", n),
            DataQualityWarning::InvalidDates(n) => {
                write!(f, "{} rows have an unparseable order date", n)
            }
            DataQualityWarning::InvalidAmounts(n) => {
                write!(f, "{} rows have a non-numeric amount (excluded from spend)", n)
            }
            DataQualityWarning::UnknownSupplierState(n) => {
                write!(f, "{} rows have an unrecognised supplier state", n)
            }
            DataQualityWarning::MissingSupplier(n) => {
                write!(f, "{} rows have no supplier name", n)
            }
            DataQualityWarning::MissingCategory(n) => write!(f, "{} rows have no category", n),
        }
    }
}

/// Load a purchase-order CSV from disk.
pub fn load(path: &Path) -> Result<(Table, QualityReport)> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
            DashboardError::SourceNotFound {
                path: path.to_path_buf(),
            }
        }
        _ => DashboardError::Io(e),
    })?;
    let (table, report) = load_reader(file)?;
    info!(
        path = %path.display(),
        rows = report.loaded_rows,
        valid_dates = report.valid_date_rows,
        valid_amounts = report.valid_amount_rows,
        "loaded purchase-order data"
    );
    for w in report.warnings() {
        warn!(path = %path.display(), "{}", w);
    }
    Ok((table, report))
}

/// Load from any reader that yields the expected CSV layout.
pub fn load_reader<R: Read>(reader: R) -> Result<(Table, QualityReport)> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);
    let columns = validate_headers(rdr.headers()?)?;

    let mut report = QualityReport::default();
    let mut rows: Vec<Transaction> = Vec::new();

    for result in rdr.deserialize::<RawRow>() {
        report.total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(_) => {
                report.malformed_rows += 1;
                continue;
            }
        };
        let tx = clean_row(row, &mut report);
        rows.push(tx);
    }

    report.loaded_rows = rows.len();
    Ok((Table::new(rows, columns), report))
}

fn validate_headers(headers: &StringRecord) -> Result<Columns> {
    let has = |name: &str| headers.iter().any(|h| h.trim_start_matches('\u{feff}') == name);
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !has(c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(DashboardError::Schema { missing });
    }
    Ok(Columns {
        subcategory: has(SUBCATEGORY_COLUMN),
        ship_to_state: has(SHIP_TO_STATE_COLUMN),
        po_number: has(PO_NUMBER_COLUMN),
        po_status: has(PO_STATUS_COLUMN),
    })
}

fn clean_row(row: RawRow, report: &mut QualityReport) -> Transaction {
    let order_date = parse_date_safe(row.order_date.as_deref());
    if order_date.is_some() {
        report.valid_date_rows += 1;
    }
    let amount = parse_f64_safe(row.amount.as_deref());
    if amount.is_some() {
        report.valid_amount_rows += 1;
    }

    let supplier = clean_text(row.supplier).unwrap_or_else(|| {
        report.missing_supplier_rows += 1;
        UNKNOWN_SUPPLIER.to_string()
    });
    let category = clean_text(row.category).unwrap_or_else(|| {
        report.missing_category_rows += 1;
        UNCATEGORIZED.to_string()
    });

    let supplier_city_state = clean_text(row.supplier_city_state).unwrap_or_default();
    let (supplier_city, supplier_state) = split_supplier_location(&supplier_city_state);
    if supplier_state == UNKNOWN_STATE {
        report.unknown_supplier_state_rows += 1;
    }

    Transaction {
        po_number: clean_text(row.po_number),
        order_date,
        supplier,
        supplier_city_state,
        supplier_city,
        supplier_state,
        ship_to_state: clean_text(row.ship_to_state).map(|s| s.to_uppercase()),
        category,
        subcategory: clean_text(row.subcategory),
        amount,
        po_status: clean_text(row.po_status),
    }
}

/// Split `"City, ST"` into its city and a normalised state code. The state
/// is the last comma-delimited token; anything that does not resolve to a
/// known code becomes the `Unknown` sentinel.
pub fn split_supplier_location(raw: &str) -> (Option<String>, String) {
    let tokens: Vec<&str> = raw.split(',').map(str::trim).collect();
    let state = tokens
        .last()
        .and_then(|t| normalize_state(t))
        .unwrap_or(UNKNOWN_STATE)
        .to_string();
    let city = if tokens.len() > 1 {
        Some(tokens[0].to_string()).filter(|c| !c.is_empty())
    } else {
        None
    };
    (city, state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use rstest::rstest;

    #[rstest]
    #[case("Dallas, TX", Some("Dallas"), "TX")]
    #[case("Albany,ny", Some("Albany"), "NY")]
    #[case("Austin, TX 78701", Some("Austin"), "TX")]
    #[case("Sacramento, California", Some("Sacramento"), "CA")]
    #[case("CA", None, "CA")]
    #[case("Toronto, ON", Some("Toronto"), UNKNOWN_STATE)]
    #[case("", None, UNKNOWN_STATE)]
    fn test_split_supplier_location(
        #[case] raw: &str,
        #[case] city: Option<&str>,
        #[case] state: &str,
    ) {
        let (got_city, got_state) = split_supplier_location(raw);
        assert_eq!(got_city.as_deref(), city);
        assert_eq!(got_state, state);
    }

    #[test]
    fn rows_with_defects_are_kept_and_counted() {
        let csv = indoc! {"
            VSTX PO #,PO Order Date,Corcentric Supplier Name,Supplier City/State,State,Category,SubCategory,Line Item Subtotal
            PO-1,2024-01-15,Acme,\"Dallas, TX\",CA,Janitorial,Paper,1000
            PO-2,not a date,Acme,\"Dallas, TX\",CA,Janitorial,Paper,250
            PO-3,2024-02-01,,\"Nowhere, ZZ\",NY,,,abc
        "};
        let (table, report) = load_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(report.total_rows, 3);
        assert_eq!(report.loaded_rows, 3);
        assert_eq!(report.valid_date_rows, 2);
        assert_eq!(report.valid_amount_rows, 2);
        assert_eq!(report.unknown_supplier_state_rows, 1);
        assert_eq!(report.missing_supplier_rows, 1);
        assert_eq!(report.missing_category_rows, 1);
        assert_eq!(report.warnings().len(), 5);

        let last = &table.rows()[2];
        assert_eq!(last.supplier, UNKNOWN_SUPPLIER);
        assert_eq!(last.category, UNCATEGORIZED);
        assert_eq!(last.supplier_state, UNKNOWN_STATE);
        assert_eq!(last.ship_to_state.as_deref(), Some("NY"));
        assert_eq!(last.amount, None);
        assert_eq!(table.total_spend(), 1250.0);
    }

    #[test]
    fn supplier_state_never_comes_from_ship_to_state() {
        let csv = indoc! {"
            PO Order Date,Corcentric Supplier Name,Supplier City/State,State,Category,Line Item Subtotal
            2024-01-15,Acme,\"Dallas, TX\",CA,Janitorial,10
        "};
        let (table, _) = load_reader(csv.as_bytes()).unwrap();
        let tx = &table.rows()[0];
        assert_eq!(tx.supplier_state, "TX");
        assert_eq!(tx.ship_to_state.as_deref(), Some("CA"));
    }

    #[test]
    fn optional_columns_are_detected() {
        let csv = indoc! {"
            PO Order Date , Corcentric Supplier Name,Supplier City/State,Category,Line Item Subtotal
            2024-01-15,Acme,\"Dallas, TX\",Janitorial,10
        "};
        let (table, _) = load_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.columns(), Columns::default());
        assert_eq!(table.rows()[0].subcategory, None);
        assert_eq!(table.rows()[0].po_number, None);
    }

    #[test]
    fn missing_required_column_is_a_schema_error() {
        let csv = "Corcentric Supplier Name,Category\nAcme,Janitorial\n";
        let err = load_reader(csv.as_bytes()).unwrap_err();
        match err {
            DashboardError::Schema { missing } => {
                assert!(missing.contains(&"PO Order Date".to_string()));
                assert!(missing.contains(&"Line Item Subtotal".to_string()));
                assert!(missing.contains(&"Supplier City/State".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_source_not_found() {
        let err = load(Path::new("/definitely/not/here/PO_Data.csv")).unwrap_err();
        assert!(matches!(err, DashboardError::SourceNotFound { .. }));
    }
}
