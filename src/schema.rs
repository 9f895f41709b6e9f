// Column contract of the purchase-order export and the typed records the
// rest of the crate works on.
//
// Column names are only spelled out here. Everything downstream of the
// loader reads fields of `Transaction`, never strings.
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const SUPPLIER_COLUMN: &str = "Corcentric Supplier Name";
pub const CATEGORY_COLUMN: &str = "Category";
pub const SUBCATEGORY_COLUMN: &str = "SubCategory";
pub const DATE_COLUMN: &str = "PO Order Date";
pub const AMOUNT_COLUMN: &str = "Line Item Subtotal";
pub const SHIP_TO_STATE_COLUMN: &str = "State";
pub const SUPPLIER_LOCATION_COLUMN: &str = "Supplier City/State";
pub const PO_NUMBER_COLUMN: &str = "VSTX PO #";
pub const PO_STATUS_COLUMN: &str = "PO Status";

pub const REQUIRED_COLUMNS: [&str; 5] = [
    SUPPLIER_COLUMN,
    CATEGORY_COLUMN,
    DATE_COLUMN,
    AMOUNT_COLUMN,
    SUPPLIER_LOCATION_COLUMN,
];

/// Sentinel for a supplier location that does not resolve to a known code.
pub const UNKNOWN_STATE: &str = "Unknown";
pub const UNKNOWN_SUPPLIER: &str = "Unknown Supplier";
pub const UNCATEGORIZED: &str = "Uncategorized";

/// One CSV row as it appears on disk. Optional columns default to `None`
/// when the header is absent.
#[derive(Debug, Deserialize)]
pub struct RawRow {
    #[serde(rename = "Corcentric Supplier Name")]
    pub supplier: Option<String>,
    #[serde(rename = "Category")]
    pub category: Option<String>,
    #[serde(rename = "SubCategory", default)]
    pub subcategory: Option<String>,
    #[serde(rename = "PO Order Date")]
    pub order_date: Option<String>,
    #[serde(rename = "Line Item Subtotal")]
    pub amount: Option<String>,
    #[serde(rename = "State", default)]
    pub ship_to_state: Option<String>,
    #[serde(rename = "Supplier City/State")]
    pub supplier_city_state: Option<String>,
    #[serde(rename = "VSTX PO #", default)]
    pub po_number: Option<String>,
    #[serde(rename = "PO Status", default)]
    pub po_status: Option<String>,
}

/// One purchase-order line after cleaning.
///
/// `order_date` and `amount` stay `None` when the source value did not
/// parse; such rows are kept and counted in the quality report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub po_number: Option<String>,
    pub order_date: Option<NaiveDate>,
    pub supplier: String,
    pub supplier_city_state: String,
    pub supplier_city: Option<String>,
    /// Where the vendor is located. Derived from `supplier_city_state`.
    pub supplier_state: String,
    /// Where the goods were delivered. Never used for supplier geography.
    pub ship_to_state: Option<String>,
    pub category: String,
    pub subcategory: Option<String>,
    pub amount: Option<f64>,
    pub po_status: Option<String>,
}

impl Transaction {
    /// Amount contributed to spend sums; unparseable amounts count as zero.
    pub fn spend(&self) -> f64 {
        self.amount.unwrap_or(0.0)
    }

    pub fn has_known_supplier_state(&self) -> bool {
        self.supplier_state != UNKNOWN_STATE
    }
}

/// Which optional columns were present in the source header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Columns {
    pub subcategory: bool,
    pub ship_to_state: bool,
    pub po_number: bool,
    pub po_status: bool,
}

impl Columns {
    pub const ALL: Columns = Columns {
        subcategory: true,
        ship_to_state: true,
        po_number: true,
        po_status: true,
    };
}

/// Immutable set of transactions. Filtering builds a new `Table`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    rows: Vec<Transaction>,
    columns: Columns,
}

impl Table {
    pub fn new(rows: Vec<Transaction>, columns: Columns) -> Table {
        Table { rows, columns }
    }

    pub fn rows(&self) -> &[Transaction] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Transaction> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> Columns {
        self.columns
    }

    /// Sum of all valid amounts.
    pub fn total_spend(&self) -> f64 {
        self.rows.iter().map(Transaction::spend).sum()
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a Transaction;
    type IntoIter = std::slice::Iter<'a, Transaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Two-letter codes for US states, DC and the inhabited territories.
pub static STATE_NAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("AL", "Alabama"), ("AK", "Alaska"), ("AZ", "Arizona"), ("AR", "Arkansas"),
        ("CA", "California"), ("CO", "Colorado"), ("CT", "Connecticut"), ("DE", "Delaware"),
        ("FL", "Florida"), ("GA", "Georgia"), ("HI", "Hawaii"), ("ID", "Idaho"),
        ("IL", "Illinois"), ("IN", "Indiana"), ("IA", "Iowa"), ("KS", "Kansas"),
        ("KY", "Kentucky"), ("LA", "Louisiana"), ("ME", "Maine"), ("MD", "Maryland"),
        ("MA", "Massachusetts"), ("MI", "Michigan"), ("MN", "Minnesota"), ("MS", "Mississippi"),
        ("MO", "Missouri"), ("MT", "Montana"), ("NE", "Nebraska"), ("NV", "Nevada"),
        ("NH", "New Hampshire"), ("NJ", "New Jersey"), ("NM", "New Mexico"), ("NY", "New York"),
        ("NC", "North Carolina"), ("ND", "North Dakota"), ("OH", "Ohio"), ("OK", "Oklahoma"),
        ("OR", "Oregon"), ("PA", "Pennsylvania"), ("RI", "Rhode Island"), ("SC", "South Carolina"),
        ("SD", "South Dakota"), ("TN", "Tennessee"), ("TX", "Texas"), ("UT", "Utah"),
        ("VT", "Vermont"), ("VA", "Virginia"), ("WA", "Washington"), ("WV", "West Virginia"),
        ("WI", "Wisconsin"), ("WY", "Wyoming"), ("DC", "District of Columbia"),
        ("PR", "Puerto Rico"), ("GU", "Guam"), ("VI", "U.S. Virgin Islands"),
        ("AS", "American Samoa"), ("MP", "Northern Mariana Islands"),
    ]
    .into_iter()
    .collect()
});

/// Upper-cased full name -> code.
static STATE_CODES_BY_NAME: Lazy<HashMap<String, &'static str>> = Lazy::new(|| {
    STATE_NAMES
        .iter()
        .map(|(code, name)| (name.to_uppercase(), *code))
        .collect()
});

/// Resolve a free-form state token ("ca", "Texas", "TX 78701") to its code.
pub fn normalize_state(token: &str) -> Option<&'static str> {
    let upper = token.trim().trim_end_matches('.').to_uppercase();
    if upper.is_empty() {
        return None;
    }
    if let Some((code, _)) = STATE_NAMES.get_key_value(upper.as_str()) {
        return Some(*code);
    }
    if let Some(code) = STATE_CODES_BY_NAME.get(&upper) {
        return Some(*code);
    }
    // "TX 78701" or "New York 10001": drop a trailing ZIP and retry.
    let without_zip: Vec<&str> = upper
        .split_whitespace()
        .filter(|w| !w.chars().all(|c| c.is_ascii_digit() || c == '-'))
        .collect();
    if without_zip.len() < upper.split_whitespace().count() {
        let joined = without_zip.join(" ");
        if let Some((code, _)) = STATE_NAMES.get_key_value(joined.as_str()) {
            return Some(*code);
        }
        return STATE_CODES_BY_NAME.get(&joined).copied();
    }
    None
}

/// US Census region of a supplier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Region {
    Northeast,
    Midwest,
    South,
    West,
    Other,
}

impl Region {
    pub fn of(state: &str) -> Region {
        match state {
            "CT" | "ME" | "MA" | "NH" | "RI" | "VT" | "NJ" | "NY" | "PA" => Region::Northeast,
            "IL" | "IN" | "MI" | "OH" | "WI" | "IA" | "KS" | "MN" | "MO" | "NE" | "ND" | "SD" => {
                Region::Midwest
            }
            "DE" | "FL" | "GA" | "MD" | "NC" | "SC" | "VA" | "WV" | "AL" | "KY" | "MS" | "TN"
            | "AR" | "LA" | "OK" | "TX" => Region::South,
            "AZ" | "CO" | "ID" | "MT" | "NV" | "NM" | "UT" | "WY" | "AK" | "CA" | "HI" | "OR"
            | "WA" => Region::West,
            _ => Region::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Region::Northeast => "Northeast",
            Region::Midwest => "Midwest",
            Region::South => "South",
            Region::West => "West",
            Region::Other => "Other",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
