// Builders shared by the unit tests.
use crate::schema::Transaction;
use chrono::NaiveDate;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Undated line item with a known supplier state.
pub fn tx(supplier: &str, category: &str, supplier_state: &str, amount: f64) -> Transaction {
    Transaction {
        po_number: None,
        order_date: None,
        supplier: supplier.to_string(),
        supplier_city_state: format!("Somewhere, {}", supplier_state),
        supplier_city: Some("Somewhere".to_string()),
        supplier_state: supplier_state.to_string(),
        ship_to_state: None,
        category: category.to_string(),
        subcategory: None,
        amount: Some(amount),
        po_status: None,
    }
}

impl Transaction {
    pub fn dated(mut self, y: i32, m: u32, d: u32) -> Self {
        self.order_date = Some(date(y, m, d));
        self
    }

    pub fn status(mut self, s: &str) -> Self {
        self.po_status = Some(s.to_string());
        self
    }

    pub fn subcat(mut self, s: &str) -> Self {
        self.subcategory = Some(s.to_string());
        self
    }

    pub fn ship_to(mut self, s: &str) -> Self {
        self.ship_to_state = Some(s.to_string());
        self
    }

    pub fn po(mut self, s: &str) -> Self {
        self.po_number = Some(s.to_string());
        self
    }

    pub fn without_amount(mut self) -> Self {
        self.amount = None;
        self
    }
}
