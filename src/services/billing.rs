use chrono::Utc;
use tracing::{debug, info};

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{Bill, BillItem, ItemField};
use crate::services::catalog::PriceLookup;
use crate::utils::{normalize_date, now_rfc3339, parse_decimal, parse_quantity, today_iso};

pub const DEFAULT_GST_PERCENTAGE: f64 = 18.0;

/// Owns the draft bill and the bills saved during this session. Every
/// mutation of items or rate ends in a recompute of the bill totals.
pub struct BillingEngine {
    draft: Bill,
    saved: Vec<Bill>,
    default_gst_percentage: f64,
    last_bill_millis: i64,
}

impl BillingEngine {
    pub fn new(default_gst_percentage: f64) -> Self {
        let mut engine = BillingEngine {
            draft: Bill::draft(String::new(), today_iso(), default_gst_percentage),
            saved: Vec::new(),
            default_gst_percentage,
            last_bill_millis: 0,
        };
        engine.new_draft();
        engine
    }

    pub fn draft(&self) -> &Bill {
        &self.draft
    }

    pub fn saved_bills(&self) -> &[Bill] {
        &self.saved
    }

    /// Applies to drafts created after this call.
    pub fn set_default_gst_percentage(&mut self, value: f64) {
        self.default_gst_percentage = value;
    }

    /// Keeps numbering ahead of bills already in the ledger, even when the
    /// clock has gone backwards since they were saved.
    pub fn resume_numbering_after(&mut self, last_millis: i64) {
        if last_millis >= self.last_bill_millis {
            self.last_bill_millis = last_millis;
            self.new_draft();
        }
    }

    pub fn new_draft(&mut self) -> &Bill {
        let bill_number = self.next_bill_number();
        self.draft = Bill::draft(bill_number, today_iso(), self.default_gst_percentage);
        &self.draft
    }

    pub fn add_item(&mut self) -> &Bill {
        self.draft.items.push(BillItem::blank());
        self.draft.recompute();
        &self.draft
    }

    pub fn set_item_field(
        &mut self,
        catalog: &impl PriceLookup,
        index: usize,
        field: ItemField,
        value: &str,
    ) -> AppResult<&Bill> {
        let mut candidate = self.draft.clone();
        let item = candidate
            .items
            .get_mut(index)
            .ok_or_else(|| AppError::validation(format!("No bill item at position {}", index)))?;

        match field {
            ItemField::DesignNumber => {
                // A miss leaves whatever price the operator already entered.
                if let Some(price) = catalog.lookup_price(value) {
                    item.price = price;
                } else {
                    debug!(design_number = value, "No design for bill item");
                }
                item.design_number = value.to_string();
            }
            ItemField::Quantity => {
                item.quantity = parse_quantity(value)?;
            }
            ItemField::Price => {
                let price = parse_decimal(value)?;
                if price < 0.0 {
                    return Err(AppError::validation("Price cannot be negative"));
                }
                item.price = price;
            }
        }

        candidate.recompute();
        self.commit(candidate)
    }

    pub fn remove_item(&mut self, index: usize) -> AppResult<&Bill> {
        if index >= self.draft.items.len() {
            return Err(AppError::validation(format!("No bill item at position {}", index)));
        }
        self.draft.items.remove(index);
        self.draft.recompute();
        Ok(&self.draft)
    }

    /// Leaves items and subtotal untouched.
    pub fn set_gst_percentage(&mut self, value: f64) -> AppResult<&Bill> {
        if !value.is_finite() || value < 0.0 {
            return Err(AppError::validation(format!("Invalid GST percentage {}", value)));
        }
        let mut candidate = self.draft.clone();
        candidate.gst_percentage = value;
        candidate.recompute_tax();
        self.commit(candidate)
    }

    pub fn set_customer_name(&mut self, name: &str) -> &Bill {
        self.draft.customer_name = name.to_string();
        &self.draft
    }

    pub fn set_date(&mut self, date: &str) -> AppResult<&Bill> {
        self.draft.date = normalize_date(date)?;
        Ok(&self.draft)
    }

    /// Writes the draft to the ledger, keeps a copy for the session and starts
    /// a fresh draft. Nothing changes when validation or the write fails.
    pub fn save_draft(&mut self, db: &Database) -> AppResult<Bill> {
        if self.draft.customer_name.trim().is_empty() || self.draft.items.is_empty() {
            return Err(AppError::validation("Customer name and at least one item are required"));
        }

        let bill = self.draft.clone();
        db.append_bill(&bill, &now_rfc3339())?;
        self.saved.push(bill.clone());
        self.new_draft();

        info!(
            bill_number = %bill.bill_number,
            items = bill.items.len(),
            total = bill.total,
            "Bill saved"
        );
        Ok(bill)
    }

    fn commit(&mut self, candidate: Bill) -> AppResult<&Bill> {
        if !candidate.totals_are_finite() {
            return Err(AppError::validation("Bill amounts are too large"));
        }
        self.draft = candidate;
        Ok(&self.draft)
    }

    fn next_bill_number(&mut self) -> String {
        let now = Utc::now().timestamp_millis();
        let millis = now.max(self.last_bill_millis + 1);
        self.last_bill_millis = millis;
        format!("BILL-{}", millis)
    }
}
