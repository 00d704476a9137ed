use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fabric {
    #[serde(rename = "type")]
    pub fabric_type: String,
    /// Metres of fabric, kept as entered.
    pub usage: String,
    pub price_per_meter: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub quantity: String,
    pub price: f64,
}

/// A catalog record. `total_price` is the cost snapshot taken when the design
/// was added; it is never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Design {
    pub id: String,
    pub design_number: String,
    pub image: String,
    pub fabrics: Vec<Fabric>,
    #[serde(default)]
    pub cutting_size: String,
    pub materials: Vec<Material>,
    pub total_price: f64,
    pub created_at: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Form input for a new design.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DesignDraft {
    pub design_number: String,
    pub image: String,
    #[serde(default)]
    pub fabrics: Vec<Fabric>,
    #[serde(default)]
    pub cutting_size: String,
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A design as shown in the catalog list. The price is only visible to admins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignListing {
    pub id: String,
    pub design_number: String,
    pub image: String,
    pub fabrics: Vec<Fabric>,
    pub cutting_size: String,
    pub materials: Vec<Material>,
    pub total_price: Option<f64>,
    pub created_at: String,
    pub notes: Option<String>,
}

impl DesignListing {
    pub fn from_design(design: &Design, show_price: bool) -> Self {
        DesignListing {
            id: design.id.clone(),
            design_number: design.design_number.clone(),
            image: design.image.clone(),
            fabrics: design.fabrics.clone(),
            cutting_size: design.cutting_size.clone(),
            materials: design.materials.clone(),
            total_price: show_price.then_some(design.total_price),
            created_at: design.created_at.clone(),
            notes: design.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillItem {
    pub(crate) id: String,
    pub(crate) design_number: String,
    pub(crate) quantity: u32,
    pub(crate) price: f64,
    pub(crate) amount: f64,
}

impl BillItem {
    pub(crate) fn blank() -> Self {
        BillItem {
            id: uuid::Uuid::new_v4().to_string(),
            design_number: String::new(),
            quantity: 1,
            price: 0.0,
            amount: 0.0,
        }
    }

    pub(crate) fn recompute_amount(&mut self) {
        self.amount = f64::from(self.quantity) * self.price;
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn design_number(&self) -> &str {
        &self.design_number
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }
}

/// An invoice. `subtotal`, `gst_amount` and `total` are a cache over `items`
/// and `gst_percentage`, refreshed by `recompute` after every mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub(crate) bill_number: String,
    pub(crate) date: String,
    pub(crate) customer_name: String,
    pub(crate) items: Vec<BillItem>,
    pub(crate) gst_percentage: f64,
    pub(crate) subtotal: f64,
    pub(crate) gst_amount: f64,
    pub(crate) total: f64,
}

impl Bill {
    pub(crate) fn draft(bill_number: String, date: String, gst_percentage: f64) -> Self {
        Bill {
            bill_number,
            date,
            customer_name: String::new(),
            items: Vec::new(),
            gst_percentage,
            subtotal: 0.0,
            gst_amount: 0.0,
            total: 0.0,
        }
    }

    /// Full re-sum over every item.
    pub(crate) fn recompute(&mut self) {
        for item in self.items.iter_mut() {
            item.recompute_amount();
        }
        self.subtotal = self.items.iter().map(|item| item.amount).sum();
        self.recompute_tax();
    }

    pub(crate) fn recompute_tax(&mut self) {
        self.gst_amount = self.subtotal * self.gst_percentage / 100.0;
        self.total = self.subtotal + self.gst_amount;
    }

    /// False once any amount or total has overflowed to infinity or NaN.
    pub(crate) fn totals_are_finite(&self) -> bool {
        self.items.iter().all(|item| item.amount.is_finite())
            && self.subtotal.is_finite()
            && self.gst_amount.is_finite()
            && self.total.is_finite()
    }

    pub fn bill_number(&self) -> &str {
        &self.bill_number
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn items(&self) -> &[BillItem] {
        &self.items
    }

    pub fn gst_percentage(&self) -> f64 {
        self.gst_percentage
    }

    pub fn subtotal(&self) -> f64 {
        self.subtotal
    }

    pub fn gst_amount(&self) -> f64 {
        self.gst_amount
    }

    pub fn total(&self) -> f64 {
        self.total
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemField {
    DesignNumber,
    Quantity,
    Price,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub bill: Bill,
    pub saved_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub export_folder: Option<String>,
    pub ocr_language: String,
    pub default_gst_percentage: f64,
    pub recognition_timeout_secs: u64,
    pub export_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            export_folder: None,
            ocr_language: "eng".to_string(),
            default_gst_percentage: crate::services::billing::DEFAULT_GST_PERCENTAGE,
            recognition_timeout_secs: 30,
            export_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub is_admin: bool,
    pub recognizing: bool,
}
