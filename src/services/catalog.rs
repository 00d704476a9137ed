use tracing::info;

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{Design, DesignDraft, Fabric, Material};
use crate::utils::{now_rfc3339, parse_decimal};

/// Source of unit prices for bill items, keyed by design number.
pub trait PriceLookup {
    fn lookup_price(&self, design_number: &str) -> Option<f64>;
}

/// Designs in most-recent-first order, mirrored to the record store on every
/// change.
pub struct DesignCatalog {
    designs: Vec<Design>,
}

impl DesignCatalog {
    pub fn load(db: &Database) -> AppResult<Self> {
        let designs = db.load_designs()?;
        info!(count = designs.len(), "Loaded design catalog");
        Ok(DesignCatalog { designs })
    }

    pub fn list(&self) -> &[Design] {
        &self.designs
    }

    pub fn add(&mut self, db: &Database, draft: DesignDraft) -> AppResult<Design> {
        if draft.design_number.trim().is_empty() || draft.image.trim().is_empty() {
            return Err(AppError::validation("Design number and image are required"));
        }

        let total_price = compute_total_price(&draft.fabrics, &draft.materials)?;
        let design = Design {
            id: uuid::Uuid::new_v4().to_string(),
            design_number: draft.design_number,
            image: draft.image,
            fabrics: draft.fabrics,
            cutting_size: draft.cutting_size,
            materials: draft.materials,
            total_price,
            created_at: now_rfc3339(),
            notes: draft.notes.filter(|notes| !notes.trim().is_empty()),
        };

        let mut next = Vec::with_capacity(self.designs.len() + 1);
        next.push(design.clone());
        next.extend(self.designs.iter().cloned());
        db.save_designs(&next)?;
        self.designs = next;

        info!(design_number = %design.design_number, total_price, "Design added");
        Ok(design)
    }

    /// Returns false when no design has this id.
    pub fn remove(&mut self, db: &Database, id: &str) -> AppResult<bool> {
        let next: Vec<Design> = self
            .designs
            .iter()
            .filter(|design| design.id != id)
            .cloned()
            .collect();
        if next.len() == self.designs.len() {
            return Ok(false);
        }

        db.save_designs(&next)?;
        self.designs = next;
        info!(id, "Design removed");
        Ok(true)
    }

    pub fn search(&self, term: &str) -> Vec<&Design> {
        let needle = term.to_lowercase();
        self.designs
            .iter()
            .filter(|design| design.design_number.to_lowercase().contains(&needle))
            .collect()
    }
}

impl PriceLookup for DesignCatalog {
    fn lookup_price(&self, design_number: &str) -> Option<f64> {
        self.designs
            .iter()
            .find(|design| design.design_number == design_number)
            .map(|design| design.total_price)
    }
}

/// Fabric cost by usage plus flat material prices. Blank usage counts as zero.
pub fn compute_total_price(fabrics: &[Fabric], materials: &[Material]) -> AppResult<f64> {
    let mut total = 0.0;
    for fabric in fabrics {
        if !fabric.price_per_meter.is_finite() {
            return Err(AppError::validation(format!(
                "Invalid price per meter for fabric '{}'",
                fabric.fabric_type
            )));
        }
        let usage = if fabric.usage.trim().is_empty() {
            0.0
        } else {
            parse_decimal(&fabric.usage)?
        };
        total += fabric.price_per_meter * usage;
    }
    for material in materials {
        if !material.price.is_finite() {
            return Err(AppError::validation(format!(
                "Invalid price for material '{}'",
                material.name
            )));
        }
        total += material.price;
    }
    if !total.is_finite() {
        return Err(AppError::validation("Design price is too large"));
    }
    Ok(total)
}
