use std::path::Path;
use std::sync::Arc;

use stitchbook::db::Database;
use stitchbook::models::{DesignDraft, Fabric, ItemField, Material};
use stitchbook::services::export::PdfRenderer;
use stitchbook::services::recognizer::TextRecognizer;
use stitchbook::services::state::AppState;
use stitchbook::{AppError, RecognitionError};

struct LabelReader(&'static str);

impl TextRecognizer for LabelReader {
    fn recognize(&self, _path: &Path) -> Result<String, RecognitionError> {
        Ok(self.0.to_string())
    }
}

fn open_state(dir: &Path, label: &'static str) -> AppState {
    let db = Database::new(dir.join("stitchbook.sqlite")).unwrap();
    AppState::new(
        db,
        Arc::new(LabelReader(label)),
        Arc::new(PdfRenderer),
        dir.join("exports"),
    )
    .unwrap()
}

fn design(number: &str, usage: &str, price_per_meter: f64, trim: f64) -> DesignDraft {
    DesignDraft {
        design_number: number.to_string(),
        image: format!("https://img.example/{}.jpg", number),
        fabrics: vec![Fabric {
            fabric_type: "Silk".to_string(),
            usage: usage.to_string(),
            price_per_meter,
        }],
        cutting_size: "40".to_string(),
        materials: vec![Material {
            name: "Lace".to_string(),
            quantity: "1 roll".to_string(),
            price: trim,
        }],
        notes: None,
    }
}

#[test]
fn catalog_to_bill_to_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let state = open_state(dir.path(), "");
    state.login("admin123").unwrap();

    state.add_design(design("452", "1.5", 45.0, 8.0)).unwrap();
    state.add_design(design("ABC-7", "2", 10.0, 0.0)).unwrap();

    let bill = state.set_customer_name("Kavya").unwrap();
    assert!(bill.items().is_empty());
    state.add_bill_item().unwrap();
    state.add_bill_item().unwrap();
    state
        .update_bill_item(0, ItemField::DesignNumber, "452")
        .unwrap();
    state.update_bill_item(0, ItemField::Quantity, "2").unwrap();
    let bill = state
        .update_bill_item(1, ItemField::DesignNumber, "ABC-7")
        .unwrap();

    assert_eq!(bill.items()[0].price(), 75.5);
    assert_eq!(bill.items()[0].amount(), 151.0);
    assert_eq!(bill.items()[1].price(), 20.0);
    assert!((bill.subtotal() - 171.0).abs() < 1e-9);
    assert!((bill.gst_amount() - 30.78).abs() < 1e-9);
    assert!((bill.total() - 201.78).abs() < 1e-9);

    let saved = state.save_bill().unwrap();
    assert_eq!(state.saved_bills().unwrap(), vec![saved.clone()]);
    assert!(state.current_bill().unwrap().items().is_empty());
    drop(state);

    let reopened = open_state(dir.path(), "");
    assert!(reopened.session().unwrap().is_admin());
    let millis = |number: &str| number.trim_start_matches("BILL-").parse::<i64>().unwrap();
    assert!(millis(reopened.current_bill().unwrap().bill_number()) > millis(saved.bill_number()));
    let numbers: Vec<String> = reopened
        .list_designs("")
        .unwrap()
        .into_iter()
        .map(|d| d.design_number)
        .collect();
    assert_eq!(numbers, vec!["ABC-7", "452"]);
    assert!(reopened.saved_bills().unwrap().is_empty());

    let ledger = reopened.ledger().unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].bill, saved);
}

#[test]
fn guests_see_designs_without_prices() {
    let dir = tempfile::tempdir().unwrap();
    let state = open_state(dir.path(), "");
    state.login("admin123").unwrap();
    state.add_design(design("abc-1", "1", 10.0, 2.0)).unwrap();
    state.logout().unwrap();

    let listings = state.list_designs("ABC").unwrap();
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].total_price, None);
    assert!(matches!(state.current_bill(), Err(AppError::AccessDenied)));

    state.login("admin123").unwrap();
    assert_eq!(state.list_designs("abc").unwrap()[0].total_price, Some(12.0));
}

#[test]
fn deleted_design_does_not_touch_existing_items() {
    let dir = tempfile::tempdir().unwrap();
    let state = open_state(dir.path(), "");
    state.login("admin123").unwrap();
    let listing = state.add_design(design("452", "1", 50.0, 0.0)).unwrap();

    state.add_bill_item().unwrap();
    state
        .update_bill_item(0, ItemField::DesignNumber, "452")
        .unwrap();
    assert!(state.delete_design(&listing.id).unwrap());

    let bill = state.current_bill().unwrap();
    assert_eq!(bill.items()[0].price(), 50.0);

    let bill = state.update_bill_item(0, ItemField::DesignNumber, "452").unwrap();
    assert_eq!(bill.items()[0].price(), 50.0);
    let bill = state.update_bill_item(0, ItemField::Quantity, "3").unwrap();
    assert_eq!(bill.subtotal(), 150.0);
}

#[tokio::test]
async fn recognized_number_seeds_search() {
    let dir = tempfile::tempdir().unwrap();
    let state = open_state(dir.path(), "Tag: D.No 452 Blue Silk");
    state.login("admin123").unwrap();
    state.add_design(design("452", "1", 10.0, 0.0)).unwrap();
    state.add_design(design("777", "1", 10.0, 0.0)).unwrap();

    let number = state.recognize_upload("aGVsbG8=").await.unwrap();
    assert_eq!(number, "452");
    let hits = state.list_designs(&number).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].design_number, "452");
    assert!(!state.session_info().unwrap().recognizing);
}

#[tokio::test]
async fn unreadable_label_reports_no_design_number() {
    let dir = tempfile::tempdir().unwrap();
    let state = open_state(dir.path(), "Blue Silk");
    let result = state.recognize_upload("aGVsbG8=").await;
    assert!(matches!(
        result,
        Err(AppError::Recognition(RecognitionError::NoDesignNumber))
    ));
}

#[tokio::test]
async fn export_leaves_draft_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let state = open_state(dir.path(), "");
    state.login("admin123").unwrap();
    state.set_customer_name("Kavya").unwrap();
    state.add_bill_item().unwrap();
    state.update_bill_item(0, ItemField::Price, "99.99").unwrap();
    let before = state.current_bill().unwrap();

    let path = state.export_current_bill().await.unwrap();
    assert_eq!(
        path,
        dir.path()
            .join("exports")
            .join(format!("{}.pdf", before.bill_number()))
    );
    assert!(path.exists());
    assert_eq!(state.current_bill().unwrap(), before);
}
