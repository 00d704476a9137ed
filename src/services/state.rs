use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::info;

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{Bill, DesignDraft, DesignListing, ItemField, LedgerEntry, SessionInfo, Settings};
use crate::services::access::{AccessGate, Session};
use crate::services::billing::BillingEngine;
use crate::services::catalog::DesignCatalog;
use crate::services::export::{export_bill, BillRenderer};
use crate::services::recognizer::{recognize_design_number, RecognitionFlag, TextRecognizer, UploadedImage};

pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub settings: Arc<Mutex<Settings>>,
    gate: Mutex<AccessGate>,
    catalog: Mutex<DesignCatalog>,
    billing: Mutex<BillingEngine>,
    recognizer: Arc<dyn TextRecognizer>,
    renderer: Arc<dyn BillRenderer>,
    recognition: RecognitionFlag,
    default_export_dir: PathBuf,
}

// Lock order: gate, catalog, billing, settings, db.
fn lock<'a, T>(mutex: &'a Mutex<T>, name: &'static str) -> AppResult<MutexGuard<'a, T>> {
    mutex.lock().map_err(|_| AppError::Lock(name))
}

impl AppState {
    pub fn new(
        db: Database,
        recognizer: Arc<dyn TextRecognizer>,
        renderer: Arc<dyn BillRenderer>,
        default_export_dir: PathBuf,
    ) -> AppResult<Self> {
        let settings = load_settings(&db)?;
        let gate = AccessGate::load(&db)?;
        let catalog = DesignCatalog::load(&db)?;
        let mut billing = BillingEngine::new(settings.default_gst_percentage);
        if let Some(latest) = db.latest_bill_millis()? {
            billing.resume_numbering_after(latest);
        }

        Ok(AppState {
            db: Arc::new(Mutex::new(db)),
            settings: Arc::new(Mutex::new(settings)),
            gate: Mutex::new(gate),
            catalog: Mutex::new(catalog),
            billing: Mutex::new(billing),
            recognizer,
            renderer,
            recognition: RecognitionFlag::default(),
            default_export_dir,
        })
    }

    pub fn session(&self) -> AppResult<Session> {
        Ok(lock(&self.gate, "Gate")?.session())
    }

    pub fn session_info(&self) -> AppResult<SessionInfo> {
        Ok(SessionInfo {
            is_admin: self.session()?.is_admin(),
            recognizing: self.recognition.is_busy(),
        })
    }

    pub fn login(&self, passphrase: &str) -> AppResult<Session> {
        let mut gate = lock(&self.gate, "Gate")?;
        let db = lock(&self.db, "DB")?;
        gate.login(&db, passphrase)
    }

    pub fn logout(&self) -> AppResult<Session> {
        let mut gate = lock(&self.gate, "Gate")?;
        let db = lock(&self.db, "DB")?;
        gate.logout(&db)
    }

    pub fn change_passphrase(&self, passphrase: &str) -> AppResult<()> {
        let mut gate = lock(&self.gate, "Gate")?;
        let session = gate.session();
        let db = lock(&self.db, "DB")?;
        gate.change_passphrase(&db, session, passphrase)
    }

    pub fn list_designs(&self, term: &str) -> AppResult<Vec<DesignListing>> {
        let session = self.session()?;
        let catalog = lock(&self.catalog, "Catalog")?;
        Ok(catalog
            .search(term)
            .into_iter()
            .map(|design| DesignListing::from_design(design, session.is_admin()))
            .collect())
    }

    pub fn add_design(&self, draft: DesignDraft) -> AppResult<DesignListing> {
        self.session()?.require_admin()?;
        let mut catalog = lock(&self.catalog, "Catalog")?;
        let db = lock(&self.db, "DB")?;
        let design = catalog.add(&db, draft)?;
        Ok(DesignListing::from_design(&design, true))
    }

    pub fn delete_design(&self, id: &str) -> AppResult<bool> {
        self.session()?.require_admin()?;
        let mut catalog = lock(&self.catalog, "Catalog")?;
        let db = lock(&self.db, "DB")?;
        catalog.remove(&db, id)
    }

    pub async fn recognize_image(&self, image: PathBuf) -> AppResult<String> {
        let timeout = Duration::from_secs(lock(&self.settings, "Settings")?.recognition_timeout_secs);
        let _busy = self.recognition.begin();
        Ok(recognize_design_number(self.recognizer.clone(), image, timeout).await?)
    }

    pub async fn recognize_upload(&self, image_base64: &str) -> AppResult<String> {
        let upload = UploadedImage::from_base64(image_base64)?;
        self.recognize_image(upload.path().to_path_buf()).await
    }

    pub fn current_bill(&self) -> AppResult<Bill> {
        self.session()?.require_admin()?;
        Ok(lock(&self.billing, "Billing")?.draft().clone())
    }

    pub fn add_bill_item(&self) -> AppResult<Bill> {
        self.session()?.require_admin()?;
        Ok(lock(&self.billing, "Billing")?.add_item().clone())
    }

    pub fn update_bill_item(&self, index: usize, field: ItemField, value: &str) -> AppResult<Bill> {
        self.session()?.require_admin()?;
        let catalog = lock(&self.catalog, "Catalog")?;
        let mut billing = lock(&self.billing, "Billing")?;
        Ok(billing.set_item_field(&*catalog, index, field, value)?.clone())
    }

    pub fn remove_bill_item(&self, index: usize) -> AppResult<Bill> {
        self.session()?.require_admin()?;
        Ok(lock(&self.billing, "Billing")?.remove_item(index)?.clone())
    }

    pub fn set_gst_percentage(&self, value: f64) -> AppResult<Bill> {
        self.session()?.require_admin()?;
        Ok(lock(&self.billing, "Billing")?.set_gst_percentage(value)?.clone())
    }

    pub fn set_customer_name(&self, name: &str) -> AppResult<Bill> {
        self.session()?.require_admin()?;
        Ok(lock(&self.billing, "Billing")?.set_customer_name(name).clone())
    }

    pub fn set_bill_date(&self, date: &str) -> AppResult<Bill> {
        self.session()?.require_admin()?;
        Ok(lock(&self.billing, "Billing")?.set_date(date)?.clone())
    }

    pub fn new_bill(&self) -> AppResult<Bill> {
        self.session()?.require_admin()?;
        Ok(lock(&self.billing, "Billing")?.new_draft().clone())
    }

    pub fn save_bill(&self) -> AppResult<Bill> {
        self.session()?.require_admin()?;
        let mut billing = lock(&self.billing, "Billing")?;
        let db = lock(&self.db, "DB")?;
        billing.save_draft(&db)
    }

    pub fn saved_bills(&self) -> AppResult<Vec<Bill>> {
        self.session()?.require_admin()?;
        Ok(lock(&self.billing, "Billing")?.saved_bills().to_vec())
    }

    pub fn ledger(&self) -> AppResult<Vec<LedgerEntry>> {
        self.session()?.require_admin()?;
        lock(&self.db, "DB")?.get_ledger()
    }

    /// Exports the draft as it is right now; later edits do not affect the
    /// file being written.
    pub async fn export_current_bill(&self) -> AppResult<PathBuf> {
        self.session()?.require_admin()?;
        let snapshot = lock(&self.billing, "Billing")?.draft().clone();
        let (folder, timeout) = {
            let settings = lock(&self.settings, "Settings")?;
            let folder = settings
                .export_folder
                .clone()
                .map(PathBuf::from)
                .unwrap_or_else(|| self.default_export_dir.clone());
            (folder, Duration::from_secs(settings.export_timeout_secs))
        };
        Ok(export_bill(self.renderer.clone(), snapshot, folder, timeout).await?)
    }

    pub fn get_settings(&self) -> AppResult<Settings> {
        Ok(lock(&self.settings, "Settings")?.clone())
    }

    pub fn update_settings(&self, settings: Settings) -> AppResult<()> {
        self.session()?.require_admin()?;
        validate_settings(&settings)?;
        let mut billing = lock(&self.billing, "Billing")?;
        let mut current = lock(&self.settings, "Settings")?;
        {
            let db = lock(&self.db, "DB")?;
            store_settings(&db, &settings)?;
        }
        billing.set_default_gst_percentage(settings.default_gst_percentage);
        *current = settings;
        info!("Settings updated");
        Ok(())
    }
}

pub fn load_settings(db: &Database) -> AppResult<Settings> {
    let defaults = Settings::default();
    let export_folder = db.get_setting("export_folder")?;
    let ocr_language = db
        .get_setting("ocr_language")?
        .unwrap_or(defaults.ocr_language);
    let default_gst_percentage = db
        .get_setting("default_gst_percentage")?
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite() && *value >= 0.0)
        .unwrap_or(defaults.default_gst_percentage);
    let recognition_timeout_secs = db
        .get_setting("recognition_timeout_secs")?
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(defaults.recognition_timeout_secs);
    let export_timeout_secs = db
        .get_setting("export_timeout_secs")?
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(defaults.export_timeout_secs);

    Ok(Settings {
        export_folder,
        ocr_language,
        default_gst_percentage,
        recognition_timeout_secs,
        export_timeout_secs,
    })
}

fn store_settings(db: &Database, settings: &Settings) -> AppResult<()> {
    match settings.export_folder.as_deref().map(str::trim) {
        Some(folder) if !folder.is_empty() => db.set_setting("export_folder", folder)?,
        _ => db.delete_setting("export_folder")?,
    }
    db.set_setting("ocr_language", &settings.ocr_language)?;
    db.set_setting(
        "default_gst_percentage",
        &settings.default_gst_percentage.to_string(),
    )?;
    db.set_setting(
        "recognition_timeout_secs",
        &settings.recognition_timeout_secs.to_string(),
    )?;
    db.set_setting("export_timeout_secs", &settings.export_timeout_secs.to_string())?;
    Ok(())
}

fn validate_settings(settings: &Settings) -> AppResult<()> {
    if !settings.default_gst_percentage.is_finite() || settings.default_gst_percentage < 0.0 {
        return Err(AppError::validation("Default GST percentage must be zero or more"));
    }
    if settings.ocr_language.trim().is_empty() {
        return Err(AppError::validation("OCR language is required"));
    }
    if settings.recognition_timeout_secs == 0 || settings.export_timeout_secs == 0 {
        return Err(AppError::validation("Timeouts must be at least one second"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::export::PdfRenderer;
    use crate::services::recognizer::SheetRecognizer;

    fn state() -> AppState {
        AppState::new(
            Database::in_memory().unwrap(),
            Arc::new(SheetRecognizer::new("eng")),
            Arc::new(PdfRenderer),
            std::env::temp_dir(),
        )
        .unwrap()
    }

    #[test]
    fn settings_default_when_store_is_empty() {
        let db = Database::in_memory().unwrap();
        assert_eq!(load_settings(&db).unwrap(), Settings::default());
    }

    #[test]
    fn settings_round_trip_through_store() {
        let db = Database::in_memory().unwrap();
        let settings = Settings {
            export_folder: Some("/tmp/bills".to_string()),
            ocr_language: "hin".to_string(),
            default_gst_percentage: 12.0,
            recognition_timeout_secs: 5,
            export_timeout_secs: 7,
        };
        store_settings(&db, &settings).unwrap();
        assert_eq!(load_settings(&db).unwrap(), settings);
    }

    #[test]
    fn garbage_settings_fall_back_to_defaults() {
        let db = Database::in_memory().unwrap();
        db.set_setting("default_gst_percentage", "lots").unwrap();
        db.set_setting("export_timeout_secs", "0").unwrap();
        let settings = load_settings(&db).unwrap();
        assert_eq!(settings.default_gst_percentage, 18.0);
        assert_eq!(settings.export_timeout_secs, 30);
    }

    #[test]
    fn guests_cannot_mutate() {
        let state = state();
        assert!(matches!(state.add_bill_item(), Err(AppError::AccessDenied)));
        assert!(matches!(
            state.add_design(DesignDraft::default()),
            Err(AppError::AccessDenied)
        ));
        assert!(matches!(state.delete_design("x"), Err(AppError::AccessDenied)));
        assert!(matches!(
            state.update_settings(Settings::default()),
            Err(AppError::AccessDenied)
        ));
        assert!(state.list_designs("").unwrap().is_empty());
    }

    #[test]
    fn settings_update_changes_default_rate_for_next_draft() {
        let state = state();
        state.login("admin123").unwrap();
        let mut settings = state.get_settings().unwrap();
        settings.default_gst_percentage = 5.0;
        state.update_settings(settings).unwrap();

        assert_eq!(state.current_bill().unwrap().gst_percentage(), 18.0);
        assert_eq!(state.new_bill().unwrap().gst_percentage(), 5.0);

        let mut bad = state.get_settings().unwrap();
        bad.export_timeout_secs = 0;
        assert!(matches!(state.update_settings(bad), Err(AppError::Validation(_))));
    }

    #[test]
    fn session_info_reports_admin() {
        let state = state();
        assert!(!state.session_info().unwrap().is_admin);
        state.login("admin123").unwrap();
        let info = state.session_info().unwrap();
        assert!(info.is_admin);
        assert!(!info.recognizing);
        state.logout().unwrap();
        assert!(!state.session_info().unwrap().is_admin);
    }
}
