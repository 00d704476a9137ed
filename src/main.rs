#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use std::sync::Arc;

use anyhow::anyhow;
use tauri::Manager;

use stitchbook::commands;
use stitchbook::db::Database;
use stitchbook::services::export::PdfRenderer;
use stitchbook::services::recognizer::SheetRecognizer;
use stitchbook::services::state::{load_settings, AppState};

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    tauri::Builder::default()
        .setup(|app| {
            let app_data_dir = app
                .path()
                .app_data_dir()
                .map_err(|e| anyhow!("App data dir: {}", e))?;
            std::fs::create_dir_all(&app_data_dir)?;

            let db_path = app_data_dir.join("stitchbook.sqlite");
            let db = Database::new(db_path)?;
            let settings = load_settings(&db)?;
            tracing::info!(path = %app_data_dir.display(), "Opened record store");

            let state = AppState::new(
                db,
                Arc::new(SheetRecognizer::new(settings.ocr_language)),
                Arc::new(PdfRenderer),
                app_data_dir.join("exports"),
            )?;
            app.manage(state);
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::session::get_session,
            commands::session::login,
            commands::session::logout,
            commands::session::change_passphrase,
            commands::designs::get_designs,
            commands::designs::add_design,
            commands::designs::delete_design,
            commands::designs::recognize_design_number,
            commands::billing::get_current_bill,
            commands::billing::add_bill_item,
            commands::billing::update_bill_item,
            commands::billing::remove_bill_item,
            commands::billing::set_gst_percentage,
            commands::billing::set_customer_name,
            commands::billing::set_bill_date,
            commands::billing::new_bill,
            commands::billing::save_bill,
            commands::billing::get_saved_bills,
            commands::billing::get_bill_ledger,
            commands::billing::export_bill,
            commands::billing::open_exported_file,
            commands::settings::get_settings,
            commands::settings::save_settings,
            commands::settings::pick_folder,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
