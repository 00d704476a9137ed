use crate::models::{Bill, ItemField, LedgerEntry};
use crate::services::state::AppState;
use serde::Deserialize;
use tauri::State;

#[derive(Deserialize)]
pub struct UpdateBillItemPayload {
    pub index: usize,
    pub field: ItemField,
    pub value: String,
}

#[tauri::command]
pub async fn get_current_bill(state: State<'_, AppState>) -> Result<Bill, String> {
    state.current_bill().map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn add_bill_item(state: State<'_, AppState>) -> Result<Bill, String> {
    state.add_bill_item().map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn update_bill_item(payload: UpdateBillItemPayload, state: State<'_, AppState>) -> Result<Bill, String> {
    state
        .update_bill_item(payload.index, payload.field, &payload.value)
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn remove_bill_item(index: usize, state: State<'_, AppState>) -> Result<Bill, String> {
    state.remove_bill_item(index).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn set_gst_percentage(value: f64, state: State<'_, AppState>) -> Result<Bill, String> {
    state.set_gst_percentage(value).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn set_customer_name(name: String, state: State<'_, AppState>) -> Result<Bill, String> {
    state.set_customer_name(&name).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn set_bill_date(date: String, state: State<'_, AppState>) -> Result<Bill, String> {
    state.set_bill_date(&date).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn new_bill(state: State<'_, AppState>) -> Result<Bill, String> {
    state.new_bill().map_err(|e| e.to_string())
}

/// Returns the saved bill; the next `get_current_bill` shows a fresh draft.
#[tauri::command]
pub async fn save_bill(state: State<'_, AppState>) -> Result<Bill, String> {
    state.save_bill().map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_saved_bills(state: State<'_, AppState>) -> Result<Vec<Bill>, String> {
    state.saved_bills().map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_bill_ledger(state: State<'_, AppState>) -> Result<Vec<LedgerEntry>, String> {
    state.ledger().map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn export_bill(state: State<'_, AppState>) -> Result<String, String> {
    let path = state
        .export_current_bill()
        .await
        .map_err(|e| e.to_string())?;
    Ok(path.to_string_lossy().to_string())
}

#[tauri::command]
pub async fn open_exported_file(path: String) -> Result<(), String> {
    open::that(path).map_err(|e| e.to_string())?;
    Ok(())
}
