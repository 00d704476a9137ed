use crate::models::{DesignDraft, DesignListing};
use crate::services::state::AppState;
use tauri::State;

#[tauri::command]
pub async fn get_designs(search: Option<String>, state: State<'_, AppState>) -> Result<Vec<DesignListing>, String> {
    state
        .list_designs(search.as_deref().unwrap_or_default())
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn add_design(payload: DesignDraft, state: State<'_, AppState>) -> Result<DesignListing, String> {
    state.add_design(payload).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn delete_design(design_id: String, state: State<'_, AppState>) -> Result<bool, String> {
    state.delete_design(&design_id).map_err(|e| e.to_string())
}

/// Returns the design number to drop into the catalog search box.
#[tauri::command]
pub async fn recognize_design_number(image_base64: String, state: State<'_, AppState>) -> Result<String, String> {
    state
        .recognize_upload(&image_base64)
        .await
        .map_err(|e| e.to_string())
}
