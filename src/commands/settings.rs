use crate::models::Settings;
use crate::services::state::AppState;
use tauri::State;

#[tauri::command]
pub async fn get_settings(state: State<'_, AppState>) -> Result<Settings, String> {
    state.get_settings().map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn save_settings(payload: Settings, state: State<'_, AppState>) -> Result<(), String> {
    state.update_settings(payload).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn pick_folder() -> Result<Option<String>, String> {
    let selection = rfd::FileDialog::new()
        .pick_folder()
        .map(|path| path.to_string_lossy().to_string());
    Ok(selection)
}
