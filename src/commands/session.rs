use crate::models::SessionInfo;
use crate::services::state::AppState;
use tauri::State;

#[tauri::command]
pub async fn get_session(state: State<'_, AppState>) -> Result<SessionInfo, String> {
    state.session_info().map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn login(passphrase: String, state: State<'_, AppState>) -> Result<SessionInfo, String> {
    state.login(&passphrase).map_err(|e| e.to_string())?;
    state.session_info().map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn logout(state: State<'_, AppState>) -> Result<SessionInfo, String> {
    state.logout().map_err(|e| e.to_string())?;
    state.session_info().map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn change_passphrase(passphrase: String, state: State<'_, AppState>) -> Result<(), String> {
    state.change_passphrase(&passphrase).map_err(|e| e.to_string())
}
