pub mod access;
pub mod billing;
pub mod catalog;
pub mod export;
pub mod recognizer;
pub mod state;
