pub mod billing;
pub mod designs;
pub mod session;
pub mod settings;
