use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::db::{Database, ADMIN_FLAG_KEY};
use crate::error::{AppError, AppResult};
use crate::utils::sha256_hex;

pub const ADMIN_PASSPHRASE_KEY: &str = "admin_passphrase_sha256";
const DEFAULT_ADMIN_PASSPHRASE: &str = "admin123";

/// Who is calling, resolved once per request and passed to anything that
/// needs to know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    is_admin: bool,
}

impl Session {
    pub fn guest() -> Self {
        Session { is_admin: false }
    }

    #[cfg(test)]
    pub(crate) fn admin() -> Self {
        Session { is_admin: true }
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AppError::AccessDenied)
        }
    }
}

/// Shared-passphrase gate. Only decides which affordances the UI offers.
pub struct AccessGate {
    passphrase_digest: String,
    is_admin: bool,
}

impl AccessGate {
    pub fn load(db: &Database) -> AppResult<Self> {
        let passphrase_digest = db
            .get_setting(ADMIN_PASSPHRASE_KEY)?
            .unwrap_or_else(|| sha256_hex(DEFAULT_ADMIN_PASSPHRASE));
        let is_admin = db.get_setting(ADMIN_FLAG_KEY)?.as_deref() == Some("true");
        Ok(AccessGate {
            passphrase_digest,
            is_admin,
        })
    }

    pub fn session(&self) -> Session {
        Session {
            is_admin: self.is_admin,
        }
    }

    pub fn login(&mut self, db: &Database, passphrase: &str) -> AppResult<Session> {
        if sha256_hex(passphrase) != self.passphrase_digest {
            warn!("Rejected admin login");
            return Err(AppError::AccessDenied);
        }
        db.set_setting(ADMIN_FLAG_KEY, "true")?;
        self.is_admin = true;
        info!("Admin logged in");
        Ok(self.session())
    }

    pub fn logout(&mut self, db: &Database) -> AppResult<Session> {
        db.delete_setting(ADMIN_FLAG_KEY)?;
        self.is_admin = false;
        info!("Admin logged out");
        Ok(self.session())
    }

    /// Stores only the digest of the new passphrase.
    pub fn change_passphrase(&mut self, db: &Database, session: Session, passphrase: &str) -> AppResult<()> {
        session.require_admin()?;
        if passphrase.trim().is_empty() {
            return Err(AppError::validation("Passphrase cannot be empty"));
        }
        let digest = sha256_hex(passphrase);
        db.set_setting(ADMIN_PASSPHRASE_KEY, &digest)?;
        self.passphrase_digest = digest;
        Ok(())
    }
}
