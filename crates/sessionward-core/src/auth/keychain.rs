use anyhow::{Context, Result};
use keyring::Entry;

use super::{TokenBackend, TokenSlot};

/// Default keychain service name
pub const SERVICE_NAME: &str = "sessionward";

/// Token backend storing each slot as its own OS keychain entry.
pub struct KeyringBackend {
    service: String,
}

impl KeyringBackend {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, slot: TokenSlot) -> Result<Entry> {
        Entry::new(&self.service, slot.key()).context("Failed to create keyring entry")
    }
}

impl Default for KeyringBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenBackend for KeyringBackend {
    fn read(&self, slot: TokenSlot) -> Result<Option<String>> {
        match self.entry(slot)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve token from keychain"),
        }
    }

    fn write(&self, slot: TokenSlot, value: &str) -> Result<()> {
        self.entry(slot)?
            .set_password(value)
            .context("Failed to store token in keychain")
    }

    fn remove(&self, slot: TokenSlot) -> Result<()> {
        match self.entry(slot)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}
