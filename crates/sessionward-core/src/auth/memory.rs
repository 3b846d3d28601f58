use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};

use super::{TokenBackend, TokenSlot};

/// Process-local token backend. Tokens are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    slots: Mutex<HashMap<TokenSlot, String>>,
}

impl TokenBackend for MemoryBackend {
    fn read(&self, slot: TokenSlot) -> Result<Option<String>> {
        let slots = self.slots.lock().map_err(|_| anyhow!("token slots poisoned"))?;
        Ok(slots.get(&slot).cloned())
    }

    fn write(&self, slot: TokenSlot, value: &str) -> Result<()> {
        let mut slots = self.slots.lock().map_err(|_| anyhow!("token slots poisoned"))?;
        slots.insert(slot, value.to_string());
        Ok(())
    }

    fn remove(&self, slot: TokenSlot) -> Result<()> {
        let mut slots = self.slots.lock().map_err(|_| anyhow!("token slots poisoned"))?;
        slots.remove(&slot);
        Ok(())
    }
}
