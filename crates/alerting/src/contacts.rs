//! Emergency contact settings

use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use thiserror::Error;
use tracing::{info, warn};

use crate::sinks::ContactStore;

/// Shortest phone number accepted
pub const MIN_PHONE_LEN: usize = 7;

/// Contact validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContactError {
    #[error("Emergency contact phone number is required")]
    PhoneMissing,

    #[error("Phone number must have at least 7 characters, got {0}")]
    PhoneTooShort(usize),

    #[error("Contact store lock poisoned")]
    Poisoned,
}

/// Driver and emergency contact details
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub contact_name: String,
    pub phone: String,
}

impl EmergencyContact {
    /// Trim fields and check the phone number
    pub fn validated(self) -> Result<Self, ContactError> {
        let contact = Self {
            user_name: self.user_name.trim().to_string(),
            contact_name: self.contact_name.trim().to_string(),
            phone: self.phone.trim().to_string(),
        };

        if contact.phone.is_empty() {
            return Err(ContactError::PhoneMissing);
        }
        let len = contact.phone.chars().count();
        if len < MIN_PHONE_LEN {
            return Err(ContactError::PhoneTooShort(len));
        }
        Ok(contact)
    }
}

/// Settings store kept in memory
#[derive(Debug, Default)]
pub struct InMemoryContactStore {
    contact: RwLock<Option<EmergencyContact>>,
}

impl InMemoryContactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contact(contact: EmergencyContact) -> Result<Self, ContactError> {
        let store = Self::new();
        store.save(contact)?;
        Ok(store)
    }

    /// Validate and store contact details
    pub fn save(&self, contact: EmergencyContact) -> Result<EmergencyContact, ContactError> {
        let contact = match contact.validated() {
            Ok(contact) => contact,
            Err(e) => {
                warn!("Contact save rejected: {}", e);
                return Err(e);
            }
        };

        let mut guard = self.contact.write().map_err(|_| ContactError::Poisoned)?;
        *guard = Some(contact.clone());
        info!("Emergency contact saved");
        Ok(contact)
    }

    pub fn load(&self) -> Option<EmergencyContact> {
        self.contact.read().ok().and_then(|guard| guard.clone())
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.contact.write() {
            *guard = None;
        }
    }
}

impl ContactStore for InMemoryContactStore {
    fn emergency_contact(&self) -> Option<String> {
        self.load().map(|contact| contact.phone)
    }
}
