use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use tracing::{debug, warn};

use super::domain::ApplicantId;

/// Warning surfaced when a name is already registered to an applicant id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("applicant '{name}' is already registered as {existing_id}")]
pub struct DuplicateRegistration {
    pub name: String,
    pub existing_id: ApplicantId,
}

/// Result of asking the registry for an applicant id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Issued(ApplicantId),
    Existing(DuplicateRegistration),
}

impl Registration {
    pub fn applicant_id(&self) -> &ApplicantId {
        match self {
            Registration::Issued(id) => id,
            Registration::Existing(duplicate) => &duplicate.existing_id,
        }
    }
}

/// Process-wide `name -> applicant_id` registry shared by all sessions.
///
/// Names are compared case-insensitively with whitespace runs collapsed, and every
/// check-then-insert happens under a single lock.
#[derive(Debug, Default)]
pub struct ApplicantRegistry {
    entries: Mutex<HashMap<String, ApplicantId>>,
}

fn registry_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl ApplicantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh id for an unseen name, or return the existing one with a warning.
    pub fn register(&self, name: &str) -> Registration {
        let key = registry_key(name);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(&key) {
            Some(existing) => {
                warn!(applicant_id = %existing, "duplicate applicant registration");
                Registration::Existing(DuplicateRegistration {
                    name: name.to_string(),
                    existing_id: existing.clone(),
                })
            }
            None => {
                let id = ApplicantId::issue();
                debug!(applicant_id = %id, "issued applicant id");
                entries.insert(key, id.clone());
                Registration::Issued(id)
            }
        }
    }

    /// Bind a name to an id already held by a session.
    ///
    /// Fails when the name belongs to a different applicant; the registry is left unchanged.
    pub fn bind(&self, name: &str, id: &ApplicantId) -> Result<(), DuplicateRegistration> {
        let key = registry_key(name);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(&key) {
            Some(existing) if existing != id => Err(DuplicateRegistration {
                name: name.to_string(),
                existing_id: existing.clone(),
            }),
            Some(_) => Ok(()),
            None => {
                entries.insert(key, id.clone());
                Ok(())
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<ApplicantId> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(&registry_key(name)).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
