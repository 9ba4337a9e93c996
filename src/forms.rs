use std::{collections::HashMap, sync::Mutex, time::Duration};

use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::{commands::Notify, issue::Repository};

const CUSTOM_ID_PREFIX: &str = "createissue:";

/// Choices made when the form was opened, waiting for its submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingForm {
    pub repository: Repository,
    pub notify: Notify,
    pub user: u64,
}

#[derive(Debug)]
struct Entry {
    form: PendingForm,
    opened: Instant,
}

/// Short-lived registry bridging a command and its modal submission.
#[derive(Debug)]
pub struct PendingForms {
    ttl: Duration,
    capacity: usize,
    entries: Mutex<HashMap<Uuid, Entry>>,
}

impl PendingForms {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn open(&self, form: PendingForm) -> Uuid {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|_, entry| now.duration_since(entry.opened) < self.ttl);

        while entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.opened)
                .map(|(id, _)| *id);
            match oldest {
                Some(id) => {
                    debug!("pending form {id} evicted, registry full");
                    entries.remove(&id);
                }
                None => break,
            }
        }

        let id = Uuid::new_v4();
        entries.insert(id, Entry { form, opened: now });
        id
    }

    /// Consumes the form opened under `id` if it is still alive and was
    /// opened by `user`.
    pub fn take(&self, id: &Uuid, user: u64) -> Option<PendingForm> {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries.get(id)?;

        if entry.opened.elapsed() >= self.ttl {
            entries.remove(id);
            return None;
        }
        if entry.form.user != user {
            return None;
        }

        entries.remove(id).map(|entry| entry.form)
    }

    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.opened) < self.ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

pub fn custom_id(id: &Uuid) -> String {
    format!("{CUSTOM_ID_PREFIX}{id}")
}

pub fn is_form_custom_id(custom_id: &str) -> bool {
    custom_id.starts_with(CUSTOM_ID_PREFIX)
}

pub fn parse_custom_id(custom_id: &str) -> Option<Uuid> {
    custom_id
        .strip_prefix(CUSTOM_ID_PREFIX)
        .and_then(|id| Uuid::parse_str(id).ok())
}
