//! Recording test doubles for the collaborator ports.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{Error, Result};
use crate::ports::{
    AnalyticsSink, IdentityProvider, ObjectStore, OwnerId, ProfileStore, Session, UploadOptions,
};
use crate::profile::{Profile, ProfileRecord};

pub const OWNER: &str = "user-1";

#[derive(Default)]
pub struct FakeIdentity {
    pub session: Mutex<Option<Session>>,
    pub calls: AtomicUsize,
    pub links: Mutex<Vec<(String, String)>>,
}

impl FakeIdentity {
    pub fn signed_in() -> Arc<Self> {
        let identity = Self::default();
        *identity.session.lock().unwrap() = Some(Session {
            owner: OwnerId::new(OWNER),
            email: Some("jane@x.edu".to_string()),
        });
        Arc::new(identity)
    }

    pub fn signed_out() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn current_session(&self) -> Result<Option<Session>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.session.lock().unwrap().clone())
    }

    async fn sign_in_with_email_link(&self, email: &str, redirect_to: &str) -> Result<()> {
        self.links
            .lock()
            .unwrap()
            .push((email.to_string(), redirect_to.to_string()));
        Ok(())
    }

    async fn sign_out(&self) -> Result<()> {
        *self.session.lock().unwrap() = None;
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeProfileStore {
    pub rows: Mutex<Vec<Profile>>,
    pub probes: AtomicUsize,
    pub inserts: AtomicUsize,
    pub updates: AtomicUsize,
    pub fail_with: Mutex<Option<String>>,
}

impl FakeProfileStore {
    pub fn with_existing(record: ProfileRecord) -> Arc<Self> {
        let store = Self::default();
        let now = Utc::now();
        store.rows.lock().unwrap().push(Profile {
            id: "existing".to_string(),
            user_id: OwnerId::new(OWNER),
            record,
            created_at: now,
            updated_at: now,
        });
        Arc::new(store)
    }

    pub fn calls(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
            + self.inserts.load(Ordering::SeqCst)
            + self.updates.load(Ordering::SeqCst)
    }

    fn check_failure(&self) -> Result<()> {
        match self.fail_with.lock().unwrap().clone() {
            Some(message) => Err(Error::collaborator("profile store", message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ProfileStore for FakeProfileStore {
    async fn select_by_owner(&self, owner: &OwnerId) -> Result<Option<Profile>> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|p| &p.user_id == owner)
            .cloned())
    }

    async fn insert(&self, owner: &OwnerId, record: &ProfileRecord) -> Result<Profile> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        let now = Utc::now();
        let profile = Profile {
            id: format!("row-{}", self.rows.lock().unwrap().len() + 1),
            user_id: owner.clone(),
            record: record.clone(),
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(profile.clone());
        Ok(profile)
    }

    async fn update(&self, owner: &OwnerId, record: &ProfileRecord) -> Result<Profile> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|p| &p.user_id == owner)
            .ok_or_else(|| Error::collaborator("profile store", "no row"))?;
        row.record = record.clone();
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn select_all(&self) -> Result<Vec<Profile>> {
        Ok(self.rows.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct FakeObjectStore {
    pub uploads: Mutex<Vec<(String, usize, UploadOptions)>>,
    pub fetched: Mutex<Vec<String>>,
    pub objects: Mutex<Vec<(String, Vec<u8>)>>,
    pub fail_with: Mutex<Option<String>>,
}

impl FakeObjectStore {
    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn upload(&self, path: &str, bytes: &[u8], options: &UploadOptions) -> Result<()> {
        if let Some(message) = self.fail_with.lock().unwrap().clone() {
            return Err(Error::collaborator("object store", message));
        }
        self.uploads
            .lock()
            .unwrap()
            .push((path.to_string(), bytes.len(), options.clone()));
        self.objects
            .lock()
            .unwrap()
            .push((self.public_url(path), bytes.to_vec()));
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("https://cdn.test/{path}")
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.fetched.lock().unwrap().push(url.to_string());
        self.objects
            .lock()
            .unwrap()
            .iter()
            .find(|(u, _)| u == url)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| Error::collaborator("object store", "Object not found"))
    }
}

#[derive(Default)]
pub struct RecordingAnalytics {
    pub events: Mutex<Vec<(String, serde_json::Value)>>,
}

impl RecordingAnalytics {
    pub fn names(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl AnalyticsSink for RecordingAnalytics {
    fn capture(&self, event: &str, properties: serde_json::Value) {
        self.events
            .lock()
            .unwrap()
            .push((event.to_string(), properties));
    }
}
