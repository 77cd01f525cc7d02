//! Users, tasks, templates and report settings.
//!
//! These collections carry no sync semantics: every change is a plain
//! read-modify-write of one collection inside [`Store::atomically`].

use std::sync::Arc;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::{default_users, ChecklistTemplate, ReportConfig, Task, User};
use crate::storage::{Collection, Store};

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

/// A record stored in an id-keyed collection.
trait Record: Serialize + DeserializeOwned + Clone {
    const KIND: &'static str;
    const COLLECTION: Collection;

    fn id(&self) -> &str;
}

impl Record for User {
    const KIND: &'static str = "user";
    const COLLECTION: Collection = Collection::Users;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Task {
    const KIND: &'static str = "task";
    const COLLECTION: Collection = Collection::Tasks;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for ChecklistTemplate {
    const KIND: &'static str = "template";
    const COLLECTION: Collection = Collection::Templates;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Access to the non-round collections.
#[derive(Debug, Clone)]
pub struct Catalog {
    store: Arc<Store>,
}

impl Catalog {
    /// Create a catalog over the given store.
    #[must_use]
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Seed the default accounts if the users collection was never written.
    ///
    /// Returns `true` if accounts were seeded. An existing but empty
    /// collection is left alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn seed_defaults(&self) -> Result<bool> {
        let seeded = self.store.atomically(|txn| {
            if txn.read::<Vec<User>>(Collection::Users)?.is_some() {
                return Ok(false);
            }
            txn.write(Collection::Users, &default_users())?;
            Ok(true)
        })?;
        if seeded {
            info!("Seeded default user accounts");
        }
        Ok(seeded)
    }

    /// Authenticate by email and password.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCredentials`] if no account matches and
    /// [`Error::UserInactive`] if the matching account is deactivated.
    pub fn login(&self, email: &str, password: &str) -> Result<User> {
        let user = self
            .users()?
            .into_iter()
            .find(|u| u.email == email && u.password == password)
            .ok_or(Error::InvalidCredentials)?;

        if !user.active {
            warn!(user = %user.id, "Login refused for inactive user");
            return Err(Error::UserInactive);
        }
        debug!(user = %user.id, role = %user.role, "Login succeeded");
        Ok(user)
    }

    /// All user accounts.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn users(&self) -> Result<Vec<User>> {
        self.list()
    }

    /// Insert or replace a user by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a blank name or malformed email,
    /// or a store error.
    pub fn save_user(&self, user: User) -> Result<()> {
        if user.name.trim().is_empty() {
            return Err(Error::invalid_input("user name is empty"));
        }
        let pattern = Regex::new(EMAIL_PATTERN).map_err(|e| Error::internal(e.to_string()))?;
        if !pattern.is_match(&user.email) {
            return Err(Error::invalid_input(format!(
                "not a valid email: {}",
                user.email
            )));
        }
        self.upsert(user)
    }

    /// Activate or deactivate a user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id, or a store error.
    pub fn set_user_active(&self, id: &str, active: bool) -> Result<User> {
        let user = self.update::<User>(id, |user| user.active = active)?;
        info!(user = %id, active, "User status changed");
        Ok(user)
    }

    /// All tasks.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn tasks(&self) -> Result<Vec<Task>> {
        self.list()
    }

    /// Find a task by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id, or a store error.
    pub fn task(&self, id: &str) -> Result<Task> {
        self.tasks()?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::not_found(Task::KIND, id))
    }

    /// Insert or replace a task by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a blank title or sector, or a store error.
    pub fn save_task(&self, task: Task) -> Result<()> {
        if task.title.trim().is_empty() || task.sector.trim().is_empty() {
            return Err(Error::invalid_input("task title and sector are required"));
        }
        self.upsert(task)
    }

    /// Delete a task. Rounds already recorded keep their own copy of its details.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id, or a store error.
    pub fn delete_task(&self, id: &str) -> Result<()> {
        self.remove::<Task>(id)
    }

    /// Copy a task under a new id and store the copy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id, or a store error.
    pub fn duplicate_task(&self, id: &str) -> Result<Task> {
        let copy = self
            .task(id)?
            .duplicate(chrono::Utc::now().timestamp_millis());
        self.upsert(copy.clone())?;
        Ok(copy)
    }

    /// All checklist templates.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn templates(&self) -> Result<Vec<ChecklistTemplate>> {
        self.list()
    }

    /// Insert or replace a template by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a blank name, or a store error.
    pub fn save_template(&self, template: ChecklistTemplate) -> Result<()> {
        if template.name.trim().is_empty() {
            return Err(Error::invalid_input("template name is empty"));
        }
        self.upsert(template)
    }

    /// Delete a template.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id, or a store error.
    pub fn delete_template(&self, id: &str) -> Result<()> {
        self.remove::<ChecklistTemplate>(id)
    }

    /// Report branding, or the defaults if never saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn settings(&self) -> Result<ReportConfig> {
        self.store.read_or_default(Collection::Settings)
    }

    /// Replace the report branding.
    ///
    /// # Errors
    ///
    /// Returns a store error if the write fails.
    pub fn save_settings(&self, settings: &ReportConfig) -> Result<()> {
        self.store.write(Collection::Settings, settings)
    }

    fn list<R: Record>(&self) -> Result<Vec<R>> {
        self.store.read_or_default(R::COLLECTION)
    }

    fn upsert<R: Record>(&self, record: R) -> Result<()> {
        self.store.atomically(|txn| {
            let mut records: Vec<R> = txn.read_or_default(R::COLLECTION)?;
            match records.iter_mut().find(|r| r.id() == record.id()) {
                Some(existing) => *existing = record,
                None => records.push(record),
            }
            txn.write(R::COLLECTION, &records)
        })?;
        debug!(kind = R::KIND, "Saved record");
        Ok(())
    }

    fn update<R: Record>(&self, id: &str, f: impl FnOnce(&mut R)) -> Result<R> {
        self.store.atomically(|txn| {
            let mut records: Vec<R> = txn.read_or_default(R::COLLECTION)?;
            let record = records
                .iter_mut()
                .find(|r| r.id() == id)
                .ok_or_else(|| Error::not_found(R::KIND, id))?;
            f(record);
            let updated = record.clone();
            txn.write(R::COLLECTION, &records)?;
            Ok(updated)
        })
    }

    fn remove<R: Record>(&self, id: &str) -> Result<()> {
        self.store.atomically(|txn| {
            let mut records: Vec<R> = txn.read_or_default(R::COLLECTION)?;
            let before = records.len();
            records.retain(|r| r.id() != id);
            if records.len() == before {
                return Err(Error::not_found(R::KIND, id));
            }
            txn.write(R::COLLECTION, &records)
        })?;
        info!(kind = R::KIND, id, "Deleted record");
        Ok(())
    }
}
