//! Collection-scoped repositories over the document store.
//!
//! Every operation delegates to exactly one `read()` or one `update()`
//! call, so the store's serialization and atomic-replace guarantees carry
//! through unchanged. Lookups are linear scans; absence is `None`, never
//! an error.

use crate::database::FileDatabase;
use crate::error::StoreResult;
use crate::models::{Contact, Project, User};

#[derive(Clone)]
pub struct ProjectsRepository {
    db: FileDatabase,
}

impl ProjectsRepository {
    pub fn new(db: FileDatabase) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> StoreResult<Vec<Project>> {
        Ok(self.db.read().await?.projects)
    }

    pub async fn find_by_id(&self, id: &str) -> StoreResult<Option<Project>> {
        Ok(self.list().await?.into_iter().find(|project| project.id == id))
    }

    pub async fn create(&self, project: Project) -> StoreResult<Project> {
        self.db
            .update(move |data| {
                data.projects.push(project.clone());
                Ok(project)
            })
            .await
    }

    /// Replace the record with `update(current)`. The updater receives
    /// the pre-mutation record and must return its full replacement.
    pub async fn update_by_id<F>(&self, id: &str, update: F) -> StoreResult<Option<Project>>
    where
        F: FnOnce(Project) -> Project + Send + 'static,
    {
        let id = id.to_owned();
        self.db
            .update(move |data| {
                let Some(index) = data.projects.iter().position(|p| p.id == id) else {
                    return Ok(None);
                };
                let next = update(data.projects[index].clone());
                data.projects[index] = next.clone();
                Ok(Some(next))
            })
            .await
    }

    pub async fn remove_by_id(&self, id: &str) -> StoreResult<Option<Project>> {
        let id = id.to_owned();
        self.db
            .update(move |data| {
                let Some(index) = data.projects.iter().position(|p| p.id == id) else {
                    return Ok(None);
                };
                Ok(Some(data.projects.remove(index)))
            })
            .await
    }
}

#[derive(Clone)]
pub struct ContactsRepository {
    db: FileDatabase,
}

impl ContactsRepository {
    pub fn new(db: FileDatabase) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> StoreResult<Vec<Contact>> {
        Ok(self.db.read().await?.contacts)
    }

    pub async fn find_by_id(&self, id: &str) -> StoreResult<Option<Contact>> {
        Ok(self.list().await?.into_iter().find(|contact| contact.id == id))
    }

    /// Exact-match lookup used by the submission replay guard.
    pub async fn find_by_idempotency_key(&self, key: &str) -> StoreResult<Option<Contact>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|contact| contact.idempotency_key.as_deref() == Some(key)))
    }

    pub async fn create(&self, contact: Contact) -> StoreResult<Contact> {
        self.db
            .update(move |data| {
                data.contacts.push(contact.clone());
                Ok(contact)
            })
            .await
    }

    pub async fn update_by_id<F>(&self, id: &str, update: F) -> StoreResult<Option<Contact>>
    where
        F: FnOnce(Contact) -> Contact + Send + 'static,
    {
        let id = id.to_owned();
        self.db
            .update(move |data| {
                let Some(index) = data.contacts.iter().position(|c| c.id == id) else {
                    return Ok(None);
                };
                let next = update(data.contacts[index].clone());
                data.contacts[index] = next.clone();
                Ok(Some(next))
            })
            .await
    }
}

#[derive(Clone)]
pub struct UsersRepository {
    db: FileDatabase,
}

impl UsersRepository {
    pub fn new(db: FileDatabase) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> StoreResult<Vec<User>> {
        Ok(self.db.read().await?.users)
    }

    pub async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.list().await?.into_iter().find(|user| user.id == id))
    }

    pub async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let needle = email.to_lowercase();
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|user| user.email.to_lowercase() == needle))
    }

    /// Look up by case-insensitive email inside one mutation and let
    /// `resolve` produce the final record from the current one (or from
    /// nothing). A resolver that returns its input unchanged leaves the
    /// stored record untouched, which keeps startup provisioning
    /// idempotent across restarts.
    pub async fn upsert_by_email<F>(&self, email: &str, resolve: F) -> StoreResult<User>
    where
        F: FnOnce(Option<User>) -> User + Send + 'static,
    {
        let needle = email.to_lowercase();
        self.db
            .update(move |data| {
                match data.users.iter().position(|u| u.email.to_lowercase() == needle) {
                    Some(index) => {
                        let next = resolve(Some(data.users[index].clone()));
                        data.users[index] = next.clone();
                        Ok(next)
                    }
                    None => {
                        let created = resolve(None);
                        data.users.push(created.clone());
                        Ok(created)
                    }
                }
            })
            .await
    }
}
