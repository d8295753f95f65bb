//! Authoritative user store.
//!
//! Every balance mutation goes through `update` or `update_pair`, which run
//! the caller's closure inside the target user's mutex. That per-user mutex
//! is the process's linearization point for financial state: two gift sends
//! against the same sender serialize here, so a balance check and its debit
//! are one indivisible step. The closure works on a copy; only a successful
//! result is written back, so a failed operation leaves no partial state.

use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::snapshot::SnapshotStore;
use crate::models::{User, UserId};
use crate::{Error, Result};

const SNAPSHOT_NAME: &str = "users";

#[derive(Clone)]
pub struct UserRepository {
    users: Arc<DashMap<UserId, Arc<Mutex<User>>>>,
    snapshots: SnapshotStore,
}

impl std::fmt::Debug for UserRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRepository")
            .field("count", &self.users.len())
            .finish()
    }
}

impl UserRepository {
    #[must_use]
    pub fn new(snapshots: SnapshotStore) -> Self {
        Self {
            users: Arc::new(DashMap::new()),
            snapshots,
        }
    }

    /// Load users from the latest snapshot, if one exists.
    pub async fn restore(&self) -> Result<usize> {
        let Some(users) = self.snapshots.read::<Vec<User>>(SNAPSHOT_NAME).await? else {
            return Ok(0);
        };
        let count = users.len();
        for user in users {
            self.users
                .insert(user.id.clone(), Arc::new(Mutex::new(user)));
        }
        Ok(count)
    }

    pub async fn insert(&self, user: User) -> Result<()> {
        if self.users.contains_key(&user.id) {
            return Err(Error::AlreadyExists(format!("User {}", user.id)));
        }
        self.users
            .insert(user.id.clone(), Arc::new(Mutex::new(user)));
        self.persist().await
    }

    pub async fn get(&self, id: &UserId) -> Result<Option<User>> {
        let Some(slot) = self.users.get(id).map(|e| e.value().clone()) else {
            return Ok(None);
        };
        let user = slot.lock().await;
        Ok(Some(user.clone()))
    }

    pub async fn require(&self, id: &UserId) -> Result<User> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("User {id}")))
    }

    /// Atomic read-modify-write of a single user. The closure either
    /// succeeds and its result is committed, or fails and the stored user
    /// is untouched. The snapshot lands before this returns.
    pub async fn update<T, F>(&self, id: &UserId, f: F) -> Result<T>
    where
        F: FnOnce(&mut User) -> Result<T>,
    {
        let slot = self
            .users
            .get(id)
            .map(|e| e.value().clone())
            .ok_or_else(|| Error::NotFound(format!("User {id}")))?;

        let outcome = {
            let mut stored = slot.lock().await;
            let mut working = stored.clone();
            let value = f(&mut working)?;
            working.updated_at = Utc::now();
            *stored = working;
            value
        };

        self.persist().await?;
        Ok(outcome)
    }

    /// Atomic read-modify-write across two distinct users, locked in
    /// ascending-id order so concurrent pairs cannot deadlock. The closure
    /// receives `(a, b)` in call order regardless of lock order.
    pub async fn update_pair<T, F>(&self, a: &UserId, b: &UserId, f: F) -> Result<T>
    where
        F: FnOnce(&mut User, &mut User) -> Result<T>,
    {
        if a == b {
            return Err(Error::InvalidInput(
                "update_pair requires two distinct users".to_string(),
            ));
        }

        let slot_a = self
            .users
            .get(a)
            .map(|e| e.value().clone())
            .ok_or_else(|| Error::NotFound(format!("User {a}")))?;
        let slot_b = self
            .users
            .get(b)
            .map(|e| e.value().clone())
            .ok_or_else(|| Error::NotFound(format!("User {b}")))?;

        let outcome = {
            let (first, second) = if a < b {
                (&slot_a, &slot_b)
            } else {
                (&slot_b, &slot_a)
            };
            let mut first_guard = first.lock().await;
            let mut second_guard = second.lock().await;

            let (stored_a, stored_b) = if a < b {
                (&mut *first_guard, &mut *second_guard)
            } else {
                (&mut *second_guard, &mut *first_guard)
            };

            let mut working_a = stored_a.clone();
            let mut working_b = stored_b.clone();
            let value = f(&mut working_a, &mut working_b)?;

            let now = Utc::now();
            working_a.updated_at = now;
            working_b.updated_at = now;
            *stored_a = working_a;
            *stored_b = working_b;
            value
        };

        self.persist().await?;
        Ok(outcome)
    }

    pub fn contains(&self, id: &UserId) -> bool {
        self.users.contains_key(id)
    }

    /// Snapshot the full user set. Called after every committed mutation.
    async fn persist(&self) -> Result<()> {
        if !self.snapshots.is_enabled() {
            return Ok(());
        }
        let mut users = Vec::with_capacity(self.users.len());
        let slots: Vec<Arc<Mutex<User>>> =
            self.users.iter().map(|e| e.value().clone()).collect();
        for slot in slots {
            users.push(slot.lock().await.clone());
        }
        users.sort_by(|a, b| a.id.cmp(&b.id));
        self.snapshots.write(SNAPSHOT_NAME, &users).await
    }
}
