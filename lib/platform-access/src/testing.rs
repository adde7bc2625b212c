//! In-process collaborators for tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coursehall_core::IdentityId;
use rootcause::Report;
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Notify;

use crate::error::{ProfileStoreError, SessionStoreError, VerifierError};
use crate::identity::{Identity, IdentityVerifier, Verification};
use crate::policy::Clock;
use crate::profile::{Profile, ProfileStore};
use crate::session::Session;
use crate::store::SessionStore;

/// Clock frozen at one instant.
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

struct Account {
    identity: Identity,
    password: String,
}

/// Identity provider and profile store backed by maps.
///
/// Records which identity sessions are open and which were revoked.
#[derive(Default)]
pub struct MemoryDirectory {
    accounts: Mutex<HashMap<String, Account>>,
    profiles: Mutex<HashMap<IdentityId, Profile>>,
    open: Mutex<BTreeSet<IdentityId>>,
    revoked: Mutex<Vec<IdentityId>>,
    lookups: AtomicUsize,
    verify_down: AtomicBool,
    profiles_down: AtomicBool,
    stall_next_revoke: AtomicBool,
    revoke_started: Notify,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account and returns its generated id.
    pub fn register(&self, email: &str, password: &str, email_confirmed: bool) -> IdentityId {
        let id = IdentityId::generate();
        self.accounts.lock().unwrap().insert(
            email.to_string(),
            Account {
                identity: Identity::new(id.clone(), email, email_confirmed),
                password: password.to_string(),
            },
        );
        id
    }

    pub fn put_profile(&self, profile: Profile) {
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.id().clone(), profile);
    }

    pub fn open_sessions(&self) -> Vec<IdentityId> {
        self.open.lock().unwrap().iter().cloned().collect()
    }

    pub fn revoked(&self) -> Vec<IdentityId> {
        self.revoked.lock().unwrap().clone()
    }

    pub fn profile_lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn fail_verify(&self) {
        self.verify_down.store(true, Ordering::SeqCst);
    }

    pub fn fail_profiles(&self) {
        self.profiles_down.store(true, Ordering::SeqCst);
    }

    /// Makes the next `revoke` call hang forever. Later calls succeed.
    pub fn stall_next_revoke(&self) {
        self.stall_next_revoke.store(true, Ordering::SeqCst);
    }

    /// Notified when a `revoke` call starts.
    pub fn revoke_started(&self) -> &Notify {
        &self.revoke_started
    }
}

#[async_trait]
impl IdentityVerifier for MemoryDirectory {
    async fn verify(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Verification, Report<VerifierError>> {
        if self.verify_down.load(Ordering::SeqCst) {
            return Err(VerifierError::Unavailable {
                details: "connection refused".to_string(),
            }
            .into());
        }

        let identity = {
            let accounts = self.accounts.lock().unwrap();
            match accounts.get(email) {
                Some(account) if account.password == password => account.identity.clone(),
                _ => return Ok(Verification::Rejected),
            }
        };
        self.open.lock().unwrap().insert(identity.id.clone());
        Ok(Verification::Verified(identity))
    }

    async fn revoke(&self, id: &IdentityId) -> Result<(), Report<VerifierError>> {
        self.revoke_started.notify_one();
        if self.stall_next_revoke.swap(false, Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.open.lock().unwrap().remove(id);
        self.revoked.lock().unwrap().push(id.clone());
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryDirectory {
    async fn get_profile(
        &self,
        id: &IdentityId,
    ) -> Result<Option<Profile>, Report<ProfileStoreError>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.profiles_down.load(Ordering::SeqCst) {
            return Err(ProfileStoreError::Unavailable {
                details: "deadline exceeded".to_string(),
            }
            .into());
        }
        Ok(self.profiles.lock().unwrap().get(id).cloned())
    }
}

/// Profile store whose lookups never complete.
#[derive(Default)]
pub struct StallingProfileStore {
    started: Notify,
}

impl StallingProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notified once a lookup is in flight.
    pub fn started(&self) -> &Notify {
        &self.started
    }
}

#[async_trait]
impl ProfileStore for StallingProfileStore {
    async fn get_profile(
        &self,
        _id: &IdentityId,
    ) -> Result<Option<Profile>, Report<ProfileStoreError>> {
        self.started.notify_one();
        std::future::pending().await
    }
}

/// Session store whose writes always fail.
pub struct FailingSessionStore;

#[async_trait]
impl SessionStore for FailingSessionStore {
    async fn save(&self, _session: &Session) -> Result<(), Report<SessionStoreError>> {
        Err(SessionStoreError::Io {
            key: "coursehall.session".to_string(),
            details: "read-only file system".to_string(),
        }
        .into())
    }

    async fn load(&self) -> Option<Session> {
        None
    }

    async fn clear(&self) -> Result<(), Report<SessionStoreError>> {
        Ok(())
    }
}
