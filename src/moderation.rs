//! Scammer moderation logic
//!
//! Everything the slash commands do apart from parsing options and rendering
//! replies: the staff check, the setup guard, duplicate and absence checks,
//! role changes and the pending log post. Outcomes the user should see come
//! back as [`ModerationError`] variants; only store failures are unexpected.

use crate::ERROR_TARGET;
use crate::gateway::RoleManager;
use crate::relay::{self, LogEvent, Notifier};
use crate::store::{GuildSettings, NewScammer, Removal, ScammerEntry, StoreError, StoreHandle};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Reasons a moderation request did not go through
#[derive(Debug, Error)]
pub enum ModerationError {
    /// The guild has no settings yet
    #[error("Guild has not been set up")]
    NotConfigured,

    /// The user already has an active entry in this guild
    #[error("User is already marked as a scammer (entry {})", .0.id)]
    AlreadyMarked(Box<ScammerEntry>),

    /// The user has no active entry in this guild
    #[error("User is not marked as a scammer")]
    NotMarked,

    /// The caller holds none of the staff roles
    #[error("Caller does not hold a staff role")]
    PermissionDenied,

    /// The guild has no entries at all
    #[error("No scammers recorded in this guild")]
    EmptyList,

    /// The user has no active entries anywhere
    #[error("User has no scammer history")]
    NoHistory,

    /// Record store failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for moderation operations
pub type ModerationResult<T> = Result<T, ModerationError>;

/// A Discord user as seen by the moderation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub id: u64,
    pub name: String,
}

impl UserRef {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A recorded add or remove whose log post has not been sent yet
///
/// Commands reply to the caller first, then call [`PendingLog::relay`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "the log channel is only notified by `relay`"]
pub struct PendingLog {
    settings: GuildSettings,
    event: LogEvent,
}

impl PendingLog {
    /// The entry as stored after the change
    #[must_use]
    pub fn entry(&self) -> &ScammerEntry {
        self.event.entry()
    }

    #[must_use]
    pub fn event(&self) -> &LogEvent {
        &self.event
    }

    /// Post the event to the guild's log channel, if one is configured
    pub async fn relay<N: Notifier + ?Sized>(self, notifier: &N) {
        relay::relay(notifier, &self.settings, self.event).await;
    }
}

/// Moderation operations over the shared store
#[derive(Debug, Clone)]
pub struct ModerationService {
    store: StoreHandle,
    staff_roles: Arc<HashSet<u64>>,
}

impl ModerationService {
    pub fn new(store: StoreHandle, staff_roles: impl IntoIterator<Item = u64>) -> Self {
        Self {
            store,
            staff_roles: Arc::new(staff_roles.into_iter().collect()),
        }
    }

    #[must_use]
    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    /// Require one of the configured staff roles among `member_roles`
    ///
    /// # Errors
    /// Returns `PermissionDenied` if none of the roles match
    pub fn ensure_staff(&self, member_roles: &[u64]) -> ModerationResult<()> {
        if member_roles.iter().any(|role| self.staff_roles.contains(role)) {
            Ok(())
        } else {
            Err(ModerationError::PermissionDenied)
        }
    }

    /// Settings for a guild, failing if it was never set up
    ///
    /// # Errors
    /// Returns `NotConfigured` for an unconfigured guild, or a store error
    pub async fn settings(&self, guild_id: u64) -> ModerationResult<GuildSettings> {
        self.store
            .guild_settings(guild_id)
            .await?
            .ok_or(ModerationError::NotConfigured)
    }

    /// Mark `target` as a scammer and give them the scammer role
    ///
    /// The log post is returned as a [`PendingLog`] instead of being sent.
    /// The active-entry check and the insert are separate store requests, so
    /// two concurrent adds for the same user can both succeed.
    ///
    /// # Errors
    /// Returns `NotConfigured`, `AlreadyMarked`, or a store error
    pub async fn add<R: RoleManager + ?Sized>(
        &self,
        roles: &R,
        guild_id: u64,
        target: &UserRef,
        staff: &UserRef,
        reason: impl Into<String>,
    ) -> ModerationResult<PendingLog> {
        let settings = self.settings(guild_id).await?;

        if let Some(existing) = self.store.active_scammer(target.id, guild_id).await? {
            return Err(ModerationError::AlreadyMarked(Box::new(existing)));
        }

        let entry = self
            .store
            .add_scammer(NewScammer {
                user_id: target.id,
                username: target.name.clone(),
                reason: reason.into(),
                added_by: staff.name.clone(),
                added_by_id: staff.id,
                guild_id,
            })
            .await?;

        info!(
            entry_id = entry.id,
            user_id = target.id,
            guild_id,
            staff_id = staff.id,
            "User marked as scammer"
        );

        if let Err(e) = roles
            .add_role(guild_id, target.id, settings.scammer_role)
            .await
        {
            error!(
                target: ERROR_TARGET,
                user_id = target.id,
                guild_id,
                role_id = settings.scammer_role,
                error = %e,
                "Error adding role"
            );
        }

        Ok(PendingLog {
            settings,
            event: LogEvent::ScammerAdded(entry),
        })
    }

    /// Reverse the active entry for `target` and take the role away
    ///
    /// Like [`Self::add`], the log post is left to the caller.
    ///
    /// # Errors
    /// Returns `NotConfigured`, `NotMarked`, or a store error
    pub async fn remove<R: RoleManager + ?Sized>(
        &self,
        roles: &R,
        guild_id: u64,
        target: &UserRef,
        staff: &UserRef,
        reason: impl Into<String>,
    ) -> ModerationResult<PendingLog> {
        let settings = self.settings(guild_id).await?;

        let removal = Removal {
            removed_by: staff.name.clone(),
            removed_by_id: staff.id,
            reason: reason.into(),
        };
        let entry = self
            .store
            .remove_scammer(target.id, guild_id, removal)
            .await?
            .ok_or(ModerationError::NotMarked)?;

        info!(
            entry_id = entry.id,
            user_id = target.id,
            guild_id,
            staff_id = staff.id,
            "User removed from scammer list"
        );

        if let Err(e) = roles
            .remove_role(guild_id, target.id, settings.scammer_role)
            .await
        {
            error!(
                target: ERROR_TARGET,
                user_id = target.id,
                guild_id,
                role_id = settings.scammer_role,
                error = %e,
                "Error removing role"
            );
        }

        Ok(PendingLog {
            settings,
            event: LogEvent::ScammerRemoved(entry),
        })
    }

    /// Every entry recorded in the guild, removed ones included
    ///
    /// # Errors
    /// Returns `NotConfigured`, `EmptyList`, or a store error
    pub async fn show(&self, guild_id: u64) -> ModerationResult<Vec<ScammerEntry>> {
        self.settings(guild_id).await?;

        let entries = self.store.guild_scammers(guild_id, false).await?;
        if entries.is_empty() {
            return Err(ModerationError::EmptyList);
        }
        Ok(entries)
    }

    /// The user's active entries in every guild
    ///
    /// # Errors
    /// Returns `NotConfigured`, `NoHistory`, or a store error
    pub async fn check(&self, guild_id: u64, user_id: u64) -> ModerationResult<Vec<ScammerEntry>> {
        self.settings(guild_id).await?;

        let instances = self.store.scammer_instances(user_id, None).await?;
        if instances.is_empty() {
            return Err(ModerationError::NoHistory);
        }
        Ok(instances)
    }

    /// Replace the guild's settings
    ///
    /// # Errors
    /// Returns a store error if the settings cannot be saved
    pub async fn setup(
        &self,
        guild_id: u64,
        scammer_role: u64,
        notification_channel: u64,
        log_channel: Option<u64>,
    ) -> ModerationResult<GuildSettings> {
        let settings = GuildSettings {
            guild_id,
            scammer_role,
            notification_channel,
            log_channel,
        };
        let saved = self.store.save_guild_settings(guild_id, settings).await?;

        info!(
            guild_id,
            scammer_role,
            notification_channel,
            log_channel = ?log_channel,
            "Guild setup complete"
        );
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayError, MockRoleManager};
    use crate::relay::MockNotifier;
    use crate::store::{RecordStore, StorePaths};
    use std::sync::Mutex;
    use tempfile::TempDir;

    const GUILD: u64 = 1_000;
    const OTHER_GUILD: u64 = 2_000;
    const STAFF_ROLE: u64 = 77;
    const SCAMMER_ROLE: u64 = 500;
    const LOG_CHANNEL: u64 = 600;

    fn service() -> (ModerationService, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(StorePaths::in_dir(dir.path())).unwrap();
        let (handle, _task) = StoreHandle::spawn(store);
        (ModerationService::new(handle, [STAFF_ROLE]), dir)
    }

    async fn configured(log_channel: Option<u64>) -> (ModerationService, TempDir) {
        let (service, dir) = service();
        service
            .setup(GUILD, SCAMMER_ROLE, 400, log_channel)
            .await
            .unwrap();
        (service, dir)
    }

    fn target() -> UserRef {
        UserRef::new(11, "mallory")
    }

    fn staff() -> UserRef {
        UserRef::new(22, "alice")
    }

    fn quiet_roles() -> MockRoleManager {
        let mut roles = MockRoleManager::new();
        roles.expect_add_role().returning(|_, _, _| Ok(()));
        roles.expect_remove_role().returning(|_, _, _| Ok(()));
        roles
    }

    #[tokio::test]
    async fn test_ensure_staff() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(StorePaths::in_dir(dir.path())).unwrap();
        let (handle, _task) = StoreHandle::spawn(store);
        let service = ModerationService::new(handle, [STAFF_ROLE, 78]);

        assert!(service.ensure_staff(&[1, 78]).is_ok());
        assert!(service.ensure_staff(&[STAFF_ROLE]).is_ok());
        assert!(matches!(
            service.ensure_staff(&[1, 2]),
            Err(ModerationError::PermissionDenied)
        ));
        assert!(matches!(
            service.ensure_staff(&[]),
            Err(ModerationError::PermissionDenied)
        ));
    }

    #[tokio::test]
    async fn test_unconfigured_guild_is_rejected() {
        let (service, _dir) = service();
        let mut roles = MockRoleManager::new();
        roles.expect_add_role().never();
        roles.expect_remove_role().never();

        let result = service
            .add(&roles, GUILD, &target(), &staff(), "phishing")
            .await;
        assert!(matches!(result, Err(ModerationError::NotConfigured)));
        assert!(service.store().all_scammers().await.unwrap().is_empty());

        assert!(matches!(
            service.remove(&roles, GUILD, &target(), &staff(), "x").await,
            Err(ModerationError::NotConfigured)
        ));
        assert!(matches!(
            service.show(GUILD).await,
            Err(ModerationError::NotConfigured)
        ));
        assert!(matches!(
            service.check(GUILD, 11).await,
            Err(ModerationError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_add_assigns_role_and_relays() {
        let (service, _dir) = configured(Some(LOG_CHANNEL)).await;

        let mut roles = MockRoleManager::new();
        roles
            .expect_add_role()
            .withf(|guild, user, role| *guild == GUILD && *user == 11 && *role == SCAMMER_ROLE)
            .times(1)
            .returning(|_, _, _| Ok(()));
        let mut notifier = MockNotifier::new();
        notifier
            .expect_post_log()
            .withf(|channel, event| {
                *channel == LOG_CHANNEL && matches!(event, LogEvent::ScammerAdded(e) if e.user_id == 11)
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let pending = service
            .add(&roles, GUILD, &target(), &staff(), "phishing")
            .await
            .unwrap();
        let entry = pending.entry().clone();
        assert_eq!(entry.id, 1);
        assert_eq!(entry.username, "mallory");
        assert_eq!(entry.added_by, "alice");
        assert_eq!(entry.added_by_id, 22);
        assert!(!entry.removed);

        pending.relay(&notifier).await;
    }

    #[tokio::test]
    async fn test_log_post_waits_for_relay() {
        let (service, _dir) = configured(Some(LOG_CHANNEL)).await;
        let roles = quiet_roles();

        // Records the order of the reply and the log post
        let order = std::sync::Arc::new(Mutex::new(Vec::new()));
        let mut notifier = MockNotifier::new();
        let posted = order.clone();
        notifier.expect_post_log().times(1).returning(move |_, _| {
            posted.lock().unwrap().push("log");
            Ok(())
        });

        let pending = service
            .add(&roles, GUILD, &target(), &staff(), "phishing")
            .await
            .unwrap();
        assert!(order.lock().unwrap().is_empty());

        order.lock().unwrap().push("reply");
        pending.relay(&notifier).await;

        assert_eq!(*order.lock().unwrap(), vec!["reply", "log"]);
    }

    #[tokio::test]
    async fn test_relay_skipped_without_log_channel() {
        let (service, _dir) = configured(None).await;
        let mut notifier = MockNotifier::new();
        notifier.expect_post_log().never();

        let pending = service
            .add(&quiet_roles(), GUILD, &target(), &staff(), "phishing")
            .await
            .unwrap();
        pending.relay(&notifier).await;
    }

    #[tokio::test]
    async fn test_second_add_is_rejected() {
        let (service, _dir) = configured(None).await;
        let roles = quiet_roles();

        let first = service
            .add(&roles, GUILD, &target(), &staff(), "phishing")
            .await
            .unwrap();

        match service
            .add(&roles, GUILD, &target(), &staff(), "again")
            .await
        {
            Err(ModerationError::AlreadyMarked(existing)) => assert_eq!(&*existing, first.entry()),
            other => panic!("Expected AlreadyMarked, got {other:?}"),
        }
        assert_eq!(service.store().all_scammers().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_role_failure_keeps_record() {
        let (service, _dir) = configured(None).await;
        let mut roles = MockRoleManager::new();
        roles
            .expect_add_role()
            .times(1)
            .returning(|_, _, _| Err(GatewayError::Unavailable("member left".to_string())));

        let pending = service
            .add(&roles, GUILD, &target(), &staff(), "phishing")
            .await
            .unwrap();
        assert_eq!(
            service.store().active_scammer(11, GUILD).await.unwrap().as_ref(),
            Some(pending.entry())
        );
    }

    #[tokio::test]
    async fn test_remove_lifecycle() {
        let (service, _dir) = configured(Some(LOG_CHANNEL)).await;

        let mut roles = MockRoleManager::new();
        roles.expect_add_role().returning(|_, _, _| Ok(()));
        roles
            .expect_remove_role()
            .withf(|guild, user, role| *guild == GUILD && *user == 11 && *role == SCAMMER_ROLE)
            .times(1)
            .returning(|_, _, _| Ok(()));
        let mut notifier = MockNotifier::new();
        notifier
            .expect_post_log()
            .withf(|channel, event| {
                *channel == LOG_CHANNEL
                    && matches!(event, LogEvent::ScammerRemoved(e)
                        if e.reason == "phishing" && e.remove_reason.as_deref() == Some("mistake"))
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let added = service
            .add(&roles, GUILD, &target(), &staff(), "phishing")
            .await
            .unwrap();

        let bob = UserRef::new(33, "bob");
        let pending = service
            .remove(&roles, GUILD, &target(), &bob, "mistake")
            .await
            .unwrap();
        let removed = pending.entry();
        assert_eq!(removed.id, added.entry().id);
        assert!(removed.removed);
        assert_eq!(removed.removed_by.as_deref(), Some("bob"));
        assert_eq!(removed.removed_by_id, Some(33));
        assert!(matches!(pending.event(), LogEvent::ScammerRemoved(_)));
        assert!(service.store().active_scammer(11, GUILD).await.unwrap().is_none());
        pending.relay(&notifier).await;

        assert!(matches!(
            service.remove(&roles, GUILD, &target(), &bob, "again").await,
            Err(ModerationError::NotMarked)
        ));
    }

    #[tokio::test]
    async fn test_show_lists_every_entry() {
        let (service, _dir) = configured(None).await;
        let roles = quiet_roles();

        assert!(matches!(
            service.show(GUILD).await,
            Err(ModerationError::EmptyList)
        ));

        let _ = service
            .add(&roles, GUILD, &target(), &staff(), "phishing")
            .await
            .unwrap();
        let _ = service
            .add(&roles, GUILD, &UserRef::new(12, "eve"), &staff(), "spam")
            .await
            .unwrap();
        let _ = service
            .remove(&roles, GUILD, &UserRef::new(12, "eve"), &staff(), "appealed")
            .await
            .unwrap();

        let listed = service.show(GUILD).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().any(|e| e.removed));
    }

    #[tokio::test]
    async fn test_check_spans_guilds_and_skips_removed() {
        let (service, _dir) = configured(None).await;
        service
            .setup(OTHER_GUILD, SCAMMER_ROLE, 401, None)
            .await
            .unwrap();
        let roles = quiet_roles();

        assert!(matches!(
            service.check(GUILD, 11).await,
            Err(ModerationError::NoHistory)
        ));

        let _ = service
            .add(&roles, OTHER_GUILD, &target(), &staff(), "elsewhere")
            .await
            .unwrap();
        let history = service.check(GUILD, 11).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].guild_id, OTHER_GUILD);

        let _ = service
            .remove(&roles, OTHER_GUILD, &target(), &staff(), "resolved")
            .await
            .unwrap();
        assert!(matches!(
            service.check(GUILD, 11).await,
            Err(ModerationError::NoHistory)
        ));
    }

    #[tokio::test]
    async fn test_setup_overwrites() {
        let (service, _dir) = configured(Some(LOG_CHANNEL)).await;

        let saved = service.setup(GUILD, 501, 402, None).await.unwrap();
        assert_eq!(saved.scammer_role, 501);
        assert_eq!(service.settings(GUILD).await.unwrap(), saved);
        assert!(service.settings(GUILD).await.unwrap().log_channel.is_none());
    }
}
