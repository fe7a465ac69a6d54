//! Session facade - login state for one client on top of the account store.
//!
//! An [`AuthSession`] owns a [`SessionSlot`], a single key-value slot holding a
//! JSON snapshot of the logged-in user. Each client gets its own session value;
//! nothing is global. The snapshot is only a cache: [`AuthSession::current_user`]
//! re-reads the user from the store every time, so bans and credit changes made
//! elsewhere show up on the next read and a banned or deleted user is logged out.
//!
//! Lifecycle of the slot: absent, then active after login or registration, then
//! absent again after logout or a failed re-validation.

use crate::{
    config::accounts::CreditSettings,
    core::{
        account, credits,
        payment::{self, Decision, NewPaymentRequest},
    },
    entities::{Role, payment_request, user},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The client-facing view of a user: everything except the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// User id
    pub id: i64,
    /// Display name
    pub name: String,
    /// Login email
    pub email: String,
    /// Account role
    pub role: Role,
    /// Credits available now; display-only for admins
    pub current_credits: i64,
    /// Credits granted per daily refill
    pub daily_credit_limit: i64,
    /// Last refill
    pub last_credit_reset: DateTime<Utc>,
    /// Ban flag
    pub is_banned: bool,
    /// Registration time
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserProfile {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            current_credits: user.current_credits,
            daily_credit_limit: user.daily_credit_limit,
            last_credit_reset: user.last_credit_reset,
            is_banned: user.is_banned,
            created_at: user.created_at,
        }
    }
}

/// What the session slot stores
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Issued on login or registration, kept across refreshes
    pub token: Uuid,
    /// When the token was issued
    pub issued_at: DateTime<Utc>,
    /// The user as of the last refresh
    pub user: UserProfile,
}

/// A single slot that holds the serialized session, like one key in browser storage.
pub trait SessionSlot {
    /// Current contents, if any
    fn load(&self) -> Option<String>;
    /// Replaces the contents
    fn store(&mut self, value: String);
    /// Empties the slot
    fn clear(&mut self);
}

/// In-process [`SessionSlot`]
#[derive(Debug, Clone, Default)]
pub struct MemorySlot {
    value: Option<String>,
}

impl SessionSlot for MemorySlot {
    fn load(&self) -> Option<String> {
        self.value.clone()
    }

    fn store(&mut self, value: String) {
        self.value = Some(value);
    }

    fn clear(&mut self) {
        self.value = None;
    }
}

/// Login state for one client plus the credit operations that need it.
///
/// The store connection is shared, so any number of sessions can run against
/// one database.
pub struct AuthSession<S: SessionSlot = MemorySlot> {
    db: Arc<DatabaseConnection>,
    slot: S,
    settings: CreditSettings,
}

impl AuthSession<MemorySlot> {
    /// A logged-out session backed by an in-process slot.
    #[must_use]
    pub fn in_memory(db: impl Into<Arc<DatabaseConnection>>) -> Self {
        Self::new(db, MemorySlot::default())
    }
}

impl<S: SessionSlot> AuthSession<S> {
    /// Wraps a store connection and a slot. Whatever the slot already holds is
    /// treated as a previous session and re-validated on the next read.
    #[must_use]
    pub fn new(db: impl Into<Arc<DatabaseConnection>>, slot: S) -> Self {
        Self {
            db: db.into(),
            slot,
            settings: CreditSettings::default(),
        }
    }

    /// Uses `settings` for new registrations and generation charges.
    #[must_use]
    pub fn with_settings(mut self, settings: CreditSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Credit settings in effect
    #[must_use]
    pub const fn settings(&self) -> CreditSettings {
        self.settings
    }

    /// The underlying store connection
    #[must_use]
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// The session slot
    #[must_use]
    pub const fn slot(&self) -> &S {
        &self.slot
    }

    /// Token of the stored session, without re-validating it.
    #[must_use]
    pub fn token(&self) -> Option<Uuid> {
        self.snapshot().map(|s| s.token)
    }

    fn snapshot(&self) -> Option<SessionSnapshot> {
        let raw = self.slot.load()?;
        serde_json::from_str(&raw).ok()
    }

    fn persist(&mut self, snapshot: &SessionSnapshot) -> Result<()> {
        let raw = serde_json::to_string(snapshot)?;
        self.slot.store(raw);
        Ok(())
    }

    fn start(&mut self, user: user::Model) -> Result<UserProfile> {
        let snapshot = SessionSnapshot {
            token: Uuid::new_v4(),
            issued_at: Utc::now(),
            user: user.into(),
        };
        self.persist(&snapshot)?;
        info!("Session started for {}", snapshot.user.email);
        Ok(snapshot.user)
    }

    fn refresh(&mut self, mut snapshot: SessionSnapshot, user: user::Model) -> Result<UserProfile> {
        snapshot.user = user.into();
        self.persist(&snapshot)?;
        Ok(snapshot.user)
    }

    /// Authenticates and starts a new session.
    ///
    /// Store errors (`InvalidCredentials`, `AccountBanned`) pass through and
    /// leave the slot as it was.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<UserProfile> {
        let user = account::authenticate(&self.db, email, password).await?;
        self.start(user)
    }

    /// Registers a regular user and starts a session for them.
    pub async fn register(&mut self, name: &str, email: &str, password: &str) -> Result<UserProfile> {
        let user = account::register(&self.db, self.settings, name, email, password).await?;
        self.start(user)
    }

    /// The logged-in user, re-read from the store.
    ///
    /// Returns `None` and clears the slot when the snapshot is unreadable or the
    /// user has been deleted or banned. Otherwise applies the daily refill and
    /// stores the refreshed snapshot under the same token.
    pub async fn current_user(&mut self) -> Result<Option<UserProfile>> {
        let Some(raw) = self.slot.load() else {
            return Ok(None);
        };

        let snapshot: SessionSnapshot = match serde_json::from_str(&raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Discarding unreadable session: {e}");
                self.slot.clear();
                return Ok(None);
            }
        };

        let user = match account::find_by_id(&self.db, snapshot.user.id).await? {
            Some(user) if !user.is_banned => user,
            _ => {
                info!("Ending session for {}", snapshot.user.email);
                self.slot.clear();
                return Ok(None);
            }
        };

        let user = credits::apply_daily_reset_if_due(self.db.as_ref(), user).await?;
        self.refresh(snapshot, user).map(Some)
    }

    /// Ends the session. Always succeeds.
    pub fn logout(&mut self) {
        debug!("Session cleared");
        self.slot.clear();
    }

    /// Spends credits from the logged-in user.
    ///
    /// # Errors
    /// `NoActiveSession` when nobody is logged in, otherwise whatever
    /// [`credits::deduct_credit`] returns.
    pub async fn deduct_credit(&mut self, amount: i64) -> Result<UserProfile> {
        let current = self.current_user().await?.ok_or(Error::NoActiveSession)?;
        let snapshot = self.snapshot().ok_or(Error::NoActiveSession)?;

        let user = credits::deduct_credit(&self.db, current.id, amount).await?;
        self.refresh(snapshot, user)
    }

    /// Whether the logged-in user can pay for one generation at the configured
    /// cost. Run before calling the model.
    pub async fn can_generate(&mut self) -> Result<bool> {
        let current = self.current_user().await?.ok_or(Error::NoActiveSession)?;
        Ok(credits::can_afford(&current, self.settings.generation_cost))
    }

    /// Debits the configured generation cost after a successful generation.
    pub async fn charge_generation(&mut self) -> Result<UserProfile> {
        self.deduct_credit(self.settings.generation_cost).await
    }

    /// The logged-in user if they are an admin.
    pub async fn require_admin(&mut self) -> Result<UserProfile> {
        let current = self.current_user().await?.ok_or(Error::NoActiveSession)?;
        if current.role.is_admin() {
            Ok(current)
        } else {
            Err(Error::AdminRequired)
        }
    }

    /// Files a payment request on behalf of the logged-in user.
    pub async fn submit_payment_request(
        &mut self,
        credits: i64,
        amount_paid: f64,
        utr: &str,
        message: Option<&str>,
    ) -> Result<payment_request::Model> {
        let current = self.current_user().await?.ok_or(Error::NoActiveSession)?;
        payment::submit_payment_request(
            &self.db,
            NewPaymentRequest {
                user_id: current.id,
                user_email: current.email,
                credits,
                amount_paid,
                utr: utr.to_string(),
                message: message.map(str::to_string),
            },
        )
        .await
    }

    /// The logged-in user's payment requests, newest first.
    pub async fn my_payment_requests(&mut self) -> Result<Vec<payment_request::Model>> {
        let current = self.current_user().await?.ok_or(Error::NoActiveSession)?;
        payment::list_payment_requests(&self.db, Some(current.id)).await
    }

    /// Admin operations, each checked against the current session.
    pub fn admin(&mut self) -> AdminConsole<'_, S> {
        AdminConsole { session: self }
    }
}

/// Admin console actions. Every call first re-checks that the session belongs
/// to an unbanned admin.
pub struct AdminConsole<'a, S: SessionSlot> {
    session: &'a mut AuthSession<S>,
}

impl<S: SessionSlot> AdminConsole<'_, S> {
    /// All accounts in registration order.
    pub async fn list_users(&mut self) -> Result<Vec<UserProfile>> {
        self.session.require_admin().await?;
        let users = account::list_users(&self.session.db).await?;
        Ok(users.into_iter().map(UserProfile::from).collect())
    }

    /// Flips a user's ban flag.
    pub async fn toggle_ban(&mut self, user_id: i64) -> Result<UserProfile> {
        self.session.require_admin().await?;
        account::toggle_ban(&self.session.db, user_id)
            .await
            .map(UserProfile::from)
    }

    /// Shifts a user's daily limit and current balance by `delta`.
    pub async fn adjust_daily_limit(&mut self, user_id: i64, delta: i64) -> Result<UserProfile> {
        self.session.require_admin().await?;
        account::adjust_daily_limit(&self.session.db, user_id, delta)
            .await
            .map(UserProfile::from)
    }

    /// Every payment request, newest first.
    pub async fn list_payment_requests(&mut self) -> Result<Vec<payment_request::Model>> {
        self.session.require_admin().await?;
        payment::list_payment_requests(&self.session.db, None).await
    }

    /// Approves or rejects a pending request.
    pub async fn decide_payment_request(
        &mut self,
        request_id: i64,
        decision: Decision,
    ) -> Result<payment_request::Model> {
        self.session.require_admin().await?;
        payment::decide_payment_request(&self.session.db, request_id, decision).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::PaymentStatus;
    use crate::test_utils::*;
    use chrono::Duration;

    async fn logged_in(email: &str) -> Result<(AuthSession, UserProfile)> {
        let db = setup_test_db().await?;
        create_test_user(&db, email).await?;
        let mut session = AuthSession::in_memory(db);
        let profile = session.login(email, TEST_PASSWORD).await?;
        Ok((session, profile))
    }

    #[tokio::test]
    async fn test_login_stores_snapshot() -> Result<()> {
        let (session, profile) = logged_in("snap@example.com").await?;

        let raw = session.slot().load().unwrap();
        assert!(!raw.contains("passwordHash"));
        assert!(raw.contains("\"currentCredits\":25"));

        let snapshot: SessionSnapshot = serde_json::from_str(&raw)?;
        assert_eq!(snapshot.user, profile);
        assert_eq!(session.token(), Some(snapshot.token));

        Ok(())
    }

    #[tokio::test]
    async fn test_login_failure_keeps_slot_absent() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "fail@example.com").await?;
        let mut session = AuthSession::in_memory(db);

        let result = session.login("fail@example.com", "wrong").await;
        assert!(matches!(result, Err(Error::InvalidCredentials)));
        assert!(session.slot().load().is_none());
        assert!(session.current_user().await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_register_starts_session() -> Result<()> {
        let db = setup_test_db().await?;
        let mut session = AuthSession::in_memory(db).with_settings(CreditSettings {
            default_daily_limit: 40,
            generation_cost: 5,
        });

        let profile = session
            .register("Newbie", "newbie@example.com", TEST_PASSWORD)
            .await?;
        assert_eq!(profile.current_credits, 40);
        assert_eq!(profile.daily_credit_limit, 40);
        assert_eq!(session.current_user().await?, Some(profile));

        let dup = session
            .register("Again", "NEWBIE@example.com", TEST_PASSWORD)
            .await;
        assert!(matches!(dup, Err(Error::DuplicateEmail { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_logout_clears_session() -> Result<()> {
        let (mut session, _) = logged_in("bye@example.com").await?;

        session.logout();
        assert!(session.slot().load().is_none());
        assert!(session.current_user().await?.is_none());

        // Logging out twice is fine
        session.logout();

        Ok(())
    }

    #[tokio::test]
    async fn test_current_user_sees_external_changes() -> Result<()> {
        let (mut session, profile) = logged_in("fresh@example.com").await?;
        let token = session.token();

        account::adjust_daily_limit(session.db(), profile.id, 10).await?;

        let current = session.current_user().await?.unwrap();
        assert_eq!(current.daily_credit_limit, 35);
        assert_eq!(current.current_credits, 35);
        assert_eq!(session.token(), token);

        let snapshot: SessionSnapshot = serde_json::from_str(&session.slot().load().unwrap())?;
        assert_eq!(snapshot.user, current);

        Ok(())
    }

    #[tokio::test]
    async fn test_current_user_applies_daily_reset() -> Result<()> {
        let (mut session, profile) = logged_in("morning@example.com").await?;
        session.deduct_credit(25).await?;

        let user = account::find_by_id(session.db(), profile.id).await?.unwrap();
        backdate_last_reset(session.db(), user, Duration::days(2)).await?;

        let current = session.current_user().await?.unwrap();
        assert_eq!(current.current_credits, 25);

        Ok(())
    }

    #[tokio::test]
    async fn test_ban_ends_session_on_next_read() -> Result<()> {
        let (mut session, profile) = logged_in("victim@example.com").await?;

        account::toggle_ban(session.db(), profile.id).await?;

        assert!(session.current_user().await?.is_none());
        assert!(session.slot().load().is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_unreadable_snapshot_is_discarded() -> Result<()> {
        let db = setup_test_db().await?;
        let mut slot = MemorySlot::default();
        slot.store("{not json".to_string());
        let mut session = AuthSession::new(db, slot);

        assert!(session.current_user().await?.is_none());
        assert!(session.slot().load().is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_deduct_without_session() -> Result<()> {
        let db = setup_test_db().await?;
        let mut session = AuthSession::in_memory(db);

        let result = session.deduct_credit(5).await;
        assert!(matches!(result, Err(Error::NoActiveSession)));

        Ok(())
    }

    #[tokio::test]
    async fn test_deduct_refreshes_snapshot() -> Result<()> {
        let (mut session, _) = logged_in("spend@example.com").await?;

        let after = session.deduct_credit(5).await?;
        assert_eq!(after.current_credits, 20);

        let snapshot: SessionSnapshot = serde_json::from_str(&session.slot().load().unwrap())?;
        assert_eq!(snapshot.user.current_credits, 20);

        let too_much = session.deduct_credit(21).await;
        assert!(matches!(
            too_much,
            Err(Error::InsufficientCredits {
                current: 20,
                required: 21
            })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_sessions_are_independent() -> Result<()> {
        let db = Arc::new(setup_test_db().await?);
        create_test_user(&db, "one@example.com").await?;
        create_test_user(&db, "two@example.com").await?;

        let mut first = AuthSession::in_memory(Arc::clone(&db));
        let mut second = AuthSession::in_memory(db);
        first.login("one@example.com", TEST_PASSWORD).await?;
        second.login("two@example.com", TEST_PASSWORD).await?;

        first.deduct_credit(10).await?;
        first.logout();

        let other = second.current_user().await?.unwrap();
        assert_eq!(other.email, "two@example.com");
        assert_eq!(other.current_credits, 25);

        Ok(())
    }

    #[tokio::test]
    async fn test_admin_console_requires_admin() -> Result<()> {
        let (mut session, _) = logged_in("plain@example.com").await?;

        let result = session.admin().list_users().await;
        assert!(matches!(result, Err(Error::AdminRequired)));

        session.logout();
        let result = session.admin().list_payment_requests().await;
        assert!(matches!(result, Err(Error::NoActiveSession)));

        Ok(())
    }

    #[tokio::test]
    async fn test_purchase_flow_through_sessions() -> Result<()> {
        let db = Arc::new(setup_test_db().await?);
        create_test_user(&db, "buyer@example.com").await?;
        create_test_admin(&db, "admin@example.com").await?;

        let mut buyer = AuthSession::in_memory(Arc::clone(&db));
        let mut admin = AuthSession::in_memory(db);
        buyer.login("buyer@example.com", TEST_PASSWORD).await?;
        admin.login("admin@example.com", TEST_PASSWORD).await?;

        let request = buyer
            .submit_payment_request(50, 199.0, "123456789012", Some("please"))
            .await?;
        assert_eq!(request.user_email, "buyer@example.com");
        assert_eq!(buyer.my_payment_requests().await?, vec![request.clone()]);

        let pending = admin.admin().list_payment_requests().await?;
        assert_eq!(pending.len(), 1);

        let approved = admin
            .admin()
            .decide_payment_request(request.id, Decision::Approve)
            .await?;
        assert_eq!(approved.status, PaymentStatus::Approved);

        let refreshed = buyer.current_user().await?.unwrap();
        assert_eq!(refreshed.daily_credit_limit, 75);
        assert_eq!(refreshed.current_credits, 75);

        let banned = admin.admin().toggle_ban(refreshed.id).await?;
        assert!(banned.is_banned);
        assert!(buyer.current_user().await?.is_none());
        let relogin = buyer.login("buyer@example.com", TEST_PASSWORD).await;
        assert!(matches!(relogin, Err(Error::AccountBanned)));

        Ok(())
    }

    #[tokio::test]
    async fn test_admin_is_not_charged_through_session() -> Result<()> {
        let db = setup_test_db().await?;
        let admin_model = create_test_admin(&db, "boss@example.com").await?;
        let mut session = AuthSession::in_memory(db);
        session.login("boss@example.com", TEST_PASSWORD).await?;

        let after = session.deduct_credit(500).await?;
        assert_eq!(after, UserProfile::from(admin_model));

        Ok(())
    }

    #[tokio::test]
    async fn test_generation_uses_configured_cost() -> Result<()> {
        let db = setup_test_db().await?;
        let mut session = AuthSession::in_memory(db).with_settings(CreditSettings {
            default_daily_limit: 10,
            generation_cost: 4,
        });
        session
            .register("Artist", "artist@example.com", TEST_PASSWORD)
            .await?;

        assert!(session.can_generate().await?);
        assert_eq!(session.charge_generation().await?.current_credits, 6);
        assert_eq!(session.charge_generation().await?.current_credits, 2);

        assert!(!session.can_generate().await?);
        let broke = session.charge_generation().await;
        assert!(matches!(
            broke,
            Err(Error::InsufficientCredits {
                current: 2,
                required: 4
            })
        ));

        session.logout();
        assert!(matches!(
            session.can_generate().await,
            Err(Error::NoActiveSession)
        ));

        Ok(())
    }
}
