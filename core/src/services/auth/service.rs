//! Account and session service

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use validator::Validate;

use nest_shared::config::AuthConfig;
use nest_shared::validation::{normalize_email, validators};

use crate::domain::entities::user::{
    placeholder_avatar, ProfileUpdate, SignupRequest, User, UserRole, VerificationStatus,
};
use crate::domain::value_objects::Actor;
use crate::errors::{AuthError, DomainError, DomainResult};
use crate::repositories::document::{
    encode, run_transaction, Collection, DocumentStore, Fields, WriteBatch,
};
use crate::repositories::kv::KeyValueStore;
use crate::services::access::authorize;
use crate::services::mirror::{decode_all, RealtimeMirror};

use super::password::{hash_password, verify_password};

/// Attempts for read-modify-write updates of a single user document
const USER_WRITE_ATTEMPTS: u32 = 3;

/// Document id of the bootstrapped super-admin
pub const SUPER_ADMIN_ID: &str = "super-admin";

fn to_fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        _ => Fields::new(),
    }
}

/// Authentication and session service
///
/// Holds a realtime mirror of the user roster and the current session. Every
/// roster change re-resolves the session: if the session user disappears or
/// gets disabled, the session is cleared without any explicit logout.
pub struct AuthService {
    store: Arc<dyn DocumentStore>,
    kv: Arc<dyn KeyValueStore>,
    config: AuthConfig,
    roster: RealtimeMirror<User>,
    session: Arc<watch::Sender<Option<User>>>,
    session_listener: JoinHandle<()>,
}

impl AuthService {
    /// Attach to the users collection and restore the persisted session
    ///
    /// # Arguments
    ///
    /// * `store` - Remote document database
    /// * `kv` - Local key-value store holding the session pointer
    /// * `config` - Hashing cost, session key and super-admin bootstrap
    pub async fn start(
        store: Arc<dyn DocumentStore>,
        kv: Arc<dyn KeyValueStore>,
        config: AuthConfig,
    ) -> DomainResult<Self> {
        let stream = store.subscribe(Collection::Users);
        let mut documents = store.list(Collection::Users).await?;

        let users = decode_all::<User>(Collection::Users, &documents);
        if !users.iter().any(User::is_super_admin) {
            bootstrap_super_admin(store.as_ref(), &config, &users).await?;
            documents = store.list(Collection::Users).await?;
        }

        let roster = RealtimeMirror::<User>::attach(Collection::Users, stream, &documents);

        let restored = match kv.get(&config.session_key).await? {
            Some(user_id) => {
                let user = roster
                    .current()
                    .iter()
                    .find(|u| u.id == user_id && !u.is_disabled)
                    .cloned();
                if user.is_none() {
                    warn!(user_id = %user_id, "Discarding stale session");
                    kv.remove(&config.session_key).await?;
                }
                user
            }
            None => None,
        };
        if let Some(user) = &restored {
            info!(user_id = %user.id, "Session restored");
        }

        let (session, _) = watch::channel(restored);
        let session = Arc::new(session);
        let session_listener = spawn_session_listener(
            roster.subscribe(),
            session.clone(),
            store.clone(),
            kv.clone(),
            config.session_key.clone(),
        );

        Ok(Self {
            store,
            kv,
            config,
            roster,
            session,
            session_listener,
        })
    }

    /// Detach from the users collection
    pub fn stop(&self) {
        self.session_listener.abort();
        self.roster.detach();
    }

    /// The logged-in user, if any
    pub fn current_user(&self) -> Option<User> {
        self.session.borrow().clone()
    }

    /// Observe logins, logouts and forced invalidations
    pub fn subscribe_session(&self) -> watch::Receiver<Option<User>> {
        self.session.subscribe()
    }

    /// The mirrored user roster
    pub fn users(&self) -> Arc<Vec<User>> {
        self.roster.current()
    }

    pub fn subscribe_users(&self) -> watch::Receiver<Arc<Vec<User>>> {
        self.roster.subscribe()
    }

    /// Capability token of the logged-in user
    pub fn actor(&self) -> DomainResult<Actor> {
        match self.session.borrow().as_ref() {
            Some(user) if user.is_disabled => Err(DomainError::Unauthorized),
            Some(user) => Ok(Actor::from_user(user)),
            None => Err(DomainError::Unauthorized),
        }
    }

    /// Create an account and log it in
    pub async fn signup(&self, request: SignupRequest) -> DomainResult<User> {
        request.validate()?;
        if request.role.is_admin() {
            warn!(role = ?request.role, "Refusing self-assigned admin role");
            return Err(AuthError::InsufficientPermissions.into());
        }

        let email = normalize_email(&request.email);
        // Accounts older than the email index are only found by a scan
        if self.find_by_email(&email).await?.is_some() {
            warn!(email = %email, "Signup with existing email");
            return Err(AuthError::UserAlreadyExists.into());
        }

        let id = Uuid::new_v4().simple().to_string();
        let name = request.name.trim().to_string();
        let user = User {
            id: id.clone(),
            avatar_url: placeholder_avatar(&name),
            name,
            email,
            password_hash: hash_password(&request.password, self.config.bcrypt_cost).await?,
            role: request.role,
            phone: None,
            bio: None,
            verification_status: VerificationStatus::Unverified,
            id_document: None,
            wishlist: Vec::new(),
            is_disabled: false,
            created_at: None,
        };
        let batch = WriteBatch::new()
            .create(Collection::UserEmails, &user.email, email_entry(&id))
            .create(Collection::Users, &id, encode(&user)?);
        match self.store.commit(batch).await {
            Ok(()) => {}
            Err(DomainError::Conflict { .. }) => {
                warn!(email = %user.email, "Signup lost the race for its email");
                return Err(AuthError::UserAlreadyExists.into());
            }
            Err(e) => return Err(e),
        }
        let user = self.load_user(&id).await?;

        info!(user_id = %user.id, role = ?user.role, "User signed up");
        self.begin_session(&user).await?;
        Ok(user)
    }

    /// Log in by email and password
    pub async fn login(&self, email: &str, password: &str) -> DomainResult<User> {
        let email = normalize_email(email);
        let user = match self.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                warn!(email = %email, "Login for unknown email");
                return Err(AuthError::UserNotFound.into());
            }
        };
        if user.is_disabled {
            warn!(user_id = %user.id, "Login to disabled account");
            return Err(AuthError::AccountDisabled.into());
        }
        if !verify_password(password, &user.password_hash).await? {
            warn!(user_id = %user.id, "Login with incorrect password");
            return Err(AuthError::IncorrectPassword.into());
        }

        info!(user_id = %user.id, "User logged in");
        self.begin_session(&user).await?;
        Ok(user)
    }

    /// End the session
    pub async fn logout(&self) -> DomainResult<()> {
        self.kv.remove(&self.config.session_key).await?;
        if let Some(user) = self.session.send_replace(None) {
            info!(user_id = %user.id, "User logged out");
        }
        Ok(())
    }

    /// Add or remove a property from the actor's wishlist. Returns the new
    /// membership.
    pub async fn toggle_wishlist(&self, actor: &Actor, property_id: &str) -> DomainResult<bool> {
        authorize(self.store.as_ref(), actor).await?;
        let added = self
            .mutate_user(actor.user_id(), |user| {
                let mut user = user.clone();
                let added = user.toggle_wishlist(property_id);
                Ok((to_fields(json!({ "wishlist": user.wishlist })), added))
            })
            .await?;
        debug!(user_id = actor.user_id(), property_id, added, "Wishlist toggled");
        Ok(added)
    }

    /// Update the actor's own profile
    pub async fn update_profile(&self, actor: &Actor, update: ProfileUpdate) -> DomainResult<User> {
        update.validate()?;
        authorize(self.store.as_ref(), actor).await?;
        let mut fields = Fields::new();
        if let Some(name) = &update.name {
            fields.insert("name".to_string(), json!(name.trim()));
        }
        if let Some(avatar_url) = &update.avatar_url {
            if !validators::is_valid_photo_ref(avatar_url) {
                return Err(DomainError::Validation {
                    message: "invalid fields: avatar_url".to_string(),
                });
            }
            fields.insert("avatar_url".to_string(), json!(avatar_url));
        }
        if let Some(phone) = &update.phone {
            fields.insert("phone".to_string(), json!(phone.trim()));
        }
        if let Some(bio) = &update.bio {
            fields.insert("bio".to_string(), json!(bio));
        }

        let fields = &fields;
        self.mutate_user(actor.user_id(), |_| Ok((fields.clone(), ())))
            .await?;
        let user = self.load_user(actor.user_id()).await?;
        self.refresh_session(&user);
        info!(user_id = %user.id, "Profile updated");
        Ok(user)
    }

    /// Submit an identity document for review
    pub async fn submit_verification(&self, actor: &Actor, id_document: &str) -> DomainResult<()> {
        if !validators::is_valid_photo_ref(id_document) {
            return Err(DomainError::Validation {
                message: "invalid fields: id_document".to_string(),
            });
        }
        authorize(self.store.as_ref(), actor).await?;
        self.mutate_user(actor.user_id(), |user| match user.verification_status {
            VerificationStatus::Pending | VerificationStatus::Verified => Err(DomainError::rule(
                format!("verification is already {:?}", user.verification_status).to_lowercase(),
            )),
            _ => Ok((
                to_fields(json!({
                    "verification_status": VerificationStatus::Pending,
                    "id_document": id_document,
                })),
                (),
            )),
        })
        .await?;
        info!(user_id = actor.user_id(), "Verification submitted");
        Ok(())
    }

    /// Approve or reject a pending verification (admin)
    pub async fn decide_verification(
        &self,
        actor: &Actor,
        user_id: &str,
        approve: bool,
    ) -> DomainResult<VerificationStatus> {
        authorize(self.store.as_ref(), actor).await?;
        actor.require_admin()?;
        let decision = if approve {
            VerificationStatus::Verified
        } else {
            VerificationStatus::Rejected
        };
        self.mutate_user(user_id, |user| {
            if user.verification_status != VerificationStatus::Pending {
                return Err(DomainError::rule("no verification is pending"));
            }
            Ok((to_fields(json!({ "verification_status": decision })), ()))
        })
        .await?;
        info!(admin_id = actor.user_id(), user_id, status = ?decision, "Verification decided");
        Ok(decision)
    }

    /// Switch the actor between guest and host
    pub async fn switch_role(&self, actor: &Actor) -> DomainResult<UserRole> {
        authorize(self.store.as_ref(), actor).await?;
        let role = self
            .mutate_user(actor.user_id(), |user| {
                let next = match user.role {
                    UserRole::Guest => UserRole::Host,
                    UserRole::Host => UserRole::Guest,
                    _ => return Err(DomainError::rule("administrators cannot switch role")),
                };
                Ok((to_fields(json!({ "role": next })), next))
            })
            .await?;
        let user = self.load_user(actor.user_id()).await?;
        self.refresh_session(&user);
        info!(user_id = actor.user_id(), role = ?role, "Role switched");
        Ok(role)
    }

    /// Change another user's role (admin). The super-admin role can be
    /// neither granted nor revoked.
    pub async fn change_role(&self, actor: &Actor, user_id: &str, role: UserRole) -> DomainResult<()> {
        authorize(self.store.as_ref(), actor).await?;
        actor.require_admin()?;
        if role == UserRole::SuperAdmin {
            return Err(DomainError::rule("the super-admin role cannot be granted"));
        }
        self.mutate_user(user_id, |user| {
            if user.is_super_admin() {
                return Err(DomainError::rule("the super-admin role cannot be revoked"));
            }
            Ok((to_fields(json!({ "role": role })), ()))
        })
        .await?;
        info!(admin_id = actor.user_id(), user_id, role = ?role, "Role changed");
        Ok(())
    }

    /// Disable or re-enable an account (admin)
    ///
    /// # Returns
    /// * `Ok(true)` - The flag was written
    /// * `Ok(false)` - The target is the super-admin; nothing changed
    pub async fn set_disabled(&self, actor: &Actor, user_id: &str, disabled: bool) -> DomainResult<bool> {
        authorize(self.store.as_ref(), actor).await?;
        actor.require_admin()?;
        let user = self.load_user(user_id).await?;
        if user.is_super_admin() {
            warn!(admin_id = actor.user_id(), user_id, "Refusing to disable the super-admin");
            return Ok(false);
        }
        self.store
            .merge(Collection::Users, user_id, to_fields(json!({ "is_disabled": disabled })))
            .await
            .map_err(|e| {
                error!(user_id, error = %e, "Failed to update disabled flag");
                e
            })?;
        info!(admin_id = actor.user_id(), user_id, disabled, "Account disabled flag set");
        Ok(true)
    }

    /// Delete an account (admin)
    ///
    /// # Returns
    /// * `Ok(true)` - The account was deleted
    /// * `Ok(false)` - The target is the super-admin; nothing changed
    pub async fn delete_user(&self, actor: &Actor, user_id: &str) -> DomainResult<bool> {
        authorize(self.store.as_ref(), actor).await?;
        actor.require_admin()?;
        let user = self.load_user(user_id).await?;
        if user.is_super_admin() {
            warn!(admin_id = actor.user_id(), user_id, "Refusing to delete the super-admin");
            return Ok(false);
        }
        let mut batch = WriteBatch::new().delete(Collection::Users, user_id);
        if email_owner(self.store.as_ref(), &user.email).await?.as_deref() == Some(user_id) {
            batch = batch.delete(Collection::UserEmails, &user.email);
        }
        self.store.commit(batch).await.map_err(|e| {
            error!(user_id, error = %e, "Failed to delete user");
            e
        })?;
        info!(admin_id = actor.user_id(), user_id, "User deleted");
        Ok(true)
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let documents = self.store.list(Collection::Users).await?;
        Ok(decode_all::<User>(Collection::Users, &documents)
            .into_iter()
            .find(|u| u.email == email))
    }

    async fn load_user(&self, user_id: &str) -> DomainResult<User> {
        match self.store.get(Collection::Users, user_id).await? {
            Some(document) => document.decode(),
            None => Err(AuthError::UserNotFound.into()),
        }
    }

    /// Read-modify-write of one user document, pinned to the version read.
    /// Disabled accounts cannot be modified this way.
    async fn mutate_user<F, T>(&self, user_id: &str, apply: F) -> DomainResult<T>
    where
        F: Fn(&User) -> DomainResult<(Fields, T)>,
    {
        let apply = &apply;
        let store = self.store.clone();
        let user_id = user_id.to_string();
        run_transaction(self.store.as_ref(), USER_WRITE_ATTEMPTS, move || {
            let store = store.clone();
            let user_id = user_id.clone();
            async move {
                let document = store
                    .get(Collection::Users, &user_id)
                    .await?
                    .ok_or(DomainError::Auth(AuthError::UserNotFound))?;
                let user: User = document.decode()?;
                if user.is_disabled {
                    return Err(AuthError::AccountDisabled.into());
                }
                let (fields, output) = apply(&user)?;
                let batch = WriteBatch::new().merge_at_version(
                    Collection::Users,
                    &user_id,
                    document.version,
                    fields,
                );
                Ok((batch, output))
            }
        })
        .await
    }

    async fn begin_session(&self, user: &User) -> DomainResult<()> {
        self.kv.set(&self.config.session_key, &user.id).await?;
        self.session.send_replace(Some(user.clone()));
        Ok(())
    }

    fn refresh_session(&self, user: &User) {
        self.session.send_if_modified(|session| match session {
            Some(current) if current.id == user.id && current != user => {
                *current = user.clone();
                true
            }
            _ => false,
        });
    }
}

impl Drop for AuthService {
    fn drop(&mut self) {
        self.session_listener.abort();
    }
}

fn email_entry(user_id: &str) -> Fields {
    to_fields(json!({ "user_id": user_id }))
}

/// User id an email is reserved for, if any
async fn email_owner(store: &dyn DocumentStore, email: &str) -> DomainResult<Option<String>> {
    Ok(store
        .get(Collection::UserEmails, email)
        .await?
        .and_then(|d| d.fields.get("user_id").and_then(Value::as_str).map(str::to_string)))
}

async fn promote_to_super_admin(store: &dyn DocumentStore, user_id: &str) -> DomainResult<()> {
    store
        .merge(
            Collection::Users,
            user_id,
            to_fields(json!({ "role": UserRole::SuperAdmin, "is_disabled": false })),
        )
        .await?;
    info!(user_id, "Promoted existing account to super-admin");
    Ok(())
}

/// Create the super-admin under [`SUPER_ADMIN_ID`], or promote the account
/// that already holds the configured email. Processes starting together
/// race on the fixed id, so at most one of them creates it.
async fn bootstrap_super_admin(
    store: &dyn DocumentStore,
    config: &AuthConfig,
    users: &[User],
) -> DomainResult<()> {
    if config.is_using_default_admin_password() {
        warn!("Super-admin is bootstrapped with the default password");
    }
    let email = normalize_email(&config.super_admin_email);

    if let Some(existing) = users.iter().find(|u| u.email == email) {
        return promote_to_super_admin(store, &existing.id).await;
    }

    let admin = User {
        id: SUPER_ADMIN_ID.to_string(),
        name: config.super_admin_name.clone(),
        avatar_url: placeholder_avatar(&config.super_admin_name),
        email,
        password_hash: hash_password(&config.super_admin_password, config.bcrypt_cost).await?,
        role: UserRole::SuperAdmin,
        phone: None,
        bio: None,
        verification_status: VerificationStatus::Verified,
        id_document: None,
        wishlist: Vec::new(),
        is_disabled: false,
        created_at: None,
    };
    let batch = WriteBatch::new()
        .create(Collection::UserEmails, &admin.email, email_entry(SUPER_ADMIN_ID))
        .create(Collection::Users, SUPER_ADMIN_ID, encode(&admin)?);
    match store.commit(batch).await {
        Ok(()) => {
            info!(user_id = SUPER_ADMIN_ID, "Super-admin bootstrapped");
            Ok(())
        }
        Err(err @ DomainError::Conflict { .. }) => {
            if store.get(Collection::Users, SUPER_ADMIN_ID).await?.is_some() {
                info!("Super-admin was bootstrapped by another process");
                return Ok(());
            }
            // The email was taken by a signup since the roster was read
            match email_owner(store, &admin.email).await? {
                Some(owner) => promote_to_super_admin(store, &owner).await,
                None => Err(err),
            }
        }
        Err(err) => Err(err),
    }
}

/// Re-resolve the session on every roster change.
///
/// The roster snapshot may trail a login that just happened, so a user
/// missing from it is confirmed against the store before the session is
/// dropped.
fn spawn_session_listener(
    mut roster: watch::Receiver<Arc<Vec<User>>>,
    session: Arc<watch::Sender<Option<User>>>,
    store: Arc<dyn DocumentStore>,
    kv: Arc<dyn KeyValueStore>,
    session_key: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while roster.changed().await.is_ok() {
            let users = roster.borrow_and_update().clone();
            let Some(session_id) = session.borrow().as_ref().map(|u| u.id.clone()) else {
                continue;
            };

            let resolved = match users.iter().find(|u| u.id == session_id) {
                Some(user) => Some(user.clone()),
                None => match store.get(Collection::Users, &session_id).await {
                    Ok(document) => document.and_then(|d| d.decode::<User>().ok()),
                    Err(e) => {
                        error!(user_id = %session_id, error = %e, "Failed to re-resolve session");
                        continue;
                    }
                },
            };

            match resolved {
                Some(user) if !user.is_disabled => {
                    session.send_if_modified(|current| match current {
                        Some(current) if current.id == user.id && *current != user => {
                            *current = user;
                            true
                        }
                        _ => false,
                    });
                }
                _ => {
                    // A login for someone else may have happened meanwhile
                    let invalidated = session.send_if_modified(|current| {
                        if current.as_ref().map(|u| u.id.as_str()) == Some(session_id.as_str()) {
                            *current = None;
                            true
                        } else {
                            false
                        }
                    });
                    if invalidated {
                        warn!(user_id = %session_id, "Session invalidated by roster change");
                        if let Err(e) = kv.remove(&session_key).await {
                            error!(error = %e, "Failed to clear persisted session");
                        }
                    }
                }
            }
        }
    })
}
