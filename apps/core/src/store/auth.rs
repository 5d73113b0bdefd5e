// Auth adapter: session state machine over the platform's auth surface.
// The slot behind it updates user and flag together under one lock write, so
// readers never observe a half-applied transition.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::StoreInner;
use crate::errors::StoreError;
use crate::models::PlatformUser;
use crate::platform::{decode, PlatformError};

/// Shown when a sign-in failure carries no usable message of its own.
const AUTH_FAILED_FALLBACK: &str = "Authentication failed";

/// Lifecycle phase of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthPhase {
    #[default]
    Anonymous,
    /// A sign-in attempt is in flight.
    Authenticating,
    Authenticated,
    /// The last sign-in attempt failed. Authorization-wise this behaves
    /// like `Anonymous`.
    AuthFailed,
}

/// Snapshot consumers read. Both fields come from the same lock write, so
/// `is_authenticated` implies `user.is_some()` and vice versa.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub user: Option<PlatformUser>,
    pub is_authenticated: bool,
}

/// Navigation decision for a guarded surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    Allow,
    /// Route through sign-in first, then resume at `next`.
    SignInRequired { next: String },
}

#[derive(Debug, Default)]
pub(crate) struct AuthSlot {
    phase: AuthPhase,
    user: Option<PlatformUser>,
    /// Last sign-in failure message. Survives status checks; cleared when a
    /// new attempt starts or on request.
    error: Option<String>,
}

impl AuthSlot {
    fn snapshot(&self) -> AuthState {
        AuthState {
            user: self.user.clone(),
            is_authenticated: self.phase == AuthPhase::Authenticated,
        }
    }
}

pub struct Auth {
    pub(crate) inner: Arc<StoreInner>,
}

impl Auth {
    /// Starts an interactive sign-in and refreshes the session on success.
    /// Silently does nothing while the binding is not ready. On failure the
    /// slot lands in `AuthFailed` with a display message derived from the
    /// platform's error payload.
    pub async fn sign_in(&self) -> Result<(), StoreError> {
        let Some(platform) = self.inner.platform() else {
            debug!("sign_in ignored: platform binding not ready");
            return Ok(());
        };

        self.update_slot(|slot| {
            slot.phase = AuthPhase::Authenticating;
            slot.error = None;
        });

        let attempt = async {
            platform.auth_sign_in().await?;
            check_status(&self.inner).await?;
            Ok::<(), StoreError>(())
        }
        .await;

        if let Err(error) = attempt {
            let message = sign_in_error_message(&error);
            warn!("sign-in failed: {message}");
            self.update_slot(|slot| {
                slot.phase = AuthPhase::AuthFailed;
                slot.user = None;
                slot.error = Some(message.clone());
            });
            return Err(StoreError::Auth(message));
        }
        Ok(())
    }

    /// Ends the platform session. Local state is cleared only after the
    /// platform call succeeds, so a failed sign-out keeps the session.
    pub async fn sign_out(&self) -> Result<(), StoreError> {
        let Some(platform) = self.inner.platform() else {
            debug!("sign_out ignored: platform binding not ready");
            return Ok(());
        };
        platform.auth_sign_out().await?;
        self.update_slot(|slot| {
            slot.phase = AuthPhase::Anonymous;
            slot.user = None;
        });
        info!("signed out");
        Ok(())
    }

    /// Asks the platform whether a session exists and replaces the local
    /// snapshot with the answer. Returns the signed-in flag; `false` while
    /// the binding is not ready.
    pub async fn check_auth_status(&self) -> Result<bool, StoreError> {
        check_status(&self.inner).await
    }

    pub fn state(&self) -> AuthState {
        self.inner.auth.read().expect("auth slot poisoned").snapshot()
    }

    pub fn phase(&self) -> AuthPhase {
        self.inner.auth.read().expect("auth slot poisoned").phase
    }

    /// Retained sign-in failure message, if any.
    pub fn error(&self) -> Option<String> {
        self.inner.auth.read().expect("auth slot poisoned").error.clone()
    }

    pub fn clear_error(&self) {
        self.update_slot(|slot| {
            slot.error = None;
            if slot.phase == AuthPhase::AuthFailed {
                slot.phase = AuthPhase::Anonymous;
            }
        });
    }

    /// True while a sign-in attempt is in flight.
    pub fn is_authenticating(&self) -> bool {
        self.phase() == AuthPhase::Authenticating
    }

    /// Navigation guard for a protected surface: pass when authenticated,
    /// otherwise redirect through sign-in and come back to `next`.
    pub fn gate(&self, next: &str) -> Gate {
        if self.state().is_authenticated {
            Gate::Allow
        } else {
            Gate::SignInRequired {
                next: next.to_string(),
            }
        }
    }

    fn update_slot(&self, update: impl FnOnce(&mut AuthSlot)) {
        let mut slot = self.inner.auth.write().expect("auth slot poisoned");
        update(&mut slot);
    }
}

/// Display message for a failed sign-in: the platform's short `msg` field
/// first, then its generic `message`, then a fixed fallback.
fn sign_in_error_message(error: &StoreError) -> String {
    match error {
        StoreError::Platform(PlatformError::Api { payload, .. }) => payload
            .best_message()
            .unwrap_or(AUTH_FAILED_FALLBACK)
            .to_string(),
        other => other.to_string(),
    }
}

/// Shared status check used by the public operation and by the probe's
/// post-adoption refresh.
pub(crate) async fn check_status(inner: &Arc<StoreInner>) -> Result<bool, StoreError> {
    let Some(platform) = inner.platform() else {
        debug!("check_auth_status ignored: platform binding not ready");
        return Ok(false);
    };

    let signed_in = match platform.auth_is_signed_in().await {
        Ok(signed_in) => signed_in,
        Err(error) => {
            clear_session(inner);
            return Err(error.into());
        }
    };
    if !signed_in {
        clear_session(inner);
        debug!("auth status: signed out");
        return Ok(false);
    }

    let raw = match platform.auth_get_user().await {
        Ok(raw) => raw,
        Err(error) => {
            clear_session(inner);
            return Err(error.into());
        }
    };
    let user: PlatformUser = match decode("user profile", raw) {
        Ok(user) => user,
        Err(error) => {
            clear_session(inner);
            return Err(error);
        }
    };

    debug!(user = %user.id, "auth status: signed in");
    let mut slot = inner.auth.write().expect("auth slot poisoned");
    slot.phase = AuthPhase::Authenticated;
    slot.user = Some(user);
    Ok(true)
}

/// Any failed or negative status check leaves a clean anonymous session
/// rather than a stale authenticated one.
fn clear_session(inner: &Arc<StoreInner>) {
    let mut slot = inner.auth.write().expect("auth slot poisoned");
    if slot.phase != AuthPhase::AuthFailed {
        slot.phase = AuthPhase::Anonymous;
    }
    slot.user = None;
}
