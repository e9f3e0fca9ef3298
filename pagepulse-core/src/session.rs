//! Session identity
//!
//! One service instance = one session. The id is generated at construction
//! and stays stable for the lifetime of the instance, so every event it
//! produces can be correlated server-side.

use std::sync::Mutex;

use uuid::Uuid;

use crate::platform::Clock;

/// Stable identity for correlating events within one service lifetime.
pub struct SessionContext {
    id: String,
    user_id: Mutex<Option<String>>,
}

impl SessionContext {
    /// Generate a fresh session identity.
    ///
    /// The id combines a millisecond timestamp with a random suffix, so ids
    /// sort roughly by start time and collide only if two instances start in
    /// the same millisecond *and* draw the same random suffix.
    pub fn new(clock: &dyn Clock) -> Self {
        let id = format!(
            "{}-{}",
            clock.now().timestamp_millis(),
            Uuid::new_v4().simple()
        );
        Self {
            id,
            user_id: Mutex::new(None),
        }
    }

    /// The session id, immutable for the lifetime of this context.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Associate an authenticated user with the session.
    ///
    /// Affects events constructed after this call only.
    pub fn set_user_id(&self, user_id: impl Into<String>) {
        *self.user_id.lock().unwrap() = Some(user_id.into());
    }

    /// The currently associated user, if any.
    pub fn user_id(&self) -> Option<String> {
        self.user_id.lock().unwrap().clone()
    }
}
