//! Learner session extractor.
//!
//! The private session cookie carries only the learner's id. Handlers take a
//! [`LearnerSession`] and never touch Actix session storage directly.

use std::future::{Ready, ready};

use actix_session::{Session, SessionExt};
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use tracing::warn;

use crate::domain::{Error, UserId};

const LEARNER_KEY: &str = "learner_id";

/// Session of the learner making the request.
#[derive(Clone)]
pub struct LearnerSession(Session);

impl LearnerSession {
    /// Bind the session to `user_id`, issuing a fresh session id so a cookie
    /// planted before login is never promoted.
    pub fn sign_in(&self, user_id: &UserId) -> Result<(), Error> {
        self.0.renew();
        self.0
            .insert(LEARNER_KEY, user_id.to_string())
            .map_err(|error| Error::internal(format!("failed to write session: {error}")))
    }

    /// Learner bound to the session, or `401 Unauthorized`.
    ///
    /// A stored value that is not a user id is treated as tampering: the
    /// session is purged so the client drops the cookie.
    pub fn require_learner(&self) -> Result<UserId, Error> {
        let stored = self
            .0
            .get::<String>(LEARNER_KEY)
            .map_err(|error| Error::internal(format!("failed to read session: {error}")))?;
        let Some(raw) = stored else {
            return Err(Error::unauthorized("login required"));
        };
        UserId::new(&raw).map_err(|error| {
            warn!(%error, "discarding session with malformed learner id");
            self.0.purge();
            Error::unauthorized("login required")
        })
    }
}

impl FromRequest for LearnerSession {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(Self(req.get_session())))
    }
}
