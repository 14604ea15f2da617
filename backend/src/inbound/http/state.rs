//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{
    CollaboratorAccessQuery, FixtureCollaboratorAccessQuery, FixtureGamificationCommand,
    FixtureGamificationQuery, FixtureLessonProgressCommand, FixtureLessonProgressQuery,
    FixtureLoginService, FixtureSubscriptionCommand, GamificationCommand, GamificationQuery,
    LessonProgressCommand, LessonProgressQuery, LoginService, SubscriptionCommand,
};

/// Parameter object bundling all port implementations for HTTP handlers.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub login: Arc<dyn LoginService>,
    pub progress: Arc<dyn LessonProgressCommand>,
    pub progress_query: Arc<dyn LessonProgressQuery>,
    pub gamification: Arc<dyn GamificationCommand>,
    pub gamification_query: Arc<dyn GamificationQuery>,
    pub access: Arc<dyn CollaboratorAccessQuery>,
    pub subscriptions: Arc<dyn SubscriptionCommand>,
}

impl Default for HttpStatePorts {
    fn default() -> Self {
        Self {
            login: Arc::new(FixtureLoginService),
            progress: Arc::new(FixtureLessonProgressCommand),
            progress_query: Arc::new(FixtureLessonProgressQuery),
            gamification: Arc::new(FixtureGamificationCommand),
            gamification_query: Arc::new(FixtureGamificationQuery),
            access: Arc::new(FixtureCollaboratorAccessQuery),
            subscriptions: Arc::new(FixtureSubscriptionCommand),
        }
    }
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub login: Arc<dyn LoginService>,
    pub progress: Arc<dyn LessonProgressCommand>,
    pub progress_query: Arc<dyn LessonProgressQuery>,
    pub gamification: Arc<dyn GamificationCommand>,
    pub gamification_query: Arc<dyn GamificationQuery>,
    pub access: Arc<dyn CollaboratorAccessQuery>,
    pub subscriptions: Arc<dyn SubscriptionCommand>,
}

impl From<HttpStatePorts> for HttpState {
    fn from(ports: HttpStatePorts) -> Self {
        Self::new(ports)
    }
}

impl HttpState {
    /// Construct state from a ports bundle.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use academy::domain::ports::FixtureLessonProgressCommand;
    /// use academy::inbound::http::state::{HttpState, HttpStatePorts};
    ///
    /// let state = HttpState::new(HttpStatePorts {
    ///     progress: Arc::new(FixtureLessonProgressCommand),
    ///     ..HttpStatePorts::default()
    /// });
    /// let _login = state.login.clone();
    /// ```
    pub fn new(ports: HttpStatePorts) -> Self {
        let HttpStatePorts {
            login,
            progress,
            progress_query,
            gamification,
            gamification_query,
            access,
            subscriptions,
        } = ports;
        Self {
            login,
            progress,
            progress_query,
            gamification,
            gamification_query,
            access,
            subscriptions,
        }
    }
}
