use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::content::Content;
use crate::error::{Error, Result};

/// A conversation keyed by (app, user, id).
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: String,
    pub app_name: String,
    pub user_id: String,
    pub history: Vec<Content>,
    pub created_at: DateTime<Utc>,
    pub last_update_time: DateTime<Utc>,
}

impl Session {
    fn new(app_name: &str, user_id: &str, id: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            app_name: app_name.to_string(),
            user_id: user_id.to_string(),
            history: Vec::new(),
            created_at: now,
            last_update_time: now,
        }
    }
}

/// Session persistence.
#[async_trait]
pub trait SessionService: Send + Sync {
    /// `Error::SessionNotFound` if there is no such session.
    async fn get_session(&self, app_name: &str, user_id: &str, session_id: &str)
    -> Result<Session>;

    /// Create a session with `session_id`, or a generated id when `None` or empty.
    /// Creating an id that already exists returns the existing session.
    async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: Option<&str>,
    ) -> Result<Session>;

    /// Append finished turns to a session's history.
    async fn append_history(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
        contents: Vec<Content>,
    ) -> Result<()>;

    async fn list_sessions(&self, app_name: &str, user_id: &str) -> Result<Vec<Session>>;
}

type UserSessions = HashMap<String, HashMap<String, Session>>;

/// Process-local session store: app -> user -> session id -> session.
///
/// Sessions are never expired; they live as long as the process.
#[derive(Debug, Default)]
pub struct InMemorySessionService {
    sessions: RwLock<HashMap<String, UserSessions>>,
}

impl InMemorySessionService {
    pub fn new() -> Self {
        Self::default()
    }

    fn not_found(app_name: &str, user_id: &str, session_id: &str) -> Error {
        Error::SessionNotFound {
            app_name: app_name.to_string(),
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
        }
    }
}

#[async_trait]
impl SessionService for InMemorySessionService {
    async fn get_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<Session> {
        let sessions = self.sessions.read().await;
        sessions
            .get(app_name)
            .and_then(|users| users.get(user_id))
            .and_then(|user_sessions| user_sessions.get(session_id))
            .cloned()
            .ok_or_else(|| Self::not_found(app_name, user_id, session_id))
    }

    async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: Option<&str>,
    ) -> Result<Session> {
        let id = match session_id.map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(app_name.to_string())
            .or_default()
            .entry(user_id.to_string())
            .or_default()
            .entry(id.clone())
            .or_insert_with(|| {
                debug!(app_name, user_id, session_id = %id, "Created session");
                Session::new(app_name, user_id, id.clone())
            });

        Ok(session.clone())
    }

    async fn append_history(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
        contents: Vec<Content>,
    ) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(app_name)
            .and_then(|users| users.get_mut(user_id))
            .and_then(|user_sessions| user_sessions.get_mut(session_id))
            .ok_or_else(|| Self::not_found(app_name, user_id, session_id))?;

        session.history.extend(contents);
        session.last_update_time = Utc::now();
        Ok(())
    }

    async fn list_sessions(&self, app_name: &str, user_id: &str) -> Result<Vec<Session>> {
        let sessions = self.sessions.read().await;
        let mut list: Vec<Session> = sessions
            .get(app_name)
            .and_then(|users| users.get(user_id))
            .map(|user_sessions| user_sessions.values().cloned().collect())
            .unwrap_or_default();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_session_is_not_found() {
        let service = InMemorySessionService::new();

        let err = service.get_session("app", "alice", "s1").await.unwrap_err();

        assert!(matches!(err, Error::SessionNotFound { .. }));
    }

    #[tokio::test]
    async fn create_with_requested_id_is_idempotent() {
        let service = InMemorySessionService::new();

        let first = service.create_session("app", "alice", Some("s1")).await.unwrap();
        service
            .append_history("app", "alice", "s1", vec![Content::user_text("hi")])
            .await
            .unwrap();
        let second = service.create_session("app", "alice", Some("s1")).await.unwrap();

        assert_eq!(first.id, "s1");
        assert_eq!(second.id, "s1");
        assert_eq!(second.history.len(), 1);
        assert_eq!(service.list_sessions("app", "alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn blank_id_generates_one() {
        let service = InMemorySessionService::new();

        let a = service.create_session("app", "alice", None).await.unwrap();
        let b = service.create_session("app", "alice", Some("  ")).await.unwrap();

        assert_ne!(a.id, b.id);
        assert!(Uuid::parse_str(&a.id).is_ok());
    }

    #[tokio::test]
    async fn sessions_are_scoped_by_app_and_user() {
        let service = InMemorySessionService::new();
        service.create_session("app", "alice", Some("shared")).await.unwrap();

        assert!(service.get_session("app", "bob", "shared").await.is_err());
        assert!(service.get_session("other", "alice", "shared").await.is_err());
        assert!(service.list_sessions("app", "bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_to_unknown_session_fails() {
        let service = InMemorySessionService::new();

        let err = service.append_history("app", "alice", "nope", vec![]).await.unwrap_err();

        assert!(matches!(err, Error::SessionNotFound { .. }));
    }
}
