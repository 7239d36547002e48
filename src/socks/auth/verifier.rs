//! Credential verifiers
//!
//! The engine never stores credentials itself; it asks a
//! [`CredentialVerifier`] supplied when the server is built.

use crate::config::UserEntry;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;

/// Decides whether a username/password pair is acceptable.
///
/// Implementations are shared by every session of a server and may be
/// called concurrently.
#[async_trait]
pub trait CredentialVerifier: Send + Sync + Debug {
    /// Return `true` if the credentials are valid
    async fn verify(&self, username: &str, password: &str) -> bool;
}

/// In-memory user table
#[derive(Clone, Default)]
pub struct StaticCredentials {
    users: HashMap<String, String>,
}

impl StaticCredentials {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user, builder style
    pub fn with_user(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.add_user(username, password);
        self
    }

    /// Add or replace a user
    pub fn add_user(&mut self, username: impl Into<String>, password: impl Into<String>) {
        self.users.insert(username.into(), password.into());
    }

    /// Build a table from configured users
    pub fn from_users(users: &[UserEntry]) -> Self {
        let users = users
            .iter()
            .map(|u| (u.username.clone(), u.password.clone()))
            .collect();
        StaticCredentials { users }
    }

    /// Number of users
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("users", &self.users.len())
            .finish()
    }
}

#[async_trait]
impl CredentialVerifier for StaticCredentials {
    async fn verify(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .is_some_and(|expected| expected == password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_static_credentials_verify() {
        let verifier = StaticCredentials::new().with_user("alice", "wonderland");

        assert!(verifier.verify("alice", "wonderland").await);
        assert!(!verifier.verify("alice", "wrong").await);
        assert!(!verifier.verify("bob", "wonderland").await);
    }

    #[tokio::test]
    async fn test_static_credentials_from_users() {
        let users = vec![
            UserEntry {
                username: "alice".to_string(),
                password: "a".to_string(),
            },
            UserEntry {
                username: "bob".to_string(),
                password: "b".to_string(),
            },
        ];
        let verifier = StaticCredentials::from_users(&users);
        assert_eq!(verifier.len(), 2);
        assert!(verifier.verify("bob", "b").await);
    }

    #[tokio::test]
    async fn test_verifier_shared_across_tasks() {
        let verifier: Arc<dyn CredentialVerifier> =
            Arc::new(StaticCredentials::new().with_user("user", "pass"));

        let mut handles = Vec::new();
        for i in 0..16 {
            let verifier = verifier.clone();
            handles.push(tokio::spawn(async move {
                let password = if i % 2 == 0 { "pass" } else { "nope" };
                (i, verifier.verify("user", password).await)
            }));
        }

        for handle in handles {
            let (i, ok) = handle.await.unwrap();
            assert_eq!(ok, i % 2 == 0);
        }
    }

    #[test]
    fn test_debug_hides_table() {
        let verifier = StaticCredentials::new().with_user("alice", "secret");
        let debug = format!("{:?}", verifier);
        assert!(!debug.contains("secret"));
        assert!(!debug.contains("alice"));
    }
}
