//! Registered-user lookup used to route forwarded INVITEs

use std::net::SocketAddr;

use dashmap::DashMap;

/// Resolves a SIP user part to the address its INVITEs should go to
pub trait UserDirectory: Send + Sync {
    fn resolve(&self, user: &str) -> Option<SocketAddr>;
}

/// In-memory directory, safe to share between tasks
#[derive(Debug, Default)]
pub struct StaticDirectory {
    users: DashMap<String, SocketAddr>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user's address, returning the previous one
    pub fn insert(&self, user: impl Into<String>, addr: SocketAddr) -> Option<SocketAddr> {
        self.users.insert(user.into(), addr)
    }

    pub fn remove(&self, user: &str) -> Option<SocketAddr> {
        self.users.remove(user).map(|(_, addr)| addr)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl UserDirectory for StaticDirectory {
    fn resolve(&self, user: &str) -> Option<SocketAddr> {
        self.users.get(user).map(|entry| *entry.value())
    }
}

impl<S: Into<String>> FromIterator<(S, SocketAddr)> for StaticDirectory {
    fn from_iter<I: IntoIterator<Item = (S, SocketAddr)>>(iter: I) -> Self {
        StaticDirectory {
            users: iter.into_iter().map(|(user, addr)| (user.into(), addr)).collect(),
        }
    }
}
