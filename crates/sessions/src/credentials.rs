//! Most-recent credential set known for one user.

use parking_lot::RwLock;

use cb_domain::credentials::CredentialSet;

#[derive(Debug, Default)]
pub struct CredentialCache {
    current: RwLock<Option<CredentialSet>>,
}

impl CredentialCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<CredentialSet> {
        self.current.read().clone()
    }

    /// Replace the cached set wholesale.
    pub fn replace(&self, credentials: CredentialSet) {
        *self.current.write() = Some(credentials);
    }

    pub fn clear(&self) {
        *self.current.write() = None;
    }

    pub fn is_empty(&self) -> bool {
        self.current.read().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(token: &str) -> CredentialSet {
        CredentialSet {
            access_token: token.into(),
            refresh_token: String::new(),
            token_type: "Bearer".into(),
            expiry_unix: 0,
        }
    }

    #[test]
    fn starts_empty() {
        let cache = CredentialCache::new();
        assert!(cache.is_empty());
        assert!(cache.get().is_none());
    }

    #[test]
    fn replace_swaps_whole_set() {
        let cache = CredentialCache::new();
        cache.replace(creds("first"));
        cache.replace(creds("second"));
        assert_eq!(cache.get().unwrap().access_token, "second");
        cache.clear();
        assert!(cache.is_empty());
    }
}
