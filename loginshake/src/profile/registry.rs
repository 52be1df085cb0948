//! Global registry for looking up login profiles by name.

use std::sync::RwLock;

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use super::LoginProfile;
use super::vendors;
use crate::error::{ProfileError, Result};

static REGISTRY: Lazy<RwLock<ProfileRegistry>> = Lazy::new(|| {
    let mut registry = ProfileRegistry::new();
    registry.register_builtin_profiles();
    RwLock::new(registry)
});

/// Registry of login profiles, in registration order.
#[derive(Debug, Default)]
pub struct ProfileRegistry {
    profiles: IndexMap<String, LoginProfile>,
}

impl ProfileRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry, seeded with the built-in profiles.
    pub fn global() -> &'static RwLock<ProfileRegistry> {
        &REGISTRY
    }

    fn register_builtin_profiles(&mut self) {
        for profile in [vendors::cyberpower::profile(), vendors::generic::profile()] {
            self.profiles.insert(profile.name.clone(), profile);
        }
    }

    /// Register a profile. Names are unique.
    pub fn register(&mut self, profile: LoginProfile) -> Result<()> {
        if self.profiles.contains_key(&profile.name) {
            return Err(ProfileError::AlreadyRegistered { name: profile.name }.into());
        }
        self.profiles.insert(profile.name.clone(), profile);
        Ok(())
    }

    /// Get a profile by name.
    pub fn get(&self, name: &str) -> Option<&LoginProfile> {
        self.profiles.get(name)
    }

    /// Check if a profile is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    /// All registered profile names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    /// Clone a profile out of the global registry.
    pub fn lookup(name: &str) -> Result<LoginProfile> {
        let registry = Self::global()
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        registry
            .get(name)
            .cloned()
            .ok_or_else(|| ProfileError::UnknownProfile { name: name.into() }.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_builtins_in_order() {
        let mut registry = ProfileRegistry::new();
        registry.register_builtin_profiles();
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["cyberpower_os", "generic"]);
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = ProfileRegistry::new();
        registry.register(LoginProfile::new("pdu")).unwrap();
        assert!(registry.contains("pdu"));

        let err = registry.register(LoginProfile::new("pdu")).unwrap_err();
        assert!(matches!(
            err,
            Error::Profile(ProfileError::AlreadyRegistered { ref name }) if name == "pdu"
        ));
    }

    #[test]
    fn test_global_lookup() {
        let profile = ProfileRegistry::lookup("cyberpower_os").unwrap();
        assert_eq!(profile.login.patterns.username_pattern, "Login Name");

        let err = ProfileRegistry::lookup("no_such_device").unwrap_err();
        assert!(matches!(
            err,
            Error::Profile(ProfileError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn test_global_register() {
        {
            let mut registry = ProfileRegistry::global().write().unwrap();
            registry
                .register(LoginProfile::new("registry_test_rack_ups"))
                .unwrap();
        }
        assert!(ProfileRegistry::lookup("registry_test_rack_ups").is_ok());
    }
}
