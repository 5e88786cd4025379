//! The identity seam. Author display names belong to the host's user
//! directory; the core asks for them explicitly and carries on without an
//! answer. Resolution is a plain call with a defined outcome — no polling a
//! shared cache until a value shows up.

use crate::error::Result;
use crate::model::Author;

pub trait IdentityResolver {
    /// Resolve an author id to a display profile. `Ok(None)` when the host
    /// does not know the user; an error when the lookup itself failed.
    fn resolve(&self, author_id: &str) -> Result<Option<Author>>;
}

/// Resolver for hosts without an identity service. Never knows anyone.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullResolver;

impl IdentityResolver for NullResolver {
    fn resolve(&self, _author_id: &str) -> Result<Option<Author>> {
        Ok(None)
    }
}

// --- Test Doubles ---

#[cfg(any(test, feature = "test_utils"))]
pub mod doubles {
    use std::collections::HashMap;

    use super::*;

    #[derive(Default)]
    pub struct StaticResolver {
        profiles: HashMap<String, Author>,
    }

    impl StaticResolver {
        pub fn with_profile(mut self, id: &str, name: &str) -> Self {
            self.profiles.insert(
                id.to_string(),
                Author {
                    id: id.to_string(),
                    name: name.to_string(),
                },
            );
            self
        }
    }

    impl IdentityResolver for StaticResolver {
        fn resolve(&self, author_id: &str) -> Result<Option<Author>> {
            Ok(self.profiles.get(author_id).cloned())
        }
    }
}
