//! API credential resolution
//!
//! The credential is looked up through an ordered list of environment
//! variables; a manually supplied key takes precedence over all of them.

/// Environment variables consulted, in order
pub const CREDENTIAL_SOURCES: &[&str] = &["GEMINI_API_KEY", "API_KEY", "VITE_API_KEY", "GOOGLE_API_KEY"];

/// Where a resolved credential came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialOrigin {
    Manual,
    Environment(String),
}

/// A resolved API key
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub origin: CredentialOrigin,
    secret: String,
}

impl Credential {
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("origin", &self.origin)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Ordered credential lookup with an optional manual override
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    sources: Vec<String>,
    manual: Option<String>,
}

impl Default for CredentialResolver {
    fn default() -> Self {
        Self::new(CREDENTIAL_SOURCES.iter().map(|s| s.to_string()).collect())
    }
}

impl CredentialResolver {
    pub fn new(sources: Vec<String>) -> Self {
        Self {
            sources,
            manual: None,
        }
    }

    /// Resolver whose manual key beats every environment source
    pub fn with_override(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.manual = non_blank(&key).map(str::to_string);
        self
    }

    pub fn has_override(&self) -> bool {
        self.manual.is_some()
    }

    /// Resolve against the process environment
    pub fn resolve(&self) -> Option<Credential> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Resolve against an arbitrary lookup, skipping blank values
    pub fn resolve_with<F>(&self, lookup: F) -> Option<Credential>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = &self.manual {
            return Some(Credential {
                origin: CredentialOrigin::Manual,
                secret: key.clone(),
            });
        }

        self.sources.iter().find_map(|name| {
            let value = lookup(name)?;
            let secret = non_blank(&value)?.to_string();
            Some(Credential {
                origin: CredentialOrigin::Environment(name.clone()),
                secret,
            })
        })
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_nothing_configured() {
        let resolver = CredentialResolver::default();
        assert_eq!(resolver.resolve_with(env(&[])), None);
    }

    #[test]
    fn test_falls_through_sources_in_order() {
        let resolver = CredentialResolver::default();
        let credential = resolver
            .resolve_with(env(&[("VITE_API_KEY", "vite"), ("GOOGLE_API_KEY", "google")]))
            .unwrap();

        assert_eq!(credential.secret(), "vite");
        assert_eq!(
            credential.origin,
            CredentialOrigin::Environment("VITE_API_KEY".to_string())
        );
    }

    #[test]
    fn test_blank_values_are_skipped() {
        let resolver = CredentialResolver::default();
        let credential = resolver
            .resolve_with(env(&[("GEMINI_API_KEY", "  "), ("API_KEY", "key")]))
            .unwrap();
        assert_eq!(credential.secret(), "key");
    }

    #[test]
    fn test_manual_override_wins() {
        let resolver = CredentialResolver::default().with_override(" manual ");
        let credential = resolver
            .resolve_with(env(&[("GEMINI_API_KEY", "env")]))
            .unwrap();

        assert_eq!(credential.origin, CredentialOrigin::Manual);
        assert_eq!(credential.secret(), "manual");
    }

    #[test]
    fn test_blank_override_is_ignored() {
        let resolver = CredentialResolver::default().with_override("");
        assert!(!resolver.has_override());
        assert_eq!(resolver.resolve_with(env(&[])), None);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let credential = CredentialResolver::default()
            .with_override("super-secret")
            .resolve_with(env(&[]))
            .unwrap();
        assert!(!format!("{credential:?}").contains("super-secret"));
    }
}
