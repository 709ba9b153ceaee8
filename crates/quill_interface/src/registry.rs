//! Typed mapping from roles to text generators.

use crate::TextGenerator;
use quill_core::Role;
use std::collections::BTreeMap;
use std::sync::Arc;
use strum::IntoEnumIterator;
use tracing::debug;

/// Result of resolving a role against a [`RoleRegistry`].
#[derive(Clone)]
pub enum Handler {
    /// A generator is bound to the role
    Available(Arc<dyn TextGenerator>),
    /// No generator is bound to the role
    Missing(Role),
}

impl Handler {
    /// Whether a generator is bound.
    pub fn is_available(&self) -> bool {
        matches!(self, Handler::Available(_))
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handler::Available(generator) => f
                .debug_tuple("Available")
                .field(&generator.provider_name())
                .finish(),
            Handler::Missing(role) => f.debug_tuple("Missing").field(role).finish(),
        }
    }
}

/// Registry binding each [`Role`] to at most one generator.
///
/// Bindings are fixed at construction time.
///
/// # Examples
///
/// ```
/// use quill_interface::{Handler, RoleRegistry};
/// use quill_core::Role;
///
/// let registry = RoleRegistry::new();
/// assert!(matches!(registry.resolve(Role::Writer), Handler::Missing(Role::Writer)));
/// assert!(registry.is_empty());
/// ```
#[derive(Clone, Default)]
pub struct RoleRegistry {
    handlers: BTreeMap<Role, Arc<dyn TextGenerator>>,
}

impl RoleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `generator` to `role`, replacing any earlier binding.
    pub fn with_handler(mut self, role: Role, generator: Arc<dyn TextGenerator>) -> Self {
        debug!(role = %role, provider = generator.provider_name(), "Binding role handler");
        self.handlers.insert(role, generator);
        self
    }

    /// Bind `generator` to every role that has no binding yet.
    pub fn with_default(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        for role in Role::iter() {
            self.handlers
                .entry(role)
                .or_insert_with(|| Arc::clone(&generator));
        }
        debug!(provider = generator.provider_name(), "Bound default handler to unbound roles");
        self
    }

    /// Resolve a role.
    pub fn resolve(&self, role: Role) -> Handler {
        match self.handlers.get(&role) {
            Some(generator) => Handler::Available(Arc::clone(generator)),
            None => Handler::Missing(role),
        }
    }

    /// Whether no role is bound.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Bound roles in order.
    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.handlers.keys().copied()
    }
}

impl std::fmt::Debug for RoleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(
                self.handlers
                    .iter()
                    .map(|(role, generator)| (role, generator.provider_name())),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quill_error::QuillResult;

    struct Fixed(&'static str);

    #[async_trait]
    impl TextGenerator for Fixed {
        async fn generate(&self, _role: Role, _prompt: &str) -> QuillResult<String> {
            Ok(self.0.to_string())
        }

        fn provider_name(&self) -> &'static str {
            self.0
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn test_default_does_not_override_explicit_binding() {
        let registry = RoleRegistry::new()
            .with_handler(Role::Editor, Arc::new(Fixed("editor")))
            .with_default(Arc::new(Fixed("shared")));

        match registry.resolve(Role::Editor) {
            Handler::Available(g) => assert_eq!(g.provider_name(), "editor"),
            Handler::Missing(_) => panic!("editor should be bound"),
        }
        match registry.resolve(Role::Writer) {
            Handler::Available(g) => assert_eq!(g.provider_name(), "shared"),
            Handler::Missing(_) => panic!("writer should be bound"),
        }
        assert_eq!(registry.roles().count(), Role::iter().count());
    }

    #[tokio::test]
    async fn test_resolved_handler_generates() {
        let registry = RoleRegistry::new().with_handler(Role::Writer, Arc::new(Fixed("prose")));
        let Handler::Available(writer) = registry.resolve(Role::Writer) else {
            panic!("writer should be bound");
        };
        assert_eq!(writer.generate(Role::Writer, "go").await.unwrap(), "prose");
        assert!(!registry.resolve(Role::Planner).is_available());
    }
}
