use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Lookup key for a registered assessment component.
///
/// Keys come in two precisions: versioned (detail type plus major version)
/// and bare (detail type only). Resolution tries the versioned key first so
/// a `TOMCAT` + `9` component can shadow the generic `TOMCAT` one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentKey {
    detail_type: String,
    major: Option<String>,
}

impl ComponentKey {
    pub fn bare(detail_type: &str) -> Self {
        ComponentKey {
            detail_type: detail_type.trim().to_ascii_uppercase(),
            major: None,
        }
    }

    /// Versioned key; the major is everything before the first dot.
    pub fn versioned(detail_type: &str, version: &str) -> Self {
        let major = version
            .trim()
            .split('.')
            .next()
            .filter(|m| !m.is_empty())
            .map(str::to_owned);
        ComponentKey {
            detail_type: detail_type.trim().to_ascii_uppercase(),
            major,
        }
    }
}

/// Registry of pluggable assessment components keyed by detail type.
///
/// `R` is the component trait object; the registry itself is immutable after
/// wiring so lookups take `&self` and hand out cheap `Arc` clones.
pub struct ComponentRegistry<R: ?Sized> {
    components: HashMap<ComponentKey, Arc<R>>,
}

impl<R: ?Sized> Default for ComponentRegistry<R> {
    fn default() -> Self {
        ComponentRegistry {
            components: HashMap::new(),
        }
    }
}

impl<R: ?Sized> ComponentRegistry<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, key: ComponentKey, component: Arc<R>) {
        self.components.insert(key, component);
    }

    /// Resolves a component for the detail type, preferring a major-version
    /// match over the bare entry. Returns `None` when neither exists; the
    /// caller decides what "no component" means for its domain.
    pub fn resolve(
        &self,
        detail_type: &str,
        version: Option<&str>,
    ) -> Option<Arc<R>> {
        if let Some(version) = version.filter(|v| !v.trim().is_empty()) {
            let key = ComponentKey::versioned(detail_type, version);
            if let Some(component) = self.components.get(&key) {
                return Some(Arc::clone(component));
            }
        }
        self.components
            .get(&ComponentKey::bare(detail_type))
            .map(Arc::clone)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl<R: ?Sized> fmt::Debug for ComponentRegistry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("component", &std::any::type_name::<R>())
            .field("registered", &self.components.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Probe: Send + Sync {
        fn id(&self) -> &'static str;
    }

    struct Named(&'static str);

    impl Probe for Named {
        fn id(&self) -> &'static str {
            self.0
        }
    }

    fn registry() -> ComponentRegistry<dyn Probe> {
        let mut registry: ComponentRegistry<dyn Probe> =
            ComponentRegistry::new();
        registry.register(ComponentKey::bare("TOMCAT"), Arc::new(Named("bare")));
        registry.register(
            ComponentKey::versioned("TOMCAT", "9.0.54"),
            Arc::new(Named("v9")),
        );
        registry
    }

    #[test]
    fn versioned_key_shadows_bare() {
        let registry = registry();
        let hit = registry.resolve("TOMCAT", Some("9.0.1")).unwrap();
        assert_eq!(hit.id(), "v9");
    }

    #[test]
    fn falls_back_to_bare_entry() {
        let registry = registry();
        let hit = registry.resolve("TOMCAT", Some("8.5.72")).unwrap();
        assert_eq!(hit.id(), "bare");
        let hit = registry.resolve("tomcat", None).unwrap();
        assert_eq!(hit.id(), "bare");
    }

    #[test]
    fn unknown_detail_type_resolves_nothing() {
        let registry = registry();
        assert!(registry.resolve("JETTY", Some("11")).is_none());
    }
}
