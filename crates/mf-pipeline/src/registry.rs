//! Tag-keyed operation registries.
//!
//! One registry exists per media domain. A lookup that finds nothing is not
//! an error: the transformation is logged and skipped so the rest of the chain still
//! runs.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use mf_core::{MediaDomain, Params, TransformationSpec};

/// A handler found for a spec, with the parameters it should receive.
pub struct Resolved<'a, H: ?Sized> {
    /// The registered tag that matched.
    pub tag: &'a str,
    pub handler: Arc<H>,
    pub params: Cow<'a, Params>,
}

/// Maps transformation tags to handlers of type `H`.
pub struct OperationRegistry<H: ?Sized> {
    domain: MediaDomain,
    handlers: HashMap<String, Arc<H>>,
}

impl<H: ?Sized> OperationRegistry<H> {
    pub fn new(domain: MediaDomain) -> Self {
        Self {
            domain,
            handlers: HashMap::new(),
        }
    }

    pub fn domain(&self) -> MediaDomain {
        self.domain
    }

    /// Register `handler` under `tag`, returning the handler it replaced.
    pub fn register(&mut self, tag: impl Into<String>, handler: Arc<H>) -> Option<Arc<H>> {
        self.handlers.insert(tag.into(), handler)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.handlers.contains_key(tag)
    }

    /// Registered tags in sorted order.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Find the handler for `spec`.
    ///
    /// The full type tag is tried first. Failing that, a directive-style tag
    /// such as `so_5` is looked up by its key (`so`), and its value is added
    /// to the parameters unless an explicit parameter of the same name exists.
    pub fn resolve<'a>(&'a self, spec: &'a TransformationSpec) -> Option<Resolved<'a, H>> {
        if let Some((tag, handler)) = self.handlers.get_key_value(spec.kind()) {
            return Some(Resolved {
                tag,
                handler: Arc::clone(handler),
                params: Cow::Borrowed(spec.params()),
            });
        }

        if let Some((key, value)) = spec.directive() {
            if let Some((tag, handler)) = self.handlers.get_key_value(key) {
                return Some(Resolved {
                    tag,
                    handler: Arc::clone(handler),
                    params: Cow::Owned(spec.params().with_default(key, mf_parser::coerce(value))),
                });
            }
        }

        warn!(
            domain = %self.domain,
            tag = spec.kind(),
            "Unsupported transformation type; skipping"
        );
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mf_core::ParamValue;

    type Registry = OperationRegistry<str>;

    fn registry() -> Registry {
        let mut registry = OperationRegistry::new(MediaDomain::Video);
        registry.register("so", Arc::from("timing"));
        registry.register("c_fill", Arc::from("fill"));
        registry
    }

    fn spec(kind: &str, params: &[(&str, f64)]) -> TransformationSpec {
        TransformationSpec::new(
            kind,
            params
                .iter()
                .map(|(k, v)| (k.to_string(), ParamValue::Number(*v)))
                .collect(),
        )
    }

    #[test]
    fn exact_tag_borrows_params() {
        let registry = registry();
        let spec = spec("c_fill", &[("w", 10.0)]);
        let resolved = registry.resolve(&spec).unwrap();
        assert_eq!(resolved.tag, "c_fill");
        assert_eq!(&*resolved.handler, "fill");
        assert!(matches!(resolved.params, Cow::Borrowed(_)));
    }

    #[test]
    fn directive_tag_adds_value() {
        let registry = registry();
        let spec = spec("so_5", &[("du", 10.0)]);
        let resolved = registry.resolve(&spec).unwrap();
        assert_eq!(resolved.tag, "so");
        assert_eq!(resolved.params.number("so"), Some(5.0));
        assert_eq!(resolved.params.number("du"), Some(10.0));
    }

    #[test]
    fn explicit_param_beats_directive_value() {
        let registry = registry();
        let spec = spec("so_5", &[("so", 2.0)]);
        let resolved = registry.resolve(&spec).unwrap();
        assert_eq!(resolved.params.number("so"), Some(2.0));
    }

    #[test]
    fn unknown_tag_resolves_to_none() {
        let registry = registry();
        assert!(registry.resolve(&spec("e_sepia", &[])).is_none());
        assert!(registry.resolve(&spec("x_1", &[])).is_none());
    }

    #[test]
    fn tags_are_sorted() {
        assert_eq!(registry().tags(), vec!["c_fill", "so"]);
    }

    #[test]
    fn register_replaces() {
        let mut registry = registry();
        let previous = registry.register("so", Arc::from("other"));
        assert_eq!(previous.as_deref(), Some("timing"));
        assert!(registry.contains("so"));
    }
}
