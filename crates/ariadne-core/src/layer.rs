//! Architectural layer derivation shared by the impact analyzer, the
//! call-chain tracer, and the graph query surface.

use crate::models::{Symbol, SymbolKind};

/// Architectural classification derived from annotations and naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Layer {
    Controller,
    Service,
    Repository,
    Domain,
    Unknown,
}

impl Layer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Controller => "controller",
            Self::Service => "service",
            Self::Repository => "repository",
            Self::Domain => "domain",
            Self::Unknown => "unknown",
        }
    }

    /// Lower value sorts first: Controller > Service > Repository > Domain.
    pub fn priority(&self) -> u8 {
        match self {
            Self::Controller => 0,
            Self::Service => 1,
            Self::Repository => 2,
            Self::Domain => 3,
            Self::Unknown => 4,
        }
    }
}

/// Determine the layer from a symbol's annotations.
///
/// Annotations win; a class without layer annotations defaults to `domain`,
/// anything else to `unknown`.
pub fn determine_layer(symbol: &Symbol) -> Layer {
    if let Some(layer) = layer_from_annotations(&symbol.annotations) {
        return layer;
    }

    match symbol.kind {
        SymbolKind::Class => Layer::Domain,
        _ => Layer::Unknown,
    }
}

/// Annotation-only derivation, usable when just the annotation list is at hand.
pub fn layer_from_annotations(annotations: &[String]) -> Option<Layer> {
    for annotation in annotations {
        if annotation.contains("RestController") || annotation.contains("Controller") {
            return Some(Layer::Controller);
        }
        if annotation.contains("Service") {
            return Some(Layer::Service);
        }
        if annotation.contains("Repository") {
            return Some(Layer::Repository);
        }
    }
    None
}

/// Name-based fallback for symbols the graph cannot resolve (external FQNs).
/// Checks the whole FQN, not only the trailing segment, so method FQNs like
/// `com.example.UserMapper.selectById` classify as repository.
pub fn layer_from_name(fqn: &str) -> Layer {
    if fqn.contains("Controller") {
        Layer::Controller
    } else if fqn.contains("Service") {
        Layer::Service
    } else if fqn.contains("Mapper") || fqn.contains("Dao") || fqn.contains("Repository") {
        Layer::Repository
    } else {
        Layer::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class_with(annotations: &[&str]) -> Symbol {
        Symbol::new("com.example.Foo", SymbolKind::Class, "Foo")
            .with_annotations(annotations.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn annotations_take_precedence() {
        assert_eq!(
            determine_layer(&class_with(&["@RestController"])),
            Layer::Controller
        );
        assert_eq!(determine_layer(&class_with(&["@Service"])), Layer::Service);
        assert_eq!(
            determine_layer(&class_with(&["@Repository"])),
            Layer::Repository
        );
    }

    #[test]
    fn unannotated_class_is_domain() {
        assert_eq!(determine_layer(&class_with(&[])), Layer::Domain);
    }

    #[test]
    fn unannotated_method_is_unknown() {
        let method = Symbol::new("com.example.Foo.bar()", SymbolKind::Method, "bar");
        assert_eq!(determine_layer(&method), Layer::Unknown);
    }

    #[test]
    fn name_fallback_scans_full_fqn() {
        assert_eq!(
            layer_from_name("com.example.UserMapper.selectById"),
            Layer::Repository
        );
        assert_eq!(
            layer_from_name("com.example.OrderController.create"),
            Layer::Controller
        );
        assert_eq!(layer_from_name("com.example.Order"), Layer::Unknown);
    }
}
