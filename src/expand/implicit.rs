//! Implicit configuration synthesis
//!
//! A module whose config shape requires nothing but `name` can be used
//! without any `config` element. When a call omits its config-ref, a
//! single `<prefix>:config` named `<module>-implicit-config` is inserted
//! with every declared default, and omitting calls resolve to it.

use std::sync::Arc;

use tracing::warn;

use super::plan::ModulePlan;
use crate::ast::{
    BoundModel, ComponentIdentifier, ComponentKind, ComponentNode, Location, LocationPart,
};
use crate::config::FeatureFlags;
use crate::registry::{CONFIG_ELEMENT, CONFIG_REF_PARAM, CONNECTION_ELEMENT};

/// Outcome of the implicit-configuration check for one module
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImplicitConfig {
    /// Some call omits its config-ref and the shape allows defaults
    pub triggered: bool,
    /// The implicit element is actually inserted
    pub synthesize: bool,
}

/// Check `nodes` (the artifact plus any template content still to be
/// expanded) for calls of this module without a config-ref.
pub fn assess<'a>(
    plan: &ModulePlan,
    mut nodes: impl Iterator<Item = &'a Arc<ComponentNode>>,
    flags: &FeatureFlags,
) -> ImplicitConfig {
    if plan.implicit_config_name.is_none() {
        return ImplicitConfig::default();
    }
    let triggered = nodes.any(|node| {
        plan.is_operation_call(node) && node.literal_param(CONFIG_REF_PARAM).is_none()
    });
    if !triggered {
        return ImplicitConfig::default();
    }

    warn!(
        module = %plan.module.name,
        "An implicit config is being used for module '{}'; it cannot vary per call site. \
         Every operation usage of this module should reference an explicit configuration.",
        plan.module.name
    );

    ImplicitConfig {
        triggered,
        synthesize: !flags.disable_implicit_config,
    }
}

/// The implicit `config` element, before its global elements are expanded.
pub fn synthesize(plan: &ModulePlan) -> Option<ComponentNode> {
    let name = plan.implicit_config_name.as_deref()?;
    let shape = plan.module.config.as_ref()?;

    let mut config = ComponentNode::new(ComponentIdentifier::new(plan.prefix(), CONFIG_ELEMENT))
        .with_id(name)
        .with_kind(ComponentKind::Config)
        .with_model(BoundModel::Configuration)
        .with_location(Location::root(name));
    for (property, default) in shape.property_defaults() {
        config = config.with_literal(property, default);
    }

    if shape.connection.is_some() {
        let mut connection =
            ComponentNode::new(ComponentIdentifier::new(plan.prefix(), CONNECTION_ELEMENT))
                .with_kind(ComponentKind::Connection)
                .with_model(BoundModel::Connection)
                .with_location(Location::root(name).child(LocationPart::new(CONNECTION_ELEMENT)));
        for (property, default) in shape.connection_defaults() {
            connection = connection.with_literal(property, default);
        }
        config = config.with_child(connection);
    }

    Some(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AppDocument;
    use crate::registry::ModuleDocument;

    const MATH: &str = r#"
name: math
prefix: math
config:
  properties:
    - { name: host, default: localhost }
    - { name: port }
  connection:
    properties:
      - { name: user, default: guest }
operations:
  - name: add
"#;

    fn plan(yaml: &str) -> ModulePlan {
        ModulePlan::new(Arc::new(
            ModuleDocument::from_yaml(yaml).unwrap().into_descriptor().unwrap(),
        ))
    }

    fn app(call_params: &str) -> crate::ast::ArtifactTree {
        let yaml = format!(
            "components:\n  - element: flow\n    id: main\n    children:\n      - element: math:add\n        params: {call_params}\n"
        );
        AppDocument::from_yaml(&yaml).unwrap().into_tree().unwrap()
    }

    #[test]
    fn test_triggered_by_call_without_config_ref() {
        let p = plan(MATH);
        let decision = assess(&p, app("{ value: '1' }").descendants(), &FeatureFlags::default());
        assert!(decision.triggered);
        assert!(decision.synthesize);
    }

    #[test]
    fn test_not_triggered_when_every_call_has_config_ref() {
        let p = plan(MATH);
        let decision = assess(&p, app("{ config-ref: cfg1 }").descendants(), &FeatureFlags::default());
        assert_eq!(decision, ImplicitConfig::default());
    }

    #[test]
    fn test_disabled_flag_still_triggers_but_does_not_synthesize() {
        let p = plan(MATH);
        let flags = FeatureFlags {
            disable_implicit_config: true,
            ..FeatureFlags::default()
        };
        let decision = assess(&p, app("{}").descendants(), &flags);
        assert!(decision.triggered);
        assert!(!decision.synthesize);
    }

    #[test]
    fn test_required_property_prevents_trigger() {
        let p = plan("name: math\nprefix: math\nconfig:\n  properties: [{ name: token, required: true }]\noperations:\n  - name: add\n");
        let decision = assess(&p, app("{}").descendants(), &FeatureFlags::default());
        assert!(!decision.triggered);
    }

    #[test]
    fn test_synthesized_config_carries_defaults() {
        let config = synthesize(&plan(MATH)).unwrap();

        assert_eq!(config.identifier.to_string(), "math:config");
        assert_eq!(config.id.as_deref(), Some("math-implicit-config"));
        assert_eq!(config.literal_param("host"), Some("localhost"));
        assert_eq!(config.param("port"), None);
        assert_eq!(config.children[0].identifier.name, "connection");
        assert_eq!(config.children[0].literal_param("user"), Some("guest"));
    }
}
