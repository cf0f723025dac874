use anyhow::{anyhow, Result};
use noosphere_ucan::capability::{
    Ability, CapabilitySemantics, CapabilityView, Resource, ResourceUri, Scope,
};
use serde_json::json;
use std::cmp::Ordering;
use url::Url;

/// The segment value that denotes maximal action scope within a namespace
pub const WILDCARD: &str = "*";

/// The resource half of a service capability: a scheme (the protection
/// domain) plus a hierarchical part (typically a service or collection name)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceReference {
    pub scheme: String,
    pub hier_part: String,
}

impl Scope for ServiceReference {
    fn contains(&self, other: &Self) -> bool {
        self.scheme == other.scheme && self.hier_part == other.hier_part
    }
}

impl ToString for ServiceReference {
    fn to_string(&self) -> String {
        format!("{}:{}", self.scheme, self.hier_part)
    }
}

impl TryFrom<Url> for ServiceReference {
    type Error = anyhow::Error;

    fn try_from(value: Url) -> Result<Self> {
        Ok(ServiceReference {
            scheme: value.scheme().to_owned(),
            hier_part: String::from(value.path()),
        })
    }
}

/// The action half of a service capability: a namespace (usually an entity
/// collection) and an ordered sequence of action segments within it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceAbility {
    pub namespace: String,
    pub segments: Vec<String>,
}

impl ServiceAbility {
    pub fn new(namespace: &str, segments: &[&str]) -> Self {
        ServiceAbility {
            namespace: namespace.to_owned(),
            segments: segments.iter().map(|segment| String::from(*segment)).collect(),
        }
    }

    /// True when the segments claim the whole namespace
    pub fn is_wildcard(&self) -> bool {
        self.segments.len() == 1 && self.segments[0] == WILDCARD
    }

    /// The same ability with its segments widened to the namespace wildcard
    pub fn widened(&self) -> Self {
        ServiceAbility {
            namespace: self.namespace.clone(),
            segments: vec![WILDCARD.into()],
        }
    }
}

impl Ability for ServiceAbility {}

impl ToString for ServiceAbility {
    fn to_string(&self) -> String {
        format!("{}/{}", self.namespace, self.segments.join("/"))
    }
}

impl TryFrom<String> for ServiceAbility {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        let mut parts = value.split('/');
        let namespace = match parts.next() {
            Some(namespace) if !namespace.is_empty() => namespace.to_owned(),
            _ => return Err(anyhow!("Ability is missing a namespace: {:?}", value)),
        };
        let segments: Vec<String> = parts.map(String::from).collect();

        if segments.is_empty() || segments.iter().any(|segment| segment.is_empty()) {
            return Err(anyhow!(
                "Ability must name at least one action segment: {:?}",
                value
            ));
        }

        Ok(ServiceAbility {
            namespace,
            segments,
        })
    }
}

impl PartialOrd for ServiceAbility {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ServiceAbility {
    fn cmp(&self, other: &Self) -> Ordering {
        // Abilities either match exactly or are unrelated.
        // `CapabilityView::enables` and `ProofChain::reduce_capabilities` only
        // consult `>=`, so unrelated abilities sort strictly below one another
        // and can never enable each other; namespace-wide wildcard scope is
        // granted through the requirement-relaxation retry in
        // `authority::verification`, never through ability ordering.
        if self == other {
            Ordering::Equal
        } else {
            Ordering::Less
        }
    }
}

/// A capability over a service resource, as interpreted by
/// [ServiceSemantics]
pub type ServiceCapability = CapabilityView<ServiceReference, ServiceAbility>;

pub struct ServiceSemantics {}

impl CapabilitySemantics<ServiceReference, ServiceAbility> for ServiceSemantics {}

pub const SERVICE_SEMANTICS: ServiceSemantics = ServiceSemantics {};

/// Generates a [ServiceCapability] for the given resource and ability; a
/// hierarchical part of `"*"` produces the unscoped resource.
pub fn generate_capability(
    scheme: &str,
    hier_part: &str,
    ability: ServiceAbility,
) -> ServiceCapability {
    CapabilityView {
        resource: Resource::Resource {
            kind: match hier_part {
                WILDCARD => ResourceUri::Unscoped,
                _ => ResourceUri::Scoped(ServiceReference {
                    scheme: scheme.to_owned(),
                    hier_part: hier_part.to_owned(),
                }),
            },
        },
        ability,
        caveat: json!({}),
    }
}

fn same_namespace(left: &ServiceCapability, right: &ServiceCapability) -> bool {
    left.resource == right.resource && left.ability.namespace == right.ability.namespace
}

/// Merge a list of capabilities: duplicates collapse, and a wildcard ability
/// swallows every other ability claimed over the same resource and namespace.
pub fn stack_abilities(capabilities: Vec<ServiceCapability>) -> Vec<ServiceCapability> {
    let mut stacked: Vec<ServiceCapability> = Vec::new();

    for capability in capabilities {
        if stacked
            .iter()
            .any(|existing| same_namespace(existing, &capability) && existing.ability.is_wildcard())
        {
            continue;
        }

        if capability.ability.is_wildcard() {
            stacked.retain(|existing| !same_namespace(existing, &capability));
            stacked.push(capability);
            continue;
        }

        if stacked
            .iter()
            .any(|existing| same_namespace(existing, &capability) && existing.ability == capability.ability)
        {
            continue;
        }

        stacked.push(capability);
    }

    stacked
}

/// Subtract abilities from a capability set: a removal matches exactly, and
/// removing the wildcard clears the whole namespace for that resource.
pub fn reduce_abilities(
    removals: &[ServiceCapability],
    current: Vec<ServiceCapability>,
) -> Vec<ServiceCapability> {
    current
        .into_iter()
        .filter(|capability| {
            !removals.iter().any(|removal| {
                same_namespace(removal, capability)
                    && (removal.ability.is_wildcard() || removal.ability == capability.ability)
            })
        })
        .collect()
}
