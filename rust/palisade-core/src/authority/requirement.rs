use crate::{
    authority::{generate_capability, AuthorityContext, ServiceAbility, ServiceCapability},
    context::Method,
    data::Did,
    strategy::AuthConfig,
};
use serde::{Deserialize, Serialize};

/// One or many action segments, as they appear in declarative requirement
/// specs: `"read"` and `["read"]` are equivalent.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SegmentSpec {
    One(String),
    Many(Vec<String>),
}

impl SegmentSpec {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            SegmentSpec::One(segment) => vec![segment.clone()],
            SegmentSpec::Many(segments) => segments.clone(),
        }
    }
}

impl From<&str> for SegmentSpec {
    fn from(value: &str) -> Self {
        SegmentSpec::One(value.to_owned())
    }
}

/// The resource half of an explicit capability spec; missing parts are
/// filled from the configured defaults.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    #[serde(default)]
    pub scheme: Option<String>,
    #[serde(default)]
    pub hier_part: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionSpec {
    pub namespace: String,
    pub segments: SegmentSpec,
}

/// The declarative input form of a capability requirement: either a
/// `(namespace, segments)` pair expanded against the configured default
/// resource, or an explicit partial capability.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CapabilitySpec {
    Action(String, SegmentSpec),
    Explicit {
        #[serde(default)]
        with: Option<ResourceSpec>,
        can: ActionSpec,
    },
}

impl CapabilitySpec {
    /// Shorthand for the common `(namespace, segment)` pair
    pub fn action(namespace: &str, segment: &str) -> Self {
        CapabilitySpec::Action(namespace.to_owned(), SegmentSpec::from(segment))
    }

    /// Expand the spec into a concrete capability using the configured
    /// default resource for any part the spec leaves out
    pub fn to_capability(&self, config: &AuthConfig) -> ServiceCapability {
        match self {
            CapabilitySpec::Action(namespace, segments) => generate_capability(
                &config.default_scheme,
                &config.default_hier_part,
                ServiceAbility {
                    namespace: namespace.clone(),
                    segments: segments.to_vec(),
                },
            ),
            CapabilitySpec::Explicit { with, can } => {
                let resource = with.clone().unwrap_or_default();
                generate_capability(
                    resource.scheme.as_deref().unwrap_or(&config.default_scheme),
                    resource
                        .hier_part
                        .as_deref()
                        .unwrap_or(&config.default_hier_part),
                    ServiceAbility {
                        namespace: can.namespace.clone(),
                        segments: can.segments.to_vec(),
                    },
                )
            }
        }
    }
}

/// A capability requirement anchored to the trust root that must have
/// originated it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequiredCapability {
    pub capability: ServiceCapability,
    pub root_issuer: Did,
}

/// The per-operation requirement attached to a guarded operation. The two
/// authentication-only forms replace the string sentinels of ad hoc
/// configuration: `AnyAuth` admits any caller with a resolved identity, and
/// `NoThrow` makes authentication best-effort without failing the operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Requirement {
    Capabilities(Vec<CapabilitySpec>),
    AnyAuth,
    NoThrow,
}

impl Default for Requirement {
    fn default() -> Self {
        Requirement::Capabilities(Vec::new())
    }
}

impl From<Vec<CapabilitySpec>> for Requirement {
    fn from(value: Vec<CapabilitySpec>) -> Self {
        Requirement::Capabilities(value)
    }
}

/// Expand declarative capability specs into concrete requirements, all
/// anchored at the authority's identity
pub fn model_capabilities(
    specs: &[CapabilitySpec],
    authority: &AuthorityContext,
    config: &AuthConfig,
) -> Vec<RequiredCapability> {
    specs
        .iter()
        .map(|spec| RequiredCapability {
            capability: spec.to_capability(config),
            root_issuer: authority.identity.clone(),
        })
        .collect()
}

/// Per-method requirement specs for a whole entity collection; `all` applies
/// to any method without a more specific entry.
#[derive(Clone, Debug, Default)]
pub struct MethodRequirements {
    pub all: Option<Requirement>,
    pub get: Option<Requirement>,
    pub find: Option<Requirement>,
    pub create: Option<Requirement>,
    pub patch: Option<Requirement>,
    pub update: Option<Requirement>,
    pub remove: Option<Requirement>,
}

impl MethodRequirements {
    pub fn for_method(&self, method: Method) -> Option<&Requirement> {
        let specific = match method {
            Method::Get => self.get.as_ref(),
            Method::Find => self.find.as_ref(),
            Method::Create => self.create.as_ref(),
            Method::Patch => self.patch.as_ref(),
            Method::Update => self.update.as_ref(),
            Method::Remove => self.remove.as_ref(),
        };
        specific.or(self.all.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::test_config;
    use noosphere_ucan::capability::Capability;

    #[test]
    fn it_expands_an_action_pair_against_the_default_resource() {
        let config = test_config();
        let spec: CapabilitySpec = serde_json::from_value(serde_json::json!(["notes", "read"])).unwrap();

        let capability = spec.to_capability(&config);
        let flat = Capability::from(&capability);

        assert_eq!(flat.resource, "svc:notes");
        assert_eq!(flat.ability, "notes/read");
    }

    #[test]
    fn it_passes_an_explicit_capability_through_with_defaults_filled() {
        let config = test_config();
        let spec: CapabilitySpec = serde_json::from_value(serde_json::json!({
            "with": { "scheme": "mailbox" },
            "can": { "namespace": "mail", "segments": ["send", "bulk"] }
        }))
        .unwrap();

        let flat = Capability::from(&spec.to_capability(&config));

        assert_eq!(flat.resource, "mailbox:notes");
        assert_eq!(flat.ability, "mail/send/bulk");
    }

    #[tokio::test]
    async fn it_anchors_every_requirement_at_the_authority_identity() {
        let config = test_config();
        let authority = AuthorityContext::ephemeral().await.unwrap();

        let requirements = model_capabilities(
            &[
                CapabilitySpec::action("notes", "read"),
                CapabilitySpec::action("notes", "write"),
            ],
            &authority,
            &config,
        );

        assert_eq!(requirements.len(), 2);
        for requirement in requirements {
            assert_eq!(requirement.root_issuer, authority.identity);
        }
    }
}
