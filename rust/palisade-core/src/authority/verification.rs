use crate::authority::{RequiredCapability, SERVICE_SEMANTICS, SUPPORTED_KEYS};
use noosphere_ucan::{
    capability::Capability, chain::ProofChain, crypto::did::DidParser, store::UcanJwtStore, Ucan,
};

/// The outcome of one verification step. `ok == false` is the normal
/// "not yet authorized" signal that drives the fallback chain; it is not an
/// error by itself.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VerifyResult {
    pub ok: bool,
    pub value: Vec<String>,
    pub err: Vec<String>,
}

impl VerifyResult {
    pub fn granted(value: Vec<String>) -> Self {
        VerifyResult {
            ok: true,
            value,
            err: Vec::new(),
        }
    }

    pub fn denied(message: impl Into<String>) -> Self {
        VerifyResult {
            ok: false,
            value: Vec::new(),
            err: vec![message.into()],
        }
    }
}

/// Options for a single token verification
#[derive(Clone, Debug)]
pub struct VerifyOptions<'a> {
    pub audience: &'a str,
    pub required_capabilities: &'a [RequiredCapability],
}

/// An entry in an [or_verify_loop]: one token checked against one
/// requirement for one audience
#[derive(Clone, Debug)]
pub struct VerifyCandidate<'a> {
    pub token: &'a str,
    pub audience: &'a str,
    pub required: &'a RequiredCapability,
}

async fn try_verify<S: UcanJwtStore>(
    token: &str,
    options: &VerifyOptions<'_>,
    store: &S,
) -> anyhow::Result<VerifyResult> {
    let ucan = Ucan::try_from(token)?;

    if ucan.audience() != options.audience {
        return Ok(VerifyResult::denied(format!(
            "Token audience {} does not match expected audience {}",
            ucan.audience(),
            options.audience
        )));
    }

    let mut did_parser = DidParser::new(SUPPORTED_KEYS);
    let chain = ProofChain::from_ucan(ucan, None, &mut did_parser, store).await?;
    let capability_infos = chain.reduce_capabilities(&SERVICE_SEMANTICS);

    let mut value = Vec::new();
    let mut err = Vec::new();

    for required in options.required_capabilities {
        let enabled = capability_infos.iter().any(|info| {
            info.originators.contains(required.root_issuer.as_str())
                && info.capability.enables(&required.capability)
        });

        let flat = Capability::from(&required.capability);
        if enabled {
            value.push(format!("{} {}", flat.resource, flat.ability));
        } else {
            err.push(format!(
                "Capability not satisfied: {} {}",
                flat.resource, flat.ability
            ));
        }
    }

    Ok(VerifyResult {
        ok: err.is_empty(),
        value,
        err,
    })
}

/// Verify a token exactly once against the given requirements. Failures from
/// the token library (malformed tokens, unresolvable proofs, bad signatures)
/// are converted into a negative [VerifyResult] and never propagate as raw
/// errors.
pub async fn verify_once<S: UcanJwtStore>(
    token: &str,
    options: &VerifyOptions<'_>,
    store: &S,
) -> VerifyResult {
    match try_verify(token, options, store).await {
        Ok(result) => result,
        Err(error) => VerifyResult::denied(error.to_string()),
    }
}

/// Verify a token, retrying at most once with every non-wildcard action
/// widened to the namespace wildcard. The retry accepts a holder of the whole
/// namespace when the requirement names a sub-resource the token does not
/// spell out; it runs once per call, never recursively.
pub async fn verify_one<S: UcanJwtStore>(
    token: &str,
    options: &VerifyOptions<'_>,
    store: &S,
) -> VerifyResult {
    let verdict = verify_once(token, options, store).await;

    if verdict.ok || options.required_capabilities.is_empty() {
        return verdict;
    }

    let mut widened = false;
    let relaxed: Vec<RequiredCapability> = options
        .required_capabilities
        .iter()
        .map(|required| {
            if required.capability.ability.is_wildcard() {
                required.clone()
            } else {
                widened = true;
                RequiredCapability {
                    capability: noosphere_ucan::capability::CapabilityView {
                        resource: required.capability.resource.clone(),
                        ability: required.capability.ability.widened(),
                        caveat: required.capability.caveat.clone(),
                    },
                    root_issuer: required.root_issuer.clone(),
                }
            }
        })
        .collect();

    if !widened {
        return verdict;
    }

    trace!("Retrying verification with namespace-wide action scope");

    verify_once(
        token,
        &VerifyOptions {
            audience: options.audience,
            required_capabilities: &relaxed,
        },
        store,
    )
    .await
}

/// Evaluate candidates in order and return on the first success; returns the
/// last failing result if none succeed.
pub async fn or_verify_loop<S: UcanJwtStore>(
    candidates: &[VerifyCandidate<'_>],
    store: &S,
) -> VerifyResult {
    let mut verdict = VerifyResult::default();

    for candidate in candidates {
        verdict = verify_one(
            candidate.token,
            &VerifyOptions {
                audience: candidate.audience,
                required_capabilities: std::slice::from_ref(candidate.required),
            },
            store,
        )
        .await;

        if verdict.ok {
            break;
        }
    }

    verdict
}
