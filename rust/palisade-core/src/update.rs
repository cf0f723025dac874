use crate::{
    authority::{
        reduce_abilities, stack_abilities, verify_once, RequiredCapability, ServiceCapability,
        VerifyOptions, CapabilitySpec, SERVICE_SEMANTICS, SUPPORTED_KEYS,
    },
    context::AuthContext,
    data::Jwt,
    engine::AuthEngine,
    error::PalisadeError,
    store::{CallOptions, ServiceStore},
};
use anyhow::anyhow;
use cid::Cid;
use noosphere_ucan::{
    builder::UcanBuilder,
    capability::{Capability, CapabilitySemantics},
    crypto::did::DidParser,
    store::UcanJwtStore,
    Ucan,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Rebuilt tokens live for sixty days unless the request says otherwise
const UPDATED_TOKEN_LIFETIME: u64 = 60 * 60 * 24 * 60;

/// The payload of a capability-update operation: capabilities to grant and
/// to revoke on the target record's stored token
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CapabilityUpdateRequest {
    #[serde(default)]
    pub add: Vec<CapabilitySpec>,
    #[serde(default)]
    pub remove: Vec<CapabilitySpec>,
    /// The service holding the target record; defaults to the login service
    #[serde(default)]
    pub service: Option<String>,
    /// The field on the target record holding its token; defaults to the
    /// configured token path
    #[serde(default)]
    pub path: Option<String>,
    /// Lifetime of the rebuilt token, in seconds
    #[serde(default)]
    pub lifetime: Option<u64>,
}

/// What a successful capability update produced
#[derive(Clone, Debug, Serialize)]
pub struct CapabilityUpdateReceipt {
    /// The request payload as received
    pub raw: Value,
    /// The rebuilt, re-signed token
    pub encoded: Jwt,
    /// The persisted target record
    pub subject: Value,
}

impl<R, S> AuthEngine<R, S>
where
    R: ServiceStore,
    S: UcanJwtStore + Clone,
{
    /// Apply a capability update to the target record's stored token. The
    /// caller must already hold every capability being added or removed:
    /// authority that cannot be demonstrated cannot be granted or revoked.
    /// The target's current ability set is reduced and stacked accordingly,
    /// re-signed under the authority key, validated, and persisted.
    pub async fn update_capabilities(
        &self,
        context: &mut AuthContext,
    ) -> Result<CapabilityUpdateReceipt, PalisadeError> {
        let data = context
            .data
            .clone()
            .ok_or_else(|| PalisadeError::InvalidPayload("No new capabilities passed".into()))?;
        let request: CapabilityUpdateRequest = serde_json::from_value(data.clone())
            .map_err(|error| PalisadeError::InvalidPayload(error.to_string()))?;

        if request.add.is_empty() && request.remove.is_empty() {
            return Err(PalisadeError::InvalidPayload(
                "No new capabilities passed".into(),
            ));
        }

        let store = self.seeded_store(context).await;

        // Check the caller's ability to edit the affected capabilities
        let add_capabilities: Vec<ServiceCapability> = request
            .add
            .iter()
            .map(|spec| spec.to_capability(&self.config))
            .collect();
        let remove_capabilities: Vec<ServiceCapability> = request
            .remove
            .iter()
            .map(|spec| spec.to_capability(&self.config))
            .collect();

        let edited = stack_abilities(
            add_capabilities
                .iter()
                .chain(remove_capabilities.iter())
                .cloned()
                .collect(),
        );
        let requirements: Vec<RequiredCapability> = edited
            .into_iter()
            .map(|capability| RequiredCapability {
                capability,
                root_issuer: self.authority.identity.clone(),
            })
            .collect();

        let caller_token = context
            .params
            .entity
            .as_ref()
            .and_then(|entity| entity.get(&self.config.token_path))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                PalisadeError::NotAuthenticated("No stored capability token for the caller".into())
            })?;
        let audience = context
            .params
            .extension_str(&self.config, &self.config.token_audience)
            .ok_or_else(|| {
                PalisadeError::NotAuthenticated(
                    "No token audience present in request context".into(),
                )
            })?;

        let verdict = verify_once(
            caller_token,
            &VerifyOptions {
                audience,
                required_capabilities: &requirements,
            },
            &store,
        )
        .await;

        if !verdict.ok {
            debug!("Capability edit refused: {:?}", verdict.err);
            return Err(PalisadeError::InsufficientAuthority);
        }

        // Load the target record and its currently encoded capability set
        let subject_id = context.id.clone().ok_or_else(|| {
            PalisadeError::InvalidPayload("No target record for the capability update".into())
        })?;
        let service = request
            .service
            .clone()
            .unwrap_or_else(|| self.config.service.clone());
        let token_path = request
            .path
            .clone()
            .unwrap_or_else(|| self.config.token_path.clone());

        let subject = self
            .records
            .get_record(
                &service,
                &subject_id,
                &CallOptions {
                    skip_joins: true,
                    ..Default::default()
                },
            )
            .await
            .map_err(PalisadeError::Other)?
            .ok_or_else(|| {
                PalisadeError::Other(anyhow!(
                    "No record {} found in service {}",
                    subject_id,
                    service
                ))
            })?;

        let stored_token = subject
            .get(&token_path)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                PalisadeError::Other(anyhow!(
                    "Record {} carries no token at {}",
                    subject_id,
                    token_path
                ))
            })?;

        let decoded = Ucan::try_from(stored_token).map_err(PalisadeError::Other)?;

        let mut current: Vec<ServiceCapability> = Vec::new();
        let mut foreign: Vec<Capability> = Vec::new();
        for capability in decoded.capabilities().iter() {
            match SERVICE_SEMANTICS.parse_capability(&capability) {
                Some(view) => current.push(view),
                None => foreign.push(capability),
            }
        }

        let mut capabilities = current;
        if !remove_capabilities.is_empty() {
            capabilities = reduce_abilities(&remove_capabilities, capabilities);
        }
        if !add_capabilities.is_empty() {
            capabilities =
                stack_abilities(capabilities.into_iter().chain(add_capabilities).collect());
        }

        // Rebuild under the authority key, carrying forward resolvable proofs
        let mut builder = UcanBuilder::default()
            .issued_by(&self.authority.key)
            .for_audience(decoded.audience())
            .with_lifetime(request.lifetime.unwrap_or(UPDATED_TOKEN_LIFETIME));

        if let Some(proofs) = decoded.proofs() {
            for cid_string in proofs {
                let resolved = match Cid::try_from(cid_string.as_str()) {
                    Ok(cid) => store.read_token(&cid).await.ok().flatten(),
                    Err(_) => None,
                };

                match resolved.and_then(|token| Ucan::try_from(token.as_str()).ok()) {
                    Some(proof) => builder = builder.witnessed_by(&proof, None),
                    None => warn!(
                        "Dropping unresolvable proof {} while rebuilding token",
                        cid_string
                    ),
                }
            }
        }

        for capability in capabilities.iter() {
            builder = builder.claiming_capability(Capability::from(capability));
        }
        for capability in foreign {
            builder = builder.claiming_capability(capability);
        }

        let rebuilt = builder
            .build()
            .map_err(PalisadeError::Other)?
            .sign()
            .await
            .map_err(PalisadeError::Other)?;
        let encoded = rebuilt.encode().map_err(PalisadeError::Other)?;

        // Validate the regenerated token before persisting it
        let mut did_parser = DidParser::new(SUPPORTED_KEYS);
        let reparsed = Ucan::try_from(encoded.as_str())
            .map_err(|error| PalisadeError::Other(anyhow!("Invalid token generated: {}", error)))?;
        reparsed
            .validate(None, &mut did_parser)
            .await
            .map_err(|error| {
                PalisadeError::Other(anyhow!("Invalid token generated when updating: {}", error))
            })?;

        let mut patch = Map::new();
        patch.insert(token_path.clone(), Value::String(encoded.clone()));
        let patched = self
            .records
            .patch_record(
                &service,
                &subject_id,
                &Value::Object(patch),
                &CallOptions::default(),
            )
            .await
            .map_err(PalisadeError::Other)?;

        Ok(CapabilityUpdateReceipt {
            raw: data,
            encoded: Jwt(encoded),
            subject: patched,
        })
    }
}
