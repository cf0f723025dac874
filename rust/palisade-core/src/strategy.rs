use crate::{
    authority::SUPPORTED_KEYS,
    context::AuthContext,
    error::PalisadeError,
    store::{CallOptions, ServiceStore},
};
use anyhow::{anyhow, Result};
use noosphere_ucan::{crypto::did::DidParser, Ucan};
use serde_json::{json, Value};

/// Strategy configuration for the decision engine: where tokens and
/// audiences live on the request context, which entity collection holds
/// logins, and the default resource that declarative requirement specs are
/// expanded against.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The entity name of the caller record, e.g. `login`
    pub entity: String,
    /// The service path of the login collection, e.g. `logins`
    pub service: String,
    /// The params extension key holding the presented token
    pub client_token: String,
    /// The params extension key holding the expected token audience
    pub token_audience: String,
    /// The field on a login record that stores its issued token
    pub token_path: String,
    /// The params extension key namespacing pipeline-internal data
    pub core_path: String,
    /// The resource scheme used when a requirement spec does not name one
    pub default_scheme: String,
    /// The resource hierarchical part used when a spec does not name one
    pub default_hier_part: String,
    /// The service path of the delegated-capability records
    pub capability_service: String,
    /// The login field queried against a token's audience, e.g. `did`
    pub entity_id: String,
    /// The field holding a caller's identity value, e.g. `_id`
    pub identity_field: String,
}

impl AuthConfig {
    /// Reject structurally invalid configuration before any decision runs;
    /// a bad strategy configuration is fatal, never retried.
    pub fn verify(&self) -> Result<(), PalisadeError> {
        for (value, name) in [
            (&self.entity, "entity"),
            (&self.service, "service"),
            (&self.client_token, "client_token"),
            (&self.token_audience, "token_audience"),
            (&self.token_path, "token_path"),
            (&self.core_path, "core_path"),
            (&self.default_scheme, "default_scheme"),
            (&self.default_hier_part, "default_hier_part"),
            (&self.capability_service, "capability_service"),
            (&self.entity_id, "entity_id"),
            (&self.identity_field, "identity_field"),
        ] {
            if value.trim().is_empty() {
                return Err(PalisadeError::MissingConfiguration(name));
            }
        }

        Ok(())
    }
}

/// Reject token strings that cannot possibly be valid before handing them to
/// the parser: clients occasionally send literal `null`/`undefined` or
/// truncated header values.
pub fn guard_token(token: &str) -> Result<&str> {
    let token = token.trim();
    let dot_count = token.chars().filter(|character| *character == '.').count();

    if token.is_empty() || token == "null" || token == "undefined" || dot_count != 2 {
        return Err(anyhow!(
            "Invalid or missing capability token in request context"
        ));
    }

    Ok(token)
}

/// Validate a presented token's signature and time bounds, mapping the
/// expiry failure to a distinct user-facing message
pub async fn validate_token(token: &str) -> Result<Ucan> {
    let ucan = Ucan::try_from(token)?;
    let mut did_parser = DidParser::new(SUPPORTED_KEYS);

    ucan.validate(None, &mut did_parser)
        .await
        .map_err(|error| {
            if error.to_string().contains("Expired") {
                anyhow!("Expired capability token")
            } else {
                anyhow!("Could not validate capability token: {}", error)
            }
        })?;

    Ok(ucan)
}

/// Resolve the login record associated with a validated token: the record in
/// the configured login service whose identity field equals the token's
/// audience.
pub async fn resolve_login<R: ServiceStore>(
    records: &R,
    config: &AuthConfig,
    audience: &str,
) -> Result<Value> {
    let mut query = serde_json::Map::new();
    query.insert(config.entity_id.clone(), json!(audience));
    query.insert("$limit".into(), json!(1));
    let query = Value::Object(query);

    let page = records
        .find_records(&config.service, &query, &CallOptions::privileged())
        .await?;

    page.data
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("Could not find login associated with this token"))
}

/// The full (non-swallowing) authentication step: validate the presented
/// token and attach the resolved login entity to the context. Fails when no
/// usable token is present or no login matches.
pub async fn authenticate<R: ServiceStore>(
    records: &R,
    config: &AuthConfig,
    context: &mut AuthContext,
) -> Result<()> {
    if context.params.entity.is_some() {
        return Ok(());
    }

    let token = context
        .params
        .extension_str(config, &config.client_token)
        .ok_or_else(|| anyhow!("Missing capability access token"))?;
    let token = guard_token(token)?;
    let ucan = validate_token(token).await?;

    let audience = context
        .params
        .extension_str(config, &config.token_audience)
        .map(str::to_owned)
        .unwrap_or_else(|| ucan.audience().to_owned());

    let entity = resolve_login(records, config, &audience).await?;
    context.params.entity = Some(entity);

    Ok(())
}

/// The best-effort authentication step: attempt to authenticate, swallow any
/// failure, and always leave the context usable
pub async fn authenticate_soft<R: ServiceStore>(
    records: &R,
    config: &AuthConfig,
    context: &mut AuthContext,
) {
    if let Err(error) = authenticate(records, config, context).await {
        warn!("Best-effort authentication did not resolve a login: {}", error);
    }
}
