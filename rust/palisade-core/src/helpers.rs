//! Scaffolding for tests and example embeddings

use crate::{
    authority::{generate_ed25519_key, AuthorityContext, ServiceCapability},
    data::{Did, Jwt},
    engine::AuthEngine,
    store::MemoryServiceStore,
    strategy::AuthConfig,
};
use anyhow::Result;
use noosphere_ucan::{
    builder::UcanBuilder, capability::Capability, crypto::KeyMaterial, store::MemoryStore,
};
use noosphere_ucan_key_support::ed25519::Ed25519KeyMaterial;
use serde_json::{json, Value};

/// A strategy configuration with the conventional names used throughout the
/// test suite
pub fn test_config() -> AuthConfig {
    AuthConfig {
        entity: "login".into(),
        service: "logins".into(),
        client_token: "ucan".into(),
        token_audience: "ucan_aud".into(),
        token_path: "ucan".into(),
        core_path: "core".into(),
        default_scheme: "svc".into(),
        default_hier_part: "notes".into(),
        capability_service: "capabilities".into(),
        entity_id: "did".into(),
        identity_field: "_id".into(),
    }
}

/// Issue a token under the given authority, claiming the given capabilities
/// for the audience
pub async fn issue_token(
    authority: &AuthorityContext,
    audience: &Did,
    capabilities: &[ServiceCapability],
) -> Result<Jwt> {
    let mut builder = UcanBuilder::default()
        .issued_by(&authority.key)
        .for_audience(audience)
        .with_lifetime(3600);

    for capability in capabilities {
        builder = builder.claiming_capability(Capability::from(capability));
    }

    Ok(Jwt(builder.build()?.sign().await?.encode()?))
}

/// A login record shaped the way the test configuration expects
pub fn login_record(id: &str, did: &Did, token: Option<&Jwt>) -> Value {
    let mut record = json!({
        "_id": id,
        "did": String::from(did.clone()),
    });

    if let (Some(object), Some(token)) = (record.as_object_mut(), token) {
        object.insert("ucan".into(), Value::String(String::from(token.clone())));
    }

    record
}

/// An engine over in-memory stores, plus the identities tests need to issue
/// and present tokens
pub struct Scaffold {
    pub engine: AuthEngine<MemoryServiceStore, MemoryStore>,
    pub records: MemoryServiceStore,
    pub proofs: MemoryStore,
    pub authority: AuthorityContext,
    pub user_key: Ed25519KeyMaterial,
    pub user_did: Did,
}

/// Stand up an engine over fresh in-memory stores with an ephemeral
/// authority and one user key pair
pub async fn scaffold() -> Result<Scaffold> {
    let authority = AuthorityContext::ephemeral().await?;
    let user_key = generate_ed25519_key();
    let user_did = Did(user_key.get_did().await?);

    let records = MemoryServiceStore::default();
    let proofs = MemoryStore::default();

    let engine = AuthEngine::new(
        test_config(),
        authority.clone(),
        records.clone(),
        proofs.clone(),
    )?;

    Ok(Scaffold {
        engine,
        records,
        proofs,
        authority,
        user_key,
        user_did,
    })
}
