use crate::{
    data::Jwt,
    store::{CallOptions, ServiceStore},
    strategy::AuthConfig,
};
use anyhow::Result;
use serde_json::Value;
use std::collections::BTreeMap;
use strum_macros::{Display, EnumString};

/// The service method an operation is invoked with
#[derive(Clone, Copy, Debug, Display, EnumString, PartialEq, Eq, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum Method {
    Get,
    Find,
    Create,
    Patch,
    Update,
    Remove,
}

impl Method {
    /// True for the methods that carry a mutable payload
    pub fn mutates(&self) -> bool {
        matches!(self, Method::Create | Method::Patch | Method::Update)
    }
}

/// Whether the authorization hook runs before or after the guarded operation
#[derive(Clone, Copy, Debug, Default, Display, EnumString, PartialEq, Eq, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum HookType {
    #[default]
    Before,
    After,
}

/// The soft-failure marker recorded on the context when a denial is
/// configured not to fail the operation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoThrowMarker {
    pub hook: HookType,
    pub method: Method,
    pub path: String,
}

/// Request parameters the decision engine reads and writes. The named fields
/// are the ones the engine interprets; everything else the surrounding
/// pipeline cares about travels in `extensions`, including the configured
/// token and audience locations.
#[derive(Clone, Debug, Default)]
pub struct Params {
    /// The caller entity resolved by authentication
    pub entity: Option<Value>,
    /// A login record attached directly by the pipeline
    pub login: Option<Value>,
    /// The entity attached to a long-lived connection, if any
    pub connection: Option<Value>,
    /// Set by privileged internal calls to bypass method allow-lists
    pub admin_pass: bool,
    /// Raised once the caller's identity has been proven; never lowered
    /// within one evaluation
    pub authenticated: bool,
    /// Raised once the caller may mutate the target record; never lowered
    /// within one evaluation
    pub can_update: bool,
    /// Present when a denial was recorded instead of thrown
    pub no_throw_error: Option<NoThrowMarker>,
    /// Supplemental proof tokens backing the presented token's chain
    pub proofs: Vec<Jwt>,
    pub extensions: BTreeMap<String, Value>,
}

impl Params {
    /// Read an extension value, falling back to the pipeline's namespaced
    /// sub-object when the key is not present at the top level
    pub fn extension<'a>(&'a self, config: &AuthConfig, key: &str) -> Option<&'a Value> {
        self.extensions
            .get(key)
            .or_else(|| self.extensions.get(&config.core_path)?.get(key))
    }

    pub fn extension_str<'a>(&'a self, config: &AuthConfig, key: &str) -> Option<&'a str> {
        self.extension(config, key)?.as_str()
    }
}

/// The mutable request context of one guarded operation
#[derive(Clone, Debug)]
pub struct AuthContext {
    pub method: Method,
    pub hook: HookType,
    /// The service path of the guarded entity collection
    pub path: String,
    pub id: Option<String>,
    /// The request payload for create/patch/update; may be narrowed by
    /// partial authorization
    pub data: Option<Value>,
    pub params: Params,
    existing: Option<Option<Value>>,
}

impl AuthContext {
    pub fn new(method: Method, path: &str) -> Self {
        AuthContext {
            method,
            hook: HookType::Before,
            path: path.to_owned(),
            id: None,
            data: None,
            params: Params::default(),
            existing: None,
        }
    }

    pub fn with_hook(mut self, hook: HookType) -> Self {
        self.hook = hook;
        self
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_owned());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_login(mut self, login: Value) -> Self {
        self.params.login = Some(login);
        self
    }

    pub fn with_extension(mut self, key: &str, value: Value) -> Self {
        self.params.extensions.insert(key.to_owned(), value);
        self
    }

    /// The caller's identity value, resolved in order from the authenticated
    /// entity, a bare login record, and the connection entity
    pub fn caller_id(&self, config: &AuthConfig) -> Option<String> {
        for candidate in [
            self.params.entity.as_ref(),
            self.params.login.as_ref(),
            self.params.connection.as_ref(),
        ]
        .into_iter()
        .flatten()
        {
            if let Some(value) = candidate.get(&config.identity_field) {
                return match value {
                    Value::String(id) => Some(id.clone()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                };
            }
        }
        None
    }

    /// Fetch the record targeted by this operation, bypassing downstream
    /// hooks. The fetch happens at most once per decision; repeated fallback
    /// stages see the memoized result.
    pub async fn load_existing<R: ServiceStore>(
        &mut self,
        records: &R,
    ) -> Result<Option<Value>> {
        if let Some(cached) = &self.existing {
            return Ok(cached.clone());
        }

        let fetched = match &self.id {
            Some(id) => {
                records
                    .get_record(&self.path, id, &CallOptions::privileged())
                    .await?
            }
            None => None,
        };

        self.existing = Some(fetched.clone());
        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{helpers::test_config, store::MemoryServiceStore};
    use serde_json::json;

    #[test]
    fn it_resolves_the_caller_identity_in_attachment_order() {
        let config = test_config();
        let mut context = AuthContext::new(Method::Get, "notes");

        assert_eq!(context.caller_id(&config), None);

        context.params.connection = Some(json!({ "_id": "connection-login" }));
        assert_eq!(context.caller_id(&config), Some("connection-login".into()));

        context.params.login = Some(json!({ "_id": "bare-login" }));
        assert_eq!(context.caller_id(&config), Some("bare-login".into()));

        context.params.entity = Some(json!({ "_id": "entity-login" }));
        assert_eq!(context.caller_id(&config), Some("entity-login".into()));
    }

    #[tokio::test]
    async fn it_memoizes_the_existing_record_per_decision() {
        let records = MemoryServiceStore::default();
        records.insert("notes", "note-1", json!({ "_id": "note-1", "title": "first" }));

        let mut context = AuthContext::new(Method::Patch, "notes").with_id("note-1");

        let first = context.load_existing(&records).await.unwrap();
        assert_eq!(first.unwrap()["title"], "first");

        records.insert("notes", "note-1", json!({ "_id": "note-1", "title": "second" }));

        let second = context.load_existing(&records).await.unwrap();
        assert_eq!(
            second.unwrap()["title"],
            "first",
            "repeated fallbacks must not refetch"
        );
    }
}
