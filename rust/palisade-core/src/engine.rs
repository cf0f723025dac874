use crate::{
    authority::{
        model_capabilities, or_verify_loop, verify_one, AuthorityContext, MethodRequirements,
        RequiredCapability, Requirement, VerifyCandidate, VerifyOptions, VerifyResult,
    },
    context::{AuthContext, HookType, Method, NoThrowMarker},
    error::PalisadeError,
    path::FieldPath,
    scrub::retain_allowed_fields,
    store::ServiceStore,
    strategy::{self, AuthConfig},
};
use anyhow::Result;
use noosphere_ucan::store::UcanJwtStore;
use serde_json::Value;
use std::str::FromStr;

/// A method allow-list: nothing, everything, or an explicit selection
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum MethodFilter {
    #[default]
    None,
    All,
    Selected(Vec<Method>),
}

impl MethodFilter {
    pub fn covers(&self, method: Method) -> bool {
        match self {
            MethodFilter::None => false,
            MethodFilter::All => true,
            MethodFilter::Selected(methods) => methods.contains(&method),
        }
    }
}

/// One entry of a login-pass method list: a method, optionally restricted to
/// an explicit field allow-list, written `"patch"` or `"patch/title,body"`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodSpec {
    pub method: Method,
    pub fields: Option<Vec<String>>,
}

impl FromStr for MethodSpec {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let (method, fields) = match value.split_once('/') {
            Some((method, fields)) => (
                method,
                Some(
                    fields
                        .split(',')
                        .filter(|field| !field.is_empty())
                        .map(String::from)
                        .collect(),
                ),
            ),
            None => (value, None),
        };

        Ok(MethodSpec {
            method: Method::from_str(method)?,
            fields,
        })
    }
}

/// Which methods a [LoginPassRule] covers
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MethodCoverage {
    All,
    Selected(Vec<MethodSpec>),
}

/// The outcome of asking a [MethodCoverage] about one method
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Coverage<'a> {
    NotCovered,
    Unrestricted,
    Restricted(&'a [String]),
}

impl MethodCoverage {
    /// Parse a list of `"method"` / `"method/field1,field2"` entries
    pub fn parse(entries: &[&str]) -> Result<Self> {
        let specs: Vec<MethodSpec> = entries
            .iter()
            .map(|entry| MethodSpec::from_str(entry))
            .collect::<Result<_>>()?;
        Ok(MethodCoverage::Selected(specs))
    }

    pub fn coverage_for(&self, method: Method) -> Coverage<'_> {
        match self {
            MethodCoverage::All => Coverage::Unrestricted,
            MethodCoverage::Selected(specs) => {
                for spec in specs {
                    if spec.method == method {
                        return match &spec.fields {
                            Some(fields) => Coverage::Restricted(fields),
                            None => Coverage::Unrestricted,
                        };
                    }
                }
                Coverage::NotCovered
            }
        }
    }
}

/// An ownership/identity fallback rule: where on the target record identity
/// values live, and which methods the rule covers
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginPassRule {
    pub paths: Vec<FieldPath>,
    pub methods: MethodCoverage,
}

impl LoginPassRule {
    pub fn new(paths: Vec<FieldPath>, methods: MethodCoverage) -> Self {
        LoginPassRule { paths, methods }
    }

    /// Parse dotted path-specs (wildcard segments allowed) with the given
    /// coverage
    pub fn parse(paths: &[&str], methods: MethodCoverage) -> Result<Self> {
        Ok(LoginPassRule {
            paths: paths
                .iter()
                .map(|path| FieldPath::from_str(path))
                .collect::<Result<_>>()?,
            methods,
        })
    }
}

/// Partial-authorization behavior when the requirement check fails: either
/// any change passes, or the payload is narrowed to the listed fields on
/// mutating methods
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpecialChange {
    All,
    Fields(Vec<String>),
}

/// Per-operation authorization options
#[derive(Clone, Debug, Default)]
pub struct AuthOptions {
    /// Methods verified in OR-mode across the required capabilities
    pub or: MethodFilter,
    /// Methods for which a privileged internal call may bypass the check
    pub admin_pass: MethodFilter,
    /// Ownership/identity fallback rules, evaluated in order
    pub login_pass: Vec<LoginPassRule>,
    /// Partial-authorization behavior after a failed requirement check
    pub special_change: Option<SpecialChange>,
    /// Subject keys whose stored delegated-capability grants may satisfy the
    /// requirement on the caller's behalf
    pub cap_subjects: Vec<String>,
    /// Record a soft marker instead of failing the operation on denial
    pub no_throw: bool,
    /// Log each stage's intermediate verification result
    pub log: bool,
}

/// The authorization decision engine. One engine serves a whole pipeline;
/// each call to [AuthEngine::authorize] is an independent decision that
/// mutates only its own context.
pub struct AuthEngine<R, S>
where
    R: ServiceStore,
    S: UcanJwtStore + Clone,
{
    pub(crate) config: AuthConfig,
    pub(crate) authority: AuthorityContext,
    pub(crate) records: R,
    pub(crate) proofs: S,
}

impl<R, S> AuthEngine<R, S>
where
    R: ServiceStore,
    S: UcanJwtStore + Clone,
{
    pub fn new(
        config: AuthConfig,
        authority: AuthorityContext,
        records: R,
        proofs: S,
    ) -> Result<Self, PalisadeError> {
        config.verify()?;
        Ok(AuthEngine {
            config,
            authority,
            records,
            proofs,
        })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn authority(&self) -> &AuthorityContext {
        &self.authority
    }

    /// Decide whether the caller may perform the operation described by the
    /// context. On grant the context comes back transformed: identity
    /// attached, `authenticated`/`can_update` raised as earned, payload
    /// narrowed under partial authorization. On denial the operation fails
    /// with [PalisadeError::NotAuthorized] unless `no_throw` is set, in
    /// which case a soft marker is recorded instead.
    pub async fn authorize(
        &self,
        requirement: &Requirement,
        options: &AuthOptions,
        context: &mut AuthContext,
    ) -> Result<(), PalisadeError> {
        let login_id = context.caller_id(&self.config);

        // Best-effort authentication only; never fails the operation
        if matches!(requirement, Requirement::NoThrow) {
            if login_id.is_none() {
                strategy::authenticate_soft(&self.records, &self.config, context).await;
            }
            return Ok(());
        }

        if login_id.is_none() {
            if self.admin_bypass_qualifies(options, context)
                || options.special_change.is_some()
            {
                strategy::authenticate_soft(&self.records, &self.config, context).await;
            } else if let Err(error) =
                strategy::authenticate(&self.records, &self.config, context).await
            {
                warn!("Could not authenticate caller: {}", error);
                if options.no_throw {
                    self.record_soft_denial(context);
                    return Ok(());
                }
                return Err(PalisadeError::NotAuthenticated(error.to_string()));
            }
        }

        // Any resolved identity passes, except when special-change is
        // configured: that path has its own narrower semantics and the
        // request must fall through to the requirement/fallback chain.
        if matches!(requirement, Requirement::AnyAuth)
            && options.special_change.is_none()
            && context.caller_id(&self.config).is_some()
        {
            context.params.authenticated = true;
            return Ok(());
        }

        if self.admin_bypass_qualifies(options, context) {
            return Ok(());
        }

        // REQUIREMENT_CHECK
        let requirements = match requirement {
            Requirement::Capabilities(specs) => {
                model_capabilities(specs, &self.authority, &self.config)
            }
            _ => Vec::new(),
        };

        if matches!(requirement, Requirement::Capabilities(_)) && requirements.is_empty() {
            return Ok(());
        }

        let verdict = if requirements.is_empty() {
            // The wildcard requirement reaches this point without any
            // capabilities to check; it fails here so the fallbacks below
            // get their chance to run.
            VerifyResult::denied("Wildcard requirement defers to fallback authorization")
        } else {
            self.verify_against_reqs(&requirements, options, context)
                .await
        };

        if options.log {
            debug!(
                "Requirement verification for {} {}: {:?}",
                context.method, context.path, verdict
            );
        }

        if verdict.ok {
            context.params.authenticated = true;
            context.params.can_update = true;
            return Ok(());
        }

        // FALLBACK_SPECIAL
        match &options.special_change {
            Some(SpecialChange::All) => {
                context.params.can_update = true;
                return Ok(());
            }
            Some(SpecialChange::Fields(fields)) if context.method.mutates() => {
                if let Some(data) = &context.data {
                    context.data = Some(retain_allowed_fields(data, fields)?);
                }
                context.params.can_update = true;
                return Ok(());
            }
            _ => {}
        }

        // FALLBACK_OWNERSHIP
        let owned = match self.login_pass_fallback(options, context).await {
            Ok(owned) => owned,
            Err(error) => {
                warn!("Ownership fallback could not be evaluated: {}", error);
                false
            }
        };

        if options.log {
            debug!(
                "Ownership fallback for {} {}: {}",
                context.method, context.path, owned
            );
        }

        if owned {
            context.params.can_update = true;
            return Ok(());
        }

        // DENIED
        error!(
            "Capability requirements not met: {:?} {}: {}",
            verdict.err, context.hook, context.path
        );

        if options.no_throw {
            self.record_soft_denial(context);
            return Ok(());
        }

        Err(PalisadeError::NotAuthorized {
            hook: context.hook,
            path: context.path.clone(),
            method: context.method,
        })
    }

    /// Dispatch per-method requirement specs for a whole entity collection;
    /// only before-hooks are guarded.
    pub async fn authorize_collection(
        &self,
        methods: &MethodRequirements,
        options: &AuthOptions,
        context: &mut AuthContext,
    ) -> Result<(), PalisadeError> {
        if context.hook != HookType::Before {
            return Ok(());
        }

        match methods.for_method(context.method) {
            Some(requirement) => self.authorize(requirement, options, context).await,
            None => Ok(()),
        }
    }

    /// A store seeded with any supplemental proof tokens the request carried
    pub(crate) async fn seeded_store(&self, context: &AuthContext) -> S {
        let mut store = self.proofs.clone();

        for proof in &context.params.proofs {
            if let Err(error) = store.write_token(proof).await {
                warn!("Could not record supporting proof token: {}", error);
            }
        }

        store
    }

    pub(crate) async fn verify_against_reqs(
        &self,
        requirements: &[RequiredCapability],
        options: &AuthOptions,
        context: &AuthContext,
    ) -> VerifyResult {
        let store = self.seeded_store(context).await;

        let token = context
            .params
            .extension_str(&self.config, &self.config.client_token);
        let audience = context
            .params
            .extension_str(&self.config, &self.config.token_audience);

        let mut verdict = match (token, audience) {
            (Some(token), Some(audience)) if options.or.covers(context.method) => {
                let candidates: Vec<VerifyCandidate> = requirements
                    .iter()
                    .map(|required| VerifyCandidate {
                        token,
                        audience,
                        required,
                    })
                    .collect();
                or_verify_loop(&candidates, &store).await
            }
            (Some(token), Some(audience)) => {
                verify_one(
                    token,
                    &VerifyOptions {
                        audience,
                        required_capabilities: requirements,
                    },
                    &store,
                )
                .await
            }
            _ => VerifyResult::denied("No capability token or audience present in request context"),
        };

        if !verdict.ok && !options.cap_subjects.is_empty() {
            if let Some(login_id) = context.caller_id(&self.config) {
                verdict = self
                    .resolve_delegated(requirements, options, context, &login_id, &store, verdict)
                    .await;
            }
        }

        verdict
    }

    fn admin_bypass_qualifies(&self, options: &AuthOptions, context: &AuthContext) -> bool {
        if !options.admin_pass.covers(context.method) {
            return false;
        }

        context.params.admin_pass
            || context
                .params
                .extension(&self.config, "admin_pass")
                .map(truthy)
                .unwrap_or(false)
    }

    fn record_soft_denial(&self, context: &mut AuthContext) {
        context.params.no_throw_error = Some(NoThrowMarker {
            hook: context.hook,
            method: context.method,
            path: context.path.clone(),
        });
    }

    /// Evaluate the configured login-pass rules in order against the target
    /// record. Returns whether any rule granted access; applies the
    /// all-or-nothing payload narrowing as a side effect.
    async fn login_pass_fallback(
        &self,
        options: &AuthOptions,
        context: &mut AuthContext,
    ) -> Result<bool> {
        if options.login_pass.is_empty() {
            return Ok(false);
        }

        let caller_id = match context.caller_id(&self.config) {
            Some(caller_id) => caller_id,
            None => return Ok(false),
        };

        let mut granted = false;
        let mut scrub_active = true;
        let mut saw_restriction = false;
        let mut allowed_fields: Vec<String> = Vec::new();

        for rule in &options.login_pass {
            let coverage = rule.methods.coverage_for(context.method);
            if coverage == Coverage::NotCovered {
                continue;
            }

            let existing = match context.load_existing(&self.records).await? {
                Some(existing) => existing,
                None => continue,
            };

            // First matching path wins for this rule
            let matched = rule.paths.iter().any(|path| {
                path.resolve(&existing)
                    .iter()
                    .any(|value| value_matches(value, &caller_id))
            });

            if !matched {
                continue;
            }

            granted = true;

            if !context.method.mutates() {
                break;
            }

            match coverage {
                Coverage::Restricted(fields) if scrub_active => {
                    saw_restriction = true;
                    allowed_fields.extend(fields.iter().cloned());
                }
                Coverage::Restricted(_) => {}
                _ => {
                    // A rule that grants without restricting disables
                    // narrowing for the whole evaluation
                    scrub_active = false;
                }
            }

            if !scrub_active {
                break;
            }
        }

        if granted && scrub_active && saw_restriction {
            if let Some(data) = &context.data {
                if data.is_object() {
                    context.data = Some(retain_allowed_fields(data, &allowed_fields)?);
                }
            }
        }

        Ok(granted)
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map(|n| n != 0.0).unwrap_or(false),
        Value::String(string) => !string.is_empty(),
        _ => true,
    }
}

/// String- and array-aware identity comparison between a resolved record
/// value and the caller's identity value
fn value_matches(value: &Value, caller_id: &str) -> bool {
    match value {
        Value::Array(items) => items.iter().any(|item| value_matches(item, caller_id)),
        Value::Null => false,
        Value::String(string) => string == caller_id,
        Value::Number(number) => number.to_string() == caller_id,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        authority::CapabilitySpec,
        context::Method,
        helpers::{issue_token, login_record, scaffold, Scaffold},
    };
    use serde_json::json;

    fn requirement(specs: &[CapabilitySpec]) -> Requirement {
        Requirement::Capabilities(specs.to_vec())
    }

    async fn context_with_token(
        scaffold: &Scaffold,
        method: Method,
        specs: &[CapabilitySpec],
    ) -> AuthContext {
        let config = scaffold.engine.config();
        let capabilities: Vec<_> = specs
            .iter()
            .map(|spec| spec.to_capability(config))
            .collect();
        let token = issue_token(&scaffold.authority, &scaffold.user_did, &capabilities)
            .await
            .unwrap();

        scaffold.records.insert(
            "logins",
            "login-1",
            login_record("login-1", &scaffold.user_did, Some(&token)),
        );

        AuthContext::new(method, "notes")
            .with_extension("ucan", json!(String::from(token)))
            .with_extension("ucan_aud", json!(String::from(scaffold.user_did.clone())))
    }

    #[tokio::test]
    async fn it_grants_a_caller_holding_the_required_capability() {
        let scaffold = scaffold().await.unwrap();
        let specs = [CapabilitySpec::action("notes", "read")];
        let mut context = context_with_token(&scaffold, Method::Get, &specs).await;

        scaffold
            .engine
            .authorize(&requirement(&specs), &AuthOptions::default(), &mut context)
            .await
            .unwrap();

        assert!(context.params.authenticated);
        assert!(context.params.can_update);
        assert!(context.params.entity.is_some(), "login must be attached");
    }

    #[tokio::test]
    async fn it_grants_a_namespace_wildcard_holder_end_to_end() {
        let scaffold = scaffold().await.unwrap();
        let held = [CapabilitySpec::action("notes", "*")];
        let mut context = context_with_token(&scaffold, Method::Get, &held).await;

        scaffold
            .engine
            .authorize(
                &requirement(&[CapabilitySpec::action("notes", "read")]),
                &AuthOptions::default(),
                &mut context,
            )
            .await
            .unwrap();

        assert!(context.params.authenticated);
    }

    #[tokio::test]
    async fn it_grants_in_or_mode_when_one_of_the_requirements_is_held() {
        let scaffold = scaffold().await.unwrap();
        let held = [CapabilitySpec::action("notes", "write")];
        let specs = [
            CapabilitySpec::action("notes", "read"),
            CapabilitySpec::action("notes", "write"),
        ];

        let mut context = context_with_token(&scaffold, Method::Patch, &held).await;
        let options = AuthOptions {
            or: MethodFilter::Selected(vec![Method::Patch]),
            ..Default::default()
        };

        scaffold
            .engine
            .authorize(&requirement(&specs), &options, &mut context)
            .await
            .unwrap();

        assert!(context.params.authenticated);
    }

    #[tokio::test]
    async fn it_grants_record_ownership_with_the_payload_unchanged() {
        let scaffold = scaffold().await.unwrap();
        scaffold.records.insert(
            "notes",
            "note-1",
            json!({ "_id": "note-1", "createdBy": { "login": "login-1" } }),
        );

        let mut context = AuthContext::new(Method::Patch, "notes")
            .with_id("note-1")
            .with_login(json!({ "_id": "login-1" }))
            .with_data(json!({ "title": "x", "secret": "y" }));

        let options = AuthOptions {
            login_pass: vec![LoginPassRule::parse(
                &["createdBy.login"],
                MethodCoverage::All,
            )
            .unwrap()],
            ..Default::default()
        };

        scaffold
            .engine
            .authorize(
                &requirement(&[CapabilitySpec::action("notes", "write")]),
                &options,
                &mut context,
            )
            .await
            .unwrap();

        assert!(context.params.can_update);
        assert_eq!(context.data, Some(json!({ "title": "x", "secret": "y" })));
    }

    #[tokio::test]
    async fn it_narrows_the_payload_under_a_field_restricted_ownership_rule() {
        let scaffold = scaffold().await.unwrap();
        scaffold.records.insert(
            "notes",
            "note-1",
            json!({ "_id": "note-1", "createdBy": { "login": "login-1" } }),
        );

        let mut context = AuthContext::new(Method::Patch, "notes")
            .with_id("note-1")
            .with_login(json!({ "_id": "login-1" }))
            .with_data(json!({ "title": "x", "secret": "y" }));

        let options = AuthOptions {
            login_pass: vec![LoginPassRule::parse(
                &["createdBy.login"],
                MethodCoverage::parse(&["patch/title,body"]).unwrap(),
            )
            .unwrap()],
            ..Default::default()
        };

        scaffold
            .engine
            .authorize(
                &requirement(&[CapabilitySpec::action("notes", "write")]),
                &options,
                &mut context,
            )
            .await
            .unwrap();

        assert!(context.params.can_update);
        assert_eq!(context.data, Some(json!({ "title": "x" })));
    }

    #[tokio::test]
    async fn it_does_not_narrow_when_an_earlier_rule_grants_without_restriction() {
        let scaffold = scaffold().await.unwrap();
        scaffold.records.insert(
            "notes",
            "note-1",
            json!({ "_id": "note-1", "createdBy": { "login": "login-1" } }),
        );

        let mut context = AuthContext::new(Method::Patch, "notes")
            .with_id("note-1")
            .with_login(json!({ "_id": "login-1" }))
            .with_data(json!({ "title": "x", "secret": "y" }));

        let options = AuthOptions {
            login_pass: vec![
                LoginPassRule::parse(&["createdBy.login"], MethodCoverage::All).unwrap(),
                LoginPassRule::parse(
                    &["createdBy.login"],
                    MethodCoverage::parse(&["patch/title"]).unwrap(),
                )
                .unwrap(),
            ],
            ..Default::default()
        };

        scaffold
            .engine
            .authorize(
                &requirement(&[CapabilitySpec::action("notes", "write")]),
                &options,
                &mut context,
            )
            .await
            .unwrap();

        assert_eq!(
            context.data,
            Some(json!({ "title": "x", "secret": "y" })),
            "an unrestricted grant disables narrowing for the whole evaluation"
        );
    }

    #[tokio::test]
    async fn it_denies_with_an_error_naming_the_operation() {
        let scaffold = scaffold().await.unwrap();

        let mut context = AuthContext::new(Method::Patch, "notes")
            .with_login(json!({ "_id": "login-1" }));

        let result = scaffold
            .engine
            .authorize(
                &requirement(&[CapabilitySpec::action("notes", "write")]),
                &AuthOptions::default(),
                &mut context,
            )
            .await;

        match result {
            Err(PalisadeError::NotAuthorized { path, method, .. }) => {
                assert_eq!(path, "notes");
                assert_eq!(method, Method::Patch);
            }
            other => panic!("Expected a denial, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn it_records_a_soft_marker_instead_of_failing_when_no_throw_is_set() {
        let scaffold = scaffold().await.unwrap();

        let mut context = AuthContext::new(Method::Patch, "notes")
            .with_login(json!({ "_id": "login-1" }));

        let options = AuthOptions {
            no_throw: true,
            ..Default::default()
        };

        scaffold
            .engine
            .authorize(
                &requirement(&[CapabilitySpec::action("notes", "write")]),
                &options,
                &mut context,
            )
            .await
            .unwrap();

        let marker = context.params.no_throw_error.expect("marker must be set");
        assert_eq!(marker.method, Method::Patch);
        assert_eq!(marker.path, "notes");
        assert!(!context.params.authenticated);
    }

    #[tokio::test]
    async fn it_returns_a_usable_context_for_the_no_throw_requirement() {
        let scaffold = scaffold().await.unwrap();

        let mut context = AuthContext::new(Method::Find, "notes")
            .with_extension("ucan", json!("garbage"))
            .with_extension("ucan_aud", json!("did:key:znowhere"));

        scaffold
            .engine
            .authorize(
                &Requirement::NoThrow,
                &AuthOptions::default(),
                &mut context,
            )
            .await
            .unwrap();

        assert!(!context.params.authenticated);
        assert!(context.params.no_throw_error.is_none());
        assert!(context.params.entity.is_none());
    }

    #[tokio::test]
    async fn it_grants_any_resolved_identity_under_the_any_auth_requirement() {
        let scaffold = scaffold().await.unwrap();

        let mut context = AuthContext::new(Method::Find, "notes")
            .with_login(json!({ "_id": "login-1" }));

        scaffold
            .engine
            .authorize(&Requirement::AnyAuth, &AuthOptions::default(), &mut context)
            .await
            .unwrap();

        assert!(context.params.authenticated);
    }

    #[tokio::test]
    async fn it_routes_any_auth_through_special_change_when_both_are_configured() {
        let scaffold = scaffold().await.unwrap();

        let mut context = AuthContext::new(Method::Patch, "notes")
            .with_login(json!({ "_id": "login-1" }))
            .with_data(json!({ "title": "x", "secret": "y" }));

        let options = AuthOptions {
            special_change: Some(SpecialChange::Fields(vec!["title".into()])),
            ..Default::default()
        };

        scaffold
            .engine
            .authorize(&Requirement::AnyAuth, &options, &mut context)
            .await
            .unwrap();

        assert!(
            !context.params.authenticated,
            "any-auth must not short-circuit when special-change is configured"
        );
        assert!(context.params.can_update);
        assert_eq!(context.data, Some(json!({ "title": "x" })));
    }

    #[tokio::test]
    async fn it_rejects_a_bulk_payload_in_special_change_mode() {
        let scaffold = scaffold().await.unwrap();

        let mut context = AuthContext::new(Method::Create, "notes")
            .with_login(json!({ "_id": "login-1" }))
            .with_data(json!([{ "title": "x" }]));

        let options = AuthOptions {
            special_change: Some(SpecialChange::Fields(vec!["title".into()])),
            ..Default::default()
        };

        let result = scaffold
            .engine
            .authorize(
                &requirement(&[CapabilitySpec::action("notes", "write")]),
                &options,
                &mut context,
            )
            .await;

        assert!(matches!(result, Err(PalisadeError::InvalidPayload(_))));
    }

    #[tokio::test]
    async fn it_grants_unconditionally_when_special_change_covers_everything() {
        let scaffold = scaffold().await.unwrap();

        let mut context = AuthContext::new(Method::Update, "notes")
            .with_login(json!({ "_id": "login-1" }))
            .with_data(json!({ "anything": true }));

        let options = AuthOptions {
            special_change: Some(SpecialChange::All),
            ..Default::default()
        };

        scaffold
            .engine
            .authorize(
                &requirement(&[CapabilitySpec::action("notes", "write")]),
                &options,
                &mut context,
            )
            .await
            .unwrap();

        assert!(context.params.can_update);
        assert_eq!(context.data, Some(json!({ "anything": true })));
    }

    #[tokio::test]
    async fn it_bypasses_the_check_for_an_allow_listed_admin_call() {
        let scaffold = scaffold().await.unwrap();

        let mut context = AuthContext::new(Method::Remove, "notes");
        context.params.admin_pass = true;

        let options = AuthOptions {
            admin_pass: MethodFilter::Selected(vec![Method::Remove]),
            ..Default::default()
        };

        scaffold
            .engine
            .authorize(
                &requirement(&[CapabilitySpec::action("notes", "write")]),
                &options,
                &mut context,
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn it_grants_an_empty_requirement_to_any_authenticated_caller() {
        let scaffold = scaffold().await.unwrap();

        let mut context = AuthContext::new(Method::Find, "notes")
            .with_login(json!({ "_id": "login-1" }));

        scaffold
            .engine
            .authorize(
                &Requirement::default(),
                &AuthOptions::default(),
                &mut context,
            )
            .await
            .unwrap();

        assert!(!context.params.can_update, "trivial grant earns no flags");
    }

    #[tokio::test]
    async fn it_grants_through_a_stored_delegated_capability() {
        let scaffold = scaffold().await.unwrap();
        let config = scaffold.engine.config().clone();

        let device = crate::authority::AuthorityContext::ephemeral().await.unwrap();
        let delegated = issue_token(
            &scaffold.authority,
            &device.identity,
            &[CapabilitySpec::action("notes", "read").to_capability(&config)],
        )
        .await
        .unwrap();

        scaffold.records.insert(
            "capabilities",
            "grant-1",
            json!({
                "did": String::from(device.identity.clone()),
                "caps": {
                    "notes": {
                        "logins": ["login-1"],
                        "ucan": String::from(delegated)
                    }
                }
            }),
        );

        let mut context = AuthContext::new(Method::Get, "notes")
            .with_login(json!({ "_id": "login-1" }));

        let options = AuthOptions {
            cap_subjects: vec![String::from(device.identity)],
            ..Default::default()
        };

        scaffold
            .engine
            .authorize(
                &requirement(&[CapabilitySpec::action("notes", "read")]),
                &options,
                &mut context,
            )
            .await
            .unwrap();

        assert!(context.params.authenticated);
        assert!(context.params.can_update);
    }

    #[tokio::test]
    async fn it_only_guards_before_hooks_when_dispatching_per_method() {
        let scaffold = scaffold().await.unwrap();

        let methods = MethodRequirements {
            all: Some(requirement(&[CapabilitySpec::action("notes", "write")])),
            ..Default::default()
        };

        let mut after = AuthContext::new(Method::Patch, "notes").with_hook(HookType::After);
        scaffold
            .engine
            .authorize_collection(&methods, &AuthOptions::default(), &mut after)
            .await
            .unwrap();

        let mut before = AuthContext::new(Method::Patch, "notes")
            .with_login(json!({ "_id": "login-1" }));
        let result = scaffold
            .engine
            .authorize_collection(&methods, &AuthOptions::default(), &mut before)
            .await;

        assert!(matches!(
            result,
            Err(PalisadeError::NotAuthorized { .. })
        ));
    }
}
