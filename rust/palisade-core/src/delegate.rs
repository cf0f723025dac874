use crate::{
    authority::{or_verify_loop, verify_one, RequiredCapability, VerifyCandidate, VerifyOptions, VerifyResult},
    context::AuthContext,
    engine::{AuthEngine, AuthOptions},
    store::{CallOptions, DelegatedCapabilityRecord, ServiceStore},
};
use noosphere_ucan::{store::UcanJwtStore, Ucan};
use serde_json::json;

impl<R, S> AuthEngine<R, S>
where
    R: ServiceStore,
    S: UcanJwtStore + Clone,
{
    /// Look up stored delegated-capability records for the configured
    /// subjects and replay verification with any grant whose `logins` names
    /// the caller, using the record's subject as the audience. The first
    /// success wins; otherwise the last failure is returned. A grant whose
    /// embedded token cannot even be parsed is logged and skipped rather
    /// than failing the resolution.
    pub(crate) async fn resolve_delegated(
        &self,
        requirements: &[RequiredCapability],
        options: &AuthOptions,
        context: &AuthContext,
        login_id: &str,
        store: &S,
        mut verdict: VerifyResult,
    ) -> VerifyResult {
        let query = json!({
            "did": { "$in": options.cap_subjects },
            "$limit": options.cap_subjects.len()
        });

        let page = match self
            .records
            .find_records(&self.config.capability_service, &query, &CallOptions::privileged())
            .await
        {
            Ok(page) => page,
            Err(error) => {
                warn!("Could not fetch delegated capability records: {}", error);
                verdict.err.push(error.to_string());
                return verdict;
            }
        };

        let or_mode = options.or.covers(context.method);

        for row in page.data {
            let record: DelegatedCapabilityRecord = match serde_json::from_value(row) {
                Ok(record) => record,
                Err(error) => {
                    warn!("Skipping malformed delegated capability record: {}", error);
                    continue;
                }
            };

            for (name, grant) in &record.caps {
                if !grant.logins.iter().any(|login| login == login_id) {
                    continue;
                }

                if let Err(error) = Ucan::try_from(grant.ucan.as_str()) {
                    warn!("Skipping delegated capability {}: {}", name, error);
                    continue;
                }

                verdict = if or_mode {
                    let candidates: Vec<VerifyCandidate> = requirements
                        .iter()
                        .map(|required| VerifyCandidate {
                            token: grant.ucan.as_str(),
                            audience: record.did.as_str(),
                            required,
                        })
                        .collect();
                    or_verify_loop(&candidates, store).await
                } else {
                    verify_one(
                        grant.ucan.as_str(),
                        &VerifyOptions {
                            audience: record.did.as_str(),
                            required_capabilities: requirements,
                        },
                        store,
                    )
                    .await
                };

                if verdict.ok {
                    return verdict;
                }
            }
        }

        verdict
    }
}
