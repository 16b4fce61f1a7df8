//! AccountClaim lifecycle policy

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::ResourceExt;

use super::artifacts::aws_account_id;
use super::{SimulatedResource, StatePosition, CLAIM_ERROR_STATE};
use crate::config::KindConfig;
use crate::crd::{AccountClaim, Condition};
use crate::kind::ResourceKind;

impl SimulatedResource for AccountClaim {
    const KIND: ResourceKind = ResourceKind::AccountClaim;
    const FAILURE_STATE: &'static str = CLAIM_ERROR_STATE;

    fn derive_state(&self, _config: &KindConfig) -> Option<String> {
        self.status
            .as_ref()
            .and_then(|s| s.state())
            .map(str::to_string)
    }

    fn is_settled(&self, config: &KindConfig) -> bool {
        // State and account ID land in separate writes; both are needed
        match self.derive_state(config) {
            Some(s) if s == Self::FAILURE_STATE => true,
            Some(s) => config.is_terminal(&s) && !self.spec.byoc_aws_account_id.is_empty(),
            None => false,
        }
    }

    fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map(|s| s.conditions.as_slice())
            .unwrap_or_default()
    }

    fn conditions_mut(&mut self) -> &mut Vec<Condition> {
        &mut self.status.get_or_insert_with(Default::default).conditions
    }

    fn record_state(&mut self, state: &str) {
        self.status.get_or_insert_with(Default::default).state = Some(state.to_string());
    }

    fn enter_state(&mut self, position: StatePosition<'_>, _now: DateTime<Utc>) {
        if position.is_terminal() && self.spec.byoc_aws_account_id.is_empty() {
            let namespace = self.namespace().unwrap_or_default();
            self.spec.byoc_aws_account_id = aws_account_id(&namespace, &self.name_any());
        }
    }

    fn mark_failed(&mut self) {}

    fn spec_eq(&self, other: &Self) -> bool {
        self.spec == other.spec
    }

    fn credential_secret(&self) -> Option<Secret> {
        let reference = &self.spec.aws_credential_secret;
        if !reference.is_set() {
            return None;
        }

        let namespace = if reference.namespace.is_empty() {
            self.namespace()
        } else {
            Some(reference.namespace.clone())
        };

        let data = BTreeMap::from([
            (
                "aws_access_key_id".to_string(),
                ByteString(b"simulated-access-key-id".to_vec()),
            ),
            (
                "aws_secret_access_key".to_string(),
                ByteString(b"simulated-secret-access-key".to_vec()),
            ),
        ]);

        Some(Secret {
            metadata: ObjectMeta {
                name: Some(reference.name.clone()),
                namespace,
                ..Default::default()
            },
            type_: Some("Opaque".to_string()),
            data: Some(data),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_fixtures::account_claim;
    use super::super::StateMachine;
    use super::*;
    use crate::config::SimulatorConfig;
    use crate::crd::SecretReference;
    use std::sync::Arc;

    fn machine() -> StateMachine<AccountClaim> {
        StateMachine::new(Arc::new(SimulatorConfig::default()))
    }

    #[test]
    fn test_ready_synthesizes_account_id_once() {
        let sm = machine();
        let mut ac = account_claim("ac1", None);

        sm.apply_state(&mut ac, "Ready").unwrap();
        let first = ac.spec.byoc_aws_account_id.clone();
        sm.apply_state(&mut ac, "Ready").unwrap();

        assert_eq!(first.len(), 12);
        assert_eq!(ac.spec.byoc_aws_account_id, first);
    }

    #[test]
    fn test_preset_account_id_is_kept() {
        let mut ac = account_claim("ac1", None);
        ac.spec.byoc_aws_account_id = "000000000001".to_string();
        machine().apply_state(&mut ac, "Ready").unwrap();
        assert_eq!(ac.spec.byoc_aws_account_id, "000000000001");
    }

    #[test]
    fn test_pending_does_not_synthesize() {
        let mut ac = account_claim("ac1", None);
        machine().apply_state(&mut ac, "Pending").unwrap();
        assert!(ac.spec.byoc_aws_account_id.is_empty());
        assert_eq!(ac.status.unwrap().state.as_deref(), Some("Pending"));
    }

    #[test]
    fn test_settled_states() {
        let config = SimulatorConfig::default().account_claim;
        assert!(!account_claim("a", None).is_settled(&config));
        assert!(!account_claim("a", Some("Pending")).is_settled(&config));
        assert!(account_claim("a", Some("Error")).is_settled(&config));

        let mut ready = account_claim("a", Some("Ready"));
        assert!(!ready.is_settled(&config));
        ready.spec.byoc_aws_account_id = "123456789012".to_string();
        assert!(ready.is_settled(&config));
    }

    mod credential_secret {
        use super::*;

        #[test]
        fn test_no_reference_no_secret() {
            assert!(account_claim("ac1", None).credential_secret().is_none());
        }

        #[test]
        fn test_secret_defaults_to_claim_namespace() {
            let mut ac = account_claim("ac1", None);
            ac.spec.aws_credential_secret = SecretReference {
                name: "aws-creds".to_string(),
                namespace: String::new(),
            };

            let secret = ac.credential_secret().unwrap();

            assert_eq!(secret.metadata.name.as_deref(), Some("aws-creds"));
            assert_eq!(secret.metadata.namespace.as_deref(), Some("uhc"));
            assert_eq!(secret.type_.as_deref(), Some("Opaque"));
            let data = secret.data.unwrap();
            assert!(data.contains_key("aws_access_key_id"));
            assert!(data.contains_key("aws_secret_access_key"));
        }

        #[test]
        fn test_secret_honors_explicit_namespace() {
            let mut ac = account_claim("ac1", None);
            ac.spec.aws_credential_secret = SecretReference {
                name: "aws-creds".to_string(),
                namespace: "cluster-ns".to_string(),
            };
            let secret = ac.credential_secret().unwrap();
            assert_eq!(secret.metadata.namespace.as_deref(), Some("cluster-ns"));
        }
    }
}
