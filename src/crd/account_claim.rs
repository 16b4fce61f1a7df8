//! AccountClaim Custom Resource Definition
//!
//! Models the AWS account operator's claim: a request for an AWS account whose
//! credentials are delivered through a secret once the claim is ready.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{ClaimStatus, SecretReference};

/// Specification for an AccountClaim
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "aws.managed.openshift.io",
    version = "v1alpha1",
    kind = "AccountClaim",
    plural = "accountclaims",
    status = "ClaimStatus",
    namespaced,
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#,
    printcolumn = r#"{"name":"Account","type":"string","jsonPath":".spec.byocAWSAccountID"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AccountClaimSpec {
    /// Bring-your-own-cloud claim
    #[serde(default)]
    pub byoc: bool,

    /// AWS account ID, filled in when the claim becomes ready
    #[serde(default, rename = "byocAWSAccountID")]
    pub byoc_aws_account_id: String,

    /// Where to write the account credentials
    #[serde(default)]
    pub aws_credential_secret: SecretReference,

    /// Legal entity owning the account
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_entity: Option<LegalEntity>,
}

/// Owner of a claimed account
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct LegalEntity {
    /// Entity name
    #[serde(default)]
    pub name: String,

    /// Entity identifier
    #[serde(default)]
    pub id: String,
}
