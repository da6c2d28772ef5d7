//! Entity types stored by the auth adaptor collections.

use crate::codec::{Document, FieldMap, FieldReader, FieldWriter};
use crate::error::Result;

/// A CRM user linked to an identity-management account.
///
/// Stored in the `users` collection under its CRM user id and indexed by its
/// identity-management GUID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    pub idm_org_id: i64,
    pub idm_guid: String,
    pub crm_organization_id: Option<String>,
    pub crm_user_id: String,
    pub access: bool,
    pub sandbox: bool,
    pub api_instance_url: Option<String>,
}

impl User {
    pub const IDM_ORG_ID: &'static str = "idm_org_id";
    pub const IDM_GUID: &'static str = "idm_guid";
    pub const CRM_ORGANIZATION_ID: &'static str = "crm_organization_id";
    pub const CRM_USER_ID: &'static str = "crm_user_id";
    pub const ACCESS: &'static str = "access";
    pub const SANDBOX: &'static str = "sandbox";
    pub const API_INSTANCE_URL: &'static str = "api_instance_url";
}

impl Document for User {
    const INDEX_NAME: Option<&'static str> = Some("idmguid");

    fn id(&self) -> &str {
        &self.crm_user_id
    }

    fn indexed_value(&self) -> Option<&str> {
        Some(self.idm_guid.as_str()).filter(|guid| !guid.is_empty())
    }

    fn encode(&self) -> FieldMap {
        FieldWriter::new()
            .int(Self::IDM_ORG_ID, self.idm_org_id)
            .string(Self::IDM_GUID, &self.idm_guid)
            .optional_string(Self::CRM_ORGANIZATION_ID, self.crm_organization_id.as_deref())
            .string(Self::CRM_USER_ID, &self.crm_user_id)
            .bool(Self::ACCESS, self.access)
            .bool(Self::SANDBOX, self.sandbox)
            .optional_string(Self::API_INSTANCE_URL, self.api_instance_url.as_deref())
            .finish()
    }

    fn decode(fields: &FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            idm_org_id: fields.int(Self::IDM_ORG_ID)?,
            idm_guid: fields.string(Self::IDM_GUID),
            crm_organization_id: fields.optional_string(Self::CRM_ORGANIZATION_ID),
            crm_user_id: fields.string(Self::CRM_USER_ID),
            access: fields.bool(Self::ACCESS),
            sandbox: fields.bool(Self::SANDBOX),
            api_instance_url: fields.optional_string(Self::API_INSTANCE_URL),
        })
    }
}

/// An OAuth token held for a CRM user.
///
/// Used by both the `token_cache` and `refresh_tokens` collections, keyed by
/// CRM user id. Tokens carry no secondary index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Token {
    pub crm_organization_id: Option<String>,
    pub crm_user_id: String,
    pub token: Option<String>,
    pub encrypted_token: Option<String>,
    pub failure_count: Option<i64>,
}

impl Token {
    pub const CRM_ORGANIZATION_ID: &'static str = "crm_organization_id";
    pub const CRM_USER_ID: &'static str = "crm_user_id";
    pub const TOKEN: &'static str = "token";
    pub const ENCRYPTED_TOKEN: &'static str = "encrypted_token";
    pub const FAILURE_COUNT: &'static str = "failure_count";
}

impl Document for Token {
    fn id(&self) -> &str {
        &self.crm_user_id
    }

    fn encode(&self) -> FieldMap {
        FieldWriter::new()
            .optional_string(Self::CRM_ORGANIZATION_ID, self.crm_organization_id.as_deref())
            .string(Self::CRM_USER_ID, &self.crm_user_id)
            .optional_string(Self::TOKEN, self.token.as_deref())
            .optional_string(Self::ENCRYPTED_TOKEN, self.encrypted_token.as_deref())
            .optional_int(Self::FAILURE_COUNT, self.failure_count)
            .finish()
    }

    fn decode(fields: &FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            crm_organization_id: fields.optional_string(Self::CRM_ORGANIZATION_ID),
            crm_user_id: fields.string(Self::CRM_USER_ID),
            token: fields.optional_string(Self::TOKEN),
            encrypted_token: fields.optional_string(Self::ENCRYPTED_TOKEN),
            failure_count: fields.optional_int(Self::FAILURE_COUNT)?,
        })
    }
}
