//! Stage 2: access-control stages.
//!
//! The built-in policy is license-gated: a record is publicly readable when
//! its license URI is in the configured public set; gated records carry the
//! configured authorization URL so clients know where to ask. File metadata
//! has no gate at all, only file content does.
//!
//! Defaulting to all-public or all-private when no policy is configured would
//! be unsafe either way, so an unknown policy name fails startup.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::Config;
use crate::error::AppError;
use crate::model::{AuthorisedEntity, AuthorisedFile, Entity, EntityAccess, FileAccess, FileRecord};
use crate::pipeline::{EntityAccessStage, FileAccessStage};

pub struct LicensePolicy {
    public: HashSet<String>,
    authorization_url: Option<String>,
}

impl LicensePolicy {
    pub fn from_config(cfg: &Config) -> Self {
        LicensePolicy {
            public: cfg.public_licenses.iter().cloned().collect(),
            authorization_url: cfg.authorization_url.clone(),
        }
    }

    /// Absent or unknown licenses are closed, not open.
    fn is_public(&self, license: Option<&str>) -> bool {
        license.map(|l| self.public.contains(l)).unwrap_or(false)
    }

    pub fn authorise_entity(&self, record: &Entity, standard: crate::model::StandardEntity) -> AuthorisedEntity {
        let metadata = self.is_public(record.metadata_license_id.as_deref());
        let content = self.is_public(record.content_license_id.as_deref());
        AuthorisedEntity {
            entity: standard,
            access: EntityAccess {
                metadata,
                content,
                content_authorization_url: if content { None } else { self.authorization_url.clone() },
            },
        }
    }

    pub fn authorise_file(&self, record: &FileRecord, standard: crate::model::StandardFile) -> AuthorisedFile {
        let content = self.is_public(record.content_license_id.as_deref());
        AuthorisedFile {
            file: standard,
            access: FileAccess {
                content,
                content_authorization_url: if content { None } else { self.authorization_url.clone() },
            },
        }
    }
}

pub fn entity_stage(policy: Arc<LicensePolicy>) -> EntityAccessStage {
    Arc::new(move |entity, standard, _ctx| {
        let policy = policy.clone();
        Box::pin(async move { Ok(policy.authorise_entity(&entity, standard)) })
    })
}

pub fn file_stage(policy: Arc<LicensePolicy>) -> FileAccessStage {
    Arc::new(move |file, standard, _ctx| {
        let policy = policy.clone();
        Box::pin(async move { Ok(policy.authorise_file(&file, standard)) })
    })
}

/// Everything readable; for development deployments.
pub fn open_entity_stage() -> EntityAccessStage {
    Arc::new(|_entity, standard, _ctx| {
        Box::pin(async move {
            Ok(AuthorisedEntity {
                entity: standard,
                access: EntityAccess { metadata: true, content: true, content_authorization_url: None },
            })
        })
    })
}

pub fn open_file_stage() -> FileAccessStage {
    Arc::new(|_file, standard, _ctx| {
        Box::pin(async move {
            Ok(AuthorisedFile {
                file: standard,
                access: FileAccess { content: true, content_authorization_url: None },
            })
        })
    })
}

/// Resolve the configured access policy into the mandatory pipeline stages.
/// This is the setup-time failure point: a name that resolves to no policy
/// refuses to start the server.
pub fn stages_from_config(cfg: &Config) -> Result<(EntityAccessStage, FileAccessStage), AppError> {
    match cfg.access_policy.as_str() {
        "license" => {
            let policy = Arc::new(LicensePolicy::from_config(cfg));
            Ok((entity_stage(policy.clone()), file_stage(policy)))
        }
        "open" => Ok((open_entity_stage(), open_file_stage())),
        other => Err(AppError::internal(format!(
            "unknown access policy '{other}': an access stage is mandatory"
        ))),
    }
}
