//! The three-stage record transformation pipeline.
//!
//! Stage 1 (base) is fixed and pure: strip store-only fields, fold resolved
//! parent references in. Stage 2 (access) is mandatory and annotates the
//! record with an access block; a pipeline cannot be constructed without it —
//! the access stage is a constructor argument, so "registered without access
//! control" is unrepresentable. Stage 3 is an ordered list of enrichment
//! stages, each free to add arbitrary fields; they run strictly sequentially
//! because later stages may depend on fields added by earlier ones.
//!
//! Across the records of a listing, per-record pipelines are fanned out
//! concurrently; the output order always matches the input order, and the
//! first failing record aborts the whole batch. Partial results are never
//! returned.

use futures_util::future::{try_join_all, BoxFuture};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::context::RequestContext;
use crate::error::AppError;
use crate::model::{
    AuthorisedEntity, AuthorisedFile, Entity, EntityReference, FileRecord, StandardEntity,
    StandardFile,
};
use crate::resolver;

pub mod access;
pub mod base;
pub mod links;

/// An enrichment stage: receives the JSON produced so far and returns a
/// superset of it. May suspend on the request context's collaborators.
pub type ExtraStage =
    Arc<dyn Fn(Value, RequestContext) -> BoxFuture<'static, Result<Value, AppError>> + Send + Sync>;

/// The mandatory access stage for entities. It is handed the raw record
/// alongside the Standard shape: license ids are stripped from Standard, and
/// access decisions need them.
pub type EntityAccessStage = Arc<
    dyn Fn(Entity, StandardEntity, RequestContext) -> BoxFuture<'static, Result<AuthorisedEntity, AppError>>
        + Send
        + Sync,
>;

pub type FileAccessStage = Arc<
    dyn Fn(FileRecord, StandardFile, RequestContext) -> BoxFuture<'static, Result<AuthorisedFile, AppError>>
        + Send
        + Sync,
>;

pub struct EntityPipeline {
    access: EntityAccessStage,
    extras: Vec<ExtraStage>,
}

impl EntityPipeline {
    pub fn new(access: EntityAccessStage) -> Self {
        EntityPipeline { access, extras: Vec::new() }
    }

    pub fn with_extra(mut self, stage: ExtraStage) -> Self {
        self.extras.push(stage);
        self
    }

    /// Transform one record. `refs` is the resolved reference map for the
    /// batch the record belongs to.
    pub async fn run(
        &self,
        entity: Entity,
        refs: &HashMap<String, EntityReference>,
        ctx: &RequestContext,
    ) -> Result<Value, AppError> {
        let standard = base::standard_entity(&entity, refs);
        let authorised = (*self.access)(entity, standard, ctx.clone()).await?;
        let mut value = serde_json::to_value(&authorised)?;
        for extra in &self.extras {
            value = (**extra)(value, ctx.clone()).await?;
        }
        Ok(value)
    }

    /// Transform a batch: one reference-resolution round trip, then
    /// concurrent per-record pipelines with input order preserved.
    pub async fn run_all(
        &self,
        entities: Vec<Entity>,
        ctx: &RequestContext,
    ) -> Result<Vec<Value>, AppError> {
        if entities.is_empty() {
            return Ok(Vec::new());
        }
        let refs = resolver::resolve_references(ctx.app.store.as_ref(), &entities).await?;
        try_join_all(entities.into_iter().map(|entity| self.run(entity, &refs, ctx))).await
    }
}

pub struct FilePipeline {
    access: FileAccessStage,
    extras: Vec<ExtraStage>,
}

impl FilePipeline {
    pub fn new(access: FileAccessStage) -> Self {
        FilePipeline { access, extras: Vec::new() }
    }

    pub fn with_extra(mut self, stage: ExtraStage) -> Self {
        self.extras.push(stage);
        self
    }

    pub async fn run(&self, file: FileRecord, ctx: &RequestContext) -> Result<Value, AppError> {
        let standard = base::standard_file(&file);
        let authorised = (*self.access)(file, standard, ctx.clone()).await?;
        let mut value = serde_json::to_value(&authorised)?;
        for extra in &self.extras {
            value = (**extra)(value, ctx.clone()).await?;
        }
        Ok(value)
    }

    pub async fn run_all(
        &self,
        files: Vec<FileRecord>,
        ctx: &RequestContext,
    ) -> Result<Vec<Value>, AppError> {
        try_join_all(files.into_iter().map(|file| self.run(file, ctx))).await
    }
}
