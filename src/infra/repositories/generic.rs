//! Generic repository over any [`BaseEntity`].
//!
//! One instance serves one entity type inside one unit of work. Reads go
//! straight to the store through the unit's current connection; writes are
//! staged and reach the store on the unit's next save.

use std::marker::PhantomData;
use std::sync::Arc;

use sea_orm::sea_query::IntoCondition;
use sea_orm::{IntoActiveModel, PaginatorTrait, QueryFilter, QuerySelect, Select};

use super::query::{order_by_identity, QuerySpec};
use super::tracking::{has_generated_key, ChangeKind, StagedChange};
use crate::domain::{entity_name, BaseEntity};
use crate::errors::{RepoError, RepoResult};
use crate::infra::paging;
use crate::infra::session::{on_session, Session};
use crate::types::{PageRequest, PaginationResult};

/// Repository bound to one session.
///
/// Obtained from [`UnitOfWork::repo`](crate::infra::UnitOfWork::repo).
pub struct GenericRepository<E: BaseEntity> {
    session: Arc<Session>,
    _entity: PhantomData<E>,
}

impl<E> GenericRepository<E>
where
    E: BaseEntity,
    E::Model: Sync + IntoActiveModel<E::ActiveModel>,
    E::ActiveModel: Send,
{
    pub(crate) fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            _entity: PhantomData,
        }
    }

    // =========================================================================
    // Writes (staged)
    // =========================================================================

    /// Stage an insert. The model is tracked from now on.
    ///
    /// When the store generates the primary key, the key of `entity` is
    /// ignored and the inserted row becomes tracked under its real identity
    /// once the next save has committed.
    pub async fn add(&self, entity: E::Model) -> RepoResult<E::Model> {
        self.session.ensure_open().await?;
        if !has_generated_key::<E>() {
            self.session.tracker().attach::<E>(entity.clone());
        }
        self.session
            .stage(Box::new(StagedChange::<E>::new(ChangeKind::Insert, entity.clone())));
        Ok(entity)
    }

    pub async fn add_range(&self, entities: Vec<E::Model>) -> RepoResult<()> {
        for entity in entities {
            self.add(entity).await?;
        }
        Ok(())
    }

    /// Stage a full-record replace. Last writer wins.
    pub async fn update(&self, entity: E::Model) -> RepoResult<E::Model> {
        self.session.ensure_open().await?;
        self.session.tracker().attach::<E>(entity.clone());
        self.session
            .stage(Box::new(StagedChange::<E>::new(ChangeKind::Update, entity.clone())));
        Ok(entity)
    }

    /// Stage a delete of this record.
    pub async fn delete(&self, entity: E::Model) -> RepoResult<()> {
        self.session.ensure_open().await?;
        self.session.tracker().detach::<E>(&E::id(&entity));
        self.session
            .stage(Box::new(StagedChange::<E>::new(ChangeKind::Delete, entity)));
        Ok(())
    }

    /// Stage a delete by identity. Nothing happens when no record has it.
    pub async fn delete_by_id(&self, id: E::Id) -> RepoResult<()> {
        match self.get_by_id(id.clone()).await? {
            Some(entity) => self.delete(entity).await,
            None => {
                tracing::debug!(entity = %entity_name::<E>(), id = ?id, "Delete skipped, no such record");
                Ok(())
            }
        }
    }

    pub async fn delete_range(&self, entities: Vec<E::Model>) -> RepoResult<()> {
        for entity in entities {
            self.delete(entity).await?;
        }
        Ok(())
    }

    // =========================================================================
    // Existence and counting
    // =========================================================================

    pub async fn exists(&self, id: E::Id) -> RepoResult<bool> {
        let select = E::find_by_id(id);
        let found = on_session!(self.session, |db| select.count(db).await?);
        Ok(found > 0)
    }

    pub async fn exists_where<F: IntoCondition>(&self, filter: F) -> RepoResult<bool> {
        Ok(self.count_where(filter).await? > 0)
    }

    /// Total records, unfiltered
    pub async fn count(&self) -> RepoResult<u64> {
        let select = E::find();
        Ok(on_session!(self.session, |db| select.count(db).await?))
    }

    pub async fn count_where<F: IntoCondition>(&self, filter: F) -> RepoResult<u64> {
        let select = E::find().filter(filter.into_condition());
        Ok(on_session!(self.session, |db| select.count(db).await?))
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Identity lookup. A tracked copy wins over the store; a store hit
    /// becomes tracked.
    pub async fn get_by_id(&self, id: E::Id) -> RepoResult<Option<E::Model>> {
        let tracked = self.session.tracker().tracked::<E>(&id);
        if tracked.is_some() {
            return Ok(tracked);
        }

        let select = E::find_by_id(id);
        let found = on_session!(self.session, |db| select.one(db).await?);
        Ok(found.map(|model| self.session.tracker().resolve::<E>(model)))
    }

    /// Identity lookup for read-only use outside the change set.
    ///
    /// The record is not tracked afterwards, even if it was before. Staged
    /// writes for it are kept.
    pub async fn get_by_id_detached(&self, id: E::Id) -> RepoResult<Option<E::Model>> {
        let tracked = self.session.tracker().detach::<E>(&id);
        if tracked.is_some() {
            return Ok(tracked);
        }

        let select = E::find_by_id(id);
        Ok(on_session!(self.session, |db| select.one(db).await?))
    }

    /// Identity lookup that applies the query's loader and tracking mode.
    pub async fn get_by_id_with(
        &self,
        id: E::Id,
        spec: QuerySpec<E>,
    ) -> RepoResult<Option<E::Model>> {
        let select = spec.apply_filter_and_include(E::find_by_id(id));
        let found = on_session!(self.session, |db| select.one(db).await?);
        Ok(found.map(|model| self.track_if(&spec, model)))
    }

    /// Single-or-none lookup.
    ///
    /// Fails with [`RepoError::AmbiguousResult`] when the filter matches
    /// more than one record. Use [`get_by_condition`](Self::get_by_condition)
    /// when the first match is good enough.
    pub async fn find<F: IntoCondition>(&self, filter: F) -> RepoResult<Option<E::Model>> {
        let select = E::find().filter(filter.into_condition()).limit(2);
        let mut found = on_session!(self.session, |db| select.all(db).await?);

        if found.len() > 1 {
            return Err(RepoError::ambiguous(entity_name::<E>()));
        }
        Ok(found
            .pop()
            .map(|model| self.session.tracker().resolve::<E>(model)))
    }

    /// First-or-none lookup using the query's filter, loader and ordering.
    pub async fn get_by_condition(&self, spec: QuerySpec<E>) -> RepoResult<Option<E::Model>> {
        let select = spec.unpaged().apply(E::find());
        let found = on_session!(self.session, |db| select.one(db).await?);
        Ok(found.map(|model| self.track_if(&spec, model)))
    }

    /// Every record matching the spec, composed as filter, loader,
    /// ordering, pagination.
    pub async fn get_all(&self, spec: QuerySpec<E>) -> RepoResult<Vec<E::Model>> {
        let select = spec.apply(E::find());
        let models = on_session!(self.session, |db| select.all(db).await?);
        Ok(self.track_all_if(&spec, models))
    }

    /// Whether a model with this identity is attached to the session
    pub fn is_tracked(&self, id: &E::Id) -> bool {
        self.session.tracker().is_tracked::<E>(id)
    }

    // =========================================================================
    // Pagination
    // =========================================================================

    /// Store-level pagination: the count and the slice are both computed by
    /// the store. `item_amount` is the full filtered count.
    pub async fn as_paginated(
        &self,
        page: i64,
        page_size: i64,
        spec: QuerySpec<E>,
    ) -> RepoResult<PaginationResult<E::Model>> {
        let request = PageRequest::new(page, page_size);
        let select = spec.apply_ordered(E::find());
        let result = on_session!(self.session, |db| paging::fetch_page(select, db, request)
            .await?);

        tracing::debug!(
            entity = %entity_name::<E>(),
            page = result.current_page(),
            items = result.content().len(),
            total = result.item_amount(),
            "Paginated at store"
        );
        Ok(self.track_page_if(&spec, result))
    }

    /// In-memory pagination: the whole filtered, ordered set is loaded and
    /// sliced locally. Only suitable for bounded result sets.
    pub async fn as_paginated_in_ram(
        &self,
        page: i64,
        page_size: i64,
        spec: QuerySpec<E>,
    ) -> RepoResult<PaginationResult<E::Model>> {
        let request = PageRequest::new(page, page_size);
        let select = spec.apply_ordered(E::find());
        let models = on_session!(self.session, |db| select.all(db).await?);

        tracing::debug!(
            entity = %entity_name::<E>(),
            loaded = models.len(),
            "Paginating in memory"
        );
        let result = PaginationResult::from_items(models, request);
        Ok(self.track_page_if(&spec, result))
    }

    /// Raw query plan for callers that compose their own.
    pub fn query(&self) -> Select<E> {
        E::find()
    }

    /// Store-level pagination of a caller-built plan with a projection.
    ///
    /// Identity is appended to the plan's ordering as a tie-breaker.
    pub async fn paginate_query<T, F>(
        &self,
        select: Select<E>,
        page: i64,
        page_size: i64,
        map_to_dto: F,
    ) -> RepoResult<PaginationResult<T>>
    where
        F: FnMut(E::Model) -> T,
    {
        let request = PageRequest::new(page, page_size);
        let select = order_by_identity(select);
        Ok(on_session!(self.session, |db| paging::paginate(
            select, db, request, map_to_dto
        )
        .await?))
    }

    fn track_if(&self, spec: &QuerySpec<E>, model: E::Model) -> E::Model {
        if spec.is_tracking() {
            self.session.tracker().resolve::<E>(model)
        } else {
            model
        }
    }

    fn track_all_if(&self, spec: &QuerySpec<E>, models: Vec<E::Model>) -> Vec<E::Model> {
        if !spec.is_tracking() {
            return models;
        }
        let mut tracker = self.session.tracker();
        models
            .into_iter()
            .map(|model| tracker.resolve::<E>(model))
            .collect()
    }

    fn track_page_if(
        &self,
        spec: &QuerySpec<E>,
        result: PaginationResult<E::Model>,
    ) -> PaginationResult<E::Model> {
        if !spec.is_tracking() {
            return result;
        }
        let mut tracker = self.session.tracker();
        result.map(|model| tracker.resolve::<E>(model))
    }
}
