//! [`QuerySpec`]: the shape of a repository read.
//!
//! One value carries every optional part of a read. Stages are always
//! applied in the same order: filter, related-entity loading, ordering,
//! pagination.

use std::fmt;
use std::sync::Arc;

use sea_orm::sea_query::IntoCondition;
use sea_orm::{
    Condition, EntityTrait, Iterable, PrimaryKeyToColumn, QueryFilter, QueryOrder, QuerySelect,
    Select,
};

use crate::types::PageRequest;

/// Query-shaping step over a plan, used for ordering and related loading
pub type QueryStep<E> = Arc<dyn Fn(Select<E>) -> Select<E> + Send + Sync>;

/// Optional filter, loader, ordering, tracking mode and page window.
///
/// ```ignore
/// let spec = QuerySpec::<item::Entity>::new()
///     .filter(item::Column::Price.gte(10))
///     .include(|q| q.join(JoinType::LeftJoin, item::Relation::Category.def()))
///     .order_by(|q| q.order_by_asc(category::Column::Name))
///     .page(2, 20);
/// ```
pub struct QuerySpec<E: EntityTrait> {
    filter: Option<Condition>,
    include: Option<QueryStep<E>>,
    order_by: Option<QueryStep<E>>,
    no_tracking: bool,
    page: Option<PageRequest>,
}

impl<E: EntityTrait> QuerySpec<E> {
    /// Empty spec: everything, store order, untracked, unpaged
    pub fn new() -> Self {
        Self {
            filter: None,
            include: None,
            order_by: None,
            no_tracking: true,
            page: None,
        }
    }

    /// Add a predicate; repeated calls are combined with AND.
    pub fn filter<F: IntoCondition>(mut self, filter: F) -> Self {
        let filter = filter.into_condition();
        self.filter = Some(match self.filter.take() {
            Some(existing) => Condition::all().add(existing).add(filter),
            None => filter,
        });
        self
    }

    /// Add a related-entity loader; repeated calls run in call order.
    pub fn include<F>(mut self, include: F) -> Self
    where
        F: Fn(Select<E>) -> Select<E> + Send + Sync + 'static,
    {
        let step: QueryStep<E> = match self.include.take() {
            Some(previous) => Arc::new(move |query: Select<E>| include(previous(query))),
            None => Arc::new(include),
        };
        self.include = Some(step);
        self
    }

    /// Set the ordering, replacing any previous one.
    pub fn order_by<F>(mut self, order_by: F) -> Self
    where
        F: Fn(Select<E>) -> Select<E> + Send + Sync + 'static,
    {
        let step: QueryStep<E> = Arc::new(order_by);
        self.order_by = Some(step);
        self
    }

    /// Keep returned models attached to the session.
    pub fn tracked(mut self) -> Self {
        self.no_tracking = false;
        self
    }

    pub fn no_tracking(mut self, no_tracking: bool) -> Self {
        self.no_tracking = no_tracking;
        self
    }

    /// Request one page; out-of-range input is clamped.
    pub fn page(mut self, page: i64, page_size: i64) -> Self {
        self.page = Some(PageRequest::new(page, page_size));
        self
    }

    pub fn page_request(&self) -> Option<PageRequest> {
        self.page
    }

    pub fn is_tracking(&self) -> bool {
        !self.no_tracking
    }

    pub fn has_filter(&self) -> bool {
        self.filter.is_some()
    }

    pub fn has_order(&self) -> bool {
        self.order_by.is_some()
    }

    /// Same query without the page window
    pub(crate) fn unpaged(&self) -> Self {
        Self {
            page: None,
            ..self.clone()
        }
    }

    /// Compose onto `select`: filter, include, order, then paginate.
    ///
    /// Without an explicit ordering a paged query is ordered by identity so
    /// page boundaries are stable between calls.
    pub(crate) fn apply(&self, select: Select<E>) -> Select<E> {
        let mut select = self.apply_filter_and_include(select);

        select = match (&self.order_by, self.page) {
            (Some(order_by), _) => order_by(select),
            (None, Some(_)) => order_by_identity(select),
            (None, None) => select,
        };

        if let Some(page) = self.page {
            select = select.offset(page.offset()).limit(page.limit());
        }
        select
    }

    /// Like [`apply`](Self::apply) without paging, but always ordered:
    /// the explicit ordering or identity.
    pub(crate) fn apply_ordered(&self, select: Select<E>) -> Select<E> {
        let select = self.apply_filter_and_include(select);
        match &self.order_by {
            Some(order_by) => order_by(select),
            None => order_by_identity(select),
        }
    }

    /// Filter and include only, for counting.
    pub(crate) fn apply_filter_and_include(&self, mut select: Select<E>) -> Select<E> {
        if let Some(filter) = &self.filter {
            select = select.filter(filter.clone());
        }
        if let Some(include) = &self.include {
            select = include(select);
        }
        select
    }
}

/// Ascending primary key order
pub(crate) fn order_by_identity<E: EntityTrait>(mut select: Select<E>) -> Select<E> {
    for key in E::PrimaryKey::iter() {
        select = select.order_by_asc(key.into_column());
    }
    select
}

impl<E: EntityTrait> Default for QuerySpec<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EntityTrait> Clone for QuerySpec<E> {
    fn clone(&self) -> Self {
        Self {
            filter: self.filter.clone(),
            include: self.include.clone(),
            order_by: self.order_by.clone(),
            no_tracking: self.no_tracking,
            page: self.page,
        }
    }
}

impl<E: EntityTrait> fmt::Debug for QuerySpec<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySpec")
            .field("filter", &self.filter)
            .field("include", &self.include.is_some())
            .field("order_by", &self.order_by.is_some())
            .field("no_tracking", &self.no_tracking)
            .field("page", &self.page)
            .finish()
    }
}
