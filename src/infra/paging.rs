//! Store-level pagination.
//!
//! Counts the matching records and fetches one window of them as two
//! round-trips on the same connection.

use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait, QuerySelect, Select};

use crate::errors::RepoResult;
use crate::types::{PageRequest, PaginationResult};

/// Count `select`, then fetch the requested window of it.
///
/// `select` should carry a deterministic ordering, otherwise page
/// boundaries may move between calls.
pub async fn fetch_page<E, C>(
    select: Select<E>,
    db: &C,
    request: PageRequest,
) -> RepoResult<PaginationResult<E::Model>>
where
    E: EntityTrait,
    E::Model: Sync,
    C: ConnectionTrait,
{
    let total = select.clone().count(db).await?;
    if request.offset() >= total {
        return Ok(PaginationResult::new(Vec::new(), total, request));
    }

    let content = select
        .offset(request.offset())
        .limit(request.limit())
        .all(db)
        .await?;

    Ok(PaginationResult::new(content, total, request))
}

/// [`fetch_page`] followed by a projection of every fetched model.
pub async fn paginate<E, C, T, F>(
    select: Select<E>,
    db: &C,
    request: PageRequest,
    map_to_dto: F,
) -> RepoResult<PaginationResult<T>>
where
    E: EntityTrait,
    E::Model: Sync,
    C: ConnectionTrait,
    F: FnMut(E::Model) -> T,
{
    Ok(fetch_page(select, db, request).await?.map(map_to_dto))
}
