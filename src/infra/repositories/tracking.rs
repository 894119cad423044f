//! Change tracking for one session.
//!
//! Holds the identity map of tracked models (one typed map per entity) and
//! the queue of staged writes. Staged writes are replayed against the store
//! in the order they were staged.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, DatabaseTransaction, DbErr, EntityTrait, IntoActiveModel, Iterable,
    ModelTrait, PrimaryKeyToColumn, PrimaryKeyTrait,
};

use crate::domain::{entity_name, BaseEntity};

type IdentityMap<E> = HashMap<<E as BaseEntity>::Id, <E as EntityTrait>::Model>;

/// A write waiting for the next flush.
#[async_trait]
pub(crate) trait PendingChange: Send + Sync {
    /// Replay the write inside `txn`, returning affected rows.
    async fn apply(&mut self, txn: &DatabaseTransaction) -> Result<u64, DbErr>;

    /// Called once the flush that applied this change has committed.
    fn settle(&mut self, _tracker: &mut ChangeTracker) {}

    fn describe(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Insert => "insert",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        }
    }
}

/// A staged write of one full model.
pub(crate) struct StagedChange<E: EntityTrait> {
    kind: ChangeKind,
    model: E::Model,
    /// Row returned by an insert with a store-generated key
    stored: Option<E::Model>,
}

impl<E: EntityTrait> StagedChange<E> {
    pub(crate) fn new(kind: ChangeKind, model: E::Model) -> Self {
        Self {
            kind,
            model,
            stored: None,
        }
    }
}

#[async_trait]
impl<E> PendingChange for StagedChange<E>
where
    E: BaseEntity,
    E::Model: Sync + IntoActiveModel<E::ActiveModel>,
    E::ActiveModel: Send,
{
    async fn apply(&mut self, txn: &DatabaseTransaction) -> Result<u64, DbErr> {
        let mut active = full_active_model::<E>(&self.model);
        match self.kind {
            ChangeKind::Insert if has_generated_key::<E>() => {
                for key in E::PrimaryKey::iter() {
                    active.not_set(key.into_column());
                }
                self.stored = Some(active.insert(txn).await?);
                Ok(1)
            }
            ChangeKind::Insert => E::insert(active).exec_without_returning(txn).await,
            ChangeKind::Update => {
                active.update(txn).await?;
                Ok(1)
            }
            ChangeKind::Delete => Ok(active.delete(txn).await?.rows_affected),
        }
    }

    fn settle(&mut self, tracker: &mut ChangeTracker) {
        if let Some(stored) = self.stored.take() {
            tracker.attach::<E>(stored);
        }
    }

    fn describe(&self) -> String {
        format!("{} {}", self.kind.as_str(), entity_name::<E>())
    }
}

/// Whether the store assigns the primary key on insert.
///
/// Models of such entities carry a placeholder identity until their insert
/// has been flushed, so they are not tracked before that.
pub(crate) fn has_generated_key<E: EntityTrait>() -> bool {
    <E::PrimaryKey as PrimaryKeyTrait>::auto_increment()
}

/// Every column of `model` marked as set, so writes replace the full record.
fn full_active_model<E: EntityTrait>(model: &E::Model) -> E::ActiveModel {
    let mut active = <E::ActiveModel as ActiveModelTrait>::default();
    for column in E::Column::iter() {
        active.set(column, model.get(column));
    }
    active
}

/// Identity map plus write queue.
#[derive(Default)]
pub(crate) struct ChangeTracker {
    identity_map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    pending: Vec<Box<dyn PendingChange>>,
}

impl ChangeTracker {
    fn map<E>(&self) -> Option<&IdentityMap<E>>
    where
        E: BaseEntity,
        E::Model: Sync,
    {
        self.identity_map
            .get(&TypeId::of::<E>())
            .and_then(|map| map.downcast_ref::<IdentityMap<E>>())
    }

    fn map_mut<E>(&mut self) -> Option<&mut IdentityMap<E>>
    where
        E: BaseEntity,
        E::Model: Sync,
    {
        self.identity_map
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Box::new(IdentityMap::<E>::new()))
            .downcast_mut::<IdentityMap<E>>()
    }

    /// Tracked copy of the model with this identity, if any
    pub(crate) fn tracked<E>(&self, id: &E::Id) -> Option<E::Model>
    where
        E: BaseEntity,
        E::Model: Sync,
    {
        self.map::<E>().and_then(|map| map.get(id)).cloned()
    }

    pub(crate) fn is_tracked<E>(&self, id: &E::Id) -> bool
    where
        E: BaseEntity,
        E::Model: Sync,
    {
        self.map::<E>().is_some_and(|map| map.contains_key(id))
    }

    /// Start tracking `model`, replacing any tracked copy.
    pub(crate) fn attach<E>(&mut self, model: E::Model)
    where
        E: BaseEntity,
        E::Model: Sync,
    {
        if let Some(map) = self.map_mut::<E>() {
            map.insert(E::id(&model), model);
        }
    }

    /// Identity resolution: an already tracked copy wins over `model`,
    /// otherwise `model` becomes tracked.
    pub(crate) fn resolve<E>(&mut self, model: E::Model) -> E::Model
    where
        E: BaseEntity,
        E::Model: Sync,
    {
        match self.map_mut::<E>() {
            Some(map) => map.entry(E::id(&model)).or_insert(model).clone(),
            None => model,
        }
    }

    pub(crate) fn detach<E>(&mut self, id: &E::Id) -> Option<E::Model>
    where
        E: BaseEntity,
        E::Model: Sync,
    {
        self.map_mut::<E>().and_then(|map| map.remove(id))
    }

    pub(crate) fn stage(&mut self, change: Box<dyn PendingChange>) {
        self.pending.push(change);
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn take_pending(&mut self) -> Vec<Box<dyn PendingChange>> {
        std::mem::take(&mut self.pending)
    }

    /// Put back changes whose flush failed, ahead of anything staged since.
    pub(crate) fn requeue(&mut self, mut changes: Vec<Box<dyn PendingChange>>) {
        changes.append(&mut self.pending);
        self.pending = changes;
    }

    /// Forget staged writes and tracked models.
    pub(crate) fn clear(&mut self) {
        self.pending.clear();
        self.identity_map.clear();
    }
}
