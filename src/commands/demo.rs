//! Demo command - Seed a sample table and page through it.
//!
//! Everything goes through one unit of work: the seed is written in a
//! single transaction, then the requested page is read with either paging
//! strategy and printed as JSON.

use sea_orm::ColumnTrait;
use serde::Serialize;

use crate::cli::DemoArgs;
use crate::config::Config;
use crate::errors::{RepoError, RepoResult};
use crate::infra::{Database, QuerySpec, UnitOfWork};
use crate::with_transaction;

/// Sample entity backing the demo
pub mod note {
    use sea_orm::entity::prelude::*;

    use crate::domain::BaseEntity;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "demo_notes")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: i32,
        pub title: String,
        pub pinned: bool,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    impl BaseEntity for Entity {
        type Id = i32;

        fn id(model: &Model) -> i32 {
            model.id
        }
    }
}

/// What gets printed for each note
#[derive(Debug, Serialize)]
struct NoteView {
    id: i32,
    title: String,
    pinned: bool,
}

impl From<note::Model> for NoteView {
    fn from(model: note::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            pinned: model.pinned,
        }
    }
}

/// Execute the demo command
pub async fn execute(args: DemoArgs, config: Config) -> RepoResult<()> {
    let db = Database::connect(&config).await?;
    db.create_table_for(note::Entity).await?;

    let uow = db.unit_of_work();
    let seed = i32::try_from(args.seed)
        .map_err(|_| RepoError::config(format!("seed {} is too large", args.seed)))?;

    with_transaction!(uow, |tx| {
        let notes = tx.repo::<note::Entity>();
        let offset = i32::try_from(notes.count().await?)
            .map_err(|_| RepoError::config("demo table is too large"))?;
        for n in 1..=seed {
            let id = offset + n;
            notes
                .add(note::Model {
                    id,
                    title: format!("Note {id}"),
                    pinned: id % 5 == 0,
                })
                .await?;
        }
        Ok::<_, RepoError>(())
    })?;
    tracing::info!(seeded = seed, "Demo notes written");

    let notes = uow.repo::<note::Entity>();
    if let Some(first) = notes.get_by_id_detached(1).await? {
        tracing::debug!(title = %first.title, "First note");
    }

    let mut spec = QuerySpec::<note::Entity>::new();
    if let Some(text) = &args.title_contains {
        spec = spec.filter(note::Column::Title.contains(text.as_str()));
    }

    let page = if args.in_ram {
        notes.as_paginated_in_ram(args.page, args.page_size, spec).await?
    } else {
        notes.as_paginated(args.page, args.page_size, spec).await?
    };

    let page = page.map(NoteView::from);
    let rendered = serde_json::to_string_pretty(&page)
        .map_err(|e| RepoError::internal(format!("failed to render page: {e}")))?;
    println!("{rendered}");

    uow.dispose().await
}
