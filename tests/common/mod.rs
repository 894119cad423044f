//! Shared fixtures: sample entities and an in-memory SQLite database.

#![allow(dead_code)]

use generic_repository::{Config, Database, Persistence, UnitOfWork};

pub mod category {
    use sea_orm::entity::prelude::*;

    use generic_repository::BaseEntity;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "categories")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: i32,
        pub name: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::item::Entity")]
        Item,
    }

    impl Related<super::item::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Item.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}

    impl BaseEntity for Entity {
        type Id = i32;

        fn id(model: &Model) -> i32 {
            model.id
        }
    }
}

pub mod item {
    use sea_orm::entity::prelude::*;

    use generic_repository::BaseEntity;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "items")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: i32,
        pub name: String,
        pub category_id: Option<i32>,
        pub price: i32,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::category::Entity",
            from = "Column::CategoryId",
            to = "super::category::Column::Id"
        )]
        Category,
    }

    impl Related<super::category::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Category.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}

    impl BaseEntity for Entity {
        type Id = i32;

        fn id(model: &Model) -> i32 {
            model.id
        }
    }
}

/// Entity with a string identity
pub mod tag {
    use sea_orm::entity::prelude::*;

    use generic_repository::BaseEntity;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "tags")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub slug: String,
        pub label: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    impl BaseEntity for Entity {
        type Id = String;

        fn id(model: &Model) -> String {
            model.slug.clone()
        }
    }
}

/// Entity whose key is generated by the store
pub mod counter {
    use sea_orm::entity::prelude::*;

    use generic_repository::BaseEntity;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "counters")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub label: String,
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

pub fn item(id: i32, name: &str, category_id: Option<i32>, price: i32) -> item::Model {
    item::Model {
        id,
        name: name.to_string(),
        category_id,
        price,
    }
}

pub fn category(id: i32, name: &str) -> category::Model {
    category::Model {
        id,
        name: name.to_string(),
    }
}

pub fn tag(slug: &str, label: &str) -> tag::Model {
    tag::Model {
        slug: slug.to_string(),
        label: label.to_string(),
    }
}

/// Unsaved counter; the store assigns the id.
pub fn counter(label: &str) -> counter::Model {
    counter::Model {
        id: 0,
        label: label.to_string(),
    }
}

/// Fresh in-memory database with every fixture table created.
pub async fn setup() -> Database {
    let db = Database::connect(&Config::with_database_url("sqlite::memory:"))
        .await
        .expect("in-memory database");

    db.create_table_for(category::Entity).await.expect("categories table");
    db.create_table_for(item::Entity).await.expect("items table");
    db.create_table_for(tag::Entity).await.expect("tags table");
    db.create_table_for(counter::Entity).await.expect("counters table");
    db
}

/// Database holding categories Tools(1), Books(2) and items
/// A(1, Tools, 30), B(2, Books, 10), C(3, Tools, 20).
pub async fn seeded() -> Database {
    let db = setup().await;
    let uow = db.unit_of_work();

    let categories = uow.repo::<category::Entity>();
    categories.add(category(1, "Tools")).await.unwrap();
    categories.add(category(2, "Books")).await.unwrap();

    let items = uow.repo::<item::Entity>();
    items.add(item(1, "A", Some(1), 30)).await.unwrap();
    items.add(item(2, "B", Some(2), 10)).await.unwrap();
    items.add(item(3, "C", Some(1), 20)).await.unwrap();

    uow.save_changes().await.unwrap();
    uow.dispose().await.unwrap();
    db
}

pub fn names(items: &[item::Model]) -> Vec<&str> {
    items.iter().map(|i| i.name.as_str()).collect()
}

/// Count items through a fresh unit of work.
pub async fn item_count(db: &Database) -> u64 {
    let uow: Persistence = db.unit_of_work();
    let count = uow.repo::<item::Entity>().count().await.unwrap();
    uow.dispose().await.unwrap();
    count
}
