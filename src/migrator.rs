use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240102_000001_create_users_table::Migration),
            Box::new(m20240102_000002_create_products_table::Migration),
            Box::new(m20240102_000003_create_locations_table::Migration),
            Box::new(m20240102_000004_create_stock_movements_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240102_000001_create_users_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240102_000001_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Users::Username)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Users::ApiKey).string().null().unique_key())
                        .col(
                            ColumnDef::new(Users::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Users::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Users::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Users {
        Table,
        Id,
        Username,
        Email,
        PasswordHash,
        ApiKey,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240102_000002_create_products_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240102_000002_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::Sku).string().not_null().unique_key())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Description).string().null())
                        .col(
                            ColumnDef::new(Products::Price)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::WeightKg)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Products::DimensionsCm).string().null())
                        .col(ColumnDef::new(Products::Category).string().not_null())
                        .col(
                            ColumnDef::new(Products::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Products::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Products::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_products_category")
                        .table(Products::Table)
                        .col(Products::Category)
                        .if_not_exists()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Products {
        Table,
        Id,
        Sku,
        Name,
        Description,
        Price,
        WeightKg,
        DimensionsCm,
        Category,
        Quantity,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240102_000003_create_locations_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240102_000003_create_locations_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Locations::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Locations::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Locations::Code)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Locations::Name).string().not_null())
                        .col(ColumnDef::new(Locations::Zone).string().not_null())
                        .col(ColumnDef::new(Locations::Aisle).string().not_null())
                        .col(ColumnDef::new(Locations::Rack).string().not_null())
                        .col(ColumnDef::new(Locations::Shelf).string().not_null())
                        .col(ColumnDef::new(Locations::Capacity).integer().not_null())
                        .col(ColumnDef::new(Locations::Temperature).double().null())
                        .col(
                            ColumnDef::new(Locations::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Locations::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Locations::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_locations_zone")
                        .table(Locations::Table)
                        .col(Locations::Zone)
                        .if_not_exists()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Locations::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Locations {
        Table,
        Id,
        Code,
        Name,
        Zone,
        Aisle,
        Rack,
        Shelf,
        Capacity,
        Temperature,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240102_000004_create_stock_movements_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240102_000004_create_stock_movements_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockMovements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockMovements::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMovements::ProductId).uuid().not_null())
                        .col(ColumnDef::new(StockMovements::LocationId).uuid().not_null())
                        .col(ColumnDef::new(StockMovements::UserId).uuid().not_null())
                        .col(ColumnDef::new(StockMovements::Type).string().not_null())
                        .col(ColumnDef::new(StockMovements::Quantity).integer().not_null())
                        .col(ColumnDef::new(StockMovements::Reference).string().null())
                        .col(ColumnDef::new(StockMovements::Notes).string().null())
                        .col(
                            ColumnDef::new(StockMovements::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_movements_product")
                                .from(StockMovements::Table, StockMovements::ProductId)
                                .to(Products::Table, Products::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_movements_location")
                                .from(StockMovements::Table, StockMovements::LocationId)
                                .to(Locations::Table, Locations::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_movements_user")
                                .from(StockMovements::Table, StockMovements::UserId)
                                .to(Users::Table, Users::Id),
                        )
                        .to_owned(),
                )
                .await?;

            // The capacity accountant replays the full history per location and
            // the read side filters by product/date; index all three paths.
            manager
                .create_index(
                    Index::create()
                        .name("idx_stock_movements_product")
                        .table(StockMovements::Table)
                        .col(StockMovements::ProductId)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_stock_movements_location")
                        .table(StockMovements::Table)
                        .col(StockMovements::LocationId)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_stock_movements_created_at")
                        .table(StockMovements::Table)
                        .col(StockMovements::CreatedAt)
                        .if_not_exists()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockMovements::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum StockMovements {
        Table,
        Id,
        ProductId,
        LocationId,
        UserId,
        Type,
        Quantity,
        Reference,
        Notes,
        CreatedAt,
    }

    #[derive(Iden)]
    enum Products {
        Table,
        Id,
    }

    #[derive(Iden)]
    enum Locations {
        Table,
        Id,
    }

    #[derive(Iden)]
    enum Users {
        Table,
        Id,
    }
}
