use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CleaningInventories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CleaningInventories::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CleaningInventories::Device).string().not_null())
                    .col(ColumnDef::new(CleaningInventories::Products).json().not_null())
                    .col(ColumnDef::new(CleaningInventories::ReportedBy).string().not_null())
                    .col(ColumnDef::new(CleaningInventories::Date).string().not_null())
                    .col(
                        ColumnDef::new(CleaningInventories::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Latest-per-device lookups order by creation time within a device.
        manager
            .create_index(
                Index::create()
                    .name("idx-cleaning_inventories-device-created_at")
                    .table(CleaningInventories::Table)
                    .col(CleaningInventories::Device)
                    .col(CleaningInventories::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CleaningInventories::Table).if_exists().to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum CleaningInventories {
    Table,
    Id,
    Device,
    Products,
    ReportedBy,
    Date,
    CreatedAt,
}
