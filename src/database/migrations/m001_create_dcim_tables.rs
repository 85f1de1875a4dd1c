use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create devices table
        manager
            .create_table(
                Table::create()
                    .table(Devices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Devices::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Devices::Name).string_len(64).not_null().unique_key())
                    .col(ColumnDef::new(Devices::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // Create interfaces table
        manager
            .create_table(
                Table::create()
                    .table(Interfaces::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Interfaces::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Interfaces::DeviceId).integer().not_null())
                    .col(ColumnDef::new(Interfaces::Name).string_len(64).not_null())
                    .col(ColumnDef::new(Interfaces::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_interfaces_device_id")
                            .from(Interfaces::Table, Interfaces::DeviceId)
                            .to(Devices::Table, Devices::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_interfaces_device_name")
                    .table(Interfaces::Table)
                    .col(Interfaces::DeviceId)
                    .col(Interfaces::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Interfaces::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Devices::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
pub enum Devices {
    Table,
    Id,
    Name,
    CreatedAt,
}

#[derive(Iden)]
pub enum Interfaces {
    Table,
    Id,
    DeviceId,
    Name,
    CreatedAt,
}
