use sea_orm_migration::prelude::*;

use super::m001_create_dcim_tables::{Devices, Interfaces};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create partitions table
        manager
            .create_table(
                Table::create()
                    .table(Partitions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Partitions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Partitions::Name).string_len(50).not_null())
                    .col(
                        ColumnDef::new(Partitions::EnforceUnique)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Partitions::Description).string_len(100))
                    .col(ColumnDef::new(Partitions::Tags).text().not_null().default("[]"))
                    .col(ColumnDef::new(Partitions::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Partitions::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // Create lines table
        manager
            .create_table(
                Table::create()
                    .table(Lines::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Lines::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Lines::DeviceId).integer())
                    .col(ColumnDef::new(Lines::Name).string_len(64).not_null())
                    .col(ColumnDef::new(Lines::Description).string_len(100))
                    .col(ColumnDef::new(Lines::Tags).text().not_null().default("[]"))
                    .col(ColumnDef::new(Lines::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Lines::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_lines_device_id")
                            .from(Lines::Table, Lines::DeviceId)
                            .to(Devices::Table, Devices::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // NULL device rows never collide, so the constraint only binds lines on a device
        manager
            .create_index(
                Index::create()
                    .name("idx_lines_device_name")
                    .table(Lines::Table)
                    .col(Lines::DeviceId)
                    .col(Lines::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create extensions table
        manager
            .create_table(
                Table::create()
                    .table(Extensions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Extensions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Extensions::Dn).string_len(25).not_null())
                    .col(ColumnDef::new(Extensions::PartitionId).integer())
                    .col(
                        ColumnDef::new(Extensions::Status)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(Extensions::LineId).integer())
                    .col(ColumnDef::new(Extensions::InterfaceId).integer())
                    .col(ColumnDef::new(Extensions::UniqueScope).string_len(32))
                    .col(ColumnDef::new(Extensions::Description).string_len(100))
                    .col(ColumnDef::new(Extensions::Tags).text().not_null().default("[]"))
                    .col(ColumnDef::new(Extensions::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Extensions::UpdatedAt).timestamp().not_null())
                    .check(
                        Expr::col(Extensions::LineId)
                            .is_null()
                            .or(Expr::col(Extensions::InterfaceId).is_null()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_extensions_partition_id")
                            .from(Extensions::Table, Extensions::PartitionId)
                            .to(Partitions::Table, Partitions::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_extensions_line_id")
                            .from(Extensions::Table, Extensions::LineId)
                            .to(Lines::Table, Lines::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_extensions_interface_id")
                            .from(Extensions::Table, Extensions::InterfaceId)
                            .to(Interfaces::Table, Interfaces::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Rows with a NULL scope are exempt; everything else is unique per scope
        manager
            .create_index(
                Index::create()
                    .name("idx_extensions_scope_dn")
                    .table(Extensions::Table)
                    .col(Extensions::UniqueScope)
                    .col(Extensions::Dn)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_extensions_dn")
                    .table(Extensions::Table)
                    .col(Extensions::Dn)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_extensions_partition_id")
                    .table(Extensions::Table)
                    .col(Extensions::PartitionId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_extensions_line_id")
                    .table(Extensions::Table)
                    .col(Extensions::LineId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Extensions::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Lines::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Partitions::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum Partitions {
    Table,
    Id,
    Name,
    EnforceUnique,
    Description,
    Tags,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Lines {
    Table,
    Id,
    DeviceId,
    Name,
    Description,
    Tags,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Extensions {
    Table,
    Id,
    Dn,
    PartitionId,
    Status,
    LineId,
    InterfaceId,
    UniqueScope,
    Description,
    Tags,
    CreatedAt,
    UpdatedAt,
}
