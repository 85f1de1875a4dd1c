use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ObjectChanges::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ObjectChanges::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ObjectChanges::Time).timestamp().not_null())
                    .col(ColumnDef::new(ObjectChanges::Action).string_len(16).not_null())
                    .col(ColumnDef::new(ObjectChanges::ObjectType).string_len(32).not_null())
                    .col(ColumnDef::new(ObjectChanges::ObjectId).integer().not_null())
                    .col(ColumnDef::new(ObjectChanges::ObjectRepr).string().not_null())
                    .col(ColumnDef::new(ObjectChanges::RelatedType).string_len(32))
                    .col(ColumnDef::new(ObjectChanges::RelatedId).integer())
                    .col(ColumnDef::new(ObjectChanges::ObjectData).text().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_object_changes_object")
                    .table(ObjectChanges::Table)
                    .col(ObjectChanges::ObjectType)
                    .col(ObjectChanges::ObjectId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ObjectChanges::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum ObjectChanges {
    Table,
    Id,
    Time,
    Action,
    ObjectType,
    ObjectId,
    ObjectRepr,
    RelatedType,
    RelatedId,
    ObjectData,
}
