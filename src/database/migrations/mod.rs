use sea_orm_migration::prelude::*;

mod m001_create_dcim_tables;
mod m002_create_ipphone_tables;
mod m003_create_object_changes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m001_create_dcim_tables::Migration),
            Box::new(m002_create_ipphone_tables::Migration),
            Box::new(m003_create_object_changes::Migration),
        ]
    }
}
