pub use sea_orm_migration::prelude::*;

mod m20250901_000001_create_tickets;
mod m20250901_000002_create_ticket_draws;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250901_000001_create_tickets::Migration),
            Box::new(m20250901_000002_create_ticket_draws::Migration),
        ]
    }
}
