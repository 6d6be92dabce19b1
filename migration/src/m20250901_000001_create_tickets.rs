use sea_orm_migration::prelude::*;

/// Ticket (可重复或一次性的任务定义)
#[derive(DeriveIden)]
pub(crate) enum Ticket {
    Table,
    Id,
    CreatedAt,
    Title,
    Recurring,
    Done,
    LastDrawn,
    Deadline,
    Frequency,
    CanDrawMonday,
    CanDrawTuesday,
    CanDrawWednesday,
    CanDrawThursday,
    CanDrawFriday,
    CanDrawSaturday,
    CanDrawSunday,
    MustDrawMonday,
    MustDrawTuesday,
    MustDrawWednesday,
    MustDrawThursday,
    MustDrawFriday,
    MustDrawSaturday,
    MustDrawSunday,
}

/// 每周七天的 can_draw_* / must_draw_* 标记列, 周一在前
const WEEKDAY_FLAGS: [Ticket; 14] = [
    Ticket::CanDrawMonday,
    Ticket::CanDrawTuesday,
    Ticket::CanDrawWednesday,
    Ticket::CanDrawThursday,
    Ticket::CanDrawFriday,
    Ticket::CanDrawSaturday,
    Ticket::CanDrawSunday,
    Ticket::MustDrawMonday,
    Ticket::MustDrawTuesday,
    Ticket::MustDrawWednesday,
    Ticket::MustDrawThursday,
    Ticket::MustDrawFriday,
    Ticket::MustDrawSaturday,
    Ticket::MustDrawSunday,
];

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut table = Table::create();
        table
            .table(Ticket::Table)
            .if_not_exists()
            .col(ColumnDef::new(Ticket::Id).uuid().not_null().primary_key())
            .col(
                ColumnDef::new(Ticket::CreatedAt)
                    .timestamp_with_time_zone()
                    .not_null()
                    .default(Expr::current_timestamp()),
            )
            .col(ColumnDef::new(Ticket::Title).string_len(255).not_null())
            .col(
                ColumnDef::new(Ticket::Recurring)
                    .boolean()
                    .not_null()
                    .default(true),
            )
            // NULL = 未完成
            .col(ColumnDef::new(Ticket::Done).timestamp_with_time_zone().null())
            .col(
                ColumnDef::new(Ticket::LastDrawn)
                    .timestamp_with_time_zone()
                    .null(),
            )
            .col(ColumnDef::new(Ticket::Deadline).date().null())
            .col(
                ColumnDef::new(Ticket::Frequency)
                    .integer()
                    .not_null()
                    .default(1),
            );

        for flag in WEEKDAY_FLAGS {
            table.col(ColumnDef::new(flag).boolean().not_null().default(false));
        }

        manager.create_table(table.to_owned()).await?;

        // 抽取时只关心未完成的 ticket
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tickets_done")
                    .table(Ticket::Table)
                    .col(Ticket::Done)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().if_exists().table(Ticket::Table).to_owned())
            .await
    }
}
