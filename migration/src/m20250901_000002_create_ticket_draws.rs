use sea_orm_migration::prelude::*;

use crate::m20250901_000001_create_tickets::Ticket;

/// Ticket Draws (某天抽中某个 ticket 的记录)
#[derive(DeriveIden)]
enum TicketDraw {
    Table,
    Id,
    CreatedAt,
    TicketId,
    Done,
    Skipped,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TicketDraw::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(TicketDraw::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(TicketDraw::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(TicketDraw::TicketId).uuid().not_null())
                    .col(
                        ColumnDef::new(TicketDraw::Done)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(TicketDraw::Skipped)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    // ticket 删除时级联删除其全部抽取记录
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ticket_draw_ticket")
                            .from(TicketDraw::Table, TicketDraw::TicketId)
                            .to(Ticket::Table, Ticket::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        // 频率判断: 按 ticket 查找最近一次完成记录
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_ticket_draw_ticket_created")
                    .table(TicketDraw::Table)
                    .col(TicketDraw::TicketId)
                    .col(TicketDraw::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // 当天抽取 / 近 7 天完成率统计
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_ticket_draw_created")
                    .table(TicketDraw::Table)
                    .col(TicketDraw::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().if_exists().table(TicketDraw::Table).to_owned())
            .await
    }
}
