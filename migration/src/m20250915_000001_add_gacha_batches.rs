use sea_orm_migration::prelude::*;

/// 多连抽分组
#[derive(DeriveIden)]
enum GachaBatches {
    Table,
    Id,
    UserId,
    DrawCount,
    TotalCost,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

/// draw_records.batch_id 已在初始迁移中存在（可空、无外键），
/// 这里只补分组表本身。服务启动时检测该表是否存在，缺失则多连抽记录不分组。
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GachaBatches::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GachaBatches::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(GachaBatches::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GachaBatches::DrawCount)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GachaBatches::TotalCost)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GachaBatches::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_gacha_batches_user")
                    .table(GachaBatches::Table)
                    .col(GachaBatches::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(GachaBatches::Table)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}
