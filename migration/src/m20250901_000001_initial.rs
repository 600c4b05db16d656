use sea_orm_migration::prelude::*;

/// 用户与积分余额
#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    Points,
    CreatedAt,
    UpdatedAt,
}

/// 物品目录 (抽卡池)
#[derive(DeriveIden)]
enum Items {
    Table,
    Id,
    Name,
    Rarity,
    Power,
    CreatedAt,
}

/// 抽卡记录 (不可变)
#[derive(DeriveIden)]
enum DrawRecords {
    Table,
    Id,
    UserId,
    ItemId,
    BatchId,
    CreatedAt,
}

/// 用户背包
#[derive(DeriveIden)]
enum InventoryItems {
    Table,
    Id,
    UserId,
    ItemId,
    Source,
    AcquiredAt,
}

#[derive(DeriveIden)]
enum Notifications {
    Table,
    Id,
    UserId,
    Kind,
    Message,
    IsRead,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AuditLogs {
    Table,
    Id,
    UserId,
    Action,
    Detail,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Achievements {
    Table,
    Id,
    Code,
    Name,
    Description,
}

#[derive(DeriveIden)]
enum UserAchievements {
    Table,
    Id,
    UserId,
    AchievementId,
    UnlockedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

/// 初始物品池（每个稀有度至少一件），以及首次抽卡成就定义。
/// 抽卡分组表 gacha_batches 在后续独立迁移中创建，
/// 未迁移时抽卡仍可进行（记录不分组）。
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Username).string_len(64).not_null())
                    .col(
                        ColumnDef::new(Users::Points)
                            .big_integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(Users::Points).gte(0)),
                    )
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Users::UpdatedAt)
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
                    .name("idx_users_username_unique")
                    .table(Users::Table)
                    .col(Users::Username)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Items::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Items::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Items::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Items::Rarity).string_len(16).not_null())
                    .col(ColumnDef::new(Items::Power).integer().null())
                    .col(
                        ColumnDef::new(Items::CreatedAt)
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
                    .name("idx_items_name_unique")
                    .table(Items::Table)
                    .col(Items::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // batch_id 不加外键：分组表可能尚未迁移
        manager
            .create_table(
                Table::create()
                    .table(DrawRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DrawRecords::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DrawRecords::UserId).big_integer().not_null())
                    .col(ColumnDef::new(DrawRecords::ItemId).big_integer().not_null())
                    .col(ColumnDef::new(DrawRecords::BatchId).big_integer().null())
                    .col(
                        ColumnDef::new(DrawRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_draw_records_item")
                            .from(DrawRecords::Table, DrawRecords::ItemId)
                            .to(Items::Table, Items::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_draw_records_user")
                            .from(DrawRecords::Table, DrawRecords::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // 历史查询: WHERE user_id = ? ORDER BY created_at DESC
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_draw_records_user_created")
                    .table(DrawRecords::Table)
                    .col(DrawRecords::UserId)
                    .col(DrawRecords::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InventoryItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryItems::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::ItemId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::Source)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::AcquiredAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_items_item")
                            .from(InventoryItems::Table, InventoryItems::ItemId)
                            .to(Items::Table, Items::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_inventory_items_user")
                    .table(InventoryItems::Table)
                    .col(InventoryItems::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Notifications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Notifications::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Notifications::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Notifications::Kind).string_len(32).not_null())
                    .col(ColumnDef::new(Notifications::Message).text().not_null())
                    .col(
                        ColumnDef::new(Notifications::IsRead)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Notifications::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AuditLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuditLogs::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AuditLogs::UserId).big_integer().not_null())
                    .col(ColumnDef::new(AuditLogs::Action).string_len(64).not_null())
                    .col(ColumnDef::new(AuditLogs::Detail).text().not_null())
                    .col(
                        ColumnDef::new(AuditLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Achievements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Achievements::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Achievements::Code).string_len(64).not_null())
                    .col(ColumnDef::new(Achievements::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Achievements::Description).text().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_achievements_code_unique")
                    .table(Achievements::Table)
                    .col(Achievements::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserAchievements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserAchievements::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(UserAchievements::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserAchievements::AchievementId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserAchievements::UnlockedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_achievements_achievement")
                            .from(UserAchievements::Table, UserAchievements::AchievementId)
                            .to(Achievements::Table, Achievements::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // 同一成就每个用户只能解锁一次
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_user_achievements_unique")
                    .table(UserAchievements::Table)
                    .col(UserAchievements::UserId)
                    .col(UserAchievements::AchievementId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 初始化物品池
        let seed_items = Query::insert()
            .into_table(Items::Table)
            .columns([Items::Name, Items::Rarity, Items::Power])
            .values_panic(["Starlight Crown".into(), "legendary".into(), 100.into()])
            .values_panic(["Ember Blade".into(), "epic".into(), 60.into()])
            .values_panic(["Frost Shield".into(), "epic".into(), 55.into()])
            .values_panic(["Silver Compass".into(), "rare".into(), 30.into()])
            .values_panic(["Focus Potion".into(), "rare".into(), 25.into()])
            .values_panic(["Wooden Token".into(), "common".into(), 5.into()])
            .values_panic(["Sticky Note".into(), "common".into(), Option::<i32>::None.into()])
            .values_panic(["Bronze Badge".into(), "common".into(), 8.into()])
            .on_conflict(OnConflict::column(Items::Name).do_nothing().to_owned())
            .to_owned();
        manager.exec_stmt(seed_items).await?;

        let seed_achievements = Query::insert()
            .into_table(Achievements::Table)
            .columns([Achievements::Code, Achievements::Name, Achievements::Description])
            .values_panic([
                "FIRST_GACHA".into(),
                "First Draw".into(),
                "Complete your first gacha draw".into(),
            ])
            .on_conflict(OnConflict::column(Achievements::Code).do_nothing().to_owned())
            .to_owned();
        manager.exec_stmt(seed_achievements).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 删除顺序：依赖方在前
        manager
            .drop_table(Table::drop().if_exists().table(UserAchievements::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Achievements::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(AuditLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Notifications::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(InventoryItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(DrawRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Items::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}
