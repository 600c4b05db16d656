use super::selector::sort_for_draw;
use super::store::{DrawWithItem, GachaStore, GachaUnit};
use crate::entities::{
    achievement_entity as achievements, audit_log_entity as audit_logs,
    draw_record_entity as draw_records, gacha_batch_entity as gacha_batches,
    inventory_item_entity as inventory_items, item_entity as items,
    notification_entity as notifications, user_achievement_entity as user_achievements,
    user_entity as users,
};
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use chrono::Utc;
use migration::SchemaManager;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

const GACHA_BATCHES_TABLE: &str = "gacha_batches";

/// 基于 sea-orm 的抽卡存储
#[derive(Clone)]
pub struct SeaOrmGachaStore {
    pool: DatabaseConnection,
    batches_available: bool,
}

impl SeaOrmGachaStore {
    /// 启动时检测分组表是否已迁移；缺失时多连抽记录不分组
    pub async fn new(pool: DatabaseConnection) -> AppResult<Self> {
        let batches_available = SchemaManager::new(&pool)
            .has_table(GACHA_BATCHES_TABLE)
            .await?;
        if !batches_available {
            log::warn!("Table {GACHA_BATCHES_TABLE} not found, batch draws will be ungrouped");
        }
        Ok(Self {
            pool,
            batches_available,
        })
    }

    pub fn batches_available(&self) -> bool {
        self.batches_available
    }
}

#[async_trait]
impl GachaStore for SeaOrmGachaStore {
    async fn list_items(&self) -> AppResult<Vec<items::Model>> {
        let mut list = items::Entity::find().all(&self.pool).await?;
        sort_for_draw(&mut list);
        Ok(list)
    }

    async fn begin(&self) -> AppResult<Box<dyn GachaUnit>> {
        let txn = self.pool.begin().await?;
        Ok(Box::new(SeaOrmGachaUnit {
            txn,
            batches_available: self.batches_available,
        }))
    }

    async fn points_balance(&self, user_id: i64) -> AppResult<Option<i64>> {
        let user = users::Entity::find_by_id(user_id).one(&self.pool).await?;
        Ok(user.map(|u| u.points))
    }

    async fn award_points(&self, user_id: i64, amount: i64) -> AppResult<Option<i64>> {
        let txn = self.pool.begin().await?;
        let result = users::Entity::update_many()
            .col_expr(
                users::Column::Points,
                Expr::col(users::Column::Points).add(amount),
            )
            .col_expr(users::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(users::Column::Id.eq(user_id))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(None);
        }
        let balance = users::Entity::find_by_id(user_id)
            .one(&txn)
            .await?
            .map(|u| u.points);
        txn.commit().await?;
        Ok(balance)
    }

    async fn list_draws(&self, user_id: i64, limit: u64) -> AppResult<Vec<DrawWithItem>> {
        let rows = draw_records::Entity::find()
            .find_also_related(items::Entity)
            .filter(draw_records::Column::UserId.eq(user_id))
            .order_by_desc(draw_records::Column::CreatedAt)
            .order_by_desc(draw_records::Column::Id)
            .limit(limit)
            .all(&self.pool)
            .await?;
        Ok(rows)
    }
}

/// 一次抽卡对应的数据库事务
/// drop 时 sea-orm 自动回滚未提交的事务
pub struct SeaOrmGachaUnit {
    txn: DatabaseTransaction,
    batches_available: bool,
}

impl SeaOrmGachaUnit {
    async fn insert_batch(
        txn: &DatabaseTransaction,
        user_id: i64,
        draw_count: i32,
        total_cost: i64,
    ) -> Result<gacha_batches::Model, DbErr> {
        gacha_batches::ActiveModel {
            user_id: Set(user_id),
            draw_count: Set(draw_count),
            total_cost: Set(total_cost),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(txn)
        .await
    }

    /// 查询并授予成就，在调用方给出的 savepoint 内执行
    async fn insert_user_achievement(
        txn: &DatabaseTransaction,
        user_id: i64,
        code: &str,
    ) -> Result<bool, DbErr> {
        let Some(achievement) = achievements::Entity::find()
            .filter(achievements::Column::Code.eq(code))
            .one(txn)
            .await?
        else {
            return Ok(false);
        };

        let unlocked = user_achievements::Entity::find()
            .filter(user_achievements::Column::UserId.eq(user_id))
            .filter(user_achievements::Column::AchievementId.eq(achievement.id))
            .one(txn)
            .await?;
        if unlocked.is_some() {
            return Ok(false);
        }

        user_achievements::ActiveModel {
            user_id: Set(user_id),
            achievement_id: Set(achievement.id),
            unlocked_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(txn)
        .await?;
        Ok(true)
    }
}

#[async_trait]
impl GachaUnit for SeaOrmGachaUnit {
    async fn conditional_decrement(&mut self, user_id: i64, amount: i64) -> AppResult<bool> {
        // 乐观: UPDATE ... SET points = points - amount WHERE id = ? AND points >= amount
        let result = users::Entity::update_many()
            .col_expr(
                users::Column::Points,
                Expr::col(users::Column::Points).sub(amount),
            )
            .col_expr(users::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(users::Column::Id.eq(user_id))
            .filter(users::Column::Points.gte(amount))
            .exec(&self.txn)
            .await?;
        Ok(result.rows_affected == 1)
    }

    async fn current_points(&mut self, user_id: i64) -> AppResult<i64> {
        users::Entity::find_by_id(user_id)
            .one(&self.txn)
            .await?
            .map(|u| u.points)
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    async fn create_batch(
        &mut self,
        user_id: i64,
        draw_count: i32,
        total_cost: i64,
    ) -> AppResult<Option<gacha_batches::Model>> {
        if !self.batches_available {
            return Ok(None);
        }

        // savepoint: 失败只回滚这一条写入，外层事务继续
        let savepoint = match self.txn.begin().await {
            Ok(savepoint) => savepoint,
            Err(e) => {
                log::warn!("Failed to open savepoint for gacha batch of user {user_id}: {e}");
                return Ok(None);
            }
        };
        match Self::insert_batch(&savepoint, user_id, draw_count, total_cost).await {
            Ok(batch) => match savepoint.commit().await {
                Ok(()) => Ok(Some(batch)),
                Err(e) => {
                    log::warn!("Failed to release savepoint for gacha batch of user {user_id}: {e}");
                    Ok(None)
                }
            },
            Err(e) => {
                log::warn!("Failed to create gacha batch for user {user_id}: {e}");
                if let Err(e) = savepoint.rollback().await {
                    log::warn!("Failed to roll back gacha batch savepoint: {e}");
                }
                Ok(None)
            }
        }
    }

    async fn create_draw_record(
        &mut self,
        user_id: i64,
        item_id: i64,
        batch_id: Option<i64>,
    ) -> AppResult<draw_records::Model> {
        let record = draw_records::ActiveModel {
            user_id: Set(user_id),
            item_id: Set(item_id),
            batch_id: Set(batch_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.txn)
        .await?;
        Ok(record)
    }

    async fn create_inventory_grant(
        &mut self,
        user_id: i64,
        item_id: i64,
    ) -> AppResult<inventory_items::Model> {
        let entry = inventory_items::ActiveModel {
            user_id: Set(user_id),
            item_id: Set(item_id),
            source: Set("gacha".to_string()),
            acquired_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.txn)
        .await?;
        Ok(entry)
    }

    async fn create_notification(
        &mut self,
        user_id: i64,
        kind: &str,
        message: &str,
    ) -> AppResult<()> {
        notifications::ActiveModel {
            user_id: Set(user_id),
            kind: Set(kind.to_string()),
            message: Set(message.to_string()),
            is_read: Set(false),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.txn)
        .await?;
        Ok(())
    }

    async fn create_audit_entry(
        &mut self,
        user_id: i64,
        action: &str,
        detail: serde_json::Value,
    ) -> AppResult<()> {
        audit_logs::ActiveModel {
            user_id: Set(user_id),
            action: Set(action.to_string()),
            detail: Set(detail.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.txn)
        .await?;
        Ok(())
    }

    async fn unlock_achievement(&mut self, user_id: i64, code: &str) -> bool {
        // 查询与写入都在 savepoint 内，任何失败都不会使外层事务进入 aborted 状态
        let savepoint = match self.txn.begin().await {
            Ok(savepoint) => savepoint,
            Err(e) => {
                log::warn!("Failed to open savepoint for {code} of user {user_id}: {e}");
                return false;
            }
        };
        match Self::insert_user_achievement(&savepoint, user_id, code).await {
            Ok(granted) => match savepoint.commit().await {
                Ok(()) => granted,
                Err(e) => {
                    log::warn!("Failed to release savepoint for {code} of user {user_id}: {e}");
                    false
                }
            },
            Err(e) => {
                log::warn!("Skipping {code} for user {user_id}: {e}");
                if let Err(e) = savepoint.rollback().await {
                    log::warn!("Failed to roll back achievement savepoint: {e}");
                }
                false
            }
        }
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.txn.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.txn.rollback().await?;
        Ok(())
    }
}
