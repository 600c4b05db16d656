//! 抽卡核心依赖的持久化接口
//!
//! 一次抽卡的所有写入（扣费、记录、背包、通知、审计、成就）都在同一个
//! `GachaUnit` 内完成；未 commit 即被 drop 的 unit 等同回滚。

use crate::entities::{
    draw_record_entity as draw_records, gacha_batch_entity as gacha_batches,
    inventory_item_entity as inventory_items, item_entity as items,
};
use crate::error::AppResult;
use async_trait::async_trait;

/// 抽卡记录及其对应物品（物品可能已被下线）
pub type DrawWithItem = (draw_records::Model, Option<items::Model>);

#[async_trait]
pub trait GachaStore: Send + Sync {
    /// 物品池，按抽取顺序排列
    async fn list_items(&self) -> AppResult<Vec<items::Model>>;

    /// 开启一个原子写入单元
    async fn begin(&self) -> AppResult<Box<dyn GachaUnit>>;

    /// 已提交的积分余额，用户不存在时为 None
    async fn points_balance(&self, user_id: i64) -> AppResult<Option<i64>>;

    /// 增加积分（任务完成等场景），返回新余额，用户不存在时为 None
    async fn award_points(&self, user_id: i64, amount: i64) -> AppResult<Option<i64>>;

    /// 用户的抽卡记录，按时间倒序，最多 limit 条
    async fn list_draws(&self, user_id: i64, limit: u64) -> AppResult<Vec<DrawWithItem>>;
}

#[async_trait]
pub trait GachaUnit: Send {
    /// 条件扣减：仅当余额 >= amount 时扣除，返回是否扣减成功
    async fn conditional_decrement(&mut self, user_id: i64, amount: i64) -> AppResult<bool>;

    /// 本单元内可见的当前余额
    async fn current_points(&mut self, user_id: i64) -> AppResult<i64>;

    /// 创建多连抽分组；分组表不可用或写入失败时返回 None，不影响本单元的其余写入
    async fn create_batch(
        &mut self,
        user_id: i64,
        draw_count: i32,
        total_cost: i64,
    ) -> AppResult<Option<gacha_batches::Model>>;

    async fn create_draw_record(
        &mut self,
        user_id: i64,
        item_id: i64,
        batch_id: Option<i64>,
    ) -> AppResult<draw_records::Model>;

    async fn create_inventory_grant(
        &mut self,
        user_id: i64,
        item_id: i64,
    ) -> AppResult<inventory_items::Model>;

    async fn create_notification(&mut self, user_id: i64, kind: &str, message: &str)
    -> AppResult<()>;

    async fn create_audit_entry(
        &mut self,
        user_id: i64,
        action: &str,
        detail: serde_json::Value,
    ) -> AppResult<()>;

    /// 解锁成就，仅在本次新授予时返回 true
    /// 已拥有、定义缺失或写入失败都返回 false，且不影响本单元的其余写入
    async fn unlock_achievement(&mut self, user_id: i64, code: &str) -> bool;

    async fn commit(self: Box<Self>) -> AppResult<()>;

    async fn rollback(self: Box<Self>) -> AppResult<()>;
}
