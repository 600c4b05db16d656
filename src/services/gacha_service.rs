use crate::config::GachaConfig;
use crate::entities::item_entity as items;
use crate::error::{AppError, AppResult};
use crate::gacha::{
    CumulativeTable, DEFAULT_BATCH_COUNT, FIRST_GACHA_ACHIEVEMENT, GachaStore, GachaUnit,
    HISTORY_PAGE_SIZE, current_rates,
};
use crate::models::{
    BatchSpinResponse, DrawHistoryEntry, GachaRatesResponse, PointsBalanceResponse, SpinResponse,
    SpinResult,
};
use serde_json::json;
use std::sync::Arc;

const NOTIFICATION_KIND: &str = "gacha";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpinKind {
    Single,
    Batch,
}

impl SpinKind {
    fn audit_action(self) -> &'static str {
        match self {
            SpinKind::Single => "gacha_spin",
            SpinKind::Batch => "gacha_batch_spin",
        }
    }
}

/// 一次已提交抽卡的结果
struct SpinOutcome {
    batch_id: Option<i64>,
    total_cost: i64,
    results: Vec<SpinResult>,
    remaining_balance: i64,
}

#[derive(Clone)]
pub struct GachaService {
    store: Arc<dyn GachaStore>,
    config: GachaConfig,
}

impl GachaService {
    /// 单抽价格必须为正，否则扣减会变成加分
    pub fn new(store: Arc<dyn GachaStore>, config: GachaConfig) -> AppResult<Self> {
        if config.cost_per_draw <= 0 {
            return Err(AppError::ConfigError(format!(
                "cost_per_draw must be positive, got {}",
                config.cost_per_draw
            )));
        }
        Ok(Self { store, config })
    }

    /// 概率公示
    pub fn rates(&self) -> GachaRatesResponse {
        current_rates(&self.config)
    }

    /// 单抽
    pub async fn spin(&self, user_id: i64) -> AppResult<SpinResponse> {
        let outcome = self.execute(user_id, 1, SpinKind::Single).await?;
        let remaining_balance = outcome.remaining_balance;
        let result = outcome
            .results
            .into_iter()
            .next()
            .ok_or_else(|| AppError::InternalError("Spin committed without a result".into()))?;

        Ok(SpinResponse {
            item: result.item,
            record: result.record,
            inventory_entry: result.inventory_entry,
            remaining_balance,
        })
    }

    /// 多连抽：次数默认 10，截断到 [1, max_batch]，一次性扣费
    pub async fn spin_batch(
        &self,
        user_id: i64,
        requested: Option<i64>,
    ) -> AppResult<BatchSpinResponse> {
        let count = self
            .config
            .clamp_batch_count(requested.unwrap_or(DEFAULT_BATCH_COUNT));
        let outcome = self.execute(user_id, count, SpinKind::Batch).await?;

        Ok(BatchSpinResponse {
            batch_id: outcome.batch_id,
            count,
            total_cost: outcome.total_cost,
            results: outcome.results,
            remaining_balance: outcome.remaining_balance,
        })
    }

    /// 当前用户最近的抽卡记录（倒序，最多 50 条）
    pub async fn history(&self, user_id: i64) -> AppResult<Vec<DrawHistoryEntry>> {
        let rows = self.store.list_draws(user_id, HISTORY_PAGE_SIZE).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn balance(&self, user_id: i64) -> AppResult<PointsBalanceResponse> {
        let points = self
            .store
            .points_balance(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        Ok(PointsBalanceResponse { user_id, points })
    }

    /// 为用户增加积分（任务/目标完成时由业务方调用）
    pub async fn award_points(&self, user_id: i64, amount: i64) -> AppResult<PointsBalanceResponse> {
        if amount <= 0 {
            return Err(AppError::ValidationError(
                "Points to award must be positive".into(),
            ));
        }
        let points = self
            .store
            .award_points(user_id, amount)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        log::info!("Awarded {amount} points to user {user_id}, balance {points}");
        Ok(PointsBalanceResponse { user_id, points })
    }

    // -----------------------------
    // 内部辅助方法
    // -----------------------------

    /// 抽卡事务:
    /// 1. 读取物品池并构建累积权重表（失败时尚未扣费）
    /// 2. 完成全部抽取
    /// 3. 条件扣减积分，余额不足直接回滚
    /// 4. 写入记录、背包、通知、审计与成就
    /// 5. 读取剩余余额并提交；任一步失败整体回滚
    async fn execute(&self, user_id: i64, count: i64, kind: SpinKind) -> AppResult<SpinOutcome> {
        let total_cost = self
            .config
            .cost_per_draw
            .checked_mul(count)
            .ok_or_else(|| AppError::ValidationError("Spin cost overflow".into()))?;

        let catalog = self.store.list_items().await?;
        let picks: Vec<items::Model> = {
            let table = CumulativeTable::build(&catalog)?;
            let mut rng = rand::thread_rng();
            table
                .draw_many(&mut rng, count as usize)?
                .into_iter()
                .cloned()
                .collect()
        };

        let mut unit = self.store.begin().await?;

        let debited = unit.conditional_decrement(user_id, total_cost).await;
        match debited {
            Ok(true) => {}
            Ok(false) => {
                log::warn!("User {user_id} has insufficient points for {count} draws ({total_cost})");
                if let Err(e) = unit.rollback().await {
                    log::error!("Rollback after rejected debit failed for user {user_id}: {e}");
                }
                return Err(AppError::InsufficientFunds {
                    required: total_cost,
                });
            }
            Err(e) => {
                log::error!("Debit failed for user {user_id}: {e}");
                if let Err(e) = unit.rollback().await {
                    log::error!("Rollback after failed debit failed for user {user_id}: {e}");
                }
                return Err(AppError::PersistenceFailure(e.to_string()));
            }
        }

        let persisted = self
            .persist(unit.as_mut(), user_id, &picks, kind, total_cost)
            .await;
        let outcome = match persisted {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Gacha spin for user {user_id} failed, rolling back: {e}");
                if let Err(e) = unit.rollback().await {
                    log::error!("Rollback failed for user {user_id}: {e}");
                }
                return Err(AppError::PersistenceFailure(e.to_string()));
            }
        };

        if let Err(e) = unit.commit().await {
            log::error!("Commit of gacha spin for user {user_id} failed: {e}");
            return Err(AppError::PersistenceFailure(e.to_string()));
        }

        log::info!(
            "User {user_id} completed {} ({count} draws, cost {total_cost}, balance {})",
            kind.audit_action(),
            outcome.remaining_balance
        );
        Ok(outcome)
    }

    async fn persist(
        &self,
        unit: &mut dyn GachaUnit,
        user_id: i64,
        picks: &[items::Model],
        kind: SpinKind,
        total_cost: i64,
    ) -> AppResult<SpinOutcome> {
        let batch_id = match kind {
            SpinKind::Batch => unit
                .create_batch(user_id, picks.len() as i32, total_cost)
                .await?
                .map(|batch| batch.id),
            SpinKind::Single => None,
        };

        let mut results = Vec::with_capacity(picks.len());
        for item in picks {
            let record = unit.create_draw_record(user_id, item.id, batch_id).await?;
            let entry = unit.create_inventory_grant(user_id, item.id).await?;
            results.push(SpinResult {
                item: item.clone().into(),
                record: record.into(),
                inventory_entry: entry.into(),
            });
        }

        let message = match (kind, picks) {
            (SpinKind::Single, [item]) => format!("You got {} ({})!", item.name, item.rarity),
            _ => format!("Batch spin complete: {} items obtained", picks.len()),
        };
        unit.create_notification(user_id, NOTIFICATION_KIND, &message)
            .await?;

        let item_ids: Vec<i64> = picks.iter().map(|item| item.id).collect();
        unit.create_audit_entry(
            user_id,
            kind.audit_action(),
            json!({
                "draws": picks.len(),
                "cost": total_cost,
                "item_ids": item_ids,
                "batch_id": batch_id,
            }),
        )
        .await?;

        self.unlock_first_gacha(unit, user_id).await;

        let remaining_balance = unit.current_points(user_id).await?;

        Ok(SpinOutcome {
            batch_id,
            total_cost,
            results,
            remaining_balance,
        })
    }

    /// 首抽成就：已拥有、定义缺失或写入失败时跳过
    async fn unlock_first_gacha(&self, unit: &mut dyn GachaUnit, user_id: i64) {
        if unit.unlock_achievement(user_id, FIRST_GACHA_ACHIEVEMENT).await {
            log::info!("User {user_id} unlocked {FIRST_GACHA_ACHIEVEMENT}");
        }
    }
}
