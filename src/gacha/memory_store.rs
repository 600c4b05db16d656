//! 内存实现的抽卡存储
//!
//! 仅在测试中编译。条件扣减通过按用户划分的互斥锁实现：
//! unit 在扣减时获取该用户的锁，直到 commit 或 drop 才释放，
//! 语义上对应数据库 UPDATE 持有的行锁。所有写入先暂存在 unit 中，commit 时一次性生效。

use super::selector::sort_for_draw;
use super::store::{DrawWithItem, GachaStore, GachaUnit};
use crate::entities::{
    Rarity, achievement_entity as achievements, audit_log_entity as audit_logs,
    draw_record_entity as draw_records, gacha_batch_entity as gacha_batches,
    inventory_item_entity as inventory_items, item_entity as items,
    notification_entity as notifications, user_achievement_entity as user_achievements,
};
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::DbErr;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// 可注入一次性失败的写入点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Decrement,
    Batch,
    DrawRecord,
    InventoryGrant,
    Notification,
    AuditEntry,
    Achievement,
    Commit,
}

#[derive(Default)]
struct Records {
    batches: Vec<gacha_batches::Model>,
    draws: Vec<draw_records::Model>,
    inventory: Vec<inventory_items::Model>,
    notifications: Vec<notifications::Model>,
    audit_entries: Vec<audit_logs::Model>,
    unlocked: Vec<user_achievements::Model>,
}

impl Records {
    fn absorb(&mut self, other: Records) {
        self.batches.extend(other.batches);
        self.draws.extend(other.draws);
        self.inventory.extend(other.inventory);
        self.notifications.extend(other.notifications);
        self.audit_entries.extend(other.audit_entries);
        self.unlocked.extend(other.unlocked);
    }
}

#[derive(Default)]
struct State {
    points: HashMap<i64, i64>,
    items: Vec<items::Model>,
    achievements: Vec<achievements::Model>,
    records: Records,
}

struct Inner {
    state: Mutex<State>,
    user_locks: Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>,
    fail_points: Mutex<HashSet<FailPoint>>,
    next_id: AtomicI64,
    batches_enabled: AtomicBool,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn user_lock(&self, user_id: i64) -> Arc<AsyncMutex<()>> {
        let mut locks = self
            .user_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(user_id).or_default().clone()
    }

    fn take_failure(&self, point: FailPoint) -> AppResult<()> {
        let hit = self
            .fail_points
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&point);
        if hit {
            return Err(AppError::DatabaseError(DbErr::Custom(format!(
                "injected failure at {point:?}"
            ))));
        }
        Ok(())
    }

    fn achievement_id(&self, code: &str) -> Option<i64> {
        self.state()
            .achievements
            .iter()
            .find(|a| a.code == code)
            .map(|a| a.id)
    }
}

#[derive(Clone)]
pub struct MemoryGachaStore {
    inner: Arc<Inner>,
}

impl Default for MemoryGachaStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGachaStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                user_locks: Mutex::new(HashMap::new()),
                fail_points: Mutex::new(HashSet::new()),
                next_id: AtomicI64::new(0),
                batches_enabled: AtomicBool::new(true),
            }),
        }
    }

    /// 模拟分组表未迁移
    pub fn without_batches(self) -> Self {
        self.inner.batches_enabled.store(false, Ordering::SeqCst);
        self
    }

    pub fn add_user(&self, user_id: i64, points: i64) {
        self.inner.state().points.insert(user_id, points);
    }

    pub fn add_item(&self, name: &str, rarity: Rarity, power: Option<i32>) -> items::Model {
        let item = items::Model {
            id: self.inner.next_id(),
            name: name.to_string(),
            rarity,
            power,
            created_at: Utc::now(),
        };
        self.inner.state().items.push(item.clone());
        item
    }

    pub fn add_achievement(&self, code: &str, name: &str) {
        let achievement = achievements::Model {
            id: self.inner.next_id(),
            code: code.to_string(),
            name: name.to_string(),
            description: None,
        };
        self.inner.state().achievements.push(achievement);
    }

    /// 下一次到达该写入点时失败一次
    pub fn fail_once(&self, point: FailPoint) {
        self.inner
            .fail_points
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(point);
    }

    pub fn points(&self, user_id: i64) -> Option<i64> {
        self.inner.state().points.get(&user_id).copied()
    }

    pub fn draws(&self, user_id: i64) -> Vec<draw_records::Model> {
        self.inner
            .state()
            .records
            .draws
            .iter()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn batches(&self, user_id: i64) -> Vec<gacha_batches::Model> {
        self.inner
            .state()
            .records
            .batches
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn inventory(&self, user_id: i64) -> Vec<inventory_items::Model> {
        self.inner
            .state()
            .records
            .inventory
            .iter()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn notifications(&self, user_id: i64) -> Vec<notifications::Model> {
        self.inner
            .state()
            .records
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn audit_entries(&self, user_id: i64) -> Vec<audit_logs::Model> {
        self.inner
            .state()
            .records
            .audit_entries
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn unlocked_achievements(&self, user_id: i64) -> usize {
        self.inner
            .state()
            .records
            .unlocked
            .iter()
            .filter(|u| u.user_id == user_id)
            .count()
    }
}

#[async_trait]
impl GachaStore for MemoryGachaStore {
    async fn list_items(&self) -> AppResult<Vec<items::Model>> {
        let mut list = self.inner.state().items.clone();
        sort_for_draw(&mut list);
        Ok(list)
    }

    async fn begin(&self) -> AppResult<Box<dyn GachaUnit>> {
        Ok(Box::new(MemoryGachaUnit {
            inner: self.inner.clone(),
            locks: HashMap::new(),
            debits: HashMap::new(),
            staged: Records::default(),
        }))
    }

    async fn points_balance(&self, user_id: i64) -> AppResult<Option<i64>> {
        Ok(self.points(user_id))
    }

    async fn award_points(&self, user_id: i64, amount: i64) -> AppResult<Option<i64>> {
        // 与进行中的扣减串行
        let _guard = self.inner.user_lock(user_id).lock_owned().await;
        let mut state = self.inner.state();
        Ok(state.points.get_mut(&user_id).map(|points| {
            *points += amount;
            *points
        }))
    }

    async fn list_draws(&self, user_id: i64, limit: u64) -> AppResult<Vec<DrawWithItem>> {
        let state = self.inner.state();
        let mut draws: Vec<&draw_records::Model> = state
            .records
            .draws
            .iter()
            .filter(|d| d.user_id == user_id)
            .collect();
        draws.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(draws
            .into_iter()
            .take(limit as usize)
            .map(|d| {
                let item = state.items.iter().find(|i| i.id == d.item_id).cloned();
                (d.clone(), item)
            })
            .collect())
    }
}

pub struct MemoryGachaUnit {
    inner: Arc<Inner>,
    locks: HashMap<i64, OwnedMutexGuard<()>>,
    debits: HashMap<i64, i64>,
    staged: Records,
}

impl MemoryGachaUnit {
    fn visible_points(&self, user_id: i64) -> Option<i64> {
        let committed = self.inner.state().points.get(&user_id).copied()?;
        Some(committed - self.debits.get(&user_id).copied().unwrap_or(0))
    }
}

#[async_trait]
impl GachaUnit for MemoryGachaUnit {
    async fn conditional_decrement(&mut self, user_id: i64, amount: i64) -> AppResult<bool> {
        self.inner.take_failure(FailPoint::Decrement)?;

        if !self.locks.contains_key(&user_id) {
            let guard = self.inner.user_lock(user_id).lock_owned().await;
            self.locks.insert(user_id, guard);
        }

        match self.visible_points(user_id) {
            Some(available) if available >= amount => {
                *self.debits.entry(user_id).or_insert(0) += amount;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn current_points(&mut self, user_id: i64) -> AppResult<i64> {
        self.visible_points(user_id)
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    async fn create_batch(
        &mut self,
        user_id: i64,
        draw_count: i32,
        total_cost: i64,
    ) -> AppResult<Option<gacha_batches::Model>> {
        if !self.inner.batches_enabled.load(Ordering::SeqCst) {
            return Ok(None);
        }
        if let Err(e) = self.inner.take_failure(FailPoint::Batch) {
            log::warn!("Failed to create gacha batch for user {user_id}: {e}");
            return Ok(None);
        }

        let batch = gacha_batches::Model {
            id: self.inner.next_id(),
            user_id,
            draw_count,
            total_cost,
            created_at: Utc::now(),
        };
        self.staged.batches.push(batch.clone());
        Ok(Some(batch))
    }

    async fn create_draw_record(
        &mut self,
        user_id: i64,
        item_id: i64,
        batch_id: Option<i64>,
    ) -> AppResult<draw_records::Model> {
        self.inner.take_failure(FailPoint::DrawRecord)?;
        let record = draw_records::Model {
            id: self.inner.next_id(),
            user_id,
            item_id,
            batch_id,
            created_at: Utc::now(),
        };
        self.staged.draws.push(record.clone());
        Ok(record)
    }

    async fn create_inventory_grant(
        &mut self,
        user_id: i64,
        item_id: i64,
    ) -> AppResult<inventory_items::Model> {
        self.inner.take_failure(FailPoint::InventoryGrant)?;
        let entry = inventory_items::Model {
            id: self.inner.next_id(),
            user_id,
            item_id,
            source: "gacha".to_string(),
            acquired_at: Utc::now(),
        };
        self.staged.inventory.push(entry.clone());
        Ok(entry)
    }

    async fn create_notification(
        &mut self,
        user_id: i64,
        kind: &str,
        message: &str,
    ) -> AppResult<()> {
        self.inner.take_failure(FailPoint::Notification)?;
        self.staged.notifications.push(notifications::Model {
            id: self.inner.next_id(),
            user_id,
            kind: kind.to_string(),
            message: message.to_string(),
            is_read: false,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn create_audit_entry(
        &mut self,
        user_id: i64,
        action: &str,
        detail: serde_json::Value,
    ) -> AppResult<()> {
        self.inner.take_failure(FailPoint::AuditEntry)?;
        self.staged.audit_entries.push(audit_logs::Model {
            id: self.inner.next_id(),
            user_id,
            action: action.to_string(),
            detail: detail.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn unlock_achievement(&mut self, user_id: i64, code: &str) -> bool {
        if let Err(e) = self.inner.take_failure(FailPoint::Achievement) {
            log::warn!("Skipping {code} for user {user_id}: {e}");
            return false;
        }
        let Some(achievement_id) = self.inner.achievement_id(code) else {
            return false;
        };

        let matches =
            |u: &user_achievements::Model| u.user_id == user_id && u.achievement_id == achievement_id;
        let committed = self.inner.state().records.unlocked.iter().any(matches);
        if committed || self.staged.unlocked.iter().any(matches) {
            return false;
        }

        self.staged.unlocked.push(user_achievements::Model {
            id: self.inner.next_id(),
            user_id,
            achievement_id,
            unlocked_at: Utc::now(),
        });
        true
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.inner.take_failure(FailPoint::Commit)?;

        let MemoryGachaUnit {
            inner,
            locks,
            debits,
            staged,
        } = *self;
        {
            let mut state = inner.state();
            for (user_id, amount) in debits {
                if let Some(points) = state.points.get_mut(&user_id) {
                    *points -= amount;
                }
            }
            state.records.absorb(staged);
        }
        // 写入生效后才释放用户锁
        drop(locks);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn uncommitted_unit_leaves_no_trace() {
        let store = MemoryGachaStore::new();
        store.add_user(1, 50);
        let item = store.add_item("Sword", Rarity::Rare, Some(10));

        {
            let mut unit = store.begin().await.unwrap();
            assert!(unit.conditional_decrement(1, 20).await.unwrap());
            unit.create_draw_record(1, item.id, None).await.unwrap();
            assert_eq!(unit.current_points(1).await.unwrap(), 30);
            // drop without commit
        }

        assert_eq!(store.points(1), Some(50));
        assert!(store.draws(1).is_empty());
    }

    #[tokio::test]
    async fn commit_applies_debit_and_records() {
        let store = MemoryGachaStore::new();
        store.add_user(1, 50);
        let item = store.add_item("Sword", Rarity::Rare, None);

        let mut unit = store.begin().await.unwrap();
        assert!(unit.conditional_decrement(1, 20).await.unwrap());
        unit.create_draw_record(1, item.id, None).await.unwrap();
        unit.commit().await.unwrap();

        assert_eq!(store.points(1), Some(30));
        assert_eq!(store.draws(1).len(), 1);
    }

    #[tokio::test]
    async fn decrement_fails_closed() {
        let store = MemoryGachaStore::new();
        store.add_user(1, 5);

        let mut unit = store.begin().await.unwrap();
        assert!(!unit.conditional_decrement(1, 10).await.unwrap());
        assert!(!unit.conditional_decrement(99, 1).await.unwrap());
        unit.rollback().await.unwrap();

        assert_eq!(store.points(1), Some(5));
    }

    #[tokio::test]
    async fn second_unit_waits_for_first_commit() {
        let store = MemoryGachaStore::new();
        store.add_user(1, 10);

        let mut first = store.begin().await.unwrap();
        assert!(first.conditional_decrement(1, 10).await.unwrap());

        let contender = {
            let store = store.clone();
            tokio::spawn(async move {
                let mut second = store.begin().await.unwrap();
                let ok = second.conditional_decrement(1, 10).await.unwrap();
                second.rollback().await.unwrap();
                ok
            })
        };

        tokio::task::yield_now().await;
        first.commit().await.unwrap();

        assert!(!contender.await.unwrap());
        assert_eq!(store.points(1), Some(0));
    }

    #[tokio::test]
    async fn batch_grouping_can_be_disabled() {
        let store = MemoryGachaStore::new().without_batches();
        store.add_user(1, 10);

        let mut unit = store.begin().await.unwrap();
        assert!(unit.create_batch(1, 3, 30).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn history_is_newest_first_and_limited() {
        let store = MemoryGachaStore::new();
        store.add_user(1, 100);
        let item = store.add_item("Sword", Rarity::Common, None);

        let mut unit = store.begin().await.unwrap();
        for _ in 0..5 {
            unit.create_draw_record(1, item.id, None).await.unwrap();
        }
        unit.commit().await.unwrap();

        let rows = store.list_draws(1, 3).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].0.id > rows[1].0.id);
        assert!(rows.iter().all(|(_, item)| item.is_some()));
        assert!(store.list_draws(2, 50).await.unwrap().is_empty());
    }
}
