//! 加权随机抽取
//!
//! 每次抽卡请求（单抽或多连抽）只构建一次累积权重表，
//! 多连抽的每一次抽取独立采样 r ∈ [1, total]，选取第一个累积上界 >= r 的物品。

use crate::entities::{Rarity, item_entity as items};
use crate::error::{AppError, AppResult};
use rand::Rng;

/// 稀有度权重表，抽取与概率展示共用
pub const RARITY_WEIGHTS: [(Rarity, i64); 4] = [
    (Rarity::Common, 60),
    (Rarity::Rare, 30),
    (Rarity::Epic, 9),
    (Rarity::Legendary, 1),
];

/// 查询稀有度权重，缺失或非正时按 1 处理
pub fn effective_weight(rarity: Rarity) -> i64 {
    RARITY_WEIGHTS
        .iter()
        .find(|(r, _)| *r == rarity)
        .map(|(_, w)| *w)
        .filter(|w| *w > 0)
        .unwrap_or(1)
}

/// 物品池的抽取顺序：稀有度从高到低，同稀有度按 id 升序
pub fn sort_for_draw(list: &mut [items::Model]) {
    list.sort_by_key(|item| (item.rarity.draw_rank(), item.id));
}

/// 累积权重表
#[derive(Debug, Clone)]
pub struct CumulativeTable<'a> {
    entries: Vec<(i64, &'a items::Model)>,
    total: i64,
}

impl<'a> CumulativeTable<'a> {
    /// 按给定顺序构建累积权重表
    pub fn build(catalog: &'a [items::Model]) -> AppResult<Self> {
        if catalog.is_empty() {
            return Err(AppError::InvalidCatalog("No items in gacha pool".into()));
        }

        let mut entries = Vec::with_capacity(catalog.len());
        let mut acc: i64 = 0;
        for item in catalog {
            acc = acc
                .checked_add(effective_weight(item.rarity))
                .ok_or_else(|| AppError::InvalidCatalog("Total weight overflow".into()))?;
            entries.push((acc, item));
        }

        if acc <= 0 {
            return Err(AppError::InvalidCatalog(format!(
                "Total weight must be positive, got {acc}"
            )));
        }

        Ok(Self { entries, total: acc })
    }

    pub fn total(&self) -> i64 {
        self.total
    }

    /// 确定性查找：返回第一个累积上界 >= r 的物品，r 超出 [1, total] 时返回 None
    pub fn pick(&self, r: i64) -> Option<&'a items::Model> {
        if r < 1 || r > self.total {
            return None;
        }
        let idx = self.entries.partition_point(|(bound, _)| *bound < r);
        self.entries.get(idx).map(|(_, item)| *item)
    }

    /// 独立采样一次
    pub fn draw<R: Rng>(&self, rng: &mut R) -> AppResult<&'a items::Model> {
        let r = rng.gen_range(1..=self.total);
        self.pick(r).ok_or_else(|| {
            AppError::SelectionFailure(format!(
                "No entry for draw {r} in table of total {}",
                self.total
            ))
        })
    }

    /// 复用同一张表进行 count 次独立抽取
    pub fn draw_many<R: Rng>(
        &self,
        rng: &mut R,
        count: usize,
    ) -> AppResult<Vec<&'a items::Model>> {
        (0..count).map(|_| self.draw(rng)).collect()
    }
}
