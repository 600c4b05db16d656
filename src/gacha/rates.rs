//! 概率公示：与抽取共用 effective_weight

use super::selector::effective_weight;
use crate::config::GachaConfig;
use crate::entities::Rarity;
use crate::models::GachaRatesResponse;
use std::collections::BTreeMap;

pub fn current_rates(config: &GachaConfig) -> GachaRatesResponse {
    let weights: BTreeMap<String, i64> = Rarity::ALL
        .iter()
        .map(|rarity| (rarity.to_string(), effective_weight(*rarity)))
        .collect();
    let total: i64 = weights.values().sum();

    let probabilities = weights
        .iter()
        .map(|(name, w)| (name.clone(), *w as f64 / total as f64))
        .collect();

    GachaRatesResponse {
        weights,
        probabilities,
        cost_per_draw: config.cost_per_draw,
        max_batch: config.effective_max_batch(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gacha::selector::RARITY_WEIGHTS;

    #[test]
    fn probabilities_sum_to_one() {
        let rates = current_rates(&GachaConfig::default());
        let sum: f64 = rates.probabilities.values().sum();
        assert!((sum - 1.0).abs() < 1e-9, "sum = {sum}");
    }

    #[test]
    fn probability_order_matches_weight_order() {
        let rates = current_rates(&GachaConfig::default());
        let p = |r: Rarity| rates.probabilities[r.as_str()];
        assert!(p(Rarity::Legendary) < p(Rarity::Epic));
        assert!(p(Rarity::Epic) < p(Rarity::Rare));
        assert!(p(Rarity::Rare) < p(Rarity::Common));
        assert!((p(Rarity::Common) - 0.60).abs() < 1e-9);
        assert!((p(Rarity::Legendary) - 0.01).abs() < 1e-9);
    }

    #[test]
    fn weights_match_selector_table() {
        let rates = current_rates(&GachaConfig::default());
        for (rarity, weight) in RARITY_WEIGHTS {
            assert_eq!(rates.weights[rarity.as_str()], weight);
        }
    }

    #[test]
    fn publishes_config_knobs() {
        let rates = current_rates(&GachaConfig {
            cost_per_draw: 15,
            max_batch: 250,
        });
        assert_eq!(rates.cost_per_draw, 15);
        assert_eq!(rates.max_batch, 100);
    }
}
