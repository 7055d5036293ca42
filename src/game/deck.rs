use rand::Rng;
use rand::seq::SliceRandom;

use super::state::{Card, CardId};

// Takes the first `required` items, wrapping around the pool when it is too
// short. Distinct pairs may then share a symbol.
pub fn select_items(items: &[String], required: usize) -> Vec<String> {
    if items.is_empty() {
        return Vec::new();
    }
    (0..required).map(|i| items[i % items.len()].clone()).collect()
}

pub fn build_deck<R: Rng + ?Sized>(
    items: &[String],
    required_pairs: usize,
    round: u64,
    rng: &mut R,
) -> Vec<Card> {
    let selected = select_items(items, required_pairs);
    let mut values = Vec::with_capacity(selected.len() * 2);
    values.extend(selected.iter().cloned());
    values.extend(selected);

    // Fisher-Yates.
    values.shuffle(rng);

    values
        .into_iter()
        .enumerate()
        .map(|(position, content)| Card {
            id: CardId {
                round,
                position: position as u32,
            },
            content,
            is_flipped: false,
            is_matched: false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn pool(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("item-{i}")).collect()
    }

    proptest! {
        #[test]
        fn full_pool_gives_distinct_pairs(extra in 0usize..10, pairs in 1usize..20, seed in any::<u64>()) {
            let items = pool(pairs + extra);
            let mut rng = StdRng::seed_from_u64(seed);
            let deck = build_deck(&items, pairs, 1, &mut rng);
            prop_assert_eq!(deck.len(), pairs * 2);

            let mut counts: HashMap<&str, usize> = HashMap::new();
            for card in &deck {
                *counts.entry(card.content.as_str()).or_default() += 1;
            }
            prop_assert_eq!(counts.len(), pairs);
            prop_assert!(counts.values().all(|&c| c == 2));
            for item in &items[..pairs] {
                prop_assert!(counts.contains_key(item.as_str()));
            }
        }

        #[test]
        fn short_pool_wraps_round_robin(size in 1usize..6, pairs in 6usize..20) {
            let items = pool(size);
            let selected = select_items(&items, pairs);
            prop_assert_eq!(selected.len(), pairs);
            for (i, token) in selected.iter().enumerate() {
                prop_assert_eq!(token, &items[i % size]);
            }

            let mut rng = StdRng::seed_from_u64(7);
            let deck = build_deck(&items, pairs, 1, &mut rng);
            prop_assert_eq!(deck.len(), pairs * 2);
            prop_assert!(deck.iter().all(|c| items.contains(&c.content)));
        }
    }

    #[test]
    fn ids_are_unique_within_and_across_rounds() {
        let items = pool(8);
        let mut rng = StdRng::seed_from_u64(3);
        let first = build_deck(&items, 8, 1, &mut rng);
        let second = build_deck(&items, 8, 2, &mut rng);
        let ids: HashSet<CardId> = first.iter().chain(second.iter()).map(|c| c.id).collect();
        assert_eq!(ids.len(), 32);
        assert!(first.iter().all(|c| !c.is_flipped && !c.is_matched));
    }

    #[test]
    fn empty_pool_builds_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(build_deck(&[], 4, 1, &mut rng).is_empty());
    }

    #[test]
    fn shuffle_is_uniform_per_position() {
        const TRIALS: usize = 6000;
        let items = pool(3);
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut counts = [[0usize; 3]; 6];
        for _ in 0..TRIALS {
            let deck = build_deck(&items, 3, 1, &mut rng);
            for (position, card) in deck.iter().enumerate() {
                let idx = items.iter().position(|i| *i == card.content).unwrap();
                counts[position][idx] += 1;
            }
        }

        let expected = TRIALS as f64 / 3.0;
        let chi_square: f64 = counts
            .iter()
            .flat_map(|row| row.iter())
            .map(|&observed| {
                let diff = observed as f64 - expected;
                diff * diff / expected
            })
            .sum();
        // 12 degrees of freedom; p = 0.001 sits near 32.9.
        assert!(chi_square < 40.0, "chi-square {chi_square} too large: {counts:?}");
    }
}
