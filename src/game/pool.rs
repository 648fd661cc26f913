//! 共享牌池：剩余张数表与弃牌堆。

use std::collections::BTreeMap;

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::card::{Card, DEFAULT_CATALOG};

/// 一次抽牌的结果，附带是否触发了洗回或重置。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draw {
    pub cards: Vec<Card>,
    pub reshuffled: usize,
    pub reset: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardPool {
    cards: BTreeMap<Card, u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    discard_pile: Vec<Card>,
    #[serde(default = "default_copies")]
    copies: usize,
}

fn default_copies() -> usize {
    1
}

fn catalog(copies: usize) -> BTreeMap<Card, u32> {
    let copies = u32::try_from(copies.max(1)).unwrap_or(u32::MAX);
    DEFAULT_CATALOG
        .iter()
        .map(|(name, count)| (Card::named(name), count.saturating_mul(copies)))
        .collect()
}

impl Default for CardPool {
    fn default() -> Self {
        Self::with_copies(1)
    }
}

impl CardPool {
    /// 默认牌表的 `copies` 份；重置时也恢复到同样的份数。
    pub fn with_copies(copies: usize) -> Self {
        Self {
            cards: catalog(copies),
            discard_pile: Vec::new(),
            copies: copies.max(1),
        }
    }

    pub fn empty() -> Self {
        Self {
            cards: BTreeMap::new(),
            discard_pile: Vec::new(),
            copies: 1,
        }
    }

    pub fn reset(&mut self) {
        self.cards = catalog(self.copies);
        self.discard_pile.clear();
        debug!("card pool reset to default catalog");
    }

    pub fn add_card(&mut self, card: Card, count: u32) {
        if count == 0 {
            return;
        }
        let slot = self.cards.entry(card).or_insert(0);
        *slot = slot.saturating_add(count);
    }

    /// 合并另一个牌池的剩余牌与弃牌堆。
    pub fn absorb(&mut self, other: CardPool) {
        for (card, count) in other.cards {
            self.add_card(card, count);
        }
        self.discard_pile.extend(other.discard_pile);
    }

    pub fn put_back(&mut self, card: Card) {
        debug!("put {card} into discard pile");
        self.discard_pile.push(card);
    }

    pub fn remaining(&self) -> u32 {
        self.cards
            .values()
            .fold(0u32, |total, count| total.saturating_add(*count))
    }

    pub fn count_of(&self, card: &Card) -> u32 {
        self.cards.get(card).copied().unwrap_or(0)
    }

    pub fn contains(&self, card: &Card) -> bool {
        self.cards.contains_key(card)
    }

    pub fn discard_pile(&self) -> &[Card] {
        &self.discard_pile
    }

    fn reshuffle_discards<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        let mut pile = std::mem::take(&mut self.discard_pile);
        pile.shuffle(rng);
        let returned = pile.len();
        for card in pile {
            self.add_card(card, 1);
        }
        debug!("shuffled {returned} discarded cards back into the pool");
        returned
    }

    /// 按剩余张数加权随机抽取 `amount` 张。不足时先洗回弃牌堆，仍不足则重置。
    pub fn draw<R: Rng + ?Sized>(&mut self, amount: usize, rng: &mut R) -> Draw {
        let mut draw = Draw::default();

        if (self.remaining() as usize) < amount && !self.discard_pile.is_empty() {
            draw.reshuffled = self.reshuffle_discards(rng);
        }
        if (self.remaining() as usize) < amount {
            self.reset();
            draw.reset = true;
        }

        for _ in 0..amount {
            let total = self.remaining();
            if total == 0 {
                break;
            }
            let mut roll = rng.gen_range(0..total);
            let picked = self.cards.iter().find_map(|(card, count)| {
                if roll < *count {
                    Some(card.clone())
                } else {
                    roll -= *count;
                    None
                }
            });
            let Some(card) = picked else {
                break;
            };
            if let Some(count) = self.cards.get_mut(&card) {
                *count -= 1;
                if *count == 0 {
                    self.cards.remove(&card);
                }
            }
            draw.cards.push(card);
        }

        debug!(
            "drew {} cards: {}",
            draw.cards.len(),
            draw.cards
                .iter()
                .map(Card::name)
                .collect::<Vec<_>>()
                .join(", ")
        );
        draw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn drawing_from_an_empty_pool_resets_it() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut pool = CardPool::empty();

        let draw = pool.draw(2, &mut rng);

        assert!(draw.reset);
        assert_eq!(draw.cards.len(), 2);
        let catalog_total: u32 = DEFAULT_CATALOG.iter().map(|(_, count)| count).sum();
        assert_eq!(pool.remaining(), catalog_total - 2);
    }

    #[test]
    fn discards_are_reshuffled_before_resetting() {
        let mut rng = SmallRng::seed_from_u64(11);
        let mut pool = CardPool::empty();
        pool.add_card(Card::named("Apple"), 1);
        pool.put_back(Card::named("Bed"));
        pool.put_back(Card::named("Shield"));

        let draw = pool.draw(3, &mut rng);

        assert_eq!(draw.reshuffled, 2);
        assert!(!draw.reset);
        let mut names: Vec<&str> = draw.cards.iter().map(Card::name).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["Apple", "Bed", "Shield"]);
        assert_eq!(pool.remaining(), 0);
        assert!(pool.discard_pile().is_empty());
    }

    #[test]
    fn exhausted_card_keys_are_removed() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut pool = CardPool::empty();
        let tnt = Card::named("TNT");
        pool.add_card(tnt.clone(), 2);

        pool.draw(1, &mut rng);
        assert_eq!(pool.count_of(&tnt), 1);
        pool.draw(1, &mut rng);
        assert!(!pool.contains(&tnt));
    }

    #[test]
    fn absorbing_merges_counts_and_discards() {
        let mut pool = CardPool::default();
        let mut other = CardPool::default();
        other.put_back(Card::named("Glass"));
        let before = pool.remaining();

        pool.absorb(other);

        assert_eq!(pool.remaining(), before * 2);
        assert_eq!(pool.discard_pile().len(), 1);
        assert_eq!(CardPool::with_copies(2).remaining(), before * 2);
    }

    #[test]
    fn huge_copy_counts_saturate_instead_of_overflowing() {
        let pool = CardPool::with_copies(usize::MAX);

        assert_eq!(pool.count_of(&Card::named("Bed")), u32::MAX);
        assert_eq!(pool.remaining(), u32::MAX);
    }
}
