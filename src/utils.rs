//! 通用容器。

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// 轮转队列：`peek` 取出队首并立即放回队尾，因此连续调用会依次轮到每个元素。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct RepeatQueue<T> {
    items: VecDeque<T>,
}

impl<T> Default for RepeatQueue<T> {
    fn default() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }
}

impl<T: Clone + PartialEq> RepeatQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, item: T) {
        self.items.push_back(item);
    }

    /// 取出队首元素并重新放回队尾。
    pub fn peek(&mut self) -> Option<T> {
        let item = self.items.pop_front()?;
        self.items.push_back(item.clone());
        Some(item)
    }

    pub fn front(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn remove(&mut self, item: &T) -> bool {
        match self.items.iter().position(|candidate| candidate == item) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}
