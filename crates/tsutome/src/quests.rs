//! Per-player quest and training lists.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tsutome_protocol::{PlayerId, QuestId, Shuren, Tsutome};

#[derive(Default)]
struct Board {
    tsutomes: Vec<Tsutome>,
    shurens: Vec<Shuren>,
}

/// In-memory store of what each player is working on.
///
/// Ids are unique across both lists and all players.
#[derive(Default)]
pub struct QuestBoard {
    boards: RwLock<HashMap<PlayerId, Board>>,
    next_id: AtomicU64,
}

impl QuestBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gives `player_id` a new one-off quest.
    pub fn add_tsutome(&self, player_id: PlayerId, title: &str, monster: &str) -> Tsutome {
        let quest = Tsutome {
            id: self.next_id(),
            title: title.to_string(),
            monster: monster.to_string(),
            defeated: false,
        };
        self.boards
            .write()
            .entry(player_id)
            .or_default()
            .tsutomes
            .push(quest.clone());
        tracing::debug!(%player_id, id = %quest.id, "tsutome added");
        quest
    }

    /// Gives `player_id` a new training routine with no streak.
    pub fn add_shuren(&self, player_id: PlayerId, title: &str) -> Shuren {
        let routine = Shuren {
            id: self.next_id(),
            title: title.to_string(),
            streak: 0,
        };
        self.boards
            .write()
            .entry(player_id)
            .or_default()
            .shurens
            .push(routine.clone());
        tracing::debug!(%player_id, id = %routine.id, "shuren added");
        routine
    }

    pub fn tsutomes(&self, player_id: PlayerId) -> Vec<Tsutome> {
        self.boards
            .read()
            .get(&player_id)
            .map(|b| b.tsutomes.clone())
            .unwrap_or_default()
    }

    pub fn shurens(&self, player_id: PlayerId) -> Vec<Shuren> {
        self.boards
            .read()
            .get(&player_id)
            .map(|b| b.shurens.clone())
            .unwrap_or_default()
    }

    fn next_id(&self) -> QuestId {
        QuestId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }
}
