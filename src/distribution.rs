use serde::{Deserialize, Serialize};

use crate::catalog::{CharacterCatalog, Team};

/// Per-team character counts for a game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Distribution {
    pub townsfolk: u32,
    pub outsiders: u32,
    pub minions: u32,
    pub demons: u32,
}

impl Distribution {
    pub const fn new(townsfolk: u32, outsiders: u32, minions: u32, demons: u32) -> Self {
        Distribution {
            townsfolk,
            outsiders,
            minions,
            demons,
        }
    }

    pub fn total(&self) -> u32 {
        self.townsfolk + self.outsiders + self.minions + self.demons
    }

    pub fn get(&self, team: Team) -> u32 {
        match team {
            Team::Townsfolk => self.townsfolk,
            Team::Outsider => self.outsiders,
            Team::Minion => self.minions,
            Team::Demon => self.demons,
        }
    }

    pub fn set(&mut self, team: Team, count: u32) {
        match team {
            Team::Townsfolk => self.townsfolk = count,
            Team::Outsider => self.outsiders = count,
            Team::Minion => self.minions = count,
            Team::Demon => self.demons = count,
        }
    }

    // Standard distribution for N players, before any script override or
    // count-adjusting modifier.
    pub fn base_setup(player_count: u32) -> Self {
        match player_count {
            // NOTE: 5 and 6 share a row, so a 5-player game is one over.
            5..=6 => Distribution::new(3, 1, 1, 1),
            p @ 7..=9 => Distribution::new(p - 3, 0, 2, 1),
            p @ 10..=12 => Distribution::new(p - 4, 1, 2, 1),
            p @ 13..=15 => Distribution::new(p - 5, 2, 2, 1),
            p => {
                let p = i64::from(p);
                Distribution::new(
                    (p - 3).max(2) as u32,
                    (p - 6).clamp(0, 2) as u32,
                    (p / 4).clamp(1, 2) as u32,
                    1,
                )
            }
        }
    }

    /// Count selected ids per team. Ids the catalog does not know are skipped.
    pub fn tally<'a, I>(catalog: &CharacterCatalog, ids: I) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut counts = Distribution::default();
        for id in ids {
            if let Some(team) = catalog.team_of(id) {
                counts.set(team, counts.get(team) + 1);
            }
        }
        counts
    }

    /// Shift each team by its delta, saturating at zero.
    pub fn adjusted(&self, delta: &CountDelta) -> Self {
        let mut adjusted = *self;
        for team in Team::ALL {
            let shifted = i64::from(self.get(team)) + i64::from(delta.get(team));
            adjusted.set(team, shifted.max(0) as u32);
        }
        adjusted
    }
}

impl std::fmt::Display for Distribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}T/{}O/{}M/{}D",
            self.townsfolk, self.outsiders, self.minions, self.demons
        )
    }
}

/// Signed per-team adjustment carried by an `adjustCounts` rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountDelta {
    pub townsfolk: i32,
    pub outsiders: i32,
    pub minions: i32,
    pub demons: i32,
}

impl CountDelta {
    pub fn get(&self, team: Team) -> i32 {
        match team {
            Team::Townsfolk => self.townsfolk,
            Team::Outsider => self.outsiders,
            Team::Minion => self.minions,
            Team::Demon => self.demons,
        }
    }

    pub fn is_zero(&self) -> bool {
        Team::ALL.iter().all(|team| self.get(*team) == 0)
    }

    pub fn add(&mut self, other: &CountDelta) {
        self.townsfolk += other.townsfolk;
        self.outsiders += other.outsiders;
        self.minions += other.minions;
        self.demons += other.demons;
    }
}

impl std::fmt::Display for CountDelta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = Team::ALL
            .iter()
            .filter(|team| self.get(**team) != 0)
            .map(|team| format!("{:+} {}", self.get(*team), team.label()))
            .collect();
        if parts.is_empty() {
            write!(f, "no change")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}
