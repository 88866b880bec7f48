// Built-in character data and scripts, available without a data directory.

use crate::catalog::{Character, Team};
use crate::distribution::CountDelta;
use crate::script::{ModifierRule, Script};

macro_rules! define_characters {
    (
        $(
            $id:literal: $name:literal => {
                team: $team:ident,
                ability: $ability:literal
            }
        ),* $(,)?
    ) => {
        pub fn characters() -> Vec<Character> {
            vec![
                $(Character {
                    id: $id.to_string(),
                    team: Team::$team,
                    name: Some($name.to_string()),
                    ability: Some($ability.to_string()),
                },)*
            ]
        }
    };
}

// Trouble Brewing
define_characters! {
    // Townsfolk
    "washerwoman": "Washerwoman" => {
        team: Townsfolk,
        ability: "You start knowing that 1 of 2 players is a particular Townsfolk."
    },
    "librarian": "Librarian" => {
        team: Townsfolk,
        ability: "You start knowing that 1 of 2 players is a particular Outsider, or that zero Outsiders are in play."
    },
    "investigator": "Investigator" => {
        team: Townsfolk,
        ability: "You start knowing that 1 of 2 players is a particular Minion."
    },
    "chef": "Chef" => {
        team: Townsfolk,
        ability: "You start knowing how many pairs of evil players there are."
    },
    "empath": "Empath" => {
        team: Townsfolk,
        ability: "Each night, you learn how many of your 2 alive neighbours are evil."
    },
    "fortune_teller": "Fortune Teller" => {
        team: Townsfolk,
        ability: "Each night, choose 2 players: you learn if either is a Demon. There is a good player that registers as a Demon to you."
    },
    "undertaker": "Undertaker" => {
        team: Townsfolk,
        ability: "Each night*, you learn which character died by execution today."
    },
    "monk": "Monk" => {
        team: Townsfolk,
        ability: "Each night*, choose a player (not yourself): they are safe from the Demon tonight."
    },
    "ravenkeeper": "Ravenkeeper" => {
        team: Townsfolk,
        ability: "If you die at night, you are woken to choose a player: you learn their character."
    },
    "virgin": "Virgin" => {
        team: Townsfolk,
        ability: "The 1st time you are nominated, if the nominator is a Townsfolk, they are executed immediately."
    },
    "slayer": "Slayer" => {
        team: Townsfolk,
        ability: "Once per game, during the day, publicly choose a player: if they are the Demon, they die."
    },
    "soldier": "Soldier" => {
        team: Townsfolk,
        ability: "You are safe from the Demon."
    },
    "mayor": "Mayor" => {
        team: Townsfolk,
        ability: "If only 3 players live & no execution occurs, your team wins. If you die at night, another player might die instead."
    },

    // Outsiders
    "butler": "Butler" => {
        team: Outsider,
        ability: "Each night, choose a player (not yourself): tomorrow, you may only vote if they are voting too."
    },
    "drunk": "Drunk" => {
        team: Outsider,
        ability: "You do not know you are the Drunk. You think you are a Townsfolk character, but you are not."
    },
    "recluse": "Recluse" => {
        team: Outsider,
        ability: "You might register as evil & as a Minion or Demon, even if dead."
    },
    "saint": "Saint" => {
        team: Outsider,
        ability: "If you die by execution, your team loses."
    },

    // Minions
    "poisoner": "Poisoner" => {
        team: Minion,
        ability: "Each night, choose a player: they are poisoned tonight and tomorrow day."
    },
    "spy": "Spy" => {
        team: Minion,
        ability: "Each night, you see the Grimoire. You might register as good & as a Townsfolk or Outsider, even if dead."
    },
    "scarlet_woman": "Scarlet Woman" => {
        team: Minion,
        ability: "If there are 5 or more players alive & the Demon dies, you become the Demon."
    },
    "baron": "Baron" => {
        team: Minion,
        ability: "There are extra Outsiders in play. [+2 Outsiders]"
    },

    // Demon
    "imp": "Imp" => {
        team: Demon,
        ability: "Each night*, choose a player: they die. If you kill yourself this way, a Minion becomes the Imp."
    },
}

pub fn trouble_brewing() -> Script {
    Script {
        id: "trouble_brewing".to_string(),
        name: Some("Trouble Brewing".to_string()),
        character_pool: characters().into_iter().map(|c| c.id).collect(),
        composition: None,
        modifiers: vec![ModifierRule::AdjustCounts {
            when_character: "baron".to_string(),
            delta: CountDelta {
                townsfolk: -2,
                outsiders: 2,
                ..CountDelta::default()
            },
        }],
    }
}

pub fn scripts() -> Vec<Script> {
    vec![trouble_brewing()]
}
