//! Dragon reply lines picked from small pools by mood, hunger and affection.

use rand::seq::SliceRandom;
use rand::Rng;

pub const HUNGRY_BELOW: u32 = 30;
pub const HIGH_MOOD_AT: u32 = 70;
pub const HIGH_AFFECTION_AT: i32 = 50;
pub const LOW_AFFECTION_AT: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlavorAction {
    Feed,
    Play,
    Rest,
    Greet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Hungry,
    HighMood,
    LowMood,
    HighAffection,
    LowAffection,
    Neutral,
}

pub fn bucket(action: FlavorAction, mood: u32, hunger: u32, affection: i32) -> Bucket {
    match action {
        FlavorAction::Feed => {
            if hunger < HUNGRY_BELOW {
                Bucket::Hungry
            } else if mood >= HIGH_MOOD_AT {
                Bucket::HighMood
            } else {
                Bucket::LowMood
            }
        }
        FlavorAction::Play | FlavorAction::Greet => {
            if affection >= HIGH_AFFECTION_AT {
                Bucket::HighAffection
            } else if affection <= LOW_AFFECTION_AT {
                Bucket::LowAffection
            } else {
                Bucket::Neutral
            }
        }
        FlavorAction::Rest => Bucket::Neutral,
    }
}

pub(crate) fn pool(action: FlavorAction, bucket: Bucket) -> &'static [&'static str] {
    match (action, bucket) {
        (FlavorAction::Feed, Bucket::Hungry) => &[
            "Food! I have been waiting for this!",
            "Finally! I thought everyone forgot about me...",
            "Thank you, I feel much better now!",
        ],
        (FlavorAction::Feed, Bucket::HighMood) => &[
            "Mmm, delicious! Thanks, friend!",
            "Exactly what I needed!",
            "You know how to make me happy!",
            "This makes me stronger!",
        ],
        (FlavorAction::Feed, _) => &[
            "Grr... about time!",
            "Would have been nicer earlier...",
            "Next time don't make me wait!",
        ],
        (_, Bucket::HighAffection) => &[
            "My favourite friend is here!",
            "You're back! I missed you!",
            "Let's do that again!",
        ],
        (_, Bucket::LowAffection) => &[
            "Hm, and who might you be?",
            "Oh. It's you again...",
            "What do you want?",
        ],
        (FlavorAction::Rest, _) => &[
            "Zzz...",
            "*curls up by the fire*",
            "*snores softly*",
        ],
        _ => &["Hello there!", "Good day!", "*tilts head curiously*"],
    }
}

/// Pick a reply for `action` given the dragon's state and the player's affection.
pub fn response<R: Rng + ?Sized>(
    action: FlavorAction,
    mood: u32,
    hunger: u32,
    affection: i32,
    rng: &mut R,
) -> &'static str {
    let lines = pool(action, bucket(action, mood, hunger, affection));
    lines.choose(rng).copied().unwrap_or("...")
}

/// Mood indicator used by status output.
pub fn mood_word(mood: u32) -> &'static str {
    match mood {
        80.. => "elated",
        60..=79 => "happy",
        40..=59 => "calm",
        20..=39 => "sad",
        _ => "miserable",
    }
}
