use rand::seq::SliceRandom;
use rand::thread_rng;

// Prompts are deliberately not deconflicted between journeys of one game;
// two chains starting from the same phrase diverge in funny ways.
pub const WORD_LIST: &[&str] = &[
    "Raining Cats and Dogs",
    "Couch Potato",
    "Piece of Cake",
    "Break the Ice",
    "Big Fish in a Small Pond",
    "Elephant in the Room",
    "Night Owl",
    "Bull in a China Shop",
    "Walking on Sunshine",
    "Storm in a Teacup",
    "Wild Goose Chase",
    "Once in a Blue Moon",
];

/// Pick a starting prompt for a journey.
pub fn pick_prompt() -> &'static str {
    WORD_LIST
        .choose(&mut thread_rng())
        .copied()
        .unwrap_or("Couch Potato")
}
