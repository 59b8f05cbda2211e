use uuid::Uuid;

/// One contribution to a journey: either a text prompt/guess or an encoded
/// drawing. Round parity decides which variant a journey expects next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GamePlay {
    Word {
        word: String,
        /// `None` for the generated seed prompt.
        author: Option<Uuid>,
    },
    Drawing {
        drawing: String,
        author: Uuid,
    },
}

impl GamePlay {
    /// The opaque textual payload of this play.
    pub fn payload(&self) -> &str {
        match self {
            GamePlay::Word { word, .. } => word,
            GamePlay::Drawing { drawing, .. } => drawing,
        }
    }

    /// The contributing player, if any.
    pub fn author(&self) -> Option<Uuid> {
        match self {
            GamePlay::Word { author, .. } => *author,
            GamePlay::Drawing { author, .. } => Some(*author),
        }
    }
}

/// One relay chain of alternating drawings and guesses.
///
/// `order[i]` is the player expected to contribute the play for round `i`;
/// `plays[0]` is the seed prompt, so after round `r` completes the journey
/// holds `r + 2` plays.
#[derive(Debug, Clone)]
pub struct WordJourney {
    pub order: Vec<Uuid>,
    pub plays: Vec<GamePlay>,
}

impl WordJourney {
    /// Seed a journey with its rotation and a generated starting prompt.
    pub fn new(order: Vec<Uuid>, seed_word: String) -> Self {
        Self {
            order,
            plays: vec![GamePlay::Word {
                word: seed_word,
                author: None,
            }],
        }
    }

    /// The player expected to act in the given round.
    pub fn contributor_at(&self, round: usize) -> Option<Uuid> {
        self.order.get(round).copied()
    }

    /// Whether this journey already received its play for the given round.
    pub fn has_play_for(&self, round: usize) -> bool {
        self.plays.len() > round + 1
    }

    /// The most recent play. A journey is never empty by construction.
    pub fn latest(&self) -> Option<&GamePlay> {
        self.plays.last()
    }
}

/// A cyclic rotation of the join order starting at `offset`. Journey `k`
/// uses offset `k`, so every player contributes to every journey exactly
/// once over a full cycle.
pub fn rotation(player_ids: &[Uuid], offset: usize) -> Vec<Uuid> {
    (0..player_ids.len())
        .map(|i| player_ids[(i + offset) % player_ids.len()])
        .collect()
}
