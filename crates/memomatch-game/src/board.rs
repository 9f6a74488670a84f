//! Board types: card faces, difficulty levels, and board construction.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::GameError;

// ---------------------------------------------------------------------------
// CardFace
// ---------------------------------------------------------------------------

/// The value printed on a card. Two cards match when their faces are equal.
///
/// Faces are numbered from 1. The browser client shows face `n` as the
/// image `n.jpg`, see [`CardFace::image_name`].
///
/// `#[serde(transparent)]` keeps the wire form a plain number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct CardFace(pub u16);

impl CardFace {
    /// File name of the image shown for this face.
    pub fn image_name(self) -> String {
        format!("{}.jpg", self.0)
    }
}

impl fmt::Display for CardFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Difficulty
// ---------------------------------------------------------------------------

/// How many pairs a round is played with.
///
/// Serialized in lowercase (`"easy"`, `"normal"`), which is also the form
/// stored in the leaderboard table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Normal,
}

impl Difficulty {
    /// Number of distinct faces on a board of this difficulty.
    pub fn pair_count(self) -> usize {
        match self {
            Self::Easy => 6,
            Self::Normal => 10,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Normal => "normal",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses `"easy"` or `"normal"`. Anything else is rejected: there is no
/// silent fallback to a default difficulty.
impl FromStr for Difficulty {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Self::Easy),
            "normal" => Ok(Self::Normal),
            other => Err(GameError::InvalidDifficulty(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Board construction
// ---------------------------------------------------------------------------

/// Builds a shuffled board with `pair_count` distinct faces, each twice.
///
/// Faces `1..=pair_count` are laid out twice in a row and then shuffled
/// with `SliceRandom::shuffle`, which is a Fisher-Yates shuffle: every
/// arrangement is equally likely.
///
/// # Errors
/// [`GameError::InvalidBoard`] if `pair_count` is zero or more faces than
/// a [`CardFace`] can number.
pub fn shuffled_board<R: Rng + ?Sized>(
    pair_count: usize,
    rng: &mut R,
) -> Result<Vec<CardFace>, GameError> {
    let last = u16::try_from(pair_count)
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| GameError::InvalidBoard(format!("cannot deal {pair_count} pairs")))?;
    let faces = (1..=last).map(CardFace);
    let mut board: Vec<CardFace> = faces.clone().chain(faces).collect();
    board.shuffle(rng);
    Ok(board)
}

/// Checks that `board` is a playable layout: non-empty, and every face
/// occurs exactly twice. Returns the pair-count.
pub fn validate_layout(board: &[CardFace]) -> Result<usize, GameError> {
    if board.is_empty() {
        return Err(GameError::InvalidBoard("board is empty".into()));
    }
    if board.len() % 2 != 0 {
        return Err(GameError::InvalidBoard(format!(
            "board has an odd number of cards ({})",
            board.len()
        )));
    }

    let mut counts: HashMap<CardFace, usize> = HashMap::new();
    for face in board {
        *counts.entry(*face).or_default() += 1;
    }
    if let Some((face, count)) = counts.iter().find(|(_, c)| **c != 2) {
        return Err(GameError::InvalidBoard(format!(
            "face {face} appears {count} times, expected 2"
        )));
    }

    Ok(board.len() / 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn face_counts(board: &[CardFace]) -> HashMap<CardFace, usize> {
        let mut counts = HashMap::new();
        for face in board {
            *counts.entry(*face).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn test_difficulty_pair_count() {
        assert_eq!(Difficulty::Easy.pair_count(), 6);
        assert_eq!(Difficulty::Normal.pair_count(), 10);
    }

    #[test]
    fn test_difficulty_from_str_accepts_known_levels() {
        assert_eq!("easy".parse::<Difficulty>(), Ok(Difficulty::Easy));
        assert_eq!("normal".parse::<Difficulty>(), Ok(Difficulty::Normal));
    }

    #[test]
    fn test_difficulty_from_str_rejects_unknown_level() {
        let err = "hard".parse::<Difficulty>().unwrap_err();
        assert_eq!(err, GameError::InvalidDifficulty("hard".into()));
        // Case matters: the table stores lowercase values.
        assert!("Easy".parse::<Difficulty>().is_err());
    }

    #[test]
    fn test_difficulty_serializes_lowercase() {
        let json = serde_json::to_string(&Difficulty::Normal).unwrap();
        assert_eq!(json, "\"normal\"");
        let parsed: Difficulty = serde_json::from_str("\"easy\"").unwrap();
        assert_eq!(parsed, Difficulty::Easy);
    }

    #[test]
    fn test_card_face_image_name() {
        assert_eq!(CardFace(3).image_name(), "3.jpg");
        assert_eq!(serde_json::to_string(&CardFace(7)).unwrap(), "7");
    }

    #[test]
    fn test_shuffled_board_every_face_twice() {
        let mut rng = StdRng::seed_from_u64(7);
        for difficulty in [Difficulty::Easy, Difficulty::Normal] {
            let pairs = difficulty.pair_count();
            let board = shuffled_board(pairs, &mut rng).unwrap();

            assert_eq!(board.len(), pairs * 2);
            let counts = face_counts(&board);
            assert_eq!(counts.len(), pairs);
            assert!(counts.values().all(|c| *c == 2), "{counts:?}");
        }
    }

    #[test]
    fn test_shuffled_board_orderings_vary() {
        let mut rng = StdRng::seed_from_u64(42);
        let first = shuffled_board(10, &mut rng).unwrap();
        let differs = (0..20).any(|_| shuffled_board(10, &mut rng).unwrap() != first);
        assert!(differs, "20 shuffles all produced the same order");
    }

    #[test]
    fn test_shuffled_board_no_positional_bias() {
        // Count how often face 1 lands in position 0 over many shuffles of
        // a 6-pair board. Expected frequency is 2/12; allow generous noise.
        let mut rng = StdRng::seed_from_u64(1234);
        let trials = 12_000;
        let hits = (0..trials)
            .filter(|_| shuffled_board(6, &mut rng).unwrap()[0] == CardFace(1))
            .count();
        let expected = trials / 6;
        let tolerance = expected / 5;
        assert!(
            hits.abs_diff(expected) < tolerance,
            "face 1 at position 0: {hits} times, expected ~{expected}"
        );
    }

    #[test]
    fn test_shuffled_board_out_of_range_pair_count_returns_error() {
        let mut rng = StdRng::seed_from_u64(5);
        assert!(matches!(
            shuffled_board(0, &mut rng),
            Err(GameError::InvalidBoard(_))
        ));
        assert!(matches!(
            shuffled_board(usize::from(u16::MAX) + 1, &mut rng),
            Err(GameError::InvalidBoard(_))
        ));
    }

    #[test]
    fn test_shuffled_board_largest_pair_count_has_distinct_faces() {
        let mut rng = StdRng::seed_from_u64(6);
        let board = shuffled_board(usize::from(u16::MAX), &mut rng).unwrap();
        let counts = face_counts(&board);
        assert_eq!(counts.len(), usize::from(u16::MAX));
        assert!(counts.values().all(|c| *c == 2));
    }

    #[test]
    fn test_validate_layout_accepts_pairs() {
        let board = [CardFace(1), CardFace(2), CardFace(1), CardFace(2)];
        assert_eq!(validate_layout(&board), Ok(2));
    }

    #[test]
    fn test_validate_layout_rejects_empty_and_odd() {
        assert!(matches!(validate_layout(&[]), Err(GameError::InvalidBoard(_))));
        let odd = [CardFace(1), CardFace(1), CardFace(2)];
        assert!(matches!(validate_layout(&odd), Err(GameError::InvalidBoard(_))));
    }

    #[test]
    fn test_validate_layout_rejects_triple() {
        let board = [CardFace(1), CardFace(1), CardFace(1), CardFace(2)];
        let err = validate_layout(&board).unwrap_err();
        assert!(err.to_string().contains("expected 2"));
    }
}
