//! Player colours and the per-game colour pool.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// The colour a registered player is identified by.
///
/// The first registrant of a game always receives [`Colour::Black`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Colour {
    Black,
    Blue,
    Green,
    Red,
    White,
    Yellow,
}

impl Colour {
    /// Every colour, in allocation order.
    pub const ALL: [Colour; 6] = [
        Colour::Black,
        Colour::Blue,
        Colour::Green,
        Colour::Red,
        Colour::White,
        Colour::Yellow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Colour::Black => "Black",
            Colour::Blue => "Blue",
            Colour::Green => "Green",
            Colour::Red => "Red",
            Colour::White => "White",
            Colour::Yellow => "Yellow",
        }
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered pool of colours still available in the current game.
///
/// Colours are handed out front-to-back and never returned, so each colour
/// belongs to at most one player per game.
#[derive(Debug, Clone)]
pub struct ColourPool {
    remaining: VecDeque<Colour>,
}

impl ColourPool {
    pub fn new() -> Self {
        Self {
            remaining: Colour::ALL.into_iter().collect(),
        }
    }

    /// Removes and returns the next colour, or `None` once the pool is empty.
    pub fn allocate(&mut self) -> Option<Colour> {
        self.remaining.pop_front()
    }

    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }
}

impl Default for ColourPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_order() {
        let mut pool = ColourPool::new();
        let allocated: Vec<&str> = std::iter::from_fn(|| pool.allocate())
            .map(|c| c.as_str())
            .collect();

        assert_eq!(
            allocated,
            vec!["Black", "Blue", "Green", "Red", "White", "Yellow"]
        );
        assert_eq!(pool.remaining(), 0);
    }

    #[test]
    fn test_pool_is_not_replenished() {
        let mut pool = ColourPool::new();
        for _ in 0..6 {
            assert!(pool.allocate().is_some());
        }

        assert_eq!(pool.allocate(), None);
        assert_eq!(pool.allocate(), None);
        assert_eq!(pool.remaining(), 0);
    }

    #[test]
    fn test_colour_serializes_as_name() {
        let json = serde_json::to_string(&Colour::Yellow).unwrap();
        assert_eq!(json, "\"Yellow\"");
        assert_eq!(Colour::Red.to_string(), "Red");
    }
}
