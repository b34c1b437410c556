pub const SEATS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Seat {
    Red,
    Green,
    Yellow,
    Blue,
}

impl Seat {
    pub const ALL: [Seat; SEATS] = [Seat::Red, Seat::Green, Seat::Yellow, Seat::Blue];

    /// Seat from its turn-order index (0 = Red).
    pub fn from_index(index: usize) -> Option<Seat> {
        Self::ALL.get(index).copied()
    }

    /// Position in turn order
    pub fn index(self) -> usize {
        match self {
            Seat::Red => 0,
            Seat::Green => 1,
            Seat::Yellow => 2,
            Seat::Blue => 3,
        }
    }

    /// The seat that plays after this one
    pub fn next(self) -> Seat {
        Self::ALL[(self.index() + 1) % SEATS]
    }

    /// Get seat name for display
    pub fn name(self) -> &'static str {
        match self {
            Seat::Red => "Red",
            Seat::Green => "Green",
            Seat::Yellow => "Yellow",
            Seat::Blue => "Blue",
        }
    }

    /// Parse a seat from its display name, case-insensitive.
    pub fn from_name(name: &str) -> Option<Seat> {
        Self::ALL
            .iter()
            .copied()
            .find(|seat| seat.name().eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_seat_cycles() {
        assert_eq!(Seat::Red.next(), Seat::Green);
        assert_eq!(Seat::Green.next(), Seat::Yellow);
        assert_eq!(Seat::Yellow.next(), Seat::Blue);
        assert_eq!(Seat::Blue.next(), Seat::Red);
    }

    #[test]
    fn test_index_roundtrip() {
        for seat in Seat::ALL {
            assert_eq!(Seat::from_index(seat.index()), Some(seat));
        }
        assert_eq!(Seat::from_index(4), None);
    }

    #[test]
    fn test_seat_name() {
        assert_eq!(Seat::Red.name(), "Red");
        assert_eq!(Seat::from_name("yellow"), Some(Seat::Yellow));
        assert_eq!(Seat::from_name("purple"), None);
    }
}
