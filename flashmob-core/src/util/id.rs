use std::fmt::Display;

/// The kinds of human-readable ids handed out from a per-year sequence.
///
/// An id is the prefix, the year the record was created in, and the sequence value
/// padded with zeroes, e.g. `S20260042` or `JR202600007`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sequence {
    Session,
    JoinRequest,
    Message,
}

impl Sequence {
    pub const ALL: [Sequence; 3] = [Self::Session, Self::JoinRequest, Self::Message];

    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Session => "S",
            Self::JoinRequest => "JR",
            Self::Message => "M",
        }
    }

    /// The key this sequence is stored under
    pub fn key(&self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::JoinRequest => "join_request",
            Self::Message => "message",
        }
    }

    fn width(&self) -> usize {
        match self {
            Self::Session => 4,
            Self::JoinRequest => 5,
            Self::Message => 6,
        }
    }

    /// Formats the `value`th id of `year`.
    pub fn format(&self, year: i32, value: i32) -> String {
        format!(
            "{}{}{:0width$}",
            self.prefix(),
            year,
            value,
            width = self.width()
        )
    }
}

impl Display for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}
