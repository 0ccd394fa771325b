use std::fmt::{Debug, Display};

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Flag {
    Draft,
    Flagged,
    Answered,
    Seen,
    Deleted,
    Recent,
}

impl Display for Flag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Flag::Seen => write!(f, r"\Seen"),
            Flag::Answered => write!(f, r"\Answered"),
            Flag::Flagged => write!(f, r"\Flagged"),
            Flag::Deleted => write!(f, r"\Deleted"),
            Flag::Draft => write!(f, r"\Draft"),
            Flag::Recent => write!(f, r"\Recent"),
        }
    }
}

/// Flags of one message, kept sorted.
///
/// Servers report flags in arbitrary order and keywords are free-form, so the
/// list stores raw flag names and sorts them on construction. Two lists are
/// equal exactly when they hold the same flags.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct FlagList(Vec<String>);

impl FlagList {
    pub fn new<I, S>(flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut flags: Vec<String> = flags.into_iter().map(Into::into).collect();
        flags.sort_unstable();
        Self(flags)
    }

    pub fn contains(&self, flag: Flag) -> bool {
        let flag = flag.to_string();
        self.0.binary_search(&flag).is_ok()
    }

    pub fn is_seen(&self) -> bool {
        self.contains(Flag::Seen)
    }

    /// Drops `\Recent`, which is session state on the server and never kept
    /// locally.
    pub fn remove_recent(&mut self) {
        let recent = Flag::Recent.to_string();
        self.0.retain(|flag| *flag != recent);
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for FlagList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(" "))
    }
}

impl From<Vec<String>> for FlagList {
    fn from(value: Vec<String>) -> Self {
        Self::new(value)
    }
}

impl From<FlagList> for Vec<String> {
    fn from(value: FlagList) -> Self {
        value.0
    }
}

/// Change of the folder's unread counter when a message goes from `cached` to
/// `incoming` flags.
pub fn unread_delta(cached: &FlagList, incoming: &FlagList) -> i64 {
    match (cached.is_seen(), incoming.is_seen()) {
        (true, false) => 1,
        (false, true) => -1,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use rstest::*;

    use super::*;

    #[rstest]
    #[case(Flag::Seen, r"\Seen")]
    #[case(Flag::Answered, r"\Answered")]
    #[case(Flag::Flagged, r"\Flagged")]
    #[case(Flag::Deleted, r"\Deleted")]
    #[case(Flag::Draft, r"\Draft")]
    #[case(Flag::Recent, r"\Recent")]
    fn test_flag_displays_as_system_flag(#[case] flag: Flag, #[case] raw: &str) {
        assert_eq!(flag.to_string(), raw);
        assert!(FlagList::new([raw]).contains(flag));
    }

    #[rstest]
    fn test_flag_list_equality_ignores_order() {
        let cached = FlagList::new([r"\Seen", r"\Flagged"]);
        let incoming = FlagList::new([r"\Flagged", r"\Seen"]);

        assert_eq!(cached, incoming);
    }

    #[rstest]
    fn test_flag_list_keeps_keywords() {
        let flags = FlagList::new(["$Forwarded", r"\Seen"]);

        assert_eq!(flags.len(), 2);
        assert!(flags.is_seen());
        assert_contains!(flags.to_string(), "$Forwarded");
    }

    #[rstest]
    fn test_flag_list_remove_recent_keeps_other_flags() {
        let mut flags = FlagList::new([r"\Recent", r"\Seen"]);
        flags.remove_recent();

        assert_eq!(flags, FlagList::new([r"\Seen"]));
        assert!(!flags.contains(Flag::Recent));
    }

    #[rstest]
    #[case(&[r"\Seen"], &[], 1)]
    #[case(&[], &[r"\Seen"], -1)]
    #[case(&[], &[r"\Flagged"], 0)]
    #[case(&[r"\Seen"], &[r"\Seen", r"\Answered"], 0)]
    fn test_unread_delta_follows_seen_transitions(
        #[case] cached: &[&str],
        #[case] incoming: &[&str],
        #[case] expected: i64,
    ) {
        let cached = FlagList::new(cached.iter().copied());
        let incoming = FlagList::new(incoming.iter().copied());

        assert_eq!(unread_delta(&cached, &incoming), expected);
    }
}
