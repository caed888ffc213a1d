//! Fixed mapping of participants to their characters' display names.

use crate::PlayerId;

/// The campaign's fixed roster, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    entries: Vec<(PlayerId, String)>,
}

impl Roster {
    pub fn new<I, P, N>(entries: I) -> Self
    where
        I: IntoIterator<Item = (P, N)>,
        P: Into<PlayerId>,
        N: Into<String>,
    {
        let mut roster = Self {
            entries: Vec::new(),
        };
        for (id, name) in entries {
            roster.insert(id.into(), name.into());
        }
        roster
    }

    /// The Seattle campaign party.
    pub fn campaign() -> Self {
        Self::new([
            ("olympia", "Riley"),
            ("ryan", "Willy"),
            ("chris", "Red"),
            ("sophia", "Mars"),
            ("grant", "Tony"),
            ("claire", "JJ"),
        ])
    }

    /// Campaign roster plus a throwaway character for development.
    pub fn development() -> Self {
        let mut roster = Self::campaign();
        roster.insert(PlayerId::from("test"), "Jane Doe".to_string());
        roster
    }

    /// Later entries with the same id replace the earlier display name.
    fn insert(&mut self, id: PlayerId, name: String) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == id) {
            Some(entry) => entry.1 = name,
            None => self.entries.push((id, name)),
        }
    }

    pub fn contains(&self, id: &PlayerId) -> bool {
        self.entries.iter().any(|(existing, _)| existing == id)
    }

    pub fn display_name(&self, id: &PlayerId) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, name)| name.as_str())
    }

    pub fn ids(&self) -> impl Iterator<Item = &PlayerId> {
        self.entries.iter().map(|(id, _)| id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Card order: the pinned character first, everyone else by display name.
    pub fn display_order(&self, pinned: Option<&PlayerId>) -> Vec<PlayerId> {
        let mut entries: Vec<&(PlayerId, String)> = self.entries.iter().collect();
        entries.sort_by(|(a_id, a_name), (b_id, b_name)| {
            let a_pinned = Some(a_id) == pinned;
            let b_pinned = Some(b_id) == pinned;
            b_pinned
                .cmp(&a_pinned)
                .then_with(|| a_name.to_lowercase().cmp(&b_name.to_lowercase()))
        });
        entries.into_iter().map(|(id, _)| id.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn campaign_roster_has_six_characters() {
        let roster = Roster::campaign();
        assert_eq!(roster.len(), 6);
        assert_eq!(roster.display_name(&PlayerId::from("olympia")), Some("Riley"));
        assert!(!roster.contains(&PlayerId::from("test")));
    }

    #[test]
    fn development_roster_adds_test_character() {
        let roster = Roster::development();
        assert_eq!(roster.len(), 7);
        assert_eq!(roster.display_name(&PlayerId::from("test")), Some("Jane Doe"));
    }

    #[test]
    fn display_order_puts_pinned_first_then_sorts_by_name() {
        let roster = Roster::campaign();
        let pinned = PlayerId::from("ryan");
        let order: Vec<String> = roster
            .display_order(Some(&pinned))
            .iter()
            .map(|id| id.to_string())
            .collect();
        // Willy pinned; then JJ, Mars, Red, Riley, Tony
        assert_eq!(order, vec!["ryan", "claire", "sophia", "chris", "olympia", "grant"]);
    }

    #[test]
    fn display_order_without_pin_is_alphabetical_by_name() {
        let roster = Roster::new([("b", "Zed"), ("a", "amy")]);
        assert_eq!(
            roster.display_order(None),
            vec![PlayerId::from("a"), PlayerId::from("b")]
        );
    }
}
