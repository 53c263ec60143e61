//! Identity matching across backend event lists.
//!
//! Two events are "the same" if both carry the same id, or if their title,
//! start and end are all equal. The two tests are OR'd, not ranked: the first
//! candidate satisfying either one wins, in the order the backend returned
//! them. Events can be edited by the user in the backend's own UI, which is
//! why the id is checked in addition to the structural fields.

use crate::event::EventModel;

/// Whether `candidate` refers to the same event as `target`.
pub fn is_same_event(target: &EventModel, candidate: &EventModel) -> bool {
    let same_id = matches!(
        (&target.id, &candidate.id),
        (Some(a), Some(b)) if a == b
    );

    same_id
        || (candidate.title == target.title
            && candidate.start == target.start
            && candidate.end == target.end)
}

/// First candidate matching `target`, in candidate order.
///
/// `None` means "not found"; callers decide whether that is an error.
pub fn find_match<'a, I>(target: &EventModel, candidates: I) -> Option<&'a EventModel>
where
    I: IntoIterator<Item = &'a EventModel>,
{
    candidates
        .into_iter()
        .find(|candidate| is_same_event(target, candidate))
}

/// Index of the first candidate matching `target`.
pub fn position_of_match<'a, I>(target: &EventModel, candidates: I) -> Option<usize>
where
    I: IntoIterator<Item = &'a EventModel>,
{
    candidates
        .into_iter()
        .position(|candidate| is_same_event(target, candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, hour, minute, 0).unwrap()
    }

    fn event(id: Option<&str>, title: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> EventModel {
        let mut event = EventModel::new(start, end, title);
        event.id = id.map(str::to_string);
        event
    }

    #[test]
    fn test_matches_by_id_even_when_fields_differ() {
        let target = event(Some("e1"), "Standup", at(9, 0), at(9, 30));
        let candidates = vec![
            event(Some("e0"), "Lunch", at(12, 0), at(13, 0)),
            event(Some("e1"), "Standup (moved)", at(10, 0), at(10, 30)),
        ];

        let found = find_match(&target, &candidates).unwrap();
        assert_eq!(found.id.as_deref(), Some("e1"));
    }

    #[test]
    fn test_matches_structurally_when_id_unknown() {
        let target = event(Some("unknown"), "Standup", at(9, 0), at(9, 30));
        let candidates = vec![event(Some("stored-1"), "Standup", at(9, 0), at(9, 30))];

        let found = find_match(&target, &candidates).unwrap();
        assert_eq!(found.id.as_deref(), Some("stored-1"));
    }

    #[test]
    fn test_first_match_in_order_wins_over_later_id_match() {
        let target = event(Some("e2"), "Standup", at(9, 0), at(9, 30));
        let candidates = vec![
            event(Some("e1"), "Standup", at(9, 0), at(9, 30)),
            event(Some("e2"), "Renamed", at(9, 0), at(9, 30)),
        ];

        let found = find_match(&target, &candidates).unwrap();
        assert_eq!(found.id.as_deref(), Some("e1"));
        assert_eq!(position_of_match(&target, &candidates), Some(0));
    }

    #[test]
    fn test_absent_ids_never_match_each_other() {
        let target = event(None, "Standup", at(9, 0), at(9, 30));
        let candidates = vec![event(None, "Retro", at(9, 0), at(9, 30))];

        assert!(find_match(&target, &candidates).is_none());
    }

    #[test]
    fn test_no_match_returns_none() {
        let target = event(Some("e9"), "Standup", at(9, 0), at(9, 30));
        let candidates = vec![
            event(Some("e1"), "Standup", at(9, 0), at(9, 45)),
            event(Some("e2"), "Standup", at(8, 0), at(9, 30)),
        ];

        assert!(find_match(&target, &candidates).is_none());
        assert!(find_match(&target, &Vec::new()).is_none());
    }
}
