//! Discussion-context condensation (SPEC_FULL §4.10). Grounded on
//! `original_source/lit_platform/context.py`'s `condense_discussion_context`:
//! keeps only well-formed `{role, content}` turns and truncates to the most
//! recent `max_turns`.

use lc_domain::finding::DiscussionTurn;

const MAX_TURNS: usize = 8;

/// Drops turns with empty content (the only way a stored [`DiscussionTurn`]
/// can be "malformed" — the type itself already requires `role`/`content`)
/// and keeps the last `MAX_TURNS`.
pub fn condense_discussion_context(turns: &[DiscussionTurn]) -> Vec<DiscussionTurn> {
    let well_formed: Vec<_> = turns.iter().filter(|t| !t.content.trim().is_empty()).cloned().collect();
    let start = well_formed.len().saturating_sub(MAX_TURNS);
    well_formed[start..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lc_domain::finding::DiscussionRole;

    fn turn(role: DiscussionRole, content: &str) -> DiscussionTurn {
        DiscussionTurn { role, content: content.to_string() }
    }

    #[test]
    fn keeps_only_last_eight_turns() {
        let turns: Vec<_> =
            (0..20).map(|i| turn(DiscussionRole::User, &format!("turn {i}"))).collect();
        let condensed = condense_discussion_context(&turns);
        assert_eq!(condensed.len(), 8);
        assert_eq!(condensed.first().unwrap().content, "turn 12");
        assert_eq!(condensed.last().unwrap().content, "turn 19");
    }

    #[test]
    fn drops_blank_turns() {
        let turns = vec![turn(DiscussionRole::User, "  "), turn(DiscussionRole::Assistant, "real reply")];
        let condensed = condense_discussion_context(&turns);
        assert_eq!(condensed.len(), 1);
        assert_eq!(condensed[0].content, "real reply");
    }

    #[test]
    fn fewer_than_max_turns_passes_through_unchanged() {
        let turns = vec![turn(DiscussionRole::User, "hi"), turn(DiscussionRole::Assistant, "hello")];
        let condensed = condense_discussion_context(&turns);
        assert_eq!(condensed.len(), 2);
    }
}
