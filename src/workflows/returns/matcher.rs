use super::roster::{RosterIndex, RosterRecord};
use std::collections::HashSet;

/// Outcome of the pure surname lookup for one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult<'a> {
    /// Exactly one roster record carries this surname.
    Resolved(&'a RosterRecord),
    /// Two or more candidates; an explicit choice is required before any of
    /// them may be used.
    Ambiguous(Vec<&'a RosterRecord>),
    /// No roster record carries this surname.
    Unknown,
}

/// Terminal result of resolving one token, after any disambiguation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenResolution<'a> {
    Matched(&'a RosterRecord),
    Unknown,
}

/// Commits to one of N presented options.
///
/// Keeps the blocking human interaction out of the matching logic: the
/// console implements this for interactive runs, tests script it.
pub trait ChoicePicker {
    /// `options` are the candidates' firstnames in roster order. The returned
    /// index must lie in `[0, options.len())`; the matcher validates it again.
    fn pick(&mut self, surname: &str, options: &[&str]) -> Result<usize, PickError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PickError {
    #[error("failed to read disambiguation choice: {0}")]
    Input(#[from] std::io::Error),
    #[error("no choice available for '{surname}'")]
    Exhausted { surname: String },
}

#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("choice {given} is out of range for '{surname}' ({count} candidates)")]
    ChoiceOutOfRange {
        surname: String,
        given: usize,
        count: usize,
    },
    #[error(
        "roster holds multiple indistinguishable records for '{firstname} {surname}'; \
         fix the roster before dispatching"
    )]
    IndistinguishableCandidates { surname: String, firstname: String },
    #[error(transparent)]
    Pick(#[from] PickError),
}

/// Pure lookup: candidate set size decides the state, nothing auto-resolves
/// past an ambiguity.
pub fn match_token<'a>(roster: &'a RosterIndex, token: &str) -> MatchResult<'a> {
    let candidates = roster.candidates(token);
    match candidates.len() {
        0 => MatchResult::Unknown,
        1 => MatchResult::Resolved(candidates[0]),
        _ => MatchResult::Ambiguous(candidates),
    }
}

/// Resolves one token to at most one roster record.
///
/// Ambiguity is settled through `picker`; a token never silently matches the
/// wrong person. Candidates sharing surname and firstname cannot be told
/// apart by any choice, so they are rejected before prompting.
pub fn resolve_token<'a>(
    roster: &'a RosterIndex,
    token: &str,
    picker: &mut dyn ChoicePicker,
) -> Result<TokenResolution<'a>, MatchError> {
    match match_token(roster, token) {
        MatchResult::Unknown => Ok(TokenResolution::Unknown),
        MatchResult::Resolved(record) => Ok(TokenResolution::Matched(record)),
        MatchResult::Ambiguous(candidates) => {
            if let Some(firstname) = duplicated_firstname(&candidates) {
                return Err(MatchError::IndistinguishableCandidates {
                    surname: token.to_string(),
                    firstname,
                });
            }

            let options: Vec<&str> = candidates
                .iter()
                .map(|record| record.firstname.as_str())
                .collect();
            let choice = picker.pick(token, &options)?;
            let record =
                candidates
                    .get(choice)
                    .copied()
                    .ok_or_else(|| MatchError::ChoiceOutOfRange {
                        surname: token.to_string(),
                        given: choice,
                        count: options.len(),
                    })?;
            Ok(TokenResolution::Matched(record))
        }
    }
}

fn duplicated_firstname(candidates: &[&RosterRecord]) -> Option<String> {
    let mut seen = HashSet::new();
    for candidate in candidates {
        if !seen.insert(candidate.firstname.as_str()) {
            return Some(candidate.firstname.clone());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(username: &str, surname: &str, firstname: &str) -> RosterRecord {
        RosterRecord {
            username: username.to_string(),
            surname: surname.to_string(),
            firstname: firstname.to_string(),
        }
    }

    fn sample_roster() -> RosterIndex {
        RosterIndex::from_records(vec![
            record("u1", "Smith", "Anna"),
            record("u2", "Smith", "Bob"),
            record("u3", "Lee", "Cid"),
        ])
    }

    /// Returns pre-scripted indexes, one per prompt.
    struct ScriptedPicker {
        choices: Vec<usize>,
    }

    impl ChoicePicker for ScriptedPicker {
        fn pick(&mut self, surname: &str, _options: &[&str]) -> Result<usize, PickError> {
            if self.choices.is_empty() {
                return Err(PickError::Exhausted {
                    surname: surname.to_string(),
                });
            }
            Ok(self.choices.remove(0))
        }
    }

    /// Fails the test if the matcher prompts at all.
    struct PanicPicker;

    impl ChoicePicker for PanicPicker {
        fn pick(&mut self, surname: &str, _options: &[&str]) -> Result<usize, PickError> {
            panic!("unexpected prompt for '{surname}'");
        }
    }

    #[test]
    fn unique_surname_resolves_without_prompting() {
        let roster = sample_roster();
        let resolution =
            resolve_token(&roster, "Lee", &mut PanicPicker).expect("resolves directly");
        match resolution {
            TokenResolution::Matched(record) => assert_eq!(record.username, "u3"),
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn ambiguous_surname_is_never_auto_resolved() {
        let roster = sample_roster();
        match match_token(&roster, "Smith") {
            MatchResult::Ambiguous(candidates) => {
                let firstnames: Vec<&str> = candidates
                    .iter()
                    .map(|record| record.firstname.as_str())
                    .collect();
                assert_eq!(firstnames, vec!["Anna", "Bob"]);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn scripted_choice_selects_the_committed_candidate() {
        let roster = sample_roster();
        let mut picker = ScriptedPicker { choices: vec![1] };
        let resolution = resolve_token(&roster, "Smith", &mut picker).expect("resolves via pick");
        match resolution {
            TokenResolution::Matched(record) => {
                assert_eq!(record.username, "u2");
                assert_eq!(record.firstname, "Bob");
            }
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn absent_surname_is_unknown() {
        let roster = sample_roster();
        let resolution = resolve_token(&roster, "Nguyen", &mut PanicPicker).expect("no prompt");
        assert_eq!(resolution, TokenResolution::Unknown);
    }

    #[test]
    fn out_of_range_choice_is_a_hard_error() {
        let roster = sample_roster();
        let mut picker = ScriptedPicker { choices: vec![2] };
        let err = resolve_token(&roster, "Smith", &mut picker).expect_err("rejected");
        match err {
            MatchError::ChoiceOutOfRange {
                surname,
                given,
                count,
            } => {
                assert_eq!(surname, "Smith");
                assert_eq!(given, 2);
                assert_eq!(count, 2);
            }
            other => panic!("expected range error, got {other:?}"),
        }
    }

    #[test]
    fn indistinguishable_duplicates_are_rejected_before_prompting() {
        let roster = RosterIndex::from_records(vec![
            record("u1", "Nguyen", "The Sang"),
            record("u2", "Nguyen", "The Sang"),
        ]);
        let err = resolve_token(&roster, "Nguyen", &mut PanicPicker).expect_err("rejected");
        match err {
            MatchError::IndistinguishableCandidates { surname, firstname } => {
                assert_eq!(surname, "Nguyen");
                assert_eq!(firstname, "The Sang");
            }
            other => panic!("expected indistinguishable error, got {other:?}"),
        }
    }

    #[test]
    fn picker_failure_propagates() {
        let roster = sample_roster();
        let mut picker = ScriptedPicker {
            choices: Vec::new(),
        };
        let err = resolve_token(&roster, "Smith", &mut picker).expect_err("picker exhausted");
        assert!(matches!(err, MatchError::Pick(PickError::Exhausted { .. })));
    }
}
