use crate::context::MatchPolicy;
use crate::descriptor::{FieldDescriptor, TypeDescriptor};

/// How a key resolved to a field; earlier variants take priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchRule {
    TagExact,
    TagFold,
    NameExact,
    NameFold,
}

const RULES: [MatchRule; 4] = [
    MatchRule::TagExact,
    MatchRule::TagFold,
    MatchRule::NameExact,
    MatchRule::NameFold,
];

/// Removes `_`, `-` and `.` so `FORCE_UPDATE_TIME` lines up with `ForceUpdateTime`.
pub fn strip_separators(s: &str) -> String {
    s.chars().filter(|c| !matches!(c, '_' | '-' | '.')).collect()
}

/// Case-insensitive comparison under `policy`. Pure ASCII strings fold ASCII
/// letters; anything else compares exactly unless Unicode folding is on.
pub fn fold_eq(a: &str, b: &str, policy: &MatchPolicy) -> bool {
    if a.is_ascii() && b.is_ascii() {
        a.eq_ignore_ascii_case(b)
    } else if policy.unicode_case_fold {
        a == b || a.to_lowercase() == b.to_lowercase()
    } else {
        a == b
    }
}

fn satisfies(rule: MatchRule, key: &str, folded_key: &str, field: &FieldDescriptor, policy: &MatchPolicy) -> bool {
    match rule {
        MatchRule::TagExact => field.tag == Some(key),
        MatchRule::TagFold => field.tag.is_some_and(|tag| fold_eq(key, tag, policy)),
        MatchRule::NameExact | MatchRule::NameFold
            if field.tag.is_some() && !policy.name_fallback =>
        {
            false
        }
        MatchRule::NameExact => field.name == key,
        MatchRule::NameFold => fold_eq(folded_key, &field.folded_name, policy),
    }
}

/// Finds the field `key` binds to, returning its position in the schema and
/// the rule that matched. The first rule with any candidate wins; within a
/// rule, the shallowest field wins, then the earliest in schema order.
pub fn match_key(
    key: &str,
    schema: &TypeDescriptor,
    policy: &MatchPolicy,
) -> Option<(usize, MatchRule)> {
    let folded_key = strip_separators(key);
    RULES.iter().find_map(|rule| {
        schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_matchable() && satisfies(*rule, key, &folded_key, f, policy))
            .min_by_key(|(_, f)| f.depth())
            .map(|(pos, _)| (pos, *rule))
    })
}
