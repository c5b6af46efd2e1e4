//! "Possible solutions" for a call that matched nothing.
//!
//! Suggestions are the overloads of the called name followed by the
//! overloads of instance methods whose names are a few edits away.

use rustc_hash::FxHashSet;

use mop_ir::{Name, StringLookup};

use crate::descriptor::TypeDescriptor;
use crate::registry::{BucketKey, LookupScope, MethodRegistry};
use crate::MethodKind;

/// Most similarly-named methods offered per failure.
const MAX_SIMILAR_NAMES: usize = 3;

/// Levenshtein edit distance between two strings.
fn edit_distance(a: &str, b: &str) -> usize {
    let b_len = b.chars().count();
    if a.is_empty() {
        return b_len;
    }
    if b.is_empty() {
        return a.chars().count();
    }

    let mut prev_row: Vec<usize> = (0..=b_len).collect();
    let mut curr_row: Vec<usize> = vec![0; b_len + 1];
    for (i, a_char) in a.chars().enumerate() {
        curr_row[0] = i + 1;
        for (j, b_char) in b.chars().enumerate() {
            let cost = usize::from(a_char != b_char);
            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(prev_row[j] + cost);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }
    prev_row[b_len]
}

/// Edits allowed for a name of this length.
fn threshold(name_len: usize) -> usize {
    match name_len {
        0 => 0,
        1..=2 => 1,
        3..=5 => 2,
        6..=10 => 3,
        n => (n / 2).min(5),
    }
}

/// Names within the edit threshold of `target`, closest first, then by text.
fn similar_names<'a>(target: &str, names: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    if target.is_empty() {
        return Vec::new();
    }
    let limit = threshold(target.len());
    let mut matches: Vec<(&str, usize)> = names
        .filter(|name| *name != target && target.len().abs_diff(name.len()) <= limit)
        .filter_map(|name| {
            let distance = edit_distance(target, name);
            (distance <= limit).then_some((name, distance))
        })
        .collect();
    matches.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    matches
        .into_iter()
        .take(MAX_SIMILAR_NAMES)
        .map(|(name, _)| name)
        .collect()
}

/// Every method name of `kind` visible on `descriptor`, declared or dynamic.
fn visible_names(descriptor: &TypeDescriptor, kind: MethodKind) -> FxHashSet<Name> {
    let mut names = FxHashSet::default();
    for d in descriptor.ancestors() {
        names.extend(
            d.declared_methods()
                .iter()
                .filter(|c| c.kind() == kind)
                .map(|c| c.name()),
        );
        for (name, candidates) in d.dynamic_table().iter() {
            if candidates.iter().any(|c| c.kind() == kind) {
                names.insert(*name);
            }
        }
    }
    names
}

/// Described overloads a caller of `name` on `descriptor` probably meant.
pub(crate) fn method_suggestions(
    registry: &MethodRegistry,
    descriptor: &TypeDescriptor,
    name: Name,
    scope: LookupScope,
    interner: &impl StringLookup,
) -> Vec<String> {
    let mut suggestions = describe_bucket(registry, descriptor, BucketKey::new(name, scope), interner);
    if scope == LookupScope::Constructor {
        return suggestions;
    }
    let visible = visible_names(descriptor, MethodKind::Instance);
    let similar = similar_names(
        interner.lookup(name),
        visible.iter().map(|n| interner.lookup(*n)),
    );
    for close in similar {
        if let Some(close) = visible.iter().copied().find(|n| interner.lookup(*n) == close) {
            let key = BucketKey::new(close, LookupScope::Instance);
            suggestions.extend(describe_bucket(registry, descriptor, key, interner));
        }
    }
    suggestions
}

fn describe_bucket(
    registry: &MethodRegistry,
    descriptor: &TypeDescriptor,
    key: BucketKey,
    interner: &impl StringLookup,
) -> Vec<String> {
    registry
        .lookup(descriptor, key)
        .candidates()
        .iter()
        .map(|c| c.describe(interner))
        .collect()
}
