use std::collections::HashSet;

/// Case-insensitive identity of a set member.
pub fn fold(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Appends members of `incoming` not already present in `target`, ignoring case.
/// First-seen casing and insertion order are preserved; blanks are dropped.
pub fn union_case_insensitive<I, S>(target: &mut Vec<String>, incoming: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen: HashSet<String> = target.iter().map(|s| fold(s)).collect();
    for item in incoming {
        let item = item.as_ref().trim();
        if item.is_empty() {
            continue;
        }
        if seen.insert(fold(item)) {
            target.push(item.to_string());
        }
    }
}

/// Deduplicates in place, keeping the first occurrence of each member.
pub fn dedup_case_insensitive(items: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(items.len());
    union_case_insensitive(&mut out, items);
    out
}
