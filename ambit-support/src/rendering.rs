//! Text rendering utilities for human-friendly error messages.
//!
//! Container errors name tokens, not memory addresses. These helpers turn
//! resolution chains and token names into something a person can act on.

/// Renders a resolution chain as a readable string.
///
/// # Examples
/// ```
/// use ambit_support::rendering::render_chain;
///
/// let chain = vec!["TodoService", "Storage", "Clock", "TodoService"];
/// assert_eq!(render_chain(&chain), "TodoService → Storage → Clock → TodoService");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    chain
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(" → ")
}

/// Shortens a fully qualified type name for display.
///
/// ```
/// use ambit_support::rendering::shorten_type_name;
///
/// assert_eq!(shorten_type_name("app::services::TodoService"), "TodoService");
/// assert_eq!(
///     shorten_type_name("alloc::sync::Arc<dyn app::ports::Storage>"),
///     "Arc<dyn Storage>"
/// );
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut result = String::with_capacity(full_name.len());
    let mut segment = String::new();
    let mut chars = full_name.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                segment.clear();
            }
            '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | ';' | '&' => {
                result.push_str(&segment);
                result.push(ch);
                segment.clear();
            }
            _ => segment.push(ch),
        }
    }

    result.push_str(&segment);
    result
}

/// Suggests token names close to `requested` out of `available`.
///
/// Substring matches rank first (an identical name counts: two tokens may
/// share a name while being different identities), then names within a
/// small edit distance. Duplicates are reported once. At most
/// `max_suggestions` are returned.
///
/// ```
/// use ambit_support::rendering::suggest_similar;
///
/// let names = ["Storage", "DateService", "Validator"];
/// assert_eq!(suggest_similar("Storge", &names, 3), vec!["Storage".to_string()]);
/// ```
pub fn suggest_similar(
    requested: &str,
    available: &[impl AsRef<str>],
    max_suggestions: usize,
) -> Vec<String> {
    let wanted = requested.to_lowercase();

    let mut scored: Vec<(&str, usize)> = available
        .iter()
        .map(|name| name.as_ref())
        .filter_map(|name| {
            let lower = name.to_lowercase();
            if lower.contains(&wanted) || wanted.contains(&lower) {
                return Some((name, 0));
            }
            let distance = edit_distance(&wanted, &lower);
            (distance <= typo_budget(&wanted)).then_some((name, distance))
        })
        .collect();

    scored.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    scored.dedup_by(|a, b| a.0 == b.0);
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// How many single-character edits still count as "close" for a name.
fn typo_budget(name: &str) -> usize {
    match name.chars().count() {
        0..=3 => 0,
        4..=7 => 1,
        _ => 2,
    }
}

/// Levenshtein distance over chars, two-row variant.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
