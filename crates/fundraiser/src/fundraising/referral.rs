//! Referral code generation.

/// Lowercased username followed by the campaign year, e.g. `ada2026`.
///
/// Only ASCII letters, digits, `-` and `_` survive so codes stay URL-safe. Returns `None`
/// when nothing usable remains.
pub fn base_code(username: &str, year: i32) -> Option<String> {
    let cleaned: String = username
        .trim()
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '-' || *ch == '_')
        .map(|ch| ch.to_ascii_lowercase())
        .collect();

    if cleaned.is_empty() {
        None
    } else {
        Some(format!("{cleaned}{year}"))
    }
}

/// Returns `base` when free, otherwise the first free `base1`, `base2`, ...
///
/// `exists` is consulted for every candidate, so uniqueness holds against whatever the
/// callback observes (a store transaction in production).
pub fn unique_code<E, F>(base: &str, mut exists: F) -> Result<String, E>
where
    F: FnMut(&str) -> Result<bool, E>,
{
    if !exists(base)? {
        return Ok(base.to_string());
    }

    let mut suffix: u64 = 1;
    loop {
        let candidate = format!("{base}{suffix}");
        if !exists(&candidate)? {
            return Ok(candidate);
        }
        suffix += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::convert::Infallible;

    #[test]
    fn base_code_lowercases_and_appends_year() {
        assert_eq!(base_code("AdaLovelace", 2026).as_deref(), Some("adalovelace2026"));
        assert_eq!(base_code(" grace.hopper ", 2025).as_deref(), Some("gracehopper2025"));
        assert_eq!(base_code("team_lead-1", 2026).as_deref(), Some("team_lead-12026"));
        assert_eq!(base_code("  ", 2026), None);
        assert_eq!(base_code("!!", 2026), None);
    }

    #[test]
    fn free_base_is_used_verbatim() {
        let code = unique_code::<Infallible, _>("ada2026", |_| Ok(false)).unwrap();
        assert_eq!(code, "ada2026");
    }

    #[test]
    fn collisions_get_an_increasing_suffix() {
        let taken: HashSet<&str> = ["ada2026", "ada20261", "ada20262"].into_iter().collect();
        let mut attempts = Vec::new();

        let code = unique_code::<Infallible, _>("ada2026", |candidate| {
            attempts.push(candidate.to_string());
            Ok(taken.contains(candidate))
        })
        .unwrap();

        assert_eq!(code, "ada20263");
        assert_eq!(attempts, vec!["ada2026", "ada20261", "ada20262", "ada20263"]);
    }

    #[test]
    fn lookup_errors_propagate() {
        let result = unique_code("ada2026", |_| Err("store offline"));
        assert_eq!(result, Err("store offline"));
    }
}
