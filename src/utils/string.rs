//! String manipulation utilities

/// Pluralize a word based on count
pub fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        return word.to_string();
    }

    let mut chars = word.chars().rev();
    let last = chars.next();
    let before_last = chars.next();
    match (before_last, last) {
        (Some(c), Some('y')) if !"aeiou".contains(c) => {
            format!("{}ies", &word[..word.len() - 1])
        }
        _ => format!("{word}s"),
    }
}
