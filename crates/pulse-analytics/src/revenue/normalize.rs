//! Stage value normalization.
//!
//! CRM vendors prefix stage identifiers with pipeline codes of the shape
//! `PREFIX:` (`C2:WON`, `DT182_1:PREPARATION`). Normalization strips that
//! prefix, lowercases, collapses separators to underscores, and strips
//! punctuation, so vocabulary scoring sees a stable key.

/// Normalize a raw stage value to its vocabulary key.
pub fn normalize_stage(raw: &str) -> String {
    let trimmed = raw.trim();

    // Strip one vendor pipeline prefix of the shape `PREFIX:` where the
    // prefix is alphanumeric/underscore only.
    let body = match trimmed.split_once(':') {
        Some((prefix, rest))
            if !prefix.is_empty()
                && prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') =>
        {
            rest
        }
        _ => trimmed,
    };

    let mut key = String::with_capacity(body.len());
    let mut last_was_separator = true;
    for c in body.chars() {
        if c.is_alphanumeric() {
            // Lowercasing can expand to multiple chars; combining marks
            // produced that way are dropped along with other punctuation.
            for lower in c.to_lowercase().filter(|ch| ch.is_alphanumeric()) {
                key.push(lower);
            }
            last_was_separator = false;
        } else if matches!(c, ' ' | '-' | '/' | '_' | '.' | '\t') {
            if !last_was_separator {
                key.push('_');
                last_was_separator = true;
            }
        }
        // Remaining punctuation is dropped.
    }
    while key.ends_with('_') {
        key.pop();
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_vendor_prefix() {
        assert_eq!(normalize_stage("C2:WON"), "won");
        assert_eq!(normalize_stage("DT182_1:PREPARATION"), "preparation");
    }

    #[test]
    fn collapses_separators() {
        assert_eq!(normalize_stage("Closed - Won"), "closed_won");
        assert_eq!(normalize_stage("In  Progress"), "in_progress");
        assert_eq!(normalize_stage("Decision/Review"), "decision_review");
    }

    #[test]
    fn drops_punctuation() {
        assert_eq!(normalize_stage("Won!"), "won");
        assert_eq!(normalize_stage("(Qualified)"), "qualified");
    }

    #[test]
    fn leaves_plain_values_alone() {
        assert_eq!(normalize_stage("negotiation"), "negotiation");
    }

    #[test]
    fn is_idempotent() {
        for raw in ["C2:WON", "Closed - Won", "DT182_1:PREPARATION", "Won!"] {
            let once = normalize_stage(raw);
            assert_eq!(normalize_stage(&once), once);
        }
    }
}
