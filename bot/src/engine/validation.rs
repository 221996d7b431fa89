/// Maximum message content length (characters).
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Maximum channel name length (characters).
pub const MAX_CHANNEL_NAME_LENGTH: usize = 100;

/// Maximum command prefix length.
pub const MAX_PREFIX_LENGTH: usize = 8;

/// Most messages a single history request can return.
pub const MAX_HISTORY_FETCH: usize = 100;

/// Turn a display name into something usable in a channel name: lowercase
/// alphanumerics separated by single hyphens.
pub fn channel_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "member".to_string()
    } else {
        slug.to_string()
    }
}

/// Name for an escalation channel: `<slug>-<suffix>`, within the platform
/// limit. Further suffixes are appended the same way. A long slug is cut
/// before the suffixes are added, so they always survive.
pub fn case_channel_name(requester_name: &str, suffixes: &[&str]) -> String {
    let tail: String = suffixes
        .iter()
        .filter(|s| !s.is_empty())
        .map(|s| format!("-{s}"))
        .collect();
    let room = MAX_CHANNEL_NAME_LENGTH.saturating_sub(tail.chars().count());
    if room == 0 {
        return truncate_chars(tail.trim_start_matches('-'), MAX_CHANNEL_NAME_LENGTH);
    }

    let slug = channel_slug(requester_name);
    let slug = truncate_chars(&slug, room);
    let slug = slug.trim_end_matches('-');
    format!("{slug}{tail}")
}

/// Split outgoing content into pieces the platform accepts, preferring to
/// break after a newline. Nothing is dropped: the pieces concatenate back
/// to `content`.
pub fn split_message(content: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut rest = content;
    while rest.chars().count() > MAX_MESSAGE_LENGTH {
        let window_end = rest
            .char_indices()
            .nth(MAX_MESSAGE_LENGTH)
            .map_or(rest.len(), |(i, _)| i);
        let cut = match rest[..window_end].rfind('\n') {
            Some(newline) if newline > 0 => newline + 1,
            _ => window_end,
        };
        let (piece, tail) = rest.split_at(cut);
        pieces.push(piece.to_string());
        rest = tail;
    }
    if !rest.is_empty() || pieces.is_empty() {
        pieces.push(rest.to_string());
    }
    pieces
}

/// Validate a command prefix. Must be 1-8 chars with no whitespace.
pub fn validate_prefix(prefix: &str) -> Result<(), String> {
    if prefix.is_empty() {
        return Err("Command prefix cannot be empty".into());
    }
    if prefix.chars().count() > MAX_PREFIX_LENGTH {
        return Err(format!(
            "Command prefix too long (max {} characters)",
            MAX_PREFIX_LENGTH
        ));
    }
    if prefix.chars().any(char::is_whitespace) {
        return Err("Command prefix cannot contain whitespace".into());
    }
    Ok(())
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_slug() {
        assert_eq!(channel_slug("Alice"), "alice");
        assert_eq!(channel_slug("Bob the Builder!!"), "bob-the-builder");
        assert_eq!(channel_slug("  --  "), "member");
        assert_eq!(channel_slug("Zoë_42"), "zoë-42");
    }

    #[test]
    fn test_case_channel_name() {
        assert_eq!(
            case_channel_name("Alice", &["talking-to-admins"]),
            "alice-talking-to-admins"
        );
        assert_eq!(
            case_channel_name("Alice", &["talking-to-admins", "admin-side"]),
            "alice-talking-to-admins-admin-side"
        );
        assert_eq!(case_channel_name("Alice", &[""]), "alice");
    }

    #[test]
    fn test_case_channel_name_is_clamped() {
        let name = case_channel_name(&"a".repeat(150), &["talking-to-admins"]);
        assert_eq!(name.chars().count(), MAX_CHANNEL_NAME_LENGTH);
        assert!(name.ends_with("-talking-to-admins"));
    }

    #[test]
    fn test_long_names_keep_sides_apart() {
        let display = "a ".repeat(100);
        let user_side = case_channel_name(&display, &["talking-to-admins"]);
        let admin_side = case_channel_name(&display, &["talking-to-admins", "admin-side"]);

        assert_ne!(user_side, admin_side);
        assert!(user_side.ends_with("-talking-to-admins"));
        assert!(admin_side.ends_with("-talking-to-admins-admin-side"));
        for name in [&user_side, &admin_side] {
            assert!(name.chars().count() <= MAX_CHANNEL_NAME_LENGTH);
            assert!(!name.contains("--"), "{name}");
            assert!(!name.ends_with('-'));
        }
    }

    #[test]
    fn test_split_message_short() {
        assert_eq!(split_message("hello"), vec!["hello"]);
        assert_eq!(split_message(""), vec![""]);
        let exact = "x".repeat(MAX_MESSAGE_LENGTH);
        assert_eq!(split_message(&exact), vec![exact.clone()]);
    }

    #[test]
    fn test_split_message_keeps_everything() {
        let long = "é".repeat(4500);
        let pieces = split_message(&long);
        assert_eq!(pieces.len(), 3);
        assert!(pieces.iter().all(|p| p.chars().count() <= MAX_MESSAGE_LENGTH));
        assert_eq!(pieces.concat(), long);
    }

    #[test]
    fn test_split_message_prefers_newlines() {
        let text = format!("{}\n{}", "a".repeat(1500), "b".repeat(1000));
        let pieces = split_message(&text);
        assert_eq!(pieces.len(), 2);
        assert!(pieces[0].ends_with('\n'));
        assert_eq!(pieces[1], "b".repeat(1000));
    }

    #[test]
    fn test_prefix_validation() {
        assert!(validate_prefix("~").is_ok());
        assert!(validate_prefix("!!").is_ok());
        assert!(validate_prefix("").is_err());
        assert!(validate_prefix("a b").is_err());
        assert!(validate_prefix(&"~".repeat(9)).is_err());
    }
}
