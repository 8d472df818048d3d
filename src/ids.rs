use uuid::Uuid;

/// Fresh random identifier. `Uuid::new_v4` draws from the OS CSPRNG.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates an id that `exists` does not already claim.
pub fn unique_id<F>(mut exists: F) -> String
where
    F: FnMut(&str) -> bool,
{
    for _ in 0..64 {
        let candidate = new_id();
        if !exists(&candidate) {
            return candidate;
        }
    }

    format!("{}-{}", new_id(), Uuid::now_v7().simple())
}

/// Leading segment of an id, short enough for terminal output.
pub fn display_id(id: &str) -> &str {
    match id.find('-') {
        Some(cut) if cut > 0 => &id[..cut],
        _ => id,
    }
}

/// Resolves a full id or an unambiguous prefix against `ids`. An exact match
/// always wins.
pub fn resolve_token<'a, I>(ids: I, token: &str) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    let mut prefixed = None;
    let mut ambiguous = false;
    for id in ids {
        if id == token {
            return Some(id);
        }
        if id.starts_with(token) {
            ambiguous |= prefixed.is_some();
            prefixed = Some(id);
        }
    }
    if ambiguous {
        None
    } else {
        prefixed
    }
}
