//! Well-known ref names and git-style name validation.
//!
//! Valid branch names:
//! - Must be non-empty
//! - Must not contain whitespace, `~`, `^`, `:`, `?`, `*`, `[`, `\`
//! - Must not contain `..` (double dot) or `@{`
//! - Must not start or end with `.` or `/`
//! - Must not end with `.lock`
//! - Components between slashes must be non-empty and not start with `.`

use crate::error::{RefError, RefResult};

/// The current branch (symbolic) or commit (detached).
pub const HEAD: &str = "HEAD";

/// Root tree id of the staging area.
pub const STAGE_HEAD: &str = "STAGE_HEAD";

pub const HEADS_PREFIX: &str = "refs/heads/";

/// Characters that are forbidden anywhere in a branch name.
const FORBIDDEN_CHARS: &[char] = &[' ', '\t', '\n', '\r', '~', '^', ':', '?', '*', '[', '\\'];

/// Canonical ref name of a branch: `master` -> `refs/heads/master`.
pub fn branch_ref(branch: &str) -> String {
    format!("{HEADS_PREFIX}{branch}")
}

fn invalid(name: &str, reason: impl Into<String>) -> RefError {
    RefError::InvalidRefName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Validate a short branch name, returning `Ok(())` if valid.
///
/// ```
/// use arbor_refs::names::validate_branch_name;
///
/// assert!(validate_branch_name("master").is_ok());
/// assert!(validate_branch_name("feature/roads").is_ok());
/// assert!(validate_branch_name("").is_err());
/// assert!(validate_branch_name("bad..name").is_err());
/// ```
pub fn validate_branch_name(name: &str) -> RefResult<()> {
    if name.is_empty() {
        return Err(invalid(name, "branch name must not be empty"));
    }

    if let Some(ch) = FORBIDDEN_CHARS.iter().find(|ch| name.contains(**ch)) {
        return Err(invalid(name, format!("contains forbidden character: {ch:?}")));
    }

    if name.contains("..") {
        return Err(invalid(name, "must not contain '..'"));
    }

    // reflog syntax
    if name.contains("@{") {
        return Err(invalid(name, "must not contain '@{'"));
    }

    if name.starts_with('.') || name.ends_with('.') {
        return Err(invalid(name, "must not start or end with '.'"));
    }

    if name.starts_with('/') || name.ends_with('/') {
        return Err(invalid(name, "must not start or end with '/'"));
    }

    if name.ends_with(".lock") {
        return Err(invalid(name, "must not end with '.lock'"));
    }

    for component in name.split('/') {
        if component.is_empty() {
            return Err(invalid(name, "path components must not be empty"));
        }
        if component.starts_with('.') {
            return Err(invalid(name, format!("component must not start with '.': {component:?}")));
        }
    }

    Ok(())
}

/// Validate a canonical ref name: either an upper-case pseudo ref such as
/// `HEAD` or `STAGE_HEAD`, or a `refs/...` name with a valid remainder.
pub fn validate_ref_name(name: &str) -> RefResult<()> {
    let pseudo = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c == '_');
    if pseudo {
        return Ok(());
    }
    match name.strip_prefix("refs/") {
        Some(rest) => validate_branch_name(rest).map_err(|_| invalid(name, "invalid ref path")),
        None => Err(invalid(name, "must be a pseudo ref or start with 'refs/'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_branch_names() {
        assert!(validate_branch_name("master").is_ok());
        assert!(validate_branch_name("my-branch").is_ok());
        assert!(validate_branch_name("v1.0").is_ok());
        assert!(validate_branch_name("feature/deep/nested/branch").is_ok());
    }

    #[test]
    fn reject_bad_branch_names() {
        for bad in [
            "",
            "bad..name",
            "has space",
            "a~b",
            "a:b",
            "a[b",
            ".hidden",
            "trailing.",
            "/leading",
            "trailing/",
            "a//b",
            "master.lock",
            "ref@{0}",
            "feature/.hidden",
        ] {
            assert!(validate_branch_name(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn ref_names() {
        assert!(validate_ref_name(HEAD).is_ok());
        assert!(validate_ref_name(STAGE_HEAD).is_ok());
        assert!(validate_ref_name(&branch_ref("master")).is_ok());
        assert!(validate_ref_name("refs/heads/bad..name").is_err());
        assert!(validate_ref_name("master").is_err());
        assert!(validate_ref_name("").is_err());
    }

    #[test]
    fn branch_ref_prefixes() {
        assert_eq!(branch_ref("master"), "refs/heads/master");
    }
}
