//! Name-based check for files that probably hold secrets.
//!
//! Used by the host as a confirmation gate before writing output. The
//! assembler itself never looks at these.

const SENSITIVE_KEYWORDS: &[&str] = &[
    ".env",
    ".key",
    ".pem",
    "id_rsa",
    "id_dsa",
    "id_ed25519",
    "password",
    "secret",
    "token",
    "credential",
    "aws",
    "private",
    "config.local",
    ".npmrc",
    ".gitconfig",
];

pub fn is_sensitive(path: &str) -> bool {
    let lower = path.to_lowercase();
    SENSITIVE_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Returns the paths that look sensitive, in input order.
pub fn sensitive_paths<'a, I, S>(paths: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a S>,
    S: AsRef<str> + ?Sized + 'a,
{
    paths
        .into_iter()
        .map(|p| AsRef::<str>::as_ref(p))
        .filter(|p| is_sensitive(p))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_keywords_case_insensitively() {
        assert!(is_sensitive(".env"));
        assert!(is_sensitive("config/.env.production"));
        assert!(is_sensitive("keys/ID_RSA"));
        assert!(is_sensitive("deploy/AWS_profile.txt"));
        assert!(is_sensitive("certs/server.pem"));
    }

    #[test]
    fn test_ordinary_paths_pass() {
        assert!(!is_sensitive("src/main.rs"));
        assert!(!is_sensitive("README.md"));
    }

    #[test]
    fn test_sensitive_paths_keeps_order() {
        let paths = ["b/secret.txt", "a.rs", "a/token.json"];
        assert_eq!(sensitive_paths(&paths), vec!["b/secret.txt", "a/token.json"]);
    }
}
