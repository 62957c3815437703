//! Small path helpers shared by configuration and credential loading.

/// Expands a leading `~/` prefix to the user's home directory.
///
/// If the `HOME` environment variable is not set, the function returns the
/// input string unchanged.
///
/// # Examples
///
/// ```
/// # use tier3::util::expand_tilde;
/// assert_eq!(expand_tilde("/absolute/path"), "/absolute/path");
/// assert_eq!(expand_tilde("relative/path"), "relative/path");
/// ```
#[must_use]
pub fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return format!("{}/{rest}", home.to_string_lossy());
    }
    path.to_owned()
}

#[cfg(test)]
mod tests {
    use super::expand_tilde;

    #[test]
    fn expand_tilde_leaves_absolute_paths_unchanged() {
        assert_eq!(expand_tilde("/etc/tier3/secret"), "/etc/tier3/secret");
    }

    #[test]
    fn expand_tilde_leaves_relative_paths_unchanged() {
        assert_eq!(expand_tilde("secret.txt"), "secret.txt");
    }

    #[test]
    fn expand_tilde_only_expands_home_prefix() {
        assert_eq!(expand_tilde("~user/secret"), "~user/secret");
    }
}
