//! Path helpers for config files and local source locations

use std::path::PathBuf;

/// Resolve a user-supplied path to an absolute path
///
/// `~` and `~/...` expand to the home directory; relative paths are joined
/// onto the current directory. Components are kept as written, so `..` is
/// not collapsed.
///
/// ```text
/// expand_path("~/.dwh-etl/dwh.json") // -> /home/user/.dwh-etl/dwh.json
/// expand_path("data/log_data")       // -> /current/dir/data/log_data
/// expand_path("/srv/song_data")      // -> /srv/song_data
/// ```
pub fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();

    let expanded = match path.strip_prefix('~') {
        Some("") => dirs::home_dir(),
        Some(rest) if rest.starts_with('/') || rest.starts_with('\\') => {
            dirs::home_dir().map(|home| home.join(&rest[1..]))
        }
        _ => None,
    }
    .unwrap_or_else(|| PathBuf::from(path));

    if expanded.is_absolute() {
        return expanded;
    }
    match std::env::current_dir() {
        Ok(cwd) if path.is_empty() => cwd,
        Ok(cwd) => cwd.join(expanded),
        Err(_) => expanded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_unchanged() {
        assert_eq!(expand_path("/srv/song_data"), PathBuf::from("/srv/song_data"));
        assert_eq!(expand_path("  /srv/log_data  "), PathBuf::from("/srv/log_data"));
    }

    #[test]
    fn test_relative_becomes_absolute() {
        let result = expand_path("data/log_data");
        assert!(result.is_absolute());
        assert_eq!(result, std::env::current_dir().unwrap().join("data/log_data"));
    }

    #[test]
    fn test_empty_is_current_dir() {
        assert_eq!(expand_path(""), std::env::current_dir().unwrap());
    }

    #[test]
    fn test_tilde_expansion() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~"), home);
            assert_eq!(expand_path("~/.dwh-etl/dwh.json"), home.join(".dwh-etl/dwh.json"));
        }
        // Only a leading "~/" is special
        assert!(expand_path("~user/data").ends_with("~user/data"));
    }
}
