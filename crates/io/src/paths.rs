// Output file naming

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

static UNSAFE_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());
static SEPARATOR_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\s]+").unwrap());

/// Reduce a database or method name to something usable as a file stem.
///
/// Everything except word characters, whitespace and `-` is removed, the
/// result is trimmed, then runs of whitespace/dashes collapse to a single `-`.
/// `"EXIOBASE 3.3.17 hybrid"` becomes `"EXIOBASE-3317-hybrid"`. A name with
/// nothing left after stripping becomes [`UNNAMED`].
pub fn safe_filename(name: &str) -> String {
    let stripped = UNSAFE_CHARS.replace_all(name, "");
    let collapsed = SEPARATOR_RUNS.replace_all(stripped.trim(), "-");
    match collapsed.trim_matches('-') {
        "" => UNNAMED.to_string(),
        stem => stem.to_string(),
    }
}

pub const UNNAMED: &str = "unnamed";

/// `<dir>/<prefix><safe name>.xlsx`
pub fn xlsx_path(dir: &Path, prefix: &str, name: &str) -> PathBuf {
    dir.join(format!("{prefix}{}.xlsx", safe_filename(name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dots_and_spaces() {
        assert_eq!(safe_filename("EXIOBASE 3.3.17 hybrid"), "EXIOBASE-3317-hybrid");
    }

    #[test]
    fn path_hostile_characters_removed() {
        assert_eq!(safe_filename("../etc/passwd"), "etcpasswd");
        assert_eq!(safe_filename(r"a\b:c*d?e"), "abcde");
        assert_eq!(safe_filename("  spaced   out -- name "), "spaced-out-name");
    }

    #[test]
    fn unicode_word_characters_kept() {
        assert_eq!(safe_filename("Ökobilanz 2024"), "Ökobilanz-2024");
    }

    #[test]
    fn punctuation_only_name_gets_a_stem() {
        assert_eq!(safe_filename("..."), "unnamed");
        assert_eq!(safe_filename(" - "), "unnamed");
        assert_eq!(
            xlsx_path(Path::new("/tmp/export"), "", "?!"),
            PathBuf::from("/tmp/export/unnamed.xlsx")
        );
    }

    #[test]
    fn prefixed_xlsx_path() {
        let path = xlsx_path(Path::new("/tmp/export"), "activities-", "ecoinvent 3.9");
        assert_eq!(path, PathBuf::from("/tmp/export/activities-ecoinvent-39.xlsx"));
    }
}
