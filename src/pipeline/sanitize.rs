//! File-name sanitisation for the working directory and output document.
//!
//! Flyer titles come straight from the catalog API ("Offres du 12/03 au
//! 23/03", "Spécial : Jardin") and must become a single path component.
//! Which characters are forbidden depends on the filesystem the files land
//! on, so the profile is chosen once at startup and passed in explicitly.

use serde::{Deserialize, Serialize};

/// Used when nothing survives sanitisation.
pub const FALLBACK_NAME: &str = "catalogue";

/// Target filesystem rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilesystemProfile {
    /// NTFS / FAT: strips `\ / : * ? " < > |`.
    Windows,
    /// ext4 and friends: strips `/`.
    Linux,
    /// APFS / HFS+: strips `/` and `:`.
    MacOs,
}

impl FilesystemProfile {
    /// Profile for the filesystem this binary was built for.
    pub fn host() -> Self {
        if cfg!(windows) {
            FilesystemProfile::Windows
        } else if cfg!(target_os = "macos") {
            FilesystemProfile::MacOs
        } else {
            FilesystemProfile::Linux
        }
    }

    fn forbids(self, c: char) -> bool {
        match self {
            FilesystemProfile::Windows => {
                matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|')
            }
            FilesystemProfile::Linux => c == '/',
            FilesystemProfile::MacOs => matches!(c, '/' | ':'),
        }
    }
}

impl Default for FilesystemProfile {
    fn default() -> Self {
        Self::host()
    }
}

impl std::str::FromStr for FilesystemProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "windows" | "win" => Ok(FilesystemProfile::Windows),
            "linux" => Ok(FilesystemProfile::Linux),
            "macos" | "darwin" | "mac" => Ok(FilesystemProfile::MacOs),
            other => Err(format!("unknown filesystem profile '{other}'")),
        }
    }
}

/// C0 and C1 control codes plus DEL.
fn is_control(c: char) -> bool {
    matches!(c, '\u{0000}'..='\u{001F}' | '\u{007F}'..='\u{009F}')
}

/// Turn `name` into a single safe path component for `profile`.
///
/// Control characters and profile-forbidden characters are removed (not
/// replaced), then trailing dots and whitespace are trimmed along with
/// leading whitespace.
pub fn sanitize_for_filesystem(name: &str, profile: FilesystemProfile) -> String {
    let stripped: String = name
        .chars()
        .filter(|&c| !is_control(c) && !profile.forbids(c))
        .collect();

    let trimmed = stripped
        .trim_end_matches(|c: char| c == '.' || c.is_whitespace())
        .trim();

    if trimmed.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_control_characters() {
        let s = sanitize_for_filesystem("Promo\u{0007}s\u{0085} d'été\n", FilesystemProfile::Linux);
        assert_eq!(s, "Promos d'été");
    }

    #[test]
    fn linux_only_strips_slash() {
        let s = sanitize_for_filesystem("Du 12/03 au 23/03: *jardin*", FilesystemProfile::Linux);
        assert_eq!(s, "Du 1203 au 2303: *jardin*");
    }

    #[test]
    fn macos_strips_slash_and_colon() {
        let s = sanitize_for_filesystem("Spécial : 12/03", FilesystemProfile::MacOs);
        assert_eq!(s, "Spécial  1203");
    }

    #[test]
    fn windows_strips_reserved_set() {
        let s = sanitize_for_filesystem(
            r#"a\b/c:d*e?f"g<h>i|j"#,
            FilesystemProfile::Windows,
        );
        assert_eq!(s, "abcdefghij");
    }

    #[test]
    fn trims_trailing_dots_and_spaces() {
        assert_eq!(
            sanitize_for_filesystem("  Catalogue Noël . . ", FilesystemProfile::Linux),
            "Catalogue Noël"
        );
        assert_eq!(
            sanitize_for_filesystem("v1.2 final...", FilesystemProfile::Windows),
            "v1.2 final"
        );
    }

    #[test]
    fn empty_result_falls_back() {
        assert_eq!(sanitize_for_filesystem("///", FilesystemProfile::Linux), FALLBACK_NAME);
        assert_eq!(sanitize_for_filesystem(" . ", FilesystemProfile::MacOs), FALLBACK_NAME);
    }

    #[test]
    fn profile_from_str() {
        assert_eq!("Windows".parse(), Ok(FilesystemProfile::Windows));
        assert_eq!("darwin".parse(), Ok(FilesystemProfile::MacOs));
        assert!("beos".parse::<FilesystemProfile>().is_err());
    }
}
