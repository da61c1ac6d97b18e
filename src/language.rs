// subtitles-core - Subtitle lookup for media players
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Subtitle languages known to the service
//!
//! The service identifies languages by its own three-letter codes (`eng`,
//! `ger`, `pob`, ...). The host's locale and the language picker work with
//! ISO 639-1 codes, so this table maps between the two.

use serde::Serialize;

/// Service code used when the locale does not map to a known language
pub const DEFAULT_LANGUAGE: &str = "eng";

/// One selectable subtitle language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Language {
    /// ISO 639-1 code (`pb` is the service's own code for Brazilian Portuguese)
    pub iso: &'static str,
    /// Three-letter code sent as `sublanguageid`
    pub code: &'static str,
    /// English display name
    pub name: &'static str,
}

/// All languages offered in the picker, in table order
pub const LANGUAGES: &[Language] = &[
    Language { iso: "sq", code: "alb", name: "Albanian" },
    Language { iso: "ar", code: "ara", name: "Arabic" },
    Language { iso: "hy", code: "arm", name: "Armenian" },
    Language { iso: "ay", code: "ass", name: "Neo-Aramaic, Assyrian" },
    Language { iso: "bs", code: "bos", name: "Bosnian" },
    Language { iso: "pb", code: "pob", name: "Brasilian Portuguese" },
    Language { iso: "bg", code: "bul", name: "Bulgarian" },
    Language { iso: "ca", code: "cat", name: "Catalan" },
    Language { iso: "zh", code: "chi", name: "Chinese" },
    Language { iso: "hr", code: "hrv", name: "Croatian" },
    Language { iso: "cs", code: "cze", name: "Czech" },
    Language { iso: "da", code: "dan", name: "Danish" },
    Language { iso: "nl", code: "dut", name: "Dutch" },
    Language { iso: "en", code: "eng", name: "English" },
    Language { iso: "eo", code: "epo", name: "Esperanto" },
    Language { iso: "et", code: "est", name: "Estonian" },
    Language { iso: "fi", code: "fin", name: "Finnish" },
    Language { iso: "fr", code: "fre", name: "French" },
    Language { iso: "gl", code: "glg", name: "Galician" },
    Language { iso: "ka", code: "geo", name: "Georgian" },
    Language { iso: "de", code: "ger", name: "German" },
    Language { iso: "el", code: "ell", name: "Greek, Modern (1453-)" },
    Language { iso: "he", code: "heb", name: "Hebrew" },
    Language { iso: "hi", code: "hin", name: "Hindi" },
    Language { iso: "hu", code: "hun", name: "Hungarian" },
    Language { iso: "is", code: "ice", name: "Icelandic" },
    Language { iso: "id", code: "ind", name: "Indonesian" },
    Language { iso: "it", code: "ita", name: "Italian" },
    Language { iso: "ja", code: "jpn", name: "Japanese" },
    Language { iso: "kk", code: "kaz", name: "Kazakh" },
    Language { iso: "ko", code: "kor", name: "Korean" },
    Language { iso: "lv", code: "lav", name: "Latvian" },
    Language { iso: "lt", code: "lit", name: "Lithuanian" },
    Language { iso: "lb", code: "ltz", name: "Luxembourgish" },
    Language { iso: "mk", code: "mac", name: "Macedonian" },
    Language { iso: "ms", code: "may", name: "Malay (macrolanguage)" },
    Language { iso: "no", code: "nor", name: "Norwegian" },
    Language { iso: "oc", code: "oci", name: "Occitan (post 1500)" },
    Language { iso: "fa", code: "per", name: "Persian" },
    Language { iso: "pl", code: "pol", name: "Polish" },
    Language { iso: "pt", code: "por", name: "Portuguese" },
    Language { iso: "ro", code: "rum", name: "Romanian" },
    Language { iso: "ru", code: "rus", name: "Russian" },
    Language { iso: "sr", code: "scc", name: "Serbian" },
    Language { iso: "sk", code: "slo", name: "Slovak" },
    Language { iso: "sl", code: "slv", name: "Slovenian" },
    Language { iso: "es", code: "spa", name: "Spanish" },
    Language { iso: "sv", code: "swe", name: "Swedish" },
    Language { iso: "th", code: "tha", name: "Thai" },
    Language { iso: "tr", code: "tur", name: "Turkish" },
    Language { iso: "uk", code: "ukr", name: "Ukrainian" },
    Language { iso: "vi", code: "vie", name: "Vietnamese" },
];

/// Service code for an ISO 639-1 code
pub fn service_code(iso: &str) -> Option<&'static str> {
    let iso = iso.to_ascii_lowercase();
    LANGUAGES.iter().find(|l| l.iso == iso).map(|l| l.code)
}

/// Service code for a POSIX locale such as `de_DE.UTF-8`
///
/// Only the language part before `_`, `.` or `@` is looked at. Unknown or
/// empty locales fall back to [`DEFAULT_LANGUAGE`].
pub fn from_locale(locale: &str) -> &'static str {
    let language = locale
        .split(|c| c == '_' || c == '.' || c == '@' || c == '-')
        .next()
        .unwrap_or_default();

    service_code(language).unwrap_or(DEFAULT_LANGUAGE)
}

/// Service code for the process locale
///
/// Checks `LC_ALL`, `LC_MESSAGES` and `LANG` in that order, skipping unset or
/// empty variables and the `C`/`POSIX` locales.
pub fn from_environment() -> &'static str {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.is_empty() && value != "C" && value != "POSIX")
        .map(|locale| from_locale(&locale))
        .unwrap_or(DEFAULT_LANGUAGE)
}

/// Look up a language by its service code
pub fn by_code(code: &str) -> Option<&'static Language> {
    LANGUAGES.iter().find(|l| l.code == code)
}

/// English name for a service code
pub fn display_name(code: &str) -> Option<&'static str> {
    by_code(code).map(|l| l.name)
}

/// Whether `code` is a service code from the table
pub fn is_supported(code: &str) -> bool {
    by_code(code).is_some()
}

/// Languages sorted by display name, the order the picker shows them in
pub fn sorted_by_name() -> Vec<&'static Language> {
    let mut languages: Vec<_> = LANGUAGES.iter().collect();
    languages.sort_by(|a, b| a.name.cmp(b.name));
    languages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_code() {
        assert_eq!(service_code("en"), Some("eng"));
        assert_eq!(service_code("DE"), Some("ger"));
        assert_eq!(service_code("pb"), Some("pob"));
        assert_eq!(service_code("sr"), Some("scc"));
        assert_eq!(service_code("xx"), None);
    }

    #[test]
    fn test_from_locale() {
        assert_eq!(from_locale("de_DE.UTF-8"), "ger");
        assert_eq!(from_locale("fr_CA"), "fre");
        assert_eq!(from_locale("sr@latin"), "scc");
        assert_eq!(from_locale("pt"), "por");
        assert_eq!(from_locale("C"), "eng");
        assert_eq!(from_locale(""), "eng");
        assert_eq!(from_locale("xx_YY"), "eng");
    }

    #[test]
    fn test_display_name_and_support() {
        assert_eq!(display_name("pob"), Some("Brasilian Portuguese"));
        assert_eq!(display_name("eng"), Some("English"));
        assert!(is_supported("ger"));
        assert!(!is_supported("de"));
        assert_eq!(display_name("zzz"), None);
    }

    #[test]
    fn test_table_is_consistent() {
        assert_eq!(LANGUAGES.len(), 52);
        for language in LANGUAGES {
            assert_eq!(language.code.len(), 3, "{}", language.name);
            assert_eq!(service_code(language.iso), Some(language.code));
        }

        let sorted = sorted_by_name();
        assert_eq!(sorted.first().map(|l| l.code), Some("alb"));
        assert!(sorted.windows(2).all(|w| w[0].name <= w[1].name));
    }
}
