//! Offline language identification.

use super::LanguageDetector;
use whatlang::Lang;

/// Detector backed by `whatlang`, reporting Google-style language codes.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhatlangDetector;

impl WhatlangDetector {
    pub fn new() -> Self {
        Self
    }
}

const LANGUAGES: &[(Lang, &str)] = &[
    (Lang::Eng, "en"),
    (Lang::Hin, "hi"),
    (Lang::Urd, "ur"),
    (Lang::Ben, "bn"),
    (Lang::Mar, "mr"),
    (Lang::Tam, "ta"),
    (Lang::Tel, "te"),
    (Lang::Guj, "gu"),
    (Lang::Pan, "pa"),
    (Lang::Nep, "ne"),
    (Lang::Spa, "es"),
    (Lang::Fra, "fr"),
    (Lang::Deu, "de"),
    (Lang::Por, "pt"),
    (Lang::Ita, "it"),
    (Lang::Rus, "ru"),
    (Lang::Jpn, "ja"),
    (Lang::Kor, "ko"),
    (Lang::Cmn, "zh-CN"),
    (Lang::Ara, "ar"),
];

fn language_code(lang: Lang) -> Option<&'static str> {
    LANGUAGES.iter().find(|(l, _)| *l == lang).map(|(_, code)| *code)
}

/// English name of a Google-style language code, e.g. `hi` -> `Hindi`.
pub fn language_name(code: &str) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find(|(_, c)| c.eq_ignore_ascii_case(code))
        .map(|(lang, _)| lang.eng_name())
}

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Option<String> {
        let info = whatlang::detect(text)?;
        language_code(info.lang()).map(str::to_string)
    }
}
