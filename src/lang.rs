//! Language detection for quote filtering.

use whatlang::Lang;

/// Best-guess language of a piece of text, as a lowercase ISO 639 code.
///
/// Detection on very short text is unreliable; callers must not assume determinism across
/// implementations.
pub trait LanguageDetector {
    fn detect(&self, text: &str) -> Option<String>;
}

impl<D: LanguageDetector + ?Sized> LanguageDetector for &D {
    fn detect(&self, text: &str) -> Option<String> {
        (**self).detect(text)
    }
}

impl<D: LanguageDetector + ?Sized> LanguageDetector for Box<D> {
    fn detect(&self, text: &str) -> Option<String> {
        (**self).detect(text)
    }
}

/// Trigram-based detector. Reports two-letter codes (`en`, `fr`) where one exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhatlangDetector;

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Option<String> {
        let info = whatlang::detect(text)?;
        Some(short_code(info.lang()).to_string())
    }
}

/// ISO 639-1 code for the languages that have one, the 639-3 code otherwise.
fn short_code(lang: Lang) -> &'static str {
    let code = lang.code();
    match code {
        "afr" => "af",
        "amh" => "am",
        "ara" => "ar",
        "aka" => "ak",
        "aze" => "az",
        "bel" => "be",
        "ben" => "bn",
        "bul" => "bg",
        "cat" => "ca",
        "ces" => "cs",
        "cmn" => "zh",
        "dan" => "da",
        "deu" => "de",
        "ell" => "el",
        "eng" => "en",
        "epo" => "eo",
        "est" => "et",
        "fin" => "fi",
        "fra" => "fr",
        "guj" => "gu",
        "heb" => "he",
        "hin" => "hi",
        "hrv" => "hr",
        "hun" => "hu",
        "hye" => "hy",
        "ind" => "id",
        "ita" => "it",
        "jav" => "jv",
        "jpn" => "ja",
        "kat" => "ka",
        "kan" => "kn",
        "khm" => "km",
        "kor" => "ko",
        "lat" => "la",
        "lav" => "lv",
        "lit" => "lt",
        "mal" => "ml",
        "mar" => "mr",
        "mkd" => "mk",
        "mya" => "my",
        "nep" => "ne",
        "nld" => "nl",
        "nob" => "nb",
        "ori" => "or",
        "pan" => "pa",
        "pes" => "fa",
        "pol" => "pl",
        "por" => "pt",
        "ron" => "ro",
        "rus" => "ru",
        "sin" => "si",
        "slk" => "sk",
        "slv" => "sl",
        "sna" => "sn",
        "spa" => "es",
        "srp" => "sr",
        "swe" => "sv",
        "tam" => "ta",
        "tel" => "te",
        "tgl" => "tl",
        "tha" => "th",
        "tuk" => "tk",
        "tur" => "tr",
        "ukr" => "uk",
        "urd" => "ur",
        "uzb" => "uz",
        "vie" => "vi",
        "yid" => "yi",
        "zul" => "zu",
        other => other,
    }
}

/// Whether a detected code names the requested language. Both two- and three-letter forms of
/// the request are accepted.
pub fn matches(detected: &str, wanted: &str) -> bool {
    let wanted = wanted.trim().to_ascii_lowercase();
    if detected.eq_ignore_ascii_case(&wanted) {
        return true;
    }
    Lang::from_code(&wanted).is_some_and(|lang| short_code(lang) == detected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_long_english_and_french() {
        let detector = WhatlangDetector;
        let en = "The silence depressed me. It wasn't the silence of silence. It was my own silence.";
        let fr = "Je ne sais pas ce que je veux, mais je sais ce que je ne veux pas dans la vie.";
        assert_eq!(detector.detect(en).as_deref(), Some("en"));
        assert_eq!(detector.detect(fr).as_deref(), Some("fr"));
    }

    #[test]
    fn matches_accepts_both_code_forms() {
        assert!(matches("fr", "fr"));
        assert!(matches("fr", "FR"));
        assert!(matches("fr", "fra"));
        assert!(!matches("en", "fr"));
        assert!(!matches("en", "xx"));
    }
}
