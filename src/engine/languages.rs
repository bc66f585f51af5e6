//! Static language table: ISO 639-1 code, English name, FLORES-200 tag.

/// One supported language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub code: &'static str,
    pub name: &'static str,
    pub flores_tag: &'static str,
}

const fn lang(code: &'static str, name: &'static str, flores_tag: &'static str) -> Language {
    Language { code, name, flores_tag }
}

pub const LANGUAGES: &[Language] = &[
    lang("ar", "Arabic", "arb_Arab"),
    lang("bg", "Bulgarian", "bul_Cyrl"),
    lang("bn", "Bengali", "ben_Beng"),
    lang("ca", "Catalan", "cat_Latn"),
    lang("cs", "Czech", "ces_Latn"),
    lang("da", "Danish", "dan_Latn"),
    lang("de", "German", "deu_Latn"),
    lang("el", "Greek", "ell_Grek"),
    lang("en", "English", "eng_Latn"),
    lang("es", "Spanish", "spa_Latn"),
    lang("et", "Estonian", "est_Latn"),
    lang("fa", "Persian", "pes_Arab"),
    lang("fi", "Finnish", "fin_Latn"),
    lang("fr", "French", "fra_Latn"),
    lang("he", "Hebrew", "heb_Hebr"),
    lang("hi", "Hindi", "hin_Deva"),
    lang("hr", "Croatian", "hrv_Latn"),
    lang("hu", "Hungarian", "hun_Latn"),
    lang("id", "Indonesian", "ind_Latn"),
    lang("it", "Italian", "ita_Latn"),
    lang("ja", "Japanese", "jpn_Jpan"),
    lang("ko", "Korean", "kor_Hang"),
    lang("lt", "Lithuanian", "lit_Latn"),
    lang("lv", "Latvian", "lvs_Latn"),
    lang("ms", "Malay", "zsm_Latn"),
    lang("nl", "Dutch", "nld_Latn"),
    lang("no", "Norwegian", "nob_Latn"),
    lang("pl", "Polish", "pol_Latn"),
    lang("pt", "Portuguese", "por_Latn"),
    lang("ro", "Romanian", "ron_Latn"),
    lang("ru", "Russian", "rus_Cyrl"),
    lang("sk", "Slovak", "slk_Latn"),
    lang("sl", "Slovenian", "slv_Latn"),
    lang("sr", "Serbian", "srp_Cyrl"),
    lang("sv", "Swedish", "swe_Latn"),
    lang("sw", "Swahili", "swh_Latn"),
    lang("ta", "Tamil", "tam_Taml"),
    lang("th", "Thai", "tha_Thai"),
    lang("tl", "Tagalog", "tgl_Latn"),
    lang("tr", "Turkish", "tur_Latn"),
    lang("uk", "Ukrainian", "ukr_Cyrl"),
    lang("ur", "Urdu", "urd_Arab"),
    lang("vi", "Vietnamese", "vie_Latn"),
    lang("zh", "Chinese", "zho_Hans"),
    lang("zh-hant", "Traditional Chinese", "zho_Hant"),
];

/// Normalise a caller-supplied code (`en-US`, `EN`, `pt_BR`) to a table key.
pub fn normalize_code(code: &str) -> String {
    let lower = code.trim().to_ascii_lowercase().replace('_', "-");
    match lower.as_str() {
        "zh-tw" | "zh-hk" | "zh-mo" | "zh-hant" => "zh-hant".to_string(),
        _ => lower.split('-').next().unwrap_or_default().to_string(),
    }
}

/// Look up a language by any accepted spelling of its code.
pub fn lookup(code: &str) -> Option<&'static Language> {
    let key = normalize_code(code);
    LANGUAGES.iter().find(|l| l.code == key)
}

/// English display name, used in instruction prompts.
pub fn language_name(code: &str) -> Option<&'static str> {
    lookup(code).map(|l| l.name)
}

/// Runtime vocabulary tag for language-pair models.
pub fn flores_tag(code: &str) -> Option<&'static str> {
    lookup(code).map(|l| l.flores_tag)
}
