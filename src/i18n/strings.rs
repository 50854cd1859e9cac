/// All localized user-facing strings for a language
///
/// Strings are stored in their raw, unescaped form and are inserted into the
/// result card as-is.
#[derive(Debug, Clone)]
pub struct LanguageStrings {
    // ==================== Card Headings ====================
    /// Heading above a TLDR or key-points summary
    pub summary_heading: &'static str,

    /// Heading above the key-points list
    pub key_points_heading: &'static str,

    /// Heading above rewritten text
    pub rewrite_heading: &'static str,

    /// Heading above proofread text
    pub proofread_heading: &'static str,

    /// Heading above free-form generated text
    pub write_heading: &'static str,

    /// Heading above a grounded answer
    pub answer_heading: &'static str,

    /// Footer label before the source name (e.g., "Source")
    pub source_label: &'static str,

    // ==================== Notices ====================
    /// Notice shown when translation fails and falling back to English
    /// Empty string means no notice is needed (e.g., for English itself)
    pub translation_failure_notice: &'static str,

    /// Notice shown when proofreading produced no correction
    pub proofread_fallback_notice: &'static str,

    /// Notice shown when a prompt or question could not be proofread
    pub prompt_unverified_notice: &'static str,

    /// Prefix for error messages (e.g., "Error")
    pub error_prefix: &'static str,
}

// ==================== English Strings ====================

/// English language strings (canonical)
pub const ENGLISH_STRINGS: LanguageStrings = LanguageStrings {
    summary_heading: "Summary",
    key_points_heading: "Key Points",
    rewrite_heading: "Rewritten Text",
    proofread_heading: "Proofread Text",
    write_heading: "Generated Text",
    answer_heading: "Answer",
    source_label: "Source",
    translation_failure_notice: "", // No notice needed for English
    proofread_fallback_notice: "No corrections were available; showing the original text.",
    prompt_unverified_notice: "Your prompt could not be proofread and was used as typed.",
    error_prefix: "Error",
};

// ==================== Spanish Strings ====================

pub const SPANISH_STRINGS: LanguageStrings = LanguageStrings {
    summary_heading: "Resumen",
    key_points_heading: "Puntos clave",
    rewrite_heading: "Texto reescrito",
    proofread_heading: "Texto corregido",
    write_heading: "Texto generado",
    answer_heading: "Respuesta",
    source_label: "Fuente",
    translation_failure_notice: "La traducción no está disponible en este momento. Se muestra la versión en inglés.",
    proofread_fallback_notice: "No hubo correcciones disponibles; se muestra el texto original.",
    prompt_unverified_notice: "No se pudo revisar tu texto; se usó tal como lo escribiste.",
    error_prefix: "Error",
};

// ==================== French Strings ====================

pub const FRENCH_STRINGS: LanguageStrings = LanguageStrings {
    summary_heading: "Résumé",
    key_points_heading: "Points clés",
    rewrite_heading: "Texte réécrit",
    proofread_heading: "Texte corrigé",
    write_heading: "Texte généré",
    answer_heading: "Réponse",
    source_label: "Source",
    translation_failure_notice: "La traduction n'est pas disponible pour le moment. La version anglaise est affichée.",
    proofread_fallback_notice: "Aucune correction disponible ; le texte original est affiché.",
    prompt_unverified_notice: "Votre demande n'a pas pu être relue et a été utilisée telle quelle.",
    error_prefix: "Erreur",
};

// ==================== German Strings ====================

pub const GERMAN_STRINGS: LanguageStrings = LanguageStrings {
    summary_heading: "Zusammenfassung",
    key_points_heading: "Kernpunkte",
    rewrite_heading: "Umformulierter Text",
    proofread_heading: "Korrigierter Text",
    write_heading: "Generierter Text",
    answer_heading: "Antwort",
    source_label: "Quelle",
    translation_failure_notice: "Die Übersetzung ist derzeit nicht verfügbar. Die englische Version wird angezeigt.",
    proofread_fallback_notice: "Keine Korrekturen verfügbar; der Originaltext wird angezeigt.",
    prompt_unverified_notice: "Ihre Eingabe konnte nicht korrigiert werden und wurde unverändert verwendet.",
    error_prefix: "Fehler",
};

// ==================== Japanese Strings ====================

pub const JAPANESE_STRINGS: LanguageStrings = LanguageStrings {
    summary_heading: "要約",
    key_points_heading: "要点",
    rewrite_heading: "書き換えたテキスト",
    proofread_heading: "校正済みテキスト",
    write_heading: "生成されたテキスト",
    answer_heading: "回答",
    source_label: "出典",
    translation_failure_notice: "現在翻訳を利用できません。英語版を表示しています。",
    proofread_fallback_notice: "修正候補がないため、元のテキストを表示しています。",
    prompt_unverified_notice: "入力を校正できなかったため、そのまま使用しました。",
    error_prefix: "エラー",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_has_no_failure_notice() {
        assert!(ENGLISH_STRINGS.translation_failure_notice.is_empty());
    }

    #[test]
    fn test_targets_have_failure_notice() {
        for strings in [&SPANISH_STRINGS, &FRENCH_STRINGS, &GERMAN_STRINGS, &JAPANESE_STRINGS] {
            assert!(!strings.translation_failure_notice.is_empty());
            assert!(!strings.proofread_fallback_notice.is_empty());
        }
    }

    #[test]
    fn test_spanish_notice_mentions_english() {
        assert!(SPANISH_STRINGS.translation_failure_notice.contains("inglés"));
    }
}
