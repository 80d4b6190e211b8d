use serde::{Deserialize, Serialize};

/// Options passed in for translation, used by the stage builder.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TranslationOptions {
    pub string_translation_mode: StringTranslationMode,
}

impl TranslationOptions {
    pub fn new(string_translation_mode: StringTranslationMode) -> Self {
        TranslationOptions {
            string_translation_mode,
        }
    }
}

/// Specifies whether string positions and lengths count UTF-8 bytes or code
/// points.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StringTranslationMode {
    #[default]
    Bytes,
    CodePoints,
}
