/*!
 * Tests for language utility functions
 */

use anyhow::Result;
use linguabatch::language_utils::{
    display_name, get_language_name, language_codes_match, normalize_to_part2t, parse_language_list,
};

/// Test normalization of language codes to ISO 639-2/T format
#[test]
fn test_normalize_to_part2t_withValidCodes_shouldNormalizeCorrectly() -> Result<()> {
    assert_eq!(normalize_to_part2t("en")?, "eng");
    assert_eq!(normalize_to_part2t("fr")?, "fra");
    assert_eq!(normalize_to_part2t("eng")?, "eng");
    assert_eq!(normalize_to_part2t("ger")?, "deu");

    // Case and whitespace
    assert_eq!(normalize_to_part2t(" EN ")?, "eng");
    assert_eq!(normalize_to_part2t("FRE")?, "fra");

    // Region subtags
    assert_eq!(normalize_to_part2t("zh_Hant")?, "zho");
    Ok(())
}

#[test]
fn test_normalize_to_part2t_withInvalidCodes_shouldFail() {
    assert!(normalize_to_part2t("123").is_err());
    assert!(normalize_to_part2t("e").is_err());
    assert!(normalize_to_part2t("").is_err());
}

/// Test matching of language codes across formats
#[test]
fn test_language_codes_match_withEquivalentCodes_shouldMatch() {
    assert!(language_codes_match("en", "eng"));
    assert!(language_codes_match("fr", "fre"));
    assert!(language_codes_match("de-AT", "ger"));

    assert!(!language_codes_match("en", "fr"));
    assert!(!language_codes_match("en", "123"));
}

#[test]
fn test_get_language_name_withValidCodes_shouldReturnEnglishName() -> Result<()> {
    assert_eq!(get_language_name("en")?, "English");
    assert_eq!(get_language_name("fra")?, "French");
    assert_eq!(get_language_name("ger")?, "German");
    assert!(get_language_name("99").is_err());
    Ok(())
}

#[test]
fn test_display_name_shouldFallBackToCode() {
    assert_eq!(display_name("es"), "Spanish");
    assert_eq!(display_name("42"), "42");
}

#[test]
fn test_parse_language_list_withBlanks_shouldKeepCodesAsGiven() -> Result<()> {
    let languages = parse_language_list(" fr, de ,,pt-BR ")?;
    assert_eq!(languages, vec!["fr".to_string(), "de".to_string(), "pt-BR".to_string()]);
    Ok(())
}

#[test]
fn test_parse_language_list_withInvalidOrEmptyList_shouldFail() {
    assert!(parse_language_list("fr,12").is_err());
    assert!(parse_language_list(" , ").is_err());
}
