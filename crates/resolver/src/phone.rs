//! Phone number normalization.
//!
//! Pure functions: separator stripping, country-code augmentation for bare
//! Brazilian national numbers, and the ninth-digit alternative hypotheses
//! probed when the primary candidate is not registered.
//!
//! Brazilian mobile numbers migrated from 8 to 9 subscriber digits (the
//! leading "9" mobile indicator); an account registered before the
//! migration may still be keyed by the 8-digit form, so both lengths are
//! legitimate depending on handset-registration vintage.

/// Characters accepted as formatting noise in human-entered numbers.
const SEPARATORS: [char; 6] = ['+', '-', '(', ')', '.', ' '];

/// Minimum digit count for an input to be treated as a phone number.
pub const MIN_PHONE_DIGITS: usize = 10;

const BRAZIL_COUNTRY_CODE: &str = "55";

/// Valid Brazilian two-digit area codes (DDDs). Consulted only to decide
/// whether to *add* a missing country code, never to reject an
/// already-prefixed number.
const BRAZIL_AREA_CODES: [&str; 67] = [
    "11", "12", "13", "14", "15", "16", "17", "18", "19", "21", "22", "24", "27", "28", "31",
    "32", "33", "34", "35", "37", "38", "41", "42", "43", "44", "45", "46", "47", "48", "49",
    "51", "53", "54", "55", "61", "62", "63", "64", "65", "66", "67", "68", "69", "71", "73",
    "74", "75", "77", "79", "81", "82", "83", "84", "85", "86", "87", "88", "89", "91", "92",
    "93", "94", "95", "96", "97", "98", "99",
];

/// Drop separator characters, keeping everything else for the caller to
/// validate.
pub fn strip_separators(raw: &str) -> String {
    raw.chars().filter(|c| !SEPARATORS.contains(c)).collect()
}

pub fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn valid_brazilian_area_code(digits: &str) -> bool {
    digits.len() >= 2 && BRAZIL_AREA_CODES.contains(&&digits[..2])
}

/// The first canonical-form hypothesis for a cleaned digit string: a bare
/// national-format Brazilian number (10-11 digits, recognized area code)
/// gets the country code prepended; anything else passes through.
pub fn primary_candidate(digits: &str) -> String {
    if matches!(digits.len(), 10 | 11) && valid_brazilian_area_code(digits) {
        return format!("{BRAZIL_COUNTRY_CODE}{digits}");
    }
    digits.to_string()
}

/// Alternative hypotheses to probe when the primary candidate is not
/// registered, in probe order.
///
/// For country-code-prefixed numbers the ninth-digit convention gives one
/// alternate: drop the mobile indicator from a 13-digit number, or insert
/// it into a 12-digit one. A 10-11 digit number that was not augmented
/// (unrecognized area code) may still simply be missing the country code;
/// re-add it and toggle the indicator on that form too.
pub fn alternate_candidates(candidate: &str) -> Vec<String> {
    if !is_digits(candidate) {
        return Vec::new();
    }
    let mut alternates = Vec::new();
    if let Some(national) = candidate.strip_prefix(BRAZIL_COUNTRY_CODE) {
        match national.len() {
            // DDD + indicator + 8 subscriber digits.
            11 if national.as_bytes()[2] == b'9' => {
                alternates.push(format!(
                    "{BRAZIL_COUNTRY_CODE}{}{}",
                    &national[..2],
                    &national[3..]
                ));
            }
            // DDD + 8 subscriber digits.
            10 => {
                alternates.push(format!(
                    "{BRAZIL_COUNTRY_CODE}{}9{}",
                    &national[..2],
                    &national[2..]
                ));
            }
            _ => {}
        }
    } else if matches!(candidate.len(), 10 | 11) {
        let with_country_code = format!("{BRAZIL_COUNTRY_CODE}{candidate}");
        alternates.extend(alternate_candidates(&with_country_code));
        alternates.push(with_country_code);
    }
    alternates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_every_separator_kind() {
        assert_eq!(strip_separators("+55 (11) 98837-6411"), "5511988376411");
        assert_eq!(strip_separators("55.11.98837.6411"), "5511988376411");
        assert_eq!(strip_separators("abc 123"), "abc123");
    }

    #[test]
    fn bare_national_number_gains_country_code() {
        assert_eq!(primary_candidate("11988376411"), "5511988376411");
        assert_eq!(primary_candidate("1188376411"), "551188376411");
    }

    #[test]
    fn prefixed_number_passes_through() {
        assert_eq!(primary_candidate("5511988376411"), "5511988376411");
        // 12-digit international numbers are left alone even when their
        // first two digits happen to match a DDD.
        assert_eq!(primary_candidate("441134960000"), "441134960000");
    }

    #[test]
    fn unrecognized_area_code_is_not_augmented() {
        assert_eq!(primary_candidate("0188376411"), "0188376411");
    }

    #[test]
    fn thirteen_digit_number_offers_indicator_removal() {
        assert_eq!(
            alternate_candidates("5511988376411"),
            vec!["551188376411".to_string()]
        );
    }

    #[test]
    fn twelve_digit_number_offers_indicator_insertion() {
        assert_eq!(
            alternate_candidates("551188376411"),
            vec!["5511988376411".to_string()]
        );
    }

    #[test]
    fn thirteen_digits_without_indicator_has_no_alternate() {
        // Third national digit is not the mobile indicator.
        assert!(alternate_candidates("5511788376411").is_empty());
    }

    #[test]
    fn missing_country_code_is_readded_with_indicator_toggle() {
        // 11 digits, area code not in the table: the primary candidate was
        // not augmented, so the alternates re-add the country code.
        assert_eq!(
            alternate_candidates("01988376411"),
            vec!["550188376411".to_string(), "5501988376411".to_string()]
        );
    }
}
