use rust_decimal::Decimal;

/// Language/country pair steering message text and number formatting.
///
/// Only German and English message catalogs exist; any other language
/// falls back to English.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locale {
    pub language: &'static str,
    pub country: &'static str,
}

impl Locale {
    pub const DE_AT: Locale = Locale {
        language: "de",
        country: "AT",
    };
    pub const EN_GB: Locale = Locale {
        language: "en",
        country: "GB",
    };

    pub fn is_german(&self) -> bool {
        self.language == "de"
    }

    /// Pick the German or English variant of a message.
    pub fn pick<'a>(&self, de: &'a str, en: &'a str) -> &'a str {
        if self.is_german() { de } else { en }
    }

    /// Format an amount with two decimals and locale-specific separators
    /// ("1.234,50" for German, "1,234.50" otherwise).
    pub fn format_amount(&self, amount: Decimal) -> String {
        let rounded = amount.round_dp(2);
        let negative = rounded.is_sign_negative() && !rounded.is_zero();
        let plain = format!("{:.2}", rounded.abs());
        let (int_part, frac_part) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

        let (group_sep, dec_sep) = if self.is_german() { ('.', ',') } else { (',', '.') };
        let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
        for (i, c) in int_part.chars().enumerate() {
            if i > 0 && (int_part.len() - i) % 3 == 0 {
                grouped.push(group_sep);
            }
            grouped.push(c);
        }

        format!(
            "{}{grouped}{dec_sep}{frac_part}",
            if negative { "-" } else { "" }
        )
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.language, self.country)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn german_amounts() {
        assert_eq!(Locale::DE_AT.format_amount(dec!(1234.5)), "1.234,50");
        assert_eq!(Locale::DE_AT.format_amount(dec!(12)), "12,00");
        assert_eq!(Locale::DE_AT.format_amount(dec!(-1234567.891)), "-1.234.567,89");
    }

    #[test]
    fn english_amounts() {
        assert_eq!(Locale::EN_GB.format_amount(dec!(1234.5)), "1,234.50");
        assert_eq!(Locale::EN_GB.format_amount(dec!(0.004)), "0.00");
    }

    #[test]
    fn picks_language() {
        assert_eq!(Locale::DE_AT.pick("Fehler", "Error"), "Fehler");
        assert_eq!(Locale::EN_GB.pick("Fehler", "Error"), "Error");
        assert_eq!(Locale::DE_AT.to_string(), "de_AT");
    }
}
