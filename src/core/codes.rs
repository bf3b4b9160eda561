//! Code lists shared by the schema validator and the converter.
//!
//! All lists are sorted for binary search.

/// ISO 3166-1 alpha-2.
pub fn is_known_country_code(code: &str) -> bool {
    COUNTRY_CODES.binary_search(&code).is_ok()
}

/// ISO 4217, restricted to currencies seen on European invoices.
pub fn is_known_currency_code(code: &str) -> bool {
    CURRENCY_CODES.binary_search(&code).is_ok()
}

/// UN/ECE Recommendation 20 units commonly used on ebInterface invoices.
pub fn is_known_unit_code(code: &str) -> bool {
    UNIT_CODES.binary_search(&code).is_ok()
}

static COUNTRY_CODES: &[&str] = &[
    "AD", "AE", "AF", "AG", "AI", "AL", "AM", "AO", "AQ", "AR", "AS", "AT", "AU", "AW", "AX", "AZ",
    "BA", "BB", "BD", "BE", "BF", "BG", "BH", "BI", "BJ", "BL", "BM", "BN", "BO", "BQ", "BR", "BS",
    "BT", "BV", "BW", "BY", "BZ", "CA", "CC", "CD", "CF", "CG", "CH", "CI", "CK", "CL", "CM", "CN",
    "CO", "CR", "CU", "CV", "CW", "CX", "CY", "CZ", "DE", "DJ", "DK", "DM", "DO", "DZ", "EC", "EE",
    "EG", "EH", "ER", "ES", "ET", "FI", "FJ", "FK", "FM", "FO", "FR", "GA", "GB", "GD", "GE", "GF",
    "GG", "GH", "GI", "GL", "GM", "GN", "GP", "GQ", "GR", "GS", "GT", "GU", "GW", "GY", "HK", "HM",
    "HN", "HR", "HT", "HU", "ID", "IE", "IL", "IM", "IN", "IO", "IQ", "IR", "IS", "IT", "JE", "JM",
    "JO", "JP", "KE", "KG", "KH", "KI", "KM", "KN", "KP", "KR", "KW", "KY", "KZ", "LA", "LB", "LC",
    "LI", "LK", "LR", "LS", "LT", "LU", "LV", "LY", "MA", "MC", "MD", "ME", "MF", "MG", "MH", "MK",
    "ML", "MM", "MN", "MO", "MP", "MQ", "MR", "MS", "MT", "MU", "MV", "MW", "MX", "MY", "MZ", "NA",
    "NC", "NE", "NF", "NG", "NI", "NL", "NO", "NP", "NR", "NU", "NZ", "OM", "PA", "PE", "PF", "PG",
    "PH", "PK", "PL", "PM", "PN", "PR", "PS", "PT", "PW", "PY", "QA", "RE", "RO", "RS", "RU", "RW",
    "SA", "SB", "SC", "SD", "SE", "SG", "SH", "SI", "SJ", "SK", "SL", "SM", "SN", "SO", "SR", "SS",
    "ST", "SV", "SX", "SY", "SZ", "TC", "TD", "TF", "TG", "TH", "TJ", "TK", "TL", "TM", "TN", "TO",
    "TR", "TT", "TV", "TW", "TZ", "UA", "UG", "UM", "US", "UY", "UZ", "VA", "VC", "VE", "VG", "VI",
    "VN", "VU", "WF", "WS", "YE", "YT", "ZA", "ZM", "ZW",
];

static CURRENCY_CODES: &[&str] = &[
    "BAM", "BGN", "CHF", "CZK", "DKK", "EUR", "GBP", "HUF", "ISK", "JPY", "MKD", "NOK", "PLN",
    "RON", "RSD", "SEK", "TRY", "UAH", "USD",
];

static UNIT_CODES: &[&str] = &[
    "C62", "CMT", "CT", "DAY", "DZN", "GRM", "H87", "HLT", "HUR", "KGM", "KMT", "KWH", "LS", "LTR",
    "MIN", "MLT", "MMT", "MON", "MTK", "MTQ", "MTR", "NAR", "PA", "PR", "SET", "TNE", "WEE",
    "XPP",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups() {
        assert!(is_known_country_code("AT"));
        assert!(!is_known_country_code("XX"));
        assert!(is_known_currency_code("EUR"));
        assert!(!is_known_currency_code("EURO"));
        assert!(is_known_unit_code("H87"));
        assert!(!is_known_unit_code("STK"));
    }

    #[test]
    fn lists_are_sorted() {
        for list in [COUNTRY_CODES, CURRENCY_CODES, UNIT_CODES] {
            for window in list.windows(2) {
                assert!(window[0] < window[1], "{} >= {}", window[0], window[1]);
            }
        }
    }
}
