use serde::Serialize;

/// Every ebInterface version the classifier recognises.
///
/// Only a subset is supported for validation and conversion; see
/// [`EbInterfaceVersion::SUPPORTED`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum EbInterfaceVersion {
    V30,
    V302,
    V40,
    V41,
    V42,
    V43,
    V50,
    V60,
    V61,
}

/// How taxes are expressed in a document of a given version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxLayout {
    /// 4.0 – 4.2: `TaxRate` on lines, `Tax/VAT/Item` on document level.
    VatRate,
    /// 4.3 and later: `TaxItem` with `TaxPercent/@TaxCategoryCode`.
    TaxItem,
}

impl EbInterfaceVersion {
    pub const ALL: [EbInterfaceVersion; 9] = [
        Self::V30,
        Self::V302,
        Self::V40,
        Self::V41,
        Self::V42,
        Self::V43,
        Self::V50,
        Self::V60,
        Self::V61,
    ];

    /// Versions with a compiled schema and a converter.
    pub const SUPPORTED: [EbInterfaceVersion; 5] =
        [Self::V40, Self::V41, Self::V42, Self::V43, Self::V50];

    pub fn namespace(&self) -> &'static str {
        match self {
            Self::V30 => "http://www.ebinterface.at/schema/3p0/",
            Self::V302 => "http://www.ebinterface.at/schema/3p02/",
            Self::V40 => "http://www.ebinterface.at/schema/4p0/",
            Self::V41 => "http://www.ebinterface.at/schema/4p1/",
            Self::V42 => "http://www.ebinterface.at/schema/4p2/",
            Self::V43 => "http://www.ebinterface.at/schema/4p3/",
            Self::V50 => "http://www.ebinterface.at/schema/5p0/",
            Self::V60 => "http://www.ebinterface.at/schema/6p0/",
            Self::V61 => "http://www.ebinterface.at/schema/6p1/",
        }
    }

    pub fn from_namespace(ns: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.namespace() == ns)
    }

    /// Display form, e.g. "4.3" or "3.02".
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V30 => "3.0",
            Self::V302 => "3.02",
            Self::V40 => "4.0",
            Self::V41 => "4.1",
            Self::V42 => "4.2",
            Self::V43 => "4.3",
            Self::V50 => "5.0",
            Self::V60 => "6.0",
            Self::V61 => "6.1",
        }
    }

    pub fn is_supported(&self) -> bool {
        Self::SUPPORTED.contains(self)
    }

    pub fn tax_layout(&self) -> TaxLayout {
        match self {
            Self::V30 | Self::V302 | Self::V40 | Self::V41 | Self::V42 => TaxLayout::VatRate,
            Self::V43 | Self::V50 | Self::V60 | Self::V61 => TaxLayout::TaxItem,
        }
    }

    /// 5.0 moved contact details out of the address into a `Contact` element.
    pub fn has_contact_element(&self) -> bool {
        *self >= Self::V50
    }

    /// `PayableAmount` became mandatory with 4.1.
    pub fn has_payable_amount(&self) -> bool {
        *self >= Self::V41
    }

    /// 4.1 added `CancelledOriginalDocument`, `RelatedDocument`,
    /// `PrepaidAmount` and `RoundingAmount`.
    pub fn has_document_references(&self) -> bool {
        *self >= Self::V41
    }

    pub fn has_payment_card(&self) -> bool {
        *self >= Self::V42
    }

    /// The `IsDuplicate` attribute was dropped in 5.0.
    pub fn has_duplicate_flag(&self) -> bool {
        *self < Self::V50
    }

    /// Comma separated list of supported versions for user messages.
    pub fn supported_list() -> String {
        Self::SUPPORTED
            .iter()
            .map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for EbInterfaceVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaces_round_trip() {
        for v in EbInterfaceVersion::ALL {
            assert_eq!(EbInterfaceVersion::from_namespace(v.namespace()), Some(v));
        }
        assert_eq!(
            EbInterfaceVersion::from_namespace("http://www.ebinterface.at/schema/4p4/"),
            None
        );
    }

    #[test]
    fn layout_changes_with_4_3() {
        assert_eq!(EbInterfaceVersion::V42.tax_layout(), TaxLayout::VatRate);
        assert_eq!(EbInterfaceVersion::V43.tax_layout(), TaxLayout::TaxItem);
        assert!(!EbInterfaceVersion::V40.has_payable_amount());
        assert!(EbInterfaceVersion::V41.has_payable_amount());
        assert!(EbInterfaceVersion::V50.has_contact_element());
        assert!(!EbInterfaceVersion::V40.has_document_references());
        assert!(!EbInterfaceVersion::V41.has_payment_card());
        assert!(EbInterfaceVersion::V42.has_payment_card());
    }

    #[test]
    fn supported_list_is_human_readable() {
        assert_eq!(EbInterfaceVersion::supported_list(), "4.0, 4.1, 4.2, 4.3, 5.0");
        assert!(!EbInterfaceVersion::V302.is_supported());
        assert!(!EbInterfaceVersion::V61.is_supported());
    }
}
