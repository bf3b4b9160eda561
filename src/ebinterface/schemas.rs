//! Element tables for the supported ebInterface versions.
//!
//! The tables follow the element order of each schema. Structures the
//! converter and the report never read are declared open, so they are
//! accepted where they may occur without being checked in depth.
//! Differences between versions are expressed through the capability
//! methods on [`EbInterfaceVersion`].

use std::collections::BTreeMap;

use super::schema::{CompiledSchema, ElementDecl, Particle, SimpleType};
use super::{EbInterfaceVersion, TaxLayout};

use SimpleType::*;

pub const DOCUMENT_TYPES: &[&str] = &[
    "CreditMemo",
    "FinalSettlement",
    "Invoice",
    "InvoiceForAdvancePayment",
    "InvoiceForPartialDelivery",
    "SelfBilling",
    "SubsequentCredit",
    "SubsequentDebit",
];

/// Compile the schema of a supported version; `None` otherwise.
pub fn compile(version: EbInterfaceVersion) -> Option<CompiledSchema> {
    version
        .is_supported()
        .then(|| CompiledSchema::new(version, invoice(version)))
}

/// Compiled schemas of all supported versions, keyed by version.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: BTreeMap<EbInterfaceVersion, CompiledSchema>,
}

impl SchemaRegistry {
    pub fn compile_all() -> Self {
        let schemas = EbInterfaceVersion::SUPPORTED
            .into_iter()
            .filter_map(|v| compile(v).map(|s| (v, s)))
            .collect();
        Self { schemas }
    }

    pub fn get(&self, version: EbInterfaceVersion) -> Option<&CompiledSchema> {
        self.schemas.get(&version)
    }

    pub fn versions(&self) -> impl Iterator<Item = EbInterfaceVersion> + '_ {
        self.schemas.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

fn invoice(v: EbInterfaceVersion) -> ElementDecl {
    let mut children: Vec<Particle> = vec![
        ElementDecl::simple("InvoiceNumber", Text).into(),
        ElementDecl::simple("InvoiceDate", Date).into(),
    ];
    if v.has_document_references() {
        children.extend([
            ElementDecl::open("CancelledOriginalDocument")
                .optional()
                .into(),
            ElementDecl::open("RelatedDocument").any().into(),
        ]);
    }
    children.extend([
        delivery(v).into(),
        biller(v).into(),
        recipient(v).into(),
        ElementDecl::open("OrderingParty").optional().into(),
        details(v).into(),
        ElementDecl::open("ReductionAndSurchargeDetails")
            .optional()
            .into(),
        tax(v).into(),
        ElementDecl::simple("TotalGrossAmount", Decimal).into(),
    ]);
    if v.has_document_references() {
        children.extend([
            ElementDecl::simple("PrepaidAmount", Decimal)
                .optional()
                .into(),
            ElementDecl::simple("RoundingAmount", Decimal)
                .optional()
                .into(),
        ]);
    }
    if v.has_payable_amount() {
        children.push(ElementDecl::simple("PayableAmount", Decimal).into());
    }
    children.extend([
        payment_method(v).into(),
        payment_conditions().into(),
        ElementDecl::simple("Comment", Text).optional().into(),
    ]);

    let mut root = ElementDecl::complex("Invoice", children)
        .attr("GeneratingSystem", Text, true)
        .attr("DocumentType", Enumeration(DOCUMENT_TYPES), true)
        .attr("InvoiceCurrency", CurrencyCode, true)
        .attr("ManualProcessing", Boolean, false)
        .attr("DocumentTitle", Text, false)
        .attr("Language", Token, false);
    if v.has_duplicate_flag() {
        root = root.attr("IsDuplicate", Boolean, false);
    }
    root
}

fn delivery(v: EbInterfaceVersion) -> ElementDecl {
    ElementDecl::complex(
        "Delivery",
        vec![
            ElementDecl::simple("DeliveryID", Text).optional().into(),
            Particle::Choice {
                options: vec![
                    ElementDecl::simple("Date", Date),
                    ElementDecl::complex(
                        "Period",
                        vec![
                            ElementDecl::simple("FromDate", Date).into(),
                            ElementDecl::simple("ToDate", Date).into(),
                        ],
                    ),
                ],
                min_occurs: 1,
            },
            address(v).optional().into(),
            ElementDecl::simple("Description", Text).optional().into(),
        ],
    )
    .optional()
}

fn address(v: EbInterfaceVersion) -> ElementDecl {
    let mut children: Vec<Particle> = vec![
        ElementDecl::simple("AddressIdentifier", Text)
            .attr("AddressIdentifierType", Token, false)
            .any()
            .into(),
        ElementDecl::simple("Salutation", Text).optional().into(),
        ElementDecl::simple("Name", Text).into(),
        ElementDecl::simple("Street", Text).optional().into(),
        ElementDecl::simple("POBox", Text).optional().into(),
        ElementDecl::simple("Town", Text).into(),
        ElementDecl::simple("ZIP", Text).into(),
        ElementDecl::simple("Country", Text)
            .attr("CountryCode", CountryCode, false)
            .into(),
        ElementDecl::simple("Phone", Text).any().into(),
        ElementDecl::simple("Email", Text).any().into(),
    ];
    if !v.has_contact_element() {
        children.push(ElementDecl::simple("Contact", Text).optional().into());
    }
    ElementDecl::complex("Address", children)
}

fn contact() -> ElementDecl {
    ElementDecl::complex(
        "Contact",
        vec![
            ElementDecl::simple("Salutation", Text).optional().into(),
            ElementDecl::simple("Name", Text).into(),
            ElementDecl::simple("Phone", Text).any().into(),
            ElementDecl::simple("Email", Text).any().into(),
        ],
    )
    .optional()
}

fn further_identification() -> ElementDecl {
    ElementDecl::simple("FurtherIdentification", Text)
        .attr("IdentificationType", Text, true)
        .any()
}

fn order_reference() -> ElementDecl {
    ElementDecl::complex(
        "OrderReference",
        vec![
            ElementDecl::simple("OrderID", Text).into(),
            ElementDecl::simple("ReferenceDate", Date).optional().into(),
            ElementDecl::simple("Description", Text).optional().into(),
        ],
    )
    .optional()
}

fn biller(v: EbInterfaceVersion) -> ElementDecl {
    let mut children: Vec<Particle> = vec![
        ElementDecl::simple("VATIdentificationNumber", Text).into(),
        ElementDecl::simple("InvoiceRecipientsBillerID", Text)
            .optional()
            .into(),
        further_identification().into(),
        order_reference().into(),
        address(v).into(),
    ];
    if v.has_contact_element() {
        children.push(contact().into());
    }
    ElementDecl::complex("Biller", children)
}

fn recipient(v: EbInterfaceVersion) -> ElementDecl {
    let mut children: Vec<Particle> = vec![
        ElementDecl::simple("VATIdentificationNumber", Text).into(),
        ElementDecl::simple("BillersInvoiceRecipientID", Text)
            .optional()
            .into(),
        ElementDecl::simple("AccountingArea", Text).optional().into(),
        ElementDecl::simple("SubOrganizationID", Text).optional().into(),
        further_identification().into(),
        order_reference().into(),
        address(v).into(),
    ];
    if v.has_contact_element() {
        children.push(contact().into());
    }
    ElementDecl::complex("InvoiceRecipient", children)
}

fn tax_percent() -> ElementDecl {
    ElementDecl::simple("TaxPercent", Percent).attr("TaxCategoryCode", Token, true)
}

fn line_tax(v: EbInterfaceVersion) -> ElementDecl {
    match v.tax_layout() {
        TaxLayout::VatRate => ElementDecl::simple("TaxRate", Percent).attr("TaxCode", Token, false),
        TaxLayout::TaxItem => ElementDecl::complex(
            "TaxItem",
            vec![
                ElementDecl::simple("TaxableAmount", Decimal).into(),
                tax_percent().into(),
                ElementDecl::simple("TaxAmount", Decimal).optional().into(),
            ],
        ),
    }
}

fn details(v: EbInterfaceVersion) -> ElementDecl {
    let line = ElementDecl::complex(
        "ListLineItem",
        vec![
            ElementDecl::simple("PositionNumber", Integer).optional().into(),
            ElementDecl::simple("Description", Text).many().into(),
            ElementDecl::simple("ArticleNumber", Text)
                .attr("ArticleNumberType", Token, false)
                .any()
                .into(),
            ElementDecl::simple("Quantity", Decimal)
                .attr("Unit", Token, true)
                .into(),
            ElementDecl::simple("UnitPrice", Decimal)
                .attr("BaseQuantity", Decimal, false)
                .into(),
            line_tax(v).into(),
            ElementDecl::simple("DiscountFlag", Boolean).optional().into(),
            ElementDecl::open("ReductionAndSurchargeListLineItemDetails")
                .optional()
                .into(),
            delivery(v).into(),
            ElementDecl::open("BillersOrderReference").optional().into(),
            ElementDecl::open("InvoiceRecipientsOrderReference")
                .optional()
                .into(),
            ElementDecl::open("AdditionalInformation").optional().into(),
            ElementDecl::simple("LineItemAmount", Decimal).into(),
        ],
    )
    .many();

    ElementDecl::complex(
        "Details",
        vec![
            ElementDecl::simple("HeaderDescription", Text).optional().into(),
            ElementDecl::complex(
                "ItemList",
                vec![
                    ElementDecl::simple("HeaderDescription", Text).optional().into(),
                    line.into(),
                    ElementDecl::simple("FooterDescription", Text).optional().into(),
                ],
            )
            .many()
            .into(),
            ElementDecl::complex(
                "BelowTheLineItem",
                vec![
                    ElementDecl::simple("Description", Text).into(),
                    ElementDecl::simple("ReferenceDate", Date).optional().into(),
                    ElementDecl::simple("LineItemAmount", Decimal).into(),
                ],
            )
            .any()
            .into(),
            ElementDecl::simple("FooterDescription", Text).optional().into(),
        ],
    )
}

fn tax(v: EbInterfaceVersion) -> ElementDecl {
    let children: Vec<Particle> = match v.tax_layout() {
        TaxLayout::VatRate => vec![
            ElementDecl::complex(
                "VAT",
                vec![
                    ElementDecl::complex(
                        "Item",
                        vec![
                            ElementDecl::simple("TaxedAmount", Decimal).into(),
                            ElementDecl::simple("TaxRate", Percent)
                                .attr("TaxCode", Token, false)
                                .into(),
                            ElementDecl::simple("Amount", Decimal).into(),
                        ],
                    )
                    .many()
                    .into(),
                ],
            )
            .into(),
        ],
        TaxLayout::TaxItem => vec![
            ElementDecl::complex(
                "TaxItem",
                vec![
                    ElementDecl::simple("TaxableAmount", Decimal).into(),
                    tax_percent().into(),
                    ElementDecl::simple("TaxAmount", Decimal).into(),
                ],
            )
            .many()
            .into(),
        ],
    };
    ElementDecl::complex("Tax", children)
}

fn payment_method(v: EbInterfaceVersion) -> ElementDecl {
    let account = ElementDecl::complex(
        "BeneficiaryAccount",
        vec![
            ElementDecl::simple("BankName", Text).optional().into(),
            ElementDecl::simple("BIC", Bic).optional().into(),
            ElementDecl::simple("IBAN", Iban).into(),
            ElementDecl::simple("BankAccountOwner", Text).optional().into(),
        ],
    )
    .many();

    let mut options = vec![
        ElementDecl::empty("NoPayment"),
        ElementDecl::open("DirectDebit"),
        ElementDecl::complex(
            "UniversalBankTransaction",
            vec![
                account.into(),
                ElementDecl::simple("PaymentReference", Text)
                    .attr("CheckSum", Text, false)
                    .optional()
                    .into(),
            ],
        )
        .attr("ConsolidatorPayable", Boolean, false),
    ];
    if v.has_payment_card() {
        options.push(ElementDecl::complex(
            "PaymentCard",
            vec![
                ElementDecl::simple("PrimaryAccountNumber", Text).into(),
                ElementDecl::simple("CardHolderName", Text).optional().into(),
            ],
        ));
    }

    ElementDecl::complex(
        "PaymentMethod",
        vec![
            ElementDecl::simple("Comment", Text).optional().into(),
            Particle::Choice {
                options,
                min_occurs: 1,
            },
        ],
    )
    .optional()
}

fn payment_conditions() -> ElementDecl {
    let discount = ElementDecl::complex(
        "Discount",
        vec![
            ElementDecl::simple("PaymentDate", Date).into(),
            ElementDecl::simple("BaseAmount", Decimal).optional().into(),
            Particle::Choice {
                options: vec![
                    ElementDecl::simple("Percentage", Percent),
                    ElementDecl::simple("Amount", Decimal),
                ],
                min_occurs: 0,
            },
        ],
    )
    .any();

    ElementDecl::complex(
        "PaymentConditions",
        vec![
            ElementDecl::simple("DueDate", Date).into(),
            discount.into(),
            ElementDecl::simple("MinimumPayment", Decimal).optional().into(),
            ElementDecl::simple("Comment", Text).optional().into(),
        ],
    )
    .optional()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ebinterface::schema::Content;

    #[test]
    fn compiles_every_supported_version() {
        let registry = SchemaRegistry::compile_all();
        assert_eq!(registry.len(), EbInterfaceVersion::SUPPORTED.len());
        for v in EbInterfaceVersion::SUPPORTED {
            let schema = registry.get(v).unwrap();
            assert_eq!(schema.namespace, v.namespace());
            assert_eq!(schema.root.name, "Invoice");
        }
        assert!(registry.get(EbInterfaceVersion::V61).is_none());
        assert!(compile(EbInterfaceVersion::V30).is_none());
    }

    #[test]
    fn duplicate_flag_only_before_5_0() {
        let has_flag = |v| {
            compile(v)
                .unwrap()
                .root
                .attributes
                .iter()
                .any(|a| a.name == "IsDuplicate")
        };
        assert!(has_flag(EbInterfaceVersion::V42));
        assert!(!has_flag(EbInterfaceVersion::V50));
    }

    #[test]
    fn document_references_start_with_4_1() {
        let children = |v| match compile(v).unwrap().root.content {
            Content::Complex(particles) => particles
                .iter()
                .filter_map(|p| match p {
                    Particle::Element(decl) => Some(decl.name),
                    Particle::Choice { .. } => None,
                })
                .collect::<Vec<_>>(),
            _ => Vec::new(),
        };
        let v40 = children(EbInterfaceVersion::V40);
        assert!(!v40.contains(&"PrepaidAmount"));
        assert!(v40.contains(&"OrderingParty"));
        let v43 = children(EbInterfaceVersion::V43);
        for name in ["RelatedDocument", "PrepaidAmount", "RoundingAmount", "ReductionAndSurchargeDetails"] {
            assert!(v43.contains(&name), "{name}");
        }
    }
}
