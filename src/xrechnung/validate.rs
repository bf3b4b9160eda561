use crate::core::*;

/// Invoice type codes permitted by BR-DE-17.
const ALLOWED_TYPE_CODES: [u16; 8] = [326, 380, 381, 384, 389, 875, 876, 877];

/// Payment means codes permitted by BR-DE-23.
const ALLOWED_MEANS_CODES: [u16; 6] = [30, 48, 54, 55, 58, 59];

/// Check the XRechnung national rules (BR-DE-*) on a mapped invoice.
///
/// Every finding has error severity; messages are in the language of
/// `locale`.
pub fn validate_xrechnung(invoice: &Invoice, locale: Locale) -> ErrorList {
    let mut errors = ErrorList::new();
    let mut fail = |field: &str, rule: &str, de: &str, en: &str| {
        errors.push(ErrorItem::error(field, locale.pick(de, en)).with_rule(rule));
    };

    if invoice.payment.is_none() {
        fail(
            "payment",
            "BR-DE-1",
            "XRechnung verlangt Zahlungsanweisungen (BG-16)",
            "XRechnung requires payment instructions (BG-16)",
        );
    }

    match &invoice.seller.contact {
        None => fail(
            "seller.contact",
            "BR-DE-2",
            "XRechnung verlangt einen Ansprechpartner des Verkäufers (BG-6)",
            "XRechnung requires seller contact information (BG-6)",
        ),
        Some(contact) => {
            if is_blank(&contact.name) {
                fail(
                    "seller.contact.name",
                    "BR-DE-5",
                    "Name des Ansprechpartners des Verkäufers fehlt (BT-41)",
                    "Seller contact name is missing (BT-41)",
                );
            }
            if is_blank(&contact.phone) {
                fail(
                    "seller.contact.phone",
                    "BR-DE-6",
                    "Telefonnummer des Ansprechpartners des Verkäufers fehlt (BT-42)",
                    "Seller contact telephone is missing (BT-42)",
                );
            }
            if is_blank(&contact.email) {
                fail(
                    "seller.contact.email",
                    "BR-DE-7",
                    "E-Mail-Adresse des Ansprechpartners des Verkäufers fehlt (BT-43)",
                    "Seller contact e-mail is missing (BT-43)",
                );
            }
        }
    }

    if is_blank(&invoice.buyer_reference) {
        fail(
            "buyer_reference",
            "BR-DE-15",
            "Die Leitweg-ID / Käuferreferenz fehlt (BT-10)",
            "The buyer reference / Leitweg-ID is missing (BT-10)",
        );
    }

    if invoice.seller.vat_id.is_none() {
        fail(
            "seller.vat_id",
            "BR-DE-16",
            "Die Umsatzsteuer-Identifikationsnummer des Verkäufers fehlt (BT-31)",
            "The seller VAT identifier is missing (BT-31)",
        );
    }

    if !ALLOWED_TYPE_CODES.contains(&invoice.type_code.code()) {
        fail(
            "type_code",
            "BR-DE-17",
            "Der Rechnungstyp ist in XRechnung nicht zulässig",
            "The invoice type code is not allowed in XRechnung",
        );
    }

    if let Some(payment) = &invoice.payment {
        let code = payment.means_code.code();
        if !ALLOWED_MEANS_CODES.contains(&code) {
            fail(
                "payment.means_code",
                "BR-DE-23",
                "Die Zahlungsart ist in XRechnung nicht zulässig",
                "The payment means code is not allowed in XRechnung",
            );
        }
        if code == 58
            && payment
                .credit_transfer
                .as_ref()
                .is_none_or(|ct| ct.iban.trim().is_empty())
        {
            fail(
                "payment.credit_transfer.iban",
                "BR-DE-24",
                "Eine SEPA-Überweisung verlangt eine IBAN (BT-84)",
                "A SEPA credit transfer requires an IBAN (BT-84)",
            );
        }
    }

    if invoice.seller.electronic_address.is_none() {
        fail(
            "seller.electronic_address",
            "BR-DE-26",
            "Die elektronische Adresse des Verkäufers fehlt (BT-34)",
            "The seller electronic address is missing (BT-34)",
        );
    }
    if invoice.buyer.electronic_address.is_none() {
        fail(
            "buyer.electronic_address",
            "BR-DE-28",
            "Die elektronische Adresse des Käufers fehlt (BT-49)",
            "The buyer electronic address is missing (BT-49)",
        );
    }

    errors
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bare_invoice() -> Invoice {
        let party = |name: &str| Party {
            name: name.into(),
            vat_id: None,
            identifier: None,
            address: Address {
                street: None,
                city: "Wien".into(),
                postal_code: "1010".into(),
                country_code: "AT".into(),
            },
            contact: None,
            electronic_address: None,
        };
        Invoice {
            number: "1".into(),
            issue_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            due_date: None,
            type_code: InvoiceTypeCode::Invoice,
            currency_code: "EUR".into(),
            notes: vec![],
            buyer_reference: None,
            order_reference: None,
            seller: party("S"),
            buyer: party("B"),
            lines: vec![],
            totals: None,
            payment_terms: None,
            payment: None,
            delivery_date: None,
            invoicing_period: None,
        }
    }

    fn rules(errors: &ErrorList) -> Vec<&str> {
        errors.iter().filter_map(|e| e.rule.as_deref()).collect()
    }

    #[test]
    fn bare_invoice_violates_mandatory_rules() {
        let errors = validate_xrechnung(&bare_invoice(), Locale::EN_GB);
        assert_eq!(
            rules(&errors),
            vec!["BR-DE-1", "BR-DE-2", "BR-DE-15", "BR-DE-16", "BR-DE-26", "BR-DE-28"]
        );
        assert!(errors.iter().all(|e| e.severity == Severity::Error));
    }

    #[test]
    fn messages_follow_locale() {
        let de = validate_xrechnung(&bare_invoice(), Locale::DE_AT);
        let first = de.iter().next().unwrap();
        assert!(first.message.starts_with("XRechnung verlangt"));
    }

    #[test]
    fn complete_contact_and_sepa_account() {
        let mut invoice = bare_invoice();
        invoice.seller.contact = Some(Contact {
            name: Some("Anna".into()),
            phone: Some(" ".into()),
            email: Some("anna@example.at".into()),
        });
        invoice.payment = Some(PaymentInstructions {
            means_code: PaymentMeansCode::SepaCreditTransfer,
            remittance_info: None,
            credit_transfer: None,
        });
        let errors = validate_xrechnung(&invoice, Locale::EN_GB);
        let found = rules(&errors);
        assert!(found.contains(&"BR-DE-6"));
        assert!(found.contains(&"BR-DE-24"));
        assert!(!found.contains(&"BR-DE-1"));
        assert!(!found.contains(&"BR-DE-5"));
    }
}
