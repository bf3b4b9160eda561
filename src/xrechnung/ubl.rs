use super::xml_utils::{XmlWriter, format_decimal};
use super::{PEPPOL_PROFILE_ID, XRECHNUNG_CUSTOMIZATION_ID, ubl_ns};
use crate::core::*;

/// Serialise an invoice as XRechnung UBL 2.1.
///
/// Type code 381 produces a `CreditNote` document, everything else an
/// `Invoice`. Totals must have been calculated.
pub fn to_ubl_xml(invoice: &Invoice) -> Result<String, EbiError> {
    let totals = invoice.totals.as_ref().ok_or_else(|| {
        EbiError::Builder("totals must be calculated before XML generation".into())
    })?;

    let currency = invoice.currency_code.as_str();
    let credit_note = invoice.type_code == InvoiceTypeCode::CreditNote;
    let (root, root_ns, type_element) = if credit_note {
        ("ubl:CreditNote", ubl_ns::CREDIT_NOTE, "cbc:CreditNoteTypeCode")
    } else {
        ("ubl:Invoice", ubl_ns::INVOICE, "cbc:InvoiceTypeCode")
    };

    let mut w = XmlWriter::new()?;
    w.start(
        root,
        &[
            ("xmlns:ubl", root_ns),
            ("xmlns:cac", ubl_ns::CAC),
            ("xmlns:cbc", ubl_ns::CBC),
        ],
    )?;

    // BT-24, BT-23
    w.text("cbc:CustomizationID", XRECHNUNG_CUSTOMIZATION_ID)?;
    w.text("cbc:ProfileID", PEPPOL_PROFILE_ID)?;
    // BT-1, BT-2
    w.text("cbc:ID", &invoice.number)?;
    w.text("cbc:IssueDate", &invoice.issue_date.to_string())?;
    // BT-9 (Invoice only; CreditNote carries it in PaymentMeans)
    if !credit_note {
        if let Some(due) = &invoice.due_date {
            w.text("cbc:DueDate", &due.to_string())?;
        }
    }
    w.text(type_element, &invoice.type_code.code().to_string())?;
    for note in &invoice.notes {
        w.text("cbc:Note", note)?;
    }
    w.text("cbc:DocumentCurrencyCode", currency)?;
    // BT-10: Leitweg-ID
    w.opt_text("cbc:BuyerReference", invoice.buyer_reference.as_deref())?;

    if let Some(period) = &invoice.invoicing_period {
        w.group("cac:InvoicePeriod", |w| {
            w.text("cbc:StartDate", &period.start.to_string())?;
            w.text("cbc:EndDate", &period.end.to_string())?;
            Ok(())
        })?;
    }
    if let Some(order) = &invoice.order_reference {
        w.group("cac:OrderReference", |w| {
            w.text("cbc:ID", order)?;
            Ok(())
        })?;
    }

    write_party(&mut w, &invoice.seller, "cac:AccountingSupplierParty")?;
    write_party(&mut w, &invoice.buyer, "cac:AccountingCustomerParty")?;

    // BT-72
    if let Some(date) = &invoice.delivery_date {
        w.group("cac:Delivery", |w| {
            w.text("cbc:ActualDeliveryDate", &date.to_string())?;
            Ok(())
        })?;
    }

    // BG-16
    if let Some(payment) = &invoice.payment {
        w.group("cac:PaymentMeans", |w| {
            w.text("cbc:PaymentMeansCode", &payment.means_code.code().to_string())?;
            if credit_note {
                if let Some(due) = &invoice.due_date {
                    w.text("cbc:PaymentDueDate", &due.to_string())?;
                }
            }
            w.opt_text("cbc:PaymentID", payment.remittance_info.as_deref())?;
            if let Some(ct) = &payment.credit_transfer {
                w.group("cac:PayeeFinancialAccount", |w| {
                    w.text("cbc:ID", &ct.iban)?;
                    w.opt_text("cbc:Name", ct.account_name.as_deref())?;
                    if let Some(bic) = &ct.bic {
                        w.group("cac:FinancialInstitutionBranch", |w| {
                            w.text("cbc:ID", bic)?;
                            Ok(())
                        })?;
                    }
                    Ok(())
                })?;
            }
            Ok(())
        })?;
    }

    // BT-20
    if let Some(terms) = &invoice.payment_terms {
        w.group("cac:PaymentTerms", |w| {
            w.text("cbc:Note", terms)?;
            Ok(())
        })?;
    }

    // BG-23
    w.group("cac:TaxTotal", |w| {
        w.amount("cbc:TaxAmount", totals.vat_total, currency)?;
        for breakdown in &totals.vat_breakdown {
            w.group("cac:TaxSubtotal", |w| {
                w.amount("cbc:TaxableAmount", breakdown.taxable_amount, currency)?;
                w.amount("cbc:TaxAmount", breakdown.tax_amount, currency)?;
                w.group("cac:TaxCategory", |w| {
                    w.text("cbc:ID", breakdown.category.code())?;
                    w.text("cbc:Percent", &format_decimal(breakdown.rate))?;
                    w.opt_text(
                        "cbc:TaxExemptionReasonCode",
                        breakdown.exemption_reason_code.as_deref(),
                    )?;
                    vat_scheme(w)
                })?;
                Ok(())
            })?;
        }
        Ok(())
    })?;

    // BG-22
    w.group("cac:LegalMonetaryTotal", |w| {
        w.amount("cbc:LineExtensionAmount", totals.line_net_total, currency)?;
        w.amount("cbc:TaxExclusiveAmount", totals.net_total, currency)?;
        w.amount("cbc:TaxInclusiveAmount", totals.gross_total, currency)?;
        if !totals.prepaid.is_zero() {
            w.amount("cbc:PrepaidAmount", totals.prepaid, currency)?;
        }
        w.amount("cbc:PayableAmount", totals.amount_due, currency)?;
        Ok(())
    })?;

    // BG-25
    for line in &invoice.lines {
        write_line(&mut w, line, currency, credit_note)?;
    }

    w.end(root)?;
    w.into_string()
}

fn vat_scheme(w: &mut XmlWriter) -> Result<(), EbiError> {
    w.group("cac:TaxScheme", |w| {
        w.text("cbc:ID", "VAT")?;
        Ok(())
    })?;
    Ok(())
}

fn write_party(w: &mut XmlWriter, party: &Party, wrapper: &str) -> Result<(), EbiError> {
    w.start(wrapper, &[])?;
    w.group("cac:Party", |w| {
        // BT-34 / BT-49
        if let Some(ea) = &party.electronic_address {
            w.text_with_attrs("cbc:EndpointID", &ea.value, &[("schemeID", ea.scheme.as_str())])?;
        }
        // BT-29 / BT-46
        if let Some(id) = &party.identifier {
            w.group("cac:PartyIdentification", |w| {
                w.text("cbc:ID", id)?;
                Ok(())
            })?;
        }
        w.group("cac:PostalAddress", |w| {
            w.opt_text("cbc:StreetName", party.address.street.as_deref())?;
            w.text("cbc:CityName", &party.address.city)?;
            w.text("cbc:PostalZone", &party.address.postal_code)?;
            w.group("cac:Country", |w| {
                w.text("cbc:IdentificationCode", &party.address.country_code)?;
                Ok(())
            })?;
            Ok(())
        })?;
        // BT-31 / BT-48
        if let Some(vat_id) = &party.vat_id {
            w.group("cac:PartyTaxScheme", |w| {
                w.text("cbc:CompanyID", vat_id)?;
                vat_scheme(w)
            })?;
        }
        w.group("cac:PartyLegalEntity", |w| {
            w.text("cbc:RegistrationName", &party.name)?;
            Ok(())
        })?;
        // BG-6 / BG-9
        if let Some(contact) = &party.contact {
            w.group("cac:Contact", |w| {
                w.opt_text("cbc:Name", contact.name.as_deref())?;
                w.opt_text("cbc:Telephone", contact.phone.as_deref())?;
                w.opt_text("cbc:ElectronicMail", contact.email.as_deref())?;
                Ok(())
            })?;
        }
        Ok(())
    })?;
    w.end(wrapper)?;
    Ok(())
}

fn write_line(
    w: &mut XmlWriter,
    line: &LineItem,
    currency: &str,
    credit_note: bool,
) -> Result<(), EbiError> {
    let (element, quantity) = if credit_note {
        ("cac:CreditNoteLine", "cbc:CreditedQuantity")
    } else {
        ("cac:InvoiceLine", "cbc:InvoicedQuantity")
    };
    w.group(element, |w| {
        w.text("cbc:ID", &line.id)?;
        w.quantity(quantity, line.quantity, &line.unit)?;
        if let Some(amount) = line.line_amount {
            w.amount("cbc:LineExtensionAmount", amount, currency)?;
        }
        w.group("cac:Item", |w| {
            w.opt_text("cbc:Description", line.description.as_deref())?;
            w.text("cbc:Name", &line.item_name)?;
            if let Some(id) = &line.seller_item_id {
                w.group("cac:SellersItemIdentification", |w| {
                    w.text("cbc:ID", id)?;
                    Ok(())
                })?;
            }
            w.group("cac:ClassifiedTaxCategory", |w| {
                w.text("cbc:ID", line.tax_category.code())?;
                w.text("cbc:Percent", &format_decimal(line.tax_rate))?;
                vat_scheme(w)
            })?;
            Ok(())
        })?;
        w.group("cac:Price", |w| {
            w.amount("cbc:PriceAmount", line.unit_price, currency)?;
            Ok(())
        })?;
        Ok(())
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn party(name: &str, email: &str) -> Party {
        Party {
            name: name.into(),
            vat_id: Some("ATU12345678".into()),
            identifier: None,
            address: Address {
                street: Some("Hauptstraße 1".into()),
                city: "Wien".into(),
                postal_code: "1010".into(),
                country_code: "AT".into(),
            },
            contact: Some(Contact {
                name: Some("Anna".into()),
                phone: Some("+43 1 234".into()),
                email: Some(email.into()),
            }),
            electronic_address: Some(ElectronicAddress {
                scheme: "EM".into(),
                value: email.into(),
            }),
        }
    }

    fn invoice(type_code: InvoiceTypeCode) -> Invoice {
        let mut invoice = Invoice {
            number: "R-1".into(),
            issue_date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2024, 6, 1),
            type_code,
            currency_code: "EUR".into(),
            notes: vec!["Danke & Gruß".into()],
            buyer_reference: Some("04011000-12345-67".into()),
            order_reference: None,
            seller: party("Muster GmbH", "office@muster.at"),
            buyer: party("Amt", "post@amt.de"),
            lines: vec![LineItem {
                id: "1".into(),
                quantity: dec!(3),
                unit: "C62".into(),
                unit_price: dec!(10),
                tax_category: TaxCategory::StandardRate,
                tax_rate: dec!(20),
                item_name: "Widget".into(),
                description: None,
                seller_item_id: Some("W-1".into()),
                line_amount: None,
            }],
            totals: None,
            payment_terms: None,
            payment: Some(PaymentInstructions {
                means_code: PaymentMeansCode::SepaCreditTransfer,
                remittance_info: Some("R-1".into()),
                credit_transfer: Some(CreditTransfer {
                    iban: "AT611904300234573201".into(),
                    bic: Some("BKAUATWW".into()),
                    account_name: None,
                }),
            }),
            delivery_date: None,
            invoicing_period: None,
        };
        calculate_totals(&mut invoice, dec!(0)).unwrap();
        invoice
    }

    #[test]
    fn writes_invoice() {
        let xml = to_ubl_xml(&invoice(InvoiceTypeCode::Invoice)).unwrap();
        assert!(xml.contains(ubl_ns::INVOICE));
        assert!(xml.contains("<cbc:InvoiceTypeCode>380</cbc:InvoiceTypeCode>"));
        assert!(xml.contains("<cbc:BuyerReference>04011000-12345-67</cbc:BuyerReference>"));
        assert!(xml.contains("<cbc:Note>Danke &amp; Gruß</cbc:Note>"));
        assert!(xml.contains(r#"<cbc:InvoicedQuantity unitCode="C62">3.00</cbc:InvoicedQuantity>"#));
        assert!(xml.contains(r#"<cbc:PayableAmount currencyID="EUR">36.00</cbc:PayableAmount>"#));
        assert!(xml.contains("<cbc:DueDate>2024-06-01</cbc:DueDate>"));
        assert!(!xml.contains("PrepaidAmount"));
    }

    #[test]
    fn writes_credit_note() {
        let xml = to_ubl_xml(&invoice(InvoiceTypeCode::CreditNote)).unwrap();
        assert!(xml.contains("<ubl:CreditNote"));
        assert!(xml.contains("<cbc:CreditNoteTypeCode>381</cbc:CreditNoteTypeCode>"));
        assert!(xml.contains("<cac:CreditNoteLine>"));
        assert!(xml.contains("<cbc:PaymentDueDate>2024-06-01</cbc:PaymentDueDate>"));
        assert!(!xml.contains("<cac:InvoiceLine>"));
    }

    #[test]
    fn requires_totals() {
        let mut inv = invoice(InvoiceTypeCode::Invoice);
        inv.totals = None;
        assert!(matches!(to_ubl_xml(&inv), Err(EbiError::Builder(_))));
    }
}
