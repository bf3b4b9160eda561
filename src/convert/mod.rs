//! ebInterface → XRechnung mapping.
//!
//! The converter never fails outright. Problems are collected as
//! [`ErrorItem`]s next to a best-effort [`Invoice`]; a single error-severity
//! item makes the result unusable (see [`ConversionOutcome::usable`]).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use crate::core::codes::is_known_unit_code;
use crate::core::*;
use crate::ebinterface::{
    Delivery, DocumentType, EbiInvoice, EbiLine, EbiParty, PaymentMethod,
};
use crate::xrechnung::validate_xrechnung;

/// ebInterface placeholder for "no VAT identification number".
const NO_VAT_ID: &str = "00000000";

/// Tolerated difference between recalculated and declared gross total.
const TOTAL_TOLERANCE: Decimal = dec!(0.01);

/// Result of a conversion: best-effort invoice plus all findings.
#[derive(Debug, Clone)]
pub struct ConversionOutcome {
    pub invoice: Option<Invoice>,
    pub errors: ErrorList,
}

impl ConversionOutcome {
    /// The invoice, unless an error-severity finding makes it unusable.
    pub fn usable(&self) -> Option<&Invoice> {
        if self.errors.contains_error() {
            None
        } else {
            self.invoice.as_ref()
        }
    }

    pub fn has_errors(&self) -> bool {
        self.errors.contains_error()
    }
}

/// Converts validated ebInterface documents to the XRechnung model.
#[derive(Debug, Clone, Copy)]
pub struct XRechnungConverter {
    /// Language of the findings.
    display_locale: Locale,
    /// Number formatting of amounts quoted in findings.
    content_locale: Locale,
}

impl Default for XRechnungConverter {
    fn default() -> Self {
        Self::new(Locale::DE_AT, Locale::DE_AT)
    }
}

impl XRechnungConverter {
    pub fn new(display_locale: Locale, content_locale: Locale) -> Self {
        Self {
            display_locale,
            content_locale,
        }
    }

    pub fn convert(&self, source: &EbiInvoice) -> ConversionOutcome {
        let mut mapper = Mapper {
            display: self.display_locale,
            content: self.content_locale,
            errors: ErrorList::new(),
        };
        let mut invoice = mapper.map(source);

        let prepaid = mapper.prepaid(source);
        match calculate_totals(&mut invoice, prepaid) {
            Ok(()) => mapper.compare_totals(source, &invoice),
            Err(e) => mapper.out_of_range("/Invoice/Details", &e),
        }

        for finding in validate_xrechnung(&invoice, self.display_locale) {
            let duplicate = mapper
                .errors
                .iter()
                .any(|e| e.rule.is_some() && e.rule == finding.rule);
            if !duplicate {
                mapper.errors.push(finding);
            }
        }

        debug!(
            number = %invoice.number,
            findings = mapper.errors.len(),
            "mapped ebInterface {} document",
            source.version
        );
        ConversionOutcome {
            invoice: Some(invoice),
            errors: mapper.errors,
        }
    }
}

struct Mapper {
    display: Locale,
    content: Locale,
    errors: ErrorList,
}

impl Mapper {
    fn say(&self, de: String, en: String) -> String {
        if self.display.is_german() { de } else { en }
    }

    fn map(&mut self, src: &EbiInvoice) -> Invoice {
        let type_code = match src.document_type {
            DocumentType::CreditMemo => InvoiceTypeCode::CreditNote,
            DocumentType::SelfBilling => InvoiceTypeCode::SelfBilled,
            DocumentType::InvoiceForAdvancePayment => InvoiceTypeCode::Prepayment,
            _ => InvoiceTypeCode::Invoice,
        };

        let buyer_reference = src.order_reference.as_ref().map(|o| o.order_id.clone());
        if buyer_reference.is_none() {
            let message = self.say(
                "Die Leitweg-ID (OrderID der Auftragsreferenz des Rechnungsempfängers) fehlt".into(),
                "The Leitweg-ID (order ID in the invoice recipient's order reference) is missing"
                    .into(),
            );
            self.errors.push(
                ErrorItem::error("/Invoice/InvoiceRecipient/OrderReference/OrderID", message)
                    .with_rule("BR-DE-15"),
            );
        }

        let notes = [
            &src.header_description,
            &src.footer_description,
            &src.comment,
        ]
        .into_iter()
        .flatten()
        .cloned()
        .collect();

        let (delivery_date, invoicing_period) = match &src.delivery {
            Some(Delivery::Date(d)) => (Some(*d), None),
            Some(Delivery::Period { from, to }) => (
                None,
                Some(Period {
                    start: *from,
                    end: *to,
                }),
            ),
            None => (None, None),
        };

        let lines = src
            .lines
            .iter()
            .enumerate()
            .map(|(i, line)| self.line(i, line))
            .collect();

        Invoice {
            number: src.number.clone(),
            issue_date: src.date,
            due_date: src.due_date,
            type_code,
            currency_code: src.currency.clone(),
            notes,
            buyer_reference,
            order_reference: None,
            seller: self.party(&src.biller, "/Invoice/Biller", true),
            buyer: self.party(&src.recipient, "/Invoice/InvoiceRecipient", false),
            lines,
            totals: None,
            payment_terms: src
                .payment_conditions_comment
                .clone()
                .or_else(|| src.payment_comment.clone()),
            payment: self.payment(src),
            delivery_date,
            invoicing_period,
        }
    }

    fn party(&mut self, src: &EbiParty, path: &str, seller: bool) -> Party {
        let country_code = match &src.address.country_code {
            Some(code) => code.clone(),
            None => {
                let country = &src.address.country;
                let message = self.say(
                    format!("Für das Land '{country}' ist kein ISO-Ländercode angegeben"),
                    format!("No ISO country code is given for country '{country}'"),
                );
                self.errors.push(ErrorItem::error(
                    format!("{path}/Address/Country/@CountryCode"),
                    message,
                ));
                String::new()
            }
        };

        let email = src.emails().next().map(String::from);
        let phone = src.phones().next().map(String::from);
        let name = src.contact_name().map(String::from);
        // The buyer contact is optional in XRechnung; only carry it when present.
        let contact = if seller || name.is_some() || phone.is_some() {
            Some(Contact {
                name,
                phone,
                email: email.clone(),
            })
        } else {
            None
        };

        Party {
            name: src.address.name.clone(),
            vat_id: Some(src.vat_id.trim())
                .filter(|v| !v.is_empty() && *v != NO_VAT_ID)
                .map(String::from),
            identifier: src.partner_id.clone(),
            address: Address {
                street: src.address.street.clone().or_else(|| src.address.po_box.clone()),
                city: src.address.town.clone(),
                postal_code: src.address.zip.clone(),
                country_code,
            },
            contact,
            electronic_address: email.map(|value| ElectronicAddress {
                scheme: "EM".into(),
                value,
            }),
        }
    }

    fn line(&mut self, index: usize, src: &EbiLine) -> LineItem {
        let field = |name: &str| format!("lines[{}].{name}", index + 1);

        if !is_known_unit_code(&src.unit) {
            let unit = &src.unit;
            let message = self.say(
                format!("Die Mengeneinheit '{unit}' ist kein bekannter UN/ECE-Rec-20-Code"),
                format!("The unit '{unit}' is not a known UN/ECE Rec 20 code"),
            );
            self.errors.push(ErrorItem::warning(field("unit"), message));
        }

        let tax_category = match &src.tax.category_code {
            Some(code) => TaxCategory::from_code(code).unwrap_or_else(|| {
                let message = self.say(
                    format!("Die Steuerkategorie '{code}' kann nicht nach XRechnung abgebildet werden"),
                    format!("The tax category '{code}' cannot be mapped to XRechnung"),
                );
                self.errors
                    .push(ErrorItem::error(field("tax_category"), message));
                TaxCategory::StandardRate
            }),
            None if src.tax.percent.is_zero() => TaxCategory::ZeroRated,
            None => TaxCategory::StandardRate,
        };

        let unit_price = match src.base_quantity {
            Some(base) if !base.is_zero() => match src.unit_price.checked_div(base) {
                Some(price) => price,
                None => {
                    let err = EbiError::AmountOverflow(format!(
                        "unit price {} per {} units",
                        src.unit_price, base
                    ));
                    self.out_of_range(&field("unit_price"), &err);
                    src.unit_price
                }
            },
            _ => src.unit_price,
        };

        let mut descriptions = src.descriptions.iter();
        let item_name = descriptions.next().cloned().unwrap_or_default();
        let rest: Vec<&str> = descriptions.map(String::as_str).collect();

        LineItem {
            id: src
                .position
                .map_or_else(|| (index + 1).to_string(), |p| p.to_string()),
            quantity: src.quantity,
            unit: src.unit.clone(),
            unit_price,
            tax_category,
            tax_rate: src.tax.percent,
            item_name,
            description: (!rest.is_empty()).then(|| rest.join("\n")),
            seller_item_id: src.article_numbers.first().cloned(),
            line_amount: None,
        }
    }

    fn payment(&mut self, src: &EbiInvoice) -> Option<PaymentInstructions> {
        match &src.payment {
            None => {
                let message = self.say(
                    "Das Dokument enthält keine Zahlungsanweisung".into(),
                    "The document contains no payment method".into(),
                );
                self.errors
                    .push(ErrorItem::error("/Invoice/PaymentMethod", message).with_rule("BR-DE-1"));
                None
            }
            Some(PaymentMethod::NoPayment) => {
                let message = self.say(
                    "Keine Zahlung vorgesehen; als Zahlungsart 30 abgebildet".into(),
                    "No payment expected; mapped to payment means 30".into(),
                );
                self.errors
                    .push(ErrorItem::warning("/Invoice/PaymentMethod/NoPayment", message));
                Some(PaymentInstructions {
                    means_code: PaymentMeansCode::CreditTransfer,
                    remittance_info: None,
                    credit_transfer: None,
                })
            }
            Some(PaymentMethod::DirectDebit) => Some(PaymentInstructions {
                means_code: PaymentMeansCode::SepaDirectDebit,
                remittance_info: None,
                credit_transfer: None,
            }),
            Some(PaymentMethod::PaymentCard { .. }) => Some(PaymentInstructions {
                means_code: PaymentMeansCode::BankCard,
                remittance_info: None,
                credit_transfer: None,
            }),
            Some(PaymentMethod::BankTransfer {
                accounts,
                reference,
            }) => {
                if accounts.len() > 1 {
                    let message = self.say(
                        format!(
                            "{} Empfängerkonten angegeben; nur das erste wird übernommen",
                            accounts.len()
                        ),
                        format!(
                            "{} beneficiary accounts given; only the first is used",
                            accounts.len()
                        ),
                    );
                    self.errors.push(ErrorItem::warning(
                        "/Invoice/PaymentMethod/UniversalBankTransaction",
                        message,
                    ));
                }
                Some(PaymentInstructions {
                    means_code: PaymentMeansCode::SepaCreditTransfer,
                    remittance_info: reference.clone(),
                    credit_transfer: accounts.first().map(|a| CreditTransfer {
                        iban: a.iban.clone(),
                        bic: a.bic.clone(),
                        account_name: a.owner.clone(),
                    }),
                })
            }
        }
    }

    /// Amount already paid: declared gross minus declared payable amount.
    fn prepaid(&mut self, src: &EbiInvoice) -> Decimal {
        let Some(payable) = src.payable else {
            return Decimal::ZERO;
        };
        let Some(prepaid) = src.total_gross.checked_sub(payable) else {
            let err = EbiError::AmountOverflow("gross total minus payable amount".into());
            self.out_of_range("/Invoice/PayableAmount", &err);
            return Decimal::ZERO;
        };
        if prepaid.is_sign_negative() && !prepaid.is_zero() {
            let message = self.say(
                format!(
                    "Der zu zahlende Betrag {} übersteigt den Gesamtbetrag {}",
                    self.content.format_amount(payable),
                    self.content.format_amount(src.total_gross)
                ),
                format!(
                    "The payable amount {} exceeds the gross total {}",
                    self.content.format_amount(payable),
                    self.content.format_amount(src.total_gross)
                ),
            );
            self.errors
                .push(ErrorItem::warning("/Invoice/PayableAmount", message));
            return Decimal::ZERO;
        }
        prepaid
    }

    /// Error finding for an amount the calculation cannot represent.
    fn out_of_range(&mut self, field: &str, err: &EbiError) {
        let message = self.say(
            format!("Der Betrag liegt außerhalb des darstellbaren Wertebereichs ({err})"),
            format!("The amount is outside the representable range ({err})"),
        );
        self.errors.push(ErrorItem::error(field, message));
    }

    fn compare_totals(&mut self, src: &EbiInvoice, invoice: &Invoice) {
        let Some(totals) = &invoice.totals else {
            return;
        };
        let differs = totals
            .gross_total
            .checked_sub(src.total_gross)
            .is_none_or(|diff| diff.abs() > TOTAL_TOLERANCE);
        if differs {
            let calculated = self.content.format_amount(totals.gross_total);
            let declared = self.content.format_amount(src.total_gross);
            let message = self.say(
                format!("Der berechnete Gesamtbetrag {calculated} weicht vom angegebenen Gesamtbetrag {declared} ab"),
                format!("The calculated gross total {calculated} differs from the declared gross total {declared}"),
            );
            self.errors
                .push(ErrorItem::warning("/Invoice/TotalGrossAmount", message));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ebinterface::*;
    use chrono::NaiveDate;

    fn party(name: &str, email: Option<&str>) -> EbiParty {
        EbiParty {
            vat_id: "ATU12345678".into(),
            partner_id: None,
            address: EbiAddress {
                salutation: None,
                name: name.into(),
                street: Some("Hauptplatz 1".into()),
                po_box: None,
                town: "Graz".into(),
                zip: "8010".into(),
                country: "Österreich".into(),
                country_code: Some("AT".into()),
                phones: vec!["+43 316 1".into()],
                emails: email.into_iter().map(String::from).collect(),
                contact: Some("Eva Berger".into()),
            },
            contact: None,
        }
    }

    fn source() -> EbiInvoice {
        EbiInvoice {
            version: EbInterfaceVersion::V43,
            generating_system: "test".into(),
            document_type: DocumentType::Invoice,
            currency: "EUR".into(),
            document_title: None,
            language: None,
            number: "2024-17".into(),
            date: NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(),
            delivery: Some(Delivery::Date(NaiveDate::from_ymd_opt(2024, 3, 28).unwrap())),
            biller: party("Berger KG", Some("office@berger.at")),
            recipient: party("Stadt Graz", Some("rechnung@graz.at")),
            order_reference: Some(OrderReference {
                order_id: "991-01234-56".into(),
                reference_date: None,
                description: None,
            }),
            header_description: Some("Wartung".into()),
            footer_description: None,
            lines: vec![EbiLine {
                position: Some(1),
                descriptions: vec!["Service".into(), "März".into()],
                article_numbers: vec!["S-1".into()],
                quantity: dec!(4),
                unit: "HUR".into(),
                unit_price: dec!(80),
                base_quantity: None,
                tax: LineTax {
                    percent: dec!(20),
                    category_code: Some("S".into()),
                },
                amount: dec!(320),
            }],
            taxes: vec![],
            total_gross: dec!(384),
            payable: Some(dec!(384)),
            payment: Some(PaymentMethod::BankTransfer {
                accounts: vec![BankAccount {
                    bank_name: None,
                    bic: Some("BKAUATWW".into()),
                    iban: "AT611904300234573201".into(),
                    owner: Some("Berger KG".into()),
                }],
                reference: Some("2024-17".into()),
            }),
            payment_comment: None,
            due_date: None,
            payment_conditions_comment: None,
            comment: None,
        }
    }

    #[test]
    fn clean_document_converts_without_findings() {
        let outcome = XRechnungConverter::default().convert(&source());
        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        let invoice = outcome.usable().unwrap();
        assert_eq!(invoice.buyer_reference.as_deref(), Some("991-01234-56"));
        assert_eq!(invoice.lines[0].item_name, "Service");
        assert_eq!(invoice.lines[0].description.as_deref(), Some("März"));
        assert_eq!(invoice.totals.as_ref().unwrap().gross_total, dec!(384.00));
        assert_eq!(invoice.payment.as_ref().unwrap().means_code.code(), 58);
        assert_eq!(
            invoice.seller.contact.as_ref().unwrap().name.as_deref(),
            Some("Eva Berger")
        );
    }

    #[test]
    fn missing_order_reference_is_reported_once() {
        let mut src = source();
        src.order_reference = None;
        let outcome = XRechnungConverter::default().convert(&src);
        assert!(outcome.usable().is_none());
        assert!(outcome.invoice.is_some());
        let hits: Vec<_> = outcome
            .errors
            .iter()
            .filter(|e| e.rule.as_deref() == Some("BR-DE-15"))
            .collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].field, "/Invoice/InvoiceRecipient/OrderReference/OrderID");
    }

    #[test]
    fn warnings_keep_output_usable() {
        let mut src = source();
        src.lines[0].unit = "XYZ".into();
        src.total_gross = dec!(400);
        src.payable = Some(dec!(400));
        let outcome = XRechnungConverter::new(Locale::EN_GB, Locale::EN_GB).convert(&src);
        assert_eq!(outcome.errors.warnings().count(), 2);
        assert!(outcome.usable().is_some());
        assert!(
            outcome
                .errors
                .iter()
                .any(|e| e.message.contains("384.00") && e.message.contains("400.00"))
        );
    }

    #[test]
    fn placeholder_vat_id_is_dropped() {
        let mut src = source();
        src.recipient.vat_id = NO_VAT_ID.into();
        let outcome = XRechnungConverter::default().convert(&src);
        assert!(outcome.invoice.unwrap().buyer.vat_id.is_none());
    }

    #[test]
    fn unmappable_tax_category_is_an_error() {
        let mut src = source();
        src.lines[0].tax.category_code = Some("XX".into());
        let outcome = XRechnungConverter::default().convert(&src);
        assert!(outcome.has_errors());
        assert!(outcome.errors.iter().any(|e| e.field == "lines[1].tax_category"));
    }

    #[test]
    fn payment_variants() {
        let mut src = source();
        src.payment = Some(PaymentMethod::NoPayment);
        let outcome = XRechnungConverter::default().convert(&src);
        assert_eq!(outcome.usable().unwrap().payment.as_ref().unwrap().means_code.code(), 30);
        assert_eq!(outcome.errors.warnings().count(), 1);

        src.payment = Some(PaymentMethod::DirectDebit);
        let outcome = XRechnungConverter::default().convert(&src);
        assert_eq!(outcome.usable().unwrap().payment.as_ref().unwrap().means_code.code(), 59);

        src.payment = Some(PaymentMethod::PaymentCard {
            account_number: "4111111111111111".into(),
            holder: None,
        });
        let outcome = XRechnungConverter::default().convert(&src);
        assert_eq!(outcome.usable().unwrap().payment.as_ref().unwrap().means_code.code(), 48);

        src.payment = None;
        let outcome = XRechnungConverter::default().convert(&src);
        let rules: Vec<_> = outcome.errors.iter().filter_map(|e| e.rule.as_deref()).collect();
        assert_eq!(rules, vec!["BR-DE-1"]);
    }

    #[test]
    fn overflowing_amounts_are_errors_not_panics() {
        let mut src = source();
        src.lines[0].unit_price = Decimal::MAX;
        src.lines[0].quantity = dec!(2);
        let outcome = XRechnungConverter::new(Locale::EN_GB, Locale::EN_GB).convert(&src);
        assert!(outcome.usable().is_none());
        let item = outcome
            .errors
            .iter()
            .find(|e| e.field == "/Invoice/Details")
            .unwrap();
        assert!(item.message.contains("representable range"));

        let mut src = source();
        src.lines[0].base_quantity = Some(dec!(0.0000000001));
        src.lines[0].unit_price = Decimal::MAX;
        let outcome = XRechnungConverter::default().convert(&src);
        assert!(outcome.errors.iter().any(|e| e.field == "lines[1].unit_price"));

        let mut src = source();
        src.total_gross = Decimal::MIN;
        src.payable = Some(Decimal::MAX);
        let outcome = XRechnungConverter::default().convert(&src);
        assert!(outcome.errors.iter().any(|e| e.field == "/Invoice/PayableAmount"));
    }

    #[test]
    fn prepaid_amount_from_payable() {
        let mut src = source();
        src.payable = Some(dec!(284));
        let outcome = XRechnungConverter::default().convert(&src);
        let totals = outcome.invoice.unwrap().totals.unwrap();
        assert_eq!(totals.prepaid, dec!(100));
        assert_eq!(totals.amount_due, dec!(284.00));
    }
}
