//! Read an [`EbiInvoice`] out of a schema-valid element tree.
//!
//! The schema guarantees presence and lexical form of every value read
//! here; a violation still surfaces as [`EbiError::Xml`] instead of a panic.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::model::*;
use super::tree::XmlElement;
use super::{EbInterfaceVersion, TaxLayout};
use crate::core::EbiError;

pub fn read_invoice(
    version: EbInterfaceVersion,
    root: &XmlElement,
) -> Result<EbiInvoice, EbiError> {
    let document_type = attr(root, "DocumentType")?;
    let document_type = DocumentType::parse(document_type)
        .ok_or_else(|| EbiError::Xml(format!("unknown DocumentType '{document_type}'")))?;

    let recipient_el = child(root, "InvoiceRecipient")?;
    let details = child(root, "Details")?;
    let payment_method = root.child("PaymentMethod");
    let conditions = root.child("PaymentConditions");

    let lines = details
        .select("ItemList/ListLineItem")
        .into_iter()
        .map(|line| read_line(version, line))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(EbiInvoice {
        version,
        generating_system: attr(root, "GeneratingSystem")?.to_string(),
        document_type,
        currency: attr(root, "InvoiceCurrency")?.to_string(),
        document_title: root.attribute("DocumentTitle").map(String::from),
        language: root.attribute("Language").map(String::from),
        number: text(root, "InvoiceNumber")?.to_string(),
        date: date(root, "InvoiceDate")?,
        delivery: root.child("Delivery").map(read_delivery).transpose()?,
        biller: read_party(child(root, "Biller")?, "InvoiceRecipientsBillerID")?,
        recipient: read_party(recipient_el, "BillersInvoiceRecipientID")?,
        order_reference: recipient_el
            .child("OrderReference")
            .map(read_order_reference)
            .transpose()?,
        header_description: opt_text(details, "HeaderDescription"),
        footer_description: opt_text(details, "FooterDescription"),
        lines,
        taxes: read_taxes(version, child(root, "Tax")?)?,
        total_gross: decimal(root, "TotalGrossAmount")?,
        payable: root
            .child("PayableAmount")
            .map(|_| decimal(root, "PayableAmount"))
            .transpose()?,
        payment: payment_method.map(read_payment).transpose()?,
        payment_comment: payment_method.and_then(|p| opt_text(p, "Comment")),
        due_date: conditions.map(|c| date(c, "DueDate")).transpose()?,
        payment_conditions_comment: conditions.and_then(|c| opt_text(c, "Comment")),
        comment: opt_text(root, "Comment"),
    })
}

fn read_delivery(el: &XmlElement) -> Result<Delivery, EbiError> {
    match el.child("Period") {
        Some(period) => Ok(Delivery::Period {
            from: date(period, "FromDate")?,
            to: date(period, "ToDate")?,
        }),
        None => Ok(Delivery::Date(date(el, "Date")?)),
    }
}

fn read_party(el: &XmlElement, partner_id_element: &str) -> Result<EbiParty, EbiError> {
    let address = child(el, "Address")?;
    let country = child(address, "Country")?;
    Ok(EbiParty {
        vat_id: text(el, "VATIdentificationNumber")?.to_string(),
        partner_id: opt_text(el, partner_id_element),
        address: EbiAddress {
            salutation: opt_text(address, "Salutation"),
            name: text(address, "Name")?.to_string(),
            street: opt_text(address, "Street"),
            po_box: opt_text(address, "POBox"),
            town: text(address, "Town")?.to_string(),
            zip: text(address, "ZIP")?.to_string(),
            country: country.text.clone(),
            country_code: country.attribute("CountryCode").map(String::from),
            phones: all_text(address, "Phone"),
            emails: all_text(address, "Email"),
            contact: opt_text(address, "Contact"),
        },
        contact: el
            .child("Contact")
            .map(|c| -> Result<EbiContact, EbiError> {
                Ok(EbiContact {
                    salutation: opt_text(c, "Salutation"),
                    name: text(c, "Name")?.to_string(),
                    phones: all_text(c, "Phone"),
                    emails: all_text(c, "Email"),
                })
            })
            .transpose()?,
    })
}

fn read_order_reference(el: &XmlElement) -> Result<OrderReference, EbiError> {
    Ok(OrderReference {
        order_id: text(el, "OrderID")?.to_string(),
        reference_date: el
            .child("ReferenceDate")
            .map(|_| date(el, "ReferenceDate"))
            .transpose()?,
        description: opt_text(el, "Description"),
    })
}

fn read_line(version: EbInterfaceVersion, el: &XmlElement) -> Result<EbiLine, EbiError> {
    let quantity = child(el, "Quantity")?;
    let unit_price = child(el, "UnitPrice")?;
    let tax = match version.tax_layout() {
        TaxLayout::VatRate => {
            let rate = child(el, "TaxRate")?;
            LineTax {
                percent: parse_decimal(&rate.text, "TaxRate")?,
                category_code: rate.attribute("TaxCode").map(String::from),
            }
        }
        TaxLayout::TaxItem => {
            let percent = child(child(el, "TaxItem")?, "TaxPercent")?;
            LineTax {
                percent: parse_decimal(&percent.text, "TaxPercent")?,
                category_code: percent.attribute("TaxCategoryCode").map(String::from),
            }
        }
    };

    Ok(EbiLine {
        position: el
            .child_text("PositionNumber")
            .map(|p| {
                p.parse::<u64>()
                    .map_err(|e| EbiError::Xml(format!("PositionNumber '{p}': {e}")))
            })
            .transpose()?,
        descriptions: all_text(el, "Description"),
        article_numbers: all_text(el, "ArticleNumber"),
        quantity: parse_decimal(&quantity.text, "Quantity")?,
        unit: quantity.attribute("Unit").unwrap_or_default().to_string(),
        unit_price: parse_decimal(&unit_price.text, "UnitPrice")?,
        base_quantity: unit_price
            .attribute("BaseQuantity")
            .map(|q| parse_decimal(q, "BaseQuantity"))
            .transpose()?,
        tax,
        amount: decimal(el, "LineItemAmount")?,
    })
}

fn read_taxes(version: EbInterfaceVersion, tax: &XmlElement) -> Result<Vec<EbiTax>, EbiError> {
    match version.tax_layout() {
        TaxLayout::VatRate => tax
            .select("VAT/Item")
            .into_iter()
            .map(|item| -> Result<EbiTax, EbiError> {
                let rate = child(item, "TaxRate")?;
                Ok(EbiTax {
                    taxable_amount: decimal(item, "TaxedAmount")?,
                    percent: parse_decimal(&rate.text, "TaxRate")?,
                    category_code: rate.attribute("TaxCode").map(String::from),
                    amount: decimal(item, "Amount")?,
                })
            })
            .collect(),
        TaxLayout::TaxItem => tax
            .children_named("TaxItem")
            .map(|item| -> Result<EbiTax, EbiError> {
                let percent = child(item, "TaxPercent")?;
                Ok(EbiTax {
                    taxable_amount: decimal(item, "TaxableAmount")?,
                    percent: parse_decimal(&percent.text, "TaxPercent")?,
                    category_code: percent.attribute("TaxCategoryCode").map(String::from),
                    amount: decimal(item, "TaxAmount")?,
                })
            })
            .collect(),
    }
}

fn read_payment(el: &XmlElement) -> Result<PaymentMethod, EbiError> {
    if el.child("NoPayment").is_some() {
        return Ok(PaymentMethod::NoPayment);
    }
    if el.child("DirectDebit").is_some() {
        return Ok(PaymentMethod::DirectDebit);
    }
    if let Some(card) = el.child("PaymentCard") {
        return Ok(PaymentMethod::PaymentCard {
            account_number: text(card, "PrimaryAccountNumber")?.to_string(),
            holder: opt_text(card, "CardHolderName"),
        });
    }
    let transfer = child(el, "UniversalBankTransaction")?;
    let accounts = transfer
        .children_named("BeneficiaryAccount")
        .map(|a| -> Result<BankAccount, EbiError> {
            Ok(BankAccount {
                bank_name: opt_text(a, "BankName"),
                bic: opt_text(a, "BIC"),
                iban: text(a, "IBAN")?.to_string(),
                owner: opt_text(a, "BankAccountOwner"),
            })
        })
        .collect::<Result<Vec<_>, EbiError>>()?;
    Ok(PaymentMethod::BankTransfer {
        accounts,
        reference: opt_text(transfer, "PaymentReference"),
    })
}

fn child<'a>(el: &'a XmlElement, name: &str) -> Result<&'a XmlElement, EbiError> {
    el.child(name)
        .ok_or_else(|| EbiError::Xml(format!("<{}> has no <{name}>", el.name)))
}

fn text<'a>(el: &'a XmlElement, name: &str) -> Result<&'a str, EbiError> {
    el.child_text(name)
        .ok_or_else(|| EbiError::Xml(format!("<{}> has no <{name}>", el.name)))
}

fn opt_text(el: &XmlElement, name: &str) -> Option<String> {
    el.child_text(name).map(String::from)
}

fn all_text(el: &XmlElement, name: &str) -> Vec<String> {
    el.children_named(name)
        .filter(|c| !c.text.is_empty())
        .map(|c| c.text.clone())
        .collect()
}

fn attr<'a>(el: &'a XmlElement, name: &str) -> Result<&'a str, EbiError> {
    el.attribute(name)
        .ok_or_else(|| EbiError::Xml(format!("<{}> has no attribute {name}", el.name)))
}

fn date(el: &XmlElement, name: &str) -> Result<NaiveDate, EbiError> {
    let value = text(el, name)?;
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| EbiError::Xml(format!("{name} '{value}': {e}")))
}

fn decimal(el: &XmlElement, name: &str) -> Result<Decimal, EbiError> {
    parse_decimal(text(el, name)?, name)
}

fn parse_decimal(value: &str, name: &str) -> Result<Decimal, EbiError> {
    Decimal::from_str(value.trim()).map_err(|e| EbiError::Xml(format!("{name} '{value}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ebinterface::parse_tree;
    use rust_decimal_macros::dec;

    const V42: &str = r#"<Invoice xmlns="http://www.ebinterface.at/schema/4p2/"
        GeneratingSystem="test" DocumentType="CreditMemo" InvoiceCurrency="EUR">
      <InvoiceNumber>GS-7</InvoiceNumber>
      <InvoiceDate>2024-03-01</InvoiceDate>
      <Delivery><Period><FromDate>2024-02-01</FromDate><ToDate>2024-02-29</ToDate></Period></Delivery>
      <Biller>
        <VATIdentificationNumber>ATU12345678</VATIdentificationNumber>
        <Address><Name>Muster GmbH</Name><Town>Wien</Town><ZIP>1010</ZIP>
          <Country CountryCode="AT">Österreich</Country><Email>office@muster.at</Email>
          <Contact>Max Muster</Contact></Address>
      </Biller>
      <InvoiceRecipient>
        <VATIdentificationNumber>00000000</VATIdentificationNumber>
        <OrderReference><OrderID>04011000-12345-67</OrderID></OrderReference>
        <Address><Name>Amt</Name><Town>Berlin</Town><ZIP>10115</ZIP><Country CountryCode="DE">Deutschland</Country></Address>
      </InvoiceRecipient>
      <Details><ItemList><ListLineItem>
        <Description>Beratung</Description>
        <Quantity Unit="HUR">2</Quantity><UnitPrice>100.00</UnitPrice>
        <TaxRate TaxCode="S">20</TaxRate><LineItemAmount>200.00</LineItemAmount>
      </ListLineItem></ItemList></Details>
      <Tax><VAT><Item><TaxedAmount>200.00</TaxedAmount><TaxRate>20</TaxRate><Amount>40.00</Amount></Item></VAT></Tax>
      <TotalGrossAmount>240.00</TotalGrossAmount>
      <PayableAmount>240.00</PayableAmount>
      <PaymentMethod><UniversalBankTransaction><BeneficiaryAccount><IBAN>AT611904300234573201</IBAN></BeneficiaryAccount>
        <PaymentReference>GS-7</PaymentReference></UniversalBankTransaction></PaymentMethod>
      <PaymentConditions><DueDate>2024-03-15</DueDate></PaymentConditions>
    </Invoice>"#;

    #[test]
    fn reads_vat_rate_layout() {
        let tree = parse_tree(V42.as_bytes()).unwrap();
        let invoice = read_invoice(EbInterfaceVersion::V42, &tree).unwrap();
        assert_eq!(invoice.document_type, DocumentType::CreditMemo);
        assert_eq!(invoice.number, "GS-7");
        assert!(matches!(invoice.delivery, Some(Delivery::Period { .. })));
        assert_eq!(invoice.biller.contact_name(), Some("Max Muster"));
        assert_eq!(invoice.biller.address.country_code.as_deref(), Some("AT"));
        assert_eq!(
            invoice.order_reference.as_ref().map(|o| o.order_id.as_str()),
            Some("04011000-12345-67")
        );
        assert_eq!(invoice.lines.len(), 1);
        assert_eq!(invoice.lines[0].tax.percent, dec!(20));
        assert_eq!(invoice.lines[0].tax.category_code.as_deref(), Some("S"));
        assert_eq!(invoice.taxes[0].amount, dec!(40.00));
        assert_eq!(invoice.amount_payable(), dec!(240.00));
        assert_eq!(invoice.due_date, NaiveDate::from_ymd_opt(2024, 3, 15));
        match invoice.payment {
            Some(PaymentMethod::BankTransfer { accounts, reference }) => {
                assert_eq!(accounts[0].iban, "AT611904300234573201");
                assert_eq!(reference.as_deref(), Some("GS-7"));
            }
            other => panic!("unexpected payment {other:?}"),
        }
    }

    #[test]
    fn missing_element_is_an_error_not_a_panic() {
        let tree = parse_tree(
            br#"<Invoice xmlns="http://www.ebinterface.at/schema/4p2/" GeneratingSystem="x"
                DocumentType="Invoice" InvoiceCurrency="EUR"/>"#,
        )
        .unwrap();
        assert!(matches!(
            read_invoice(EbInterfaceVersion::V42, &tree),
            Err(EbiError::Xml(_))
        ));
    }
}
