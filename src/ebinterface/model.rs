use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::EbInterfaceVersion;
use crate::core::checked_sum;

/// Typed ebInterface invoice, read from a schema-valid document.
///
/// Fields that changed shape between versions are normalised: 4.x tax
/// rates and 4.3+ tax items both end up in [`LineTax`] / [`EbiTax`], and
/// the 4.x address contact string and the 5.0 `Contact` element both end
/// up in [`EbiParty::contact_name`].
#[derive(Debug, Clone, Serialize)]
pub struct EbiInvoice {
    pub version: EbInterfaceVersion,
    pub generating_system: String,
    pub document_type: DocumentType,
    pub currency: String,
    pub document_title: Option<String>,
    pub language: Option<String>,
    pub number: String,
    pub date: NaiveDate,
    pub delivery: Option<Delivery>,
    pub biller: EbiParty,
    pub recipient: EbiParty,
    pub order_reference: Option<OrderReference>,
    pub header_description: Option<String>,
    pub footer_description: Option<String>,
    pub lines: Vec<EbiLine>,
    pub taxes: Vec<EbiTax>,
    pub total_gross: Decimal,
    /// Absent in 4.0.
    pub payable: Option<Decimal>,
    pub payment: Option<PaymentMethod>,
    pub payment_comment: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub payment_conditions_comment: Option<String>,
    pub comment: Option<String>,
}

impl EbiInvoice {
    /// Sum of all line amounts; `None` if it overflows.
    pub fn net_total(&self) -> Option<Decimal> {
        checked_sum(self.lines.iter().map(|l| l.amount), "net total").ok()
    }

    /// Sum of the document level tax amounts; `None` if it overflows.
    pub fn tax_total(&self) -> Option<Decimal> {
        checked_sum(self.taxes.iter().map(|t| t.amount), "tax total").ok()
    }

    /// Amount still to be paid; falls back to the gross total for 4.0.
    pub fn amount_payable(&self) -> Decimal {
        self.payable.unwrap_or(self.total_gross)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DocumentType {
    CreditMemo,
    FinalSettlement,
    Invoice,
    InvoiceForAdvancePayment,
    InvoiceForPartialDelivery,
    SelfBilling,
    SubsequentCredit,
    SubsequentDebit,
}

impl DocumentType {
    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "CreditMemo" => Self::CreditMemo,
            "FinalSettlement" => Self::FinalSettlement,
            "Invoice" => Self::Invoice,
            "InvoiceForAdvancePayment" => Self::InvoiceForAdvancePayment,
            "InvoiceForPartialDelivery" => Self::InvoiceForPartialDelivery,
            "SelfBilling" => Self::SelfBilling,
            "SubsequentCredit" => Self::SubsequentCredit,
            "SubsequentDebit" => Self::SubsequentDebit,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreditMemo => "CreditMemo",
            Self::FinalSettlement => "FinalSettlement",
            Self::Invoice => "Invoice",
            Self::InvoiceForAdvancePayment => "InvoiceForAdvancePayment",
            Self::InvoiceForPartialDelivery => "InvoiceForPartialDelivery",
            Self::SelfBilling => "SelfBilling",
            Self::SubsequentCredit => "SubsequentCredit",
            Self::SubsequentDebit => "SubsequentDebit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Delivery {
    Date(NaiveDate),
    Period { from: NaiveDate, to: NaiveDate },
}

/// Biller or invoice recipient.
#[derive(Debug, Clone, Serialize)]
pub struct EbiParty {
    pub vat_id: String,
    /// `InvoiceRecipientsBillerID` or `BillersInvoiceRecipientID`.
    pub partner_id: Option<String>,
    pub address: EbiAddress,
    /// 5.0 `Contact` element.
    pub contact: Option<EbiContact>,
}

impl EbiParty {
    /// E-mail addresses, contact element first.
    pub fn emails(&self) -> impl Iterator<Item = &str> {
        self.contact
            .iter()
            .flat_map(|c| c.emails.iter())
            .chain(self.address.emails.iter())
            .map(String::as_str)
    }

    pub fn phones(&self) -> impl Iterator<Item = &str> {
        self.contact
            .iter()
            .flat_map(|c| c.phones.iter())
            .chain(self.address.phones.iter())
            .map(String::as_str)
    }

    pub fn contact_name(&self) -> Option<&str> {
        self.contact
            .as_ref()
            .map(|c| c.name.as_str())
            .or(self.address.contact.as_deref())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EbiAddress {
    pub salutation: Option<String>,
    pub name: String,
    pub street: Option<String>,
    pub po_box: Option<String>,
    pub town: String,
    pub zip: String,
    /// Country name as written in the document.
    pub country: String,
    pub country_code: Option<String>,
    pub phones: Vec<String>,
    pub emails: Vec<String>,
    /// 4.x free-text contact person.
    pub contact: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EbiContact {
    pub salutation: Option<String>,
    pub name: String,
    pub phones: Vec<String>,
    pub emails: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderReference {
    pub order_id: String,
    pub reference_date: Option<NaiveDate>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EbiLine {
    pub position: Option<u64>,
    pub descriptions: Vec<String>,
    pub article_numbers: Vec<String>,
    pub quantity: Decimal,
    pub unit: String,
    pub unit_price: Decimal,
    pub base_quantity: Option<Decimal>,
    pub tax: LineTax,
    pub amount: Decimal,
}

/// Tax of one line: 4.x `TaxRate` or 4.3+ `TaxItem`.
#[derive(Debug, Clone, Serialize)]
pub struct LineTax {
    pub percent: Decimal,
    /// `TaxCode` (4.x, optional) or `TaxCategoryCode` (4.3+).
    pub category_code: Option<String>,
}

/// One entry of the document level tax summary.
#[derive(Debug, Clone, Serialize)]
pub struct EbiTax {
    pub taxable_amount: Decimal,
    pub percent: Decimal,
    pub category_code: Option<String>,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub enum PaymentMethod {
    NoPayment,
    DirectDebit,
    BankTransfer {
        accounts: Vec<BankAccount>,
        reference: Option<String>,
    },
    PaymentCard {
        account_number: String,
        holder: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct BankAccount {
    pub bank_name: Option<String>,
    pub bic: Option<String>,
    pub iban: String,
    pub owner: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn party(contact: Option<EbiContact>, address_contact: Option<&str>) -> EbiParty {
        EbiParty {
            vat_id: "ATU12345678".into(),
            partner_id: None,
            address: EbiAddress {
                salutation: None,
                name: "Muster GmbH".into(),
                street: None,
                po_box: None,
                town: "Wien".into(),
                zip: "1010".into(),
                country: "Österreich".into(),
                country_code: Some("AT".into()),
                phones: vec!["+43 1 234".into()],
                emails: vec!["office@muster.at".into()],
                contact: address_contact.map(String::from),
            },
            contact,
        }
    }

    #[test]
    fn contact_element_takes_precedence() {
        let p = party(
            Some(EbiContact {
                salutation: None,
                name: "Anna Muster".into(),
                phones: vec![],
                emails: vec!["anna@muster.at".into()],
            }),
            Some("Ignored"),
        );
        assert_eq!(p.contact_name(), Some("Anna Muster"));
        assert_eq!(
            p.emails().collect::<Vec<_>>(),
            vec!["anna@muster.at", "office@muster.at"]
        );
        assert_eq!(p.phones().next(), Some("+43 1 234"));
    }

    #[test]
    fn address_contact_is_fallback() {
        let p = party(None, Some("Max Muster"));
        assert_eq!(p.contact_name(), Some("Max Muster"));
        assert_eq!(party(None, None).contact_name(), None);
    }

    #[test]
    fn document_types_round_trip_names() {
        for name in super::super::schemas::DOCUMENT_TYPES {
            assert_eq!(DocumentType::parse(name).unwrap().as_str(), *name);
        }
        assert!(DocumentType::parse("Quote").is_none());
    }
}
