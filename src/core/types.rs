use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// BG-0: XRechnung invoice as produced by the converter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// BT-1: Invoice number.
    pub number: String,
    /// BT-2: Issue date.
    pub issue_date: NaiveDate,
    /// BT-9: Payment due date.
    pub due_date: Option<NaiveDate>,
    /// BT-3: Invoice type code (UNTDID 1001).
    pub type_code: InvoiceTypeCode,
    /// BT-5: Currency (ISO 4217).
    pub currency_code: String,
    /// BT-22: Free-text notes.
    pub notes: Vec<String>,
    /// BT-10: Buyer reference (Leitweg-ID).
    pub buyer_reference: Option<String>,
    /// BT-13: Purchase order reference.
    pub order_reference: Option<String>,
    /// BG-4
    pub seller: Party,
    /// BG-7
    pub buyer: Party,
    /// BG-25
    pub lines: Vec<LineItem>,
    /// BG-22: Set by [`calculate_totals`](super::calculate_totals).
    pub totals: Option<Totals>,
    /// BT-20
    pub payment_terms: Option<String>,
    /// BG-16
    pub payment: Option<PaymentInstructions>,
    /// BT-72: Actual delivery date.
    pub delivery_date: Option<NaiveDate>,
    /// BG-14
    pub invoicing_period: Option<Period>,
}

/// BG-4 / BG-7: Seller or buyer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Party {
    /// BT-27 / BT-44
    pub name: String,
    /// BT-31 / BT-48
    pub vat_id: Option<String>,
    /// BT-29 / BT-46: Identifier assigned by the trading partner.
    pub identifier: Option<String>,
    pub address: Address,
    pub contact: Option<Contact>,
    /// BT-34 / BT-49
    pub electronic_address: Option<ElectronicAddress>,
}

/// BG-5 / BG-8
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    pub street: Option<String>,
    pub city: String,
    pub postal_code: String,
    /// ISO 3166-1 alpha-2.
    pub country_code: String,
}

/// BG-6 / BG-9
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Contact {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Electronic address with scheme identifier ("EM" for e-mail).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectronicAddress {
    pub scheme: String,
    pub value: String,
}

/// BG-25: Invoice line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    /// BT-126
    pub id: String,
    /// BT-129
    pub quantity: Decimal,
    /// BT-130: UN/ECE Rec 20 unit code.
    pub unit: String,
    /// BT-146
    pub unit_price: Decimal,
    pub tax_category: TaxCategory,
    pub tax_rate: Decimal,
    /// BT-153
    pub item_name: String,
    /// BT-154
    pub description: Option<String>,
    /// BT-155
    pub seller_item_id: Option<String>,
    /// BT-131: Set by [`calculate_totals`](super::calculate_totals).
    pub line_amount: Option<Decimal>,
}

/// UNTDID 5305 tax category codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaxCategory {
    /// S
    StandardRate,
    /// Z
    ZeroRated,
    /// E
    Exempt,
    /// AE
    ReverseCharge,
    /// K
    IntraCommunitySupply,
    /// G
    Export,
    /// O
    NotSubjectToVat,
}

impl TaxCategory {
    pub fn code(&self) -> &'static str {
        match self {
            Self::StandardRate => "S",
            Self::ZeroRated => "Z",
            Self::Exempt => "E",
            Self::ReverseCharge => "AE",
            Self::IntraCommunitySupply => "K",
            Self::Export => "G",
            Self::NotSubjectToVat => "O",
        }
    }

    /// Parse a UNTDID 5305 code. "AA" (lower rate) maps to the standard
    /// category since XRechnung expresses reduced rates through the percent.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "S" | "AA" => Some(Self::StandardRate),
            "Z" => Some(Self::ZeroRated),
            "E" => Some(Self::Exempt),
            "AE" => Some(Self::ReverseCharge),
            "K" => Some(Self::IntraCommunitySupply),
            "G" => Some(Self::Export),
            "O" => Some(Self::NotSubjectToVat),
            _ => None,
        }
    }

    /// VATEX exemption reason code for non-taxed categories.
    pub fn exemption_reason_code(&self) -> Option<&'static str> {
        match self {
            Self::NotSubjectToVat => Some("vatex-eu-o"),
            Self::ReverseCharge => Some("vatex-eu-ae"),
            Self::IntraCommunitySupply => Some("vatex-eu-ic"),
            Self::Export => Some("vatex-eu-g"),
            Self::Exempt => Some("vatex-eu-e"),
            Self::StandardRate | Self::ZeroRated => None,
        }
    }
}

/// UNTDID 1001 subset used by the converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceTypeCode {
    /// 380
    Invoice,
    /// 381
    CreditNote,
    /// 386
    Prepayment,
    /// 389
    SelfBilled,
}

impl InvoiceTypeCode {
    pub fn code(&self) -> u16 {
        match self {
            Self::Invoice => 380,
            Self::CreditNote => 381,
            Self::Prepayment => 386,
            Self::SelfBilled => 389,
        }
    }
}

/// BG-22: Document totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Totals {
    /// BT-106
    pub line_net_total: Decimal,
    /// BT-109
    pub net_total: Decimal,
    /// BT-110
    pub vat_total: Decimal,
    /// BT-112
    pub gross_total: Decimal,
    /// BT-113
    pub prepaid: Decimal,
    /// BT-115
    pub amount_due: Decimal,
    /// BG-23
    pub vat_breakdown: Vec<VatBreakdown>,
}

/// BG-23: VAT breakdown per category/rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VatBreakdown {
    pub category: TaxCategory,
    pub rate: Decimal,
    pub taxable_amount: Decimal,
    pub tax_amount: Decimal,
    pub exemption_reason_code: Option<String>,
}

/// BG-16: Payment instructions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInstructions {
    /// BT-81
    pub means_code: PaymentMeansCode,
    /// BT-83: Remittance information.
    pub remittance_info: Option<String>,
    /// BG-17
    pub credit_transfer: Option<CreditTransfer>,
}

/// BG-17: Payee bank account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditTransfer {
    pub iban: String,
    pub bic: Option<String>,
    pub account_name: Option<String>,
}

/// UNTDID 4461 subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMeansCode {
    /// 30
    CreditTransfer,
    /// 48
    BankCard,
    /// 58
    SepaCreditTransfer,
    /// 59
    SepaDirectDebit,
}

impl PaymentMeansCode {
    pub fn code(&self) -> u16 {
        match self {
            Self::CreditTransfer => 30,
            Self::BankCard => 48,
            Self::SepaCreditTransfer => 58,
            Self::SepaDirectDebit => 59,
        }
    }
}

/// BG-14
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}
