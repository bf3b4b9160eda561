//! Structural schema validation.
//!
//! A [`CompiledSchema`] is a tree of [`ElementDecl`]s describing the
//! sequence, occurrence, attributes and simple content of every element.
//! Validation walks the parsed document once and keeps going after a
//! violation, so the caller gets the complete list of problems.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::EbInterfaceVersion;
use super::tree::{XmlElement, parse_tree};
use crate::core::codes::{is_known_country_code, is_known_currency_code};
use crate::core::{ErrorItem, ErrorList};

/// Simple content types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimpleType {
    /// Any non-empty text.
    Text,
    /// Non-empty text without whitespace.
    Token,
    /// ISO 8601 calendar date (YYYY-MM-DD).
    Date,
    Decimal,
    /// Decimal between 0 and 100.
    Percent,
    /// Non-negative integer.
    Integer,
    Boolean,
    /// ISO 3166-1 alpha-2.
    CountryCode,
    /// ISO 4217.
    CurrencyCode,
    Iban,
    Bic,
    Enumeration(&'static [&'static str]),
}

impl SimpleType {
    /// Check a value, returning the reason it is invalid.
    pub fn check(&self, value: &str) -> Result<(), String> {
        let value = value.trim();
        if value.is_empty() {
            return Err("value must not be empty".into());
        }
        let ok = match self {
            Self::Text => true,
            Self::Token => !value.chars().any(char::is_whitespace),
            Self::Date => NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok(),
            Self::Decimal => Decimal::from_str(value).is_ok(),
            Self::Percent => Decimal::from_str(value)
                .is_ok_and(|d| d >= Decimal::ZERO && d <= Decimal::ONE_HUNDRED),
            Self::Integer => value.parse::<u64>().is_ok(),
            Self::Boolean => matches!(value, "true" | "false" | "1" | "0"),
            Self::CountryCode => is_known_country_code(value),
            Self::CurrencyCode => is_known_currency_code(value),
            Self::Iban => is_iban_shaped(value),
            Self::Bic => is_bic_shaped(value),
            Self::Enumeration(allowed) => allowed.contains(&value),
        };
        if ok {
            Ok(())
        } else {
            Err(format!("'{value}' is not a valid {}", self.describe()))
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Text => "text".into(),
            Self::Token => "token".into(),
            Self::Date => "date (YYYY-MM-DD)".into(),
            Self::Decimal => "decimal number".into(),
            Self::Percent => "percentage between 0 and 100".into(),
            Self::Integer => "non-negative integer".into(),
            Self::Boolean => "boolean".into(),
            Self::CountryCode => "ISO 3166-1 country code".into(),
            Self::CurrencyCode => "ISO 4217 currency code".into(),
            Self::Iban => "IBAN".into(),
            Self::Bic => "BIC".into(),
            Self::Enumeration(allowed) => format!("value, expected one of {}", allowed.join(", ")),
        }
    }
}

fn is_iban_shaped(value: &str) -> bool {
    let b = value.as_bytes();
    (15..=34).contains(&b.len())
        && b[..2].iter().all(u8::is_ascii_uppercase)
        && b[2..4].iter().all(u8::is_ascii_digit)
        && b[4..]
            .iter()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

fn is_bic_shaped(value: &str) -> bool {
    let b = value.as_bytes();
    (b.len() == 8 || b.len() == 11)
        && b[..6].iter().all(u8::is_ascii_uppercase)
        && b[6..]
            .iter()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

#[derive(Debug, Clone)]
pub struct AttributeDecl {
    pub name: &'static str,
    pub ty: SimpleType,
    pub required: bool,
}

#[derive(Debug, Clone)]
pub enum Content {
    Empty,
    Simple(SimpleType),
    Complex(Vec<Particle>),
    /// Accepted without looking inside: any attributes, children or text.
    Open,
}

/// One entry of a content model sequence.
#[derive(Debug, Clone)]
pub enum Particle {
    Element(ElementDecl),
    /// Exactly one of the options, `min_occurs` 0 makes the whole choice optional.
    Choice {
        options: Vec<ElementDecl>,
        min_occurs: u32,
    },
}

impl Particle {
    fn decl_for(&self, name: &str) -> Option<&ElementDecl> {
        match self {
            Self::Element(decl) => (decl.name == name).then_some(decl),
            Self::Choice { options, .. } => options.iter().find(|d| d.name == name),
        }
    }

    fn min_occurs(&self) -> u32 {
        match self {
            Self::Element(decl) => decl.min_occurs,
            Self::Choice { min_occurs, .. } => *min_occurs,
        }
    }

    fn max_occurs(&self) -> Option<u32> {
        match self {
            Self::Element(decl) => decl.max_occurs,
            Self::Choice { .. } => Some(1),
        }
    }

    fn label(&self) -> String {
        match self {
            Self::Element(decl) => decl.name.to_string(),
            Self::Choice { options, .. } => options
                .iter()
                .map(|d| d.name)
                .collect::<Vec<_>>()
                .join("|"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ElementDecl {
    pub name: &'static str,
    pub min_occurs: u32,
    /// `None` means unbounded.
    pub max_occurs: Option<u32>,
    pub attributes: Vec<AttributeDecl>,
    pub content: Content,
}

impl ElementDecl {
    pub fn simple(name: &'static str, ty: SimpleType) -> Self {
        Self {
            name,
            min_occurs: 1,
            max_occurs: Some(1),
            attributes: Vec::new(),
            content: Content::Simple(ty),
        }
    }

    pub fn complex(name: &'static str, particles: Vec<Particle>) -> Self {
        Self {
            content: Content::Complex(particles),
            ..Self::simple(name, SimpleType::Text)
        }
    }

    pub fn empty(name: &'static str) -> Self {
        Self {
            content: Content::Empty,
            ..Self::simple(name, SimpleType::Text)
        }
    }

    /// An element whose content is not consumed and therefore not checked.
    pub fn open(name: &'static str) -> Self {
        Self {
            content: Content::Open,
            ..Self::simple(name, SimpleType::Text)
        }
    }

    /// 0..1
    pub fn optional(mut self) -> Self {
        self.min_occurs = 0;
        self
    }

    /// 1..n
    pub fn many(mut self) -> Self {
        self.max_occurs = None;
        self
    }

    /// 0..n
    pub fn any(self) -> Self {
        self.optional().many()
    }

    pub fn attr(mut self, name: &'static str, ty: SimpleType, required: bool) -> Self {
        self.attributes.push(AttributeDecl { name, ty, required });
        self
    }

    fn repeats(&self) -> bool {
        self.max_occurs != Some(1)
    }
}

impl From<ElementDecl> for Particle {
    fn from(decl: ElementDecl) -> Self {
        Particle::Element(decl)
    }
}

/// Schema for one ebInterface version, compiled once at startup.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    pub version: EbInterfaceVersion,
    pub namespace: &'static str,
    pub root: ElementDecl,
}

impl CompiledSchema {
    pub fn new(version: EbInterfaceVersion, root: ElementDecl) -> Self {
        Self {
            version,
            namespace: version.namespace(),
            root,
        }
    }

    /// Parse and validate in one pass. Returns the tree only when no
    /// violation was found.
    pub fn validate(&self, bytes: &[u8]) -> Result<XmlElement, ErrorList> {
        let tree = parse_tree(bytes).map_err(|e| {
            ErrorList::from(vec![ErrorItem::error(
                "/",
                format!("document is not well-formed: {e}"),
            )])
        })?;
        let errors = self.validate_tree(&tree);
        if errors.is_empty() {
            Ok(tree)
        } else {
            Err(errors)
        }
    }

    pub fn validate_tree(&self, root: &XmlElement) -> ErrorList {
        let mut errors = ErrorList::new();
        let path = format!("/{}", root.name);

        if root.namespace.as_deref() != Some(self.namespace) {
            errors.push(ErrorItem::error(
                &path,
                format!(
                    "root element is in namespace '{}', expected '{}'",
                    root.namespace.as_deref().unwrap_or(""),
                    self.namespace
                ),
            ));
            return errors;
        }
        if root.name != self.root.name {
            errors.push(ErrorItem::error(
                &path,
                format!("root element must be '{}'", self.root.name),
            ));
            return errors;
        }

        self.validate_element(&self.root, root, &path, &mut errors);
        errors
    }

    fn validate_element(
        &self,
        decl: &ElementDecl,
        element: &XmlElement,
        path: &str,
        errors: &mut ErrorList,
    ) {
        for attr in &decl.attributes {
            let field = format!("{path}/@{}", attr.name);
            match element.attribute(attr.name) {
                Some(value) => {
                    if let Err(reason) = attr.ty.check(value) {
                        errors.push(ErrorItem::error(field, reason));
                    }
                }
                None if attr.required => {
                    errors.push(ErrorItem::error(
                        field,
                        format!("required attribute '{}' is missing", attr.name),
                    ));
                }
                None => {}
            }
        }
        let open = matches!(decl.content, Content::Open);
        for (name, _) in &element.attributes {
            if !open && !decl.attributes.iter().any(|a| a.name == name) {
                errors.push(ErrorItem::error(
                    format!("{path}/@{name}"),
                    format!("attribute '{name}' is not allowed here"),
                ));
            }
        }

        match &decl.content {
            Content::Empty => {
                if !element.text.is_empty() || !element.children.is_empty() {
                    errors.push(ErrorItem::error(path, "element must be empty"));
                }
            }
            Content::Simple(ty) => {
                if !element.children.is_empty() {
                    errors.push(ErrorItem::error(
                        path,
                        "element must not contain child elements",
                    ));
                } else if let Err(reason) = ty.check(&element.text) {
                    errors.push(ErrorItem::error(path, reason));
                }
            }
            Content::Complex(particles) => {
                if !element.text.is_empty() {
                    errors.push(ErrorItem::error(
                        path,
                        "element must not contain character data",
                    ));
                }
                self.validate_children(particles, element, path, errors);
            }
            Content::Open => {}
        }
    }

    fn validate_children(
        &self,
        particles: &[Particle],
        element: &XmlElement,
        path: &str,
        errors: &mut ErrorList,
    ) {
        let mut counts = vec![0u32; particles.len()];
        let mut pos = 0;

        for child in &element.children {
            let in_namespace = child.namespace.as_deref() == Some(self.namespace);
            let found = if in_namespace {
                (pos..particles.len())
                    .find_map(|i| particles[i].decl_for(&child.name).map(|d| (i, d)))
            } else {
                None
            };

            let Some((index, decl)) = found else {
                let message = if !in_namespace {
                    format!(
                        "element '{}' from namespace '{}' is not allowed",
                        child.name,
                        child.namespace.as_deref().unwrap_or("")
                    )
                } else if particles[..pos]
                    .iter()
                    .any(|p| p.decl_for(&child.name).is_some())
                {
                    format!("element '{}' is not allowed at this position", child.name)
                } else {
                    format!("unexpected element '{}'", child.name)
                };
                errors.push(ErrorItem::error(format!("{path}/{}", child.name), message));
                continue;
            };

            for skipped in pos..index {
                report_missing(&particles[skipped], counts[skipped], path, errors);
            }
            pos = index;
            counts[index] += 1;

            let child_path = if decl.repeats() {
                format!("{path}/{}[{}]", child.name, counts[index])
            } else {
                format!("{path}/{}", child.name)
            };
            match particles[index].max_occurs() {
                Some(max) if counts[index] > max => {
                    errors.push(ErrorItem::error(
                        child_path,
                        format!(
                            "'{}' may occur at most {max} time(s)",
                            particles[index].label()
                        ),
                    ));
                }
                _ => self.validate_element(decl, child, &child_path, errors),
            }
        }

        for rest in pos..particles.len() {
            report_missing(&particles[rest], counts[rest], path, errors);
        }
    }
}

fn report_missing(particle: &Particle, count: u32, path: &str, errors: &mut ErrorList) {
    if count >= particle.min_occurs() {
        return;
    }
    let item = match particle {
        Particle::Element(decl) => ErrorItem::error(
            format!("{path}/{}", decl.name),
            format!("required element '{}' is missing", decl.name),
        ),
        Particle::Choice { .. } => ErrorItem::error(
            path,
            format!("one of the elements '{}' is required", particle.label()),
        ),
    };
    errors.push(item);
}

#[cfg(test)]
mod tests {
    use super::*;
    use SimpleType::*;

    const NS: &str = "http://www.ebinterface.at/schema/4p3/";

    fn schema() -> CompiledSchema {
        let root = ElementDecl::complex(
            "Invoice",
            vec![
                ElementDecl::simple("InvoiceNumber", Token).into(),
                ElementDecl::simple("InvoiceDate", Date).into(),
                ElementDecl::complex(
                    "Line",
                    vec![
                        ElementDecl::simple("Quantity", Decimal)
                            .attr("Unit", Token, true)
                            .into(),
                    ],
                )
                .many()
                .into(),
                Particle::Choice {
                    options: vec![ElementDecl::empty("NoPayment"), ElementDecl::empty("DirectDebit")],
                    min_occurs: 1,
                },
                ElementDecl::simple("Comment", Text).optional().into(),
            ],
        )
        .attr("InvoiceCurrency", CurrencyCode, true);
        CompiledSchema::new(EbInterfaceVersion::V43, root)
    }

    fn doc(body: &str) -> String {
        format!(r#"<Invoice xmlns="{NS}" InvoiceCurrency="EUR">{body}</Invoice>"#)
    }

    fn fields(errors: &ErrorList) -> Vec<String> {
        errors.iter().map(|e| e.field.clone()).collect()
    }

    #[test]
    fn accepts_valid_document() {
        let xml = doc(
            r#"<InvoiceNumber>R1</InvoiceNumber><InvoiceDate>2024-01-31</InvoiceDate>
               <Line><Quantity Unit="C62">2</Quantity></Line><Line><Quantity Unit="HUR">1.5</Quantity></Line>
               <DirectDebit/>"#,
        );
        assert!(schema().validate(xml.as_bytes()).is_ok());
    }

    #[test]
    fn collects_all_errors() {
        let xml = doc(
            r#"<InvoiceNumber>R 1</InvoiceNumber><InvoiceDate>31.01.2024</InvoiceDate>
               <Line><Quantity>abc</Quantity></Line>"#,
        );
        let errors = schema().validate(xml.as_bytes()).unwrap_err();
        assert_eq!(
            fields(&errors),
            vec![
                "/Invoice/InvoiceNumber",
                "/Invoice/InvoiceDate",
                "/Invoice/Line[1]/Quantity/@Unit",
                "/Invoice/Line[1]/Quantity",
                "/Invoice",
            ]
        );
        assert!(errors.iter().all(|e| e.severity.is_error()));
    }

    #[test]
    fn reports_missing_required_element() {
        let xml = doc(r#"<InvoiceNumber>R1</InvoiceNumber><Line><Quantity Unit="C62">1</Quantity></Line><NoPayment/>"#);
        let errors = schema().validate(xml.as_bytes()).unwrap_err();
        assert_eq!(fields(&errors), vec!["/Invoice/InvoiceDate"]);
        assert!(errors.iter().next().unwrap().message.contains("InvoiceDate"));
    }

    #[test]
    fn reports_order_and_occurrence_violations() {
        let xml = doc(
            r#"<InvoiceDate>2024-01-31</InvoiceDate><InvoiceNumber>R1</InvoiceNumber>
               <Line><Quantity Unit="C62">1</Quantity></Line><NoPayment/><DirectDebit/>"#,
        );
        let errors = schema().validate(xml.as_bytes()).unwrap_err();
        let messages: Vec<_> = errors.iter().map(|e| e.message.as_str()).collect();
        assert!(messages.iter().any(|m| m.contains("not allowed at this position")));
        assert!(messages.iter().any(|m| m.contains("at most 1")));
    }

    #[test]
    fn rejects_foreign_elements_and_attributes() {
        let xml = format!(
            r#"<Invoice xmlns="{NS}" xmlns:x="urn:other" InvoiceCurrency="EUR" Foo="1">
               <InvoiceNumber>R1</InvoiceNumber><InvoiceDate>2024-01-31</InvoiceDate>
               <Line><Quantity Unit="C62">1</Quantity></Line><NoPayment/><x:Extra/></Invoice>"#
        );
        let errors = schema().validate(xml.as_bytes()).unwrap_err();
        assert_eq!(fields(&errors), vec!["/Invoice/@Foo", "/Invoice/Extra"]);
    }

    #[test]
    fn open_content_is_not_inspected() {
        let root = ElementDecl::complex(
            "Invoice",
            vec![
                ElementDecl::simple("InvoiceNumber", Token).into(),
                ElementDecl::open("ReductionAndSurchargeDetails")
                    .optional()
                    .into(),
            ],
        );
        let schema = CompiledSchema::new(EbInterfaceVersion::V43, root);
        let xml = format!(
            r#"<Invoice xmlns="{NS}" xmlns:x="urn:other"><InvoiceNumber>R1</InvoiceNumber>
               <ReductionAndSurchargeDetails Any="1"><Reduction><Amount>5</Amount></Reduction><x:Ext/>
               </ReductionAndSurchargeDetails></Invoice>"#
        );
        assert!(schema.validate(xml.as_bytes()).is_ok());

        let xml = format!(
            r#"<Invoice xmlns="{NS}"><ReductionAndSurchargeDetails/><InvoiceNumber>R1</InvoiceNumber></Invoice>"#
        );
        let errors = schema.validate(xml.as_bytes()).unwrap_err();
        assert!(errors.iter().any(|e| e.message.contains("not allowed at this position")));
    }

    #[test]
    fn wrong_namespace_stops_early() {
        let xml = r#"<Invoice xmlns="http://www.ebinterface.at/schema/4p2/" InvoiceCurrency="EUR"/>"#;
        let errors = schema().validate(xml.as_bytes()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.iter().next().unwrap().message.contains("namespace"));
    }

    #[test]
    fn malformed_input_is_a_single_error() {
        let errors = schema().validate(b"<Invoice>").unwrap_err();
        assert_eq!(fields(&errors), vec!["/"]);
    }

    #[test]
    fn simple_type_checks() {
        assert!(Iban.check("AT611904300234573201").is_ok());
        assert!(Iban.check("AT61 1904 3002").is_err());
        assert!(Bic.check("BKAUATWW").is_ok());
        assert!(Bic.check("BKAUATWWXXX").is_ok());
        assert!(Bic.check("bkauatww").is_err());
        assert!(Percent.check("20").is_ok());
        assert!(Percent.check("120").is_err());
        assert!(Boolean.check("yes").is_err());
        assert!(Enumeration(&["Invoice", "CreditMemo"]).check("CreditMemo").is_ok());
        assert!(CountryCode.check("AT").is_ok());
        assert!(CountryCode.check("Austria").is_err());
        assert!(Text.check("   ").is_err());
    }
}
