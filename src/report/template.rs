use std::path::Path;
use std::str::FromStr;

use tracing::info;

use crate::core::{EbiError, Locale};
use crate::ebinterface::{XmlElement, parse_tree};

/// Invoice level values a template can place on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldBinding {
    Version,
    DocumentType,
    DocumentTitle,
    InvoiceNumber,
    InvoiceDate,
    DueDate,
    DeliveryDate,
    Currency,
    BillerName,
    BillerAddress,
    BillerVatId,
    BillerContact,
    RecipientName,
    RecipientAddress,
    RecipientVatId,
    OrderId,
    NetTotal,
    TaxTotal,
    GrossTotal,
    PayableAmount,
    PaymentMethod,
    Iban,
    Bic,
    PaymentReference,
    HeaderDescription,
    FooterDescription,
    Comment,
}

impl FromStr for FieldBinding {
    type Err = EbiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "invoice.version" => Self::Version,
            "invoice.document_type" => Self::DocumentType,
            "invoice.title" => Self::DocumentTitle,
            "invoice.number" => Self::InvoiceNumber,
            "invoice.date" => Self::InvoiceDate,
            "invoice.due_date" => Self::DueDate,
            "invoice.delivery" => Self::DeliveryDate,
            "invoice.currency" => Self::Currency,
            "biller.name" => Self::BillerName,
            "biller.address" => Self::BillerAddress,
            "biller.vat_id" => Self::BillerVatId,
            "biller.contact" => Self::BillerContact,
            "recipient.name" => Self::RecipientName,
            "recipient.address" => Self::RecipientAddress,
            "recipient.vat_id" => Self::RecipientVatId,
            "recipient.order_id" => Self::OrderId,
            "totals.net" => Self::NetTotal,
            "totals.tax" => Self::TaxTotal,
            "totals.gross" => Self::GrossTotal,
            "totals.payable" => Self::PayableAmount,
            "payment.method" => Self::PaymentMethod,
            "payment.iban" => Self::Iban,
            "payment.bic" => Self::Bic,
            "payment.reference" => Self::PaymentReference,
            "invoice.header" => Self::HeaderDescription,
            "invoice.footer" => Self::FooterDescription,
            "invoice.comment" => Self::Comment,
            other => return Err(EbiError::Template(format!("unknown binding '{other}'"))),
        })
    }
}

/// Per-line values for table columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineBinding {
    Position,
    Description,
    ArticleNumber,
    Quantity,
    Unit,
    UnitPrice,
    TaxRate,
    Amount,
}

impl FromStr for LineBinding {
    type Err = EbiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "line.position" => Self::Position,
            "line.description" => Self::Description,
            "line.article" => Self::ArticleNumber,
            "line.quantity" => Self::Quantity,
            "line.unit" => Self::Unit,
            "line.unit_price" => Self::UnitPrice,
            "line.tax_rate" => Self::TaxRate,
            "line.amount" => Self::Amount,
            other => {
                return Err(EbiError::Template(format!("unknown line binding '{other}'")));
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// Text placement; `y` is measured from the top edge of the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub bold: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Text {
        at: Placement,
        text: String,
    },
    Field {
        at: Placement,
        label: Option<String>,
        binding: FieldBinding,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub x: f32,
    pub header: String,
    pub binding: LineBinding,
    pub align: Align,
    pub max_chars: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineTable {
    /// Header row position on the first page.
    pub top: f32,
    /// Header row position on continuation pages.
    pub continue_top: f32,
    pub row_height: f32,
    pub size: f32,
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub label_x: f32,
    pub value_x: f32,
    pub row_height: f32,
    pub size: f32,
    pub rows: Vec<(String, FieldBinding)>,
}

/// Page footer; `{page}` and `{pages}` are replaced per page.
#[derive(Debug, Clone, PartialEq)]
pub struct Footer {
    pub at: Placement,
    pub text: String,
}

/// Report layout compiled once at startup and shared read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledReportTemplate {
    pub name: String,
    pub width: f32,
    pub height: f32,
    /// Bottom margin; table rows and summary stop above it.
    pub margin: f32,
    pub locale: Locale,
    pub items: Vec<Item>,
    pub table: Option<LineTable>,
    pub summary: Option<Summary>,
    pub footer: Option<Footer>,
}

impl CompiledReportTemplate {
    pub fn compile(bytes: &[u8]) -> Result<Self, EbiError> {
        let root = parse_tree(bytes).map_err(|e| EbiError::Template(e.to_string()))?;
        if root.name != "report" {
            return Err(EbiError::Template(format!(
                "expected <report> as root element, found <{}>",
                root.name
            )));
        }

        let width = number(&root, "width", Some(595.0))?;
        let height = number(&root, "height", Some(842.0))?;
        if width <= 0.0 || height <= 0.0 {
            return Err(EbiError::Template("page size must be positive".into()));
        }
        let default_size = number(&root, "size", Some(10.0))?;
        let locale = match root.attribute("locale").unwrap_or("de") {
            "de" => Locale::DE_AT,
            "en" => Locale::EN_GB,
            other => {
                return Err(EbiError::Template(format!("unsupported locale '{other}'")));
            }
        };

        let mut template = Self {
            name: root.attribute("name").unwrap_or("report").to_string(),
            width,
            height,
            margin: number(&root, "margin", Some(40.0))?,
            locale,
            items: Vec::new(),
            table: None,
            summary: None,
            footer: None,
        };

        for el in &root.children {
            match el.name.as_str() {
                "text" => template.items.push(Item::Text {
                    at: placement(el, default_size)?,
                    text: el.text.clone(),
                }),
                "field" => template.items.push(Item::Field {
                    at: placement(el, default_size)?,
                    label: el.attribute("label").map(String::from),
                    binding: required(el, "bind")?.parse()?,
                }),
                "lines" => {
                    if template.table.is_some() {
                        return Err(EbiError::Template("only one <lines> table is allowed".into()));
                    }
                    template.table = Some(line_table(el, default_size)?);
                }
                "summary" => template.summary = Some(summary(el, default_size)?),
                "footer" => {
                    template.footer = Some(Footer {
                        at: placement(el, default_size)?,
                        text: el.text.clone(),
                    })
                }
                other => {
                    return Err(EbiError::Template(format!("unknown element <{other}>")));
                }
            }
        }

        Ok(template)
    }

    pub fn load(path: &Path) -> Result<Self, EbiError> {
        let bytes = std::fs::read(path)
            .map_err(|e| EbiError::Template(format!("{}: {e}", path.display())))?;
        let template = Self::compile(&bytes)?;
        info!(
            path = %path.display(),
            items = template.items.len(),
            "compiled report template '{}'",
            template.name
        );
        Ok(template)
    }
}

fn line_table(el: &XmlElement, default_size: f32) -> Result<LineTable, EbiError> {
    let top = number(el, "top", None)?;
    let columns = el
        .children
        .iter()
        .map(|c| -> Result<Column, EbiError> {
            if c.name != "column" {
                return Err(EbiError::Template(format!(
                    "unexpected <{}> inside <lines>",
                    c.name
                )));
            }
            Ok(Column {
                x: number(c, "x", None)?,
                header: c.attribute("header").unwrap_or_default().to_string(),
                binding: required(c, "bind")?.parse()?,
                align: match c.attribute("align").unwrap_or("left") {
                    "left" => Align::Left,
                    "right" => Align::Right,
                    other => {
                        return Err(EbiError::Template(format!("unknown alignment '{other}'")));
                    }
                },
                max_chars: c
                    .attribute("max-chars")
                    .map(|v| {
                        v.parse::<usize>()
                            .map_err(|_| EbiError::Template(format!("max-chars '{v}' is not a number")))
                    })
                    .transpose()?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    if columns.is_empty() {
        return Err(EbiError::Template("<lines> needs at least one <column>".into()));
    }
    Ok(LineTable {
        top,
        continue_top: number(el, "continue-top", Some(top))?,
        row_height: positive(el, "row-height", 14.0)?,
        size: number(el, "size", Some(default_size))?,
        columns,
    })
}

fn summary(el: &XmlElement, default_size: f32) -> Result<Summary, EbiError> {
    let rows = el
        .children_named("row")
        .map(|r| -> Result<(String, FieldBinding), EbiError> {
            Ok((
                r.attribute("label").unwrap_or_default().to_string(),
                required(r, "bind")?.parse()?,
            ))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Summary {
        label_x: number(el, "label-x", None)?,
        value_x: number(el, "value-x", None)?,
        row_height: positive(el, "row-height", 14.0)?,
        size: number(el, "size", Some(default_size))?,
        rows,
    })
}

fn placement(el: &XmlElement, default_size: f32) -> Result<Placement, EbiError> {
    Ok(Placement {
        x: number(el, "x", None)?,
        y: number(el, "y", None)?,
        size: number(el, "size", Some(default_size))?,
        bold: el.attribute("bold") == Some("true"),
    })
}

fn required<'a>(el: &'a XmlElement, name: &str) -> Result<&'a str, EbiError> {
    el.attribute(name)
        .ok_or_else(|| EbiError::Template(format!("<{}> requires attribute '{name}'", el.name)))
}

fn number(el: &XmlElement, name: &str, default: Option<f32>) -> Result<f32, EbiError> {
    match (el.attribute(name), default) {
        (Some(v), _) => v.trim().parse::<f32>().map_err(|_| {
            EbiError::Template(format!("<{}> attribute {name}='{v}' is not a number", el.name))
        }),
        (None, Some(d)) => Ok(d),
        (None, None) => Err(EbiError::Template(format!(
            "<{}> requires attribute '{name}'",
            el.name
        ))),
    }
}

fn positive(el: &XmlElement, name: &str, default: f32) -> Result<f32, EbiError> {
    let value = number(el, name, Some(default))?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(EbiError::Template(format!("<{}> {name} must be positive", el.name)))
    }
}
