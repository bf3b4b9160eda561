use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, StringFormat, dictionary};

use super::template::*;
use crate::core::{EbiError, Locale};
use crate::ebinterface::{Delivery, EbiInvoice, EbiLine, EbiParty, PaymentMethod};

const REGULAR: &str = "F1";
const BOLD: &str = "F2";

/// Average Helvetica glyph width in em, used for right alignment.
const AVERAGE_GLYPH_WIDTH: f32 = 0.52;

/// Render `invoice` with `template` into PDF bytes.
pub fn render_pdf(template: &CompiledReportTemplate, invoice: &EbiInvoice) -> Result<Vec<u8>, EbiError> {
    let pages = layout(template, invoice);
    write_document(template, invoice, pages)
}

/// Collects the text operations of each page.
struct Pages<'t> {
    template: &'t CompiledReportTemplate,
    pages: Vec<Vec<Operation>>,
}

impl<'t> Pages<'t> {
    fn new(template: &'t CompiledReportTemplate) -> Self {
        Self {
            template,
            pages: vec![Vec::new()],
        }
    }

    fn new_page(&mut self) {
        self.pages.push(Vec::new());
    }

    fn bottom(&self) -> f32 {
        self.template.height - self.template.margin
    }

    fn text(&mut self, x: f32, y: f32, size: f32, bold: bool, text: &str) {
        if text.is_empty() {
            return;
        }
        let font = if bold { BOLD } else { REGULAR };
        let pdf_y = self.template.height - y;
        let ops = self.pages.last_mut();
        if let Some(ops) = ops {
            ops.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![font.into(), size.into()]),
                Operation::new("Td", vec![x.into(), pdf_y.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
                ),
                Operation::new("ET", vec![]),
            ]);
        }
    }

    fn aligned(&mut self, x: f32, y: f32, size: f32, align: Align, text: &str) {
        let x = match align {
            Align::Left => x,
            Align::Right => x - text_width(text, size),
        };
        self.text(x, y, size, false, text);
    }
}

fn layout(template: &CompiledReportTemplate, invoice: &EbiInvoice) -> Vec<Vec<Operation>> {
    let locale = template.locale;
    let mut pages = Pages::new(template);

    for item in &template.items {
        match item {
            Item::Text { at, text } => pages.text(at.x, at.y, at.size, at.bold, text),
            Item::Field { at, label, binding } => {
                let value = field_value(*binding, invoice, locale);
                let text = match label {
                    Some(label) => format!("{label} {value}"),
                    None => value,
                };
                pages.text(at.x, at.y, at.size, at.bold, text.trim());
            }
        }
    }

    let mut cursor = template
        .table
        .as_ref()
        .map(|t| t.top)
        .or_else(|| template.items.iter().map(item_y).reduce(f32::max))
        .unwrap_or(template.margin);

    if let Some(table) = &template.table {
        table_header(&mut pages, table, cursor);
        for line in &invoice.lines {
            cursor += table.row_height;
            if cursor > pages.bottom() {
                pages.new_page();
                cursor = table.continue_top;
                table_header(&mut pages, table, cursor);
                cursor += table.row_height;
            }
            for column in &table.columns {
                let value = line_value(column.binding, line, locale);
                let value = truncate(&value, column.max_chars);
                pages.aligned(column.x, cursor, table.size, column.align, &value);
            }
        }
    }

    if let Some(summary) = &template.summary {
        cursor += summary.row_height;
        let needed = summary.row_height * summary.rows.len() as f32;
        if cursor + needed > pages.bottom() {
            pages.new_page();
            cursor = template.table.as_ref().map_or(template.margin, |t| t.continue_top);
        }
        for (label, binding) in &summary.rows {
            cursor += summary.row_height;
            pages.text(summary.label_x, cursor, summary.size, true, label);
            let value = field_value(*binding, invoice, locale);
            pages.aligned(summary.value_x, cursor, summary.size, Align::Right, &value);
        }
    }

    if let Some(footer) = &template.footer {
        let total = pages.pages.len();
        for page in 0..total {
            let text = footer
                .text
                .replace("{page}", &(page + 1).to_string())
                .replace("{pages}", &total.to_string());
            let pdf_y = template.height - footer.at.y;
            pages.pages[page].extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![REGULAR.into(), footer.at.size.into()]),
                Operation::new("Td", vec![footer.at.x.into(), pdf_y.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::String(encode_win_ansi(&text), StringFormat::Literal)],
                ),
                Operation::new("ET", vec![]),
            ]);
        }
    }

    pages.pages
}

fn item_y(item: &Item) -> f32 {
    match item {
        Item::Text { at, .. } | Item::Field { at, .. } => at.y,
    }
}

fn table_header(pages: &mut Pages<'_>, table: &LineTable, y: f32) {
    for column in &table.columns {
        let x = match column.align {
            Align::Left => column.x,
            Align::Right => column.x - text_width(&column.header, table.size),
        };
        pages.text(x, y, table.size, true, &column.header);
    }
}

fn write_document(
    template: &CompiledReportTemplate,
    invoice: &EbiInvoice,
    pages: Vec<Vec<Operation>>,
) -> Result<Vec<u8>, EbiError> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let font = |name: &str| {
        dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => Object::Name(name.as_bytes().to_vec()),
            "Encoding" => "WinAnsiEncoding",
        }
    };
    let regular_id = doc.add_object(font("Helvetica"));
    let bold_id = doc.add_object(font("Helvetica-Bold"));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            REGULAR => Object::Reference(regular_id),
            BOLD => Object::Reference(bold_id),
        },
    });

    let mut kids = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations }
            .encode()
            .map_err(|e| EbiError::Template(format!("failed to encode page content: {e}")))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![0.into(), 0.into(), template.width.into(), template.height.into()],
            "Contents" => Object::Reference(content_id),
            "Resources" => Object::Reference(resources_id),
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(format!("{} {}", template.name, invoice.number)),
        "Producer" => Object::string_literal("ebinterface-web"),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc.trailer.set("Info", Object::Reference(info_id));

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| EbiError::Template(format!("failed to write PDF: {e}")))?;
    Ok(output)
}

fn field_value(binding: FieldBinding, inv: &EbiInvoice, locale: Locale) -> String {
    let date = |d: chrono::NaiveDate| format_date(d, locale);
    let amount = |a: rust_decimal::Decimal| locale.format_amount(a);
    let first_account = || match &inv.payment {
        Some(PaymentMethod::BankTransfer { accounts, .. }) => accounts.first(),
        _ => None,
    };

    match binding {
        FieldBinding::Version => format!("ebInterface {}", inv.version),
        FieldBinding::DocumentType => inv.document_type.as_str().to_string(),
        FieldBinding::DocumentTitle => inv.document_title.clone().unwrap_or_default(),
        FieldBinding::InvoiceNumber => inv.number.clone(),
        FieldBinding::InvoiceDate => date(inv.date),
        FieldBinding::DueDate => inv.due_date.map(date).unwrap_or_default(),
        FieldBinding::DeliveryDate => match &inv.delivery {
            Some(Delivery::Date(d)) => date(*d),
            Some(Delivery::Period { from, to }) => format!("{} - {}", date(*from), date(*to)),
            None => String::new(),
        },
        FieldBinding::Currency => inv.currency.clone(),
        FieldBinding::BillerName => inv.biller.address.name.clone(),
        FieldBinding::BillerAddress => address_line(&inv.biller),
        FieldBinding::BillerVatId => inv.biller.vat_id.clone(),
        FieldBinding::BillerContact => {
            let parts: Vec<&str> = inv
                .biller
                .contact_name()
                .into_iter()
                .chain(inv.biller.phones().take(1))
                .chain(inv.biller.emails().take(1))
                .collect();
            parts.join(", ")
        }
        FieldBinding::RecipientName => inv.recipient.address.name.clone(),
        FieldBinding::RecipientAddress => address_line(&inv.recipient),
        FieldBinding::RecipientVatId => inv.recipient.vat_id.clone(),
        FieldBinding::OrderId => inv
            .order_reference
            .as_ref()
            .map(|o| o.order_id.clone())
            .unwrap_or_default(),
        FieldBinding::NetTotal => inv.net_total().map(amount).unwrap_or_default(),
        FieldBinding::TaxTotal => inv.tax_total().map(amount).unwrap_or_default(),
        FieldBinding::GrossTotal => amount(inv.total_gross),
        FieldBinding::PayableAmount => amount(inv.amount_payable()),
        FieldBinding::PaymentMethod => match &inv.payment {
            Some(PaymentMethod::NoPayment) => locale.pick("Keine Zahlung", "No payment").into(),
            Some(PaymentMethod::DirectDebit) => locale.pick("Lastschrift", "Direct debit").into(),
            Some(PaymentMethod::BankTransfer { .. }) => {
                locale.pick("Überweisung", "Bank transfer").into()
            }
            Some(PaymentMethod::PaymentCard { .. }) => {
                locale.pick("Zahlungskarte", "Payment card").into()
            }
            None => String::new(),
        },
        FieldBinding::Iban => first_account().map(|a| a.iban.clone()).unwrap_or_default(),
        FieldBinding::Bic => first_account()
            .and_then(|a| a.bic.clone())
            .unwrap_or_default(),
        FieldBinding::PaymentReference => match &inv.payment {
            Some(PaymentMethod::BankTransfer { reference, .. }) => {
                reference.clone().unwrap_or_default()
            }
            _ => String::new(),
        },
        FieldBinding::HeaderDescription => inv.header_description.clone().unwrap_or_default(),
        FieldBinding::FooterDescription => inv.footer_description.clone().unwrap_or_default(),
        FieldBinding::Comment => inv.comment.clone().unwrap_or_default(),
    }
}

fn line_value(binding: LineBinding, line: &EbiLine, locale: Locale) -> String {
    match binding {
        LineBinding::Position => line.position.map(|p| p.to_string()).unwrap_or_default(),
        LineBinding::Description => line.descriptions.join(" "),
        LineBinding::ArticleNumber => line.article_numbers.first().cloned().unwrap_or_default(),
        LineBinding::Quantity => format_number(line.quantity, locale),
        LineBinding::Unit => line.unit.clone(),
        LineBinding::UnitPrice => locale.format_amount(line.unit_price),
        LineBinding::TaxRate => format!("{} %", format_number(line.tax.percent, locale)),
        LineBinding::Amount => locale.format_amount(line.amount),
    }
}

fn address_line(party: &EbiParty) -> String {
    let a = &party.address;
    let mut parts: Vec<String> = Vec::new();
    if let Some(street) = a.street.as_ref().or(a.po_box.as_ref()) {
        parts.push(street.clone());
    }
    parts.push(format!("{} {}", a.zip, a.town));
    if !a.country.is_empty() {
        parts.push(a.country.clone());
    }
    parts.join(", ")
}

fn format_date(date: chrono::NaiveDate, locale: Locale) -> String {
    if locale.is_german() {
        date.format("%d.%m.%Y").to_string()
    } else {
        date.format("%Y-%m-%d").to_string()
    }
}

/// Quantities and rates keep their own precision.
fn format_number(value: rust_decimal::Decimal, locale: Locale) -> String {
    let plain = value.normalize().to_string();
    if locale.is_german() {
        plain.replace('.', ",")
    } else {
        plain
    }
}

fn truncate(text: &str, max_chars: Option<usize>) -> String {
    match max_chars {
        Some(max) if text.chars().count() > max => {
            let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
            cut.push('…');
            cut
        }
        _ => text.to_string(),
    }
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * AVERAGE_GLYPH_WIDTH
}

/// Encode text for the standard 14 fonts with WinAnsiEncoding. Characters
/// outside the code page become '?'.
pub(crate) fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            c if (c as u32) < 0x80 || (0xA0..=0xFF).contains(&(c as u32)) => c as u8,
            _ => b'?',
        })
        .collect()
}
