use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use rust_decimal::Decimal;

use crate::core::EbiError;

fn xml_io(e: std::io::Error) -> EbiError {
    EbiError::Xml(format!("write error: {e}"))
}

/// Indenting XML writer over an in-memory buffer.
pub struct XmlWriter {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlWriter {
    pub fn new() -> Result<Self, EbiError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_io)?;
        Ok(Self { writer })
    }

    pub fn into_string(self) -> Result<String, EbiError> {
        let buf = self.writer.into_inner().into_inner();
        String::from_utf8(buf).map_err(|e| EbiError::Xml(format!("UTF-8 error: {e}")))
    }

    pub fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<&mut Self, EbiError> {
        let mut elem = BytesStart::new(name);
        for (k, v) in attrs {
            elem.push_attribute((*k, *v));
        }
        self.writer.write_event(Event::Start(elem)).map_err(xml_io)?;
        Ok(self)
    }

    pub fn end(&mut self, name: &str) -> Result<&mut Self, EbiError> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_io)?;
        Ok(self)
    }

    /// Write `name` around whatever `body` writes.
    pub fn group(
        &mut self,
        name: &str,
        body: impl FnOnce(&mut Self) -> Result<(), EbiError>,
    ) -> Result<&mut Self, EbiError> {
        self.start(name, &[])?;
        body(self)?;
        self.end(name)
    }

    pub fn text(&mut self, name: &str, text: &str) -> Result<&mut Self, EbiError> {
        self.text_with_attrs(name, text, &[])
    }

    pub fn text_with_attrs(
        &mut self,
        name: &str,
        text: &str,
        attrs: &[(&str, &str)],
    ) -> Result<&mut Self, EbiError> {
        self.start(name, attrs)?;
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(xml_io)?;
        self.end(name)
    }

    /// Write `text` only if present.
    pub fn opt_text(&mut self, name: &str, text: Option<&str>) -> Result<&mut Self, EbiError> {
        match text {
            Some(t) => self.text(name, t),
            None => Ok(self),
        }
    }

    /// Decimal amount with currencyID attribute.
    pub fn amount(&mut self, name: &str, amount: Decimal, currency: &str) -> Result<&mut Self, EbiError> {
        self.text_with_attrs(name, &format_decimal(amount), &[("currencyID", currency)])
    }

    /// Quantity with unitCode attribute.
    pub fn quantity(&mut self, name: &str, qty: Decimal, unit: &str) -> Result<&mut Self, EbiError> {
        self.text_with_attrs(name, &format_decimal(qty), &[("unitCode", unit)])
    }
}

/// At least two decimal places, trailing zeros beyond that stripped.
pub fn format_decimal(d: Decimal) -> String {
    let s = d.normalize().to_string();
    match s.find('.') {
        Some(dot) if s.len() - dot - 1 >= 2 => s,
        Some(dot) => format!("{s}{}", "0".repeat(2 - (s.len() - dot - 1))),
        None => format!("{s}.00"),
    }
}
