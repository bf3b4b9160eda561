use quick_xml::NsReader;
use quick_xml::events::Event;
use quick_xml::name::ResolveResult;

use super::EbInterfaceVersion;
use crate::core::EbiError;

/// Determine the ebInterface version of `bytes` from the namespace of the
/// root element.
///
/// Only the prolog and the root start tag are read. Fails with
/// [`EbiError::UnknownFormat`] for a root outside every ebInterface
/// namespace, and with [`EbiError::Malformed`] if no root element can be
/// read at all.
pub fn classify(bytes: &[u8]) -> Result<EbInterfaceVersion, EbiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(EbiError::Io("the uploaded file is empty".into()));
    }

    let mut reader = NsReader::from_reader(bytes);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_resolved_event_into(&mut buf) {
            Ok((ns, Event::Start(e))) | Ok((ns, Event::Empty(e))) => {
                let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                return match ns {
                    ResolveResult::Bound(ns) => {
                        let uri = String::from_utf8_lossy(ns.into_inner()).into_owned();
                        EbInterfaceVersion::from_namespace(&uri).ok_or_else(|| {
                            EbiError::UnknownFormat(format!(
                                "root element <{local}> uses the unknown namespace '{uri}'"
                            ))
                        })
                    }
                    _ => Err(EbiError::UnknownFormat(format!(
                        "root element <{local}> has no namespace"
                    ))),
                };
            }
            Ok((_, Event::Text(_))) | Ok((_, Event::CData(_))) => {
                return Err(EbiError::Malformed(
                    "character data before the root element".into(),
                ));
            }
            Ok((_, Event::Eof)) => {
                return Err(EbiError::Malformed("document has no root element".into()));
            }
            Ok(_) => {}
            Err(e) => return Err(EbiError::Malformed(e.to_string())),
        }
        buf.clear();
    }
}
