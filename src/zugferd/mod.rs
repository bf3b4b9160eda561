//! ZUGFeRD 1.0 recognition.
//!
//! ZUGFeRD documents are not processed, but an upload of one should be
//! named as such instead of being reported as an unknown format. The
//! recognised root element, namespace and conformance profiles come from
//! a table compiled at startup; without it ZUGFeRD uploads fall back to
//! the generic classification error.

use std::path::Path;

use tracing::info;

use crate::core::EbiError;
use crate::ebinterface::{XmlElement, parse_tree};

/// Location of the profile URN below the root element.
const GUIDELINE_PATH: &str =
    "SpecifiedExchangedDocumentContext/GuidelineSpecifiedDocumentContextParameter/ID";

/// A conformance profile, e.g. `BASIC`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZugferdProfile {
    pub name: String,
    /// Guideline URN carried by the document.
    pub id: String,
}

/// Compiled ZUGFeRD profile table.
#[derive(Debug, Clone)]
pub struct ZugferdProfiles {
    pub name: String,
    pub root: String,
    pub namespace: String,
    pub profiles: Vec<ZugferdProfile>,
}

/// A document identified as ZUGFeRD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recognised {
    /// Name of the table, e.g. `ZUGFeRD 1.0`.
    pub format: String,
    /// `None` when the guideline URN is missing or not listed.
    pub profile: Option<String>,
}

impl ZugferdProfiles {
    /// Compile a profile table.
    ///
    /// ```xml
    /// <zugferd name="ZUGFeRD 1.0" root="CrossIndustryDocument" namespace="urn:ferd:...">
    ///   <profile name="BASIC" id="urn:ferd:CrossIndustryDocument:invoice:1p0:basic"/>
    /// </zugferd>
    /// ```
    pub fn compile(bytes: &[u8]) -> Result<Self, EbiError> {
        let root = parse_tree(bytes).map_err(|e| EbiError::Zugferd(e.to_string()))?;
        if root.name != "zugferd" {
            return Err(EbiError::Zugferd(format!(
                "expected <zugferd> as root element, found <{}>",
                root.name
            )));
        }

        let profiles = root
            .children_named("profile")
            .map(|p| -> Result<ZugferdProfile, EbiError> {
                Ok(ZugferdProfile {
                    name: required(p, "name")?.to_string(),
                    id: required(p, "id")?.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if profiles.is_empty() {
            return Err(EbiError::Zugferd("profile table lists no profiles".into()));
        }
        if let Some(dup) = profiles
            .iter()
            .enumerate()
            .find(|(i, p)| profiles[..*i].iter().any(|q| q.id == p.id))
        {
            return Err(EbiError::Zugferd(format!(
                "profile id '{}' is listed twice",
                dup.1.id
            )));
        }

        Ok(Self {
            name: root.attribute("name").unwrap_or("ZUGFeRD").to_string(),
            root: required(&root, "root")?.to_string(),
            namespace: required(&root, "namespace")?.to_string(),
            profiles,
        })
    }

    /// Read and compile a profile table file.
    pub fn load(path: &Path) -> Result<Self, EbiError> {
        let bytes = std::fs::read(path)
            .map_err(|e| EbiError::Zugferd(format!("{}: {e}", path.display())))?;
        let table = Self::compile(&bytes)?;
        info!(
            path = %path.display(),
            profiles = table.profiles.len(),
            "compiled profile table '{}'",
            table.name
        );
        Ok(table)
    }

    /// Identify `bytes` as a ZUGFeRD document. Anything that does not parse
    /// or has another root is `None`.
    pub fn recognise(&self, bytes: &[u8]) -> Option<Recognised> {
        let tree = parse_tree(bytes).ok()?;
        if tree.name != self.root || tree.namespace.as_deref() != Some(self.namespace.as_str()) {
            return None;
        }
        Some(Recognised {
            format: self.name.clone(),
            profile: self.profile_of(&tree).map(|p| p.name.clone()),
        })
    }

    fn profile_of(&self, tree: &XmlElement) -> Option<&ZugferdProfile> {
        let id = tree.select(GUIDELINE_PATH).into_iter().next()?;
        let id = id.text.trim();
        self.profiles.iter().find(|p| p.id == id)
    }
}

fn required<'a>(el: &'a XmlElement, name: &str) -> Result<&'a str, EbiError> {
    el.attribute(name)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| {
            EbiError::Zugferd(format!("<{}> lacks the attribute '{name}'", el.name))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"<zugferd name="ZUGFeRD 1.0" root="CrossIndustryDocument"
        namespace="urn:ferd:CrossIndustryDocument:invoice:1p0">
        <profile name="BASIC" id="urn:ferd:CrossIndustryDocument:invoice:1p0:basic"/>
        <profile name="COMFORT" id="urn:ferd:CrossIndustryDocument:invoice:1p0:comfort"/>
    </zugferd>"#;

    fn document(guideline: &str) -> String {
        format!(
            r#"<rsm:CrossIndustryDocument xmlns:rsm="urn:ferd:CrossIndustryDocument:invoice:1p0"
                 xmlns:ram="urn:un:unece:uncefact:data:standard:ReusableAggregateBusinessInformationEntity:12">
               <rsm:SpecifiedExchangedDocumentContext>
                 <ram:GuidelineSpecifiedDocumentContextParameter>
                   <ram:ID>{guideline}</ram:ID>
                 </ram:GuidelineSpecifiedDocumentContextParameter>
               </rsm:SpecifiedExchangedDocumentContext>
             </rsm:CrossIndustryDocument>"#
        )
    }

    #[test]
    fn recognises_profile() {
        let table = ZugferdProfiles::compile(TABLE.as_bytes()).unwrap();
        let found = table
            .recognise(document("urn:ferd:CrossIndustryDocument:invoice:1p0:comfort").as_bytes())
            .unwrap();
        assert_eq!(found.format, "ZUGFeRD 1.0");
        assert_eq!(found.profile.as_deref(), Some("COMFORT"));
    }

    #[test]
    fn unknown_guideline_still_recognises_the_format() {
        let table = ZugferdProfiles::compile(TABLE.as_bytes()).unwrap();
        let found = table.recognise(document("urn:example:other").as_bytes()).unwrap();
        assert_eq!(found.profile, None);
    }

    #[test]
    fn other_documents_are_not_recognised() {
        let table = ZugferdProfiles::compile(TABLE.as_bytes()).unwrap();
        assert!(table
            .recognise(br#"<Invoice xmlns="http://www.ebinterface.at/schema/4p3/"/>"#)
            .is_none());
        assert!(table
            .recognise(br#"<CrossIndustryDocument xmlns="urn:other"/>"#)
            .is_none());
        assert!(table.recognise(b"%PDF-1.4").is_none());
    }

    #[test]
    fn invalid_tables() {
        let err = ZugferdProfiles::compile(b"<profiles/>").unwrap_err();
        assert!(err.to_string().contains("<zugferd>"));

        let err = ZugferdProfiles::compile(
            br#"<zugferd root="CrossIndustryDocument" namespace="urn:x"/>"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("no profiles"));

        let err = ZugferdProfiles::compile(
            br#"<zugferd root="CrossIndustryDocument" namespace="urn:x">
                  <profile name="A" id="urn:a"/><profile name="B" id="urn:a"/></zugferd>"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("twice"));

        let err = ZugferdProfiles::compile(br#"<zugferd namespace="urn:x"><profile name="A" id="urn:a"/></zugferd>"#)
            .unwrap_err();
        assert!(err.to_string().contains("'root'"));
    }

    #[test]
    fn bundled_table_compiles() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("resources/zugferd/zugferd-1p0.xml");
        let table = ZugferdProfiles::load(&path).unwrap();
        assert_eq!(table.profiles.len(), 3);
    }
}
