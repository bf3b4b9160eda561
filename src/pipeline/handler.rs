use std::collections::BTreeMap;

use tracing::debug;

use crate::convert::{ConversionOutcome, XRechnungConverter};
use crate::core::{ErrorItem, ErrorList, Locale};
use crate::ebinterface::{
    CompiledSchema, EbInterfaceVersion, EbiInvoice, SchemaRegistry, XmlElement, read_invoice,
};

/// A schema-valid document: the element tree (for rule evaluation) and
/// the typed invoice read from it.
#[derive(Debug, Clone)]
pub struct ValidatedDocument {
    pub tree: XmlElement,
    pub invoice: EbiInvoice,
}

/// Result of schema validation.
///
/// `document` is `Some` exactly when `errors` is empty.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub errors: ErrorList,
    pub document: Option<ValidatedDocument>,
}

impl ValidationOutcome {
    fn valid(document: ValidatedDocument) -> Self {
        Self {
            errors: ErrorList::new(),
            document: Some(document),
        }
    }

    fn invalid(errors: ErrorList) -> Self {
        Self {
            errors,
            document: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.document.is_some()
    }
}

/// Per-version validation and conversion.
pub trait VersionHandler: Send + Sync {
    fn version(&self) -> EbInterfaceVersion;

    /// Parse and schema-validate `bytes` in one pass.
    fn validate(&self, bytes: &[u8]) -> ValidationOutcome;

    /// Map a validated document to XRechnung.
    fn convert(&self, invoice: &EbiInvoice, display: Locale, content: Locale) -> ConversionOutcome;
}

/// Handler backed by a compiled schema table.
#[derive(Debug, Clone)]
pub struct EbInterfaceHandler {
    schema: CompiledSchema,
}

impl EbInterfaceHandler {
    pub fn new(schema: CompiledSchema) -> Self {
        Self { schema }
    }
}

impl VersionHandler for EbInterfaceHandler {
    fn version(&self) -> EbInterfaceVersion {
        self.schema.version
    }

    fn validate(&self, bytes: &[u8]) -> ValidationOutcome {
        let tree = match self.schema.validate(bytes) {
            Ok(tree) => tree,
            Err(errors) => return ValidationOutcome::invalid(errors),
        };
        match read_invoice(self.schema.version, &tree) {
            Ok(invoice) => ValidationOutcome::valid(ValidatedDocument { tree, invoice }),
            Err(e) => {
                let path = format!("/{}", tree.name);
                ValidationOutcome::invalid(ErrorList::from(vec![ErrorItem::error(
                    path,
                    e.to_string(),
                )]))
            }
        }
    }

    fn convert(&self, invoice: &EbiInvoice, display: Locale, content: Locale) -> ConversionOutcome {
        XRechnungConverter::new(display, content).convert(invoice)
    }
}

/// Version handlers keyed by version, looked up once per submission.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<EbInterfaceVersion, Box<dyn VersionHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One [`EbInterfaceHandler`] per compiled schema.
    pub fn from_schemas(schemas: SchemaRegistry) -> Self {
        let mut registry = Self::new();
        for version in schemas.versions().collect::<Vec<_>>() {
            if let Some(schema) = schemas.get(version) {
                registry.register(EbInterfaceHandler::new(schema.clone()));
            }
        }
        registry
    }

    /// Register a handler, replacing any previous one for its version.
    pub fn register(&mut self, handler: impl VersionHandler + 'static) {
        let version = handler.version();
        debug!(%version, "registered version handler");
        self.handlers.insert(version, Box::new(handler));
    }

    pub fn get(&self, version: EbInterfaceVersion) -> Option<&dyn VersionHandler> {
        self.handlers.get(&version).map(|h| h.as_ref())
    }

    pub fn versions(&self) -> impl Iterator<Item = EbInterfaceVersion> + '_ {
        self.handlers.keys().copied()
    }

    /// "4.0, 4.1, ..." for user messages.
    pub fn versions_list(&self) -> String {
        self.versions()
            .map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("versions", &self.versions().collect::<Vec<_>>())
            .finish()
    }
}
