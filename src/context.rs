//! Application context assembled once at startup.
//!
//! Bootstrap order: trust store (required), schemas and version handlers,
//! report template (optional), rule set (optional), ZUGFeRD profile table
//! (optional). An optional resource that fails to compile is logged and
//! its slot left empty; the feature then reports itself unavailable per
//! request.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info};

use crate::config::{AppConfig, LandingPage};
use crate::core::{EbiError, Locale};
use crate::ebinterface::SchemaRegistry;
use crate::pipeline::HandlerRegistry;
use crate::report::CompiledReportTemplate;
use crate::rules::RuleSet;
use crate::zugferd::ZugferdProfiles;

const PEM_CERTIFICATE: &str = "-----BEGIN CERTIFICATE-----";

/// PEM certificate bundle trusted for outbound TLS.
#[derive(Debug, Clone)]
pub struct TrustStore {
    pub path: PathBuf,
    pub certificates: usize,
}

impl TrustStore {
    /// Load a PEM bundle. A missing, unreadable or empty bundle is fatal.
    pub fn load(path: &Path) -> Result<Self, EbiError> {
        let pem = std::fs::read_to_string(path).map_err(|e| {
            EbiError::StartupResourceMissing(format!(
                "error while reading trust store {}: {e}",
                path.display()
            ))
        })?;
        let certificates = pem.matches(PEM_CERTIFICATE).count();
        if certificates == 0 {
            return Err(EbiError::StartupResourceMissing(format!(
                "trust store {} contains no certificates",
                path.display()
            )));
        }
        info!(path = %path.display(), certificates, "loaded trust store");
        Ok(Self {
            path: path.to_path_buf(),
            certificates,
        })
    }
}

/// Immutable state shared by every request handler.
#[derive(Debug)]
pub struct AppContext {
    pub trust_store: TrustStore,
    pub landing_page: LandingPage,
    pub handlers: HandlerRegistry,
    pub report_template: Option<CompiledReportTemplate>,
    pub rules: Option<RuleSet>,
    pub zugferd: Option<ZugferdProfiles>,
    pub locale: Locale,
    pub max_upload_bytes: usize,
}

/// Availability of the startup resources, served by the readiness probe.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceStatus {
    pub trust_store_certificates: usize,
    pub versions: Vec<String>,
    pub report_template: bool,
    pub rules: bool,
    pub zugferd: bool,
}

impl AppContext {
    pub fn resource_status(&self) -> ResourceStatus {
        ResourceStatus {
            trust_store_certificates: self.trust_store.certificates,
            versions: self.handlers.versions().map(|v| v.to_string()).collect(),
            report_template: self.report_template.is_some(),
            rules: self.rules.is_some(),
            zugferd: self.zugferd.is_some(),
        }
    }

    /// All optional resources are present.
    pub fn fully_available(&self) -> bool {
        self.report_template.is_some()
            && self.rules.is_some()
            && self.zugferd.is_some()
            && !self.handlers.is_empty()
    }
}

/// Build the application context from `config`.
pub fn bootstrap(config: &AppConfig) -> Result<AppContext, EbiError> {
    let trust_store = TrustStore::load(&config.trust_store_path())?;

    info!("initializing XML schema validators for ebInterface");
    let handlers = HandlerRegistry::from_schemas(SchemaRegistry::compile_all());
    info!(versions = %handlers.versions_list(), "schema validators ready");

    info!("compiling report template for ebInterface");
    let report_template = match CompiledReportTemplate::load(&config.report_template_path()) {
        Ok(template) => Some(template),
        Err(e) => {
            error!(error = %e, "could not load ebInterface report template, PDF reports disabled");
            None
        }
    };

    info!("compiling business rules for ebInterface");
    let rules = match RuleSet::load(&config.rules_path()) {
        Ok(rules) => Some(rules),
        Err(e) => {
            error!(error = %e, "could not load ebInterface rule set, business rules disabled");
            None
        }
    };

    info!("compiling ZUGFeRD profile table");
    let zugferd = match ZugferdProfiles::load(&config.zugferd_path()) {
        Ok(table) => Some(table),
        Err(e) => {
            error!(error = %e, "could not load ZUGFeRD profile table, ZUGFeRD uploads reported as unknown");
            None
        }
    };

    Ok(AppContext {
        trust_store,
        landing_page: config.landing_page,
        handlers,
        report_template,
        rules,
        zugferd,
        locale: config.locale,
        max_upload_bytes: config.max_upload_bytes,
    })
}
