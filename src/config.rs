//! Runtime configuration.
//!
//! [`AppConfig`] is plain data; the `server` binary fills it from
//! command-line flags with environment fallbacks ([`ServerArgs`]).

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::core::Locale;

/// Default request body limit: 10 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Page served on `GET /`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LandingPage {
    #[default]
    Start,
    Service,
    Labs,
}

impl LandingPage {
    /// Interpret the `APPLICATION_PATH` value. Anything but `service` or
    /// `labs` (including an unset or blank value) selects the start page.
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => {
                debug!("APPLICATION_PATH not set, using the start page");
                Self::Start
            }
            Some("service") => Self::Service,
            Some("labs") => Self::Labs,
            Some(other) => {
                info!(value = other, "unknown APPLICATION_PATH, using the start page");
                Self::Start
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding `truststore.pem`, `reports/`, `rules/` and `zugferd/`.
    pub resource_dir: PathBuf,
    pub landing_page: LandingPage,
    pub port: u16,
    pub max_upload_bytes: usize,
    /// Language of messages and number format of the report.
    pub locale: Locale,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            resource_dir: PathBuf::from("resources"),
            landing_page: LandingPage::Start,
            port: 8080,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            locale: Locale::DE_AT,
        }
    }
}

impl AppConfig {
    /// Default configuration reading resources from `dir`.
    pub fn with_resource_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            resource_dir: dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn trust_store_path(&self) -> PathBuf {
        self.resource_dir.join("truststore.pem")
    }

    pub fn report_template_path(&self) -> PathBuf {
        self.resource_dir.join("reports").join("ebinterface.xml")
    }

    pub fn rules_path(&self) -> PathBuf {
        self.resource_dir.join("rules").join("ebinterface-rules.xml")
    }

    pub fn zugferd_path(&self) -> PathBuf {
        self.resource_dir.join("zugferd").join("zugferd-1p0.xml")
    }
}

/// Command-line flags of the server binary.
#[cfg(feature = "server")]
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "ebinterface-web")]
#[command(about = "Validate ebInterface invoices and convert them to XRechnung")]
pub struct ServerArgs {
    /// Landing page: service, labs or start
    #[arg(long, env = "APPLICATION_PATH")]
    pub application_path: Option<String>,

    /// Directory with the trust store, report template and rule set
    #[arg(long, env = "EBI_RESOURCE_DIR", default_value = "resources")]
    pub resource_dir: PathBuf,

    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Maximum upload size in bytes
    #[arg(long, env = "EBI_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    /// Message language: de or en
    #[arg(long, env = "EBI_LANGUAGE", default_value = "de")]
    pub language: String,
}

#[cfg(feature = "server")]
impl From<ServerArgs> for AppConfig {
    fn from(args: ServerArgs) -> Self {
        Self {
            resource_dir: args.resource_dir,
            landing_page: LandingPage::from_env_value(args.application_path.as_deref()),
            port: args.port,
            max_upload_bytes: args.max_upload_bytes,
            locale: if args.language.eq_ignore_ascii_case("en") {
                Locale::EN_GB
            } else {
                Locale::DE_AT
            },
        }
    }
}
