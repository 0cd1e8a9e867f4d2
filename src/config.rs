//! Pipeline configuration
//!
//! The pipeline reads a single INI file (`dl.cfg`) once at startup:
//!
//! ```ini
//! [AWS]
//! AWS_ACCESS_KEY_ID = ...
//! AWS_SECRET_ACCESS_KEY = ...
//!
//! [LOCAL]
//! S3 = s3a://my-bucket/lake/
//! ```
//!
//! Keys are matched case-insensitively, section names are not.

use crate::error::{Error, Result};
use crate::output::{Scheme, StorageUrl};
use crate::timestamp::TimeZoneSetting;
use ini::{Ini, Properties};
use std::path::Path;

/// Config file read by the binary, relative to the working directory
pub const CONFIG_FILE: &str = "dl.cfg";

/// Input root used when `[LOCAL] INPUT` is absent
pub const DEFAULT_INPUT_DATA: &str = "s3a://udacity-dend/";

/// Row count the artists, users, time and songplays outputs are cut to
pub const DEFAULT_ROW_LIMIT: usize = 5;

// ============================================================================
// Sections
// ============================================================================

/// Storage credentials from the `[AWS]` section
#[derive(Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    /// `AWS_ACCESS_KEY_ID`
    pub access_key_id: String,
    /// `AWS_SECRET_ACCESS_KEY`
    pub secret_access_key: String,
    /// `AWS_DEFAULT_REGION`
    pub region: Option<String>,
    /// `AWS_ENDPOINT` (MinIO, R2)
    pub endpoint: Option<String>,
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"****")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EtlConfig {
    /// Credentials exported to the process environment
    pub aws: AwsCredentials,
    /// Root the song and log datasets are read from
    pub input_data: StorageUrl,
    /// Root the relations are written under
    pub output_data: StorageUrl,
    /// Time zone `ts` values are decoded in
    pub timezone: TimeZoneSetting,
    /// Truncation applied to artists, users, time and songplays (`None` = off)
    pub row_limit: Option<usize>,
    /// Engine worker threads (`None` = engine default)
    pub threads: Option<usize>,
}

impl EtlConfig {
    /// Load configuration from an INI file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let ini = Ini::load_from_file(path)?;
        Self::from_ini(&ini)
    }

    /// Load configuration from INI text
    pub fn parse(content: &str) -> Result<Self> {
        let ini = Ini::load_from_str(content)
            .map_err(|e| Error::config(format!("Failed to parse config: {e}")))?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self> {
        let aws = section(ini, "AWS")?;
        let local = section(ini, "LOCAL")?;
        let pipeline = ini.section(Some("PIPELINE"));

        let aws = AwsCredentials {
            access_key_id: required(aws, "AWS", "AWS_ACCESS_KEY_ID")?,
            secret_access_key: required(aws, "AWS", "AWS_SECRET_ACCESS_KEY")?,
            region: optional(Some(aws), "AWS_DEFAULT_REGION"),
            endpoint: optional(Some(aws), "AWS_ENDPOINT"),
        };

        let output_data = StorageUrl::parse(&required(local, "LOCAL", "S3")?)?;
        let input_data = StorageUrl::parse(
            &optional(Some(local), "INPUT").unwrap_or_else(|| DEFAULT_INPUT_DATA.to_string()),
        )?;

        if input_data.is_remote()
            && output_data.is_remote()
            && input_data.scheme() != output_data.scheme()
        {
            return Err(Error::invalid_value(
                "LOCAL.INPUT",
                format!("{input_data} and {output_data} are on different object stores"),
            ));
        }

        let timezone = optional(Some(local), "TIMEZONE")
            .map(|tz| tz.parse::<TimeZoneSetting>())
            .transpose()?
            .unwrap_or_default();

        let row_limit = match optional(pipeline, "ROW_LIMIT") {
            None => Some(DEFAULT_ROW_LIMIT),
            Some(value) if value.eq_ignore_ascii_case("none") => None,
            Some(value) => Some(parse_count("PIPELINE.ROW_LIMIT", &value)?),
        };

        let threads = optional(pipeline, "THREADS")
            .map(|value| parse_count("PIPELINE.THREADS", &value))
            .transpose()?;
        if threads == Some(0) {
            return Err(Error::invalid_value(
                "PIPELINE.THREADS",
                "must be at least 1",
            ));
        }

        Ok(Self {
            aws,
            input_data,
            output_data,
            timezone,
            row_limit,
            threads,
        })
    }

    /// Set the storage credentials in the process environment.
    ///
    /// The engine's object-storage connector and the output store both read
    /// credentials from there.
    pub fn export_credentials(&self) {
        std::env::set_var("AWS_ACCESS_KEY_ID", &self.aws.access_key_id);
        std::env::set_var("AWS_SECRET_ACCESS_KEY", &self.aws.secret_access_key);
        if let Some(region) = &self.aws.region {
            std::env::set_var("AWS_DEFAULT_REGION", region);
        }
        if let Some(endpoint) = &self.aws.endpoint {
            std::env::set_var("AWS_ENDPOINT", endpoint);
        }
    }

    /// Whether any configured root lives in object storage
    pub fn uses_remote_storage(&self) -> bool {
        self.remote_scheme().is_some()
    }

    /// Object store the engine has to reach, if any
    pub fn remote_scheme(&self) -> Option<Scheme> {
        [&self.output_data, &self.input_data]
            .into_iter()
            .find(|url| url.is_remote())
            .map(StorageUrl::scheme)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn section<'a>(ini: &'a Ini, name: &str) -> Result<&'a Properties> {
    ini.section(Some(name))
        .ok_or_else(|| Error::config(format!("Missing [{name}] section")))
}

fn lookup(props: &Properties, key: &str) -> Option<String> {
    props
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(props: &Properties, section: &str, key: &str) -> Result<String> {
    lookup(props, key).ok_or_else(|| Error::missing_field(format!("{section}.{key}")))
}

fn optional(props: Option<&Properties>, key: &str) -> Option<String> {
    props.and_then(|p| lookup(p, key))
}

fn parse_count(field: &str, value: &str) -> Result<usize> {
    value
        .parse::<usize>()
        .map_err(|e| Error::invalid_value(field, format!("'{value}': {e}")))
}
