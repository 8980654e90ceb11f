use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::util::dates;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub dates: DatesConfig,
    pub trello: TrelloConfig,
    pub proxy: Option<ProxyConfig>,
    /// Trello default label title -> custom display title.
    #[serde(default)]
    pub labels: HashMap<String, String>,
    pub template: TemplateConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatesConfig {
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrelloConfig {
    pub api_key: String,
    pub token: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProxyConfig {
    pub proxy_host: String,
    pub proxy_port: u16,
    /// "user:password", applied as proxy basic auth.
    pub proxy_credentials: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateConfig {
    pub template_path: PathBuf,
    pub output_mode: OutputMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    Docx,
    Pdf,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,
}

fn default_time_zone() -> String {
    "UTC".to_string()
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

fn default_api_base_url() -> String {
    "https://api.trello.com/1".to_string()
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("exports")
}

impl Default for DatesConfig {
    fn default() -> Self {
        DatesConfig {
            time_zone: default_time_zone(),
            date_format: default_date_format(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            directory: default_output_directory(),
        }
    }
}

impl OutputMode {
    pub fn extension(self) -> &'static str {
        match self {
            OutputMode::Docx => "docx",
            OutputMode::Pdf => "pdf",
        }
    }
}

impl AppConfig {
    /// The configured time zone, validated during [`load_config`].
    pub fn time_zone(&self) -> Tz {
        self.dates.time_zone.parse().unwrap_or(chrono_tz::UTC)
    }

    fn validate(&self) -> Result<()> {
        if self.trello.api_key.trim().is_empty() {
            bail!("trello.api_key must not be empty");
        }
        if self.trello.token.trim().is_empty() {
            bail!("trello.token must not be empty");
        }
        dates::parse_time_zone(&self.dates.time_zone)?;
        if !self.template.template_path.exists() {
            bail!(
                "template.template_path '{}' does not exist",
                self.template.template_path.display()
            );
        }
        if let Some(proxy) = &self.proxy {
            if proxy.proxy_host.trim().is_empty() {
                bail!("proxy.proxy_host must not be empty");
            }
            if let Some(creds) = &proxy.proxy_credentials {
                if creds.split_once(':').is_none() {
                    bail!("proxy.proxy_credentials must be 'user:password'");
                }
            }
        }
        Ok(())
    }
}

/// `./trello-export.toml` when present, otherwise the user config directory.
fn config_path() -> PathBuf {
    let local = PathBuf::from("trello-export.toml");
    if local.exists() {
        return local;
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("trello-export")
        .join("config.toml")
}

pub fn load_config() -> Result<AppConfig> {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_template(dir: &Path) -> PathBuf {
        let path = dir.join("card.html");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "<h1>{{{{ title }}}}</h1>").unwrap();
        path
    }

    fn minimal_config(template: &Path) -> String {
        format!(
            r#"
[trello]
api_key = "key"
token = "tok"

[template]
template_path = "{}"
output_mode = "pdf"
"#,
            template.display()
        )
    }

    fn parse(toml_str: &str) -> Result<AppConfig> {
        let config: AppConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn minimal_config_applies_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let template = write_template(dir.path());
        let config = parse(&minimal_config(&template)).unwrap();
        assert_eq!(config.dates.time_zone, "UTC");
        assert_eq!(config.dates.date_format, "%Y-%m-%d");
        assert_eq!(config.trello.api_base_url, "https://api.trello.com/1");
        assert_eq!(config.output.directory, PathBuf::from("exports"));
        assert_eq!(config.template.output_mode, OutputMode::Pdf);
        assert!(config.labels.is_empty());
        assert!(config.proxy.is_none());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let template = write_template(dir.path());
        let mut toml_str = minimal_config(&template);
        toml_str.push_str("\n[dates]\ntime_zone = \"UTC\"\nfoo = 1\n");
        assert!(parse(&toml_str).is_err());
    }

    #[test]
    fn empty_credentials_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        let template = write_template(dir.path());
        let toml_str = minimal_config(&template).replace("\"key\"", "\"\"");
        let err = parse(&toml_str).unwrap_err();
        assert!(err.to_string().contains("api_key"));
    }

    #[test]
    fn invalid_time_zone_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let template = write_template(dir.path());
        let mut toml_str = minimal_config(&template);
        toml_str.push_str("\n[dates]\ntime_zone = \"Nowhere/Special\"\n");
        assert!(parse(&toml_str).is_err());
    }

    #[test]
    fn missing_template_path_fails_validation() {
        let toml_str = r#"
[trello]
api_key = "key"
token = "tok"

[template]
template_path = "/does/not/exist.docx"
output_mode = "docx"
"#;
        let err = parse(toml_str).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn malformed_proxy_credentials_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        let template = write_template(dir.path());
        let mut toml_str = minimal_config(&template);
        toml_str.push_str(
            "\n[proxy]\nproxy_host = \"proxy.example.com\"\nproxy_port = 3128\nproxy_credentials = \"nodelimiter\"\n",
        );
        let err = parse(&toml_str).unwrap_err();
        assert!(err.to_string().contains("user:password"));
    }

    #[test]
    fn label_overrides_parse_as_map() {
        let dir = tempfile::tempdir().unwrap();
        let template = write_template(dir.path());
        let mut toml_str = minimal_config(&template);
        toml_str.push_str("\n[labels]\n\"Blocked\" = \"Urgent\"\n");
        let config = parse(&toml_str).unwrap();
        assert_eq!(config.labels.get("Blocked").unwrap(), "Urgent");
    }

    #[test]
    fn invalid_output_mode_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let template = write_template(dir.path());
        let toml_str = minimal_config(&template).replace("\"pdf\"", "\"odt\"");
        assert!(toml::from_str::<AppConfig>(&toml_str).is_err());
    }
}
