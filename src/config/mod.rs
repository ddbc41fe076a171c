use std::env;
use std::fmt;
use std::path::PathBuf;

/// Top-level configuration shared by every command.
///
/// Mail credentials live in [`MailSettings`] and are only loaded when a run
/// actually sends something.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub telemetry: TelemetryConfig,
    pub roster: RosterConfig,
    pub convention: ConventionConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let log_level = env::var("RETURNS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let roster_path = PathBuf::from(
            env::var("RETURNS_ROSTER_PATH").unwrap_or_else(|_| "Punkteliste.csv".to_string()),
        );
        let delimiter = parse_delimiter(
            &env::var("RETURNS_ROSTER_DELIMITER").unwrap_or_else(|_| ";".to_string()),
        )?;
        let columns = RosterColumns {
            username: env::var("RETURNS_ROSTER_USERNAME_COL")
                .unwrap_or_else(|_| "Stud.IP Benutzername".to_string()),
            surname: env::var("RETURNS_ROSTER_SURNAME_COL")
                .unwrap_or_else(|_| "Nachname".to_string()),
            firstname: env::var("RETURNS_ROSTER_FIRSTNAME_COL")
                .unwrap_or_else(|_| "Vorname".to_string()),
        };

        let convention = ConventionConfig {
            dir_prefix: env::var("RETURNS_SHEET_DIR_PREFIX")
                .unwrap_or_else(|_| "Sheet".to_string()),
            marker: env::var("RETURNS_MARKER").unwrap_or_else(|_| "corrected".to_string()),
            extensions: parse_extensions(
                &env::var("RETURNS_EXTENSIONS").unwrap_or_else(|_| "zip,pdf,ipynb".to_string()),
            )?,
        };

        Ok(Self {
            telemetry: TelemetryConfig { log_level },
            roster: RosterConfig {
                path: roster_path,
                delimiter,
                columns,
            },
            convention,
        })
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where the roster lives and how its header row is labelled.
#[derive(Debug, Clone)]
pub struct RosterConfig {
    pub path: PathBuf,
    pub delimiter: u8,
    pub columns: RosterColumns,
}

/// Header names of the three roster columns the matcher needs.
#[derive(Debug, Clone)]
pub struct RosterColumns {
    pub username: String,
    pub surname: String,
    pub firstname: String,
}

/// Settings for the corrected-sheet filename convention.
#[derive(Debug, Clone)]
pub struct ConventionConfig {
    pub dir_prefix: String,
    pub marker: String,
    pub extensions: Vec<String>,
}

/// SMTP endpoint, credentials and outgoing mail text.
///
/// Required only by the `send` command; `plan` runs without it.
#[derive(Debug, Clone)]
pub struct MailSettings {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    pub domain: String,
    pub body_template: String,
}

impl MailSettings {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let smtp_port = env::var("RETURNS_SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidSmtpPort)?;

        Ok(Self {
            smtp_host: require_var("RETURNS_SMTP_HOST")?,
            smtp_port,
            username: require_var("RETURNS_SMTP_USER")?,
            password: require_var("RETURNS_SMTP_PASS")?,
            from_address: require_var("RETURNS_MAIL_FROM")?,
            domain: require_var("RETURNS_MAIL_DOMAIN")?,
            body_template: env::var("RETURNS_MAIL_BODY")
                .unwrap_or_else(|_| default_body_template()),
        })
    }
}

fn default_body_template() -> String {
    "Hello {firstname},\n\nattached you will find your corrected sheet.\n\nBest regards,\nyour tutor"
        .to_string()
}

fn require_var(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar { name }),
    }
}

fn parse_delimiter(raw: &str) -> Result<u8, ConfigError> {
    let bytes = raw.as_bytes();
    if bytes.len() == 1 && bytes[0].is_ascii() {
        Ok(bytes[0])
    } else {
        Err(ConfigError::InvalidDelimiter {
            value: raw.to_string(),
        })
    }
}

fn parse_extensions(raw: &str) -> Result<Vec<String>, ConfigError> {
    let extensions: Vec<String> = raw
        .split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_string())
        .filter(|ext| !ext.is_empty())
        .collect();

    if extensions.is_empty() {
        return Err(ConfigError::EmptyExtensionSet);
    }
    Ok(extensions)
}

#[derive(Debug)]
pub enum ConfigError {
    MissingVar { name: &'static str },
    InvalidSmtpPort,
    InvalidDelimiter { value: String },
    EmptyExtensionSet,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingVar { name } => {
                write!(f, "environment variable {} must be set", name)
            }
            ConfigError::InvalidSmtpPort => write!(f, "RETURNS_SMTP_PORT must be a valid u16"),
            ConfigError::InvalidDelimiter { value } => {
                write!(
                    f,
                    "RETURNS_ROSTER_DELIMITER must be a single ASCII character, got '{}'",
                    value
                )
            }
            ConfigError::EmptyExtensionSet => {
                write!(f, "RETURNS_EXTENSIONS must list at least one extension")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [
            "RETURNS_LOG_LEVEL",
            "RETURNS_ROSTER_PATH",
            "RETURNS_ROSTER_DELIMITER",
            "RETURNS_ROSTER_USERNAME_COL",
            "RETURNS_ROSTER_SURNAME_COL",
            "RETURNS_ROSTER_FIRSTNAME_COL",
            "RETURNS_SHEET_DIR_PREFIX",
            "RETURNS_MARKER",
            "RETURNS_EXTENSIONS",
            "RETURNS_SMTP_HOST",
            "RETURNS_SMTP_PORT",
            "RETURNS_SMTP_USER",
            "RETURNS_SMTP_PASS",
            "RETURNS_MAIL_FROM",
            "RETURNS_MAIL_DOMAIN",
            "RETURNS_MAIL_BODY",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.roster.path, PathBuf::from("Punkteliste.csv"));
        assert_eq!(config.roster.delimiter, b';');
        assert_eq!(config.roster.columns.surname, "Nachname");
        assert_eq!(config.convention.dir_prefix, "Sheet");
        assert_eq!(config.convention.marker, "corrected");
        assert_eq!(config.convention.extensions, vec!["zip", "pdf", "ipynb"]);
    }

    #[test]
    fn rejects_multi_character_delimiter() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("RETURNS_ROSTER_DELIMITER", ";;");
        let err = AppConfig::load().expect_err("delimiter rejected");
        assert!(matches!(err, ConfigError::InvalidDelimiter { .. }));
    }

    #[test]
    fn extensions_are_trimmed_and_dot_stripped() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("RETURNS_EXTENSIONS", ".pdf, zip");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.convention.extensions, vec!["pdf", "zip"]);
    }

    #[test]
    fn mail_settings_require_credentials() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let err = MailSettings::load().expect_err("missing smtp host");
        assert!(matches!(
            err,
            ConfigError::MissingVar {
                name: "RETURNS_SMTP_HOST"
            }
        ));
    }

    #[test]
    fn mail_settings_reject_malformed_port() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("RETURNS_SMTP_HOST", "mail.example.edu");
        env::set_var("RETURNS_SMTP_USER", "tutor");
        env::set_var("RETURNS_SMTP_PASS", "secret");
        env::set_var("RETURNS_MAIL_FROM", "tutor@example.edu");
        env::set_var("RETURNS_MAIL_DOMAIN", "stud.example.edu");
        env::set_var("RETURNS_SMTP_PORT", "70000");
        let err = MailSettings::load().expect_err("port rejected");
        assert!(matches!(err, ConfigError::InvalidSmtpPort));

        env::set_var("RETURNS_SMTP_PORT", "abc");
        let err = MailSettings::load().expect_err("port rejected");
        assert!(matches!(err, ConfigError::InvalidSmtpPort));
        reset_env();
    }

    #[test]
    fn mail_settings_load_with_full_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("RETURNS_SMTP_HOST", "mail.example.edu");
        env::set_var("RETURNS_SMTP_USER", "tutor");
        env::set_var("RETURNS_SMTP_PASS", "secret");
        env::set_var("RETURNS_MAIL_FROM", "tutor@example.edu");
        env::set_var("RETURNS_MAIL_DOMAIN", "stud.example.edu");
        let settings = MailSettings::load().expect("settings load");
        assert_eq!(settings.smtp_port, 587);
        assert_eq!(settings.domain, "stud.example.edu");
        assert!(settings.body_template.contains("{firstname}"));
        reset_env();
    }
}
