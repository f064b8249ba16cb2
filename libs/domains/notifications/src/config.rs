use core_config::{ConfigError, FromEnv, env_optional, env_or_default, env_parse, env_required};
use std::path::PathBuf;
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum EmailProviderKind {
    #[default]
    Smtp,
    /// Local development relay, no auth or TLS
    Mailpit,
}

/// Mail delivery settings
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub provider: EmailProviderKind,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub from_name: String,
    pub from_address: String,
    pub templates_path: PathBuf,
}

impl EmailConfig {
    pub const DEFAULT_SMTP_PORT: u16 = 587;
    pub const DEFAULT_MAILPIT_PORT: u16 = 1025;
    pub const DEFAULT_FROM_NAME: &'static str = "Notification Service";
    pub const DEFAULT_TEMPLATES_PATH: &'static str = "templates/email";
}

impl FromEnv for EmailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let provider = env_parse("EMAIL_PROVIDER", EmailProviderKind::default())?;

        let (smtp_host, smtp_port, smtp_username, smtp_password) = match provider {
            EmailProviderKind::Smtp => (
                env_required("EMAIL_SMTP_HOST")?,
                env_parse("EMAIL_SMTP_PORT", Self::DEFAULT_SMTP_PORT)?,
                Some(env_required("EMAIL_SMTP_USERNAME")?),
                Some(env_required("EMAIL_SMTP_PASSWORD")?),
            ),
            EmailProviderKind::Mailpit => (
                env_or_default("EMAIL_SMTP_HOST", "localhost"),
                env_parse("EMAIL_SMTP_PORT", Self::DEFAULT_MAILPIT_PORT)?,
                env_optional("EMAIL_SMTP_USERNAME"),
                env_optional("EMAIL_SMTP_PASSWORD"),
            ),
        };

        Ok(Self {
            provider,
            smtp_host,
            smtp_port,
            smtp_username,
            smtp_password,
            from_name: env_or_default("EMAIL_FROM_NAME", Self::DEFAULT_FROM_NAME),
            from_address: env_required("EMAIL_FROM_ADDRESS")?,
            templates_path: PathBuf::from(env_or_default(
                "EMAIL_TEMPLATES_PATH",
                Self::DEFAULT_TEMPLATES_PATH,
            )),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYS: [&str; 8] = [
        "EMAIL_PROVIDER",
        "EMAIL_SMTP_HOST",
        "EMAIL_SMTP_PORT",
        "EMAIL_SMTP_USERNAME",
        "EMAIL_SMTP_PASSWORD",
        "EMAIL_FROM_NAME",
        "EMAIL_FROM_ADDRESS",
        "EMAIL_TEMPLATES_PATH",
    ];

    fn email_env<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
        let all: Vec<(&str, Option<&str>)> = KEYS
            .iter()
            .map(|key| {
                let value = vars.iter().find(|(k, _)| k == key).map(|(_, v)| *v);
                (*key, value)
            })
            .collect();
        temp_env::with_vars(all, f);
    }

    #[test]
    fn test_smtp_requires_credentials() {
        email_env(
            &[("EMAIL_SMTP_HOST", "smtp.example.com"), ("EMAIL_FROM_ADDRESS", "noreply@example.com")],
            || {
                let err = EmailConfig::from_env().unwrap_err();
                assert!(err.to_string().contains("EMAIL_SMTP_USERNAME"));
            },
        );
    }

    #[test]
    fn test_smtp_full() {
        email_env(
            &[
                ("EMAIL_SMTP_HOST", "smtp.example.com"),
                ("EMAIL_SMTP_USERNAME", "user"),
                ("EMAIL_SMTP_PASSWORD", "secret"),
                ("EMAIL_FROM_ADDRESS", "noreply@example.com"),
            ],
            || {
                let config = EmailConfig::from_env().unwrap();
                assert_eq!(config.provider, EmailProviderKind::Smtp);
                assert_eq!(config.smtp_port, 587);
                assert_eq!(config.smtp_password.as_deref(), Some("secret"));
                assert_eq!(config.from_name, "Notification Service");
                assert_eq!(config.templates_path, PathBuf::from("templates/email"));
            },
        );
    }

    #[test]
    fn test_mailpit_defaults() {
        email_env(
            &[("EMAIL_PROVIDER", "Mailpit"), ("EMAIL_FROM_ADDRESS", "dev@localhost")],
            || {
                let config = EmailConfig::from_env().unwrap();
                assert_eq!(config.provider, EmailProviderKind::Mailpit);
                assert_eq!(config.smtp_host, "localhost");
                assert_eq!(config.smtp_port, 1025);
                assert!(config.smtp_username.is_none());
            },
        );
    }

    #[test]
    fn test_from_address_always_required() {
        email_env(&[("EMAIL_PROVIDER", "mailpit")], || {
            assert!(matches!(
                EmailConfig::from_env(),
                Err(ConfigError::MissingEnvVar(key)) if key == "EMAIL_FROM_ADDRESS"
            ));
        });
    }

    #[test]
    fn test_unknown_provider() {
        email_env(&[("EMAIL_PROVIDER", "sendgrid")], || {
            assert!(matches!(
                EmailConfig::from_env(),
                Err(ConfigError::ParseError { .. })
            ));
        });
    }
}
