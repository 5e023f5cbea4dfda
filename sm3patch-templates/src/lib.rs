//! Template store for the C# files that sm3patch installs into an Npgsql tree.
//!
//! Every template is compiled into the binary with `include_str!`, so a
//! missing file is a build error. [`TemplateStore::validate`] still checks the
//! names a step catalog refers to at startup, before any file is touched.

use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// `enum AuthenticationRequestType` with the `Sm3Password` member added.
pub const AUTHENTICATION_REQUEST_TYPE: &str = "AuthenticationRequestType.cs";
/// Backend message carrying the 4-byte SM3 salt.
pub const AUTHENTICATION_SM3_PASSWORD_MESSAGE: &str = "AuthenticationSm3PasswordMessage.cs";
/// The SM3 hash algorithm.
pub const SM3: &str = "Sm3.cs";
/// `NpgsqlConnector.AuthenticateSm3`.
pub const NPGSQL_CONNECTOR_SM3: &str = "NpgsqlConnectorSm3.cs";
/// `enum RequireAuthMode` with the `Sm3Password` member added.
pub const REQUIRE_AUTH_MODE: &str = "RequireAuthMode.cs";

const EMBEDDED: &[(&str, &str)] = &[
    (
        AUTHENTICATION_REQUEST_TYPE,
        include_str!("../templates/AuthenticationRequestType.cs"),
    ),
    (
        AUTHENTICATION_SM3_PASSWORD_MESSAGE,
        include_str!("../templates/AuthenticationSm3PasswordMessage.cs"),
    ),
    (SM3, include_str!("../templates/Sm3.cs")),
    (
        NPGSQL_CONNECTOR_SM3,
        include_str!("../templates/NpgsqlConnectorSm3.cs"),
    ),
    (
        REQUIRE_AUTH_MODE,
        include_str!("../templates/RequireAuthMode.cs"),
    ),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("source template {name} is missing")]
    NotFound { name: String },

    #[error("source template {name} is empty")]
    Empty { name: String },
}

/// Immutable name -> content map.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    templates: BTreeMap<&'static str, &'static str>,
}

impl TemplateStore {
    /// The templates packaged with this binary.
    pub fn embedded() -> Self {
        Self::from_entries(EMBEDDED.iter().copied())
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (&'static str, &'static str)>) -> Self {
        Self {
            templates: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, name: &str) -> Result<&'static str, TemplateError> {
        self.templates
            .get(name)
            .copied()
            .ok_or_else(|| TemplateError::NotFound {
                name: name.to_string(),
            })
    }

    /// Fail fast if any of `names` is absent or blank.
    pub fn validate<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Result<(), TemplateError> {
        for name in names {
            let content = self.get(name)?;
            if content.trim().is_empty() {
                return Err(TemplateError::Empty {
                    name: name.to_string(),
                });
            }
            debug!(template = name, bytes = content.len(), "template ok");
        }
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.templates.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn embedded_store_has_five_templates() {
        let store = TemplateStore::embedded();
        assert_eq!(
            store.names().collect::<Vec<_>>(),
            vec![
                AUTHENTICATION_REQUEST_TYPE,
                AUTHENTICATION_SM3_PASSWORD_MESSAGE,
                NPGSQL_CONNECTOR_SM3,
                REQUIRE_AUTH_MODE,
                SM3,
            ]
        );
    }

    #[test]
    fn embedded_store_validates() {
        let store = TemplateStore::embedded();
        store
            .validate(EMBEDDED.iter().map(|(name, _)| *name))
            .expect("embedded templates");
    }

    #[test]
    fn unknown_name_is_not_found() {
        let store = TemplateStore::embedded();
        let err = store.get("Missing.cs").unwrap_err();
        assert_eq!(
            err,
            TemplateError::NotFound {
                name: "Missing.cs".to_string()
            }
        );
        assert_eq!(err.to_string(), "source template Missing.cs is missing");
    }

    #[test]
    fn validate_stops_at_first_missing_name() {
        let store = TemplateStore::from_entries([(SM3, "class Sm3 {}")]);
        let err = store.validate([SM3, REQUIRE_AUTH_MODE]).unwrap_err();
        assert!(matches!(err, TemplateError::NotFound { name } if name == REQUIRE_AUTH_MODE));
    }

    #[test]
    fn blank_template_is_rejected() {
        let store = TemplateStore::from_entries([(SM3, "  \n")]);
        let err = store.validate([SM3]).unwrap_err();
        assert!(matches!(err, TemplateError::Empty { .. }));
    }

    #[test]
    fn request_type_template_declares_sm3_member() {
        let store = TemplateStore::embedded();
        let text = store.get(AUTHENTICATION_REQUEST_TYPE).unwrap();
        assert!(text.contains("enum AuthenticationRequestType"));
        assert!(text.contains("Sm3Password = 13"));
    }

    #[test]
    fn connector_template_defines_authenticate_sm3() {
        let store = TemplateStore::embedded();
        let text = store.get(NPGSQL_CONNECTOR_SM3).unwrap();
        assert!(text.contains("partial class NpgsqlConnector"));
        assert!(text.contains("async Task AuthenticateSm3(string username, byte[] salt, bool async"));
    }
}
