//! The fixed SM3 patch sequence for an Npgsql source tree.
//!
//! Stages are numbered for console banners; a stage may hold several steps
//! (the request-type stage removes the old enum and then writes the new file).

use sm3patch_edit::PatchStep;
use sm3patch_templates as templates;

pub const AUTHENTICATION_MESSAGES: &str = "src/Npgsql/BackendMessages/AuthenticationMessages.cs";
pub const AUTHENTICATION_REQUEST_TYPE: &str =
    "src/Npgsql/BackendMessages/AuthenticationRequestType.cs";
pub const SM3_PASSWORD_MESSAGE: &str = "src/Npgsql/Internal/AuthenticationSm3PasswordMessage.cs";
pub const SM3: &str = "src/Npgsql/Internal/Sm3.cs";
pub const CONNECTOR_SM3: &str = "src/Npgsql/Internal/NpgsqlConnector.Sm3.cs";
pub const CONNECTOR: &str = "src/Npgsql/Internal/NpgsqlConnector.cs";
pub const CONNECTOR_AUTH: &str = "src/Npgsql/Internal/NpgsqlConnector.Auth.cs";
pub const REQUIRE_AUTH_MODE: &str = "src/Npgsql/RequireAuthMode.cs";

/// Files that exist only because of a patch run; the reverter deletes them.
pub const GENERATED_PATHS: [&str; 5] = [
    AUTHENTICATION_REQUEST_TYPE,
    SM3_PASSWORD_MESSAGE,
    SM3,
    CONNECTOR_SM3,
    REQUIRE_AUTH_MODE,
];

pub const REQUEST_TYPE_ENUM_MARKER: &str = "enum AuthenticationRequestType";
pub const REQUEST_TYPE_ENUM_PATTERN: &str = r"enum\s+AuthenticationRequestType\s*\{\s*([A-Za-z0-9]+\s*=\s*\d+,\s*)*([A-Za-z0-9]+\s*=\s*\d+)\s*\}";

pub const PARSE_ANCHOR: &str = r#"_ => throw new NotSupportedException($"Authentication method not supported (Received: {authType})")"#;
pub const PARSE_MARKER: &str =
    "AuthenticationRequestType.Sm3Password => AuthenticationSm3PasswordMessage.Load(buf),";

pub const AUTH_ANCHOR: &str = concat!(
    "default:\n",
    "                ",
    r#"throw new NotSupportedException($"Authentication method not supported (Received: {msg.AuthRequestType})");"#,
);
pub const AUTH_MARKER: &str = "case AuthenticationRequestType.Sm3Password";

const AUTH_CASE: &str = concat!(
    "case AuthenticationRequestType.Sm3Password:\n",
    "                await AuthenticateSm3(username, ((AuthenticationSm3PasswordMessage)msg).Salt, async, cancellationToken).ConfigureAwait(false);\n",
    "                break;\n",
    "            ",
);

/// A numbered group of steps announced by one banner.
#[derive(Debug, Clone)]
pub struct PatchStage {
    pub title: &'static str,
    pub steps: Vec<PatchStep>,
}

pub fn npgsql_sm3_stages() -> anyhow::Result<Vec<PatchStage>> {
    Ok(vec![
        PatchStage {
            title: "Add SM3 authentication request type",
            steps: vec![
                PatchStep::remove_pattern(
                    "request-type/remove-enum",
                    "Remove AuthenticationRequestType enum from AuthenticationMessages.cs",
                    AUTHENTICATION_MESSAGES,
                    REQUEST_TYPE_ENUM_MARKER,
                    REQUEST_TYPE_ENUM_PATTERN,
                )?,
                PatchStep::write_template(
                    "request-type/add-enum",
                    "Write AuthenticationRequestType.cs with Sm3Password",
                    AUTHENTICATION_REQUEST_TYPE,
                    templates::AUTHENTICATION_REQUEST_TYPE,
                ),
            ],
        },
        PatchStage {
            title: "Add SM3 authentication password message",
            steps: vec![PatchStep::write_template(
                "message/add-sm3-password-message",
                "Write AuthenticationSm3PasswordMessage.cs",
                SM3_PASSWORD_MESSAGE,
                templates::AUTHENTICATION_SM3_PASSWORD_MESSAGE,
            )],
        },
        PatchStage {
            title: "Add HighGo sm3 hash algorithm",
            steps: vec![PatchStep::write_template(
                "hash/add-sm3",
                "Write Sm3.cs",
                SM3,
                templates::SM3,
            )],
        },
        PatchStage {
            title: "Add AuthenticateSm3 method to NpgsqlConnector",
            steps: vec![PatchStep::write_template(
                "connector/add-authenticate-sm3",
                "Write NpgsqlConnector.Sm3.cs",
                CONNECTOR_SM3,
                templates::NPGSQL_CONNECTOR_SM3,
            )],
        },
        PatchStage {
            title: "Support load AuthenticationSm3PasswordMessage from server buffer in NpgsqlConnector.cs",
            steps: vec![PatchStep::replace_anchor(
                "connector/parse-sm3-message",
                "Parse AuthenticationSm3PasswordMessage in NpgsqlConnector.cs",
                CONNECTOR,
                PARSE_MARKER,
                PARSE_ANCHOR,
                format!("{PARSE_MARKER}\n                {PARSE_ANCHOR}"),
            )],
        },
        PatchStage {
            title: "Call AuthenticateSm3 when server use SM3 in NpgsqlConnector.Auth.cs",
            steps: vec![PatchStep::replace_anchor(
                "connector/dispatch-sm3-auth",
                "Dispatch Sm3Password to AuthenticateSm3 in NpgsqlConnector.Auth.cs",
                CONNECTOR_AUTH,
                AUTH_MARKER,
                AUTH_ANCHOR,
                format!("{AUTH_CASE}{AUTH_ANCHOR}"),
            )],
        },
    ])
}

/// Every step in execution order.
pub fn npgsql_sm3_steps() -> anyhow::Result<Vec<PatchStep>> {
    Ok(npgsql_sm3_stages()?
        .into_iter()
        .flat_map(|stage| stage.steps)
        .collect())
}

/// Templates the run cannot start without, including ones packaged but not written by a step.
pub fn required_templates() -> [&'static str; 5] {
    [
        templates::AUTHENTICATION_REQUEST_TYPE,
        templates::AUTHENTICATION_SM3_PASSWORD_MESSAGE,
        templates::SM3,
        templates::NPGSQL_CONNECTOR_SM3,
        templates::REQUIRE_AUTH_MODE,
    ]
}
