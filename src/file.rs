use serde_json::{Value, json};

use crate::errors::FormatError;

/// Warning injected into every written credential document. Write-only
/// metadata: readers ignore it.
pub const FILE_WARNING: &str = "Do not share this file with anyone! It contains a refresh token \
     that can be used to log into your minecraft account.";

/// Persisted credential document.
///
/// A closed tagged union: the `type` field selects the variant, and an
/// unrecognized discriminator is a [`FormatError`]. Future credential kinds
/// are added as new variants of this enum, never as a replacement of the
/// base contract. Encoding and decoding are written out by hand so the field
/// names, the discriminator and the injected warning stay visible in code.
///
/// Only the refresh token is persisted; access and session tokens are always
/// re-derived by running the chain again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialFile {
    Microsoft(MicrosoftCredentials),
}

/// The `"type": "microsoft"` variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MicrosoftCredentials {
    /// Client id of the application registration that issued the refresh
    /// token. A refresh token is only valid for the registration it was
    /// issued to.
    pub client_id: String,
    pub refresh_token: String,
}

impl CredentialFile {
    /// Encode to a json document, injecting the fixed warning string.
    pub fn to_json(&self) -> Value {
        match self {
            CredentialFile::Microsoft(credentials) => json!({
                "type": "microsoft",
                "clientId": credentials.client_id,
                "refreshToken": credentials.refresh_token,
                "warning": FILE_WARNING,
            }),
        }
    }

    /// Decode from a json document, dispatching on the `type` discriminator.
    pub fn from_json(value: &Value) -> Result<Self, FormatError> {
        let object = value.as_object().ok_or(FormatError::NotAnObject)?;

        let field = |name: &'static str| -> Result<&str, FormatError> {
            object
                .get(name)
                .and_then(Value::as_str)
                .ok_or(FormatError::MissingField(name))
        };

        match field("type")? {
            "microsoft" => Ok(CredentialFile::Microsoft(MicrosoftCredentials {
                client_id: field("clientId")?.to_string(),
                refresh_token: field("refreshToken")?.to_string(),
            })),
            other => Err(FormatError::UnknownType(other.to_string())),
        }
    }

    /// Serialize to bytes suitable for writing to a file.
    pub fn write(&self) -> Vec<u8> {
        self.to_json().to_string().into_bytes()
    }

    /// Parse a previously written credential file.
    pub fn read(bytes: &[u8]) -> Result<Self, FormatError> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_json(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CredentialFile {
        CredentialFile::Microsoft(MicrosoftCredentials {
            client_id: "00000000402b5328".to_string(),
            refresh_token: "R1".to_string(),
        })
    }

    #[test]
    fn round_trips_through_bytes() {
        let file = sample();
        let parsed = CredentialFile::read(&file.write()).unwrap();
        assert_eq!(parsed, file);
    }

    #[test]
    fn written_document_carries_discriminator_and_warning() {
        let document = sample().to_json();
        assert_eq!(document["type"], "microsoft");
        assert_eq!(document["clientId"], "00000000402b5328");
        assert_eq!(document["refreshToken"], "R1");
        assert_eq!(document["warning"], FILE_WARNING);
    }

    #[test]
    fn warning_is_ignored_on_read() {
        let document = br#"{"type":"microsoft","clientId":"c","refreshToken":"r","warning":"anything at all"}"#;
        let parsed = CredentialFile::read(document).unwrap();
        assert_eq!(
            parsed,
            CredentialFile::Microsoft(MicrosoftCredentials {
                client_id: "c".to_string(),
                refresh_token: "r".to_string(),
            })
        );

        // Absence of the warning is just as fine.
        let without = br#"{"type":"microsoft","clientId":"c","refreshToken":"r"}"#;
        assert_eq!(CredentialFile::read(without).unwrap(), parsed);
    }

    #[test]
    fn unknown_discriminator_is_a_format_error() {
        let document = br#"{"type":"yggdrasil","clientId":"c","refreshToken":"r"}"#;
        let error = CredentialFile::read(document).unwrap_err();
        assert!(matches!(error, FormatError::UnknownType(kind) if kind == "yggdrasil"));
    }

    #[test]
    fn missing_fields_are_format_errors() {
        let no_type = br#"{"clientId":"c","refreshToken":"r"}"#;
        assert!(matches!(
            CredentialFile::read(no_type).unwrap_err(),
            FormatError::MissingField("type")
        ));

        let no_token = br#"{"type":"microsoft","clientId":"c"}"#;
        assert!(matches!(
            CredentialFile::read(no_token).unwrap_err(),
            FormatError::MissingField("refreshToken")
        ));
    }

    #[test]
    fn garbage_input_is_a_format_error() {
        assert!(matches!(
            CredentialFile::read(b"not json").unwrap_err(),
            FormatError::Json(_)
        ));
        assert!(matches!(
            CredentialFile::read(b"[1,2,3]").unwrap_err(),
            FormatError::NotAnObject
        ));
    }
}
