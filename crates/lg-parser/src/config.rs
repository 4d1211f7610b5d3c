use lg_core::Schema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_READ_CHUNK_SIZE: usize = 8 * 1024;
pub const DEFAULT_MAX_ELEMENT_BYTES: usize = 1024 * 1024;

/// Parser settings. Every field is optional in the JSON form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParserConfig {
    /// Capabilities per node type.
    pub schema: Schema,
    /// Pair every `next` edge with a `previous` edge in the other direction (and
    /// vice versa) when the document only declares one of them.
    pub synthesize_inverse_sequence: bool,
    /// Bytes requested from the reader per read.
    pub read_chunk_size: usize,
    /// Largest single element the reader will buffer.
    pub max_element_bytes: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            schema: Schema::default(),
            synthesize_inverse_sequence: true,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            max_element_bytes: DEFAULT_MAX_ELEMENT_BYTES,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid parser config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid parser config: {field} {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl ParserConfig {
    /// Loads and validates a JSON config.
    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.read_chunk_size == 0 {
            return Err(ConfigError::Invalid {
                field: "read_chunk_size",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.max_element_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "max_element_bytes",
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use lg_core::{Capability, CapabilitySet};

    use super::{ConfigError, DEFAULT_READ_CHUNK_SIZE, ParserConfig};

    #[test]
    fn empty_json_is_the_default() {
        assert_eq!(ParserConfig::from_json("{}").expect("config"), ParserConfig::default());
    }

    #[test]
    fn schema_and_limits_load_from_json() {
        let config = ParserConfig::from_json(
            r#"{
                "schema": {
                    "types": { "NP": ["ancestry", "span-container"] },
                    "fallback": []
                },
                "synthesize_inverse_sequence": false,
                "max_element_bytes": 4096
            }"#,
        )
        .expect("config");
        assert!(!config.synthesize_inverse_sequence);
        assert_eq!(config.read_chunk_size, DEFAULT_READ_CHUNK_SIZE);
        assert_eq!(config.max_element_bytes, 4096);
        assert_eq!(
            config.schema.capabilities_of("NP"),
            CapabilitySet::EMPTY
                .with(Capability::Ancestry)
                .with(Capability::SpanContainer)
        );
        assert_eq!(config.schema.capabilities_of("TOK"), CapabilitySet::EMPTY);
    }

    #[test]
    fn zero_sizes_are_rejected() {
        assert!(matches!(
            ParserConfig::from_json(r#"{"read_chunk_size": 0}"#),
            Err(ConfigError::Invalid {
                field: "read_chunk_size",
                ..
            })
        ));
        assert!(matches!(
            ParserConfig::from_json(r#"{"max_element_bytes": 0}"#),
            Err(ConfigError::Invalid {
                field: "max_element_bytes",
                ..
            })
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            ParserConfig::from_json(r#"{"chunk": 3}"#),
            Err(ConfigError::Json(_))
        ));
    }
}
