use thiserror::Error;
use wasm_bindgen::JsValue;

/// A GPX source that is not well-formed markup.
#[derive(Debug, Error)]
pub enum GpxParseError {
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("malformed attribute: {0}")]
    Attribute(String),
    #[error("bad escape sequence: {0}")]
    Escape(String),
    #[error("unclosed <{0}> at end of input")]
    UnclosedElement(String),
    #[error("document has no root element")]
    NoRootElement,
    #[error("{0} outside the root element")]
    OutsideRoot(String),
}

#[derive(Debug, Error)]
pub enum ConsolidateError {
    #[error("{0}")]
    Configuration(String),
    #[error("failed to parse {source_name}: {source}")]
    Parse {
        source_name: String,
        #[source]
        source: GpxParseError,
    },
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize consolidated GPX: {0}")]
    Serialize(String),
}

impl ConsolidateError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

impl From<ConsolidateError> for JsValue {
    fn from(e: ConsolidateError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}
