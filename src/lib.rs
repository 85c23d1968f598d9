mod consolidator;
mod error;
mod files;
mod filter;
mod gpx_types;
mod naming;
mod options;
mod parser;
mod writer;

use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

use crate::consolidator::Consolidator;

pub use crate::consolidator::{ConsolidationSummary, consolidate};
pub use crate::error::{ConsolidateError, GpxParseError};
pub use crate::files::{DEFAULT_INPUT_DIR, DEFAULT_OUTPUT, RunConfig, run};
pub use crate::filter::{ClockZone, FilterWindow, TimeOfDayRange};
pub use crate::gpx_types::{
    ConsolidatedGpx, GpxData, GpxEntry, GpxMetadata, GpxPoint, GpxSegment, GpxTrack,
    SourceDocument, XmlElement, XmlNode,
};
pub use crate::options::{
    ConsolidateOptions, ConsolidateRequest, DEFAULT_DOCUMENT_NAME, parse_clock_time,
    parse_filter_date,
};
pub use crate::parser::parse_gpx;

/// Merge in-memory GPX texts, given as `(file name, content)` pairs in order.
/// Returns the serialized document and the run summary.
pub fn consolidate_texts<'a>(
    sources: impl IntoIterator<Item = (&'a str, &'a str)>,
    options: ConsolidateOptions,
) -> Result<(String, ConsolidationSummary), ConsolidateError> {
    let mut consolidator = Consolidator::new(options);
    let mut count = 0usize;
    for (file_name, xml) in sources {
        consolidator.add_source(files::source_from_str(file_name, xml)?);
        count += 1;
    }
    if count == 0 {
        return Err(ConsolidateError::Configuration(
            "no GPX sources given".to_string(),
        ));
    }
    let (document, summary) = consolidator.finish();
    Ok((writer::write_gpx(&document)?, summary))
}

#[derive(Debug, Deserialize)]
struct SourceInput {
    name: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ConsolidatedOutput {
    gpx: String,
    summary: ConsolidationSummary,
}

/// Merge `[{ name, content }]` GPX sources into one GPX string.
#[wasm_bindgen(js_name = consolidateGpx)]
pub fn consolidate_gpx(sources: JsValue, options: JsValue) -> Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let (gpx, _) = consolidate_js(sources, options)?;
    Ok(gpx)
}

/// Same as `consolidateGpx`, returned as `{ gpx, summary }`.
#[wasm_bindgen(js_name = consolidateGpxWithSummary)]
pub fn consolidate_gpx_with_summary(sources: JsValue, options: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let (gpx, summary) = consolidate_js(sources, options)?;
    serde_wasm_bindgen::to_value(&ConsolidatedOutput { gpx, summary })
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

fn consolidate_js(
    sources: JsValue,
    options: JsValue,
) -> Result<(String, ConsolidationSummary), JsValue> {
    let inputs: Vec<SourceInput> =
        serde_wasm_bindgen::from_value(sources).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let opts = parse_options(options)?;
    let result = consolidate_texts(
        inputs
            .iter()
            .map(|input| (input.name.as_str(), input.content.as_str())),
        opts,
    )?;
    Ok(result)
}

fn parse_options(options: JsValue) -> Result<ConsolidateOptions, JsValue> {
    let request: ConsolidateRequest = if options.is_undefined() || options.is_null() {
        ConsolidateRequest::default()
    } else {
        serde_wasm_bindgen::from_value(options).map_err(|e| JsValue::from_str(&e.to_string()))?
    };
    Ok(request.into_options()?)
}
