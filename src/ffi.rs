//! C-ABI FFI bindings for cross-language integration.
//!
//! Every function takes and returns JSON strings so editor front-ends in other
//! languages can share the codec and the pagination engine.

use std::ffi::{c_char, CStr, CString};
use std::ptr;

use crate::codec::DocumentCodec;
use crate::model::{DocumentNode, PortableContentItem};
use crate::paginate::{paginate, HeightMap, PaginationOptions};
use crate::render::{to_json, JsonFormat};

/// Result structure returned by FFI functions.
#[repr(C)]
pub struct PlandocResult {
    /// Whether the operation succeeded.
    pub success: bool,
    /// The result data (null if failed). Must be freed with `plandoc_free_result`.
    pub data: *mut c_char,
    /// Error message (null if succeeded). Must be freed with `plandoc_free_result`.
    pub error: *mut c_char,
}

impl PlandocResult {
    fn success(data: String) -> Self {
        Self {
            success: true,
            data: CString::new(data).unwrap_or_default().into_raw(),
            error: ptr::null_mut(),
        }
    }

    fn error(message: String) -> Self {
        Self {
            success: false,
            data: ptr::null_mut(),
            error: CString::new(message).unwrap_or_default().into_raw(),
        }
    }

    fn from_result(result: crate::Result<String>) -> Self {
        match result {
            Ok(json) => Self::success(json),
            Err(e) => Self::error(e.to_string()),
        }
    }
}

unsafe fn read_str<'a>(ptr: *const c_char, name: &str) -> Result<&'a str, PlandocResult> {
    if ptr.is_null() {
        return Err(PlandocResult::error(format!("{} cannot be null", name)));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| PlandocResult::error(format!("Invalid UTF-8 in {}", name)))
}

fn format_of(pretty: bool) -> JsonFormat {
    if pretty {
        JsonFormat::Pretty
    } else {
        JsonFormat::Compact
    }
}

/// Encode an editor tree (JSON) into portable items (JSON array).
///
/// # Safety
///
/// `tree_json` must be a valid null-terminated UTF-8 string.
/// The returned result must be freed with `plandoc_free_result`.
#[no_mangle]
pub unsafe extern "C" fn plandoc_encode(tree_json: *const c_char, pretty: bool) -> PlandocResult {
    let json = match read_str(tree_json, "tree") {
        Ok(s) => s,
        Err(e) => return e,
    };
    PlandocResult::from_result(encode_internal(json, format_of(pretty)))
}

fn encode_internal(json: &str, format: JsonFormat) -> crate::Result<String> {
    let tree: DocumentNode = serde_json::from_str(json)?;
    let items = DocumentCodec::default().encode(&tree);
    to_json(&items, format)
}

/// Decode portable items (JSON array) into an editor tree (JSON).
///
/// # Safety
///
/// `items_json` must be a valid null-terminated UTF-8 string.
/// The returned result must be freed with `plandoc_free_result`.
#[no_mangle]
pub unsafe extern "C" fn plandoc_decode(items_json: *const c_char, pretty: bool) -> PlandocResult {
    let json = match read_str(items_json, "items") {
        Ok(s) => s,
        Err(e) => return e,
    };
    PlandocResult::from_result(decode_internal(json, format_of(pretty)))
}

fn decode_internal(json: &str, format: JsonFormat) -> crate::Result<String> {
    let items: Vec<PortableContentItem> = serde_json::from_str(json)?;
    let tree = DocumentCodec::default().decode(&items);
    to_json(&tree, format)
}

/// Paginate measured heights (JSON array of arrays) into pages (JSON).
///
/// `options_json` may be null to use the A4 defaults.
///
/// # Safety
///
/// `heights_json` must be a valid null-terminated UTF-8 string.
/// `options_json` must be null or a valid null-terminated UTF-8 string.
/// The returned result must be freed with `plandoc_free_result`.
#[no_mangle]
pub unsafe extern "C" fn plandoc_paginate(
    heights_json: *const c_char,
    options_json: *const c_char,
) -> PlandocResult {
    let heights = match read_str(heights_json, "heights") {
        Ok(s) => s,
        Err(e) => return e,
    };
    let options = if options_json.is_null() {
        None
    } else {
        match read_str(options_json, "options") {
            Ok(s) => Some(s),
            Err(e) => return e,
        }
    };
    PlandocResult::from_result(paginate_internal(heights, options))
}

fn paginate_internal(heights: &str, options: Option<&str>) -> crate::Result<String> {
    let heights: HeightMap = serde_json::from_str(heights)?;
    let options = match options {
        Some(json) => serde_json::from_str(json)?,
        None => PaginationOptions::a4(),
    };
    to_json(&paginate(&heights, &options), JsonFormat::Compact)
}

/// Free a result returned by any plandoc function.
///
/// # Safety
///
/// The `result` must have been returned by a plandoc function.
/// This function should only be called once per result.
#[no_mangle]
pub unsafe extern "C" fn plandoc_free_result(result: PlandocResult) {
    if !result.data.is_null() {
        drop(CString::from_raw(result.data));
    }
    if !result.error.is_null() {
        drop(CString::from_raw(result.error));
    }
}

/// Get the version of the plandoc library.
///
/// The returned string is statically allocated and should not be freed.
#[no_mangle]
pub extern "C" fn plandoc_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe fn data(result: &PlandocResult) -> String {
        CStr::from_ptr(result.data).to_str().unwrap().to_string()
    }

    #[test]
    fn test_version() {
        assert!(!plandoc_version().is_null());
    }

    #[test]
    fn test_null_input() {
        unsafe {
            let result = plandoc_encode(ptr::null(), false);
            assert!(!result.success);
            assert!(!result.error.is_null());
            plandoc_free_result(result);
        }
    }

    #[test]
    fn test_encode() {
        let tree = CString::new(
            r#"{"type":"doc","content":[{"type":"paragraph","content":[{"type":"text","text":"Hi"}]}]}"#,
        )
        .unwrap();
        unsafe {
            let result = plandoc_encode(tree.as_ptr(), false);
            assert!(result.success);
            assert_eq!(data(&result), r#"[{"type":"text","value":"Hi"}]"#);
            plandoc_free_result(result);
        }
    }

    #[test]
    fn test_paginate_default_options() {
        let heights = CString::new("[[100.0,200.0]]").unwrap();
        unsafe {
            let result = plandoc_paginate(heights.as_ptr(), ptr::null());
            assert!(result.success);
            let pages: serde_json::Value = serde_json::from_str(&data(&result)).unwrap();
            assert_eq!(pages.as_array().unwrap().len(), 1);
            plandoc_free_result(result);
        }
    }

    #[test]
    fn test_invalid_json() {
        let bad = CString::new("{").unwrap();
        unsafe {
            let result = plandoc_decode(bad.as_ptr(), true);
            assert!(!result.success);
            plandoc_free_result(result);
        }
    }
}
