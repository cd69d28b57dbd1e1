//! Compile-time embedding of prompt templates.
//!
//! `include_zstd!("prompts/en.md")` reads the file relative to the calling
//! crate's manifest directory, rejects anything that is not UTF-8 text, and
//! expands to a zstd-compressed byte string literal.

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use std::env;
use std::fs;
use std::path::PathBuf;
use syn::{Error, LitByteStr, LitStr, parse_macro_input};

const COMPRESSION_LEVEL: i32 = 19;

macro_rules! bail {
    ($span:expr, $call:expr) => {
        match $call {
            Ok(val) => val,
            Err(err) => return Error::new($span, err).to_compile_error().into(),
        }
    };
}

#[proc_macro]
pub fn include_zstd(input: TokenStream) -> TokenStream {
    let input_lit = parse_macro_input!(input as LitStr);
    let span = input_lit.span();
    let file_path = input_lit.value();

    let manifest_dir = bail!(span, env::var("CARGO_MANIFEST_DIR"));
    let full_path = PathBuf::from(manifest_dir).join(&file_path);

    let content = bail!(span, fs::read(&full_path));
    let text = bail!(
        span,
        String::from_utf8(content).map_err(|e| format!("{} is not UTF-8: {e}", file_path))
    );
    if text.trim().is_empty() {
        return Error::new(span, format!("{file_path} is empty"))
            .to_compile_error()
            .into();
    }

    let compressed_data = bail!(
        span,
        zstd::stream::encode_all(text.as_bytes(), COMPRESSION_LEVEL)
    );
    let literal_bytes = LitByteStr::new(&compressed_data, Span::call_site());

    // Rebuild when the prompt changes.
    let track_path = full_path.to_string_lossy().into_owned();
    let output = quote!({
        const _: &[u8] = include_bytes!(#track_path);
        #literal_bytes
    });

    output.into()
}
