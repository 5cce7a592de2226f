use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, spanned::Spanned, ItemFn};

/// Marks a synchronous test that runs under `cargo test` natively and under
/// `wasm-bindgen-test` on `wasm32`.
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
  let input = parse_macro_input!(item as ItemFn);

  let raw_args = proc_macro2::TokenStream::from(attr);
  if !raw_args.is_empty() {
    return TokenStream::from(
      syn::Error::new(raw_args.span(), "rxsubject_macro::test takes no arguments")
        .to_compile_error(),
    );
  }

  if let Some(asyncness) = input.sig.asyncness {
    return TokenStream::from(
      syn::Error::new(
        asyncness.span(),
        "rxsubject_macro::test only supports sync tests: subjects notify synchronously",
      )
      .to_compile_error(),
    );
  }

  let expanded = quote! {
      #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
      #[cfg_attr(not(target_arch = "wasm32"), test)]
      #input
  };

  TokenStream::from(expanded)
}
