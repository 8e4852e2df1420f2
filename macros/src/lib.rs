//! Procedural macros for doorlink-esp32 TAP testing.
//!
//! Provides `#[tap_test]`, which registers a function with the firmware's
//! TAP collector so the same test body can run on the host or on a board.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Expr, ExprLit, ItemFn, Lit, Meta, ReturnType};

/// Register a function as a TAP test.
///
/// Supported forms:
///
/// - `#[tap_test]`
/// - `#[tap_test(should_panic)]`
/// - `#[tap_test(should_panic = "message fragment")]`
///
/// A test passes when it returns normally (or `Ok(())`) and fails on panic
/// or `Err`.
///
/// ```ignore
/// use doorlink_esp32_macros::tap_test;
///
/// #[tap_test]
/// fn budget_starts_exhausted() {
///     assert!(SendBudget::new(1000).is_exhausted());
/// }
/// ```
#[proc_macro_attribute]
pub fn tap_test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input_fn = parse_macro_input!(item as ItemFn);

    let fn_name = &input_fn.sig.ident;
    let fn_name_str = fn_name.to_string();
    let fn_block = &input_fn.block;
    let fn_vis = &input_fn.vis;
    let fn_attrs = &input_fn.attrs;
    let fn_output = &input_fn.sig.output;

    let expectation = match parse_expectation(attr) {
        Ok(expectation) => expectation,
        Err(err) => return err.to_compile_error().into(),
    };

    let returns_result = matches!(fn_output, ReturnType::Type(_, _));

    let run_call = match expectation {
        Expectation::Pass if returns_result => quote! {
            runner.run(#fn_name_str, #fn_name);
        },
        Expectation::Pass => quote! {
            runner.run_assert(#fn_name_str, #fn_name);
        },
        Expectation::Panic(None) => quote! {
            runner.run_should_panic(#fn_name_str, #fn_name, None);
        },
        Expectation::Panic(Some(msg)) => quote! {
            runner.run_should_panic(#fn_name_str, #fn_name, Some(#msg));
        },
    };

    let expanded = quote! {
        #(#fn_attrs)*
        #fn_vis fn #fn_name() #fn_output #fn_block

        ::doorlink_esp32::testing::inventory::submit! {
            ::doorlink_esp32::testing::TapTestEntry::new(
                #fn_name_str,
                |runner: &mut ::doorlink_esp32::testing::TestRunner| {
                    #run_call
                }
            )
        }
    };

    TokenStream::from(expanded)
}

enum Expectation {
    Pass,
    Panic(Option<String>),
}

fn parse_expectation(attr: TokenStream) -> syn::Result<Expectation> {
    if attr.is_empty() {
        return Ok(Expectation::Pass);
    }

    let meta: Meta = syn::parse(attr)?;
    if !meta.path().is_ident("should_panic") {
        return Err(syn::Error::new_spanned(
            meta.path(),
            "tap_test: supported attributes are `should_panic` and `should_panic = \"msg\"`",
        ));
    }

    match meta {
        Meta::Path(_) => Ok(Expectation::Panic(None)),
        Meta::NameValue(nv) => match nv.value {
            Expr::Lit(ExprLit {
                lit: Lit::Str(s), ..
            }) => Ok(Expectation::Panic(Some(s.value()))),
            other => Err(syn::Error::new_spanned(
                other,
                "tap_test: should_panic expects a string literal",
            )),
        },
        Meta::List(list) => Err(syn::Error::new_spanned(
            list,
            "tap_test: use `should_panic` or `should_panic = \"msg\"`",
        )),
    }
}
