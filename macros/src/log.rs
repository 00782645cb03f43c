use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{Expr, Token, parse_macro_input};

struct LogInput {
    entry: Expr,
    context: Option<Expr>,
}

impl Parse for LogInput {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let entry = input.parse::<Expr>()?;

        let context = if input.peek(Token![,]) {
            input.parse::<Token![,]>()?;
            if input.is_empty() {
                None
            } else {
                Some(input.parse::<Expr>()?)
            }
        } else {
            None
        };

        Ok(LogInput { entry, context })
    }
}

// `tracing` needs the level as a constant, so every level gets its own arm.
fn dispatch_by_level(arguments: TokenStream2) -> TokenStream2 {
    quote! {
        match level {
            tracing::Level::ERROR => tracing::error!(#arguments),
            tracing::Level::WARN => tracing::warn!(#arguments),
            tracing::Level::INFO => tracing::info!(#arguments),
            tracing::Level::DEBUG => tracing::debug!(#arguments),
            _ => tracing::trace!(#arguments),
        }
    }
}

pub fn log_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as LogInput);
    let entry = &input.entry;

    let expanded = match &input.context {
        Some(context) => {
            let dispatch = dispatch_by_level(quote! { message = %message, context = ?context });
            quote! {
                {
                    let entry = &#entry;
                    let level = entry.level();
                    let message = entry.to_string();
                    let context = &#context;
                    #dispatch
                }
            }
        }
        None => {
            let dispatch = dispatch_by_level(quote! { "{}", message });
            quote! {
                {
                    let entry = &#entry;
                    let level = entry.level();
                    let message = entry.to_string();
                    #dispatch
                }
            }
        }
    };

    expanded.into()
}
