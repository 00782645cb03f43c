use proc_macro::TokenStream;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{Attribute, Expr, Ident, LitStr, Token, Type, braced, parse_macro_input};

struct LoggableVariant {
    docs: Vec<Attribute>,
    message: LitStr,
    name: Ident,
    fields: Option<Vec<(Ident, Type)>>,
    level: Expr,
}

struct LoggableInput {
    enum_name: Ident,
    variants: Vec<LoggableVariant>,
}

impl Parse for LoggableInput {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let enum_name = input.parse::<Ident>()?;

        let content;
        braced!(content in input);

        let mut variants = Vec::new();
        while !content.is_empty() {
            let attributes = content.call(Attribute::parse_outer)?;
            let message = attributes
                .iter()
                .find(|attribute| attribute.path().is_ident("error"))
                .ok_or_else(|| content.error("Expected #[error(...)] attribute"))?
                .parse_args::<LitStr>()?;
            let docs = attributes
                .into_iter()
                .filter(|attribute| attribute.path().is_ident("doc"))
                .collect();

            let name = content.parse::<Ident>()?;

            let fields = if content.peek(syn::token::Brace) {
                let field_content;
                braced!(field_content in content);
                let mut fields = Vec::new();
                while !field_content.is_empty() {
                    let field_name = field_content.parse::<Ident>()?;
                    field_content.parse::<Token![:]>()?;
                    let field_type = field_content.parse::<Type>()?;
                    fields.push((field_name, field_type));
                    if field_content.peek(Token![,]) {
                        field_content.parse::<Token![,]>()?;
                    }
                }
                Some(fields)
            } else {
                None
            };

            content.parse::<Token![=>]>()?;
            let level = content.parse::<Expr>()?;

            if content.peek(Token![,]) {
                content.parse::<Token![,]>()?;
            }

            variants.push(LoggableVariant {
                docs,
                message,
                name,
                fields,
                level,
            });
        }

        Ok(LoggableInput {
            enum_name,
            variants,
        })
    }
}

pub fn loggable_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as LoggableInput);
    let enum_name = &input.enum_name;

    let enum_variants = input.variants.iter().map(|variant| {
        let docs = &variant.docs;
        let message = &variant.message;
        let name = &variant.name;
        match &variant.fields {
            Some(fields) => {
                let definitions = fields.iter().map(|(field, ty)| quote! { #field: #ty });
                quote! {
                    #(#docs)*
                    #[error(#message)]
                    #name { #(#definitions),* }
                }
            }
            None => quote! {
                #(#docs)*
                #[error(#message)]
                #name
            },
        }
    });

    let level_arms = input.variants.iter().map(|variant| {
        let name = &variant.name;
        let level = &variant.level;
        match &variant.fields {
            Some(_) => quote! { Self::#name { .. } => #level },
            None => quote! { Self::#name => #level },
        }
    });

    quote! {
        #[allow(dead_code)]
        #[derive(Debug, Clone, thiserror::Error, serde::Serialize, serde::Deserialize)]
        pub enum #enum_name {
            #(#enum_variants,)*
        }

        impl #enum_name {
            #[allow(dead_code)]
            pub fn level(&self) -> tracing::Level {
                match self {
                    #(#level_arms,)*
                }
            }
        }
    }
    .into()
}
