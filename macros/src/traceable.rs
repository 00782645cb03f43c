use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::spanned::Spanned;
use syn::{Attribute, Error, Expr, Ident, LitStr, Result, Token, Type, parse_macro_input};

struct ErrorVariant {
    attributes: Vec<Attribute>,
    message: LitStr,
    name: Ident,
    fields: Vec<(Ident, Type)>,
    level: Expr,
}

struct TraceableInput {
    enum_name: Ident,
    variants: Vec<ErrorVariant>,
}

impl Parse for TraceableInput {
    fn parse(input: ParseStream) -> Result<Self> {
        let enum_name = input.parse::<Ident>()?;

        let content;
        syn::braced!(content in input);

        let mut variants = Vec::new();
        while !content.is_empty() {
            let attributes = content.call(Attribute::parse_outer)?;

            let error_attribute = attributes
                .iter()
                .find(|attribute| attribute.path().is_ident("error"))
                .ok_or_else(|| Error::new(content.span(), "Missing #[error] attribute"))?;
            let message = match &error_attribute.meta {
                syn::Meta::List(list) => syn::parse2::<LitStr>(list.tokens.clone())?,
                _ => {
                    return Err(Error::new(
                        error_attribute.span(),
                        "Invalid error attribute format",
                    ));
                }
            };

            let name = content.parse::<Ident>()?;

            let mut fields = Vec::new();
            if content.peek(syn::token::Brace) {
                let fields_content;
                syn::braced!(fields_content in content);
                while !fields_content.is_empty() {
                    let field_name = fields_content.parse::<Ident>()?;
                    if field_name == "err" || field_name == "source" {
                        return Err(Error::new(
                            field_name.span(),
                            "`err` and `source` are reserved field names",
                        ));
                    }
                    fields_content.parse::<Token![:]>()?;
                    let field_type = fields_content.parse::<Type>()?;
                    fields.push((field_name, field_type));
                    if !fields_content.is_empty() {
                        fields_content.parse::<Token![,]>()?;
                    }
                }
            }

            content.parse::<Token![=>]>()?;
            let level = content.parse::<Expr>()?;

            if !content.is_empty() {
                content.parse::<Token![,]>()?;
            }

            variants.push(ErrorVariant {
                attributes,
                message,
                name,
                fields,
                level,
            });
        }

        Ok(TraceableInput {
            enum_name,
            variants,
        })
    }
}

impl ErrorVariant {
    fn has_no_source(&self) -> bool {
        self.attributes
            .iter()
            .any(|attribute| attribute.path().is_ident("no_source"))
    }

    fn docs(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes
            .iter()
            .filter(|attribute| attribute.path().is_ident("doc"))
    }

    fn constructor_name(&self) -> Ident {
        Ident::new(&snake_case(&self.name.to_string()), Span::call_site())
    }
}

fn snake_case(name: &str) -> String {
    let characters = name.chars().collect::<Vec<_>>();
    let mut result = String::with_capacity(name.len() + 4);
    for (index, character) in characters.iter().enumerate() {
        if character.is_uppercase() {
            let previous_lower = index > 0 && characters[index - 1].is_lowercase();
            let acronym_end = index > 0
                && characters[index - 1].is_uppercase()
                && characters
                    .get(index + 1)
                    .is_some_and(|next| next.is_lowercase());
            if previous_lower || acronym_end {
                result.push('_');
            }
            result.extend(character.to_lowercase());
        } else {
            result.push(*character);
        }
    }
    result
}

pub fn traceable_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as TraceableInput);

    let enum_name = &input.enum_name;
    let variants = &input.variants;

    let enum_variants = variants.iter().map(|variant| {
        let docs = variant.docs();
        let name = &variant.name;
        let message = &variant.message;
        let definitions = variant
            .fields
            .iter()
            .map(|(field, ty)| quote! { #field: #ty });

        match (variant.has_no_source(), variant.fields.is_empty()) {
            (true, true) => quote! {
                #(#docs)*
                #[error(#message)]
                #name
            },
            (true, false) => quote! {
                #(#docs)*
                #[error(#message)]
                #name { #(#definitions,)* }
            },
            (false, _) => quote! {
                #(#docs)*
                #[error(#message)]
                #name {
                    #(#definitions,)*
                    err: String
                }
            },
        }
    });

    let level_arms = variants.iter().map(|variant| {
        let name = &variant.name;
        let level = &variant.level;
        if variant.has_no_source() && variant.fields.is_empty() {
            quote! { Self::#name => #level }
        } else {
            quote! { Self::#name { .. } => #level }
        }
    });

    // Unit variants need no constructor; everything else gets a snake_case one.
    let constructors = variants.iter().filter_map(|variant| {
        if variant.has_no_source() && variant.fields.is_empty() {
            return None;
        }

        let name = &variant.name;
        let constructor = variant.constructor_name();
        let params = variant
            .fields
            .iter()
            .map(|(field, ty)| quote! { #field: impl Into<#ty> });
        let assignments = variant
            .fields
            .iter()
            .map(|(field, _)| quote! { #field: #field.into() });

        if variant.has_no_source() {
            Some(quote! {
                pub fn #constructor(#(#params),*) -> Self {
                    Self::#name {
                        #(#assignments,)*
                    }
                }
            })
        } else {
            Some(quote! {
                pub fn #constructor(#(#params,)* source: impl std::fmt::Display) -> Self {
                    Self::#name {
                        #(#assignments,)*
                        err: source.to_string()
                    }
                }
            })
        }
    });

    quote! {
        #[allow(dead_code)]
        #[derive(Debug, Clone, PartialEq, thiserror::Error, serde::Serialize, serde::Deserialize)]
        pub enum #enum_name {
            #(#enum_variants,)*
        }

        #[allow(dead_code)]
        impl #enum_name {
            pub fn level(&self) -> tracing::Level {
                match self {
                    #(#level_arms,)*
                }
            }

            #(#constructors)*
        }
    }
    .into()
}
