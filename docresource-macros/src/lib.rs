//! Procedural macros for the docresource project.
//!
//! `#[derive(Document)]` implements the `Document` trait for a struct with
//! named fields. The collection comes from `#[document(collection = "...")]`
//! and defaults to the struct name in snake case with an `s` appended. The
//! identifier is the field named `id`, or the field marked `#[document(id)]`.
//!
//! ```ignore
//! #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! #[document(collection = "blogs")]
//! pub struct Blog {
//!     pub id: Uuid,
//!     pub title: String,
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docresource_macros;

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Ident, LitStr, parse_macro_input};

#[proc_macro_derive(Document, attributes(document))]
pub fn derive_document(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand_document(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_document(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let collection = collection_name(input)?;
    let id_field = id_field(input)?;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::docresource::document::Document for #name #ty_generics #where_clause {
            fn id(&self) -> &::docresource::bson::Uuid {
                &self.#id_field
            }

            fn collection_name() -> &'static str {
                #collection
            }
        }
    })
}

fn collection_name(input: &DeriveInput) -> syn::Result<LitStr> {
    let mut collection = None;

    for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("document")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("collection") {
                collection = Some(meta.value()?.parse::<LitStr>()?);
                Ok(())
            } else {
                Err(meta.error("expected `collection = \"...\"`"))
            }
        })?;
    }

    Ok(collection.unwrap_or_else(|| {
        LitStr::new(&format!("{}s", snake_case(&input.ident.to_string())), Span::call_site())
    }))
}

fn id_field(input: &DeriveInput) -> syn::Result<Ident> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(input, "Document can only be derived for structs"));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(input, "Document requires named fields"));
    };

    let mut marked = None;
    for field in &fields.named {
        for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("document")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("id") {
                    marked = field.ident.clone();
                    Ok(())
                } else {
                    Err(meta.error("expected `id`"))
                }
            })?;
        }
    }

    marked
        .or_else(|| {
            fields
                .named
                .iter()
                .filter_map(|field| field.ident.clone())
                .find(|ident| ident == "id")
        })
        .ok_or_else(|| syn::Error::new_spanned(input, "Document needs an `id` field or a field marked #[document(id)]"))
}

fn snake_case(name: &str) -> String {
    let mut snake = String::with_capacity(name.len() + 4);

    for (index, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if index > 0 {
                snake.push('_');
            }
            snake.extend(c.to_lowercase());
        } else {
            snake.push(c);
        }
    }

    snake
}
