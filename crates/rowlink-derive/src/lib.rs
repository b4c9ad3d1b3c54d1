//! Derive macro for rowlink records.
//!
//! `#[derive(Record)]` generates the static field table that rowlink uses to
//! correlate columns with fields and to read and write field values.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Expr, Fields, Ident, Lit, Type};

/// Derives `rowlink::Record` for a struct with named fields.
///
/// Every field type must implement `rowlink::NativeType` and the struct must
/// implement `Default`.
///
/// # Field Attributes
///
/// - `#[record(name = "userName")]` - Name used when matching columns
///   (optional, defaults to the field name)
/// - `#[record(skip)]` - Leaves the field out of the mapping; it keeps its
///   default value when records are read
///
/// # Example
///
/// ```ignore
/// use rowlink_derive::Record;
///
/// #[derive(Debug, Default, Record)]
/// struct User {
///     id: i32,
///     #[record(name = "userName")]
///     name: String,
///     #[record(skip)]
///     session: Option<String>,
/// }
/// ```
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive_record_impl(&input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

fn derive_record_impl(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let mapped = mapped_fields(input)?;

    let accessors: Vec<TokenStream2> = mapped
        .iter()
        .map(|info| {
            let ident = &info.ident;
            let ty = &info.ty;
            let getter = format_ident!("__rowlink_get_{}", ident.unraw());
            let setter = format_ident!("__rowlink_set_{}", ident.unraw());
            quote! {
                #[allow(non_snake_case)]
                fn #getter(record: &#struct_name) -> ::rowlink::Value {
                    <#ty as ::rowlink::NativeType>::to_value(&record.#ident)
                }

                #[allow(non_snake_case)]
                fn #setter(
                    record: &mut #struct_name,
                    value: ::rowlink::Value,
                ) -> ::core::result::Result<(), ::rowlink::ValueError> {
                    record.#ident = <#ty as ::rowlink::NativeType>::from_value(value)?;
                    ::core::result::Result::Ok(())
                }
            }
        })
        .collect();

    let entries: Vec<TokenStream2> = mapped
        .iter()
        .map(|info| {
            let ty = &info.ty;
            let name = &info.name;
            let getter = format_ident!("__rowlink_get_{}", info.ident.unraw());
            let setter = format_ident!("__rowlink_set_{}", info.ident.unraw());
            quote! {
                ::rowlink::Field {
                    name: #name,
                    kind: <#ty as ::rowlink::NativeType>::KIND,
                    get: #getter,
                    set: #setter,
                }
            }
        })
        .collect();

    let expanded = quote! {
        impl ::rowlink::Record for #struct_name {
            fn fields() -> &'static [::rowlink::Field<Self>] {
                #(#accessors)*

                static FIELDS: &[::rowlink::Field<#struct_name>] = &[
                    #(#entries),*
                ];
                FIELDS
            }
        }
    };

    Ok(expanded)
}

/// Collects the non-skipped named fields, rejecting duplicate names.
fn mapped_fields(input: &DeriveInput) -> syn::Result<Vec<FieldInfo>> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Record derive does not support generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Record derive only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Record derive only supports structs",
            ));
        }
    };

    let mut mapped: Vec<FieldInfo> = Vec::new();
    for field in fields {
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let attrs = parse_record_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }
        let name = attrs.name.unwrap_or_else(|| ident.unraw().to_string());
        mapped.push(FieldInfo {
            ident,
            ty: field.ty.clone(),
            name,
        });
    }

    let mut seen = std::collections::HashSet::new();
    for info in &mapped {
        if !seen.insert(info.name.as_str()) {
            return Err(syn::Error::new_spanned(
                &info.ident,
                format!("duplicate record field name `{}`", info.name),
            ));
        }
    }
    Ok(mapped)
}

struct FieldInfo {
    ident: Ident,
    ty: Type,
    name: String,
}

#[derive(Default)]
struct RecordAttrs {
    name: Option<String>,
    skip: bool,
}

fn parse_record_attrs(attrs: &[Attribute]) -> syn::Result<RecordAttrs> {
    let mut result = RecordAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("record") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                result.skip = true;
                Ok(())
            } else if meta.path.is_ident("name") {
                let value: Expr = meta.value()?.parse()?;
                match value {
                    Expr::Lit(syn::ExprLit {
                        lit: Lit::Str(s), ..
                    }) => {
                        result.name = Some(s.value());
                        Ok(())
                    }
                    other => Err(syn::Error::new_spanned(other, "expected a string literal")),
                }
            } else {
                Err(meta.error("unsupported record attribute"))
            }
        })?;
    }

    Ok(result)
}
