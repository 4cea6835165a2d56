//! Record derive macro implementation

use heck::ToUpperCamelCase;
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

#[derive(Default)]
struct FieldAttrs {
    column: Option<String>,
    primary: bool,
    unique: bool,
    composite: Option<String>,
    auto_timestamp: bool,
    nolog: bool,
    skip: bool,
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let table = get_table_name(&input)?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Record can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Record can only be derived for structs",
            ));
        }
    };

    let mut column_defs = Vec::with_capacity(fields.len());
    let mut value_exprs = Vec::with_capacity(fields.len());
    let mut put_arms = Vec::with_capacity(fields.len());

    for field in fields.iter() {
        let attrs = parse_field_attrs(field)?;
        if attrs.skip {
            continue;
        }

        let field_ident = field.ident.as_ref().ok_or_else(|| {
            syn::Error::new_spanned(field, "Record fields must be named")
        })?;
        let field_name = field_ident.to_string();
        let pascal = field_name.to_upper_camel_case();
        let column = attrs.column.unwrap_or_else(|| field_name.clone());

        let (nullable, inner_ty) = unwrap_option(&field.ty);
        let kind = kind_for(inner_ty);

        let primary = attrs.primary;
        let unique = attrs.unique;
        let auto_timestamp = attrs.auto_timestamp;
        let nolog = attrs.nolog;
        let composite = match &attrs.composite {
            Some(group) => quote! { ::core::option::Option::Some(#group) },
            None => quote! { ::core::option::Option::None },
        };

        column_defs.push(quote! {
            typedb::ColumnDef {
                field: #field_name,
                pascal: #pascal,
                column: #column,
                kind: #kind,
                nullable: #nullable,
                primary: #primary,
                unique: #unique,
                composite: #composite,
                auto_timestamp: #auto_timestamp,
                nolog: #nolog,
            }
        });

        value_exprs.push(quote! {
            typedb::ToValue::to_value(&self.#field_ident)
        });

        // Case-insensitive so Oracle's upcased result columns still land.
        put_arms.push(quote! {
            if column.eq_ignore_ascii_case(#column) {
                self.#field_ident = typedb::value::decode_column(column, value)?;
                return ::core::result::Result::Ok(());
            }
        });
    }

    Ok(quote! {
        impl typedb::Record for #name {
            fn table_name() -> &'static str {
                #table
            }

            fn columns() -> &'static [typedb::ColumnDef] {
                static COLUMNS: &[typedb::ColumnDef] = &[
                    #(#column_defs),*
                ];
                COLUMNS
            }

            fn values(&self) -> ::std::vec::Vec<typedb::Value> {
                ::std::vec![#(#value_exprs),*]
            }

            fn put(
                &mut self,
                column: &str,
                value: typedb::Value,
            ) -> typedb::DbResult<()> {
                #(#put_arms)*
                // Unmapped result columns are ignored.
                ::core::result::Result::Ok(())
            }
        }
    })
}

fn get_table_name(input: &DeriveInput) -> Result<String> {
    let mut table = None;
    for attr in &input.attrs {
        if !attr.path().is_ident("db") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                table = Some(meta.value()?.parse::<syn::LitStr>()?.value());
                Ok(())
            } else {
                Err(meta.error("unknown db attribute on struct"))
            }
        })?;
    }
    table.ok_or_else(|| {
        syn::Error::new_spanned(input, "Record requires #[db(table = \"...\")]")
    })
}

fn parse_field_attrs(field: &syn::Field) -> Result<FieldAttrs> {
    let mut out = FieldAttrs::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("db") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("column") {
                out.column = Some(meta.value()?.parse::<syn::LitStr>()?.value());
            } else if meta.path.is_ident("primary") {
                out.primary = true;
            } else if meta.path.is_ident("unique") {
                out.unique = true;
            } else if meta.path.is_ident("composite") {
                out.composite = Some(meta.value()?.parse::<syn::LitStr>()?.value());
            } else if meta.path.is_ident("auto_timestamp") {
                out.auto_timestamp = true;
            } else if meta.path.is_ident("nolog") {
                out.nolog = true;
            } else if meta.path.is_ident("skip") {
                out.skip = true;
            } else {
                return Err(meta.error("unknown db attribute on field"));
            }
            Ok(())
        })?;
    }
    Ok(out)
}

fn unwrap_option(ty: &syn::Type) -> (bool, &syn::Type) {
    if let syn::Type::Path(path) = ty {
        if let Some(segment) = path.path.segments.last() {
            if segment.ident == "Option" {
                if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
                    if let Some(syn::GenericArgument::Type(inner)) = args.args.first() {
                        return (true, inner);
                    }
                }
            }
        }
    }
    (false, ty)
}

/// Semantic kind from the (unwrapped) field type's last path segment.
fn kind_for(ty: &syn::Type) -> TokenStream {
    let ident = match ty {
        syn::Type::Path(path) => path.path.segments.last().map(|s| s.ident.to_string()),
        _ => None,
    };
    match ident.as_deref() {
        Some("i8" | "i16" | "i32" | "i64" | "isize") => quote! { typedb::Kind::Int },
        Some("u8" | "u16" | "u32" | "u64" | "usize") => quote! { typedb::Kind::UInt },
        Some("f32" | "f64") => quote! { typedb::Kind::Float },
        Some("bool") => quote! { typedb::Kind::Bool },
        Some("Vec") => quote! { typedb::Kind::Bytes },
        Some("NaiveDateTime" | "DateTime") => quote! { typedb::Kind::Timestamp },
        Some("Value") => quote! { typedb::Kind::Json },
        // String, Uuid and everything else binds through its ToValue impl.
        _ => quote! { typedb::Kind::Text },
    }
}
