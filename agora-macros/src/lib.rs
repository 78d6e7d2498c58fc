mod decode_column;
mod decode_table;
mod from_row;

use decode_table::{TableMetadata, decode_table};
use from_row::from_row;
use proc_macro::TokenStream;
use quote::quote;
use syn::{ItemStruct, parse_macro_input};

/// Derive `agora::Record`: the column mapping of a struct, checked at compile time.
///
/// ```ignore
/// #[derive(Record)]
/// #[record(name = "users")]
/// struct User {
///     #[record(primary_key)]
///     user_id: String,
///     #[record(name = "user_bio")]
///     bio: Option<String>,
///     #[record(skip)]
///     cached: bool,
/// }
/// ```
///
/// Fields are projected in declaration order. `Option` fields holding `None`
/// are left out of the projection, `skip` fields are never persisted and get
/// their `Default` value when read back.
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let item = parse_macro_input!(input as ItemStruct);
    match decode_table(item) {
        Ok(table) => encode_record(&table).into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn encode_record(table: &TableMetadata) -> proc_macro2::TokenStream {
    let item = &table.item;
    let struct_name = &item.ident;
    let (impl_generics, ty_generics, where_clause) = item.generics.split_for_impl();
    let table_name = &table.name;
    let columns_count = table.persisted().count();
    let column_defs = table.persisted().map(|c| {
        let name = &c.name;
        let field = c.ident.to_string();
        let optional = c.optional;
        let primary_key = c.primary_key;
        quote! {
            ::agora::ColumnDef {
                name: #name,
                field: #field,
                optional: #optional,
                primary_key: #primary_key,
            }
        }
    });
    let project = table.persisted().map(|c| {
        let name = &c.name;
        let ident = &c.ident;
        quote!(projection.push_field(#name, &self.#ident);)
    });
    let mut primary_keys = table.persisted().filter(|c| c.primary_key);
    let primary_key = match (primary_keys.next(), primary_keys.next()) {
        (Some(column), None) => {
            let name = &column.name;
            let ident = &column.ident;
            quote! {
                fn primary_key(&self) -> ::std::option::Option<(&'static str, ::agora::Value)> {
                    ::std::option::Option::Some((
                        #name,
                        ::agora::AsValue::as_value(::std::clone::Clone::clone(&self.#ident)),
                    ))
                }
            }
        }
        _ => quote!(),
    };
    let from_row = from_row(table);
    quote! {
        impl #impl_generics ::agora::Record for #struct_name #ty_generics #where_clause {
            fn table_name() -> &'static str {
                #table_name
            }

            fn columns() -> &'static [::agora::ColumnDef] {
                static COLUMNS: [::agora::ColumnDef; #columns_count] = [#(#column_defs),*];
                &COLUMNS
            }

            fn project(&self) -> ::agora::Projection {
                let mut projection = ::agora::Projection::with_capacity(#columns_count);
                #(#project)*
                projection
            }

            #from_row

            #primary_key
        }
    }
}
