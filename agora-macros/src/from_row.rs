use crate::decode_table::TableMetadata;
use proc_macro2::TokenStream;
use quote::quote;

pub(crate) fn from_row(table: &TableMetadata) -> TokenStream {
    let fields = table.columns.iter().map(|c| {
        let ident = &c.ident;
        let name = &c.name;
        if c.skip {
            quote!(#ident: ::std::default::Default::default())
        } else {
            quote!(#ident: row.take(#name)?)
        }
    });
    quote! {
        fn from_row(mut row: ::agora::RowLabeled) -> ::agora::Result<Self> {
            ::std::result::Result::Ok(Self {
                #(#fields,)*
            })
        }
    }
}
