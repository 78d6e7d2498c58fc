use crate::{decode_column::ColumnMetadata, decode_column::decode_column};
use convert_case::{Case, Casing};
use syn::{Fields, ItemStruct, LitStr, Result, spanned::Spanned};

pub(crate) struct TableMetadata {
    pub(crate) item: ItemStruct,
    pub(crate) name: String,
    pub(crate) columns: Vec<ColumnMetadata>,
}

impl TableMetadata {
    pub(crate) fn persisted(&self) -> impl Iterator<Item = &ColumnMetadata> {
        self.columns.iter().filter(|c| !c.skip)
    }
}

pub(crate) fn decode_table(item: ItemStruct) -> Result<TableMetadata> {
    let mut name = item.ident.to_string().to_case(Case::Snake);
    for attr in item.attrs.iter().filter(|v| v.path().is_ident("record")) {
        attr.parse_nested_meta(|arg| {
            if arg.path.is_ident("name") {
                name = arg.value()?.parse::<LitStr>()?.value();
                Ok(())
            } else {
                Err(arg.error(
                    "Unknown record attribute, use it like: `#[record(name = \"my_table\")]`",
                ))
            }
        })?;
    }
    let Fields::Named(fields) = &item.fields else {
        return Err(syn::Error::new(
            item.span(),
            "Record can only be derived for structs with named fields",
        ));
    };
    let columns = fields
        .named
        .iter()
        .map(decode_column)
        .collect::<Result<Vec<_>>>()?;
    let result = TableMetadata {
        name,
        columns,
        item: item.clone(),
    };
    if result.persisted().next().is_none() {
        return Err(syn::Error::new(
            item.ident.span(),
            "A record needs at least one persisted field",
        ));
    }
    for (i, column) in result.persisted().enumerate() {
        if result
            .persisted()
            .take(i)
            .any(|other| other.name == column.name)
        {
            return Err(syn::Error::new(
                column.ident.span(),
                format!("Column `{}` is declared more than once", column.name),
            ));
        }
    }
    Ok(result)
}
