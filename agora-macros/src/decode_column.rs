use syn::{Field, Ident, LitStr, Result, Type, ext::IdentExt, spanned::Spanned};

pub(crate) struct ColumnMetadata {
    pub(crate) ident: Ident,
    pub(crate) name: String,
    pub(crate) optional: bool,
    pub(crate) primary_key: bool,
    pub(crate) skip: bool,
}

/// `Option<_>` fields take part in sparse writes. Detected on the last path segment,
/// so `Option`, `std::option::Option` and `core::option::Option` all work.
fn is_option(ty: &Type) -> bool {
    match ty {
        Type::Path(path) if path.qself.is_none() => path
            .path
            .segments
            .last()
            .is_some_and(|v| v.ident == "Option"),
        Type::Group(group) => is_option(&group.elem),
        Type::Paren(paren) => is_option(&paren.elem),
        _ => false,
    }
}

pub(crate) fn decode_column(field: &Field) -> Result<ColumnMetadata> {
    let Some(ident) = field.ident.clone() else {
        return Err(syn::Error::new(field.span(), "Field is expected to have a name"));
    };
    let mut metadata = ColumnMetadata {
        name: ident.unraw().to_string(),
        ident,
        optional: is_option(&field.ty),
        primary_key: false,
        skip: false,
    };
    for attr in field.attrs.iter().filter(|v| v.path().is_ident("record")) {
        attr.parse_nested_meta(|arg| {
            if arg.path.is_ident("name") {
                metadata.name = arg.value()?.parse::<LitStr>()?.value();
                if metadata.name.is_empty() {
                    return Err(arg.error("The column name cannot be empty"));
                }
            } else if arg.path.is_ident("primary_key") {
                metadata.primary_key = true;
            } else if arg.path.is_ident("skip") {
                metadata.skip = true;
            } else {
                return Err(arg.error(
                    "Unknown record attribute, expected one of: `name = \"column\"`, `primary_key`, `skip`",
                ));
            }
            Ok(())
        })?;
    }
    if metadata.skip && metadata.primary_key {
        return Err(syn::Error::new(
            metadata.ident.span(),
            "A skipped field cannot be part of the primary key",
        ));
    }
    Ok(metadata)
}
