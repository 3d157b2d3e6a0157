use proc_macro2::TokenStream;
use quote::quote;
use syn::{
    Data, DeriveInput, Error, Fields, GenericArgument, Index, Member, PathArguments, Result, Type,
};

/// Extracts `T` from `Option<Arc<T>>`.
fn dependency_type(ty: &Type) -> Option<&Type> {
    let inner = single_generic(ty, "Option")?;
    single_generic(inner, "Arc")
}

/// Returns `A` when `ty` is `<ident><A>` (matched on the last path segment).
fn single_generic<'a>(ty: &'a Type, ident: &str) -> Option<&'a Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    if type_path.qself.is_some() {
        return None;
    }
    let segment = type_path.path.segments.last()?;
    if segment.ident != ident {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    if args.args.len() != 1 {
        return None;
    }
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

pub fn derive_injectable(input: &DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Struct(data) = &input.data else {
        return Err(Error::new_spanned(
            name,
            "Injectable can only be derived for structs",
        ));
    };

    let fields: Vec<_> = match &data.fields {
        Fields::Named(named) => named.named.iter().collect(),
        Fields::Unnamed(unnamed) => unnamed.unnamed.iter().collect(),
        Fields::Unit => Vec::new(),
    };

    let mut assignments = Vec::new();
    for (index, field) in fields.into_iter().enumerate() {
        let Some(attr) = field.attrs.iter().find(|a| a.path().is_ident("inject")) else {
            continue;
        };
        attr.meta.require_path_only()?;

        let dependency = dependency_type(&field.ty).ok_or_else(|| {
            Error::new_spanned(
                &field.ty,
                "#[inject] fields must have the type `Option<Arc<T>>`",
            )
        })?;

        let member = match &field.ident {
            Some(ident) => Member::Named(ident.clone()),
            None => Member::Unnamed(Index::from(index)),
        };

        assignments.push(quote! {
            self.#member = ::core::option::Option::Some(
                scope.resolve::<#dependency>()?
            );
        });
    }

    let scope_ident = if assignments.is_empty() {
        quote!(_scope)
    } else {
        quote!(scope)
    };

    Ok(quote! {
        impl #impl_generics ::lapis_core::container::Injectable for #name #ty_generics #where_clause {
            fn inject(
                &mut self,
                #scope_ident: &mut ::lapis_core::container::Scope<'_>,
            ) -> ::lapis_core::error::ContainerResult<()> {
                #(#assignments)*
                ::core::result::Result::Ok(())
            }
        }
    })
}
