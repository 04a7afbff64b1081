use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, Data, DeriveInput, Fields, Lit, Meta};

/// Derive macro that generates a column-oriented `*Series` table for an
/// all-`f64` per-timestep struct.
///
/// The generated table has one `Vec<f64>` per field, with `with_capacity`,
/// `push`, `get`, `column`, `len` and `is_empty`. A `field_names()`
/// associated function is added to the source struct.
///
/// Attribute options, all under `#[series(...)]`:
/// - `name = "CustomName"` overrides the default `{StructName}Series`.
/// - `derive(Trait, ...)` adds derives to the generated table.
#[proc_macro_derive(Series, attributes(series))]
pub fn derive_series(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let name = &input.ident;

    let options = match SeriesOptions::from_attrs(&input) {
        Ok(options) => options,
        Err(err) => return err.to_compile_error().into(),
    };
    let table_name = options
        .name
        .unwrap_or_else(|| format_ident!("{}Series", name));
    let extra_derives = options.derives;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return syn::Error::new_spanned(
                    name,
                    "Series can only be derived for structs with named fields",
                )
                .to_compile_error()
                .into();
            }
        },
        _ => {
            return syn::Error::new_spanned(name, "Series can only be derived for structs")
                .to_compile_error()
                .into();
        }
    };

    if fields.is_empty() {
        return syn::Error::new_spanned(name, "Series struct must have at least one field")
            .to_compile_error()
            .into();
    }

    let mut field_names = Vec::new();
    let mut field_idents = Vec::new();
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        if !is_f64_type(&field.ty) {
            return syn::Error::new_spanned(&field.ty, "Series derive: all fields must be f64")
                .to_compile_error()
                .into();
        }
        field_names.push(ident.to_string());
        field_idents.push(ident);
    }

    let first_field = &field_idents[0];
    let field_name_strs: Vec<&str> = field_names.iter().map(|s| s.as_str()).collect();

    let table_fields = field_idents.iter().map(|f| quote! { pub #f: Vec<f64> });
    let with_cap_fields = field_idents
        .iter()
        .map(|f| quote! { #f: Vec::with_capacity(n) });
    let push_fields = field_idents.iter().map(|f| quote! { self.#f.push(row.#f); });
    let get_fields = field_idents.iter().map(|f| quote! { #f: self.#f[i] });
    let column_arms = field_idents
        .iter()
        .zip(&field_name_strs)
        .map(|(f, s)| quote! { #s => Some(self.#f.as_slice()), });

    let expanded = quote! {
        /// Column-oriented table of per-timestep values.
        #[derive(Debug, Clone, Default, PartialEq, #(#extra_derives),*)]
        pub struct #table_name {
            #(#table_fields,)*
        }

        impl #table_name {
            /// Pre-allocate all columns for `n` timesteps.
            pub fn with_capacity(n: usize) -> Self {
                Self {
                    #(#with_cap_fields,)*
                }
            }

            /// Append one timestep.
            pub fn push(&mut self, row: &#name) {
                #(#push_fields)*
            }

            /// Reassemble the row stored at index `i`.
            pub fn get(&self, i: usize) -> Option<#name> {
                if i >= self.len() {
                    return None;
                }
                Some(#name {
                    #(#get_fields,)*
                })
            }

            /// Look up a column by field name.
            pub fn column(&self, field: &str) -> Option<&[f64]> {
                match field {
                    #(#column_arms)*
                    _ => None,
                }
            }

            /// Number of timesteps stored.
            pub fn len(&self) -> usize {
                self.#first_field.len()
            }

            /// Returns `true` if no timesteps have been stored.
            pub fn is_empty(&self) -> bool {
                self.#first_field.is_empty()
            }
        }

        impl #name {
            /// Returns the field names in declaration order.
            pub fn field_names() -> &'static [&'static str] {
                &[#(#field_name_strs),*]
            }
        }
    };

    expanded.into()
}

#[derive(Default)]
struct SeriesOptions {
    name: Option<proc_macro2::Ident>,
    derives: Vec<proc_macro2::TokenStream>,
}

impl SeriesOptions {
    fn from_attrs(input: &DeriveInput) -> syn::Result<Self> {
        let mut options = Self::default();
        for attr in &input.attrs {
            if !attr.path().is_ident("series") {
                continue;
            }
            let nested = attr.parse_args_with(
                syn::punctuated::Punctuated::<Meta, syn::Token![,]>::parse_terminated,
            )?;
            for meta in nested {
                match meta {
                    Meta::NameValue(nv) if nv.path.is_ident("name") => {
                        if let syn::Expr::Lit(expr_lit) = &nv.value {
                            if let Lit::Str(lit_str) = &expr_lit.lit {
                                options.name = Some(format_ident!("{}", lit_str.value()));
                                continue;
                            }
                        }
                        return Err(syn::Error::new_spanned(
                            &nv.value,
                            "series(name = ...) expects a string literal",
                        ));
                    }
                    Meta::List(list) if list.path.is_ident("derive") => {
                        options.derives.push(list.tokens.clone());
                    }
                    other => {
                        return Err(syn::Error::new_spanned(
                            other,
                            "unknown series option, expected `name` or `derive`",
                        ));
                    }
                }
            }
        }
        Ok(options)
    }
}

fn is_f64_type(ty: &syn::Type) -> bool {
    if let syn::Type::Path(type_path) = ty {
        type_path.path.is_ident("f64")
    } else {
        false
    }
}
