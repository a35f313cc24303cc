use proc_macro::TokenStream;
use quote::{quote, quote_spanned};
use syn::spanned::Spanned;
use syn::{
    Attribute, Data, DeriveInput, Expr, ExprLit, Field, Fields, Lit, Type, parse_macro_input,
};

/// Derives `crate::config::Overlay` for an argument struct and, when
/// `#[armctl(try_into = "Target")]` is present, a `TryFrom<Self>` conversion
/// into the resolved configuration type.
///
/// Field attributes:
///
/// * `#[armctl(default = expr)]` value used when no layer provided one.
///   String literals are parsed with `FromStr`.
/// * `#[armctl(optional)]` keep the `Option` in the target.
/// * `#[armctl(skip)]` field does not exist on the target.
/// * `#[armctl(try_into)]` convert a non-optional field with `TryInto`.
/// * `#[armctl(allow_mismatched_flatten)]` silence the flatten consistency check.
#[proc_macro_derive(LayeredConfig, attributes(armctl))]
pub fn derive_layered_config(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let fields = match named_fields(&input) {
        Ok(f) => f,
        Err(e) => return e.into_compile_error().into(),
    };

    let mut parsed = Vec::with_capacity(fields.len());
    for field in fields {
        match FieldOpts::parse(field) {
            Ok(opts) => parsed.push((field, opts)),
            Err(e) => return e.into_compile_error().into(),
        }
    }

    let target = match struct_target(&input.attrs) {
        Ok(t) => t,
        Err(e) => return e.into_compile_error().into(),
    };

    let struct_name = &input.ident;

    let overlay = parsed.iter().map(|(f, _)| {
        let name = &f.ident;
        quote_spanned! {f.span()=>
            #name: crate::config::Overlay::overlay(self.#name, top.#name)
        }
    });

    let conversion = target.map(|target| {
        let assignments = parsed
            .iter()
            .filter(|(_, opts)| !opts.skip)
            .map(|(f, opts)| field_conversion(f, opts));
        quote! {
            #[automatically_derived]
            impl TryFrom<#struct_name> for #target {
                type Error = crate::config::ConfigError;

                fn try_from(args: #struct_name) -> Result<Self, Self::Error> {
                    Ok(Self {
                        #(#assignments),*
                    })
                }
            }
        }
    });

    let expanded = quote! {
        #[automatically_derived]
        impl crate::config::Overlay for #struct_name {
            fn overlay(self, top: Self) -> Self {
                Self { #(#overlay),* }
            }
        }

        #conversion
    };

    TokenStream::from(expanded)
}

#[derive(Default)]
struct FieldOpts {
    default: Option<Expr>,
    optional: bool,
    skip: bool,
    try_into: bool,
    allow_mismatched_flatten: bool,
}

impl FieldOpts {
    fn parse(field: &Field) -> syn::Result<Self> {
        let mut opts = Self::default();
        for attr in field.attrs.iter().filter(|a| a.path().is_ident("armctl")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("default") {
                    opts.default = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("optional") {
                    opts.optional = true;
                } else if meta.path.is_ident("skip") {
                    opts.skip = true;
                } else if meta.path.is_ident("try_into") {
                    opts.try_into = true;
                } else if meta.path.is_ident("allow_mismatched_flatten") {
                    opts.allow_mismatched_flatten = true;
                } else {
                    return Err(meta.error("unsupported armctl attribute"));
                }
                Ok(())
            })?;
        }
        opts.check(field)?;
        Ok(opts)
    }

    fn check(&self, field: &Field) -> syn::Result<()> {
        let clap_flatten = ["command", "clap", "arg"]
            .iter()
            .any(|k| has_nested(&field.attrs, k, "flatten"));
        let serde_flatten = has_nested(&field.attrs, "serde", "flatten");

        if !self.allow_mismatched_flatten && clap_flatten != serde_flatten {
            return Err(syn::Error::new(
                field.span(),
                "armctl: `flatten` must be set on both clap and serde, \
                 or use #[armctl(allow_mismatched_flatten)]",
            ));
        }

        // A clap default is filled in before the config file is read and would shadow it.
        let clap_default = ["clap", "arg"].iter().any(|k| {
            has_nested(&field.attrs, k, "default_value")
                || has_nested(&field.attrs, k, "default_value_t")
        });
        if clap_default {
            return Err(syn::Error::new(
                field.span(),
                "armctl: use #[armctl(default = ...)] instead of a clap default",
            ));
        }

        if self.optional && self.default.is_some() {
            return Err(syn::Error::new(
                field.span(),
                "armctl: a field cannot be both `optional` and have a `default`",
            ));
        }
        Ok(())
    }
}

fn field_conversion(field: &Field, opts: &FieldOpts) -> proc_macro2::TokenStream {
    let name = &field.ident;
    let flag = name
        .as_ref()
        .map(|n| format!("--{}", n.to_string().replace('_', "-")))
        .unwrap_or_default();

    if !is_option(&field.ty) {
        let flattened = ["command", "clap", "arg", "serde"]
            .iter()
            .any(|k| has_nested(&field.attrs, k, "flatten"));
        return if flattened || opts.try_into {
            quote_spanned! {field.span()=> #name: args.#name.try_into()? }
        } else {
            quote_spanned! {field.span()=> #name: args.#name }
        };
    }

    if opts.optional {
        return quote_spanned! {field.span()=> #name: args.#name };
    }

    match &opts.default {
        Some(
            lit @ Expr::Lit(ExprLit {
                lit: Lit::Str(_), ..
            }),
        ) => quote_spanned! {field.span()=>
            #name: match args.#name {
                Some(value) => value,
                None => #lit.parse().map_err(|e| {
                    crate::config::ConfigError::Validation(
                        format!("invalid default for {}: {}", #flag, e),
                    )
                })?,
            }
        },
        Some(expr) => quote_spanned! {field.span()=>
            #name: args.#name.unwrap_or_else(|| {
                #[allow(clippy::useless_conversion)]
                (#expr).into()
            })
        },
        None => quote_spanned! {field.span()=>
            #name: args.#name.ok_or(crate::config::ConfigError::Missing(#flag))?
        },
    }
}

fn named_fields(input: &DeriveInput) -> syn::Result<Vec<&Field>> {
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(fields.named.iter().collect()),
            _ => Err(syn::Error::new(
                input.ident.span(),
                "#[derive(LayeredConfig)] requires named fields",
            )),
        },
        _ => Err(syn::Error::new(
            input.ident.span(),
            "#[derive(LayeredConfig)] only works on structs",
        )),
    }
}

/// Reads `#[armctl(try_into = "Path::To::Target")]` from the struct attributes.
fn struct_target(attrs: &[Attribute]) -> syn::Result<Option<syn::Path>> {
    let mut target = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("armctl")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("try_into") {
                let lit: syn::LitStr = meta.value()?.parse()?;
                target = Some(lit.parse::<syn::Path>()?);
                Ok(())
            } else {
                Err(meta.error("unsupported armctl attribute"))
            }
        })?;
    }
    Ok(target)
}

fn is_option(ty: &Type) -> bool {
    match ty {
        Type::Path(tp) => tp
            .path
            .segments
            .last()
            .is_some_and(|s| s.ident == "Option"),
        _ => false,
    }
}

fn has_nested(attrs: &[Attribute], path_ident: &str, nested_ident: &str) -> bool {
    attrs.iter().any(|attr| {
        if !attr.path().is_ident(path_ident) {
            return false;
        }
        let mut found = false;
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident(nested_ident) {
                found = true;
            }
            // Consume `key = value` pairs so parsing can continue past them.
            if meta.input.peek(syn::Token![=]) {
                let _: Expr = meta.value()?.parse()?;
            } else if meta.input.peek(syn::token::Paren) {
                let _content;
                syn::parenthesized!(_content in meta.input);
            }
            Ok(())
        });
        found
    })
}
