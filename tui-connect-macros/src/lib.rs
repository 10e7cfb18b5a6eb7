//! Procedural macros for tui-connect

use darling::{FromDeriveInput, FromMeta, FromVariant};
use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

/// Naming scheme applied to variant names
#[derive(Debug, Clone, Copy, Default, FromMeta)]
enum RenameRule {
    /// Keep the variant name as written
    #[default]
    #[darling(rename = "PascalCase")]
    Pascal,
    #[darling(rename = "snake_case")]
    Snake,
    #[darling(rename = "SCREAMING_SNAKE_CASE")]
    ScreamingSnake,
}

impl RenameRule {
    fn apply(self, variant: &str) -> String {
        match self {
            RenameRule::Pascal => variant.to_string(),
            RenameRule::Snake => to_snake_case(variant),
            RenameRule::ScreamingSnake => to_snake_case(variant).to_uppercase(),
        }
    }
}

/// Container-level attributes for #[derive(Action)]
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(action), supports(enum_any))]
struct ActionOpts {
    ident: syn::Ident,
    generics: syn::Generics,
    data: darling::ast::Data<ActionVariant, ()>,

    /// Naming scheme for every variant without an explicit name
    #[darling(default)]
    rename_all: RenameRule,
}

/// Variant-level attributes
#[derive(Debug, FromVariant)]
#[darling(attributes(action))]
struct ActionVariant {
    ident: syn::Ident,
    fields: darling::ast::Fields<()>,

    /// Explicit action name
    #[darling(default)]
    name: Option<String>,
}

/// Convert PascalCase to snake_case
///
/// A run of capitals is one word: `HTTPGet` becomes `http_get`.
fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + 4);
    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|c| c.is_lowercase());
            if !prev.is_uppercase() || next_is_lower {
                result.push('_');
            }
        }
        result.extend(ch.to_lowercase());
    }
    result
}

/// Derive macro for the Action trait
///
/// Generates a `name()` method returning the variant name as a static
/// string, plus an inherent `NAMES` constant listing every action name in
/// declaration order.
///
/// Names can be adjusted with `#[action(rename_all = "snake_case")]` on the
/// enum (also `"SCREAMING_SNAKE_CASE"`), or per variant with
/// `#[action(name = "...")]`.
///
/// # Example
/// ```ignore
/// #[derive(Action, Clone, Debug)]
/// #[action(rename_all = "SCREAMING_SNAKE_CASE")]
/// enum CounterAction {
///     Increment,
///     AddAmount(i64),
///     #[action(name = "@@reset")]
///     Reset,
/// }
///
/// assert_eq!(CounterAction::AddAmount(2).name(), "ADD_AMOUNT");
/// assert_eq!(CounterAction::Reset.name(), "@@reset");
/// assert_eq!(CounterAction::NAMES, &["INCREMENT", "ADD_AMOUNT", "@@reset"]);
/// ```
#[proc_macro_derive(Action, attributes(action))]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let opts = match ActionOpts::from_derive_input(&input) {
        Ok(opts) => opts,
        Err(e) => return e.write_errors().into(),
    };

    let name = &opts.ident;
    let (impl_generics, ty_generics, where_clause) = opts.generics.split_for_impl();

    let variants = match &opts.data {
        darling::ast::Data::Enum(variants) => variants,
        _ => {
            return syn::Error::new_spanned(&input, "Action can only be derived for enums")
                .to_compile_error()
                .into();
        }
    };

    let action_names: Vec<String> = variants
        .iter()
        .map(|v| {
            v.name
                .clone()
                .unwrap_or_else(|| opts.rename_all.apply(&v.ident.to_string()))
        })
        .collect();

    let name_arms = variants.iter().zip(&action_names).map(|(v, action_name)| {
        let variant_name = &v.ident;

        match &v.fields.style {
            darling::ast::Style::Unit => quote! {
                #name::#variant_name => #action_name
            },
            darling::ast::Style::Tuple => quote! {
                #name::#variant_name(..) => #action_name
            },
            darling::ast::Style::Struct => quote! {
                #name::#variant_name { .. } => #action_name
            },
        }
    });

    // An uninhabited enum has no arms to match
    let name_body = if variants.is_empty() {
        quote! { match *self {} }
    } else {
        quote! {
            match self {
                #(#name_arms),*
            }
        }
    };

    let expanded = quote! {
        impl #impl_generics tui_connect::Action for #name #ty_generics #where_clause {
            fn name(&self) -> &'static str {
                #name_body
            }
        }

        impl #impl_generics #name #ty_generics #where_clause {
            /// Every action name of this type, in declaration order
            pub const NAMES: &'static [&'static str] = &[#(#action_names),*];
        }
    };

    TokenStream::from(expanded)
}
