//! Procedural macros used in the definition and implementation of getters and setters for LtvSettings

use quote::quote;
use syn::parse::ParseStream;
use syn::parse::{Parse, Result};
use syn::{Expr, Ident, Token};

type ValueName = Ident;
type ValueType = Ident;
type DefaultValue = Expr;

/// Signature contains the results of parsing a ltv_gets_and_sets definition, i.e., the
/// name of a value stored in an LtvSettings map and the corresponding type.
struct Signature {
    value_name: ValueName,
    value_type: ValueType,
}

impl Parse for Signature {
    fn parse(stream: ParseStream) -> Result<Self> {
        let value_name = stream.parse()?;
        let _comma: Token!(,) = stream.parse()?;
        let value_type = stream.parse()?;
        Ok(Signature {
            value_name,
            value_type,
        })
    }
}

/// SignatureWithDefault contains the components of a ltv_gets_and_sets_with_default definition, i.e., a
/// value name, a value type and the default returned when the value is absent. For example:
///     ```text
///     ltv_gets_and_sets_with_default!(PS_ONLINE_FETCH_ALLOWED, bool, true);
///     ```
struct SignatureWithDefault {
    value_name: ValueName,
    value_type: ValueType,
    default_value: DefaultValue,
}

impl Parse for SignatureWithDefault {
    fn parse(stream: ParseStream) -> Result<Self> {
        let value_name = stream.parse()?;
        let _comma: Token!(,) = stream.parse()?;
        let value_type = stream.parse()?;
        let _comma2: Token!(,) = stream.parse()?;
        let default_value = stream.parse()?;
        Ok(SignatureWithDefault {
            value_name,
            value_type,
            default_value,
        })
    }
}

/// is_string_numeric is used to determine if a string value contains only numeric characters.
/// It is used to process a slice that omits the first character, i.e., in order to identify
/// types like u8, u32, etc.
fn is_string_numeric(str: &str) -> bool {
    !str.is_empty() && str.chars().all(|c| c.is_numeric())
}

/// Maps the name of a Rust type to the name of the LtvProcessingTypes variant that carries it,
/// i.e., u64 to U64 and bool to Bool. Other type names are used as is.
fn variant_name(type_name: &str) -> String {
    if type_name == "bool" {
        "Bool".to_string()
    } else if is_string_numeric(&type_name[1..]) {
        type_name.to_uppercase()
    } else {
        type_name.to_string()
    }
}

/// Returns the getter and setter names for a value name like PS_HTTP_TIMEOUT, i.e., get_http_timeout
/// and set_http_timeout.
fn accessor_names(flag: &Ident) -> (String, String) {
    let flag_str = format!("{}", flag)[3..].to_lowercase();
    (format!("get_{}", flag_str), format!("set_{}", flag_str))
}

#[proc_macro]
pub fn ltv_gets_and_sets(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let signature = syn::parse_macro_input!(input as Signature);
    let flag = signature.value_name;
    let return_t = signature.value_type;

    let (getter_str, setter_str) = accessor_names(&flag);
    let getter = syn::Ident::new(&getter_str, flag.span());
    let setter = syn::Ident::new(&setter_str, flag.span());
    let variant = syn::Ident::new(&variant_name(&format!("{}", return_t)), return_t.span());

    let getter_comment = format!(
        "`{}` is used to retrieve `{}` items from an [`LtvSettings`] instance",
        getter_str, flag
    );
    let setter_comment = format!(
        "`{}` is used to set `{}` items in an [`LtvSettings`] instance",
        setter_str, flag
    );

    let tokens = quote! {
            #[doc = #getter_comment]
            pub fn #getter(settings: &LtvSettings) -> Option<#return_t> {
                match settings.0.get(#flag) {
                    Some(LtvProcessingTypes::#variant(v)) => Some(v.clone()),
                    _ => None,
                }
            }
            #[doc = #setter_comment]
            pub fn #setter(settings: &mut LtvSettings, v: #return_t) {
                settings.0.insert(#flag.to_string(), LtvProcessingTypes::#variant(v));
            }
    };
    tokens.into()
}

#[proc_macro]
pub fn ltv_gets_and_sets_with_default(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let signature = syn::parse_macro_input!(input as SignatureWithDefault);
    let flag = signature.value_name;
    let return_t = signature.value_type;
    let default_value = signature.default_value;

    let (getter_str, setter_str) = accessor_names(&flag);
    let getter = syn::Ident::new(&getter_str, flag.span());
    let setter = syn::Ident::new(&setter_str, flag.span());
    let variant = syn::Ident::new(&variant_name(&format!("{}", return_t)), return_t.span());

    let getter_comment = format!(
        "`{}` is used to retrieve `{}` items from an [`LtvSettings`] instance, returning `{}` when absent",
        getter_str,
        flag,
        quote!(#default_value)
    );
    let setter_comment = format!(
        "`{}` is used to set `{}` items in an [`LtvSettings`] instance",
        setter_str, flag
    );

    let tokens = quote! {
            #[doc = #getter_comment]
            pub fn #getter(settings: &LtvSettings) -> #return_t {
                match settings.0.get(#flag) {
                    Some(LtvProcessingTypes::#variant(v)) => v.clone(),
                    _ => #default_value,
                }
            }
            #[doc = #setter_comment]
            pub fn #setter(settings: &mut LtvSettings, v: #return_t) {
                settings.0.insert(#flag.to_string(), LtvProcessingTypes::#variant(v));
            }
    };
    tokens.into()
}
