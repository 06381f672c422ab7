//! Derive macros for the `pdf` crate: `Object`, `ObjectWrite`, `DataSize`, `DeepClone`.
//!
//! ## Struct from PDF Dictionary
//!
//! ```ignore
//! #[derive(Object, ObjectWrite)]
//! #[pdf(Type = "XObject", Subtype = "Image")]
//! pub struct ImageDictionary {
//!     #[pdf(key = "Width")]
//!     width: i32,
//!     #[pdf(key = "Height", default = "0")]
//!     height: i32,
//!     #[pdf(other)]
//!     other: Dictionary,
//! }
//! ```
//!
//! `Type`/`Subtype` accept a trailing `?` to make the check optional instead of required.
//! Field attributes: `key = "K"` (dictionary key), `default = "expr"` (used when the key is
//! absent), `other` (collects unrecognized keys into a `Dictionary`), `skip` (field is never
//! read/written, uses `Default::default()`), `indirect` (value is written as an indirect
//! reference rather than inline).
//!
//! ## Enum from PDF Name
//!
//! ```ignore
//! #[derive(Object, ObjectWrite)]
//! pub enum StreamFilter {
//!     ASCIIHexDecode,
//!     #[pdf(name = "ASCII85Decode")]
//!     Ascii85,
//! }
//! ```

extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, Data, DeriveInput, Fields, Lit, Meta, NestedMeta,
};

#[derive(Default, Clone)]
struct FieldAttrs {
    key: Option<String>,
    default: Option<String>,
    other: bool,
    skip: bool,
    indirect: bool,
}

fn field_attrs(attrs: &[syn::Attribute]) -> FieldAttrs {
    let mut out = FieldAttrs::default();
    for attr in attrs {
        if !attr.path.is_ident("pdf") {
            continue;
        }
        let meta = attr.parse_meta().expect("invalid #[pdf(..)] attribute");
        if let Meta::List(list) = meta {
            for item in list.nested {
                match item {
                    NestedMeta::Meta(Meta::NameValue(nv)) if nv.path.is_ident("key") => {
                        if let Lit::Str(s) = nv.lit {
                            out.key = Some(s.value());
                        }
                    }
                    NestedMeta::Meta(Meta::NameValue(nv)) if nv.path.is_ident("default") => {
                        if let Lit::Str(s) = nv.lit {
                            out.default = Some(s.value());
                        }
                    }
                    NestedMeta::Meta(Meta::Path(p)) if p.is_ident("other") => out.other = true,
                    NestedMeta::Meta(Meta::Path(p)) if p.is_ident("skip") => out.skip = true,
                    NestedMeta::Meta(Meta::Path(p)) if p.is_ident("indirect") => out.indirect = true,
                    _ => {}
                }
            }
        }
    }
    out
}

#[derive(Default)]
struct TypeCheck {
    key: String,
    value: String,
    required: bool,
}

#[derive(Default)]
struct StructAttrs {
    checks: Vec<TypeCheck>,
    is_stream: bool,
}

fn struct_attrs(attrs: &[syn::Attribute]) -> StructAttrs {
    let mut out = StructAttrs::default();
    for attr in attrs {
        if !attr.path.is_ident("pdf") {
            continue;
        }
        let meta = attr.parse_meta().expect("invalid #[pdf(..)] attribute");
        if let Meta::List(list) = meta {
            for item in list.nested {
                match item {
                    NestedMeta::Meta(Meta::NameValue(nv)) => {
                        let key = nv.path.get_ident().unwrap().to_string();
                        if let Lit::Str(s) = nv.lit {
                            let mut value = s.value();
                            let required = if value.ends_with('?') {
                                value.pop();
                                false
                            } else {
                                true
                            };
                            out.checks.push(TypeCheck { key, value, required });
                        }
                    }
                    NestedMeta::Meta(Meta::Path(p)) if p.is_ident("is_stream") => {
                        out.is_stream = true;
                    }
                    _ => {}
                }
            }
        }
    }
    out
}

fn variant_name(attrs: &[syn::Attribute], ident: &syn::Ident) -> String {
    for attr in attrs {
        if !attr.path.is_ident("pdf") {
            continue;
        }
        if let Ok(Meta::List(list)) = attr.parse_meta() {
            for item in list.nested {
                if let NestedMeta::Meta(Meta::NameValue(nv)) = item {
                    if nv.path.is_ident("name") {
                        if let Lit::Str(s) = nv.lit {
                            return s.value();
                        }
                    }
                }
            }
        }
    }
    ident.to_string()
}

#[proc_macro_derive(Object, attributes(pdf))]
pub fn derive_object(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    let gen = match &ast.data {
        Data::Struct(data) => impl_object_struct(&ast, &data.fields),
        Data::Enum(data) => impl_object_enum(&ast, data),
        Data::Union(_) => panic!("Object cannot be derived for unions"),
    };
    gen.into()
}

#[proc_macro_derive(ObjectWrite, attributes(pdf))]
pub fn derive_object_write(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    let gen = match &ast.data {
        Data::Struct(data) => impl_object_write_struct(&ast, &data.fields),
        Data::Enum(data) => impl_object_write_enum(&ast, data),
        Data::Union(_) => panic!("ObjectWrite cannot be derived for unions"),
    };
    gen.into()
}

#[proc_macro_derive(DataSize)]
pub fn derive_data_size(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let body = match &ast.data {
        Data::Struct(data) => {
            let sizes = field_idents(&data.fields).map(|(member, _)| {
                quote! { + ::datasize::data_size(&self.#member) }
            });
            quote! { 0 #( #sizes )* }
        }
        Data::Enum(data) => {
            let arms = data.variants.iter().map(|v| {
                let vname = &v.ident;
                match &v.fields {
                    Fields::Unit => quote! { #name::#vname => 0, },
                    Fields::Unnamed(f) => {
                        let binds: Vec<_> = (0..f.unnamed.len())
                            .map(|i| syn::Ident::new(&format!("f{}", i), proc_macro2::Span::call_site()))
                            .collect();
                        quote! {
                            #name::#vname( #(ref #binds),* ) => 0 #( + ::datasize::data_size(#binds) )*,
                        }
                    }
                    Fields::Named(f) => {
                        let binds: Vec<_> = f.named.iter().map(|field| field.ident.clone().unwrap()).collect();
                        quote! {
                            #name::#vname { #(ref #binds),* } => 0 #( + ::datasize::data_size(#binds) )*,
                        }
                    }
                }
            });
            quote! {
                match self {
                    #( #arms )*
                }
            }
        }
        Data::Union(_) => panic!("DataSize cannot be derived for unions"),
    };

    let out = quote! {
        impl #impl_generics ::datasize::DataSize for #name #ty_generics #where_clause {
            const IS_DYNAMIC: bool = true;
            const STATIC_HEAP_SIZE: usize = 0;
            fn estimate_heap_size(&self) -> usize {
                #body
            }
        }
    };
    out.into()
}

#[proc_macro_derive(DeepClone)]
pub fn derive_deep_clone(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let body = match &ast.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(f) => {
                let assigns = f.named.iter().map(|field| {
                    let ident = field.ident.clone().unwrap();
                    quote! { #ident: ::pdf::object::DeepClone::deep_clone(&self.#ident, cloner)?, }
                });
                quote! { Ok(#name { #( #assigns )* }) }
            }
            Fields::Unnamed(f) => {
                let assigns = (0..f.unnamed.len()).map(|i| {
                    let idx = syn::Index::from(i);
                    quote! { ::pdf::object::DeepClone::deep_clone(&self.#idx, cloner)?, }
                });
                quote! { Ok(#name( #( #assigns )* )) }
            }
            Fields::Unit => quote! { Ok(#name) },
        },
        Data::Enum(data) => {
            let arms = data.variants.iter().map(|v| {
                let vname = &v.ident;
                match &v.fields {
                    Fields::Unit => quote! { #name::#vname => #name::#vname, },
                    Fields::Unnamed(f) => {
                        let binds: Vec<_> = (0..f.unnamed.len())
                            .map(|i| syn::Ident::new(&format!("f{}", i), proc_macro2::Span::call_site()))
                            .collect();
                        quote! {
                            #name::#vname( #(ref #binds),* ) => #name::#vname( #( ::pdf::object::DeepClone::deep_clone(#binds, cloner)? ),* ),
                        }
                    }
                    Fields::Named(f) => {
                        let binds: Vec<_> = f.named.iter().map(|field| field.ident.clone().unwrap()).collect();
                        quote! {
                            #name::#vname { #(ref #binds),* } => #name::#vname { #( #binds: ::pdf::object::DeepClone::deep_clone(#binds, cloner)? ),* },
                        }
                    }
                }
            });
            quote! {
                Ok(match self {
                    #( #arms )*
                })
            }
        }
        Data::Union(_) => panic!("DeepClone cannot be derived for unions"),
    };

    let out = quote! {
        impl #impl_generics ::pdf::object::DeepClone for #name #ty_generics #where_clause {
            fn deep_clone(&self, cloner: &mut impl ::pdf::object::Cloner) -> ::pdf::error::Result<Self> {
                #body
            }
        }
    };
    out.into()
}

fn field_idents(fields: &Fields) -> impl Iterator<Item = (TokenStream2, &syn::Field)> {
    let v: Vec<_> = match fields {
        Fields::Named(f) => f
            .named
            .iter()
            .map(|field| {
                let ident = field.ident.clone().unwrap();
                (quote! { #ident }, field)
            })
            .collect(),
        Fields::Unnamed(f) => f
            .unnamed
            .iter()
            .enumerate()
            .map(|(i, field)| {
                let idx = syn::Index::from(i);
                (quote! { #idx }, field)
            })
            .collect(),
        Fields::Unit => vec![],
    };
    v.into_iter()
}

fn impl_object_struct(ast: &DeriveInput, fields: &Fields) -> TokenStream2 {
    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();
    let attrs = struct_attrs(&ast.attrs);

    if attrs.is_stream {
        // Struct derived from Primitive::Stream; must have an `info: T` field plus `data: Vec<u8>`.
        let info_ty = fields
            .iter()
            .find(|f| f.ident.as_ref().map(|i| i == "info").unwrap_or(false))
            .map(|f| f.ty.clone())
            .expect("#[pdf(is_stream)] struct must have an `info` field");
        return quote! {
            impl #impl_generics ::pdf::object::Object for #name #ty_generics #where_clause {
                fn from_primitive(p: ::pdf::primitive::Primitive, resolve: &impl ::pdf::object::Resolve) -> ::pdf::error::Result<Self> {
                    let ::pdf::primitive::PdfStream { info, data } = p.into_stream(resolve)?;
                    Ok(#name {
                        info: <#info_ty as ::pdf::object::Object>::from_primitive(::pdf::primitive::Primitive::Dictionary(info), resolve)?,
                        data,
                    })
                }
            }
        };
    }

    let checks = attrs.checks.iter().map(|c| {
        let key = &c.key;
        let value = &c.value;
        if c.required {
            quote! {
                match dict.remove(#key) {
                    Some(p) => {
                        let n = p.into_name()?;
                        if n != #value {
                            return Err(::pdf::error::PdfError::WrongDictionaryType { expected: #value.into(), found: n });
                        }
                    }
                    None => return Err(::pdf::error::PdfError::MissingEntry { field: #key.into(), typ: stringify!(#name).into() }),
                }
            }
        } else {
            quote! {
                if let Some(p) = dict.remove(#key) {
                    let n = p.into_name()?;
                    if n != #value {
                        return Err(::pdf::error::PdfError::WrongDictionaryType { expected: #value.into(), found: n });
                    }
                }
            }
        }
    });

    let field_reads = fields.iter().map(|f| {
        let ident = f.ident.clone().unwrap();
        let ty = &f.ty;
        let fa = field_attrs(&f.attrs);
        if fa.skip {
            return quote! { let #ident: #ty = ::std::default::Default::default(); };
        }
        if fa.other {
            return quote! {
                let #ident: #ty = ::pdf::object::Object::from_primitive(::pdf::primitive::Primitive::Dictionary(::std::mem::take(&mut dict)), resolve)?;
            };
        }
        let key = fa.key.clone().unwrap_or_else(|| ident.to_string());
        match fa.default {
            Some(default_src) => {
                let default_expr: TokenStream2 = syn::parse_str(&default_src).expect("invalid `default` expression");
                quote! {
                    let #ident: #ty = match dict.remove(#key) {
                        Some(p) => ::pdf::object::Object::from_primitive(p, resolve)?,
                        None => #default_expr,
                    };
                }
            }
            None => quote! {
                let #ident: #ty = match dict.remove(#key) {
                    Some(p) => ::pdf::object::Object::from_primitive(p, resolve)?,
                    None => ::pdf::object::Object::from_primitive(::pdf::primitive::Primitive::Null, resolve)
                        .map_err(|_| ::pdf::error::PdfError::MissingEntry { field: #key.into(), typ: stringify!(#name).into() })?,
                };
            },
        }
    });

    let field_names = fields.iter().map(|f| f.ident.clone().unwrap());

    quote! {
        impl #impl_generics ::pdf::object::Object for #name #ty_generics #where_clause {
            fn from_primitive(p: ::pdf::primitive::Primitive, resolve: &impl ::pdf::object::Resolve) -> ::pdf::error::Result<Self> {
                let mut dict = ::pdf::primitive::Dictionary::from_primitive(p, resolve)?;
                #( #checks )*
                #( #field_reads )*
                Ok(#name {
                    #( #field_names, )*
                })
            }
        }
    }
}

fn impl_object_write_struct(ast: &DeriveInput, fields: &Fields) -> TokenStream2 {
    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();
    let attrs = struct_attrs(&ast.attrs);

    if attrs.is_stream {
        return quote! {
            impl #impl_generics ::pdf::object::ObjectWrite for #name #ty_generics #where_clause {
                fn to_primitive(&self, update: &mut impl ::pdf::object::Updater) -> ::pdf::error::Result<::pdf::primitive::Primitive> {
                    let info = ::pdf::object::ObjectWrite::to_primitive(&self.info, update)?.into_dictionary()?;
                    Ok(::pdf::primitive::PdfStream { info, data: self.data.clone() }.into())
                }
            }
        };
    }

    let type_inserts = attrs.checks.iter().map(|c| {
        let key = &c.key;
        let value = &c.value;
        quote! { dict.insert(#key, ::pdf::primitive::Primitive::Name(#value.into())); }
    });

    let field_writes = fields.iter().map(|f| {
        let ident = f.ident.clone().unwrap();
        let fa = field_attrs(&f.attrs);
        if fa.skip {
            return quote! {};
        }
        if fa.other {
            return quote! {
                for (k, v) in self.#ident.iter() {
                    dict.insert(k.clone(), v.clone());
                }
            };
        }
        let key = fa.key.clone().unwrap_or_else(|| ident.to_string());
        if fa.indirect {
            quote! {
                {
                    let p = ::pdf::object::ObjectWrite::to_primitive(&self.#ident, update)?;
                    if p != ::pdf::primitive::Primitive::Null {
                        let ref_p = update.create(p)?;
                        dict.insert(#key, ref_p);
                    }
                }
            }
        } else {
            quote! {
                {
                    let p = ::pdf::object::ObjectWrite::to_primitive(&self.#ident, update)?;
                    if p != ::pdf::primitive::Primitive::Null {
                        dict.insert(#key, p);
                    }
                }
            }
        }
    });

    quote! {
        impl #impl_generics ::pdf::object::ObjectWrite for #name #ty_generics #where_clause {
            fn to_primitive(&self, update: &mut impl ::pdf::object::Updater) -> ::pdf::error::Result<::pdf::primitive::Primitive> {
                let mut dict = ::pdf::primitive::Dictionary::new();
                #( #type_inserts )*
                #( #field_writes )*
                Ok(::pdf::primitive::Primitive::Dictionary(dict))
            }
        }
    }
}

fn impl_object_enum(ast: &DeriveInput, data: &syn::DataEnum) -> TokenStream2 {
    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let arms = data.variants.iter().map(|v| {
        let vname = &v.ident;
        let label = variant_name(&v.attrs, vname);
        quote! { #label => #name::#vname, }
    });

    quote! {
        impl #impl_generics ::pdf::object::Object for #name #ty_generics #where_clause {
            fn from_primitive(p: ::pdf::primitive::Primitive, _resolve: &impl ::pdf::object::Resolve) -> ::pdf::error::Result<Self> {
                let n = p.into_name()?;
                Ok(match n.as_str() {
                    #( #arms )*
                    other => return Err(::pdf::error::PdfError::UnknownVariant { id: stringify!(#name), name: other.to_string() }),
                })
            }
        }
    }
}

fn impl_object_write_enum(ast: &DeriveInput, data: &syn::DataEnum) -> TokenStream2 {
    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let arms = data.variants.iter().map(|v| {
        let vname = &v.ident;
        let label = variant_name(&v.attrs, vname);
        quote! { #name::#vname => #label, }
    });

    quote! {
        impl #impl_generics ::pdf::object::ObjectWrite for #name #ty_generics #where_clause {
            fn to_primitive(&self, _update: &mut impl ::pdf::object::Updater) -> ::pdf::error::Result<::pdf::primitive::Primitive> {
                let s = match self {
                    #( #arms )*
                };
                Ok(::pdf::primitive::Primitive::Name(s.into()))
            }
        }
    }
}
