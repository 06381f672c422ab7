//! `Object` trait, along with some implementations. References.
//!
//! Some of the structs are incomplete (missing fields that are in the PDF references).

mod color;
mod function;
mod stream;
mod types;

pub use self::color::*;
pub use self::function::*;
pub use self::stream::*;
pub use self::types::*;
pub use crate::file::PromisedRef;

use crate::enc::*;
use crate::error::*;
use crate::primitive::*;

use datasize::DataSize;
use std::collections::HashMap;
use std::convert::TryInto;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::Deref;
use std::rc::Rc;

pub type ObjNr = u64;
pub type GenNr = u16;

pub trait Resolve {
    fn resolve(&self, r: PlainRef) -> Result<Primitive>;
    fn get<T: Object>(&self, r: Ref<T>) -> Result<RcRef<T>>;
}

pub struct NoResolve;
impl Resolve for NoResolve {
    fn resolve(&self, _: PlainRef) -> Result<Primitive> {
        Err(PdfError::Reference)
    }
    fn get<T: Object>(&self, _r: Ref<T>) -> Result<RcRef<T>> {
        Err(PdfError::Reference)
    }
}

/// A PDF Object
pub trait Object: Sized + 'static {
    /// Convert primitive to Self
    fn from_primitive(p: Primitive, resolve: &impl Resolve) -> Result<Self>;
}

pub trait Updater {
    fn create<T: ObjectWrite>(&mut self, obj: T) -> Result<RcRef<T>>;
    fn update<T: ObjectWrite>(&mut self, old: PlainRef, obj: T) -> Result<RcRef<T>>;
    fn promise<T: Object>(&mut self) -> PromisedRef<T>;
    fn fulfill<T: ObjectWrite>(&mut self, promise: PromisedRef<T>, obj: T) -> Result<RcRef<T>>;
}

pub struct NoUpdate;
impl Updater for NoUpdate {
    fn create<T: ObjectWrite>(&mut self, _obj: T) -> Result<RcRef<T>> {
        panic!()
    }
    fn update<T: ObjectWrite>(&mut self, _old: PlainRef, _obj: T) -> Result<RcRef<T>> {
        panic!()
    }
    fn promise<T: Object>(&mut self) -> PromisedRef<T> {
        panic!()
    }
    fn fulfill<T: ObjectWrite>(&mut self, _promise: PromisedRef<T>, _obj: T) -> Result<RcRef<T>> {
        panic!()
    }
}

pub trait ObjectWrite {
    fn to_primitive(&self, update: &mut impl Updater) -> Result<Primitive>;
}

pub trait FromDict: Sized {
    fn from_dict(dict: Dictionary, resolve: &impl Resolve) -> Result<Self>;
}
pub trait ToDict: ObjectWrite {
    fn to_dict(&self, update: &mut impl Updater) -> Result<Dictionary>;
}

pub trait SubType<T> {}

pub trait Trace {
    fn trace(&self, _cb: &mut impl FnMut(PlainRef)) {}
}

/// Copies an object subtree into another document, remapping every
/// indirect reference it walks through so the destination document gets
/// its own ids instead of colliding with (or aliasing) the source's.
/// Implementations are expected to cache `old -> new` mappings so shared
/// subtrees are only cloned once per `Cloner` session.
pub trait Cloner {
    fn clone_ref<T>(&mut self, old: &Ref<T>) -> Result<Ref<T>>
    where
        T: Object + ObjectWrite + DeepClone;

    fn clone_rcref<T>(&mut self, old: &RcRef<T>) -> Result<RcRef<T>>
    where
        T: Object + ObjectWrite + DeepClone;
}

pub trait DeepClone: Sized {
    fn deep_clone(&self, cloner: &mut impl Cloner) -> Result<Self>;
}

///////////////////
// Model manager
///////////////////

use crate::any::Any;
use std::cell::RefCell;

/// Bidirectional cache between indirect references and the hydrated Rust
/// models that were built from them.
///
/// `Storage::get` (see `file.rs`) already caches `PlainRef -> model` so that
/// repeated dereferences of the same object don't re-parse it, but that
/// mapping only runs one way. Writers need the opposite direction too: when
/// the same model value (e.g. a widget annotation that is also the sole kid
/// of its field, see `FieldDictionary`/`Merged`) must be written back to the
/// single object it came from rather than duplicated under a fresh id, the
/// writer needs to ask "do I already have a ref for this model?". This type
/// tracks both maps for a single document/session.
#[derive(Default)]
pub struct ModelManager {
    by_ref: RefCell<HashMap<PlainRef, Any>>,
    by_ptr: RefCell<HashMap<(TypeId, usize), PlainRef>>,
}
use std::any::TypeId;

impl ModelManager {
    pub fn new() -> ModelManager {
        ModelManager::default()
    }

    /// Registers `model` as the hydrated value of `r`, in both directions.
    pub fn register<T: 'static>(&self, r: PlainRef, model: Rc<T>) {
        let key = (TypeId::of::<T>(), Rc::as_ptr(&model) as usize);
        self.by_ptr.borrow_mut().insert(key, r);
        self.by_ref.borrow_mut().insert(r, Any::new(model));
    }

    /// Looks up the model previously registered for `r`.
    ///
    /// Returns `PdfError::TypeMismatch` if `r` was registered with a
    /// different Rust type than `T`: a stale or mismatched cache entry is
    /// reported rather than silently downcast.
    pub fn model_for<T: 'static>(&self, r: PlainRef) -> Result<Option<Rc<T>>> {
        let any = match self.by_ref.borrow().get(&r) {
            Some(any) => any.clone(),
            None => return Ok(None),
        };
        match any.downcast::<T>() {
            Ok(rc) => Ok(Some(rc)),
            Err(_) => Err(PdfError::TypeMismatch {
                expected: std::any::type_name::<T>(),
                found: "<cached model>",
            }),
        }
    }

    /// Looks up the ref a previously-registered model is backed by, if any.
    pub fn primitive_for<T: 'static>(&self, model: &Rc<T>) -> Option<PlainRef> {
        let key = (TypeId::of::<T>(), Rc::as_ptr(model) as usize);
        self.by_ptr.borrow().get(&key).copied()
    }
}

///////////////////////////
// Reference tracing
///////////////////////////

/// Cycle-safe reference chasing.
///
/// `trace` walks every `PlainRef` reachable from `root` (via its `Trace`
/// impl) and calls `visit` once per *distinct* ref, independent of how many
/// times it is aliased or how deep the structure nests. Cycles (an object
/// that - directly or through others - points back at itself) are broken
/// rather than looped on forever.
pub fn trace<T: Trace>(root: &T, mut visit: impl FnMut(PlainRef)) {
    let mut seen = std::collections::HashSet::new();
    root.trace(&mut |r| {
        if seen.insert(r) {
            visit(r);
        }
    });
}

/// Recursively resolves every `Primitive::Reference` reachable from `p`,
/// replacing each reference slot in place with its resolved value.
///
/// A `visited` set of the refs currently on the path from the root detects
/// cycles: a document whose dictionaries reference each other in a loop
/// (directly or through an array) would otherwise recurse forever. On
/// detecting a ref that is already an ancestor of itself, `traverse` returns
/// `PdfError::CircularReference` instead of recursing again.
pub fn traverse(p: &mut Primitive, resolve: &impl Resolve) -> Result<()> {
    let mut visited = std::collections::HashSet::new();
    traverse_inner(p, resolve, &mut visited)
}

fn traverse_inner(
    p: &mut Primitive,
    resolve: &impl Resolve,
    visited: &mut std::collections::HashSet<PlainRef>,
) -> Result<()> {
    match p {
        Primitive::Reference(r) => {
            let r = *r;
            if !visited.insert(r) {
                return Err(PdfError::CircularReference {
                    context: format!("reference {} {} R", r.id, r.gen),
                });
            }
            let mut resolved = resolve.resolve(r)?;
            traverse_inner(&mut resolved, resolve, visited)?;
            visited.remove(&r);
            *p = resolved;
        }
        Primitive::Array(parts) => {
            for part in parts.iter_mut() {
                traverse_inner(part, resolve, visited)?;
            }
        }
        Primitive::Dictionary(dict) => {
            let keys: Vec<String> = dict.iter().map(|(k, _)| k.clone()).collect();
            for key in keys {
                let mut val = dict.get(&key).cloned().unwrap_or(Primitive::Null);
                traverse_inner(&mut val, resolve, visited)?;
                dict.insert(key, val);
            }
        }
        _ => {}
    }
    Ok(())
}

///////
// Refs
///////

// TODO move to primitive.rs
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct PlainRef {
    pub id:  ObjNr,
    pub gen: GenNr,
}
impl Object for PlainRef {
    fn from_primitive(p: Primitive, _: &impl Resolve) -> Result<Self> {
        p.into_reference()
    }
}
impl ObjectWrite for PlainRef {
    fn to_primitive(&self, _: &mut impl Updater) -> Result<Primitive> {
        Ok(Primitive::Reference(*self))
    }
}
impl DataSize for PlainRef {
    const IS_DYNAMIC: bool = false;
    const STATIC_HEAP_SIZE: usize = 0;
    fn estimate_heap_size(&self) -> usize {
        0
    }
}

// NOTE: Copy & Clone implemented manually ( https://github.com/rust-lang/rust/issues/26925 )

pub struct Ref<T> {
    inner:   PlainRef,
    _marker: PhantomData<T>,
}
impl<T> Clone for Ref<T> {
    fn clone(&self) -> Ref<T> {
        Ref {
            inner:   self.inner,
            _marker: PhantomData,
        }
    }
}
impl<T> Copy for Ref<T> {}

impl<T> Ref<T> {
    pub fn new(inner: PlainRef) -> Ref<T> {
        Ref {
            inner,
            _marker: PhantomData::default(),
        }
    }
    pub fn from_id(id: ObjNr) -> Ref<T> {
        Ref {
            inner:   PlainRef { id, gen: 0 },
            _marker: PhantomData::default(),
        }
    }
    pub fn get_inner(&self) -> PlainRef {
        self.inner
    }
    pub fn upcast<U>(self) -> Ref<U>
    where
        T: SubType<U>,
    {
        Ref::new(self.inner)
    }
}
impl<T: Object> Object for Ref<T> {
    fn from_primitive(p: Primitive, _: &impl Resolve) -> Result<Self> {
        Ok(Ref::new(p.into_reference()?))
    }
}
impl<T> ObjectWrite for Ref<T> {
    fn to_primitive(&self, update: &mut impl Updater) -> Result<Primitive> {
        self.inner.to_primitive(update)
    }
}
impl<T> Trace for Ref<T> {
    fn trace(&self, cb: &mut impl FnMut(PlainRef)) {
        cb(self.inner);
    }
}
impl<T: Object + ObjectWrite + DeepClone> DeepClone for Ref<T> {
    fn deep_clone(&self, cloner: &mut impl Cloner) -> Result<Self> {
        cloner.clone_ref(self)
    }
}
impl<T> DataSize for Ref<T> {
    const IS_DYNAMIC: bool = false;
    const STATIC_HEAP_SIZE: usize = 0;
    fn estimate_heap_size(&self) -> usize {
        0
    }
}
impl<T> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Ref({})", self.inner.id)
    }
}
impl<T> Hash for Ref<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state)
    }
}
impl<T> PartialEq for Ref<T> {
    fn eq(&self, rhs: &Self) -> bool {
        self.inner.eq(&rhs.inner)
    }
}
impl<T> Eq for Ref<T> {}

#[derive(Debug)]
pub struct RcRef<T> {
    inner: PlainRef,
    data:  Rc<T>,
}

impl<T> RcRef<T> {
    pub fn new(inner: PlainRef, data: Rc<T>) -> RcRef<T> {
        RcRef { inner, data }
    }
    pub fn get_ref(&self) -> Ref<T> {
        Ref::new(self.inner)
    }
}
impl<T: Object + std::fmt::Debug> Object for RcRef<T> {
    fn from_primitive(p: Primitive, resolve: &impl Resolve) -> Result<Self> {
        match p {
            Primitive::Reference(r) => resolve.get(Ref::new(r)),
            p => Err(PdfError::UnexpectedPrimitive {
                expected: "Reference",
                found:    p.get_debug_name(),
            }),
        }
    }
}
impl<T> ObjectWrite for RcRef<T> {
    fn to_primitive(&self, update: &mut impl Updater) -> Result<Primitive> {
        self.inner.to_primitive(update)
    }
}
impl<T> Deref for RcRef<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &*self.data
    }
}
impl<T> Clone for RcRef<T> {
    fn clone(&self) -> RcRef<T> {
        RcRef {
            inner: self.inner,
            data:  self.data.clone(),
        }
    }
}
impl<T> Trace for RcRef<T> {
    fn trace(&self, cb: &mut impl FnMut(PlainRef)) {
        cb(self.inner);
    }
}
impl<T: Object + ObjectWrite + DeepClone> DeepClone for RcRef<T> {
    fn deep_clone(&self, cloner: &mut impl Cloner) -> Result<Self> {
        cloner.clone_rcref(self)
    }
}
impl<T: DataSize> DataSize for RcRef<T> {
    const IS_DYNAMIC: bool = true;
    const STATIC_HEAP_SIZE: usize = 0;
    fn estimate_heap_size(&self) -> usize {
        datasize::data_size(&*self.data)
    }
}
impl<'a, T> From<&'a RcRef<T>> for Ref<T> {
    fn from(r: &'a RcRef<T>) -> Ref<T> {
        Ref::new(r.inner)
    }
}
impl<T> Hash for RcRef<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(&**self, state)
    }
}
impl<T> PartialEq for RcRef<T> {
    fn eq(&self, rhs: &Self) -> bool {
        std::ptr::eq(&**self, &**rhs)
    }
}
impl<T> Eq for RcRef<T> {}

#[derive(Debug)]
pub enum MaybeRef<T> {
    Direct(Rc<T>),
    Indirect(RcRef<T>),
}
impl<T> MaybeRef<T> {
    pub fn as_ref(&self) -> Option<Ref<T>> {
        match *self {
            MaybeRef::Indirect(ref r) => Some(r.get_ref()),
            _ => None,
        }
    }
}
impl<T: Object> Object for MaybeRef<T> {
    fn from_primitive(p: Primitive, resolve: &impl Resolve) -> Result<Self> {
        Ok(match p {
            Primitive::Reference(r) => MaybeRef::Indirect(resolve.get(Ref::new(r))?),
            p => MaybeRef::Direct(Rc::new(T::from_primitive(p, resolve)?)),
        })
    }
}
impl<T: ObjectWrite> ObjectWrite for MaybeRef<T> {
    fn to_primitive(&self, update: &mut impl Updater) -> Result<Primitive> {
        match self {
            MaybeRef::Direct(ref inner) => inner.to_primitive(update),
            MaybeRef::Indirect(r) => r.to_primitive(update),
        }
    }
}
impl<T> Deref for MaybeRef<T> {
    type Target = T;
    fn deref(&self) -> &T {
        match *self {
            MaybeRef::Direct(ref t) => t,
            MaybeRef::Indirect(ref r) => &**r,
        }
    }
}
impl<T> Clone for MaybeRef<T> {
    fn clone(&self) -> Self {
        match *self {
            MaybeRef::Direct(ref rc) => MaybeRef::Direct(rc.clone()),
            MaybeRef::Indirect(ref r) => MaybeRef::Indirect(r.clone()),
        }
    }
}
impl<T> Trace for MaybeRef<T> {
    fn trace(&self, cb: &mut impl FnMut(PlainRef)) {
        match *self {
            MaybeRef::Indirect(ref rc) => rc.trace(cb),
            MaybeRef::Direct(_) => (),
        }
    }
}
impl<T> From<Rc<T>> for MaybeRef<T> {
    fn from(r: Rc<T>) -> MaybeRef<T> {
        MaybeRef::Direct(r)
    }
}
impl<T> From<MaybeRef<T>> for Rc<T> {
    fn from(r: MaybeRef<T>) -> Rc<T> {
        match r {
            MaybeRef::Direct(rc) => rc,
            MaybeRef::Indirect(r) => r.data,
        }
    }
}
impl<'a, T> From<&'a MaybeRef<T>> for Rc<T> {
    fn from(r: &'a MaybeRef<T>) -> Rc<T> {
        match r {
            MaybeRef::Direct(ref rc) => rc.clone(),
            MaybeRef::Indirect(ref r) => r.data.clone(),
        }
    }
}
impl<T> From<RcRef<T>> for MaybeRef<T> {
    fn from(r: RcRef<T>) -> MaybeRef<T> {
        MaybeRef::Indirect(r)
    }
}
impl<T: Object + ObjectWrite + DeepClone> DeepClone for MaybeRef<T> {
    fn deep_clone(&self, cloner: &mut impl Cloner) -> Result<Self> {
        Ok(match self {
            MaybeRef::Direct(rc) => MaybeRef::Direct(Rc::new((**rc).deep_clone(cloner)?)),
            MaybeRef::Indirect(r) => MaybeRef::Indirect(r.deep_clone(cloner)?),
        })
    }
}
impl<T: DataSize> DataSize for MaybeRef<T> {
    const IS_DYNAMIC: bool = true;
    const STATIC_HEAP_SIZE: usize = 0;
    fn estimate_heap_size(&self) -> usize {
        match self {
            MaybeRef::Direct(rc) => datasize::data_size(&**rc),
            MaybeRef::Indirect(r) => datasize::data_size(r),
        }
    }
}
impl<T> Hash for MaybeRef<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(&**self, state)
    }
}
impl<T> PartialEq for MaybeRef<T> {
    fn eq(&self, rhs: &Self) -> bool {
        std::ptr::eq(&**self, &**rhs)
    }
}
impl<T> Eq for MaybeRef<T> {}

//////////////////////////////////////
// Object for Primitives & other types
//////////////////////////////////////

impl Object for i32 {
    fn from_primitive(p: Primitive, r: &impl Resolve) -> Result<Self> {
        match p {
            Primitive::Reference(id) => r.resolve(id)?.as_integer(),
            p => p.as_integer(),
        }
    }
}
impl ObjectWrite for i32 {
    fn to_primitive(&self, _: &mut impl Updater) -> Result<Primitive> {
        Ok(Primitive::Integer(*self))
    }
}

impl Object for u32 {
    fn from_primitive(p: Primitive, r: &impl Resolve) -> Result<Self> {
        match p {
            Primitive::Reference(id) => r.resolve(id)?.as_u32(),
            p => p.as_u32(),
        }
    }
}
impl ObjectWrite for u32 {
    fn to_primitive(&self, _: &mut impl Updater) -> Result<Primitive> {
        Ok(Primitive::Integer(*self as _))
    }
}

impl Object for usize {
    fn from_primitive(p: Primitive, r: &impl Resolve) -> Result<Self> {
        match p {
            Primitive::Reference(id) => Ok(r.resolve(id)?.as_u32()? as usize),
            p => Ok(p.as_u32()? as usize),
        }
    }
}
impl ObjectWrite for usize {
    fn to_primitive(&self, _: &mut impl Updater) -> Result<Primitive> {
        Ok(Primitive::Integer(*self as _))
    }
}

impl Object for f32 {
    fn from_primitive(p: Primitive, r: &impl Resolve) -> Result<Self> {
        match p {
            Primitive::Reference(id) => r.resolve(id)?.as_number(),
            p => p.as_number(),
        }
    }
}
impl ObjectWrite for f32 {
    fn to_primitive(&self, _: &mut impl Updater) -> Result<Primitive> {
        Ok(Primitive::Number(*self))
    }
}

impl Object for bool {
    fn from_primitive(p: Primitive, r: &impl Resolve) -> Result<Self> {
        match p {
            Primitive::Reference(id) => r.resolve(id)?.as_bool(),
            p => p.as_bool(),
        }
    }
}
impl ObjectWrite for bool {
    fn to_primitive(&self, _: &mut impl Updater) -> Result<Primitive> {
        Ok(Primitive::Boolean(*self))
    }
}

impl Object for Dictionary {
    fn from_primitive(p: Primitive, r: &impl Resolve) -> Result<Self> {
        p.into_dictionary(r)
    }
}

impl Object for String {
    fn from_primitive(p: Primitive, _: &impl Resolve) -> Result<Self> {
        p.into_name()
    }
}

impl<T: Object> Object for Vec<T> {
    /// Will try to convert `p` to `T` first, then try to convert `p` to Vec<T>
    fn from_primitive(p: Primitive, r: &impl Resolve) -> Result<Self> {
        Ok(match p {
            Primitive::Array(_) => p
                .into_array(r)?
                .into_iter()
                .map(|p| T::from_primitive(p, r))
                .collect::<Result<Vec<T>>>()?,
            Primitive::Null => Vec::new(),
            Primitive::Reference(id) => Self::from_primitive(r.resolve(id)?, r)?,
            _ => vec![T::from_primitive(p, r)?],
        })
    }
}
impl<T: ObjectWrite> ObjectWrite for Vec<T> {
    fn to_primitive(&self, update: &mut impl Updater) -> Result<Primitive> {
        Primitive::array::<T, _, _, _>(self.iter(), update)
    }
}
impl<T: Trace> Trace for Vec<T> {
    fn trace(&self, cb: &mut impl FnMut(PlainRef)) {
        for i in self.iter() {
            i.trace(cb);
        }
    }
}
/*
pub struct Data(pub Vec<u8>);
impl Object for Data {
    fn serialize<W: io::Write>(&self, out: &mut W) -> Result<()> {
        unimplemented!()
    }
    /// Will try to convert `p` to `T` first, then try to convert `p` to Vec<T>
    fn from_primitive(p: Primitive, r: &impl Resolve) -> Result<Self> {
        match p {
            Primitive::Array(_) => {
                p.into_array(r)?
                    .into_iter()
                    .map(|p| u8::from_primitive(p, r))
                    .collect::<Result<Vec<T>>>()?
            },
            Primitive::Null => {
                Vec::new()
            }
            Primitive::Reference(id) => Self::from_primitive(r.resolve(id)?, r)?,
            _ =>
        }
    }
}*/

impl Object for Primitive {
    fn from_primitive(p: Primitive, _: &impl Resolve) -> Result<Self> {
        Ok(p)
    }
}
impl ObjectWrite for Primitive {
    fn to_primitive(&self, _: &mut impl Updater) -> Result<Primitive> {
        Ok(self.clone())
    }
}
impl Trace for Primitive {
    fn trace(&self, cb: &mut impl FnMut(PlainRef)) {
        match *self {
            Primitive::Reference(r) => cb(r),
            Primitive::Array(ref parts) => parts.iter().for_each(|p| p.trace(cb)),
            Primitive::Dictionary(ref dict) => dict.values().for_each(|p| p.trace(cb)),
            _ => (),
        }
    }
}

impl ObjectWrite for String {
    fn to_primitive(&self, _: &mut impl Updater) -> Result<Primitive> {
        Ok(Primitive::Name(self.clone()))
    }
}
impl<V: Object> Object for HashMap<String, V> {
    fn from_primitive(p: Primitive, resolve: &impl Resolve) -> Result<Self> {
        match p {
            Primitive::Null => Ok(HashMap::new()),
            Primitive::Dictionary(dict) => {
                let mut new = Self::new();
                for (key, val) in dict.iter() {
                    new.insert(key.clone(), V::from_primitive(val.clone(), resolve)?);
                }
                Ok(new)
            }
            Primitive::Reference(id) => HashMap::from_primitive(resolve.resolve(id)?, resolve),
            p => Err(PdfError::UnexpectedPrimitive {
                expected: "Dictionary",
                found:    p.get_debug_name(),
            }),
        }
    }
}
impl<V: ObjectWrite> ObjectWrite for HashMap<String, V> {
    fn to_primitive(&self, update: &mut impl Updater) -> Result<Primitive> {
        if self.is_empty() {
            Ok(Primitive::Null)
        } else {
            let mut dict = Dictionary::new();
            for (k, v) in self.iter() {
                dict.insert(k, v.to_primitive(update)?);
            }
            Ok(Primitive::Dictionary(dict))
        }
    }
}

impl<T: Object> Object for Option<T> {
    fn from_primitive(p: Primitive, resolve: &impl Resolve) -> Result<Self> {
        match p {
            Primitive::Null => Ok(None),
            p => match T::from_primitive(p, resolve) {
                Ok(p) => Ok(Some(p)),
                // References to non-existing objects ought not to be an error
                Err(PdfError::NullRef { .. }) => Ok(None),
                Err(PdfError::FreeObject { .. }) => Ok(None),
                Err(e) => Err(e),
            },
        }
    }
}
impl<T: ObjectWrite> ObjectWrite for Option<T> {
    fn to_primitive(&self, update: &mut impl Updater) -> Result<Primitive> {
        match self {
            None => Ok(Primitive::Null),
            Some(t) => t.to_primitive(update),
        }
    }
}
impl<T: Trace> Trace for Option<T> {
    fn trace(&self, cb: &mut impl FnMut(PlainRef)) {
        if let Some(ref t) = *self {
            t.trace(cb)
        }
    }
}

impl<T: Object> Object for Box<T> {
    fn from_primitive(p: Primitive, resolve: &impl Resolve) -> Result<Self> {
        T::from_primitive(p, resolve).map(Box::new)
    }
}
impl<T: ObjectWrite> ObjectWrite for Box<T> {
    fn to_primitive(&self, update: &mut impl Updater) -> Result<Primitive> {
        (**self).to_primitive(update)
    }
}
impl<T: Trace> Trace for Box<T> {
    fn trace(&self, cb: &mut impl FnMut(PlainRef)) {
        (**self).trace(cb)
    }
}

impl Object for () {
    fn from_primitive(_p: Primitive, _resolve: &impl Resolve) -> Result<Self> {
        Ok(())
    }
}
impl ObjectWrite for () {
    fn to_primitive(&self, _: &mut impl Updater) -> Result<Primitive> {
        Ok(Primitive::Null)
    }
}
impl Trace for () {}

impl<T, U> Object for (T, U)
where
    T: Object,
    U: Object,
{
    fn from_primitive(p: Primitive, resolve: &impl Resolve) -> Result<Self> {
        let arr = p.into_array(resolve)?;
        if arr.len() != 2 {
            bail!("expected array of length 2 (found {})", arr.len());
        }
        let [a, b]: [Primitive; 2] = arr.try_into().unwrap();
        Ok((
            T::from_primitive(a, resolve)?,
            U::from_primitive(b, resolve)?,
        ))
    }
}

impl<T, U> ObjectWrite for (T, U)
where
    T: ObjectWrite,
    U: ObjectWrite,
{
    fn to_primitive(&self, update: &mut impl Updater) -> Result<Primitive> {
        Ok(Primitive::Array(vec![
            self.0.to_primitive(update)?,
            self.1.to_primitive(update)?,
        ]))
    }
}

impl<T: Trace, U: Trace> Trace for (T, U) {
    fn trace(&self, cb: &mut impl FnMut(PlainRef)) {
        self.0.trace(cb);
        self.1.trace(cb);
    }
}

//////////////////
// DeepClone
//////////////////

macro_rules! deep_clone_leaf {
    ($($t:ty),*) => {
        $(
            impl DeepClone for $t {
                fn deep_clone(&self, _cloner: &mut impl Cloner) -> Result<Self> {
                    Ok(self.clone())
                }
            }
        )*
    }
}
// Leaf types hold no indirect references worth remapping: integers,
// booleans, names/strings and raw (untyped) dictionaries/primitives are
// copied as-is. A `Primitive` embedding a `Reference` keeps pointing at
// the source document's object space - only typed `Ref`/`RcRef` fields
// get remapped by a `Cloner`.
deep_clone_leaf!(i32, u32, usize, f32, bool, String, PlainRef, Dictionary, Primitive, PdfString);

impl<T: DeepClone> DeepClone for Vec<T> {
    fn deep_clone(&self, cloner: &mut impl Cloner) -> Result<Self> {
        self.iter().map(|t| t.deep_clone(cloner)).collect()
    }
}
impl<T: DeepClone> DeepClone for Option<T> {
    fn deep_clone(&self, cloner: &mut impl Cloner) -> Result<Self> {
        self.as_ref().map(|t| t.deep_clone(cloner)).transpose()
    }
}
impl<T: DeepClone> DeepClone for Box<T> {
    fn deep_clone(&self, cloner: &mut impl Cloner) -> Result<Self> {
        Ok(Box::new((**self).deep_clone(cloner)?))
    }
}
impl DeepClone for () {
    fn deep_clone(&self, _cloner: &mut impl Cloner) -> Result<Self> {
        Ok(())
    }
}
