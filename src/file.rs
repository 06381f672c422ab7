//! This is kind of the entry-point of the type-safe PDF functionality.
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::marker::PhantomData;
use std::path::Path;
use std::rc::Rc;

use crate as pdf;
use crate::any::Any;
use crate::backend::Backend;
use crate::crypt::CryptDict;
use crate::crypt::Decoder;
use crate::error::*;
use crate::object::*;
use crate::parser::Lexer;
use crate::parser::{parse, parse_indirect_object};
use crate::primitive::{Dictionary, PdfString, Primitive};
use crate::xref::{XRef, XRefTable};

/// A PDF version number, `major.minor` (e.g. 1.7 or 2.0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}
impl Default for Version {
    fn default() -> Self {
        Version { major: 1, minor: 7 }
    }
}

/// Options controlling how `Storage::save` writes a freshly serialized file,
/// replacing the fixed header and absent document-info metadata a writer
/// would otherwise bake in unconditionally.
#[derive(Debug, Clone, Default)]
pub struct WriterOptions {
    pub version: Version,
    pub encrypt: Option<RcRef<CryptDict>>,
    pub creator: Option<String>,
    pub producer: Option<String>,
}

/// Byte offsets of a signature dictionary's `/Contents` and `/ByteRange`
/// values within the serialized file, captured while writing so a signer
/// can hash everything but `/Contents` and patch the result in place
/// without re-serializing (PDF reference §12.8.1).
#[derive(Debug, Clone, Copy)]
pub struct SignatureOffsets {
    pub object_id: ObjNr,
    pub contents_start: usize,
    pub contents_end: usize,
    pub byte_range_start: usize,
    pub byte_range_end: usize,
}

fn is_signature_dict(dict: &Dictionary) -> bool {
    dict.get("Contents").is_some() && dict.get("ByteRange").is_some()
}

/// Serializes a signature dictionary like `Dictionary::serialize` would,
/// except it records the byte range each of `/Contents` and `/ByteRange`
/// occupies in `out` as it writes them.
fn serialize_signature_dict(
    id: ObjNr,
    dict: &Dictionary,
    out: &mut Vec<u8>,
) -> Result<SignatureOffsets> {
    let mut contents_range = (0, 0);
    let mut byte_range_range = (0, 0);
    writeln!(out, "<<")?;
    for (key, val) in dict.iter() {
        write!(out, "  /{} ", key)?;
        let start = out.len();
        val.serialize(out, 1)?;
        let end = out.len();
        match key.as_str() {
            "Contents" => contents_range = (start, end),
            "ByteRange" => byte_range_range = (start, end),
            _ => {}
        }
        out.write_all(b"\n")?;
    }
    write!(out, ">>")?;
    Ok(SignatureOffsets {
        object_id: id,
        contents_start: contents_range.0,
        contents_end: contents_range.1,
        byte_range_start: byte_range_range.0,
        byte_range_end: byte_range_range.1,
    })
}

#[must_use]
pub struct PromisedRef<T> {
    inner:   PlainRef,
    _marker: PhantomData<T>,
}
impl<T> PromisedRef<T> {
    pub fn get_inner(&self) -> PlainRef {
        self.inner
    }
    pub fn get_ref(&self) -> Ref<T> {
        Ref::new(self.inner)
    }
}

pub struct Storage<B: Backend> {
    // objects identical to those in the backend
    cache: RefCell<HashMap<PlainRef, Any>>,

    // objects that differ from the backend
    changes: HashMap<ObjNr, Primitive>,

    refs: XRefTable,

    decoder: Option<Decoder>,

    backend: B,

    // Position of the PDF header in the file.
    start_offset: usize,
}
impl<B: Backend> Storage<B> {
    pub fn new(backend: B, refs: XRefTable, start_offset: usize) -> Storage<B> {
        Storage {
            backend,
            refs,
            start_offset,
            cache: RefCell::new(HashMap::new()),
            changes: HashMap::new(),
            decoder: None,
        }
    }
}
impl<B: Backend> Resolve for Storage<B> {
    fn resolve(&self, r: PlainRef) -> Result<Primitive> {
        match self.changes.get(&r.id) {
            Some(p) => Ok(p.clone()),
            None => match t!(self.refs.get(r.id)) {
                XRef::Raw { pos, .. } => {
                    let mut lexer = Lexer::new(t!(self.backend.read(self.start_offset + pos..)));
                    let p = t!(parse_indirect_object(
                        &mut lexer,
                        self,
                        self.decoder.as_ref()
                    ))
                    .1;
                    Ok(p)
                }
                XRef::Stream { stream_id, index } => {
                    let obj_stream = t!(self.resolve(PlainRef {
                        id:  stream_id,
                        gen: 0, /* TODO what gen nr? */
                    }));
                    let obj_stream = t!(ObjectStream::from_primitive(obj_stream, self));
                    let slice = t!(obj_stream.get_object_slice(index));
                    parse(slice, self)
                }
                XRef::Free { .. } => err!(PdfError::FreeObject { obj_nr: r.id }),
                XRef::Promised => err!(PdfError::PendingReference { obj_nr: r.id }),
                XRef::Invalid => err!(PdfError::NullRef { obj_nr: r.id }),
            },
        }
    }
    fn get<T: Object>(&self, r: Ref<T>) -> Result<RcRef<T>> {
        let key = r.get_inner();

        if let Some(any) = self.cache.borrow().get(&key) {
            return Ok(RcRef::new(key, any.clone().downcast()?));
        }

        let primitive = t!(self.resolve(key));
        let obj = t!(T::from_primitive(primitive, self));
        let rc = Rc::new(obj);
        self.cache.borrow_mut().insert(key, Any::new(rc.clone()));

        Ok(RcRef::new(key, rc))
    }
}
impl<B: Backend> Updater for Storage<B> {
    fn create<T: ObjectWrite>(&mut self, obj: T) -> Result<RcRef<T>> {
        let id = self.refs.len() as u64;
        self.refs.push(XRef::Promised);
        let primitive = obj.to_primitive(self)?;
        self.changes.insert(id, primitive);
        let rc = Rc::new(obj);
        let r = PlainRef { id, gen: 0 };

        Ok(RcRef::new(r, rc))
    }
    fn update<T: ObjectWrite>(&mut self, old: PlainRef, obj: T) -> Result<RcRef<T>> {
        let r = match self.refs.get(old.id)? {
            XRef::Free { .. } => panic!(),
            XRef::Raw { gen_nr, .. } => PlainRef {
                id:  old.id,
                gen: gen_nr + 1,
            },
            XRef::Stream { .. } => return self.create(obj),
            XRef::Promised => PlainRef {
                id:  old.id,
                gen: 0,
            },
            XRef::Invalid => panic!(),
        };
        let primitive = obj.to_primitive(self)?;
        self.changes.insert(old.id, primitive);
        let rc = Rc::new(obj);

        Ok(RcRef::new(r, rc))
    }

    fn promise<T: Object>(&mut self) -> PromisedRef<T> {
        let id = self.refs.len() as u64;

        self.refs.push(XRef::Promised);

        PromisedRef {
            inner:   PlainRef { id, gen: 0 },
            _marker: PhantomData,
        }
    }

    fn fulfill<T: ObjectWrite>(&mut self, promise: PromisedRef<T>, obj: T) -> Result<RcRef<T>> {
        self.update(promise.inner, obj)
    }
}

impl Storage<Vec<u8>> {
    /// Writes every reachable object as a fresh, single-version file with a
    /// classic cross-reference table (no xref streams, no incremental `Prev`
    /// chain). Returns the capture offsets of any signature dictionary
    /// written along the way (see `SignatureOffsets`).
    pub fn save(
        &mut self,
        trailer: &mut Trailer,
        options: &WriterOptions,
    ) -> Result<(&[u8], Vec<SignatureOffsets>)> {
        trailer.highest_id = self.refs.len() as _;
        if options.encrypt.is_some() {
            trailer.encrypt_dict = options.encrypt.clone();
        }
        if options.creator.is_some() || options.producer.is_some() {
            let mut info = trailer.info_dict.clone().unwrap_or_default();
            if let Some(ref creator) = options.creator {
                info.insert("Creator", Primitive::String(PdfString::literal(creator.clone().into_bytes())));
            }
            if let Some(ref producer) = options.producer {
                info.insert("Producer", Primitive::String(PdfString::literal(producer.clone().into_bytes())));
            }
            trailer.info_dict = Some(info);
        }
        let trailer_dict = match trailer.to_primitive(self)? {
            Primitive::Dictionary(dict) => dict,
            p => bail!("Trailer::to_primitive returned {:?}, expected a dictionary", p),
        };

        let num_objects = self.refs.len() as ObjNr;

        // Resolve every live object to its current primitive form before touching
        // `self.backend`, so this loop only needs `&self`.
        let mut objects = Vec::with_capacity(num_objects as usize);
        for id in 1..num_objects {
            let live = !matches!(self.refs.get(id)?, XRef::Free { .. } | XRef::Invalid);
            if !live {
                continue;
            }
            let primitive = match self.changes.get(&id) {
                Some(p) => p.clone(),
                None => self.resolve(PlainRef { id, gen: 0 })?,
            };
            objects.push((id, primitive));
        }

        self.backend.clear();
        write!(
            &mut self.backend,
            "%PDF-{}.{}\n%",
            options.version.major, options.version.minor
        )?;
        self.backend.write_all(&[0xe2, 0xe3, 0xcf, 0xd3])?;
        write!(&mut self.backend, "\n")?;

        let mut offsets = vec![None; num_objects as usize];
        let mut signature_offsets = Vec::new();
        for (id, primitive) in objects {
            offsets[id as usize] = Some(self.backend.len());
            write!(&mut self.backend, "{} 0 obj\n", id)?;
            match primitive {
                Primitive::Dictionary(ref dict) if is_signature_dict(dict) => {
                    signature_offsets.push(serialize_signature_dict(id, dict, &mut self.backend)?);
                }
                ref p => p.serialize(&mut self.backend, 0)?,
            }
            write!(&mut self.backend, "\nendobj\n")?;
        }

        let xref_pos = self.backend.len();
        write!(&mut self.backend, "xref\r\n0 {}\r\n", num_objects)?;
        write!(&mut self.backend, "0000000000 65535 f\r\n")?;
        for id in 1..num_objects {
            match offsets[id as usize] {
                Some(pos) => write!(&mut self.backend, "{:010} 00000 n\r\n", pos)?,
                None => write!(&mut self.backend, "0000000000 00000 f\r\n")?,
            }
        }

        write!(&mut self.backend, "trailer\n")?;
        Primitive::Dictionary(trailer_dict).serialize(&mut self.backend, 0)?;
        write!(&mut self.backend, "\nstartxref\n{}\n%%EOF\n", xref_pos)?;

        Ok((&self.backend, signature_offsets))
    }
}

pub fn load_storage_and_trailer<B: Backend>(backend: B) -> Result<(Storage<B>, Dictionary)> {
    load_storage_and_trailer_password(backend, b"")
}

pub fn load_storage_and_trailer_password<B: Backend>(
    backend: B,
    password: &[u8],
) -> Result<(Storage<B>, Dictionary)> {
    let start_offset = t!(backend.locate_start_offset());
    let (refs, trailer) = t!(backend.read_xref_table_and_trailer(start_offset, &NoResolve));
    let mut storage = Storage::new(backend, refs, start_offset);

    if let Some(crypt) = trailer.get("Encrypt") {
        let key = trailer
            .get("ID")
            .ok_or(PdfError::MissingEntry {
                typ:   "Trailer",
                field: "ID".into(),
            })?
            .as_array()?[0]
            .as_string()?
            .as_bytes();
        let dict = CryptDict::from_primitive(crypt.clone(), &storage)?;
        storage.decoder = Some(t!(Decoder::from_password(&dict, key, password)));
        if let Primitive::Reference(reference) = crypt {
            storage.decoder.as_mut().unwrap().encrypt_indirect_object = Some(*reference);
        }
        if let Some(Primitive::Reference(catalog_ref)) = trailer.get("Root") {
            let catalog = t!(t!(storage.resolve(*catalog_ref)).into_dictionary(&storage));
            if let Some(Primitive::Reference(metadata_ref)) = catalog.get("Metadata") {
                storage.decoder.as_mut().unwrap().metadata_indirect_object = Some(*metadata_ref);
            }
        }
    }
    Ok((storage, trailer))
}

pub struct File<B: Backend> {
    storage:     Storage<B>,
    pub trailer: Trailer,
}
impl<B: Backend> Resolve for File<B> {
    fn resolve(&self, r: PlainRef) -> Result<Primitive> {
        self.storage.resolve(r)
    }
    fn get<T: Object>(&self, r: Ref<T>) -> Result<RcRef<T>> {
        self.storage.get(r)
    }
}
impl<B: Backend> Updater for File<B> {
    fn create<T: ObjectWrite>(&mut self, obj: T) -> Result<RcRef<T>> {
        self.storage.create(obj)
    }
    fn update<T: ObjectWrite>(&mut self, old: PlainRef, obj: T) -> Result<RcRef<T>> {
        self.storage.update(old, obj)
    }
    fn promise<T: Object>(&mut self) -> PromisedRef<T> {
        self.storage.promise()
    }
    fn fulfill<T: ObjectWrite>(&mut self, promise: PromisedRef<T>, obj: T) -> Result<RcRef<T>> {
        self.storage.fulfill(promise, obj)
    }
}

impl File<Vec<u8>> {
    /// Opens the file at `path` and uses Vec<u8> as backend.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_data(fs::read(path)?)
    }

    /// Opens the file at `path`, with a password, and uses Vec<u8> as backend.
    pub fn open_password(path: impl AsRef<Path>, password: &[u8]) -> Result<Self> {
        Self::from_data_password(fs::read(path)?, password)
    }

    pub fn save_to(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.save_to_with_options(path, &WriterOptions::default())
    }

    /// Like `save_to`, but lets the caller pick the written PDF version,
    /// document-info metadata, and encryption dictionary instead of the
    /// defaults.
    pub fn save_to_with_options(
        &mut self,
        path: impl AsRef<Path>,
        options: &WriterOptions,
    ) -> Result<()> {
        let (data, _signature_offsets) = self.storage.save(&mut self.trailer, options)?;
        std::fs::write(path, data)?;
        Ok(())
    }
}
impl<B: Backend> File<B> {
    pub fn from_data_password(backend: B, password: &[u8]) -> Result<Self> {
        Self::load_data(backend, password)
    }

    pub fn from_data(backend: B) -> Result<Self> {
        Self::from_data_password(backend, b"")
    }

    fn load_data(backend: B, password: &[u8]) -> Result<Self> {
        let (storage, trailer) = load_storage_and_trailer_password(backend, password)?;
        let trailer = t!(Trailer::from_primitive(
            Primitive::Dictionary(trailer),
            &storage,
        ));
        Ok(File { storage, trailer })
    }

    pub fn get_root(&self) -> &Catalog {
        &self.trailer.root
    }

    pub fn pages(&'_ self) -> impl Iterator<Item = Result<PageRc>> + '_ {
        (0..self.num_pages()).map(move |n| self.get_page(n))
    }
    pub fn num_pages(&self) -> u32 {
        self.trailer.root.pages.count
    }

    pub fn get_page(&self, n: u32) -> Result<PageRc> {
        self.trailer.root.pages.page(self, n)
    }

    pub fn update_catalog(&mut self, catalog: Catalog) -> Result<()> {
        self.trailer.root = self.create(catalog)?;
        Ok(())
    }
}

#[derive(Object, ObjectWrite)]
pub struct Trailer {
    #[pdf(key = "Size")]
    pub highest_id: i32,

    #[pdf(key = "Prev")]
    pub prev_trailer_pos: Option<i32>,

    #[pdf(key = "Root")]
    pub root: RcRef<Catalog>,

    #[pdf(key = "Encrypt")]
    pub encrypt_dict: Option<RcRef<CryptDict>>,

    #[pdf(key = "Info")]
    pub info_dict: Option<Dictionary>,

    #[pdf(key = "ID")]
    pub id: Vec<PdfString>,
}

/*
pub struct XRefStream {
    pub data: Vec<u8>,
    pub info: XRefInfo,
}

impl Object for XRefStream {
    fn serialize<W: io::Write>(&self, _out: &mut W) -> io::Result<()> {
        unimplemented!();
    }
    fn from_primitive(p: Primitive, resolve: &impl Resolve) -> Result<Self> {
        let stream = p.to_stream(resolve)?;
        let info = XRefInfo::from_primitive(Primitive::Dictionary (stream.info), resolve)?;
        let data = stream.data.clone();
        Ok(XRefStream {
            data: data,
            info: info,
        })
    }
}
*/

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_defaults_to_1_7() {
        let v = Version::default();
        assert_eq!((v.major, v.minor), (1, 7));
    }

    #[test]
    fn writer_options_default_has_no_metadata_or_encryption() {
        let opts = WriterOptions::default();
        assert_eq!((opts.version.major, opts.version.minor), (1, 7));
        assert!(opts.encrypt.is_none());
        assert!(opts.creator.is_none());
        assert!(opts.producer.is_none());
    }

    #[test]
    fn is_signature_dict_requires_both_contents_and_byte_range() {
        let mut dict = Dictionary::new();
        assert!(!is_signature_dict(&dict));

        dict.insert("Contents", Primitive::String(PdfString::hex(vec![0; 4])));
        assert!(!is_signature_dict(&dict));

        dict.insert("ByteRange", Primitive::Array(vec![]));
        assert!(is_signature_dict(&dict));
    }

    #[test]
    fn serialize_signature_dict_records_contents_and_byte_range_offsets() {
        let mut dict = Dictionary::new();
        dict.insert("Contents", Primitive::String(PdfString::hex(vec![0xab; 4])));
        dict.insert(
            "ByteRange",
            Primitive::Array(vec![
                Primitive::Integer(0),
                Primitive::Integer(10),
                Primitive::Integer(20),
                Primitive::Integer(30),
            ]),
        );
        let mut out = Vec::new();
        let offsets = serialize_signature_dict(7, &dict, &mut out).unwrap();
        assert_eq!(offsets.object_id, 7);
        assert_eq!(&out[offsets.contents_start..offsets.contents_end], b"<abababab>");
        assert!(offsets.byte_range_start < offsets.byte_range_end);
        assert!(offsets.byte_range_end <= out.len());
    }
}
