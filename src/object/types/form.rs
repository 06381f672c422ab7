use super::prelude::*;
use std::collections::HashSet;

/// A Form XObject - a content stream paired with a `FormDict` (PDF reference §8.10).
#[derive(Debug, pdf_derive::DataSize, Clone, DeepClone)]
pub struct FormXObject {
    pub stream: Stream<FormDict>,
}
impl Object for FormXObject {
    fn from_primitive(p: Primitive, resolve: &impl Resolve) -> Result<Self> {
        let s = PdfStream::from_primitive(p, resolve)?;
        Ok(FormXObject { stream: Stream::from_stream(s, resolve)? })
    }
}
impl ObjectWrite for FormXObject {
    fn to_primitive(&self, update: &mut impl Updater) -> Result<Primitive> {
        self.stream.to_primitive(update)
    }
}
impl Deref for FormXObject {
    type Target = FormDict;
    fn deref(&self) -> &FormDict {
        &self.stream.info
    }
}

/// Two dictionaries read from and written to the same underlying primitive.
///
/// A terminal form field that is also its own widget annotation is
/// represented in the file as a single dictionary carrying both sets of
/// keys (PDF reference §12.7.3.1). `Merged` lets `FieldDictionary` and
/// `Annot` each see only the keys they care about while still sharing one
/// object identity on disk.
#[derive(Debug, Clone, pdf_derive::DataSize)]
pub struct Merged<A, B> {
    pub a: A,
    pub b: B,
}
impl<A, B> Object for Merged<A, B>
where
    A: Object,
    B: Object,
{
    fn from_primitive(p: Primitive, resolve: &impl Resolve) -> Result<Self> {
        let a = t!(A::from_primitive(p.clone(), resolve));
        let b = t!(B::from_primitive(p, resolve));
        Ok(Merged { a, b })
    }
}
impl<A, B> ObjectWrite for Merged<A, B>
where
    A: ObjectWrite,
    B: ObjectWrite,
{
    fn to_primitive(&self, update: &mut impl Updater) -> Result<Primitive> {
        let pa = self.a.to_primitive(update)?;
        let pb = self.b.to_primitive(update)?;
        match (pa, pb) {
            (Primitive::Dictionary(mut da), Primitive::Dictionary(db)) => {
                for (k, v) in db.iter() {
                    da.insert(k.as_str(), v.clone());
                }
                Ok(Primitive::Dictionary(da))
            }
            (a, _) => Ok(a),
        }
    }
}
impl<A, B> DeepClone for Merged<A, B>
where
    A: DeepClone,
    B: DeepClone,
{
    fn deep_clone(&self, cloner: &mut impl Cloner) -> Result<Self> {
        Ok(Merged {
            a: self.a.deep_clone(cloner)?,
            b: self.b.deep_clone(cloner)?,
        })
    }
}

#[derive(Object, Debug, pdf_derive::DataSize, DeepClone, ObjectWrite, Clone, Default)]
#[pdf(Type = "XObject?", Subtype = "Form")]
pub struct FormDict {
    #[pdf(key = "FormType", default = "1")]
    pub form_type: i32,

    #[pdf(key = "Name")]
    pub name: Option<Name>,

    #[pdf(key = "LastModified")]
    pub last_modified: Option<PdfString>,

    #[pdf(key = "BBox")]
    pub bbox: Rectangle,

    #[pdf(key = "Matrix")]
    pub matrix: Option<Primitive>,

    #[pdf(key = "Resources")]
    pub resources: Option<MaybeRef<Resources>>,

    #[pdf(key = "Group")]
    pub group: Option<Dictionary>,

    #[pdf(key = "Ref")]
    pub reference: Option<Dictionary>,

    #[pdf(key = "Metadata")]
    pub metadata: Option<Ref<Stream<()>>>,

    #[pdf(key = "PieceInfo")]
    pub piece_info: Option<Dictionary>,

    #[pdf(key = "StructParent")]
    pub struct_parent: Option<i32>,

    #[pdf(key = "StructParents")]
    pub struct_parents: Option<i32>,

    #[pdf(key = "OPI")]
    pub opi: Option<Dictionary>,

    #[pdf(other)]
    pub other: Dictionary,
}

#[derive(Object, ObjectWrite, Debug, Clone, pdf_derive::DataSize)]
pub struct InteractiveFormDictionary {
    #[pdf(key = "Fields")]
    pub fields: Vec<RcRef<FieldDictionary>>,

    #[pdf(key = "NeedAppearances", default = "false")]
    pub need_appearences: bool,

    #[pdf(key = "SigFlags", default = "0")]
    pub sig_flags: u32,

    #[pdf(key = "CO")]
    pub co: Option<Vec<RcRef<FieldDictionary>>>,

    #[pdf(key = "DR")]
    pub dr: Option<MaybeRef<Resources>>,

    #[pdf(key = "DA")]
    pub da: Option<PdfString>,

    #[pdf(key = "Q")]
    pub q: Option<i32>,

    #[pdf(key = "XFA")]
    pub xfa: Option<Primitive>,
}

#[derive(Object, ObjectWrite, Debug, Copy, Clone, PartialEq, pdf_derive::DataSize, DeepClone)]
pub enum FieldType {
    #[pdf(name = "Btn")]
    Button,
    #[pdf(name = "Tx")]
    Text,
    #[pdf(name = "Ch")]
    Choice,
    #[pdf(name = "Sig")]
    Signature,
    #[pdf(name = "SigRef")]
    SignatureReference,
}

#[derive(Object, ObjectWrite, Debug)]
#[pdf(Type = "SV")]
pub struct SeedValueDictionary {
    #[pdf(key = "Ff", default = "0")]
    pub flags: u32,
    #[pdf(key = "Filter")]
    pub filter: Option<Name>,
    #[pdf(key = "SubFilter")]
    pub sub_filter: Option<Vec<Name>>,
    #[pdf(key = "V")]
    pub value: Option<Primitive>,
    #[pdf(key = "DigestMethod")]
    pub digest_method: Vec<PdfString>,
    #[pdf(other)]
    pub other: Dictionary,
}

#[derive(Object, ObjectWrite, Debug)]
#[pdf(Type = "Sig?")]
pub struct SignatureDictionary {
    #[pdf(key = "Filter")]
    pub filter: Name,
    #[pdf(key = "SubFilter")]
    pub sub_filter: Name,
    #[pdf(key = "ByteRange")]
    pub byte_range: Vec<usize>,
    #[pdf(key = "Contents")]
    pub contents: PdfString,
    #[pdf(key = "Cert")]
    pub cert: Vec<PdfString>,
    #[pdf(key = "Reference")]
    pub reference: Option<Primitive>,
    #[pdf(key = "Name")]
    pub name: Option<PdfString>,
    #[pdf(key = "M")]
    pub m: Option<PdfString>,
    #[pdf(key = "Location")]
    pub location: Option<PdfString>,
    #[pdf(key = "Reason")]
    pub reason: Option<PdfString>,
    #[pdf(key = "ContactInfo")]
    pub contact_info: Option<PdfString>,
    #[pdf(key = "V")]
    pub v: i32,
    #[pdf(key = "R")]
    pub r: i32,
    #[pdf(key = "Prop_Build")]
    pub prop_build: Dictionary,
    #[pdf(key = "Prop_AuthTime")]
    pub prop_auth_time: i32,
    #[pdf(key = "Prop_AuthType")]
    pub prop_auth_type: Name,
    #[pdf(other)]
    pub other: Dictionary,
}

#[derive(Object, ObjectWrite, Debug)]
#[pdf(Type = "SigRef?")]
pub struct SignatureReferenceDictionary {
    #[pdf(key = "TransformMethod")]
    pub transform_method: Name,
    #[pdf(key = "TransformParams")]
    pub transform_params: Option<Dictionary>,
    #[pdf(key = "Data")]
    pub data: Option<Primitive>,
    #[pdf(key = "DigestMethod")]
    pub digest_method: Option<Name>,
    #[pdf(other)]
    pub other: Dictionary,
}

/// Fields present on "markup" annotations (PDF reference §12.5.6.2):
/// text notes, lines, shapes, and the other subtypes meant to be
/// attached to document content by a reviewer. The non-markup
/// subtypes - Popup aside, which carries its own back-pointer instead -
/// never have these keys, see [`MARKUP_EXEMPT_SUBTYPES`].
#[derive(Debug, Clone, pdf_derive::DataSize, Default)]
pub struct Markup {
    pub title: Option<PdfString>,
    pub popup: Option<Ref<Annot>>,
    pub opacity: f32,
    pub rich_contents: Option<Primitive>,
    pub creation_date: Option<Date>,
    pub in_reply_to: Option<Ref<Annot>>,
    pub subject: Option<PdfString>,
    pub reply_type: Option<String>,
    pub intent: Option<String>,
    pub ex_data: Option<Dictionary>,
}
impl Markup {
    fn from_dict(dict: &Dictionary, resolve: &impl Resolve) -> Result<Self> {
        Ok(Markup {
            title: get_opt(dict, "T", resolve)?,
            popup: get_opt(dict, "Popup", resolve)?,
            opacity: get_opt(dict, "CA", resolve)?.unwrap_or(1.0),
            rich_contents: dict.get("RC").cloned(),
            creation_date: get_opt(dict, "CreationDate", resolve)?,
            in_reply_to: get_opt(dict, "IRT", resolve)?,
            subject: get_opt(dict, "Subj", resolve)?,
            reply_type: name_opt(dict, "RT", resolve)?,
            intent: name_opt(dict, "IT", resolve)?,
            ex_data: get_opt(dict, "ExData", resolve)?,
        })
    }
    fn write(&self, dict: &mut Dictionary, update: &mut impl Updater) -> Result<()> {
        dict.insert_if_not_null("T", self.title.to_primitive(update)?);
        dict.insert_if_not_null("Popup", self.popup.to_primitive(update)?);
        if self.opacity != 1.0 {
            dict.insert("CA", Primitive::Number(self.opacity));
        }
        dict.insert_if_not_null("RC", self.rich_contents.clone().unwrap_or(Primitive::Null));
        dict.insert_if_not_null("CreationDate", self.creation_date.to_primitive(update)?);
        dict.insert_if_not_null("IRT", self.in_reply_to.to_primitive(update)?);
        dict.insert_if_not_null("Subj", self.subject.to_primitive(update)?);
        if let Some(ref rt) = self.reply_type {
            dict.insert("RT", Primitive::name(rt.clone()));
        }
        if let Some(ref it) = self.intent {
            dict.insert("IT", Primitive::name(it.clone()));
        }
        dict.insert_if_not_null("ExData", self.ex_data.to_primitive(update)?);
        Ok(())
    }
}

/// Subtypes that never carry markup fields (PDF reference Table 170 and
/// the multimedia / forms annexes): they are either pure presentation
/// (PrinterMark, TrapNet, Watermark), interactive controls (Widget,
/// Screen, Movie), or rich-media containers (RichMedia, 3D).
const MARKUP_EXEMPT_SUBTYPES: &[&str] = &[
    "RichMedia", "Movie", "Screen", "Widget", "3D", "PrinterMark", "TrapNet", "Watermark",
];

fn get_opt<T: Object>(dict: &Dictionary, key: &str, resolve: &impl Resolve) -> Result<Option<T>> {
    match dict.get(key) {
        Some(p) => Ok(Some(t!(T::from_primitive(p.clone(), resolve)))),
        None => Ok(None),
    }
}
fn name_opt(dict: &Dictionary, key: &str, resolve: &impl Resolve) -> Result<Option<String>> {
    match dict.get(key) {
        Some(p) => Ok(Some(t!(p.clone().resolve(resolve)?.into_name()))),
        None => Ok(None),
    }
}

/// Fields common to every annotation dictionary (PDF reference §12.5.2, Table 164).
#[derive(Debug, Clone, pdf_derive::DataSize)]
pub struct AnnotBase {
    pub rect: Option<Rectangle>,
    pub contents: Option<PdfString>,
    pub page: Option<PageRc>,
    pub annotation_name: Option<PdfString>,
    pub date: Option<Date>,
    pub annot_flags: u32,
    pub appearance_streams: Option<MaybeRef<AppearanceStreams>>,
    pub appearance_state: Option<String>,
    pub border: Option<Primitive>,
    pub color: Option<Primitive>,
    pub markup: Option<Markup>,
}
impl AnnotBase {
    fn from_dict(dict: &Dictionary, subtype: &str, resolve: &impl Resolve) -> Result<Self> {
        let markup = if MARKUP_EXEMPT_SUBTYPES.contains(&subtype) {
            None
        } else {
            Some(t!(Markup::from_dict(dict, resolve)))
        };
        Ok(AnnotBase {
            rect: get_opt(dict, "Rect", resolve)?,
            contents: get_opt(dict, "Contents", resolve)?,
            page: get_opt(dict, "P", resolve)?,
            annotation_name: get_opt(dict, "NM", resolve)?,
            date: get_opt(dict, "M", resolve)?,
            annot_flags: get_opt(dict, "F", resolve)?.unwrap_or(0),
            appearance_streams: get_opt(dict, "AP", resolve)?,
            appearance_state: name_opt(dict, "AS", resolve)?,
            border: dict.get("Border").cloned(),
            color: dict.get("C").cloned(),
            markup,
        })
    }
    fn write(&self, dict: &mut Dictionary, update: &mut impl Updater) -> Result<()> {
        dict.insert_if_not_null("Rect", self.rect.to_primitive(update)?);
        dict.insert_if_not_null("Contents", self.contents.to_primitive(update)?);
        dict.insert_if_not_null("P", self.page.to_primitive(update)?);
        dict.insert_if_not_null("NM", self.annotation_name.to_primitive(update)?);
        dict.insert_if_not_null("M", self.date.to_primitive(update)?);
        if self.annot_flags != 0 {
            dict.insert("F", Primitive::Integer(self.annot_flags as i32));
        }
        dict.insert_if_not_null("AP", self.appearance_streams.to_primitive(update)?);
        if let Some(ref s) = self.appearance_state {
            dict.insert("AS", Primitive::name(s.clone()));
        }
        dict.insert_if_not_null("Border", self.border.clone().unwrap_or(Primitive::Null));
        dict.insert_if_not_null("C", self.color.clone().unwrap_or(Primitive::Null));
        if let Some(ref markup) = self.markup {
            markup.write(dict, update)?;
        }
        Ok(())
    }
}

/// The per-subtype payload of an annotation. Subtypes with rich,
/// frequently-inspected structure (`Popup`'s parent back-pointer,
/// `Widget`'s field linkage) get named fields; the remaining subtypes
/// keep their subtype-specific keys as a raw dictionary so nothing is
/// lost on a read/write round trip.
#[derive(Debug, Clone, pdf_derive::DataSize)]
pub enum AnnotVariant {
    Text(Dictionary),
    Link(Dictionary),
    FreeText(Dictionary),
    Line(Dictionary),
    Square(Dictionary),
    Circle(Dictionary),
    Polygon(Dictionary),
    PolyLine(Dictionary),
    Highlight(Dictionary),
    Underline(Dictionary),
    Squiggly(Dictionary),
    StrikeOut(Dictionary),
    Caret(Dictionary),
    Stamp(Dictionary),
    Ink(Dictionary),
    Popup {
        parent: Option<Ref<Annot>>,
        open: bool,
    },
    FileAttachment(Dictionary),
    Sound(Dictionary),
    RichMedia(Dictionary),
    Movie(Dictionary),
    Screen(Dictionary),
    Widget {
        parent: Option<Ref<FieldDictionary>>,
        appearance_characteristics: Option<Dictionary>,
        highlighting: Option<String>,
    },
    PrinterMark(Dictionary),
    TrapNet(Dictionary),
    Watermark(Dictionary),
    ThreeD(Dictionary),
    Projection(Dictionary),
    Redact(Dictionary),
    /// Any subtype not named above (future / vendor extensions).
    Other {
        subtype: String,
        dict: Dictionary,
    },
}
impl AnnotVariant {
    /// The `/Subtype` name this variant must be written back out with.
    ///
    /// `PrinterMark` and `TrapNet` share almost identical dictionaries in
    /// the PDF reference and are easy to transpose; this match is the one
    /// place that decides which name goes on the wire, so a mixup here
    /// can't leak into a roundtrip.
    fn subtype_name(&self) -> &str {
        match self {
            AnnotVariant::Text(_) => "Text",
            AnnotVariant::Link(_) => "Link",
            AnnotVariant::FreeText(_) => "FreeText",
            AnnotVariant::Line(_) => "Line",
            AnnotVariant::Square(_) => "Square",
            AnnotVariant::Circle(_) => "Circle",
            AnnotVariant::Polygon(_) => "Polygon",
            AnnotVariant::PolyLine(_) => "PolyLine",
            AnnotVariant::Highlight(_) => "Highlight",
            AnnotVariant::Underline(_) => "Underline",
            AnnotVariant::Squiggly(_) => "Squiggly",
            AnnotVariant::StrikeOut(_) => "StrikeOut",
            AnnotVariant::Caret(_) => "Caret",
            AnnotVariant::Stamp(_) => "Stamp",
            AnnotVariant::Ink(_) => "Ink",
            AnnotVariant::Popup { .. } => "Popup",
            AnnotVariant::FileAttachment(_) => "FileAttachment",
            AnnotVariant::Sound(_) => "Sound",
            AnnotVariant::RichMedia(_) => "RichMedia",
            AnnotVariant::Movie(_) => "Movie",
            AnnotVariant::Screen(_) => "Screen",
            AnnotVariant::Widget { .. } => "Widget",
            AnnotVariant::PrinterMark(_) => "PrinterMark",
            AnnotVariant::TrapNet(_) => "TrapNet",
            AnnotVariant::Watermark(_) => "Watermark",
            AnnotVariant::ThreeD(_) => "3D",
            AnnotVariant::Projection(_) => "Projection",
            AnnotVariant::Redact(_) => "Redact",
            AnnotVariant::Other { subtype, .. } => subtype.as_str(),
        }
    }
    fn from_dict(subtype: &str, dict: Dictionary, resolve: &impl Resolve) -> Result<Self> {
        Ok(match subtype {
            "Text" => AnnotVariant::Text(dict),
            "Link" => AnnotVariant::Link(dict),
            "FreeText" => AnnotVariant::FreeText(dict),
            "Line" => AnnotVariant::Line(dict),
            "Square" => AnnotVariant::Square(dict),
            "Circle" => AnnotVariant::Circle(dict),
            "Polygon" => AnnotVariant::Polygon(dict),
            "PolyLine" => AnnotVariant::PolyLine(dict),
            "Highlight" => AnnotVariant::Highlight(dict),
            "Underline" => AnnotVariant::Underline(dict),
            "Squiggly" => AnnotVariant::Squiggly(dict),
            "StrikeOut" => AnnotVariant::StrikeOut(dict),
            "Caret" => AnnotVariant::Caret(dict),
            "Stamp" => AnnotVariant::Stamp(dict),
            "Ink" => AnnotVariant::Ink(dict),
            "Popup" => AnnotVariant::Popup {
                parent: get_opt(&dict, "Parent", resolve)?,
                open: get_opt(&dict, "Open", resolve)?.unwrap_or(false),
            },
            "FileAttachment" => AnnotVariant::FileAttachment(dict),
            "Sound" => AnnotVariant::Sound(dict),
            "RichMedia" => AnnotVariant::RichMedia(dict),
            "Movie" => AnnotVariant::Movie(dict),
            "Screen" => AnnotVariant::Screen(dict),
            "Widget" => AnnotVariant::Widget {
                parent: get_opt(&dict, "Parent", resolve)?,
                appearance_characteristics: get_opt(&dict, "MK", resolve)?,
                highlighting: name_opt(&dict, "H", resolve)?,
            },
            // The retrieved dictionary name for this subtype is sometimes
            // transposed with PrinterMark in older producers; the key we
            // dispatch on here is what the file actually says, so both
            // stay distinguishable subtypes rather than collapsing into one.
            "PrinterMark" => AnnotVariant::PrinterMark(dict),
            "TrapNet" => AnnotVariant::TrapNet(dict),
            "Watermark" => AnnotVariant::Watermark(dict),
            "3D" => AnnotVariant::ThreeD(dict),
            "Projection" => AnnotVariant::Projection(dict),
            "Redact" => AnnotVariant::Redact(dict),
            other => AnnotVariant::Other { subtype: other.to_string(), dict },
        })
    }
    fn write(&self, dict: &mut Dictionary, update: &mut impl Updater) -> Result<()> {
        match self {
            AnnotVariant::Popup { parent, open } => {
                dict.insert_if_not_null("Parent", parent.to_primitive(update)?);
                if *open {
                    dict.insert("Open", Primitive::Boolean(true));
                }
            }
            AnnotVariant::Widget { parent, appearance_characteristics, highlighting } => {
                dict.insert_if_not_null("Parent", parent.to_primitive(update)?);
                dict.insert_if_not_null("MK", appearance_characteristics.to_primitive(update)?);
                if let Some(ref h) = highlighting {
                    dict.insert("H", Primitive::name(h.clone()));
                }
            }
            AnnotVariant::Text(d)
            | AnnotVariant::Link(d)
            | AnnotVariant::FreeText(d)
            | AnnotVariant::Line(d)
            | AnnotVariant::Square(d)
            | AnnotVariant::Circle(d)
            | AnnotVariant::Polygon(d)
            | AnnotVariant::PolyLine(d)
            | AnnotVariant::Highlight(d)
            | AnnotVariant::Underline(d)
            | AnnotVariant::Squiggly(d)
            | AnnotVariant::StrikeOut(d)
            | AnnotVariant::Caret(d)
            | AnnotVariant::Stamp(d)
            | AnnotVariant::Ink(d)
            | AnnotVariant::FileAttachment(d)
            | AnnotVariant::Sound(d)
            | AnnotVariant::RichMedia(d)
            | AnnotVariant::Movie(d)
            | AnnotVariant::Screen(d)
            | AnnotVariant::PrinterMark(d)
            | AnnotVariant::TrapNet(d)
            | AnnotVariant::Watermark(d)
            | AnnotVariant::ThreeD(d)
            | AnnotVariant::Projection(d)
            | AnnotVariant::Redact(d)
            | AnnotVariant::Other { dict: d, .. } => {
                for (k, v) in d.iter() {
                    if k != "Subtype" {
                        dict.insert(k.as_str(), v.clone());
                    }
                }
            }
        }
        dict.insert("Subtype", Primitive::name(self.subtype_name()));
        Ok(())
    }
}

/// An annotation dictionary (PDF reference §12.5): fields every subtype
/// shares in `base`, subtype-specific fields in `variant`.
#[derive(Debug, Clone, pdf_derive::DataSize)]
pub struct Annot {
    pub base: AnnotBase,
    pub variant: AnnotVariant,
}
impl Annot {
    pub fn subtype(&self) -> &str {
        self.variant.subtype_name()
    }
}
impl Object for Annot {
    fn from_primitive(p: Primitive, resolve: &impl Resolve) -> Result<Self> {
        let dict = t!(p.into_dictionary(resolve));
        let subtype = t!(t!(dict.get("Subtype").ok_or(PdfError::MissingEntry {
            typ: "Annot",
            field: "Subtype".into(),
        })).clone().resolve(resolve)?.into_name());
        let base = t!(AnnotBase::from_dict(&dict, &subtype, resolve));
        let variant = t!(AnnotVariant::from_dict(&subtype, dict, resolve));
        Ok(Annot { base, variant })
    }
}
impl ObjectWrite for Annot {
    fn to_primitive(&self, update: &mut impl Updater) -> Result<Primitive> {
        let mut dict = Dictionary::new();
        dict.insert("Type", Primitive::name("Annot"));
        self.base.write(&mut dict, update)?;
        self.variant.write(&mut dict, update)?;
        Ok(Primitive::Dictionary(dict))
    }
}
impl DeepClone for Annot {
    fn deep_clone(&self, cloner: &mut impl Cloner) -> Result<Self> {
        let base = AnnotBase {
            appearance_streams: self.base.appearance_streams.deep_clone(cloner)?,
            ..self.base.clone()
        };
        let variant = match &self.variant {
            AnnotVariant::Popup { parent, open } => AnnotVariant::Popup {
                parent: parent.deep_clone(cloner)?,
                open: *open,
            },
            AnnotVariant::Widget { parent, appearance_characteristics, highlighting } => {
                AnnotVariant::Widget {
                    parent: parent.deep_clone(cloner)?,
                    appearance_characteristics: appearance_characteristics.clone(),
                    highlighting: highlighting.clone(),
                }
            }
            other => other.clone(),
        };
        Ok(Annot { base, variant })
    }
}

#[derive(Object, ObjectWrite, Debug, pdf_derive::DataSize, Clone, DeepClone)]
pub struct FieldDictionary {
    #[pdf(key = "FT")]
    pub typ: Option<FieldType>,

    #[pdf(key = "Parent")]
    pub parent: Option<Ref<FieldDictionary>>,

    #[pdf(key = "Kids")]
    pub kids: Vec<Ref<Merged<FieldDictionary, Annot>>>,

    #[pdf(key = "T")]
    pub name: Option<PdfString>,

    #[pdf(key = "TU")]
    pub alt_name: Option<PdfString>,

    #[pdf(key = "TM")]
    pub mapping_name: Option<PdfString>,

    #[pdf(key = "Ff", default = "0")]
    pub flags: u32,

    #[pdf(key = "SigFlags", default = "0")]
    pub sig_flags: u32,

    #[pdf(key = "V")]
    pub value: Primitive,

    #[pdf(key = "DV")]
    pub default_value: Primitive,

    #[pdf(key = "DR")]
    pub default_resources: Option<MaybeRef<Resources>>,

    #[pdf(key = "AA")]
    pub actions: Option<Dictionary>,

    #[pdf(key = "Rect")]
    pub rect: Option<Rectangle>,

    #[pdf(key = "MaxLen")]
    pub max_len: Option<u32>,

    #[pdf(key = "Subtype")]
    pub subtype: Option<Name>,

    #[pdf(other)]
    pub other: Dictionary,
}
impl FieldDictionary {
    /// Looks up a value on this field, walking up `/Parent` when it's
    /// absent here (PDF reference §12.7.3.2: `FT`, `Ff`, `V`, and `DR`
    /// are all inheritable). Stops with `CircularReference` rather than
    /// looping forever if the parent chain folds back on itself.
    pub fn inherit<T>(
        &self,
        resolve: &impl Resolve,
        eval: impl Fn(&FieldDictionary) -> Option<T>,
    ) -> Result<Option<T>> {
        if let Some(v) = eval(self) {
            return Ok(Some(v));
        }
        let mut visited = HashSet::new();
        let mut current = self.parent;
        while let Some(p) = current {
            let id = p.get_inner();
            if !visited.insert(id) {
                return Err(PdfError::CircularReference {
                    context: format!("field parent chain at object {}", id.id),
                });
            }
            let field = t!(resolve.get(p));
            if let Some(v) = eval(&field) {
                return Ok(Some(v));
            }
            current = field.parent;
        }
        Ok(None)
    }

    /// The field type in effect for this field, inherited from an
    /// ancestor if this dictionary doesn't set `/FT` itself.
    pub fn effective_ft(&self, resolve: &impl Resolve) -> Result<Option<FieldType>> {
        self.inherit(resolve, |f| f.typ)
    }

    /// A field with no `/Kids` is a terminal field: it holds a value
    /// directly and, if it has no separate widget, doubles as its own
    /// widget annotation (see `Merged<FieldDictionary, Annot>`).
    pub fn is_terminal(&self) -> bool {
        self.kids.is_empty()
    }
}

#[derive(Object, ObjectWrite, Debug, pdf_derive::DataSize, Clone, DeepClone)]
pub struct AppearanceStreams {
    #[pdf(key = "N")]
    pub normal: Ref<AppearanceStreamEntry>,

    #[pdf(key = "R")]
    pub rollover: Option<Ref<AppearanceStreamEntry>>,

    #[pdf(key = "D")]
    pub down: Option<Ref<AppearanceStreamEntry>>,
}

#[derive(Clone, Debug, DeepClone)]
pub enum AppearanceStreamEntry {
    Single(FormXObject),
    Dict(HashMap<Name, AppearanceStreamEntry>),
}
impl Object for AppearanceStreamEntry {
    fn from_primitive(p: Primitive, resolve: &impl Resolve) -> Result<Self> {
        match p.resolve(resolve)? {
            p @ Primitive::Dictionary(_) => {
                Object::from_primitive(p, resolve).map(AppearanceStreamEntry::Dict)
            }
            p @ Primitive::Stream(_) => {
                Object::from_primitive(p, resolve).map(AppearanceStreamEntry::Single)
            }
            p => Err(PdfError::UnexpectedPrimitive {
                expected: "Dict or Stream",
                found: p.get_debug_name(),
            }),
        }
    }
}
impl ObjectWrite for AppearanceStreamEntry {
    fn to_primitive(&self, update: &mut impl Updater) -> Result<Primitive> {
        match self {
            AppearanceStreamEntry::Dict(d) => d.to_primitive(update),
            AppearanceStreamEntry::Single(s) => s.to_primitive(update),
        }
    }
}
impl DataSize for AppearanceStreamEntry {
    const IS_DYNAMIC: bool = true;
    const STATIC_HEAP_SIZE: usize = std::mem::size_of::<Self>();
    fn estimate_heap_size(&self) -> usize {
        match self {
            AppearanceStreamEntry::Dict(d) => d.estimate_heap_size(),
            AppearanceStreamEntry::Single(s) => s.estimate_heap_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_field() -> FieldDictionary {
        FieldDictionary {
            typ: None,
            parent: None,
            kids: vec![],
            name: None,
            alt_name: None,
            mapping_name: None,
            flags: 0,
            sig_flags: 0,
            value: Primitive::Null,
            default_value: Primitive::Null,
            default_resources: None,
            actions: None,
            rect: None,
            max_len: None,
            subtype: None,
            other: Dictionary::new(),
        }
    }

    #[test]
    fn field_without_parent_has_no_inherited_ft() {
        let field = empty_field();
        assert_eq!(field.effective_ft(&NoResolve).unwrap(), None);
    }

    #[test]
    fn field_with_own_ft_does_not_need_resolve() {
        let mut field = empty_field();
        field.typ = Some(FieldType::Text);
        assert_eq!(field.effective_ft(&NoResolve).unwrap(), Some(FieldType::Text));
    }

    #[test]
    fn field_with_kids_is_not_terminal() {
        let mut field = empty_field();
        assert!(field.is_terminal());
        field.kids = vec![Ref::from_id(5)];
        assert!(!field.is_terminal());
    }

    #[test]
    fn trapnet_and_printermark_keep_distinct_subtype_names() {
        let trap = AnnotVariant::TrapNet(Dictionary::new());
        let mark = AnnotVariant::PrinterMark(Dictionary::new());
        assert_eq!(trap.subtype_name(), "TrapNet");
        assert_eq!(mark.subtype_name(), "PrinterMark");
        assert_ne!(trap.subtype_name(), mark.subtype_name());
    }

    #[test]
    fn widget_and_popup_variants_name_correctly() {
        assert_eq!(
            AnnotVariant::Widget { parent: None, appearance_characteristics: None, highlighting: None }
                .subtype_name(),
            "Widget"
        );
        assert_eq!(AnnotVariant::Popup { parent: None, open: false }.subtype_name(), "Popup");
    }
}
