use super::prelude::*;

/// Fields shared by every shading dictionary (Table 78 of the PDF reference).
#[derive(Debug, Clone, pdf_derive::DataSize)]
pub struct ShadingCommon {
    pub color_space: ColorSpace,
    pub background: Option<Vec<f32>>,
    pub bbox: Option<Rectangle>,
    pub anti_alias: bool,
}
impl ShadingCommon {
    fn from_dict(dict: &Dictionary, resolve: &impl Resolve) -> Result<Self> {
        let color_space = t!(ColorSpace::from_primitive(
            t!(dict.get("ColorSpace").ok_or(PdfError::MissingEntry {
                typ: "Shading",
                field: "ColorSpace".into(),
            })).clone(),
            resolve
        ));
        let background = dict.get("Background")
            .map(|p| Vec::<f32>::from_primitive(p.clone(), resolve))
            .transpose()?;
        let bbox = dict.get("BBox")
            .map(|p| Rectangle::from_primitive(p.clone(), resolve))
            .transpose()?;
        let anti_alias = dict.get("AntiAlias")
            .map(|p| p.clone().resolve(resolve)?.as_bool())
            .transpose()?
            .unwrap_or(false);
        Ok(ShadingCommon { color_space, background, bbox, anti_alias })
    }
}

/// A shading pattern, used to paint smooth color gradients (PDF reference §8.7.4.5).
///
/// Types 2 (axial) and 3 (radial) are parsed fully; any other shading type is
/// kept around as a raw dictionary so at least the color space and bounding
/// box survive a round trip.
#[derive(Debug, Clone, pdf_derive::DataSize)]
pub enum Shading {
    Axial {
        common: ShadingCommon,
        coords: [f32; 4],
        domain: [f32; 2],
        function: Function,
        extend: [bool; 2],
    },
    Radial {
        common: ShadingCommon,
        coords: [f32; 6],
        domain: [f32; 2],
        function: Function,
        extend: [bool; 2],
    },
    Other {
        shading_type: i32,
        common: ShadingCommon,
        dict: Dictionary,
    },
}
impl Shading {
    pub fn common(&self) -> &ShadingCommon {
        match self {
            Shading::Axial { common, .. } => common,
            Shading::Radial { common, .. } => common,
            Shading::Other { common, .. } => common,
        }
    }
    fn coords<const N: usize>(dict: &Dictionary, resolve: &impl Resolve) -> Result<[f32; N]> {
        let arr = t!(dict.get("Coords").ok_or(PdfError::MissingEntry {
            typ: "Shading",
            field: "Coords".into(),
        })).clone().resolve(resolve)?.into_array(resolve)?;
        if arr.len() != N {
            bail!("Coords len {} != {}", arr.len(), N);
        }
        let mut out = [0.0; N];
        for (o, p) in out.iter_mut().zip(arr.iter()) {
            *o = p.as_number()?;
        }
        Ok(out)
    }
    fn domain(dict: &Dictionary, resolve: &impl Resolve) -> Result<[f32; 2]> {
        match dict.get("Domain") {
            Some(p) => {
                let arr = p.clone().resolve(resolve)?.into_array(resolve)?;
                if arr.len() != 2 {
                    bail!("Domain len != 2");
                }
                Ok([arr[0].as_number()?, arr[1].as_number()?])
            }
            None => Ok([0.0, 1.0]),
        }
    }
    fn extend(dict: &Dictionary, resolve: &impl Resolve) -> Result<[bool; 2]> {
        match dict.get("Extend") {
            Some(p) => {
                let arr = p.clone().resolve(resolve)?.into_array(resolve)?;
                if arr.len() != 2 {
                    bail!("Extend len != 2");
                }
                Ok([arr[0].clone().resolve(resolve)?.as_bool()?, arr[1].clone().resolve(resolve)?.as_bool()?])
            }
            None => Ok([false, false]),
        }
    }
}
impl Object for Shading {
    fn from_primitive(p: Primitive, resolve: &impl Resolve) -> Result<Self> {
        let p = p.resolve(resolve)?;
        let dict = match p {
            Primitive::Dictionary(dict) => dict,
            Primitive::Stream(stream) => stream.info,
            p => return Err(PdfError::UnexpectedPrimitive {
                expected: "Dictionary or Stream",
                found: p.get_debug_name(),
            }),
        };
        let shading_type: i32 = t!(t!(dict.get("ShadingType").ok_or(PdfError::MissingEntry {
            typ: "Shading",
            field: "ShadingType".into(),
        })).clone().resolve(resolve)?.as_integer());
        let common = ShadingCommon::from_dict(&dict, resolve)?;
        match shading_type {
            2 => Ok(Shading::Axial {
                coords: Self::coords::<4>(&dict, resolve)?,
                domain: Self::domain(&dict, resolve)?,
                function: t!(Function::from_primitive(
                    t!(dict.get("Function").ok_or(PdfError::MissingEntry {
                        typ: "Shading",
                        field: "Function".into(),
                    })).clone(),
                    resolve
                )),
                extend: Self::extend(&dict, resolve)?,
                common,
            }),
            3 => Ok(Shading::Radial {
                coords: Self::coords::<6>(&dict, resolve)?,
                domain: Self::domain(&dict, resolve)?,
                function: t!(Function::from_primitive(
                    t!(dict.get("Function").ok_or(PdfError::MissingEntry {
                        typ: "Shading",
                        field: "Function".into(),
                    })).clone(),
                    resolve
                )),
                extend: Self::extend(&dict, resolve)?,
                common,
            }),
            n => Ok(Shading::Other { shading_type: n, common, dict }),
        }
    }
}
impl ObjectWrite for Shading {
    fn to_primitive(&self, update: &mut impl Updater) -> Result<Primitive> {
        let mut dict = Dictionary::new();
        let common = self.common();
        dict.insert("ColorSpace", common.color_space.to_primitive(update)?);
        if common.anti_alias {
            dict.insert("AntiAlias", Primitive::Boolean(true));
        }
        if let Some(bbox) = &common.bbox {
            dict.insert("BBox", bbox.to_primitive(update)?);
        }
        match self {
            Shading::Axial { coords, domain, function, extend, .. } => {
                dict.insert("ShadingType", Primitive::Integer(2));
                dict.insert("Coords", Primitive::array::<f32, _, _, _>(coords.iter(), update)?);
                dict.insert("Domain", Primitive::array::<f32, _, _, _>(domain.iter(), update)?);
                dict.insert("Function", function.to_primitive(update)?);
                dict.insert("Extend", Primitive::Array(vec![
                    Primitive::Boolean(extend[0]), Primitive::Boolean(extend[1]),
                ]));
            }
            Shading::Radial { coords, domain, function, extend, .. } => {
                dict.insert("ShadingType", Primitive::Integer(3));
                dict.insert("Coords", Primitive::array::<f32, _, _, _>(coords.iter(), update)?);
                dict.insert("Domain", Primitive::array::<f32, _, _, _>(domain.iter(), update)?);
                dict.insert("Function", function.to_primitive(update)?);
                dict.insert("Extend", Primitive::Array(vec![
                    Primitive::Boolean(extend[0]), Primitive::Boolean(extend[1]),
                ]));
            }
            Shading::Other { shading_type, dict: other, .. } => {
                for (k, v) in other.iter() {
                    dict.insert(k.as_str(), v.clone());
                }
                dict.insert("ShadingType", Primitive::Integer(*shading_type as i32));
            }
        }
        Ok(Primitive::Dictionary(dict))
    }
}
impl DeepClone for Shading {
    fn deep_clone(&self, _cloner: &mut impl Cloner) -> Result<Self> {
        Ok(self.clone())
    }
}
