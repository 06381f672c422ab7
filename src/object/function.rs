use crate as pdf;
use crate::error::*;
use crate::object::*;

#[derive(Object, Debug, Clone)]
struct RawFunction {
    #[pdf(key = "FunctionType")]
    function_type: u32,

    #[pdf(key = "Domain")]
    domain: Vec<f32>,

    #[pdf(key = "Range")]
    range: Option<Vec<f32>>,

    #[pdf(other)]
    other: Dictionary,
}

#[derive(Object, Debug, Clone)]
struct Function2 {
    #[pdf(key = "C0")]
    c0: Option<Vec<f32>>,

    #[pdf(key = "C1")]
    c1: Option<Vec<f32>>,

    #[pdf(key = "N")]
    exponent: f32,
}

#[derive(Debug, Clone)]
pub enum Function {
    Sampled(SampledFunction),
    Interpolated(Vec<InterpolatedFunctionDim>),
    Stitching(StitchingFunction),
    PostScript {
        func:   PsFunc,
        domain: Vec<f32>,
        range:  Vec<f32>,
    },
}
impl Function {
    pub fn apply(&self, x: &[f32], out: &mut [f32]) -> Result<()> {
        match *self {
            Function::Sampled(ref func) => func.apply(x, out),
            Function::Interpolated(ref parts) => {
                if parts.len() != out.len() {
                    bail!(
                        "incorrect output length: expected {}, found {}.",
                        parts.len(),
                        out.len()
                    )
                }
                for (f, y) in parts.iter().zip(out) {
                    *y = f.apply(x[0]);
                }
                Ok(())
            }
            Function::Stitching(ref func) => func.apply(x, out),
            Function::PostScript { ref func, .. } => func.exec(x, out),
        }
    }
    pub fn input_dim(&self) -> usize {
        match *self {
            Function::Sampled(ref func) => func.input.len(),
            Function::Interpolated(_) => 1,
            Function::Stitching(_) => 1,
            Function::PostScript { ref domain, .. } => domain.len() / 2,
        }
    }
    pub fn output_dim(&self) -> usize {
        match *self {
            Function::Sampled(ref func) => func.output.len(),
            Function::Interpolated(ref parts) => parts.len(),
            Function::Stitching(ref func) => func.output_dim(),
            Function::PostScript { ref range, .. } => range.len() / 2,
        }
    }
}
impl FromDict for Function {
    fn from_dict(dict: Dictionary, resolve: &impl Resolve) -> Result<Self> {
        use std::f32::INFINITY;
        let raw = RawFunction::from_dict(dict, resolve)?;
        match raw.function_type {
            2 => {
                let f2 = Function2::from_dict(raw.other, resolve)?;
                let mut parts = Vec::with_capacity(raw.domain.len());

                let n_dim = match (raw.range.as_ref(), f2.c0.as_ref(), f2.c1.as_ref()) {
                    (Some(range), _, _) => range.len() / 2,
                    (_, Some(c0), _) => c0.len(),
                    (_, _, Some(c1)) => c1.len(),
                    _ => bail!("unknown dimensions"),
                };
                let input_range = (raw.domain[0], raw.domain[1]);
                for dim in 0..n_dim {
                    let output_range = (
                        raw.range
                            .as_ref()
                            .and_then(|r| r.get(2 * dim).cloned())
                            .unwrap_or(-INFINITY),
                        raw.range
                            .as_ref()
                            .and_then(|r| r.get(2 * dim + 1).cloned())
                            .unwrap_or(INFINITY),
                    );
                    let c0 = f2
                        .c0
                        .as_ref()
                        .and_then(|c0| c0.get(dim).cloned())
                        .unwrap_or(0.0);
                    let c1 = f2
                        .c1
                        .as_ref()
                        .and_then(|c1| c1.get(dim).cloned())
                        .unwrap_or(1.0);
                    let exponent = f2.exponent;
                    parts.push(InterpolatedFunctionDim {
                        input_range,
                        output_range,
                        c0,
                        c1,
                        exponent,
                    });
                }
                Ok(Function::Interpolated(parts))
            }
            3 => {
                if raw.domain.len() < 2 {
                    bail!("stitching function missing Domain");
                }
                let functions_prim = t!(raw.other.get("Functions").ok_or(PdfError::MissingEntry {
                    typ: "Function",
                    field: "Functions".into(),
                })).clone();
                let functions_arr = t!(functions_prim.into_array(resolve));
                let mut functions = Vec::with_capacity(functions_arr.len());
                for f in functions_arr {
                    functions.push(t!(Function::from_primitive(f, resolve)));
                }
                let bounds = t!(raw.other.get("Bounds")
                    .map(|p| Vec::<f32>::from_primitive(p.clone(), resolve))
                    .transpose()).unwrap_or_default();
                let encode_prim = t!(raw.other.get("Encode").ok_or(PdfError::MissingEntry {
                    typ: "Function",
                    field: "Encode".into(),
                })).clone();
                let encode_flat = t!(Vec::<f32>::from_primitive(encode_prim, resolve));
                if encode_flat.len() != 2 * functions.len() {
                    bail!("Encode length does not match Functions count");
                }
                let encode = encode_flat.chunks(2).map(|c| (c[0], c[1])).collect();
                Ok(Function::Stitching(StitchingFunction {
                    domain: (raw.domain[0], raw.domain[1]),
                    functions,
                    bounds,
                    encode,
                }))
            }
            i => Err(PdfError::UnsupportedFeature {
                what: format!("function type {} in a dictionary (expected 2 or 3)", i),
            }),
        }
    }
}
impl Object for Function {
    fn from_primitive(p: Primitive, resolve: &impl Resolve) -> Result<Self> {
        match p {
            Primitive::Dictionary(dict) => Self::from_dict(dict, resolve),
            Primitive::Stream(s) => {
                let stream = Stream::<RawFunction>::from_stream(s, resolve)?;
                match stream.info.function_type {
                    4 => {
                        let data = stream.decode()?;
                        let s = std::str::from_utf8(&*data)?;
                        let func = PsFunc::parse(s)?;
                        let info = stream.info.info;
                        Ok(Function::PostScript {
                            func,
                            domain: info.domain,
                            range: info.range.unwrap_or_default(),
                        })
                    }
                    0 => {
                        let data = t!(stream.decode()).into_owned();
                        let other = &stream.info.info.other;
                        let domain = &stream.info.info.domain;
                        let range = stream.info.info.range.as_ref().ok_or(PdfError::MissingEntry {
                            typ: "Function",
                            field: "Range".into(),
                        })?;
                        let size = t!(other.get("Size").ok_or(PdfError::MissingEntry {
                            typ: "Function",
                            field: "Size".into(),
                        })).clone();
                        let size: Vec<u32> = t!(Vec::<u32>::from_primitive(size, resolve));
                        let bits_per_sample: u32 = t!(t!(other.get("BitsPerSample").ok_or(PdfError::MissingEntry {
                            typ: "Function",
                            field: "BitsPerSample".into(),
                        })).clone().resolve(resolve)?.as_integer()) as u32;
                        let encode = other.get("Encode")
                            .map(|p| Vec::<f32>::from_primitive(p.clone(), resolve))
                            .transpose()?;
                        let decode = other.get("Decode")
                            .map(|p| Vec::<f32>::from_primitive(p.clone(), resolve))
                            .transpose()?
                            .unwrap_or_else(|| range.clone());

                        let m = size.len();
                        if domain.len() != 2 * m {
                            bail!("sampled function Domain length does not match Size");
                        }
                        let n = range.len() / 2;
                        if decode.len() != 2 * n {
                            bail!("sampled function Decode length does not match Range");
                        }

                        let mut input = Vec::with_capacity(m);
                        for i in 0..m {
                            let d0 = domain[2 * i];
                            let d1 = domain[2 * i + 1];
                            let (e0, e1) = match &encode {
                                Some(e) => (e[2 * i], e[2 * i + 1]),
                                None => (0.0, (size[i].saturating_sub(1)) as f32),
                            };
                            let encode_scale = if d1 != d0 { (e1 - e0) / (d1 - d0) } else { 0.0 };
                            let encode_offset = e0 - d0 * encode_scale;
                            input.push(SampledFunctionInput {
                                domain: (d0, d1),
                                encode_offset,
                                encode_scale,
                                size: size[i],
                            });
                        }

                        let max_sample = ((1u64 << bits_per_sample) - 1) as f32;
                        let mut output = Vec::with_capacity(n);
                        for j in 0..n {
                            let decode_min = decode[2 * j];
                            let decode_max = decode[2 * j + 1];
                            output.push(SampledFunctionOutput {
                                output_offset: decode_min,
                                output_scale: if max_sample > 0.0 {
                                    (decode_max - decode_min) / max_sample
                                } else {
                                    0.0
                                },
                            });
                        }

                        Ok(Function::Sampled(SampledFunction {
                            input,
                            output,
                            data,
                            bits_per_sample,
                        }))
                    }
                    other => Err(PdfError::UnsupportedFeature {
                        what: format!("function type {} in a stream (expected 0 or 4)", other),
                    }),
                }
            }
            Primitive::Reference(r) => Self::from_primitive(resolve.resolve(r)?, resolve),
            other => Err(PdfError::UnexpectedPrimitive {
                expected: "Dictionary, Stream or Reference",
                found: other.get_debug_name(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
struct SampledFunctionInput {
    domain:        (f32, f32),
    encode_offset: f32,
    encode_scale:  f32,
    size:          u32,
}
impl SampledFunctionInput {
    fn map(&self, x: f32) -> f32 {
        let x = x.clamp(self.domain.0, self.domain.1);
        x.mul_add(self.encode_scale, self.encode_offset)
    }
}

#[derive(Debug, Clone)]
struct SampledFunctionOutput {
    output_offset: f32,
    output_scale:  f32,
}
impl SampledFunctionOutput {
    fn decode(&self, raw_sample: f32) -> f32 {
        raw_sample.mul_add(self.output_scale, self.output_offset)
    }
}

/// Reads `bits` bits (up to 32) starting at `bit_offset` from `data`,
/// most-significant-bit first, treating missing bytes past the end as
/// zero (PDF reference §7.10.2 encodes samples packed this way).
fn read_sample_bits(data: &[u8], bit_offset: usize, bits: u32) -> u32 {
    let mut value: u32 = 0;
    for i in 0..bits as usize {
        let idx = bit_offset + i;
        let byte = data.get(idx / 8).copied().unwrap_or(0);
        let bit = (byte >> (7 - idx % 8)) & 1;
        value = (value << 1) | bit as u32;
    }
    value
}

/// `Type 0` sampled function: a multidimensional table of samples, linearly
/// interpolated between the `2^m` corners nearest to the encoded input
/// point (PDF reference §7.10.2).
#[derive(Debug, Clone)]
pub struct SampledFunction {
    input:           Vec<SampledFunctionInput>,
    output:          Vec<SampledFunctionOutput>,
    data:            Vec<u8>,
    bits_per_sample: u32,
}
impl SampledFunction {
    fn sample_index(coords: &[u32], size: &[u32]) -> usize {
        let mut idx = 0usize;
        for d in (0..coords.len()).rev() {
            idx = idx * size[d] as usize + coords[d] as usize;
        }
        idx
    }
    fn raw_sample(&self, coords: &[u32], output_idx: usize) -> f32 {
        let size: Vec<u32> = self.input.iter().map(|i| i.size).collect();
        let sample_idx = Self::sample_index(coords, &size);
        let bit_offset = (sample_idx * self.output.len() + output_idx) * self.bits_per_sample as usize;
        read_sample_bits(&self.data, bit_offset, self.bits_per_sample) as f32
    }
    fn apply(&self, x: &[f32], out: &mut [f32]) -> Result<()> {
        let m = self.input.len();
        if x.len() != m {
            bail!("expected {} inputs, found {}", m, x.len());
        }
        if out.len() != self.output.len() {
            bail!(
                "incorrect output length: expected {}, found {}.",
                self.output.len(),
                out.len()
            );
        }

        let encoded: Vec<f32> = x
            .iter()
            .zip(&self.input)
            .map(|(&xi, dim)| dim.map(xi).clamp(0.0, (dim.size.saturating_sub(1)) as f32))
            .collect();
        let floor: Vec<u32> = encoded
            .iter()
            .zip(&self.input)
            .map(|(&e, dim)| (e.floor() as u32).min(dim.size.saturating_sub(1)))
            .collect();
        let frac: Vec<f32> = encoded.iter().zip(&floor).map(|(&e, &f)| e - f as f32).collect();

        for j in 0..out.len() {
            let mut acc = 0.0f32;
            for corner in 0..(1u32 << m) {
                let mut weight = 1.0f32;
                let mut coords = Vec::with_capacity(m);
                for d in 0..m {
                    let bit = (corner >> d) & 1;
                    let size_d = self.input[d].size;
                    coords.push(if bit == 1 {
                        (floor[d] + 1).min(size_d.saturating_sub(1))
                    } else {
                        floor[d]
                    });
                    weight *= if bit == 1 { frac[d] } else { 1.0 - frac[d] };
                }
                if weight != 0.0 {
                    acc += weight * self.raw_sample(&coords, j);
                }
            }
            out[j] = self.output[j].decode(acc);
        }
        Ok(())
    }
}

/// `Type 3` stitching function: partitions `Domain` into subdomains by
/// `Bounds` and dispatches each to one of `Functions`, re-encoded into
/// that function's own input range (PDF reference §7.10.4).
#[derive(Debug, Clone)]
pub struct StitchingFunction {
    domain:    (f32, f32),
    functions: Vec<Function>,
    bounds:    Vec<f32>,
    encode:    Vec<(f32, f32)>,
}
impl StitchingFunction {
    fn apply(&self, x: &[f32], out: &mut [f32]) -> Result<()> {
        if x.is_empty() {
            bail!("stitching function requires one input");
        }
        let x0 = x[0].clamp(self.domain.0, self.domain.1);
        let mut k = 0;
        while k < self.bounds.len() && x0 >= self.bounds[k] {
            k += 1;
        }
        let low = if k == 0 { self.domain.0 } else { self.bounds[k - 1] };
        let high = if k == self.bounds.len() { self.domain.1 } else { self.bounds[k] };
        let (e0, e1) = self.encode[k];
        let encoded = if high != low {
            e0 + (x0 - low) * (e1 - e0) / (high - low)
        } else {
            e0
        };
        self.functions[k].apply(&[encoded], out)
    }
    fn output_dim(&self) -> usize {
        self.functions.first().map(|f| f.output_dim()).unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct InterpolatedFunctionDim {
    pub input_range:  (f32, f32),
    pub output_range: (f32, f32),
    pub c0:           f32,
    pub c1:           f32,
    pub exponent:     f32,
}
impl InterpolatedFunctionDim {
    pub fn apply(&self, x: f32) -> f32 {
        let y = self.c0 + x.powf(self.exponent) * (self.c1 - self.c0);
        let (y0, y1) = self.output_range;
        y.min(y1).max(y0)
    }
}

#[derive(Debug)]
pub enum PostScriptError {
    StackUnderflow,
    IncorrectStackSize,
}
#[derive(Debug, Clone)]
pub struct PsFunc {
    pub ops: Vec<PsOp>,
}

macro_rules! op {
    ($stack:ident; $($v:ident),* => $($e:expr),*) => ( {
        $(let $v = $stack.pop().ok_or(PostScriptError::StackUnderflow)?;)*
        $($stack.push($e);)*
    } )
}

impl PsFunc {
    fn exec_inner(&self, stack: &mut Vec<f32>) -> Result<(), PostScriptError> {
        for &op in &self.ops {
            match op {
                PsOp::Int(i) => stack.push(i as f32),
                PsOp::Value(v) => stack.push(v),
                PsOp::Dup => op!(stack; v => v, v),
                PsOp::Exch => op!(stack; a, b => a, b),
                PsOp::Add => op!(stack; a, b => a + b),
                PsOp::Sub => op!(stack; a, b => a - b),
                PsOp::Mul => op!(stack; a, b => a * b),
                PsOp::Abs => op!(stack; a => a.abs()),
                PsOp::Roll => {
                    let j = stack.pop().ok_or(PostScriptError::StackUnderflow)? as isize;
                    let n = stack.pop().ok_or(PostScriptError::StackUnderflow)? as usize;
                    let start = stack.len() - n;
                    let slice = &mut stack[start..];
                    if j > 0 {
                        slice.rotate_right(j as usize);
                    } else {
                        slice.rotate_left(-j as usize);
                    }
                }
                PsOp::Index => {
                    let n = stack.pop().ok_or(PostScriptError::StackUnderflow)? as usize;
                    if n >= stack.len() {
                        return Err(PostScriptError::StackUnderflow);
                    }
                    let val = stack[stack.len() - n - 1];
                    stack.push(val);
                }
                PsOp::Cvr => {}
                PsOp::Pop => {
                    stack.pop().ok_or(PostScriptError::StackUnderflow)?;
                }
            }
        }
        Ok(())
    }
    pub fn exec(&self, input: &[f32], output: &mut [f32]) -> Result<()> {
        let mut stack = Vec::with_capacity(10);
        stack.extend_from_slice(input);
        match self.exec_inner(&mut stack) {
            Ok(()) => {}
            Err(_) => return Err(PdfError::PostScriptExec),
        }
        if output.len() != stack.len() {
            bail!(
                "incorrect output length: expected {}, found {}.",
                stack.len(),
                output.len()
            )
        }
        output.copy_from_slice(&stack);
        Ok(())
    }
    pub fn parse(s: &str) -> Result<Self, PdfError> {
        let start = s.find("{").ok_or(PdfError::PostScriptParse)?;
        let end = s.rfind("}").ok_or(PdfError::PostScriptParse)?;

        let ops: Result<Vec<_>, _> = s[start + 1..end]
            .split_ascii_whitespace()
            .map(PsOp::parse)
            .collect();
        Ok(PsFunc { ops: ops? })
    }
}

#[derive(Copy, Clone, Debug)]
pub enum PsOp {
    Int(i32),
    Value(f32),
    Add,
    Sub,
    Abs,
    Mul,
    Dup,
    Exch,
    Roll,
    Index,
    Cvr,
    Pop,
}
impl PsOp {
    pub fn parse(s: &str) -> Result<Self> {
        if let Ok(i) = s.parse::<i32>() {
            Ok(PsOp::Int(i))
        } else if let Ok(f) = s.parse::<f32>() {
            Ok(PsOp::Value(f))
        } else {
            Ok(match s {
                "add" => PsOp::Add,
                "sub" => PsOp::Sub,
                "abs" => PsOp::Abs,
                "mul" => PsOp::Mul,
                "dup" => PsOp::Dup,
                "exch" => PsOp::Exch,
                "roll" => PsOp::Roll,
                "index" => PsOp::Index,
                "cvr" => PsOp::Cvr,
                "pop" => PsOp::Pop,
                _ => {
                    bail!("unimplemented op {}", s);
                }
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_sample_bits_msb_first() {
        // 0b1011_0010
        let data = [0b1011_0010u8];
        assert_eq!(read_sample_bits(&data, 0, 4), 0b1011);
        assert_eq!(read_sample_bits(&data, 4, 4), 0b0010);
        assert_eq!(read_sample_bits(&data, 0, 8), 0b1011_0010);
    }

    #[test]
    fn read_sample_bits_past_end_is_zero() {
        let data = [0xffu8];
        assert_eq!(read_sample_bits(&data, 8, 8), 0);
    }

    #[test]
    fn sampled_function_output_decode_maps_into_range() {
        let out = SampledFunctionOutput { output_offset: 1.0, output_scale: 2.0 };
        assert_eq!(out.decode(0.0), 1.0);
        assert_eq!(out.decode(1.0), 3.0);
    }

    fn one_dim_sampled(samples: &[u8]) -> SampledFunction {
        SampledFunction {
            input: vec![SampledFunctionInput {
                domain: (0.0, 1.0),
                encode_offset: 0.0,
                encode_scale: (samples.len() - 1) as f32,
                size: samples.len() as u32,
            }],
            output: vec![SampledFunctionOutput { output_offset: 0.0, output_scale: 1.0 }],
            data: samples.to_vec(),
            bits_per_sample: 8,
        }
    }

    #[test]
    fn sampled_function_interpolates_between_neighbors() {
        // 4 samples: 0, 10, 20, 30, spanning domain [0, 1].
        let func = one_dim_sampled(&[0, 10, 20, 30]);
        let mut out = [0.0];
        func.apply(&[0.0], &mut out).unwrap();
        assert_eq!(out[0], 0.0);
        func.apply(&[1.0], &mut out).unwrap();
        assert_eq!(out[0], 30.0);
        // Halfway between sample 0 and sample 1 (domain 1/6).
        func.apply(&[1.0 / 6.0], &mut out).unwrap();
        assert!((out[0] - 5.0).abs() < 1e-4);
    }

    #[test]
    fn sampled_function_rejects_wrong_input_count() {
        let func = one_dim_sampled(&[0, 255]);
        let mut out = [0.0];
        assert!(func.apply(&[0.0, 0.0], &mut out).is_err());
    }

    fn linear_interpolated(c0: f32, c1: f32) -> Function {
        Function::Interpolated(vec![InterpolatedFunctionDim {
            input_range: (0.0, 1.0),
            output_range: (c0.min(c1), c0.max(c1)),
            c0,
            c1,
            exponent: 1.0,
        }])
    }

    #[test]
    fn stitching_function_dispatches_to_correct_subfunction_and_reencodes() {
        // Two sub-functions over [0, 0.5) and [0.5, 1], each its own
        // 0..1 output range, re-encoded into 0..1 on entry.
        let func = StitchingFunction {
            domain:    (0.0, 1.0),
            functions: vec![linear_interpolated(0.0, 1.0), linear_interpolated(0.0, 1.0)],
            bounds:    vec![0.5],
            encode:    vec![(0.0, 1.0), (0.0, 1.0)],
        };
        let mut out = [0.0];
        func.apply(&[0.0], &mut out).unwrap();
        assert!((out[0] - 0.0).abs() < 1e-6);
        func.apply(&[0.25], &mut out).unwrap();
        assert!((out[0] - 0.5).abs() < 1e-6);
        func.apply(&[0.75], &mut out).unwrap();
        assert!((out[0] - 0.5).abs() < 1e-6);
        assert_eq!(func.output_dim(), 1);
    }

    #[test]
    fn stitching_function_requires_input() {
        let func = StitchingFunction {
            domain: (0.0, 1.0),
            functions: vec![linear_interpolated(0.0, 1.0)],
            bounds: vec![],
            encode: vec![(0.0, 1.0)],
        };
        let mut out = [0.0];
        assert!(func.apply(&[], &mut out).is_err());
    }
}
