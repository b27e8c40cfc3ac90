//! printf-style formatting of a single resolved value.
//!
//! Grammar per conversion: `%[argnum$][flags][width][.precision]specifier`.
//! Flags: `-` left-justify, `+` force sign, space for positive sign, `0` zero
//! padding, `'c` pad with `c`. Specifiers: `b c d i u o x X e E f F g G s %`.
//! Only one value is available, so every conversion must refer to argument 1.

use crate::spec::{EnumRecordValue, RenderTableError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
struct SpecConversion {
    idx_arg: Option<usize>,
    if_left: bool,
    if_plus: bool,
    if_space: bool,
    chr_pad: char,
    width: Option<usize>,
    precision: Option<usize>,
    specifier: char,
}

/// Format `value` through `format`.
///
/// Null renders as `0` for numeric conversions and as empty text for `%s`.
/// Date/times render through `date_format` for `%s` only.
pub fn format_printf(format: &str, value: &EnumRecordValue, date_format: &str) -> Result<String> {
    let l_chars: Vec<char> = format.chars().collect();
    let mut c_out = String::with_capacity(format.len() + 8);
    let mut n_pos = 0usize;
    let mut n_args_used = 0usize;

    while n_pos < l_chars.len() {
        let chr = l_chars[n_pos];
        n_pos += 1;
        if chr != '%' {
            c_out.push(chr);
            continue;
        }
        if l_chars.get(n_pos) == Some(&'%') {
            c_out.push('%');
            n_pos += 1;
            continue;
        }

        let spec = parse_conversion(&l_chars, &mut n_pos, format)?;
        let n_arg = match spec.idx_arg {
            Some(n_idx) => n_idx,
            None => {
                n_args_used += 1;
                n_args_used
            }
        };
        if n_arg != 1 {
            return Err(derive_format_error(
                format,
                format!("conversion refers to argument {n_arg} but only one value is available"),
            ));
        }

        c_out.push_str(&render_conversion(&spec, value, date_format, format)?);
    }

    Ok(c_out)
}

fn parse_conversion(l_chars: &[char], n_pos: &mut usize, format: &str) -> Result<SpecConversion> {
    let mut spec = SpecConversion {
        idx_arg: None,
        if_left: false,
        if_plus: false,
        if_space: false,
        chr_pad: ' ',
        width: None,
        precision: None,
        specifier: '\0',
    };

    let n_digits_start = *n_pos;
    let mut n_scan = *n_pos;
    while n_scan < l_chars.len() && l_chars[n_scan].is_ascii_digit() {
        n_scan += 1;
    }
    if n_scan > n_digits_start && l_chars.get(n_scan) == Some(&'$') {
        let n_arg = derive_number(&l_chars[n_digits_start..n_scan], format)?;
        if n_arg == 0 {
            return Err(derive_format_error(format, "argument number must be >= 1"));
        }
        spec.idx_arg = Some(n_arg);
        *n_pos = n_scan + 1;
    }

    while let Some(&chr) = l_chars.get(*n_pos) {
        match chr {
            '-' => spec.if_left = true,
            '+' => spec.if_plus = true,
            ' ' => spec.if_space = true,
            '0' => spec.chr_pad = '0',
            '\'' => {
                *n_pos += 1;
                let Some(&chr_pad) = l_chars.get(*n_pos) else {
                    return Err(derive_format_error(format, "missing padding character after '"));
                };
                spec.chr_pad = chr_pad;
            }
            _ => break,
        }
        *n_pos += 1;
    }

    let n_width_start = *n_pos;
    while l_chars.get(*n_pos).is_some_and(char::is_ascii_digit) {
        *n_pos += 1;
    }
    if *n_pos > n_width_start {
        spec.width = Some(derive_number(&l_chars[n_width_start..*n_pos], format)?);
    }

    if l_chars.get(*n_pos) == Some(&'.') {
        *n_pos += 1;
        let n_prec_start = *n_pos;
        while l_chars.get(*n_pos).is_some_and(char::is_ascii_digit) {
            *n_pos += 1;
        }
        spec.precision = Some(if *n_pos > n_prec_start {
            derive_number(&l_chars[n_prec_start..*n_pos], format)?
        } else {
            0
        });
    }

    let Some(&specifier) = l_chars.get(*n_pos) else {
        return Err(derive_format_error(format, "missing conversion specifier"));
    };
    *n_pos += 1;
    if !"bcdiuoxXeEfFgGs".contains(specifier) {
        return Err(derive_format_error(
            format,
            format!("unknown conversion specifier '{specifier}'"),
        ));
    }
    spec.specifier = specifier;

    Ok(spec)
}

fn render_conversion(
    spec: &SpecConversion,
    value: &EnumRecordValue,
    date_format: &str,
    format: &str,
) -> Result<String> {
    match spec.specifier {
        's' => {
            let c_text = derive_text_argument(value, date_format, format)?;
            let c_text = match spec.precision {
                Some(n_prec) => c_text.chars().take(n_prec).collect(),
                None => c_text,
            };
            Ok(apply_padding("", &c_text, spec))
        }
        'c' => {
            let n_val = derive_integer_argument(value, format)?;
            let chr = u32::try_from(n_val)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| {
                    derive_format_error(format, format!("{n_val} is not a valid character code"))
                })?;
            Ok(chr.to_string())
        }
        'd' | 'i' => {
            let n_val = derive_integer_argument(value, format)?;
            let c_sign = derive_sign(n_val < 0, spec);
            Ok(apply_padding(c_sign, &n_val.unsigned_abs().to_string(), spec))
        }
        'u' => {
            let n_val = derive_integer_argument(value, format)? as u64;
            Ok(apply_padding("", &n_val.to_string(), spec))
        }
        'b' | 'o' | 'x' | 'X' => {
            let n_val = derive_integer_argument(value, format)? as u64;
            let c_body = match spec.specifier {
                'b' => format!("{n_val:b}"),
                'o' => format!("{n_val:o}"),
                'x' => format!("{n_val:x}"),
                _ => format!("{n_val:X}"),
            };
            Ok(apply_padding("", &c_body, spec))
        }
        'e' | 'E' | 'f' | 'F' | 'g' | 'G' => {
            let x_val = derive_float_argument(value, format)?;
            let n_prec = spec.precision.unwrap_or(6);
            let c_body = if !x_val.is_finite() {
                derive_non_finite_text(x_val)
            } else {
                match spec.specifier {
                    'e' => format_exponent(x_val.abs(), n_prec, false),
                    'E' => format_exponent(x_val.abs(), n_prec, true),
                    'f' | 'F' => format!("{:.*}", n_prec, x_val.abs()),
                    'g' => format_general(x_val.abs(), n_prec, false),
                    _ => format_general(x_val.abs(), n_prec, true),
                }
            };
            let if_negative = x_val.is_sign_negative() && !x_val.is_nan() && x_val != 0.0;
            Ok(apply_padding(derive_sign(if_negative, spec), &c_body, spec))
        }
        other => Err(derive_format_error(
            format,
            format!("unknown conversion specifier '{other}'"),
        )),
    }
}

/// `1.234500e+3` style; exponent has no zero padding.
fn format_exponent(x_abs: f64, n_prec: usize, if_upper: bool) -> String {
    let c_raw = format!("{:.*e}", n_prec, x_abs);
    let (c_mantissa, c_exp) = c_raw.split_once('e').unwrap_or((c_raw.as_str(), "0"));
    let c_exp = match c_exp.strip_prefix('-') {
        Some(c_digits) => format!("-{c_digits}"),
        None => format!("+{c_exp}"),
    };
    let chr_e = if if_upper { 'E' } else { 'e' };
    format!("{c_mantissa}{chr_e}{c_exp}")
}

/// C-style `%g`: shortest of fixed/exponent with trailing zeros removed.
fn format_general(x_abs: f64, n_prec: usize, if_upper: bool) -> String {
    let n_prec = n_prec.max(1);
    if x_abs == 0.0 {
        return "0".to_string();
    }
    let c_sci = format!("{:.*e}", n_prec - 1, x_abs);
    let n_exp: i64 = c_sci
        .split_once('e')
        .and_then(|(_, c_exp)| c_exp.parse().ok())
        .unwrap_or(0);

    if n_exp < -4 || n_exp >= n_prec as i64 {
        let c_exp_text = format_exponent(x_abs, n_prec - 1, if_upper);
        let chr_e = if if_upper { 'E' } else { 'e' };
        match c_exp_text.split_once(chr_e) {
            Some((c_mantissa, c_exp)) => {
                format!("{}{chr_e}{c_exp}", strip_trailing_zeros(c_mantissa))
            }
            None => c_exp_text,
        }
    } else {
        let n_frac = (n_prec as i64 - 1 - n_exp).max(0) as usize;
        strip_trailing_zeros(&format!("{:.*}", n_frac, x_abs)).to_string()
    }
}

fn strip_trailing_zeros(c_text: &str) -> &str {
    if !c_text.contains('.') {
        return c_text;
    }
    c_text.trim_end_matches('0').trim_end_matches('.')
}

fn derive_non_finite_text(x_val: f64) -> String {
    if x_val.is_nan() {
        "NaN".to_string()
    } else {
        "Inf".to_string()
    }
}

fn derive_sign(if_negative: bool, spec: &SpecConversion) -> &'static str {
    if if_negative {
        "-"
    } else if spec.if_plus {
        "+"
    } else if spec.if_space {
        " "
    } else {
        ""
    }
}

fn apply_padding(c_sign: &str, c_body: &str, spec: &SpecConversion) -> String {
    let n_len = c_sign.chars().count() + c_body.chars().count();
    let n_fill = match spec.width {
        Some(n_width) if n_width > n_len => n_width - n_len,
        _ => return format!("{c_sign}{c_body}"),
    };
    let c_fill: String = std::iter::repeat_n(spec.chr_pad, n_fill).collect();

    if spec.if_left {
        format!("{c_sign}{c_body}{c_fill}")
    } else if spec.chr_pad == '0' {
        format!("{c_sign}{c_fill}{c_body}")
    } else {
        format!("{c_fill}{c_sign}{c_body}")
    }
}

fn derive_text_argument(value: &EnumRecordValue, date_format: &str, format: &str) -> Result<String> {
    match value {
        EnumRecordValue::Null => Ok(String::new()),
        EnumRecordValue::Bool(val) => Ok(val.to_string()),
        EnumRecordValue::Integer(val) => Ok(val.to_string()),
        EnumRecordValue::Float(val) => Ok(val.to_string()),
        EnumRecordValue::String(val) => Ok(val.clone()),
        EnumRecordValue::DateTime(val) => Ok(val.format(date_format).to_string()),
        EnumRecordValue::List(_) | EnumRecordValue::Map(_) => Err(derive_format_error(
            format,
            "nested lists and mappings cannot be formatted",
        )),
    }
}

fn derive_integer_argument(value: &EnumRecordValue, format: &str) -> Result<i64> {
    match value {
        EnumRecordValue::Null => Ok(0),
        EnumRecordValue::Bool(val) => Ok(i64::from(*val)),
        EnumRecordValue::Integer(val) => Ok(*val),
        EnumRecordValue::Float(val) => truncate_float(*val, format),
        EnumRecordValue::String(val) => {
            let c_trimmed = val.trim();
            if let Ok(n_val) = c_trimmed.parse::<i64>() {
                return Ok(n_val);
            }
            match c_trimmed.parse::<f64>() {
                Ok(x_val) => truncate_float(x_val, format),
                Err(_) => Err(derive_format_error(
                    format,
                    format!("{val:?} is not numeric"),
                )),
            }
        }
        other => Err(derive_format_error(
            format,
            format!("{} cannot be formatted as a number", derive_kind_name(other)),
        )),
    }
}

fn derive_float_argument(value: &EnumRecordValue, format: &str) -> Result<f64> {
    match value {
        EnumRecordValue::Null => Ok(0.0),
        EnumRecordValue::Bool(val) => Ok(if *val { 1.0 } else { 0.0 }),
        EnumRecordValue::Integer(val) => Ok(*val as f64),
        EnumRecordValue::Float(val) => Ok(*val),
        EnumRecordValue::String(val) => val.trim().parse::<f64>().map_err(|_| {
            derive_format_error(format, format!("{val:?} is not numeric"))
        }),
        other => Err(derive_format_error(
            format,
            format!("{} cannot be formatted as a number", derive_kind_name(other)),
        )),
    }
}

fn truncate_float(x_val: f64, format: &str) -> Result<i64> {
    if !x_val.is_finite() || x_val.trunc() > i64::MAX as f64 || x_val.trunc() < i64::MIN as f64 {
        return Err(derive_format_error(
            format,
            format!("{x_val} does not fit an integer conversion"),
        ));
    }
    Ok(x_val.trunc() as i64)
}

fn derive_number(l_digits: &[char], format: &str) -> Result<usize> {
    l_digits
        .iter()
        .collect::<String>()
        .parse::<usize>()
        .map_err(|err| derive_format_error(format, format!("invalid number: {err}")))
}

fn derive_kind_name(value: &EnumRecordValue) -> &'static str {
    match value {
        EnumRecordValue::Null => "null",
        EnumRecordValue::Bool(_) => "boolean",
        EnumRecordValue::Integer(_) => "integer",
        EnumRecordValue::Float(_) => "float",
        EnumRecordValue::String(_) => "string",
        EnumRecordValue::DateTime(_) => "date/time",
        EnumRecordValue::List(_) => "list",
        EnumRecordValue::Map(_) => "mapping",
    }
}

fn derive_format_error(format: &str, reason: impl Into<String>) -> RenderTableError {
    RenderTableError::Format {
        format: format.to_string(),
        reason: reason.into(),
    }
}
