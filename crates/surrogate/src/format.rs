//! The format-spec mini-language used by `format()` and `__format__`.
//!
//! Supports `[[fill]align][sign][#][0][width][grouping][.precision][type]` for ints, floats
//! and strings. Float `repr` also lives here since the `g`/empty presentation types fall
//! back to it.

use std::str::FromStr;

/// Errors raised while parsing or applying a format spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    Overflow(String),
    InvalidAlignment(String),
    ValueError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Align {
    Left,
    Right,
    Center,
    /// Pad between the sign and the digits.
    AfterSign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Sign {
    #[default]
    Negative,
    Always,
    Space,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FormatSpec {
    fill: char,
    align: Option<Align>,
    sign: Option<Sign>,
    alternate: bool,
    zero_pad: bool,
    width: usize,
    grouping: Option<char>,
    precision: Option<usize>,
    kind: Option<char>,
}

impl FromStr for FormatSpec {
    type Err = FormatError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let chars: Vec<char> = spec.chars().collect();
        let mut pos = 0;
        let mut parsed = Self {
            fill: ' ',
            align: None,
            sign: None,
            alternate: false,
            zero_pad: false,
            width: 0,
            grouping: None,
            precision: None,
            kind: None,
        };

        let align_of = |c: char| match c {
            '<' => Some(Align::Left),
            '>' => Some(Align::Right),
            '^' => Some(Align::Center),
            '=' => Some(Align::AfterSign),
            _ => None,
        };
        if let Some(align) = chars.get(1).copied().and_then(align_of) {
            parsed.fill = chars[0];
            parsed.align = Some(align);
            pos = 2;
        } else if let Some(align) = chars.first().copied().and_then(align_of) {
            parsed.align = Some(align);
            pos = 1;
        }

        parsed.sign = match chars.get(pos) {
            Some('+') => Some(Sign::Always),
            Some('-') => Some(Sign::Negative),
            Some(' ') => Some(Sign::Space),
            _ => None,
        };
        if parsed.sign.is_some() {
            pos += 1;
        }
        if chars.get(pos) == Some(&'#') {
            parsed.alternate = true;
            pos += 1;
        }
        if chars.get(pos) == Some(&'0') {
            parsed.zero_pad = true;
            pos += 1;
        }

        let digits_end = take_digits(&chars, pos);
        parsed.width = parse_number(&chars[pos..digits_end])?;
        pos = digits_end;

        if let Some(&c @ (',' | '_')) = chars.get(pos) {
            parsed.grouping = Some(c);
            pos += 1;
        }
        if chars.get(pos) == Some(&'.') {
            let end = take_digits(&chars, pos + 1);
            if end == pos + 1 {
                return Err(FormatError::ValueError("Format specifier missing precision".to_owned()));
            }
            parsed.precision = Some(parse_number(&chars[pos + 1..end])?);
            pos = end;
        }
        if let Some(&c) = chars.get(pos) {
            parsed.kind = Some(c);
            pos += 1;
        }
        if pos != chars.len() {
            return Err(FormatError::ValueError("Invalid format specifier".to_owned()));
        }
        Ok(parsed)
    }
}

fn take_digits(chars: &[char], start: usize) -> usize {
    let mut end = start;
    while chars.get(end).is_some_and(char::is_ascii_digit) {
        end += 1;
    }
    end
}

fn parse_number(digits: &[char]) -> Result<usize, FormatError> {
    if digits.is_empty() {
        return Ok(0);
    }
    digits
        .iter()
        .collect::<String>()
        .parse()
        .map_err(|_| FormatError::Overflow("Too many decimal digits in format string".to_owned()))
}

impl FormatSpec {
    fn unknown_code(&self, type_name: &str) -> FormatError {
        let code = self.kind.unwrap_or('s');
        FormatError::ValueError(format!("Unknown format code '{code}' for object of type '{type_name}'"))
    }

    fn sign_prefix(&self, negative: bool) -> &'static str {
        match (negative, self.sign.unwrap_or_default()) {
            (true, _) => "-",
            (false, Sign::Always) => "+",
            (false, Sign::Space) => " ",
            (false, Sign::Negative) => "",
        }
    }

    /// Pads `body` (with `prefix` holding sign and radix marker) to the requested width.
    fn pad(&self, prefix: &str, body: &str, default_align: Align) -> String {
        let (fill, align) = match (self.align, self.zero_pad) {
            (Some(align), _) => (self.fill, align),
            (None, true) => ('0', Align::AfterSign),
            (None, false) => (self.fill, default_align),
        };
        let len = prefix.chars().count() + body.chars().count();
        let padding = self.width.saturating_sub(len);
        let repeat = |n: usize| std::iter::repeat_n(fill, n).collect::<String>();
        match align {
            Align::Left => format!("{prefix}{body}{}", repeat(padding)),
            Align::Right => format!("{}{prefix}{body}", repeat(padding)),
            Align::Center => {
                let left = padding / 2;
                format!("{}{prefix}{body}{}", repeat(left), repeat(padding - left))
            }
            Align::AfterSign => format!("{prefix}{}{body}", repeat(padding)),
        }
    }
}

/// Inserts `sep` between groups of `size` digits, counting from the right.
fn group_digits(digits: &str, sep: char, size: usize) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / size);
    for (index, c) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % size == 0 {
            out.push(sep);
        }
        out.push(c);
    }
    out
}

/// Formats an integer according to `spec`.
pub(crate) fn format_int(value: i64, spec: &str) -> Result<String, FormatError> {
    let spec: FormatSpec = spec.parse()?;
    let kind = spec.kind.unwrap_or('d');
    if matches!(kind, 'e' | 'E' | 'f' | 'F' | 'g' | 'G' | '%') {
        return format_float_spec(value as f64, &spec);
    }
    if spec.precision.is_some() {
        return Err(FormatError::ValueError(
            "Precision not allowed in integer format specifier".to_owned(),
        ));
    }
    let magnitude = value.unsigned_abs();
    let (radix_prefix, digits) = match kind {
        'd' | 'n' => ("", magnitude.to_string()),
        'b' => ("0b", format!("{magnitude:b}")),
        'o' => ("0o", format!("{magnitude:o}")),
        'x' => ("0x", format!("{magnitude:x}")),
        'X' => ("0X", format!("{magnitude:X}")),
        'c' => {
            let c = u32::try_from(value)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| FormatError::Overflow("%c arg not in range(0x110000)".to_owned()))?;
            return Ok(spec.pad("", &c.to_string(), Align::Left));
        }
        _ => return Err(spec.unknown_code("int")),
    };
    let digits = match spec.grouping {
        Some(sep) if kind == 'd' => group_digits(&digits, sep, 3),
        Some(sep) => group_digits(&digits, sep, 4),
        None => digits,
    };
    let mut prefix = spec.sign_prefix(value < 0).to_owned();
    if spec.alternate {
        prefix.push_str(radix_prefix);
    }
    Ok(spec.pad(&prefix, &digits, Align::Right))
}

/// Formats a float according to `spec`.
pub(crate) fn format_float(value: f64, spec: &str) -> Result<String, FormatError> {
    let spec: FormatSpec = spec.parse()?;
    format_float_spec(value, &spec)
}

fn format_float_spec(value: f64, spec: &FormatSpec) -> Result<String, FormatError> {
    let negative = value.is_sign_negative() && !value.is_nan();
    let magnitude = value.abs();
    let body = if magnitude.is_nan() || magnitude.is_infinite() {
        let text = if magnitude.is_nan() { "nan" } else { "inf" };
        if matches!(spec.kind, Some('F' | 'E' | 'G')) {
            text.to_uppercase()
        } else {
            text.to_owned()
        }
    } else {
        match spec.kind {
            Some('f' | 'F') => format!("{magnitude:.*}", spec.precision.unwrap_or(6)),
            Some('%') => format!("{:.*}%", spec.precision.unwrap_or(6), magnitude * 100.0),
            Some(c @ ('e' | 'E')) => {
                let text = exponent_form(magnitude, spec.precision.unwrap_or(6));
                if c == 'E' { text.to_uppercase() } else { text }
            }
            Some(c @ ('g' | 'G')) => {
                let text = general_form(magnitude, spec.precision.unwrap_or(6), spec.alternate);
                if c == 'G' { text.to_uppercase() } else { text }
            }
            None => match spec.precision {
                Some(precision) => general_form(magnitude, precision.max(1), true),
                None => float_repr(magnitude),
            },
            Some(_) => return Err(spec.unknown_code("float")),
        }
    };
    let body = match spec.grouping {
        Some(sep) => {
            let (int_part, rest) = body.split_at(body.find(|c: char| !c.is_ascii_digit()).unwrap_or(body.len()));
            format!("{}{rest}", group_digits(int_part, sep, 3))
        }
        None => body,
    };
    Ok(spec.pad(spec.sign_prefix(negative), &body, Align::Right))
}

/// `{:e}`-style formatting with a two-digit, signed exponent.
fn exponent_form(value: f64, precision: usize) -> String {
    let text = format!("{value:.precision$e}");
    fix_exponent(&text)
}

/// Rewrites Rust's `1.5e3` / `1e-7` exponents to Python's `1.5e+03` / `1e-07`.
fn fix_exponent(text: &str) -> String {
    match text.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => text.to_owned(),
    }
}

/// `{:g}`-style formatting: fixed or exponent form depending on magnitude.
fn general_form(value: f64, precision: usize, keep_point: bool) -> String {
    let precision = precision.max(1);
    if value == 0.0 {
        return if keep_point { "0.0".to_owned() } else { "0".to_owned() };
    }
    let exponent_text = format!("{value:.*e}", precision - 1);
    let exponent: i32 = exponent_text
        .split_once('e')
        .and_then(|(_, e)| e.parse().ok())
        .unwrap_or(0);
    let precision_exp = i32::try_from(precision).unwrap_or(i32::MAX);
    let text = if exponent < -4 || exponent >= precision_exp {
        let (mantissa, _) = exponent_text.split_once('e').unwrap_or((&exponent_text, ""));
        let mantissa = strip_zeros(mantissa);
        fix_exponent(&format!("{mantissa}e{exponent}"))
    } else {
        let decimals = usize::try_from(precision_exp - 1 - exponent).unwrap_or(0);
        strip_zeros(&format!("{value:.decimals$}")).to_owned()
    };
    if keep_point && !text.contains(['.', 'e', 'n', 'i']) {
        format!("{text}.0")
    } else {
        text
    }
}

fn strip_zeros(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

/// Formats a string according to `spec`.
pub(crate) fn format_str(value: &str, spec: &str) -> Result<String, FormatError> {
    let spec: FormatSpec = spec.parse()?;
    if !matches!(spec.kind, None | Some('s')) {
        return Err(spec.unknown_code("str"));
    }
    if spec.sign.is_some() {
        return Err(FormatError::ValueError(
            "Sign not allowed in string format specifier".to_owned(),
        ));
    }
    if spec.align == Some(Align::AfterSign) {
        return Err(FormatError::InvalidAlignment(
            "'=' alignment not allowed in string format specifier".to_owned(),
        ));
    }
    let body: String = match spec.precision {
        Some(precision) => value.chars().take(precision).collect(),
        None => value.to_owned(),
    };
    Ok(spec.pad("", &body, Align::Left))
}

/// The shortest round-tripping text for a float, spelled the way `repr(float)` does.
#[must_use]
pub(crate) fn float_repr(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf".to_owned() } else { "-inf".to_owned() };
    }
    let mut buffer = ryu::Buffer::new();
    let text = buffer.format_finite(value);
    if text.contains('e') {
        return fix_exponent(text);
    }
    // ryu keeps 1e-5 <= |x| < 1e-4 in positional form; repr switches below 1e-4
    let (sign, unsigned) = text.strip_prefix('-').map_or(("", text), |rest| ("-", rest));
    if let Some(fraction) = unsigned.strip_prefix("0.") {
        let digits = fraction.trim_start_matches('0');
        let zeros = fraction.len() - digits.len();
        if zeros >= 4 && !digits.is_empty() {
            let (first, rest) = digits.split_at(1);
            let mantissa = if rest.is_empty() {
                first.to_owned()
            } else {
                format!("{first}.{rest}")
            };
            return format!("{sign}{mantissa}e-{:02}", zeros + 1);
        }
    }
    text.to_owned()
}
