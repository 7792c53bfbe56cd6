//! Excel number format codes.
//!
//! Parses a format code such as `#,##0.00`, `0%` or `hh:mm` and renders cell
//! values the way a spreadsheet application displays them. A code has up to
//! four `;`-separated sections (positive, negative, zero, text).
//!
//! Scientific and fraction layouts are not rendered; values under such a
//! section fall back to General.

use std::fmt::Write as _;

use calamine::{ExcelDateTime, ExcelDateTimeType};
use chrono::{Datelike, NaiveDateTime, TimeDelta, Timelike};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Significant digits a spreadsheet shows for a General number.
const GENERAL_PRECISION: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    General,
    Text,
    Digit(char),
    DecimalPoint,
    Comma,
    Percent,
    Exponent,
    Year(usize),
    Month(usize),
    Minute(usize),
    Day(usize),
    Hour(usize),
    Second(usize),
    SubSecond(usize),
    Elapsed(char, usize),
    AmPm { short: bool, upper: bool },
}

impl Token {
    const fn is_date_part(&self) -> bool {
        matches!(
            self,
            Self::Year(_)
                | Self::Month(_)
                | Self::Minute(_)
                | Self::Day(_)
                | Self::Hour(_)
                | Self::Second(_)
                | Self::SubSecond(_)
                | Self::Elapsed(..)
                | Self::AmPm { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    /// Only literals (or nothing at all).
    Literal,
    Numeric,
    Date,
    /// Scientific, fraction or text-only sections.
    Fallback,
}

#[derive(Debug, Clone)]
struct Section {
    tokens: Vec<Token>,
    layout: Layout,
}

impl Section {
    fn parse(code: &str) -> Self {
        let tokens = resolve_minutes(tokenize(code));

        let has = |pred: fn(&Token) -> bool| tokens.iter().any(pred);
        let fraction = has(|t| matches!(t, Token::Digit(_)))
            && tokens
                .iter()
                .any(|t| matches!(t, Token::Literal(s) if s == "/"));

        let layout = if has(Token::is_date_part) {
            Layout::Date
        } else if has(|t| *t == Token::Exponent) || fraction {
            Layout::Fallback
        } else if has(|t| matches!(t, Token::Digit(_) | Token::General)) {
            Layout::Numeric
        } else if has(|t| *t == Token::Text) {
            Layout::Fallback
        } else {
            Layout::Literal
        };

        Self { tokens, layout }
    }
}

/// A parsed number format code.
#[derive(Debug, Clone)]
pub struct NumberFormat {
    sections: Vec<Section>,
}

impl NumberFormat {
    /// Parses `code`. Unknown constructs degrade to literal text.
    #[must_use]
    pub fn parse(code: &str) -> Self {
        let sections = split_sections(code)
            .iter()
            .take(4)
            .map(|s| Section::parse(s))
            .collect();
        Self { sections }
    }

    /// True when the first section lays out a date or time.
    #[must_use]
    pub fn is_date_time(&self) -> bool {
        self.sections
            .first()
            .is_some_and(|s| s.layout == Layout::Date)
    }

    /// Renders a plain number.
    #[must_use]
    pub fn format_number(&self, value: f64, is_1904: bool) -> String {
        self.format(&ExcelDateTime::new(
            value,
            ExcelDateTimeType::DateTime,
            is_1904,
        ))
    }

    /// Renders a value calamine already classified as a date, time or
    /// duration. Only the serial number and date system are used.
    #[must_use]
    pub fn format(&self, value: &ExcelDateTime) -> String {
        let serial = value.as_f64();
        let Some((section, signed)) = self.section_for(serial) else {
            return general(serial);
        };

        match section.layout {
            Layout::Literal => render_literals(&section.tokens),
            Layout::Numeric => {
                let text = render_numeric(&section.tokens, serial.abs());
                let nonzero = text.chars().any(|c| c.is_ascii_digit() && c != '0');
                if signed && serial < 0.0 && nonzero {
                    format!("-{text}")
                } else {
                    text
                }
            }
            Layout::Date if serial >= 0.0 => value.as_datetime().map_or_else(
                || general(serial),
                |datetime| render_date(&section.tokens, serial, datetime),
            ),
            Layout::Date | Layout::Fallback => general(serial),
        }
    }

    /// Picks the section for `value`; the flag is set when the section does
    /// not carry its own sign and a minus must be added.
    fn section_for(&self, value: f64) -> Option<(&Section, bool)> {
        let first = self.sections.first()?;
        let picked = match self.sections.len() {
            1 => (first, true),
            2 if value < 0.0 => (&self.sections[1], false),
            2 => (first, false),
            _ if value < 0.0 => (&self.sections[1], false),
            _ if value == 0.0 => (&self.sections[2], false),
            _ => (first, false),
        };
        Some(picked)
    }
}

/// Renders `value` the way the General format does: at most 15 significant
/// digits, no trailing zeros, scientific notation for very large or very
/// small magnitudes.
#[must_use]
pub fn general(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let scientific = format!("{value:.prec$e}", prec = GENERAL_PRECISION - 1);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return value.to_string();
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let rounded: f64 = scientific.parse().unwrap_or(value);

    if rounded == 0.0 {
        return "0".to_string();
    }
    if (-9..15).contains(&exponent) {
        return rounded.to_string();
    }

    let mantissa = mantissa.trim_end_matches('0').trim_end_matches('.');
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}E{sign}{:02}", exponent.abs())
}

/// Splits on `;` outside quotes, brackets and escapes.
fn split_sections(code: &str) -> Vec<String> {
    let mut sections = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut escaped = false;

    for ch in code.chars() {
        if escaped {
            escaped = false;
        } else {
            match ch {
                '\\' if !in_quotes => escaped = true,
                '"' if !in_brackets => in_quotes = !in_quotes,
                '[' if !in_quotes => in_brackets = true,
                ']' if !in_quotes => in_brackets = false,
                ';' if !in_quotes && !in_brackets => {
                    sections.push(std::mem::take(&mut current));
                    continue;
                }
                _ => {}
            }
        }
        current.push(ch);
    }
    sections.push(current);
    sections
}

fn run_length(chars: &[char], start: usize, target: char) -> usize {
    chars[start..]
        .iter()
        .take_while(|c| c.eq_ignore_ascii_case(&target))
        .count()
}

fn starts_with_ignore_case(chars: &[char], start: usize, word: &str) -> bool {
    let len = word.chars().count();
    chars.len() >= start + len
        && chars[start..start + len]
            .iter()
            .zip(word.chars())
            .all(|(a, b)| a.eq_ignore_ascii_case(&b))
}

#[allow(clippy::too_many_lines)]
fn tokenize(section: &str) -> Vec<Token> {
    let chars: Vec<char> = section.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        match ch {
            '"' => {
                let text: String = chars[i + 1..].iter().take_while(|&&c| c != '"').collect();
                i += text.chars().count() + 2;
                tokens.push(Token::Literal(text));
                continue;
            }
            '\\' => {
                if let Some(next) = chars.get(i + 1) {
                    tokens.push(Token::Literal(next.to_string()));
                }
                i += 2;
                continue;
            }
            '_' => {
                tokens.push(Token::Literal(" ".into()));
                i += 2;
                continue;
            }
            '*' => {
                i += 2;
                continue;
            }
            '[' => {
                let content: String = chars[i + 1..].iter().take_while(|&&c| c != ']').collect();
                i += content.chars().count() + 2;
                if let Some(token) = bracket_token(&content) {
                    tokens.push(token);
                }
                continue;
            }
            '0' | '#' | '?' => tokens.push(Token::Digit(ch)),
            '.' => {
                let zeros = run_length(&chars, i + 1, '0');
                let after_seconds = tokens
                    .iter()
                    .any(|t| matches!(t, Token::Second(_) | Token::Elapsed('s', _)));
                if zeros > 0 && after_seconds {
                    tokens.push(Token::SubSecond(zeros));
                    i += zeros + 1;
                    continue;
                }
                tokens.push(Token::DecimalPoint);
            }
            ',' => tokens.push(Token::Comma),
            '%' => tokens.push(Token::Percent),
            '@' => tokens.push(Token::Text),
            'E' | 'e' if matches!(chars.get(i + 1), Some('+' | '-')) => {
                tokens.push(Token::Exponent);
                i += 2;
                continue;
            }
            'G' | 'g' if starts_with_ignore_case(&chars, i, "general") => {
                tokens.push(Token::General);
                i += "general".len();
                continue;
            }
            'A' | 'a' if starts_with_ignore_case(&chars, i, "am/pm") => {
                tokens.push(Token::AmPm {
                    short: false,
                    upper: ch == 'A',
                });
                i += "am/pm".len();
                continue;
            }
            'A' | 'a' if starts_with_ignore_case(&chars, i, "a/p") => {
                tokens.push(Token::AmPm {
                    short: true,
                    upper: ch == 'A',
                });
                i += "a/p".len();
                continue;
            }
            'y' | 'Y' | 'm' | 'M' | 'd' | 'D' | 'h' | 'H' | 's' | 'S' => {
                let lower = ch.to_ascii_lowercase();
                let count = run_length(&chars, i, lower);
                tokens.push(match lower {
                    'y' => Token::Year(count),
                    'm' => Token::Month(count),
                    'd' => Token::Day(count),
                    'h' => Token::Hour(count),
                    _ => Token::Second(count),
                });
                i += count;
                continue;
            }
            _ => tokens.push(Token::Literal(ch.to_string())),
        }
        i += 1;
    }

    tokens
}

/// Elapsed-time units (`[h]`, `[mm]`, `[ss]`) and currency symbols
/// (`[$€-407]`); colors, locales and conditions render nothing.
fn bracket_token(content: &str) -> Option<Token> {
    let lower = content.to_ascii_lowercase();
    for unit in ['h', 'm', 's'] {
        if !lower.is_empty() && lower.chars().all(|c| c == unit) {
            return Some(Token::Elapsed(unit, lower.len()));
        }
    }
    let symbol = content.strip_prefix('$')?.split('-').next()?;
    (!symbol.is_empty()).then(|| Token::Literal(symbol.to_string()))
}

/// `m`/`mm` next to an hour or before a second means minutes.
fn resolve_minutes(mut tokens: Vec<Token>) -> Vec<Token> {
    for i in 0..tokens.len() {
        let Token::Month(count) = tokens[i] else {
            continue;
        };
        if count > 2 {
            continue;
        }
        let after_hour = tokens[..i]
            .iter()
            .rev()
            .find(|t| t.is_date_part())
            .is_some_and(|t| matches!(t, Token::Hour(_) | Token::Elapsed('h', _)));
        let before_second = tokens[i + 1..]
            .iter()
            .find(|t| t.is_date_part())
            .is_some_and(|t| matches!(t, Token::Second(_) | Token::Elapsed('s', _)));
        if after_hour || before_second {
            tokens[i] = Token::Minute(count);
        }
    }
    tokens
}

fn render_literals(tokens: &[Token]) -> String {
    tokens
        .iter()
        .filter_map(|t| match t {
            Token::Literal(s) => Some(s.as_str()),
            _ => None,
        })
        .collect()
}

fn render_numeric(tokens: &[Token], value: f64) -> String {
    let mut int_zeros = 0;
    let mut min_decimals = 0;
    let mut max_decimals = 0;
    let mut has_point = false;
    let mut grouping = false;
    let mut scale = 0;
    let mut percent = 0;

    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Digit(d) if has_point => {
                max_decimals += 1;
                if *d == '0' {
                    min_decimals += 1;
                }
            }
            Token::Digit('0') => int_zeros += 1,
            Token::DecimalPoint => has_point = true,
            Token::Comma if !has_point => {
                if matches!(tokens.get(i + 1), Some(Token::Digit(_))) {
                    grouping = true;
                } else if tokens[..i].iter().any(|t| matches!(t, Token::Digit(_))) {
                    scale += 1;
                }
            }
            Token::Percent => percent += 1,
            _ => {}
        }
    }

    let value = value * 100_f64.powi(percent) / 1000_f64.powi(scale);
    let (mut integer, mut fraction) = round_half_up(&general_digits(value), max_decimals);

    while fraction.len() > min_decimals && fraction.ends_with('0') {
        fraction.pop();
    }
    if integer == "0" && int_zeros == 0 {
        integer.clear();
    }
    while integer.len() < int_zeros {
        integer.insert(0, '0');
    }
    if grouping {
        integer = group_thousands(&integer);
    }

    let mut number = integer;
    if has_point {
        number.push('.');
        number.push_str(&fraction);
    }

    let mut out = String::new();
    let mut emitted = false;
    for token in tokens {
        match token {
            Token::Digit(_) | Token::DecimalPoint | Token::Comma => {
                if !emitted {
                    out.push_str(&number);
                    emitted = true;
                }
            }
            Token::General => out.push_str(&general(value)),
            Token::Percent => out.push('%'),
            Token::Literal(s) => out.push_str(s),
            _ => {}
        }
    }
    out
}

/// Plain decimal digits of a non-negative value after General rounding.
fn general_digits(value: f64) -> String {
    let scientific = format!("{value:.prec$e}", prec = GENERAL_PRECISION - 1);
    scientific.parse::<f64>().unwrap_or(value).to_string()
}

/// Rounds a plain decimal string half away from zero to `decimals` places.
fn round_half_up(digits: &str, decimals: usize) -> (String, String) {
    let (integer, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    let mut all: Vec<u8> = integer
        .bytes()
        .chain(fraction.bytes().chain(std::iter::repeat(b'0')).take(decimals))
        .collect();

    if fraction.as_bytes().get(decimals).is_some_and(|d| *d >= b'5') {
        let mut carry = true;
        for digit in all.iter_mut().rev() {
            if *digit == b'9' {
                *digit = b'0';
            } else {
                *digit += 1;
                carry = false;
                break;
            }
        }
        if carry {
            all.insert(0, b'1');
        }
    }

    let split = all.len() - decimals;
    let to_string = |bytes: &[u8]| bytes.iter().map(|&b| char::from(b)).collect::<String>();
    (to_string(&all[..split]), to_string(&all[split..]))
}

fn group_thousands(integer: &str) -> String {
    let len = integer.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in integer.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[allow(clippy::cast_possible_truncation)]
fn render_date(tokens: &[Token], serial: f64, datetime: NaiveDateTime) -> String {
    let sub_second = tokens
        .iter()
        .find_map(|t| match t {
            Token::SubSecond(n) => Some((*n).min(3)),
            _ => None,
        })
        .unwrap_or(0);
    let datetime = round_to(datetime, sub_second);
    let seconds = serial * SECONDS_PER_DAY;
    let elapsed = if sub_second == 0 {
        seconds.round()
    } else {
        seconds.floor()
    } as i64;
    let twelve_hour = tokens.iter().any(|t| matches!(t, Token::AmPm { .. }));
    let (pm, hour12) = datetime.hour12();

    let mut out = String::new();
    for token in tokens {
        let _ = match token {
            Token::Year(n) if *n <= 2 => write!(out, "{:02}", datetime.year() % 100),
            Token::Year(_) => write!(out, "{:04}", datetime.year()),
            Token::Month(1) => write!(out, "{}", datetime.month()),
            Token::Month(2) => write!(out, "{:02}", datetime.month()),
            Token::Month(3) => write!(out, "{}", datetime.format("%b")),
            Token::Month(4) => write!(out, "{}", datetime.format("%B")),
            Token::Month(_) => {
                let initial = datetime.format("%B").to_string().chars().next();
                write!(out, "{}", initial.unwrap_or_default())
            }
            Token::Day(1) => write!(out, "{}", datetime.day()),
            Token::Day(2) => write!(out, "{:02}", datetime.day()),
            Token::Day(3) => write!(out, "{}", datetime.format("%a")),
            Token::Day(_) => write!(out, "{}", datetime.format("%A")),
            Token::Hour(n) => {
                let hour = if twelve_hour { hour12 } else { datetime.hour() };
                pad(&mut out, i64::from(hour), *n)
            }
            Token::Minute(n) => pad(&mut out, i64::from(datetime.minute()), *n),
            Token::Second(n) => pad(&mut out, i64::from(datetime.second()), *n),
            Token::SubSecond(n) => {
                let millis = format!("{:03}", datetime.nanosecond() / 1_000_000);
                write!(out, ".{}", &millis[..(*n).min(3)])
            }
            Token::Elapsed('h', n) => pad(&mut out, elapsed / 3600, *n),
            Token::Elapsed('m', n) => pad(&mut out, elapsed / 60, *n),
            Token::Elapsed(_, n) => pad(&mut out, elapsed, *n),
            Token::AmPm { short, upper } => {
                let marker = match (pm, *short) {
                    (true, false) => "PM",
                    (false, false) => "AM",
                    (true, true) => "P",
                    (false, true) => "A",
                };
                if *upper {
                    write!(out, "{marker}")
                } else {
                    write!(out, "{}", marker.to_ascii_lowercase())
                }
            }
            Token::Literal(s) => write!(out, "{s}"),
            Token::DecimalPoint => write!(out, "."),
            Token::Comma => write!(out, ","),
            Token::Percent => write!(out, "%"),
            _ => Ok(()),
        };
    }
    out
}

fn pad(out: &mut String, value: i64, width: usize) -> std::fmt::Result {
    if width >= 2 {
        write!(out, "{value:0width$}")
    } else {
        write!(out, "{value}")
    }
}

/// Rounds to the displayed sub-second precision.
fn round_to(datetime: NaiveDateTime, decimals: usize) -> NaiveDateTime {
    let unit = match decimals {
        0 => 1000,
        1 => 100,
        2 => 10,
        _ => 1,
    };
    let millis = i64::from(datetime.nanosecond() / 1_000_000);
    let rounded = (millis + unit / 2) / unit * unit;
    datetime.with_nanosecond(0).unwrap_or(datetime) + TimeDelta::milliseconds(rounded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(code: &str, value: f64) -> String {
        NumberFormat::parse(code).format_number(value, false)
    }

    #[test]
    fn test_general_trims_binary_noise() {
        assert_eq!(general(0.1 + 0.2), "0.3");
        assert_eq!(general(1.0 / 3.0), "0.333333333333333");
        assert_eq!(general(42.0), "42");
        assert_eq!(general(-1.5), "-1.5");
        assert_eq!(general(-0.0), "0");
        assert_eq!(general(1e20), "1E+20");
        assert_eq!(general(1.5e-12), "1.5E-12");
    }

    #[test]
    fn test_fixed_and_grouped() {
        assert_eq!(number("#,##0.00", 1234.5), "1,234.50");
        assert_eq!(number("#,##0", 1_234_567.0), "1,234,567");
        assert_eq!(number("0.00", 2.675), "2.68");
        assert_eq!(number("0", 0.5), "1");
        assert_eq!(number("0.00", -3.1), "-3.10");
        assert_eq!(number("#.##", 0.5), ".5");
        assert_eq!(number("000", 7.0), "007");
    }

    #[test]
    fn test_percent() {
        assert_eq!(number("0%", 0.5), "50%");
        assert_eq!(number("0.00%", 0.1234), "12.34%");
    }

    #[test]
    fn test_sections_and_literals() {
        let accounting = "$#,##0.00_);($#,##0.00)";
        assert_eq!(number(accounting, 1234.5), "$1,234.50 ");
        assert_eq!(number(accounting, -1234.5), "($1,234.50)");
        assert_eq!(number("0;-0;\"zero\"", 0.0), "zero");
        assert_eq!(number("[Red]0.0\" kg\"", 2.25), "2.3 kg");
        assert_eq!(number("#,##0,\"K\"", 12_500.0), "13K");
    }

    #[test]
    fn test_unsupported_layouts_fall_back_to_general() {
        assert_eq!(number("0.00E+00", 12_345.0), "12345");
        assert_eq!(number("# ?/?", 0.5), "0.5");
        assert_eq!(number("@", 3.25), "3.25");
        assert_eq!(number("General", 0.1 + 0.2), "0.3");
    }

    #[test]
    fn test_dates_and_times() {
        assert!(NumberFormat::parse("hh:mm").is_date_time());
        assert!(!NumberFormat::parse("0.00").is_date_time());

        // 2024-01-15 12:30:45
        let serial = 45_306.0 + (12.0 * 3600.0 + 30.0 * 60.0 + 45.0) / SECONDS_PER_DAY;
        assert_eq!(number("yyyy-mm-dd", serial), "2024-01-15");
        assert_eq!(number("dd/mm/yy hh:mm:ss", serial), "15/01/24 12:30:45");
        assert_eq!(number("d-mmm-yyyy", serial), "15-Jan-2024");
        assert_eq!(number("h:mm AM/PM", serial), "12:30 PM");
        assert_eq!(number("hh:mm", 0.5), "12:00");
        assert_eq!(number("mm:ss.0", 1.5 / SECONDS_PER_DAY), "00:01.5");
    }

    #[test]
    fn test_elapsed_time() {
        let value = 1.0 + 1.0 / 24.0 + 90.0 / SECONDS_PER_DAY;
        assert_eq!(number("[h]:mm:ss", value), "25:01:30");
        assert_eq!(number("[mm]:ss", 0.5 / 24.0), "30:00");
    }

    #[test]
    fn test_minutes_are_told_apart_from_months() {
        let tokens = resolve_minutes(tokenize("mm/dd hh:mm"));
        assert_eq!(tokens[0], Token::Month(2));
        assert_eq!(tokens[6], Token::Minute(2));
        assert_eq!(resolve_minutes(tokenize("mm:ss"))[0], Token::Minute(2));
    }
}
