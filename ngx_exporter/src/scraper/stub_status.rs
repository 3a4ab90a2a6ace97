//! nginx `stub_status` report parser
//!
//! The report produced by `ngx_http_stub_status_module` is a fixed four line
//! layout:
//!
//! ```text
//! Active connections: 2
//! server accepts handled requests
//!  8522429 8522429 8641727
//! Reading: 0 Writing: 1 Waiting: 3
//! ```
//!
//! The parser reads it front to back without backtracking, emitting each
//! measurement as soon as it is known.

use std::{
    io::{self, BufRead},
    num::ParseIntError,
};

use crate::measurement::{Labels, Measurement};

#[derive(thiserror::Error, Debug)]
/// Errors produced by [`scrape`]
pub enum Error {
    /// The report ended early or a delimiter was missing.
    #[error("incorrect nginx stats")]
    MalformedReport,
    /// A line did not carry the expected number of fields.
    #[error("unable to parse server {line} stats: expected {expected} fields, found {found}")]
    FieldCountMismatch {
        /// Which line failed.
        line: &'static str,
        /// Number of fields expected.
        expected: usize,
        /// Number of fields found.
        found: usize,
    },
    /// A field was not an unsigned integer.
    #[error(transparent)]
    ParseInt(#[from] ParseIntError),
    /// A counter carried an explicit sign.
    #[error("invalid counter '{0}': sign not permitted")]
    SignedCounter(String),
    /// Reading the report body failed.
    #[error("failed to read nginx stats: {0}")]
    Io(#[from] io::Error),
}

/// Parse an unsigned decimal counter. Unlike [`str::parse`], a leading `+`
/// is rejected.
fn parse_counter(field: &str) -> Result<u64, Error> {
    if field.starts_with('+') {
        return Err(Error::SignedCounter(field.to_string()));
    }
    Ok(field.parse()?)
}

const ACCEPTS_HANDLED_REQUESTS: [&str; 3] = ["accepts", "handled", "requests"];
// (field position, name) on the `Reading: 0 Writing: 1 Waiting: 3` line
const READING_WRITING_WAITING: [(usize, &str); 3] =
    [(1, "reading"), (3, "writing"), (5, "waiting")];

/// Parse one `stub_status` report from `reader`.
///
/// Every measurement carries `labels` unchanged. Measurements are pushed to
/// `out` as they are parsed, so on error `out` retains whatever was emitted
/// before the failure.
///
/// # Errors
///
/// Returns [`Error::MalformedReport`] if the report is truncated before the
/// last line, [`Error::FieldCountMismatch`] if a counter line has the wrong
/// shape, and [`Error::ParseInt`] or [`Error::SignedCounter`] if a counter is
/// not an unsigned integer.
pub fn scrape<R>(reader: R, labels: &Labels, out: &mut Vec<Measurement>) -> Result<(), Error>
where
    R: BufRead,
{
    let mut scanner = Scanner { reader };
    active_connections(&mut scanner, labels, out)?;
    accepts_handled_requests(&mut scanner, labels, out)?;
    reading_writing_waiting(&mut scanner, labels, out)
}

struct Scanner<R> {
    reader: R,
}

impl<R: BufRead> Scanner<R> {
    /// Read up to and including `delim`. Hitting end of stream first is a
    /// malformed report unless `eof_ok`.
    fn read_until(&mut self, delim: u8, eof_ok: bool) -> Result<String, Error> {
        let mut buf = Vec::new();
        self.reader.read_until(delim, &mut buf)?;
        if buf.last() != Some(&delim) && !eof_ok {
            return Err(Error::MalformedReport);
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

fn active_connections<R: BufRead>(
    scanner: &mut Scanner<R>,
    labels: &Labels,
    out: &mut Vec<Measurement>,
) -> Result<(), Error> {
    scanner.read_until(b':', false)?;
    let line = scanner.read_until(b'\n', false)?;
    let active = parse_counter(line.trim())?;
    out.push(Measurement::new("active", active, labels));
    Ok(())
}

fn accepts_handled_requests<R: BufRead>(
    scanner: &mut Scanner<R>,
    labels: &Labels,
    out: &mut Vec<Measurement>,
) -> Result<(), Error> {
    // column header, content is not checked
    scanner.read_until(b'\n', false)?;

    let line = scanner.read_until(b'\n', false)?;
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != ACCEPTS_HANDLED_REQUESTS.len() {
        return Err(Error::FieldCountMismatch {
            line: "accepts, handled, requests",
            expected: ACCEPTS_HANDLED_REQUESTS.len(),
            found: fields.len(),
        });
    }

    for (field, name) in fields.iter().zip(ACCEPTS_HANDLED_REQUESTS) {
        let value = parse_counter(field)?;
        out.push(Measurement::new(name, value, labels));
    }
    Ok(())
}

fn reading_writing_waiting<R: BufRead>(
    scanner: &mut Scanner<R>,
    labels: &Labels,
    out: &mut Vec<Measurement>,
) -> Result<(), Error> {
    let line = scanner.read_until(b'\n', true)?;
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 6 {
        return Err(Error::FieldCountMismatch {
            line: "reading, writing, waiting",
            expected: 6,
            found: fields.len(),
        });
    }

    for (idx, name) in READING_WRITING_WAITING {
        let value = parse_counter(fields[idx])?;
        out.push(Measurement::new(name, value, labels));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::RawValue;

    const VALID: &str = "Active connections: 2\n\
                         server accepts handled requests\n\
                         8522429 8522429 8641727\n\
                         Reading: 0 Writing: 1 Waiting: 3";

    fn labels() -> Labels {
        let mut labels = Labels::new();
        labels.insert("server".to_string(), "localhost".to_string());
        labels.insert("port".to_string(), "8080".to_string());
        labels
    }

    fn run(body: &str) -> (Result<(), Error>, Vec<Measurement>) {
        let mut out = Vec::new();
        let res = scrape(body.as_bytes(), &labels(), &mut out);
        (res, out)
    }

    #[test]
    fn valid_report() {
        let (res, out) = run(VALID);
        assert!(res.is_ok());

        let expected = [
            ("active", 2),
            ("accepts", 8_522_429),
            ("handled", 8_522_429),
            ("requests", 8_641_727),
            ("reading", 0),
            ("writing", 1),
            ("waiting", 3),
        ];
        assert_eq!(out.len(), expected.len());
        for (m, (name, value)) in out.iter().zip(expected) {
            assert_eq!(m.name, name);
            assert_eq!(m.value, RawValue::U64(value));
            assert_eq!(m.labels, labels());
        }
    }

    #[test]
    fn trailing_newline_accepted() {
        let body = format!("{VALID}\n");
        let (res, out) = run(&body);
        assert!(res.is_ok());
        assert_eq!(out.len(), 7);
    }

    #[test]
    fn missing_colon_is_malformed() {
        let (res, out) = run("Active connections 2\n\
                              server accepts handled requests\n\
                              8522429 8522429 8641727\n\
                              Reading 0 Writing 1 Waiting 3");
        assert!(matches!(res, Err(Error::MalformedReport)));
        assert!(out.is_empty());
    }

    #[test]
    fn single_line_is_malformed() {
        let (res, _) = run("Active connections: 2 server accepts handled requests \
                            8522429 8522429 8641727 Reading: 0 Writing: 1 Waiting: 3");
        assert!(matches!(res, Err(Error::MalformedReport)));
    }

    #[test]
    fn active_not_a_number() {
        let (res, _) = run("Active connections: str\n\
                            server accepts handled requests\n\
                            8522429 8522429 8641727\n\
                            Reading: 0 Writing: 1 Waiting: 3");
        let err = res.expect_err("expected parse failure");
        assert!(matches!(err, Error::ParseInt(_)));
        assert_eq!(err.to_string(), "invalid digit found in string");
    }

    #[test]
    fn truncated_after_header_is_malformed() {
        let (res, out) = run("Active connections: 2\n\
                              server accepts handled requests 8522429 8522429 8641727");
        assert!(matches!(res, Err(Error::MalformedReport)));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn handled_not_a_number_keeps_accepts() {
        let (res, out) = run("Active connections: 2\n\
                              server accepts handled requests\n\
                              8522429 handled_str 8641727\n\
                              Reading: 0 Writing: 1 Waiting: 3");
        assert!(matches!(res, Err(Error::ParseInt(_))));
        let names: Vec<_> = out.iter().map(|m| m.name).collect();
        assert_eq!(names, ["active", "accepts"]);
    }

    #[test]
    fn accepts_line_wrong_field_count() {
        let (res, _) = run("Active connections: 2\n\
                            server accepts handled requests\n\
                            8522429 8522429\n\
                            Reading: 0 Writing: 1 Waiting: 3");
        assert!(matches!(
            res,
            Err(Error::FieldCountMismatch {
                expected: 3,
                found: 2,
                ..
            })
        ));
    }

    #[test]
    fn reading_line_too_short() {
        let (res, out) = run("Active connections: 2\n\
                              server accepts handled requests\n\
                              8522429 8522429 8641727\n\
                              Reading: 0 Writing: 1 Waiting:");
        assert!(matches!(
            res,
            Err(Error::FieldCountMismatch {
                expected: 6,
                found: 5,
                ..
            })
        ));
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn reading_line_labels_not_checked() {
        let (res, out) = run("Active connections: 2\n\
                              server accepts handled requests\n\
                              1 2 3\n\
                              a 4 b 5 c 6");
        assert!(res.is_ok());
        let tail: Vec<_> = out[4..].iter().map(|m| (m.name, m.value.clone())).collect();
        assert_eq!(
            tail,
            [
                ("reading", RawValue::U64(4)),
                ("writing", RawValue::U64(5)),
                ("waiting", RawValue::U64(6)),
            ]
        );
    }

    #[test]
    fn waiting_not_a_number() {
        let (res, out) = run("Active connections: 2\n\
                              server accepts handled requests\n\
                              8522429 8522429 8641727\n\
                              Reading: 0 Writing: 1 Waiting: waiting_str");
        assert!(matches!(res, Err(Error::ParseInt(_))));
        assert_eq!(out.len(), 6);
    }

    #[test]
    fn signed_counter_rejected() {
        let (res, out) = run("Active connections: 2\n\
                              server accepts handled requests\n\
                              8522429 +8522429 8641727\n\
                              Reading: 0 Writing: 1 Waiting: 3");
        let err = res.expect_err("expected sign to be rejected");
        assert!(matches!(err, Error::SignedCounter(ref f) if f == "+8522429"));
        let names: Vec<_> = out.iter().map(|m| m.name).collect();
        assert_eq!(names, ["active", "accepts"]);

        let (res, out) = run("Active connections: +2\n\
                              server accepts handled requests\n\
                              1 2 3\n\
                              Reading: 0 Writing: 1 Waiting: 3");
        assert!(matches!(res, Err(Error::SignedCounter(_))));
        assert!(out.is_empty());
    }
}
