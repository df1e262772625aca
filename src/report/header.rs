use crate::xml;
use chrono::{DateTime, Utc};
use std::ffi::{CStr, CString};

/// Identifying fields at the top of every report. Captured on first render
/// and reused so repeated renders are byte-identical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportHeader {
    pub gmt: DateTime<Utc>,
    pub hostname: String,
    pub name: String,
    pub version: String,
    pub working_dir: String,
    pub reporter_path: String,
}

impl ReportHeader {
    pub fn fragments(&self) -> Vec<String> {
        vec![
            xml::leaf("gmt", &iso8601(&self.gmt)),
            xml::leaf("hostname", &self.hostname),
            xml::leaf("name", &self.name),
            xml::leaf("version", &self.version),
            xml::leaf("workingDir", &self.working_dir),
            xml::leaf("reporterPath", &self.reporter_path),
        ]
    }
}

/// `YYYY-MM-DDThh:mm:ssZ`
pub fn iso8601(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// The host name, expanded to a fully-qualified name when the short name
/// has no domain part and the resolver knows one.
pub fn local_hostname() -> String {
    let short = short_hostname().unwrap_or_else(|| "localhost".to_string());
    if short.contains('.') {
        return short;
    }
    canonical_name(&short).unwrap_or(short)
}

fn short_hostname() -> Option<String> {
    let mut buf = [0u8; 256];
    // SAFETY: the buffer outlives the call and its length is passed along.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) };
    if rc != 0 {
        return None;
    }
    let end = buf.iter().position(|b| *b == 0).unwrap_or(buf.len());
    String::from_utf8(buf[..end].to_vec())
        .ok()
        .filter(|name| !name.is_empty())
}

fn canonical_name(host: &str) -> Option<String> {
    let node = CString::new(host).ok()?;
    // SAFETY: addrinfo is plain data; all-zero is a valid "no hints" value.
    let mut hints: libc::addrinfo = unsafe { std::mem::zeroed() };
    hints.ai_flags = libc::AI_CANONNAME;
    hints.ai_family = libc::AF_UNSPEC;
    let mut result: *mut libc::addrinfo = std::ptr::null_mut();
    // SAFETY: node and hints are valid for the call; result is freed below.
    let rc = unsafe { libc::getaddrinfo(node.as_ptr(), std::ptr::null(), &hints, &mut result) };
    if rc != 0 || result.is_null() {
        return None;
    }
    // SAFETY: result came from a successful getaddrinfo and is freed once.
    let canonical = unsafe {
        let name = (*result).ai_canonname;
        let value = if name.is_null() {
            None
        } else {
            CStr::from_ptr(name).to_str().ok().map(str::to_string)
        };
        libc::freeaddrinfo(result);
        value
    };
    canonical.filter(|name| name.contains('.'))
}
