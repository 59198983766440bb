//! Certificate status collaborator.
//!
//! The engine never decodes OCSP responses itself. It hands the stapled
//! bytes to a [`CertificateStatusSource`] and records the opaque result.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use time::OffsetDateTime;

/// OCSP CertStatus outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcspStatus {
    Good,
    Revoked,
    Unknown,
}

/// Status of the peer certificate as reported by the collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateStatus {
    pub status: OcspStatus,
    pub this_update: Option<OffsetDateTime>,
    pub next_update: Option<OffsetDateTime>,
    pub revocation_time: Option<OffsetDateTime>,
}

impl CertificateStatus {
    pub fn new(status: OcspStatus) -> Self {
        CertificateStatus {
            status,
            this_update: None,
            next_update: None,
            revocation_time: None,
        }
    }

    pub fn unknown() -> Self {
        Self::new(OcspStatus::Unknown)
    }
}

impl fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmt_time = |t: &Option<OffsetDateTime>| match t {
            Some(t) => t
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| t.unix_timestamp().to_string()),
            None => "-".to_string(),
        };
        write!(
            f,
            "{:?} (this update {}, next update {}, revoked {})",
            self.status,
            fmt_time(&self.this_update),
            fmt_time(&self.next_update),
            fmt_time(&self.revocation_time)
        )
    }
}

/// Turns a stapled OCSP response into a status.
pub trait CertificateStatusSource: Send + Sync {
    fn lookup(&self, response: &[u8]) -> CertificateStatus;
}

type Loader = Box<dyn Fn() -> Vec<(Vec<u8>, CertificateStatus)> + Send + Sync>;

/// Table backed status source.
///
/// The table is produced by `loader` on first lookup and then memoized, so
/// any expensive one-time setup (loading responder data, initialising a
/// decoder) happens at most once per source and only if it is used.
pub struct StaticStatusSource {
    loader: Loader,
    table: OnceCell<HashMap<Vec<u8>, CertificateStatus>>,
}

impl StaticStatusSource {
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> Vec<(Vec<u8>, CertificateStatus)> + Send + Sync + 'static,
    {
        StaticStatusSource {
            loader: Box::new(loader),
            table: OnceCell::new(),
        }
    }

    pub fn into_shared(self) -> Arc<dyn CertificateStatusSource> {
        Arc::new(self)
    }
}

impl CertificateStatusSource for StaticStatusSource {
    fn lookup(&self, response: &[u8]) -> CertificateStatus {
        let table = self.table.get_or_init(|| {
            debug!("Initialising certificate status table");
            (self.loader)().into_iter().collect()
        });
        table
            .get(response)
            .cloned()
            .unwrap_or_else(CertificateStatus::unknown)
    }
}

impl fmt::Debug for StaticStatusSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticStatusSource")
            .field("initialised", &self.table.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn setup_runs_once_and_lazily() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let source = StaticStatusSource::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            vec![(b"good".to_vec(), CertificateStatus::new(OcspStatus::Good))]
        });

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(source.lookup(b"good").status, OcspStatus::Good);
        assert_eq!(source.lookup(b"other").status, OcspStatus::Unknown);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn display_includes_times() {
        let mut status = CertificateStatus::new(OcspStatus::Revoked);
        status.revocation_time = Some(OffsetDateTime::UNIX_EPOCH);
        let text = status.to_string();
        assert!(text.starts_with("Revoked"));
        assert!(text.contains("1970-01-01T00:00:00Z"));
    }
}
