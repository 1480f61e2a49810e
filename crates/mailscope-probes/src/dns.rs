//! MX lookup over the system resolver.

use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::TokioAsyncResolver;
use tracing::{debug, instrument};

use mailscope_core::model::{MxRecord, MxReport, MxWarning};
use mailscope_core::{MxLookup, ProbeError, ProbeResult};

/// [`MxLookup`] backed by `hickory-resolver`.
///
/// A resolver is built per call so that the caller's timeout becomes the
/// resolver's own query timeout.
#[derive(Debug, Clone)]
pub struct HickoryMxLookup {
    config: ResolverConfig,
    opts: ResolverOpts,
}

impl Default for HickoryMxLookup {
    fn default() -> Self {
        Self::from_system()
    }
}

impl HickoryMxLookup {
    /// Use `/etc/resolv.conf` (or the platform equivalent), falling back to
    /// the resolver's built-in upstreams when it cannot be read.
    pub fn from_system() -> Self {
        let (config, opts) = hickory_resolver::system_conf::read_system_conf()
            .unwrap_or_else(|_| (ResolverConfig::default(), ResolverOpts::default()));
        Self { config, opts }
    }

    pub fn with_config(config: ResolverConfig) -> Self {
        Self {
            config,
            opts: ResolverOpts::default(),
        }
    }

    fn resolver(&self, timeout: Duration) -> TokioAsyncResolver {
        let mut opts = self.opts.clone();
        opts.timeout = timeout;
        opts.attempts = 1;
        TokioAsyncResolver::tokio(self.config.clone(), opts)
    }
}

#[async_trait]
impl MxLookup for HickoryMxLookup {
    #[instrument(skip(self), fields(probe = "mx"))]
    async fn lookup_mx(&self, domain: &str, timeout: Duration) -> ProbeResult<MxReport> {
        let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();
        if domain.is_empty() {
            return Err(ProbeError::InvalidInput("empty domain".to_string()));
        }

        // Finish before the wave deadline so a slow resolver surfaces as a warning.
        let budget = timeout.mul_f32(0.9);
        let resolver = self.resolver(budget);
        let query = format!("{domain}.");

        let lookup = match tokio::time::timeout(budget, resolver.mx_lookup(query)).await {
            Ok(Ok(lookup)) => lookup,
            Ok(Err(err)) => return degrade(&domain, &err),
            Err(_) => return Ok(MxReport::degraded(domain, MxWarning::Timeout)),
        };

        let records: Vec<MxRecord> = lookup
            .iter()
            .map(|mx| MxRecord::new(mx.preference(), mx.exchange().to_utf8()))
            .collect();
        debug!(records = records.len(), "mx lookup answered");
        Ok(MxReport::from_records(domain, records))
    }
}

/// Soft resolver outcomes become warnings; everything else is a failure.
fn degrade(domain: &str, err: &ResolveError) -> ProbeResult<MxReport> {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => {
            Ok(MxReport::degraded(domain, warning_for(*response_code)))
        }
        ResolveErrorKind::Timeout => Ok(MxReport::degraded(domain, MxWarning::Timeout)),
        _ => Err(ProbeError::Dns(err.to_string())),
    }
}

fn warning_for(code: ResponseCode) -> MxWarning {
    if code == ResponseCode::NXDomain {
        MxWarning::NxDomain
    } else {
        MxWarning::NoRecords
    }
}
