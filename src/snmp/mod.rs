//! Session and protocol engine.
//!
//! A [`Session`] binds a [`Transport`] to protocol policy: version, bulk page
//! size, exception handling (`none` mode), loose enum decoding, and the
//! optional response cache. Every operation is one PDU round trip; walks are
//! finite sequences of round trips exposed as [`futures_core::Stream`]s.
//!
//! # Clone Semantics
//!
//! `Session` is cheaply cloneable (`Arc` internally). Walk streams own a clone
//! of the session, so multiple walks can run concurrently.

pub mod cache;
pub mod pdu;
pub mod transport;

pub use cache::ResponseCache;
pub use pdu::{Pdu, PduKind, PduResponse, VarBind, Version};
pub use transport::Transport;

#[cfg(any(test, feature = "testing"))]
pub use transport::MockTransport;

use std::future::poll_fn;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_core::Stream;

use crate::error::{DecodeErrorKind, Error, ErrorStatus, Result};
use crate::oid::Oid;
use crate::wire::WireValue;

/// Default GETBULK page size, matching common manager practice.
pub const DEFAULT_MAX_REPETITIONS: u32 = 40;

/// Protocol policy for a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Protocol version. GETBULK requires v2c or v3.
    pub version: Version,
    /// GETBULK page size for walks; `None` disables bulk and falls back to
    /// GETNEXT.
    pub bulk: Option<u32>,
    /// Replace exception varbinds with an absent value instead of erroring.
    pub none_values: bool,
    /// Surface unmapped enumeration integers instead of erroring on decode.
    pub loose: bool,
    /// Response cache TTL; `None` disables caching.
    pub cache_ttl: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            version: Version::V2c,
            bulk: Some(DEFAULT_MAX_REPETITIONS),
            none_values: false,
            loose: false,
            cache_ttl: None,
        }
    }
}

struct SessionInner<T> {
    transport: T,
    config: SessionConfig,
    cache: Option<ResponseCache>,
}

/// An SNMP manager session over a [`Transport`].
pub struct Session<T: Transport> {
    inner: Arc<SessionInner<T>>,
}

impl<T: Transport> Clone for Session<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl<T: Transport + 'static> Session<T> {
    pub fn new(transport: T, config: SessionConfig) -> Self {
        let cache = config.cache_ttl.map(ResponseCache::new);
        Self {
            inner: Arc::new(SessionInner {
                transport,
                config,
                cache,
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn version(&self) -> Version {
        self.inner.config.version
    }

    /// Whether unmapped enumeration integers decode leniently.
    pub fn loose(&self) -> bool {
        self.inner.config.loose
    }

    /// GET on instance OIDs.
    ///
    /// Returns one entry per requested OID, in request order. With `none`
    /// mode enabled, exception varbinds become `None`; otherwise they are
    /// [`Error::Exception`].
    #[tracing::instrument(level = "debug", target = "typed_snmp::session", skip_all, fields(snmp.op = "get", snmp.oids = oids.len()))]
    pub async fn get(&self, oids: &[Oid]) -> Result<Vec<(Oid, Option<WireValue>)>> {
        if let Some(cached) = self.cached_get(oids) {
            tracing::trace!(target: "typed_snmp::session", "cache hit");
            return cached
                .into_iter()
                .map(|(oid, value)| self.screen(oid, value))
                .collect();
        }

        let varbinds = self.get_raw(oids).await?;
        if let Some(cache) = &self.inner.cache {
            for vb in &varbinds {
                cache.put_get(vb.oid.clone(), vb.value.clone());
            }
        }
        varbinds
            .into_iter()
            .map(|vb| self.screen(vb.oid, vb.value))
            .collect()
    }

    /// GET returning raw varbinds, exceptions included.
    ///
    /// Bypasses both the cache and `none` mode. Used for probes that need to
    /// distinguish the exception kinds.
    pub async fn get_raw(&self, oids: &[Oid]) -> Result<Vec<VarBind>> {
        let request = Pdu::get(oids.iter().cloned());
        let response = self.round_trip(request).await?;
        if response.varbinds.is_empty() {
            return Err(Error::decode(DecodeErrorKind::EmptyResponse));
        }
        Ok(response.varbinds)
    }

    /// GETNEXT on a single OID. The returned varbind may carry
    /// `EndOfMibView`; walk streams treat that as termination.
    #[tracing::instrument(level = "trace", target = "typed_snmp::session", skip(self), fields(snmp.op = "getnext", snmp.oid = %oid))]
    pub async fn get_next(&self, oid: &Oid) -> Result<VarBind> {
        let request = Pdu::get_next([oid.clone()]);
        let mut response = self.round_trip(request).await?;
        if response.varbinds.is_empty() {
            return Err(Error::decode(DecodeErrorKind::EmptyResponse));
        }
        Ok(response.varbinds.remove(0))
    }

    /// GETBULK round trip. v2c/v3 only.
    #[tracing::instrument(level = "trace", target = "typed_snmp::session", skip(self, oids), fields(snmp.op = "getbulk", snmp.max_repetitions = max_repetitions))]
    pub async fn get_bulk(
        &self,
        oids: &[Oid],
        non_repeaters: u32,
        max_repetitions: u32,
    ) -> Result<Vec<VarBind>> {
        if self.inner.config.version == Version::V1 {
            return Err(Error::Unsupported {
                operation: "GETBULK",
                version: Version::V1,
            });
        }
        let request = Pdu::get_bulk(oids.iter().cloned(), non_repeaters, max_repetitions);
        let response = self.round_trip(request).await?;
        Ok(response.varbinds)
    }

    /// SET with an ordered sequence of bindings in one PDU.
    ///
    /// Invalidates cache entries for the written instances and any cached
    /// walk covering them.
    #[tracing::instrument(level = "debug", target = "typed_snmp::session", skip_all, fields(snmp.op = "set", snmp.oids = bindings.len()))]
    pub async fn set(&self, bindings: Vec<(Oid, WireValue)>) -> Result<Vec<VarBind>> {
        let request = Pdu::set(bindings);
        let response = self.round_trip(request).await?;
        if let Some(cache) = &self.inner.cache {
            for vb in &response.varbinds {
                cache.invalidate(&vb.oid);
            }
        }
        Ok(response.varbinds)
    }

    /// GETNEXT walk over a subtree.
    pub fn walk(&self, base: &Oid) -> Walk<T> {
        Walk::new(self.clone(), base.clone())
    }

    /// GETBULK walk over a subtree with the given page size.
    pub fn bulk_walk(&self, base: &Oid, max_repetitions: u32) -> BulkWalk<T> {
        BulkWalk::new(self.clone(), base.clone(), max_repetitions)
    }

    /// Walk a subtree to completion, consulting and feeding the cache.
    ///
    /// Chooses GETBULK or GETNEXT per the configured bulk setting. Results
    /// are raw wire values in retrieval order.
    #[tracing::instrument(level = "debug", target = "typed_snmp::session", skip(self), fields(snmp.op = "walk", snmp.base = %base))]
    pub async fn walk_collect(&self, base: &Oid) -> Result<Vec<(Oid, WireValue)>> {
        if let Some(cache) = &self.inner.cache
            && let Some(hit) = cache.walk(base)
        {
            tracing::trace!(target: "typed_snmp::session", "walk cache hit");
            return Ok(hit);
        }

        // v1 has no GETBULK; a configured page size falls back to GETNEXT.
        let bulk = match self.inner.config.version {
            Version::V1 => None,
            _ => self.inner.config.bulk,
        };
        let results = match bulk {
            Some(max_repetitions) => {
                let mut stream = self.bulk_walk(base, max_repetitions);
                drain_walk(&mut stream).await?
            }
            None => {
                let mut stream = self.walk(base);
                drain_walk(&mut stream).await?
            }
        };

        if let Some(cache) = &self.inner.cache {
            cache.put_walk(base.clone(), results.clone());
        }
        Ok(results)
    }

    /// Map an exception varbind per the session's `none` policy.
    fn screen(&self, oid: Oid, value: WireValue) -> Result<(Oid, Option<WireValue>)> {
        match value.exception_kind() {
            Some(_) if self.inner.config.none_values => Ok((oid, None)),
            Some(kind) => Err(Error::Exception { oid, kind }),
            None => Ok((oid, Some(value))),
        }
    }

    /// All-or-nothing cache lookup for a GET batch.
    fn cached_get(&self, oids: &[Oid]) -> Option<Vec<(Oid, WireValue)>> {
        let cache = self.inner.cache.as_ref()?;
        oids.iter()
            .map(|oid| cache.get(oid).map(|value| (oid.clone(), value)))
            .collect()
    }

    async fn round_trip(&self, request: Pdu) -> Result<PduResponse> {
        let response = self.inner.transport.call(request.clone()).await?;
        check_status(&request, &response)?;
        Ok(response)
    }
}

/// Map a nonzero error-status to [`Error::Agent`], attributing the failing
/// varbind's OID through the 1-based error-index.
fn check_status(request: &Pdu, response: &PduResponse) -> Result<()> {
    let status = response.status();
    if status == ErrorStatus::NoError {
        return Ok(());
    }
    let index = response.error_index;
    let oid = index
        .checked_sub(1)
        .and_then(|i| request.varbinds.get(i as usize))
        .map(|vb| vb.oid.clone());
    tracing::debug!(
        target: "typed_snmp::session",
        %status,
        index,
        "agent returned error status"
    );
    Err(Error::Agent { status, index, oid })
}

async fn drain_walk<S>(stream: &mut S) -> Result<Vec<(Oid, WireValue)>>
where
    S: Stream<Item = Result<VarBind>> + Unpin,
{
    let mut results = Vec::new();
    loop {
        let item = poll_fn(|cx| Pin::new(&mut *stream).poll_next(cx)).await;
        match item {
            Some(Ok(vb)) => results.push((vb.oid, vb.value)),
            Some(Err(e)) => return Err(e),
            None => return Ok(results),
        }
    }
}

/// Async stream for walking an OID subtree using GETNEXT.
///
/// Created by [`Session::walk()`].
pub struct Walk<T: Transport> {
    session: Session<T>,
    base_oid: Oid,
    current_oid: Oid,
    /// Last OID returned to the caller. A non-increasing successor means
    /// agent misbehavior; the walk terminates rather than loop forever.
    last_returned_oid: Option<Oid>,
    done: bool,
    pending: Option<Pin<Box<dyn std::future::Future<Output = Result<VarBind>> + Send>>>,
}

impl<T: Transport + 'static> Walk<T> {
    fn new(session: Session<T>, base: Oid) -> Self {
        Self {
            session,
            current_oid: base.clone(),
            base_oid: base,
            last_returned_oid: None,
            done: false,
            pending: None,
        }
    }
}

impl<T: Transport + 'static> Stream for Walk<T> {
    type Item = Result<VarBind>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if self.done {
                return Poll::Ready(None);
            }

            if self.pending.is_none() {
                let session = self.session.clone();
                let oid = self.current_oid.clone();
                let fut = Box::pin(async move { session.get_next(&oid).await });
                self.pending = Some(fut);
            }

            let Some(pending) = self.pending.as_mut() else {
                return Poll::Ready(None);
            };
            match pending.as_mut().poll(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(result) => {
                    self.pending = None;

                    match result {
                        Ok(vb) => {
                            if matches!(vb.value, WireValue::EndOfMibView) {
                                self.done = true;
                                return Poll::Ready(None);
                            }

                            if !vb.oid.starts_with(&self.base_oid) {
                                self.done = true;
                                return Poll::Ready(None);
                            }

                            // Non-increasing OID: stop quietly instead of
                            // looping on a misbehaving agent.
                            if let Some(last_oid) = self.last_returned_oid.take()
                                && vb.oid <= last_oid
                            {
                                self.done = true;
                                return Poll::Ready(None);
                            }

                            self.current_oid = vb.oid.clone();
                            self.last_returned_oid = Some(vb.oid.clone());
                            return Poll::Ready(Some(Ok(vb)));
                        }
                        // v1 signals end-of-mib with noSuchName instead of an
                        // exception varbind.
                        Err(e)
                            if e.is_status(ErrorStatus::NoSuchName)
                                && self.session.version() == Version::V1 =>
                        {
                            self.done = true;
                            return Poll::Ready(None);
                        }
                        Err(e) => {
                            self.done = true;
                            return Poll::Ready(Some(Err(e)));
                        }
                    }
                }
            }
        }
    }
}

/// Async stream for walking an OID subtree using GETBULK.
///
/// Created by [`Session::bulk_walk()`]. On a tooBig response the page size is
/// halved and the request retried; it never grows back for the remainder of
/// the walk.
pub struct BulkWalk<T: Transport> {
    session: Session<T>,
    base_oid: Oid,
    current_oid: Oid,
    max_repetitions: u32,
    last_returned_oid: Option<Oid>,
    done: bool,
    /// Buffered results from the last GETBULK response.
    buffer: Vec<VarBind>,
    buffer_idx: usize,
    pending: Option<Pin<Box<dyn std::future::Future<Output = Result<Vec<VarBind>>> + Send>>>,
}

impl<T: Transport + 'static> BulkWalk<T> {
    fn new(session: Session<T>, base: Oid, max_repetitions: u32) -> Self {
        Self {
            session,
            current_oid: base.clone(),
            base_oid: base,
            max_repetitions: max_repetitions.max(1),
            last_returned_oid: None,
            done: false,
            buffer: Vec::new(),
            buffer_idx: 0,
            pending: None,
        }
    }
}

impl<T: Transport + 'static> Stream for BulkWalk<T> {
    type Item = Result<VarBind>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if self.done {
                return Poll::Ready(None);
            }

            // Drain the buffer before fetching the next page.
            if self.buffer_idx < self.buffer.len() {
                let vb = self.buffer[self.buffer_idx].clone();
                self.buffer_idx += 1;

                if matches!(vb.value, WireValue::EndOfMibView) {
                    self.done = true;
                    return Poll::Ready(None);
                }

                if !vb.oid.starts_with(&self.base_oid) {
                    self.done = true;
                    return Poll::Ready(None);
                }

                if let Some(last_oid) = self.last_returned_oid.take()
                    && vb.oid <= last_oid
                {
                    self.done = true;
                    return Poll::Ready(None);
                }

                self.current_oid = vb.oid.clone();
                self.last_returned_oid = Some(vb.oid.clone());
                return Poll::Ready(Some(Ok(vb)));
            }

            if self.pending.is_none() {
                let session = self.session.clone();
                let oid = self.current_oid.clone();
                let max_rep = self.max_repetitions;

                let fut = Box::pin(async move { session.get_bulk(&[oid], 0, max_rep).await });
                self.pending = Some(fut);
            }

            let Some(pending) = self.pending.as_mut() else {
                return Poll::Ready(None);
            };
            match pending.as_mut().poll(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(result) => {
                    self.pending = None;

                    match result {
                        Ok(varbinds) => {
                            if varbinds.is_empty() {
                                self.done = true;
                                return Poll::Ready(None);
                            }

                            self.buffer = varbinds;
                            self.buffer_idx = 0;
                        }
                        Err(e) if e.is_status(ErrorStatus::TooBig) && self.max_repetitions > 1 => {
                            // Halve the page and retry from the same OID.
                            self.max_repetitions /= 2;
                            tracing::debug!(
                                target: "typed_snmp::session",
                                max_repetitions = self.max_repetitions,
                                "tooBig response, halving bulk page size"
                            );
                        }
                        Err(e) => {
                            self.done = true;
                            return Poll::Ready(Some(Err(e)));
                        }
                    }
                }
            }
        }
    }
}
