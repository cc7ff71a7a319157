//! Async entry points for distributed-cache callers. Spec.md §5: "cache
//! async entry points perform no real I/O and return completed futures";
//! cancellation is checked before work begins and, for bulk operations,
//! after each step.

use std::future::{ready, Ready};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::engine::Cache;
use super::entry::SetOptions;
use super::Error;

/// A cooperative cancellation flag; cache async entry points check it
/// before starting work (and, for bulk ops, between steps) rather than
/// polling any I/O.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), Error> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

pub fn get(cache: &Cache, key: &str, token: &CancellationToken) -> Ready<Result<Option<Vec<u8>>, Error>> {
    let result = token.check().and_then(|_| cache.get(key));
    ready(result)
}

pub fn set(
    cache: &Cache,
    key: &str,
    value: &[u8],
    opts: SetOptions,
    token: &CancellationToken,
) -> Ready<Result<(), Error>> {
    let result = token.check().and_then(|_| cache.set(key, value, opts));
    ready(result)
}

pub fn remove(cache: &Cache, key: &str, token: &CancellationToken) -> Ready<Result<bool, Error>> {
    let result = token.check().map(|_| cache.remove(key));
    ready(result)
}

/// Bulk get: cancellation is re-checked between keys so a mid-bulk
/// cancellation leaves completed sub-operations in place.
pub fn get_many(
    cache: &Cache,
    keys: &[&str],
    token: &CancellationToken,
) -> Ready<Result<Vec<Option<Vec<u8>>>, Error>> {
    let result = (|| {
        token.check()?;
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            token.check()?;
            out.push(cache.get(key)?);
        }
        Ok(out)
    })();
    ready(result)
}

pub fn set_many(
    cache: &Cache,
    entries: &[(&str, &[u8], SetOptions)],
    token: &CancellationToken,
) -> Ready<Result<(), Error>> {
    let result = (|| {
        token.check()?;
        for (key, value, opts) in entries {
            token.check()?;
            cache.set(key, value, opts.clone())?;
        }
        Ok(())
    })();
    ready(result)
}

pub fn remove_many(
    cache: &Cache,
    keys: &[&str],
    token: &CancellationToken,
) -> Ready<Result<usize, Error>> {
    let result = (|| {
        token.check()?;
        let mut removed = 0;
        for key in keys {
            token.check()?;
            if cache.remove(key) {
                removed += 1;
            }
        }
        Ok(removed)
    })();
    ready(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::engine::CacheConfig;
    use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

    fn noop_waker() -> Waker {
        fn clone(_: *const ()) -> RawWaker {
            raw()
        }
        fn noop(_: *const ()) {}
        fn raw() -> RawWaker {
            static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
            RawWaker::new(std::ptr::null(), &VTABLE)
        }
        unsafe { Waker::from_raw(raw()) }
    }

    fn block_on<F: std::future::Future>(mut fut: F) -> F::Output {
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        // Ready<T> always completes on the first poll.
        match unsafe { std::pin::Pin::new_unchecked(&mut fut) }.poll(&mut cx) {
            Poll::Ready(v) => v,
            Poll::Pending => panic!("cache futures must complete immediately"),
        }
    }

    #[test]
    fn async_set_then_get_round_trips() {
        let cache = Cache::new(CacheConfig::default());
        let token = CancellationToken::new();
        block_on(set(&cache, "k", b"v", SetOptions::default(), &token)).unwrap();
        let got = block_on(get(&cache, "k", &token)).unwrap();
        assert_eq!(got, Some(b"v".to_vec()));
    }

    #[test]
    fn cancellation_is_checked_before_work_begins() {
        let cache = Cache::new(CacheConfig::default());
        let token = CancellationToken::new();
        token.cancel();
        let err = block_on(set(&cache, "k", b"v", SetOptions::default(), &token)).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(cache.count(), 0);
    }

    #[test]
    fn bulk_cancellation_mid_stream_leaves_completed_work_in_place() {
        let cache = Cache::new(CacheConfig::default());
        let token = CancellationToken::new();
        let entries: Vec<(&str, &[u8], SetOptions)> = vec![
            ("a", b"1", SetOptions::default()),
            ("b", b"2", SetOptions::default()),
        ];
        block_on(set_many(&cache, &entries, &token)).unwrap();
        token.cancel();
        let keys = ["a", "b", "c"];
        let err = block_on(get_many(&cache, &keys, &token)).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        // Earlier synchronous set_many still fully applied.
        assert_eq!(cache.count(), 2);
    }
}
