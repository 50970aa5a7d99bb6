use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;

use futures::FutureExt;
use futures::future::{LocalBoxFuture, Shared};

pub type AssetLoad<E> = Shared<LocalBoxFuture<'static, Result<(), E>>>;

/// Process-wide cache of asset loads keyed by URL.
///
/// The first caller for a URL starts the load; every later caller, including
/// ones that arrive while it is still in flight, awaits the same future.
/// Finished results stay cached, failures included.
pub struct LoadCache<E: Clone + 'static> {
    loads: RefCell<HashMap<String, AssetLoad<E>>>,
}

impl<E: Clone + 'static> Default for LoadCache<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone + 'static> LoadCache<E> {
    pub fn new() -> Self {
        Self {
            loads: RefCell::new(HashMap::new()),
        }
    }

    pub fn load<F, Fut>(&self, url: &str, start: F) -> AssetLoad<E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), E>> + 'static,
    {
        if let Some(existing) = self.loads.borrow().get(url) {
            return existing.clone();
        }
        let load = start().boxed_local().shared();
        self.loads
            .borrow_mut()
            .insert(url.to_string(), load.clone());
        load
    }

    pub fn contains(&self, url: &str) -> bool {
        self.loads.borrow().contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.loads.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.loads.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use futures::channel::oneshot;
    use futures::executor::block_on;

    use super::*;

    #[test]
    fn concurrent_loads_share_one_start() {
        let cache: LoadCache<String> = LoadCache::new();
        let starts = Cell::new(0);
        let (done, finished) = oneshot::channel::<()>();
        let mut finished = Some(finished);

        let mut start = || {
            starts.set(starts.get() + 1);
            let finished = finished.take().expect("started once");
            async move { finished.await.map_err(|_| "aborted".to_string()) }
        };

        let first = cache.load("https://cdn.example/leaflet.js", &mut start);
        let second = cache.load("https://cdn.example/leaflet.js", &mut start);
        assert_eq!(starts.get(), 1);
        assert!(first.clone().now_or_never().is_none());

        done.send(()).expect("receiver alive");
        assert_eq!(block_on(first), Ok(()));
        assert_eq!(block_on(second), Ok(()));
    }

    #[test]
    fn distinct_urls_load_independently() {
        let cache: LoadCache<String> = LoadCache::new();
        let a = cache.load("a.js", || async { Ok(()) });
        let b = cache.load("b.css", || async { Err("404".to_string()) });

        assert_eq!(cache.len(), 2);
        assert_eq!(block_on(a), Ok(()));
        assert_eq!(block_on(b), Err("404".to_string()));
    }

    #[test]
    fn failures_stay_cached() {
        let cache: LoadCache<String> = LoadCache::new();
        let starts = Cell::new(0);
        for _ in 0..3 {
            let load = cache.load("broken.js", || {
                starts.set(starts.get() + 1);
                async { Err("blocked".to_string()) }
            });
            assert_eq!(block_on(load), Err("blocked".to_string()));
        }
        assert_eq!(starts.get(), 1);
        assert!(cache.contains("broken.js"));
    }
}
