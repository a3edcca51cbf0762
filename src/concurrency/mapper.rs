//! The bounded mapper and its scheduling loop

use super::limit::Concurrency;
use futures::stream::{FuturesUnordered, StreamExt};
use std::fmt;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Failure of a cancellable mapping run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapError<E> {
    /// A transform failed; the error is carried exactly as the transform returned it
    Failed(E),
    /// The cancellation token fired before every item completed
    Cancelled,
}

impl<E> MapError<E> {
    /// The transform error, if this run failed rather than being cancelled
    pub fn into_inner(self) -> Option<E> {
        match self {
            MapError::Failed(err) => Some(err),
            MapError::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, MapError::Cancelled)
    }
}

impl<E: fmt::Display> fmt::Display for MapError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::Failed(err) => err.fmt(f),
            MapError::Cancelled => f.write_str("mapping cancelled before all items completed"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for MapError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MapError::Failed(err) => err.source(),
            MapError::Cancelled => None,
        }
    }
}

/// Runs an async transform over a collection with a cap on in-flight work.
///
/// A mapper is cheap to build and holds no run state; every call to one of
/// the `map*` methods owns its own work stack, in-flight set and results.
#[derive(Debug, Clone, Default)]
pub struct BoundedMapper {
    concurrency: Concurrency,
    cancel: Option<CancellationToken>,
}

impl BoundedMapper {
    pub fn new(concurrency: Concurrency) -> Self {
        Self {
            concurrency,
            cancel: None,
        }
    }

    /// Attach a token observed by [`BoundedMapper::map_cancellable`]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn concurrency(&self) -> Concurrency {
        self.concurrency
    }

    /// Transform every item, returning the first transform error verbatim.
    ///
    /// On failure the remaining in-flight transforms are dropped without
    /// being polled again and unscheduled items are never started.
    pub async fn map<T, U, E, F, Fut>(
        &self,
        items: impl IntoIterator<Item = T>,
        transform: F,
    ) -> Result<Vec<U>, E>
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<U, E>>,
    {
        match run(items.into_iter().collect(), self.concurrency, transform, None).await {
            Ok(results) => Ok(results),
            Err(MapError::Failed(err)) => Err(err),
            Err(MapError::Cancelled) => unreachable!("a run without a token cannot be cancelled"),
        }
    }

    /// Like [`BoundedMapper::map`], but stops at the attached cancellation token.
    ///
    /// Once the token fires no further item is started and in-flight
    /// transforms are abandoned. Without a token this never reports
    /// [`MapError::Cancelled`].
    pub async fn map_cancellable<T, U, E, F, Fut>(
        &self,
        items: impl IntoIterator<Item = T>,
        transform: F,
    ) -> Result<Vec<U>, MapError<E>>
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<U, E>>,
    {
        run(
            items.into_iter().collect(),
            self.concurrency,
            transform,
            self.cancel.as_ref(),
        )
        .await
    }

    /// Transform every item on its own spawned task.
    ///
    /// Transforms can run in parallel on a multi-threaded runtime. When one
    /// fails, transforms that are already running keep going in the
    /// background and their results are discarded.
    ///
    /// # Panics
    ///
    /// A panicking transform panics the caller with the same payload. The
    /// spawned tasks are never aborted by the mapper, so the only other
    /// join failure is the runtime cancelling them while shutting down,
    /// which also panics.
    pub async fn map_detached<T, U, E, F, Fut>(
        &self,
        items: impl IntoIterator<Item = T>,
        mut transform: F,
    ) -> Result<Vec<U>, E>
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<U, E>> + Send + 'static,
        U: Send + 'static,
        E: Send + 'static,
    {
        self.map(items, |item| {
            let handle = tokio::spawn(transform(item));
            async move {
                match handle.await {
                    Ok(outcome) => outcome,
                    Err(join_err) if join_err.is_panic() => {
                        std::panic::resume_unwind(join_err.into_panic())
                    }
                    // Only reachable while the runtime shuts down
                    Err(join_err) => {
                        panic!("transform task cancelled by runtime shutdown: {join_err}")
                    }
                }
            }
        })
        .await
    }
}

/// Transform every item with at most `concurrency` transforms in flight.
///
/// Shorthand for `BoundedMapper::new(concurrency).map(items, transform)`.
pub async fn map_concurrent<T, U, E, F, Fut>(
    items: impl IntoIterator<Item = T>,
    concurrency: Concurrency,
    transform: F,
) -> Result<Vec<U>, E>
where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<U, E>>,
{
    BoundedMapper::new(concurrency).map(items, transform).await
}

/// The scheduling loop shared by every mapping entry point.
///
/// Each pass fills free slots from the work stack, then waits for exactly
/// one completion. A success frees its slot for the next pass; the first
/// error ends the run.
async fn run<T, U, E, F, Fut>(
    mut stack: Vec<T>,
    concurrency: Concurrency,
    mut transform: F,
    cancel: Option<&CancellationToken>,
) -> Result<Vec<U>, MapError<E>>
where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<U, E>>,
{
    let total = stack.len();
    let slots = concurrency.get();
    let mut results = Vec::with_capacity(total);
    let mut in_flight = FuturesUnordered::new();

    if total == 0 {
        return Ok(results);
    }

    debug!("Mapping {} items with concurrency {}", total, slots);

    loop {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            debug!(
                "Mapping cancelled with {} in flight and {} not started",
                in_flight.len(),
                stack.len()
            );
            return Err(MapError::Cancelled);
        }

        while in_flight.len() < slots {
            let Some(item) = stack.pop() else { break };
            in_flight.push(transform(item));
            trace!(
                "Started transform ({} in flight, {} remaining)",
                in_flight.len(),
                stack.len()
            );
        }

        let completed = match cancel {
            Some(token) => tokio::select! {
                biased;
                next = in_flight.next() => next,
                _ = token.cancelled() => continue,
            },
            None => in_flight.next().await,
        };

        match completed {
            Some(Ok(value)) => {
                results.push(value);
                // Nothing left to start or await; a late cancellation is moot
                if stack.is_empty() && in_flight.is_empty() {
                    debug!("Mapped all {} items", results.len());
                    return Ok(results);
                }
            }
            Some(Err(err)) => {
                debug!(
                    "Transform failed after {} of {} items; abandoning {} in flight",
                    results.len(),
                    total,
                    in_flight.len()
                );
                return Err(MapError::Failed(err));
            }
            None => {
                debug!("Mapped all {} items", results.len());
                return Ok(results);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_single_item_matches_direct_call() {
        let mapper = BoundedMapper::new(Concurrency::new(5).unwrap());
        let results = mapper
            .map(vec![21], |x| async move { Ok::<_, String>(x * 2) })
            .await
            .unwrap();
        assert_eq!(results, vec![42]);
    }

    #[tokio::test]
    async fn test_sequential_run_pulls_from_the_end() {
        let mapper = BoundedMapper::default();
        let results = mapper
            .map(vec!["a", "b", "c"], |s| async move { Ok::<_, String>(s) })
            .await
            .unwrap();
        assert_eq!(results, vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_error_is_returned_verbatim() {
        #[derive(Debug, PartialEq)]
        struct Boom(u32);

        let err = map_concurrent(vec![1u32, 2, 3], Concurrency::new(2).unwrap(), |x| async move {
            if x == 2 {
                Err(Boom(x))
            } else {
                Ok(x)
            }
        })
        .await
        .unwrap_err();
        assert_eq!(err, Boom(2));
    }

    #[tokio::test]
    async fn test_failure_stops_scheduling() {
        let started = Arc::new(AtomicUsize::new(0));
        let counter = started.clone();

        // The last item is started first and fails immediately.
        let err = map_concurrent((0..10).collect::<Vec<_>>(), Concurrency::SEQUENTIAL, |x| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if x == 9 {
                    Err("first item failed")
                } else {
                    Ok(x)
                }
            }
        })
        .await
        .unwrap_err();

        assert_eq!(err, "first item failed");
        assert_eq!(started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancellation_abandons_in_flight_work() {
        let token = CancellationToken::new();
        let mapper =
            BoundedMapper::new(Concurrency::new(2).unwrap()).with_cancellation(token.clone());

        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = mapper
            .map_cancellable(vec![1, 2, 3, 4], |x| async move {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<_, String>(x)
            })
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(err.into_inner(), None);
    }

    #[tokio::test]
    async fn test_cancelled_token_starts_nothing() {
        let token = CancellationToken::new();
        token.cancel();
        let started = AtomicUsize::new(0);

        let mapper = BoundedMapper::new(Concurrency::new(3).unwrap()).with_cancellation(token);
        let err = mapper
            .map_cancellable(vec![1, 2, 3], |x| {
                started.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<_, String>(x) }
            })
            .await
            .unwrap_err();

        assert_eq!(err, MapError::Cancelled);
        assert_eq!(started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancellation_with_last_completion_keeps_results() {
        let token = CancellationToken::new();
        let mapper = BoundedMapper::default().with_cancellation(token.clone());

        let results = mapper
            .map_cancellable(vec![7], |x| {
                token.cancel();
                async move { Ok::<_, String>(x) }
            })
            .await
            .unwrap();
        assert_eq!(results, vec![7]);
    }

    #[tokio::test]
    async fn test_cancellation_after_partial_completion_is_reported() {
        let token = CancellationToken::new();
        let mapper = BoundedMapper::default().with_cancellation(token.clone());

        // Sequential and LIFO: 2 finishes and fires the token, 1 never starts
        let started = AtomicUsize::new(0);
        let err = mapper
            .map_cancellable(vec![1, 2], |x| {
                started.fetch_add(1, Ordering::SeqCst);
                token.cancel();
                async move { Ok::<_, String>(x) }
            })
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancellable_without_token_completes() {
        let mapper = BoundedMapper::new(Concurrency::new(2).unwrap());
        let mut results = mapper
            .map_cancellable(vec![1, 2, 3], |x| async move { Ok::<_, String>(x + 1) })
            .await
            .unwrap();
        results.sort();
        assert_eq!(results, vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn test_cancellable_reports_failure() {
        let mapper = BoundedMapper::new(Concurrency::new(3).unwrap())
            .with_cancellation(CancellationToken::new());
        let err = mapper
            .map_cancellable(vec!["a", "b", "c"], |s| async move {
                if s == "b" {
                    Err("bad".to_string())
                } else {
                    Ok(s)
                }
            })
            .await
            .unwrap_err();
        assert_eq!(err, MapError::Failed("bad".to_string()));
        assert_eq!(err.to_string(), "bad");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_detached_runs_all_items() {
        let mapper = BoundedMapper::new(Concurrency::new(3).unwrap());
        let mut results = mapper
            .map_detached(0..20u64, |x| async move {
                tokio::time::sleep(Duration::from_millis(x % 3)).await;
                Ok::<_, String>(x * x)
            })
            .await
            .unwrap();
        results.sort();
        assert_eq!(results, (0..20u64).map(|x| x * x).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_detached_leaves_in_flight_work_running() {
        let finished = Arc::new(AtomicUsize::new(0));
        let mapper = BoundedMapper::new(Concurrency::new(2).unwrap());

        let counter = finished.clone();
        let err = mapper
            .map_detached(vec!["slow", "fail"], move |s| {
                let counter = counter.clone();
                async move {
                    if s == "fail" {
                        return Err("failed");
                    }
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(s)
                }
            })
            .await
            .unwrap_err();
        assert_eq!(err, "failed");

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    #[should_panic(expected = "transform exploded")]
    async fn test_detached_propagates_panics() {
        let mapper = BoundedMapper::default();
        let _ = mapper
            .map_detached(vec![1], |_x: i32| async move {
                if true {
                    panic!("transform exploded");
                }
                Ok::<i32, String>(0)
            })
            .await;
    }
}
