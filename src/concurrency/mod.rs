//! Bounded-concurrency asynchronous mapping
//!
//! Every fan-out point of the migration (projects, tasks, attachments,
//! imported records) goes through [`BoundedMapper`]. It applies an async
//! transform to each item of a collection while keeping at most
//! [`Concurrency`] transforms in flight, and fails the whole run with the
//! first transform error.
//!
//! ## Ordering
//!
//! Work is pulled off the end of the input (last item first) and results
//! are collected in completion order. With a concurrency of one the output
//! is the reverse of the input. Callers that need to correlate results with
//! inputs should carry an identifier inside the result value.
//!
//! ## Example
//!
//! ```
//! use asana_migrate::concurrency::{map_concurrent, Concurrency};
//! use std::convert::Infallible;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let mut doubled = map_concurrent(vec![1, 2, 3], Concurrency::new(2).unwrap(), |x| async move {
//!     Ok::<_, Infallible>(x * 2)
//! })
//! .await
//! .unwrap();
//! doubled.sort();
//! assert_eq!(doubled, vec![2, 4, 6]);
//! # }
//! ```

mod limit;
mod mapper;

pub use limit::{Concurrency, ConcurrencyError};
pub use mapper::{map_concurrent, BoundedMapper, MapError};
