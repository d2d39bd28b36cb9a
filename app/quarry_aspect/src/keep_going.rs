/*
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::future::Future;

use futures::future;

/// Evaluate futures concurrently. With `keep_going` every future runs to
/// completion and the first error (in input order) is returned afterwards;
/// otherwise evaluation stops at the first error and the remaining futures
/// are dropped.
pub async fn try_join_all<T, F>(keep_going: bool, futs: Vec<F>) -> anyhow::Result<Vec<T>>
where
    F: Future<Output = anyhow::Result<T>>,
{
    if keep_going {
        future::join_all(futs)
            .await
            .into_iter()
            .collect::<anyhow::Result<Vec<T>>>()
    } else {
        future::try_join_all(futs).await
    }
}

/// Evaluate every future to completion, keeping per-future results.
pub async fn join_all_results<T, F>(futs: Vec<F>) -> Vec<anyhow::Result<T>>
where
    F: Future<Output = anyhow::Result<T>>,
{
    future::join_all(futs).await
}
