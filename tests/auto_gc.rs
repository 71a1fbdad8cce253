/*
 * Created on Tue Jul 28 2026
 *
 * This file is a part of the auto-gc admission controller for a
 * content-addressed, version-controlled SQL storage engine.
 *
 * Copyright (c) 2026, the project authors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! End-to-end tests driving the controller against
//! [`autogc::test_support::FakeHost`] instead of a real SQL engine or
//! storage layer, exercising the scenarios the admission/dispatch core is
//! expected to satisfy.

use std::time::Duration;

use autogc::test_support::FakeHost;
use autogc::{Config, Controller, ShutdownToken, StoreSize};

fn mib(n: u64) -> u64 {
    n * 1024 * 1024
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn journal_threshold_triggers_one_gc_and_rearms() {
    let host = FakeHost::new();
    let controller = Controller::new(host.clone());
    controller.start();
    let hook = controller.new_commit_hook("db_a");
    let ctx = host.scope();

    host.set_size("db_a", StoreSize::new(0, mib(10)));
    hook.execute(ctx.clone(), "t", autogc::test_support::FakeDb::new("db_a")).await.unwrap();
    assert!(host.gc_calls().is_empty(), "first observation only sets the baseline");

    host.set_size("db_a", StoreSize::new(mib(129), mib(139)));
    hook.execute(ctx.clone(), "t", autogc::test_support::FakeDb::new("db_a")).await.unwrap();

    host.wait_for_gc_start().await;
    // Give the worker a moment to finish closing `done` before asserting.
    tokio::time::sleep(Duration::from_millis(20)).await;
    let calls = host.gc_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(&*calls[0].db, "db_a");

    // A subsequent small commit that stays under both thresholds relative to
    // the rebaselined total does not enqueue another request.
    host.set_size("db_a", StoreSize::new(mib(1), mib(140)));
    hook.execute(ctx, "t", autogc::test_support::FakeDb::new("db_a")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(host.gc_calls().len(), 1, "no second GC for a commit under both thresholds");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn growth_threshold_triggers_and_respects_boundary() {
    let host = FakeHost::new();
    let controller = Controller::new(host.clone());
    controller.start();
    let hook = controller.new_commit_hook("db_b");
    let ctx = host.scope();
    let db = autogc::test_support::FakeDb::new("db_b");

    host.set_size("db_b", StoreSize::new(mib(1), mib(100)));
    hook.execute(ctx.clone(), "t", db.clone()).await.unwrap();
    assert!(host.gc_calls().is_empty());

    // Exactly at the boundary (356 MiB growth) must not fire.
    host.set_size("db_b", StoreSize::new(mib(1), mib(356)));
    hook.execute(ctx.clone(), "t", db.clone()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(host.gc_calls().is_empty(), "growth exactly at the threshold must not fire");

    // One MiB further (357 MiB growth) crosses it.
    host.set_size("db_b", StoreSize::new(mib(1), mib(357)));
    hook.execute(ctx, "t", db).await.unwrap();
    host.wait_for_gc_start().await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(host.gc_calls().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn single_flight_per_database_under_concurrent_commits() {
    let host = FakeHost::new();
    host.set_gc_delay(Duration::from_millis(200));
    let controller = Controller::new(host.clone());
    controller.start();
    let hook = controller.new_commit_hook("db_c");
    let ctx = host.scope();
    let db = autogc::test_support::FakeDb::new("db_c");

    host.set_size("db_c", StoreSize::new(mib(200), mib(200)));
    hook.execute(ctx.clone(), "t", db.clone()).await.unwrap();
    host.wait_for_gc_start().await;

    // A burst of concurrent commits while the GC above is still running:
    // every one must be a no-op that does not even query the store size
    // again, because `done` is still open for this hook.
    let before = host.size_query_count();
    let mut joins = Vec::new();
    for _ in 0..100 {
        let hook = hook.clone();
        let ctx = ctx.clone();
        let db = db.clone();
        joins.push(tokio::spawn(async move { hook.execute(ctx, "t", db).await }));
    }
    for j in joins {
        j.await.unwrap().unwrap();
    }
    assert_eq!(host.size_query_count(), before, "no additional size queries while in flight");
    assert_eq!(host.gc_calls().len(), 1, "no duplicate GC dispatched");

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(host.gc_calls().len(), 1, "still exactly one GC after the in-flight one finishes");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn fifo_across_databases_regardless_of_gc_duration() {
    let host = FakeHost::new();
    let controller = Controller::new(host.clone());
    controller.start();
    let ctx = host.scope();

    let names = ["db_a", "db_b", "db_c"];
    for name in names {
        let hook = controller.new_commit_hook(name);
        host.set_size(name, StoreSize::new(mib(200), mib(200)));
        hook.execute(ctx.clone(), "t", autogc::test_support::FakeDb::new(name)).await.unwrap();
    }

    // Give the worker enough time to drain the queue it received in order.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let calls = host.gc_calls();
    assert_eq!(calls.len(), 3);
    let order: Vec<&str> = calls.iter().map(|c| &*c.db).collect();
    assert_eq!(order, vec!["db_a", "db_b", "db_c"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_drops_queued_work_but_closes_the_in_flight_item() {
    let host = FakeHost::new();
    // Slow enough that two more requests pile up behind the first dispatch.
    host.set_gc_delay(Duration::from_millis(300));
    let controller = Controller::new(host.clone());
    controller.start();
    let ctx = host.scope();

    let hook_a = controller.new_commit_hook("db_a");
    let hook_b = controller.new_commit_hook("db_b");
    let hook_c = controller.new_commit_hook("db_c");

    for (hook, name) in [(&hook_a, "db_a"), (&hook_b, "db_b"), (&hook_c, "db_c")] {
        host.set_size(name, StoreSize::new(mib(200), mib(200)));
        hook.execute(ctx.clone(), "t", autogc::test_support::FakeDb::new(name)).await.unwrap();
    }

    // db_a is now in flight with the worker (slow GC); db_b and db_c are
    // still sitting in the admission queue.
    host.wait_for_gc_start().await;
    host.cancel();
    host.join().await;

    // Only the in-flight item ever reached `run_gc`; the queued two were
    // dropped at shutdown rather than dispatched.
    let calls = host.gc_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(&*calls[0].db, "db_a");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancellation_during_submit_leaves_hook_state_untouched() {
    let host = FakeHost::new();
    // Deliberately do not call `controller.start()`: nothing ever drains the
    // ingress channel, so the second hook's send blocks forever until the
    // scope is cancelled.
    let controller = Controller::new(host.clone());
    let ctx = host.scope();

    let hook_a = controller.new_commit_hook("db_a");
    let hook_b = controller.new_commit_hook("db_b");

    host.set_size("db_a", StoreSize::new(mib(200), mib(200)));
    // Fills the ingress channel's single slot; nothing is consuming it.
    hook_a.execute(ctx.clone(), "t", autogc::test_support::FakeDb::new("db_a")).await.unwrap();

    host.set_size("db_b", StoreSize::new(mib(200), mib(200)));
    let hook_b_for_task = hook_b.clone();
    let ctx_for_task = ctx.clone();
    let join = tokio::spawn(async move {
        hook_b_for_task
            .execute(ctx_for_task, "t", autogc::test_support::FakeDb::new("db_b"))
            .await
    });

    // Give the submit a moment to actually block on the full channel before
    // cancelling the scope out from under it.
    tokio::time::sleep(Duration::from_millis(20)).await;
    ctx.cancel();
    let result = join.await.unwrap();
    assert!(result.is_err(), "submit must surface the cancellation");

    // The hook must be exactly as eligible to retry as before: a subsequent
    // `Execute` against a fresh, uncancelled context re-samples size and can
    // still trigger.
    let fresh_ctx = ShutdownToken::new();
    host.set_size("db_b", StoreSize::new(mib(1), mib(1)));
    hook_b.execute(fresh_ctx, "t", autogc::test_support::FakeDb::new("db_b")).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn store_size_failure_is_surfaced_without_enqueueing() {
    let host = FakeHost::new();
    let controller = Controller::new(host.clone());
    controller.start();
    let ctx = host.scope();

    let hook = controller.new_commit_hook("db_z");
    host.fail_size_for("db_z");

    let result = hook.execute(ctx, "t", autogc::test_support::FakeDb::new("db_z")).await;
    assert!(result.is_err());
    assert!(host.gc_calls().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn gc_failure_still_closes_done_and_allows_rearm() {
    let host = FakeHost::new();
    let controller = Controller::new(host.clone());
    controller.start();
    let ctx = host.scope();
    let hook = controller.new_commit_hook("db_y");
    let db = autogc::test_support::FakeDb::new("db_y");

    host.fail_gc_for("db_y");
    host.set_size("db_y", StoreSize::new(mib(200), mib(200)));
    hook.execute(ctx.clone(), "t", db.clone()).await.unwrap();

    host.wait_for_gc_start().await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(host.gc_calls().len(), 1);

    // Even though the GC failed, `done` closed, so a later qualifying commit
    // re-arms and submits again.
    host.set_size("db_y", StoreSize::new(mib(200), mib(600)));
    hook.execute(ctx, "t", db).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(host.gc_calls().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn session_construction_failure_still_rearms_the_hook() {
    let host = FakeHost::new();
    host.fail_sessions();
    let controller = Controller::new(host.clone());
    controller.start();
    let ctx = host.scope();
    let hook = controller.new_commit_hook("db_w");
    let db = autogc::test_support::FakeDb::new("db_w");

    host.set_size("db_w", StoreSize::new(mib(200), mib(200)));
    hook.execute(ctx, "t", db).await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    // No GC ever ran (session construction failed before `run_gc`), and no
    // session lifecycle notification fired either.
    assert!(host.gc_calls().is_empty());
    let (begins, ends, session_ends) = host.session_lifecycle_counts();
    assert_eq!((begins, ends, session_ends), (0, 0, 0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn custom_config_thresholds_are_honored() {
    let host = FakeHost::new();
    let cfg = Config { thresh_journal: mib(1), thresh_growth: mib(2) };
    let controller = Controller::with_config(host.clone(), cfg);
    controller.start();
    let ctx = host.scope();
    let hook = controller.new_commit_hook("db_v");
    let db = autogc::test_support::FakeDb::new("db_v");

    // Under the default thresholds this would not fire, but it exceeds the
    // custom 1 MiB journal bound.
    host.set_size("db_v", StoreSize::new(mib(2), mib(2)));
    hook.execute(ctx, "t", db).await.unwrap();

    host.wait_for_gc_start().await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(host.gc_calls().len(), 1);
}
