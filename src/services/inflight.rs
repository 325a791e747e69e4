//! # 사용자별 진행 중 교정 작업 관리
//!
//! 같은 사용자가 새 교정을 요청하면 진행 중이던 작업을 중단시킵니다.
//! 중단된 작업의 호출자는 `TaskError::Superseded`를 받습니다.
//!
//! ## 동작 방식
//! - `tokio::spawn`: 작업을 별도 태스크로 띄웁니다. 반환된 `JoinHandle`을 `.await`하면 결과를 받습니다.
//! - `AbortHandle`: 태스크를 밖에서 중단시키는 핸들. 중단된 태스크의 `JoinHandle`은
//!   `is_cancelled()`인 `JoinError`를 돌려줍니다.
//! - `Drop`: Rust는 값이 스코프를 벗어날 때 `drop()`을 호출합니다.
//!   axum은 클라이언트 연결이 끊기면 핸들러 future를 drop하므로,
//!   `run` 안의 가드가 그때 태스크를 중단하고 등록 항목을 지웁니다.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::task::AbortHandle;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Superseded by a newer request")]
    Superseded,

    #[error("Correction task failed: {0}")]
    Failed(String),
}

#[derive(Clone, Default)]
pub struct InFlight {
    next_ticket: Arc<AtomicU64>,
    tasks: Arc<Mutex<HashMap<String, (u64, AbortHandle)>>>,
}

impl InFlight {
    /// 작업을 띄우고, 같은 사용자의 이전 작업은 중단시킵니다.
    ///
    /// 반환된 future를 기다리던 쪽이 사라지면(클라이언트 연결 종료 등) 작업도 함께 중단됩니다.
    pub async fn run<F, T>(&self, user_id: &str, work: F) -> Result<T, TaskError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let handle = tokio::spawn(work);
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);

        let previous = self
            .tasks
            .lock()
            .insert(user_id.to_string(), (ticket, handle.abort_handle()));
        if let Some((_, previous)) = previous {
            tracing::debug!(user_id, "Aborting superseded correction task");
            previous.abort();
        }

        let _guard = TaskGuard {
            tasks: &self.tasks,
            user_id,
            ticket,
            handle: handle.abort_handle(),
        };

        handle.await.map_err(|e| {
            if e.is_cancelled() {
                TaskError::Superseded
            } else {
                TaskError::Failed(e.to_string())
            }
        })
    }

    /// 진행 중인 작업 수
    pub fn active(&self) -> usize {
        self.tasks.lock().len()
    }
}

/// `run`이 끝나거나 중간에 drop될 때 작업을 정리합니다.
///
/// 이미 끝난 작업의 abort는 아무 일도 하지 않습니다.
/// 등록 항목은 아직 자기 ticket일 때만 지웁니다. (더 새 요청의 항목은 남김)
struct TaskGuard<'a> {
    tasks: &'a Mutex<HashMap<String, (u64, AbortHandle)>>,
    user_id: &'a str,
    ticket: u64,
    handle: AbortHandle,
}

impl Drop for TaskGuard<'_> {
    fn drop(&mut self) {
        self.handle.abort();
        let mut tasks = self.tasks.lock();
        if tasks.get(self.user_id).map(|(t, _)| *t) == Some(self.ticket) {
            tasks.remove(self.user_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn newer_request_supersedes_the_running_one() {
        let inflight = InFlight::default();

        let background = inflight.clone();
        let first = tokio::spawn(async move {
            background
                .run("u1", async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    1
                })
                .await
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let second = inflight.run("u1", async { 2 }).await;
        assert_eq!(second.unwrap(), 2);
        assert!(matches!(first.await.unwrap(), Err(TaskError::Superseded)));
        assert_eq!(inflight.active(), 0);
    }

    #[tokio::test]
    async fn different_users_do_not_interfere() {
        let inflight = InFlight::default();

        let background = inflight.clone();
        let first = tokio::spawn(async move {
            background
                .run("u1", async {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    1
                })
                .await
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(inflight.run("u2", async { 2 }).await.unwrap(), 2);
        assert_eq!(first.await.unwrap().unwrap(), 1);
    }

    #[tokio::test]
    async fn dropping_the_caller_stops_the_work() {
        let inflight = InFlight::default();
        let finished = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let flag = finished.clone();
        let waited = tokio::time::timeout(
            Duration::from_millis(20),
            inflight.run("u1", async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                flag.store(true, Ordering::SeqCst);
            }),
        )
        .await;
        assert!(waited.is_err());
        assert_eq!(inflight.active(), 0);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn dropped_superseded_caller_keeps_the_newer_entry() {
        let inflight = InFlight::default();

        let background = inflight.clone();
        let first = tokio::spawn(async move {
            background
                .run("u1", async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                })
                .await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let background = inflight.clone();
        let second = tokio::spawn(async move {
            background
                .run("u1", async {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    2
                })
                .await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        // 첫 요청이 정리되어도 두 번째 작업의 항목은 남아 있어야 함
        assert!(matches!(first.await.unwrap(), Err(TaskError::Superseded)));
        assert_eq!(inflight.active(), 1);
        assert_eq!(second.await.unwrap().unwrap(), 2);
        assert_eq!(inflight.active(), 0);
    }
}
