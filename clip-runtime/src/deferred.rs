//! # Deferred 模块
//!
//! 单线程、只能结算一次的结果句柄。
//!
//! `play()` / `rewind()` 与 `schedule_promise()` 都返回 [`Deferred`]，
//! 引擎持有一份、调用方持有一份。宿主可以每帧轮询 [`Deferred::is_settled`]，
//! 也可以把它当作 `Future` 交给任意单线程执行器。

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use crate::error::{ClipError, ClipResult};

#[derive(Default)]
struct DeferredState {
    outcome: Option<ClipResult<()>>,
    wakers: Vec<Waker>,
}

/// 延迟结果
#[derive(Clone, Default)]
pub struct Deferred {
    inner: Rc<RefCell<DeferredState>>,
}

impl Deferred {
    /// 未结算的句柄
    pub fn pending() -> Self {
        Self::default()
    }

    /// 已成功结算的句柄
    pub fn resolved() -> Self {
        let deferred = Self::pending();
        deferred.resolve();
        deferred
    }

    /// 已失败结算的句柄
    pub fn rejected(error: ClipError) -> Self {
        let deferred = Self::pending();
        deferred.reject(error);
        deferred
    }

    /// 成功结算，已结算时返回 `false`
    pub fn resolve(&self) -> bool {
        self.settle(Ok(()))
    }

    /// 失败结算，已结算时返回 `false`
    pub fn reject(&self, error: ClipError) -> bool {
        self.settle(Err(error))
    }

    fn settle(&self, outcome: ClipResult<()>) -> bool {
        let wakers = {
            let mut state = self.inner.borrow_mut();
            if state.outcome.is_some() {
                return false;
            }
            state.outcome = Some(outcome);
            std::mem::take(&mut state.wakers)
        };
        for waker in wakers {
            waker.wake();
        }
        true
    }

    pub fn is_settled(&self) -> bool {
        self.inner.borrow().outcome.is_some()
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.inner.borrow().outcome, Some(Ok(())))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self.inner.borrow().outcome, Some(Err(_)))
    }

    /// 结算结果，未结算时为 `None`
    pub fn outcome(&self) -> Option<ClipResult<()>> {
        self.inner.borrow().outcome.clone()
    }

    /// 失败原因
    pub fn error(&self) -> Option<ClipError> {
        match &self.inner.borrow().outcome {
            Some(Err(err)) => Some(err.clone()),
            _ => None,
        }
    }

    /// 两个句柄是否指向同一个结果
    pub fn ptr_eq(&self, other: &Deferred) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("outcome", &self.inner.borrow().outcome)
            .finish()
    }
}

impl Future for Deferred {
    type Output = ClipResult<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.inner.borrow_mut();
        match &state.outcome {
            Some(outcome) => Poll::Ready(outcome.clone()),
            None => {
                if !state.wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    state.wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EffectError;

    #[test]
    fn test_settles_once() {
        let deferred = Deferred::pending();
        assert!(!deferred.is_settled());
        assert!(deferred.resolve());
        assert!(!deferred.reject(EffectError::task("late").into()));
        assert!(deferred.is_resolved());
        assert_eq!(deferred.outcome(), Some(Ok(())));
    }

    #[test]
    fn test_clones_share_state() {
        let deferred = Deferred::pending();
        let handle = deferred.clone();
        handle.reject(EffectError::task("boom").into());
        assert!(deferred.is_rejected());
        assert!(deferred.ptr_eq(&handle));
        assert!(matches!(deferred.error(), Some(ClipError::Effect(_))));
    }

    #[test]
    fn test_future_poll() {
        let mut deferred = Deferred::pending();
        let mut cx = Context::from_waker(Waker::noop());
        assert_eq!(Pin::new(&mut deferred).poll(&mut cx), Poll::Pending);
        deferred.clone().resolve();
        assert_eq!(Pin::new(&mut deferred).poll(&mut cx), Poll::Ready(Ok(())));
    }

    #[test]
    fn test_constructors() {
        assert!(Deferred::resolved().is_resolved());
        assert!(Deferred::rejected(EffectError::task("x").into()).is_rejected());
        assert!(!Deferred::resolved().ptr_eq(&Deferred::resolved()));
    }
}
