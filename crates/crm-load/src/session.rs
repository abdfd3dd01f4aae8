//! Shared connection with transparent re-authentication.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::api::Connection;
use crate::error::{LoadError, Result};

/// A connection shared between the caller and a background load.
///
/// Every call goes through [`with_session`](Self::with_session), which
/// retries once after reconnecting when the session has expired.
#[derive(Debug)]
pub struct SharedSession<C> {
    inner: Arc<Mutex<C>>,
}

impl<C> Clone for SharedSession<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Connection> SharedSession<C> {
    pub fn new(connection: C) -> Self {
        Self {
            inner: Arc::new(Mutex::new(connection)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, C> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `call` against the connection.
    ///
    /// A [`LoadError::SessionExpired`] triggers one `reconnect()` and one
    /// retry. A failed reconnect or a second failure is returned as is.
    pub fn with_session<T, F>(&self, mut call: F) -> Result<T>
    where
        F: FnMut(&mut C) -> Result<T>,
    {
        let mut connection = self.lock();
        match call(&mut *connection) {
            Err(LoadError::SessionExpired) => {
                tracing::warn!("Session expired, attempting to reconnect");
                connection.reconnect()?;
                tracing::info!("Reconnected, retrying call");
                call(&mut *connection)
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Flaky {
        reconnects: usize,
        expired_calls: usize,
    }

    impl Connection for Flaky {
        fn reconnect(&mut self) -> Result<()> {
            self.reconnects += 1;
            Ok(())
        }
    }

    impl Flaky {
        fn call(&mut self) -> Result<&'static str> {
            if self.expired_calls > 0 {
                self.expired_calls -= 1;
                Err(LoadError::SessionExpired)
            } else {
                Ok("ok")
            }
        }
    }

    #[test]
    fn retries_once_after_reconnect() {
        let session = SharedSession::new(Flaky {
            expired_calls: 1,
            ..Flaky::default()
        });
        assert_eq!(session.with_session(Flaky::call).expect("retried call"), "ok");
        assert_eq!(session.with_session(|c| Ok(c.reconnects)).expect("read"), 1);
    }

    #[test]
    fn second_expiry_propagates() {
        let session = SharedSession::new(Flaky {
            expired_calls: 2,
            ..Flaky::default()
        });
        let err = session.with_session(Flaky::call).expect_err("second expiry");
        assert!(err.is_session_expired());
        assert_eq!(session.with_session(|c| Ok(c.reconnects)).expect("read"), 1);
    }

    #[test]
    fn other_errors_do_not_reconnect() {
        let session = SharedSession::new(Flaky::default());
        let err = session
            .with_session(|_| -> Result<()> { Err(LoadError::NotConnected) })
            .expect_err("not connected");
        assert!(matches!(err, LoadError::NotConnected));
        assert_eq!(session.with_session(|c| Ok(c.reconnects)).expect("read"), 0);
    }
}
