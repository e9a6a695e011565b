use std::fmt;
use std::rc::Rc;

use lightws_frame::Payload;

use crate::error::ListenerResult;

/// A registered event callback.
///
/// Cloning a `Listener` yields the same listener: identity is the shared
/// handle, so keep a clone around to pass to `off` later.
#[derive(Clone)]
pub struct Listener(Rc<dyn Fn(Option<&Payload>) -> ListenerResult>);

impl Listener {
    /// Wrap a fallible callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(Option<&Payload>) -> ListenerResult + 'static,
    {
        Self(Rc::new(callback))
    }

    /// Wrap a callback that cannot fail.
    pub fn infallible<F>(callback: F) -> Self
    where
        F: Fn(Option<&Payload>) + 'static,
    {
        Self::new(move |payload| {
            callback(payload);
            Ok(())
        })
    }

    /// Invoke the callback.
    pub fn call(&self, payload: Option<&Payload>) -> ListenerResult {
        (self.0)(payload)
    }

    /// Whether both handles refer to the same listener.
    pub fn same(&self, other: &Listener) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl Eq for Listener {}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Listener")
            .field(&Rc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn clones_share_identity() {
        let listener = Listener::infallible(|_| {});
        let clone = listener.clone();
        assert_eq!(listener, clone);
    }

    #[test]
    fn identical_closures_are_distinct_listeners() {
        let a = Listener::infallible(|_| {});
        let b = Listener::infallible(|_| {});
        assert_ne!(a, b);
    }

    #[test]
    fn call_passes_payload_through() {
        let seen = Rc::new(Cell::new(false));
        let flag = Rc::clone(&seen);
        let listener = Listener::infallible(move |payload| {
            flag.set(payload == Some(&Payload::from("x")));
        });

        listener.call(Some(&Payload::from("x"))).unwrap();
        assert!(seen.get());
    }

    #[test]
    fn fallible_listener_returns_error() {
        let listener = Listener::new(|_| Err("nope".into()));
        let err = listener.call(None).unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }
}
