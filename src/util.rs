use std::mem::ManuallyDrop;

use crate::error::Error;
use crate::request::Request;

pub struct ScopeGuard<F: FnOnce()> {
    dropfn: ManuallyDrop<F>,
}

impl<F: FnOnce()> Drop for ScopeGuard<F> {
    fn drop(&mut self) {
        // SAFETY: This is OK because `dropfn` is `ManuallyDrop` which will not be dropped by the compiler.
        let dropfn = unsafe { ManuallyDrop::take(&mut self.dropfn) };
        dropfn();
    }
}

pub fn defer<F: FnOnce()>(dropfn: F) -> ScopeGuard<F> {
    ScopeGuard {
        dropfn: ManuallyDrop::new(dropfn),
    }
}

pub(crate) trait BoolExt {
    /// Turns a failed guard into a precondition violation blamed on `request`.
    fn or_violation(self, request: &Request, message: &str) -> Result<(), Error>;
}

impl BoolExt for bool {
    fn or_violation(self, request: &Request, message: &str) -> Result<(), Error> {
        self.then_some(())
            .ok_or_else(|| Error::violation(request, message))
    }
}
