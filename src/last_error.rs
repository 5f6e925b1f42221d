//! Per-thread error channel behind `get_global_param_string("errstring")`.
//!
//! Each boundary call clears the slot on entry, so a message always
//! belongs to the most recent call on the same thread.

use std::cell::RefCell;

use crate::error::FacadeError;

thread_local! {
    static LAST_ERROR: RefCell<String> = const { RefCell::new(String::new()) };
}

pub fn clear() {
    LAST_ERROR.with(|e| e.borrow_mut().clear());
}

pub fn set(err: &FacadeError) {
    LAST_ERROR.with(|e| *e.borrow_mut() = err.to_string());
}

/// Put back a message taken with [`take`].
pub fn restore(message: String) {
    LAST_ERROR.with(|e| *e.borrow_mut() = message);
}

/// Current message, left in place.
pub fn peek() -> String {
    LAST_ERROR.with(|e| e.borrow().clone())
}

/// Current message, clearing the slot.
pub fn take() -> String {
    LAST_ERROR.with(|e| std::mem::take(&mut *e.borrow_mut()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_clears() {
        set(&FacadeError::UnknownFluid("Xenonite".into()));
        assert_eq!(peek(), "Unknown fluid \"Xenonite\"");
        assert_eq!(take(), "Unknown fluid \"Xenonite\"");
        assert_eq!(take(), "");
    }

    #[test]
    fn threads_do_not_share_messages() {
        set(&FacadeError::EmptyInput("prop1"));
        let other = std::thread::spawn(peek).join().unwrap();
        assert_eq!(other, "");
        clear();
        assert_eq!(peek(), "");
    }
}
