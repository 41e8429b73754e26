//! Active language context.
//!
//! Entities compute their absolute path in "the current language", the way
//! a localized router would. The current language lives in a thread-local
//! slot so that switching it for one unit of work never leaks into work on
//! other threads. Switching is only possible through [`activate`], whose
//! guard puts the previous value back when dropped, including on early
//! returns and panics.

use std::cell::RefCell;

thread_local! {
    static ACTIVE_LANGUAGE: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Restores the previously active language when dropped.
#[must_use = "the language is restored as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ActiveLanguageGuard {
    previous: Option<String>,
}

impl Drop for ActiveLanguageGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        ACTIVE_LANGUAGE.with(|slot| *slot.borrow_mut() = previous);
    }
}

/// Make `code` the active language on this thread until the guard drops.
pub fn activate(code: &str) -> ActiveLanguageGuard {
    let previous = ACTIVE_LANGUAGE.with(|slot| slot.borrow_mut().replace(code.to_string()));
    ActiveLanguageGuard { previous }
}

/// The language active on this thread, if any.
pub fn current_language() -> Option<String> {
    ACTIVE_LANGUAGE.with(|slot| slot.borrow().clone())
}
