//! Page objects an embed holds until it is disposed.

use std::cell::RefCell;

/// A shared handle to a page object that is let go of exactly once.
///
/// After [`Attached::detach`] every accessor sees `None`, so code still
/// running on behalf of a disposed embed cannot reach the page.
#[derive(Debug)]
pub struct Attached<T>(RefCell<Option<T>>);

impl<T: Clone> Attached<T> {
    pub fn new(value: T) -> Self {
        Self(RefCell::new(Some(value)))
    }

    pub fn get(&self) -> Option<T> {
        self.0.borrow().clone()
    }

    pub fn is_attached(&self) -> bool {
        self.0.borrow().is_some()
    }

    pub fn detach(&self) -> Option<T> {
        self.0.borrow_mut().take()
    }
}
