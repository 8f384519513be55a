#![forbid(unsafe_code)]

//! The validator protocol and its composition.
//!
//! A validator is a pure function from a control to an error map:
//! `None` means the value passes. The synchronous form answers
//! immediately; the asynchronous form returns a [`Task`] that resolves
//! later (and whose delivery the engine can cancel when a newer
//! validation supersedes it).
//!
//! Controls keep a *raw list* of validator functions and a *composed*
//! function derived from it. Raw-list edits compare entries by
//! function-reference identity (`Rc::ptr_eq`): to remove a validator
//! you must pass a clone of the very `Rc` you added. Editing the raw
//! list never revalidates by itself; call
//! `update_value_and_validity` afterwards.

use std::rc::Rc;

use reform_core::ValidationErrors;
use reform_reactive::Task;
use smallvec::SmallVec;

use crate::control::ControlRef;

/// A synchronous validator: `None` when the value passes.
pub type ValidatorFn = Rc<dyn Fn(&ControlRef) -> Option<ValidationErrors>>;

/// An asynchronous validator: resolves to `None` when the value passes.
pub type AsyncValidatorFn = Rc<dyn Fn(&ControlRef) -> Task<Option<ValidationErrors>>>;

/// Wrap a plain closure as a [`ValidatorFn`].
pub fn validator(f: impl Fn(&ControlRef) -> Option<ValidationErrors> + 'static) -> ValidatorFn {
    Rc::new(f)
}

/// Wrap a plain closure as an [`AsyncValidatorFn`].
pub fn async_validator(
    f: impl Fn(&ControlRef) -> Task<Option<ValidationErrors>> + 'static,
) -> AsyncValidatorFn {
    Rc::new(f)
}

/// Compose a list of synchronous validators into one.
///
/// The composed function runs every validator and merges the error
/// maps; on a code collision the later validator wins. Returns `None`
/// for an empty list.
#[must_use]
pub fn compose(validators: &[ValidatorFn]) -> Option<ValidatorFn> {
    match validators {
        [] => None,
        [single] => Some(Rc::clone(single)),
        many => {
            let fns: Vec<ValidatorFn> = many.to_vec();
            Some(Rc::new(move |control| {
                ValidationErrors::merge_all(fns.iter().map(|f| f(control)))
            }))
        }
    }
}

/// Compose a list of asynchronous validators into one.
///
/// The composed task resolves once every constituent task has
/// resolved, merging the error maps in list order (later wins on
/// collision). Cancelling the composed delivery drops the merged
/// result; constituent validators may still resolve, unobserved.
#[must_use]
pub fn compose_async(validators: &[AsyncValidatorFn]) -> Option<AsyncValidatorFn> {
    use std::cell::{Cell, RefCell};

    match validators {
        [] => None,
        [single] => Some(Rc::clone(single)),
        many => {
            let fns: Vec<AsyncValidatorFn> = many.to_vec();
            Some(Rc::new(move |control| {
                let (task, resolver) = Task::pending();
                let remaining = Rc::new(Cell::new(fns.len()));
                let results: Rc<RefCell<Vec<Option<Option<ValidationErrors>>>>> =
                    Rc::new(RefCell::new(vec![None; fns.len()]));
                let resolver = Rc::new(RefCell::new(Some(resolver)));
                // Keeps the per-constituent cancel handles alive while
                // any constituent is still pending.
                let handles = Rc::new(RefCell::new(Vec::new()));

                for (index, f) in fns.iter().enumerate() {
                    let constituent = f(control);
                    let remaining = Rc::clone(&remaining);
                    let results = Rc::clone(&results);
                    let resolver = Rc::clone(&resolver);
                    let keepalive = Rc::clone(&handles);
                    let handle = constituent.on_resolve(move |errors| {
                        let _keepalive = &keepalive;
                        results.borrow_mut()[index] = Some(errors);
                        remaining.set(remaining.get() - 1);
                        if remaining.get() == 0
                            && let Some(resolver) = resolver.borrow_mut().take()
                        {
                            let merged = ValidationErrors::merge_all(
                                results.borrow_mut().drain(..).flatten(),
                            );
                            resolver.resolve(merged);
                        }
                    });
                    handles.borrow_mut().push(handle);
                }
                task
            }))
        }
    }
}

/// The raw validator list of a control: ordered, deduplicated by
/// function identity.
pub(crate) struct RawSet<F: ?Sized> {
    raw: SmallVec<[Rc<F>; 2]>,
}

impl<F: ?Sized> Default for RawSet<F> {
    fn default() -> Self {
        Self {
            raw: SmallVec::new(),
        }
    }
}

impl<F: ?Sized> RawSet<F> {
    pub fn from_list(raw: Vec<Rc<F>>) -> Self {
        Self {
            raw: SmallVec::from_vec(raw),
        }
    }

    pub fn set(&mut self, raw: Vec<Rc<F>>) {
        self.raw = SmallVec::from_vec(raw);
    }

    /// Append entries not already present (by identity); duplicates in
    /// `fns` itself are also collapsed to the first occurrence.
    pub fn add(&mut self, fns: Vec<Rc<F>>) {
        for f in fns {
            if !self.has(&f) {
                self.raw.push(f);
            }
        }
    }

    /// Remove entries present by identity; unknown entries are ignored.
    pub fn remove(&mut self, fns: &[Rc<F>]) {
        self.raw
            .retain(|existing| !fns.iter().any(|f| Rc::ptr_eq(existing, f)));
    }

    pub fn has(&self, f: &Rc<F>) -> bool {
        self.raw.iter().any(|existing| Rc::ptr_eq(existing, f))
    }

    pub fn clear(&mut self) {
        self.raw.clear();
    }

    pub fn as_slice(&self) -> &[Rc<F>] {
        &self.raw
    }
}
