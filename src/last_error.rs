//! Per-thread last-error slot.
//!
//! Every fallible [`RenderContext`](crate::RenderContext) operation returns a
//! [`SkrResult`] and also mirrors its outcome here: success clears the slot,
//! failure stores a formatted message prefixed with the call site. Callers
//! that prefer the status-check style can test [`is_ok`] after each call and
//! read the message with [`last_error`].
//!
//! The slot is thread-local. An empty slot means "no error".

use std::cell::RefCell;
use std::fmt;
use std::panic::Location;

use crate::error::SkrResult;

/// Capacity of the slot in bytes, including a terminator.
///
/// Stored messages never exceed `LAST_ERROR_SIZE - 1` bytes.
pub const LAST_ERROR_SIZE: usize = 1044;

thread_local! {
    static LAST_ERROR: RefCell<String> = RefCell::new(String::with_capacity(LAST_ERROR_SIZE));
}

/// Record an error with call-site context.
///
/// ```ignore
/// skr::set_error!("texture {} has {} channels", path, channels);
/// ```
#[macro_export]
macro_rules! set_error {
    ($($arg:tt)*) => {
        $crate::last_error::set_error_at(
            file!(),
            line!(),
            Some(module_path!()),
            format_args!($($arg)*),
        )
    };
}

/// Overwrite the slot with a message prefixed by `file:line` and, when known,
/// the function or module that produced it.
pub fn set_error_at(file: &str, line: u32, function: Option<&str>, args: fmt::Arguments<'_>) {
    let message = match function {
        Some(function) => format!("[{file}:{line} {function}] {args}"),
        None => format!("[{file}:{line}] {args}"),
    };
    store(&message);
}

/// Empty the slot.
pub fn clear_error() {
    LAST_ERROR.with(|slot| slot.borrow_mut().clear());
}

/// `true` when no error is recorded.
pub fn is_ok() -> bool {
    LAST_ERROR.with(|slot| slot.borrow().is_empty())
}

/// Copy of the current message (empty when no error is recorded).
pub fn last_error() -> String {
    LAST_ERROR.with(|slot| slot.borrow().clone())
}

/// Borrow the current message without copying it.
pub fn with_last_error<R>(f: impl FnOnce(&str) -> R) -> R {
    LAST_ERROR.with(|slot| f(&slot.borrow()))
}

/// Mirror `result` into the slot and hand it back unchanged.
#[track_caller]
pub(crate) fn record<T>(result: SkrResult<T>) -> SkrResult<T> {
    match &result {
        Ok(_) => clear_error(),
        Err(e) => {
            let caller = Location::caller();
            log::error!("{e}");
            set_error_at(caller.file(), caller.line(), None, format_args!("{e}"));
        }
    }
    result
}

fn store(message: &str) {
    let limit = LAST_ERROR_SIZE - 1;
    let mut end = message.len().min(limit);
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    LAST_ERROR.with(|slot| {
        let mut slot = slot.borrow_mut();
        slot.clear();
        slot.push_str(&message[..end]);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SkrError;

    #[test]
    fn test_starts_empty_per_thread() {
        std::thread::spawn(|| {
            assert!(is_ok());
            assert_eq!(last_error(), "");
        })
        .join()
        .unwrap();
    }

    #[test]
    fn test_set_and_clear() {
        set_error!("failed to load texture {}", "brick.png");
        assert!(!is_ok());
        let message = last_error();
        assert!(message.contains("last_error.rs"));
        assert!(message.ends_with("failed to load texture brick.png"));

        clear_error();
        assert!(is_ok());
    }

    #[test]
    fn test_prefix_without_function() {
        set_error_at("skr.rs", 42, None, format_args!("boom"));
        assert_eq!(last_error(), "[skr.rs:42] boom");
        clear_error();
    }

    #[test]
    fn test_truncates_long_messages() {
        let long = "x".repeat(LAST_ERROR_SIZE * 2);
        set_error_at("f.rs", 1, None, format_args!("{long}"));
        assert_eq!(last_error().len(), LAST_ERROR_SIZE - 1);
        clear_error();
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let long = "é".repeat(LAST_ERROR_SIZE);
        set_error_at("f.rs", 1, None, format_args!("{long}"));
        with_last_error(|message| {
            assert!(message.len() <= LAST_ERROR_SIZE - 1);
            assert!(message.ends_with('é'));
        });
        clear_error();
    }

    #[test]
    fn test_record_mirrors_result() {
        let failed: SkrResult<()> = record(Err(SkrError::invalid("count == 0")));
        assert!(failed.is_err());
        assert!(last_error().contains("invalid argument: count == 0"));

        let ok = record(Ok(7));
        assert_eq!(ok.unwrap(), 7);
        assert!(is_ok());
    }
}
