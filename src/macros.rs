//! The `ic!` entry-point macro.
//!
//! No stringification happens here: the macro only evaluates its arguments
//! once, borrows them as `Debug` objects for the pipeline, and returns them
//! unchanged. Argument expression text is recovered at runtime from the
//! caller's source file.

/// Print each argument prefixed with the source expression that produced
/// it, then return the arguments unchanged.
///
/// - `ic!()` prints the call-site header and a stack trace.
/// - `ic!(expr)` prints and evaluates to `expr`.
/// - `ic!(a, b, ...)` prints all entries and evaluates to the tuple
///   `(a, b, ...)`.
///
/// ```no_run
/// use icecream::ic;
///
/// let x = 41;
/// let y = ic!(x + 1); // prints `ic| src/main.rs:4 <main>: x + 1 = 42`
/// assert_eq!(y, 42);
/// ```
#[macro_export]
macro_rules! ic {
    () => {{
        $crate::global().emit_trace(::std::panic::Location::caller());
    }};
    ($value:expr $(,)?) => {{
        let __ic_value = $value;
        $crate::global().emit(
            ::std::panic::Location::caller(),
            &[&__ic_value as &dyn ::std::fmt::Debug],
        );
        __ic_value
    }};
    ($($value:expr),+ $(,)?) => {{
        let __ic_values = ($($value,)+);
        $crate::global().emit(
            ::std::panic::Location::caller(),
            &$crate::args::ArgList::debug_refs(&__ic_values),
        );
        __ic_values
    }};
}
