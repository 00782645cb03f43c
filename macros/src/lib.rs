mod log;
mod loggable;
mod traceable;

use proc_macro::TokenStream;

/// Emits a log entry or error at the level it declares.
///
/// `log!(entry)` logs the display message, `log!(entry, context)` attaches
/// `context` as a debug field.
#[proc_macro]
pub fn log(input: TokenStream) -> TokenStream {
    log::log_impl(input)
}

/// Declares a serializable log-entry enum whose variants carry a level.
#[proc_macro]
pub fn loggable(input: TokenStream) -> TokenStream {
    loggable::loggable_impl(input)
}

/// Declares a serializable error enum whose variants carry a level and,
/// unless marked `#[no_source]`, the rendered source error.
#[proc_macro]
pub fn traceable(input: TokenStream) -> TokenStream {
    traceable::traceable_impl(input)
}
