/// Encodes positional call arguments.
///
/// Expands to a `Vec<serde_json::Value>`; an argument that fails to encode
/// returns early from the enclosing function with a
/// [`CallerError`](crate::CallerError).
///
/// ```ignore
/// caller.call_method::<f64>("foo", vec![], call_args!(x)).await
/// ```
#[macro_export]
macro_rules! call_args {
    ($($arg:expr),* $(,)?) => {
        vec![$($crate::to_arg(&$arg)?),*]
    };
}
