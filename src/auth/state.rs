//! Authentication state traits and macro.

/// Trait for state types that know how auth cookies must be written.
pub trait HasCookieSettings {
    fn secure_cookies(&self) -> bool;
}

/// Macro to implement `HasCookieSettings` for state structs with a
/// `secure_cookies: bool` field.
///
/// # Example
/// ```ignore
/// #[derive(Clone)]
/// pub struct MyState {
///     pub api: ApiClient,
///     pub secure_cookies: bool,
/// }
///
/// impl_has_cookie_settings!(MyState);
/// ```
#[macro_export]
macro_rules! impl_has_cookie_settings {
    ($state_type:ty) => {
        impl $crate::auth::HasCookieSettings for $state_type {
            fn secure_cookies(&self) -> bool {
                self.secure_cookies
            }
        }
    };
}
