/// Router Module Index
///
/// Organizes the routing logic into access-segregated modules. Each method
/// router carries an explicit fallback returning 405 with the endpoint's
/// allowed-verb set, so an unsupported verb is rejected before any
/// authentication or payload handling runs.

/// Routes accessible without a session: health probe, anti-forgery token,
/// signup, signin.
pub mod public;

/// Routes whose handlers require a session via the `AuthUser` extractor.
/// No router-level auth layer: a layer would wrap the 405 fallback too and
/// turn wrong-verb-while-anonymous into a 401.
pub mod authenticated;
