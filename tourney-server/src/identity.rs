use std::fmt::Debug;

use tourney_api::id::UserId;
use tourney_api::Event;

pub const USER_ID_HEADER: &str = "X-User-Id";

/// Resolves the caller of a request.
pub trait Identify: Debug + Send + Sync {
    /// Returns the calling user, or `None` for an anonymous request.
    fn identify(&self, event: &Event) -> Option<UserId>;
}

/// Takes the caller from the `X-User-Id` header without any verification.
#[derive(Copy, Clone, Debug, Default)]
pub struct HeaderIdentity;

impl Identify for HeaderIdentity {
    fn identify(&self, event: &Event) -> Option<UserId> {
        let value = event.get_header(USER_ID_HEADER)?;

        match value.parse() {
            Ok(id) => Some(id),
            Err(err) => {
                log::debug!(
                    "Ignoring malformed {} header {:?}: {}",
                    USER_ID_HEADER,
                    value,
                    err
                );

                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use hyper::Method;
    use tourney_api::id::UserId;
    use tourney_api::Event;

    use super::{HeaderIdentity, Identify};

    #[test]
    fn test_header_identity() {
        let event = Event::new(Method::POST).header("X-User-Id", "17");
        assert_eq!(HeaderIdentity.identify(&event), Some(UserId(17)));

        let event = Event::new(Method::POST).header("x-user-id", "17");
        assert_eq!(HeaderIdentity.identify(&event), Some(UserId(17)));

        let event = Event::new(Method::POST).header("X-User-Id", "admin");
        assert_eq!(HeaderIdentity.identify(&event), None);

        let event = Event::new(Method::POST);
        assert_eq!(HeaderIdentity.identify(&event), None);
    }
}
