use std::{fmt, ops};

use serde::{Deserialize, Serialize};

const REDACTED: &str = "****";

/// Secret value, like the network passphrase or a proxy auth token.
///
/// Formats as the inner value in debug builds and as `****` in release
/// builds. Serialization is transparent.
#[derive(Default, Deserialize, Serialize, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Hidden<T>(pub T);

impl<T: fmt::Debug> fmt::Debug for Hidden<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if cfg!(debug_assertions) {
            fmt::Debug::fmt(&self.0, f)
        } else {
            f.write_str(REDACTED)
        }
    }
}

impl<T: fmt::Display> fmt::Display for Hidden<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if cfg!(debug_assertions) {
            fmt::Display::fmt(&self.0, f)
        } else {
            f.write_str(REDACTED)
        }
    }
}

impl<T> From<T> for Hidden<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

impl<T> ops::Deref for Hidden<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_sees_the_inner_value() {
        let secret = Hidden(String::from("Ryujinx-0badcafe"));
        assert_eq!(
            serde_json::to_string(&secret).unwrap(),
            "\"Ryujinx-0badcafe\""
        );
        let parsed: Hidden<String> = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(*parsed, "abc");
    }

    #[test]
    fn wraps_from_plain_value() {
        let token: Hidden<[u8; 4]> = [1, 2, 3, 4].into();
        assert_eq!(token, Hidden([1, 2, 3, 4]));
    }

    #[test]
    fn formatting_depends_on_build() {
        let shown = format!("{} {:?}", Hidden(7u8), Hidden([1u8, 2]));
        if cfg!(debug_assertions) {
            assert_eq!(shown, "7 [1, 2]");
        } else {
            assert_eq!(shown, "**** ****");
        }
    }
}
