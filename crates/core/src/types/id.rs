//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types. All ids in this domain
//! are opaque strings: catalog product ids, auth provider uids and
//! server-generated document ids.

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `PartialOrd`, `Ord`, `Hash`
/// - Conversion methods: `new()`, `as_str()`
/// - `From<String>`, `From<&str>` and `Into<String>` implementations
///
/// # Example
///
/// ```rust
/// # use moscent_core::define_id;
/// define_id!(OrderId);
/// define_id!(AddressId);
///
/// let order_id = OrderId::new("o-1");
/// let address_id = AddressId::new("o-1");
///
/// // These are different types, so this won't compile:
/// // let _: OrderId = address_id;
/// assert_eq!(order_id.as_str(), address_id.as_str());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from anything string-like.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Catalog product identifier (e.g. "12").
define_id!(ProductId);
// Authentication provider uid.
define_id!(UserId);
// Server-generated document id inside a user collection.
define_id!(DocumentId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_and_conversion() {
        let id = ProductId::new("42");
        assert_eq!(id.to_string(), "42");
        assert_eq!(String::from(id.clone()), "42");
        assert_eq!(ProductId::from("42"), id);
    }

    #[test]
    fn test_id_serde_transparent() {
        let id = UserId::new("uid-abc");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"uid-abc\"");
        let back: UserId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }
}
