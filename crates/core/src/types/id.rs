//! Newtype IDs for type-safe entity references.
//!
//! Shopify identifies resources with numeric IDs that overflow JavaScript
//! numbers and occasionally arrive as strings, so every external ID is kept
//! as its decimal string form. Use the `define_id!` macro to create wrappers
//! that prevent accidentally mixing IDs from different resources.

/// Macro to define a type-safe, string-backed ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>` and `From<&str>` implementations
/// - `sqlx` `Type`, `Encode`, and `Decode` implementations (with `postgres` feature)
///
/// # Example
///
/// ```rust
/// # use shopify_insights_core::define_id;
/// define_id!(InvoiceId);
/// define_id!(RefundId);
///
/// let invoice_id = InvoiceId::new("1001");
/// let refund_id = RefundId::new("1001");
///
/// assert_eq!(invoice_id.as_str(), refund_id.as_str());
/// // These are different types, so this won't compile:
/// // let _: InvoiceId = refund_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from its string form.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the owned string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
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

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <String as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <String as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let id = <String as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(Self(id))
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <String as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

// Shopify resource IDs
define_id!(ShopifyOrderId);
define_id!(ShopifyCustomerId);
define_id!(ShopifyProductId);
define_id!(CartToken);

// Tenant scope for every stored record
define_id!(StoreId);

impl Default for StoreId {
    fn default() -> Self {
        Self::new("default-store")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_matches_inner() {
        let id = ShopifyOrderId::new("820982911946154508");
        assert_eq!(id.to_string(), "820982911946154508");
        assert_eq!(id.as_str(), "820982911946154508");
    }

    #[test]
    fn test_id_serializes_transparently() {
        let id = ShopifyCustomerId::from("9");
        assert_eq!(serde_json::to_string(&id).ok().as_deref(), Some("\"9\""));
    }

    #[test]
    fn test_default_store_id() {
        assert_eq!(StoreId::default().as_str(), "default-store");
    }
}
