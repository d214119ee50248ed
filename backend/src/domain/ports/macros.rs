//! Helper macro for generating port error enums.

/// Generate a port error enum whose variants all carry named fields, along
/// with a snake_case constructor per variant that accepts `impl Into<T>` for
/// each field. Keeps adapter error construction terse at call sites:
/// `DirectoryStoreError::query("row decode failed")`.
macro_rules! define_port_error {
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident { $($field:ident : $ty:ty),* $(,)? } => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant { $($field : $ty),* },
            )*
        }

        impl $name {
            $(
                ::paste::paste! {
                    #[doc = concat!("Build [`Self::", stringify!($variant), "`].")]
                    pub fn [<$variant:snake>]($($field: impl Into<$ty>),*) -> Self {
                        Self::$variant { $($field: $field.into()),* }
                    }
                }
            )*
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    define_port_error! {
        pub enum ExamplePortError {
            Probe { message: String } => "probe: {message}",
            Commit { message: String, attempts: u32 } => "commit: {message} after {attempts}",
        }
    }

    #[test]
    fn constructors_accept_str_for_string_fields() {
        let err = ExamplePortError::probe("timed out");
        assert_eq!(err.to_string(), "probe: timed out");
    }

    #[test]
    fn constructors_support_mixed_fields() {
        let err = ExamplePortError::commit("lost race", 3_u32);
        assert_eq!(err.to_string(), "commit: lost race after 3");
    }
}
