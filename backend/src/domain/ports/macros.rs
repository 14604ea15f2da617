//! Macro for declaring driven-port error enums.
//!
//! Every adapter failure in the academy carries a human-readable `message`,
//! so each variant is a `{ message: String }` struct variant with a snake_case
//! constructor taking `impl Into<String>`. An optional `retryable:` clause
//! lists the variants the [`Retrier`](crate::domain::Retrier) may repeat.

macro_rules! define_port_error {
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident { message: String } => $display:literal
            ),* $(,)?
        }
        $(retryable: $($retryable:ident),+ ;)?
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($display)]
                $variant { message: String },
            )*
        }

        impl $name {
            $(
                ::paste::paste! {
                    #[doc = "Build a [`" $name "::" $variant "`] error."]
                    pub fn [<$variant:snake>](message: impl Into<String>) -> Self {
                        Self::$variant {
                            message: message.into(),
                        }
                    }
                }
            )*
        }

        $(
            impl $crate::domain::Retryable for $name {
                fn is_retryable(&self) -> bool {
                    matches!(self, $(Self::$retryable { .. })|+)
                }
            }
        )?
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    use crate::domain::Retryable;
    use rstest::rstest;

    define_port_error! {
        /// Store failures used to exercise the macro.
        pub enum LedgerStoreError {
            Offline { message: String } => "ledger offline: {message}",
            Rejected { message: String } => "ledger rejected write: {message}",
        }
        retryable: Offline;
    }

    define_port_error! {
        pub enum CatalogueError {
            Missing { message: String } => "catalogue entry missing: {message}",
        }
    }

    #[rstest]
    fn constructors_accept_borrowed_and_owned_messages() {
        assert_eq!(
            LedgerStoreError::offline("pool exhausted").to_string(),
            "ledger offline: pool exhausted"
        );
        assert_eq!(
            CatalogueError::missing(String::from("course 7")).to_string(),
            "catalogue entry missing: course 7"
        );
    }

    #[rstest]
    #[case(LedgerStoreError::offline("timeout"), true)]
    #[case(LedgerStoreError::rejected("constraint"), false)]
    fn only_listed_variants_are_retryable(#[case] error: LedgerStoreError, #[case] expected: bool) {
        assert_eq!(error.is_retryable(), expected);
    }
}
