/*!
Typed keys for the members of a [Signature](crate::db::signature::Signature).

Tables are declared once, up front, and never removed, so a key is a stable index into its category.
Tasks carry keys rather than references, which keeps task records `Copy` and free of lifetimes; an executor resolves a key through the signature it already holds.
*/

macro_rules! signature_key {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub(crate) u16);

        impl $name {
            /// The index of the keyed table within its category.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

signature_key!(
    /// A key to a unary relation.
    UnaryRelationKey
);

signature_key!(
    /// A key to a binary relation.
    BinaryRelationKey
);

signature_key!(
    /// A key to a nullary function.
    NullaryFunctionKey
);

signature_key!(
    /// A key to an injective function.
    InjectiveFunctionKey
);

signature_key!(
    /// A key to a binary function.
    BinaryFunctionKey
);

signature_key!(
    /// A key to a symmetric function.
    SymmetricFunctionKey
);
